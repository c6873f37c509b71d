//! weathergate library
//!
//! A caching proxy in front of a weather provider API. Exposes the cache, the
//! upstream client, and the HTTP router so they can be exercised by integration
//! tests.

pub mod cache;
pub mod cli;
pub mod data;
pub mod server;
pub mod telemetry;
