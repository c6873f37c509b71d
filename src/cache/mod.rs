//! Cache module for upstream API responses
//!
//! This module provides an in-memory cache manager that keeps the latest payload
//! for each upstream resource along with the time it was fetched. Entries older
//! than the freshness window are refreshed on access, and a failed refresh falls
//! back to the previous payload so clients keep getting data while the upstream
//! API is unavailable.

mod manager;

pub use manager::{CacheManager, CacheSource, CacheStatus, CachedData, DEFAULT_MAX_AGE};
