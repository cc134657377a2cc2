//! Network-first resource cache.
//!
//! # Responsibility
//! - Pre-populate a versioned cache generation with the application shell.
//! - Retire every generation whose label differs from the current version.
//! - Serve each request from the network first and from cache when offline.

pub mod http;
pub mod network;
pub mod proxy;
pub mod storage;

pub use http::{Method, Request, Response};
pub use network::{HttpNetwork, Network, NetworkError};
pub use proxy::{ProxyError, ProxyPhase, ResourceCacheProxy, ResponseSource, Served};
pub use storage::{CacheError, CacheResult, CacheStorage, MemoryCacheStorage, SqliteCacheStorage};
