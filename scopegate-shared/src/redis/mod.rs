/// Redis integration
///
/// Redis backs the distributed lock store (see [`crate::lock::redis`]).
///
/// ```text
/// API instance A ──SET lock:post:{id} NX PX──┐
///                                            ▼
///                                          Redis
///                                            ▲
/// API instance B ──SET lock:post:{id} NX PX──┘  (waits until A releases)
/// ```

pub mod client;

pub use client::{sanitize_url, RedisClient, RedisClientError, RedisConfig};
