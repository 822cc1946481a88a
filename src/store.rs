//! Token cache contract and built-in cache store implementations.

pub mod memory;
#[cfg(feature = "redis")] pub mod redis;

pub use memory::MemoryStore;
#[cfg(feature = "redis")] pub use self::redis::RedisStore;

// self
use crate::_prelude::*;

/// Boxed future returned by [`CacheStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for cached access tokens.
///
/// Implementations must be safe for concurrent `get`/`set` from many in-flight authorize calls.
/// Shared backends must apply expiry server-side so every process observes the same TTL.
pub trait CacheStore
where
	Self: Send + Sync,
{
	/// Returns the value for `key`, or `None` when the key is absent or expired.
	///
	/// A missing key is never an error.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Stores `value` under `key` for `ttl` seconds, overwriting any existing entry.
	fn set<'a>(&'a self, key: &'a str, value: &'a str, ttl: u64) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`CacheStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Backend-level failure (connection lost, command rejected).
	#[error("Cache backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
