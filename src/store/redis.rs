//! Redis-backed [`CacheStore`] shared across processes.
//!
//! Entries are written with `SETEX`, so expiry is enforced by the server and every process
//! sharing the database observes the same TTL. Keys are namespaced as `{prefix}${key}`.

// crates.io
use redis::{AsyncCommands, Client as RedisClient, RedisError, aio::ConnectionManager};
// self
use crate::{
	_prelude::*,
	obs,
	store::{CacheStore, StoreError, StoreFuture},
};

/// Prefix applied to every key when none is configured.
pub const DEFAULT_PREFIX: &str = "TWS_AUTH";

/// Cache store persisting tokens in Redis through an auto-reconnecting connection manager.
#[derive(Clone)]
pub struct RedisStore {
	connection: ConnectionManager,
	prefix: Arc<str>,
}
impl RedisStore {
	/// Connects to `url` (for example `redis://127.0.0.1:6379/0`) with the default prefix.
	pub async fn open(url: &str) -> Result<Self, StoreError> {
		Self::open_with_prefix(url, DEFAULT_PREFIX).await
	}

	/// Connects to `url` and namespaces every key under `prefix`.
	pub async fn open_with_prefix(
		url: &str,
		prefix: impl Into<String>,
	) -> Result<Self, StoreError> {
		let client = RedisClient::open(url).map_err(backend_error)?;
		let connection = ConnectionManager::new(client).await.map_err(backend_error)?;

		Ok(Self::with_connection(connection, prefix))
	}

	/// Wraps an existing connection manager.
	pub fn with_connection(connection: ConnectionManager, prefix: impl Into<String>) -> Self {
		let prefix: String = prefix.into();

		Self { connection, prefix: Arc::from(prefix) }
	}

	/// Key prefix in use.
	pub fn prefix(&self) -> &str {
		&self.prefix
	}

	/// Full Redis key for a cache key.
	pub fn prefixed_key(&self, key: &str) -> String {
		redis_key(&self.prefix, key)
	}

	/// Round-trips a `PING` to confirm the server is reachable.
	pub async fn ping(&self) -> Result<(), StoreError> {
		let mut connection = self.connection.clone();
		let _: String =
			redis::cmd("PING").query_async(&mut connection).await.map_err(backend_error)?;

		Ok(())
	}
}
impl Debug for RedisStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RedisStore").field("prefix", &self.prefix).finish_non_exhaustive()
	}
}
impl CacheStore for RedisStore {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move {
			let mut connection = self.connection.clone();
			let value: Option<String> =
				connection.get(self.prefixed_key(key)).await.map_err(backend_error)?;

			Ok(value)
		})
	}

	fn set<'a>(&'a self, key: &'a str, value: &'a str, ttl: u64) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let Some(seconds) = setex_seconds(ttl) else {
				return Ok(());
			};
			let mut connection = self.connection.clone();

			connection
				.set_ex::<_, _, ()>(self.prefixed_key(key), value, seconds)
				.await
				.map_err(backend_error)?;

			Ok(())
		})
	}
}

fn redis_key(prefix: &str, key: &str) -> String {
	format!("{prefix}${key}")
}

// SETEX rejects a zero expiry; such an entry would read as a miss anyway.
fn setex_seconds(ttl: u64) -> Option<u64> {
	(ttl > 0).then_some(ttl)
}

fn backend_error(err: RedisError) -> StoreError {
	let message = err.to_string();

	obs::trace_store_failure("redis", &message);

	StoreError::Backend { message }
}
