//! Thread-safe in-memory [`CacheStore`] for local development and tests.
//!
//! Expired entries are evicted lazily on read; nothing sweeps the map in the background, so
//! keys that are never read again stay resident. Use a shared backend such as
//! [`RedisStore`](crate::store::RedisStore) for multi-instance deployments.

// self
use crate::{
	_prelude::*,
	store::{CacheStore, StoreError, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<String, CacheEntry>>>;

/// Cached value plus its absolute expiry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
	/// Cached token.
	pub value: String,
	/// Instant at and after which the entry reads as a miss.
	pub expired_at: OffsetDateTime,
}
impl CacheEntry {
	/// Returns `true` when the entry is expired at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expired_at
	}
}

/// Thread-safe cache that keeps entries in-process. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of resident entries, including expired ones not yet evicted.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no entries are resident.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn save_now(map: &StoreMap, key: &str, value: &str, ttl: u64, now: OffsetDateTime) {
		let ttl = Duration::from_secs(ttl);
		let ttl = ttl.try_into().unwrap_or(time::Duration::MAX);
		let expired_at = now.checked_add(ttl).unwrap_or_else(far_future);

		map.write().insert(key.to_owned(), CacheEntry { value: value.to_owned(), expired_at });
	}

	fn fetch_now(map: &StoreMap, key: &str, now: OffsetDateTime) -> Option<String> {
		match map.read().get(key) {
			Some(entry) if !entry.is_expired_at(now) => return Some(entry.value.clone()),
			Some(_) => {},
			None => return None,
		}

		let mut guard = map.write();

		// Re-check under the write lock; a concurrent `set` may have refreshed the entry.
		match guard.get(key) {
			Some(entry) if entry.is_expired_at(now) => {
				guard.remove(key);

				None
			},
			Some(entry) => Some(entry.value.clone()),
			None => None,
		}
	}
}
impl CacheStore for MemoryStore {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move { Ok(Self::fetch_now(&self.0, key, OffsetDateTime::now_utc())) })
	}

	fn set<'a>(&'a self, key: &'a str, value: &'a str, ttl: u64) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			Self::save_now(&self.0, key, value, ttl, OffsetDateTime::now_utc());

			Ok::<_, StoreError>(())
		})
	}
}

fn far_future() -> OffsetDateTime {
	time::macros::datetime!(9999-12-31 23:59:59 UTC)
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn entries_expire_at_ttl_boundary() {
		let store = MemoryStore::default();
		let start = macros::datetime!(2025-11-10 12:00 UTC);

		MemoryStore::save_now(&store.0, "app$self", "T1", 60, start);

		assert_eq!(MemoryStore::fetch_now(&store.0, "app$self", start).as_deref(), Some("T1"));
		assert_eq!(
			MemoryStore::fetch_now(&store.0, "app$self", start + Duration::from_secs(59))
				.as_deref(),
			Some("T1")
		);
		assert_eq!(
			MemoryStore::fetch_now(&store.0, "app$self", start + Duration::from_secs(60)),
			None
		);
		assert!(store.is_empty(), "Expired entries should be evicted lazily on read.");
	}

	#[test]
	fn set_overwrites_existing_entry() {
		let store = MemoryStore::default();
		let start = macros::datetime!(2025-11-10 12:00 UTC);

		MemoryStore::save_now(&store.0, "key", "old", 10, start);
		MemoryStore::save_now(&store.0, "key", "new", 600, start);

		let later = start + Duration::from_secs(300);

		assert_eq!(MemoryStore::fetch_now(&store.0, "key", later).as_deref(), Some("new"));
		assert_eq!(store.len(), 1);
	}

	#[test]
	fn zero_ttl_reads_as_miss() {
		let store = MemoryStore::default();
		let start = macros::datetime!(2025-11-10 12:00 UTC);

		MemoryStore::save_now(&store.0, "key", "value", 0, start);

		assert_eq!(MemoryStore::fetch_now(&store.0, "key", start), None);
	}

	#[test]
	fn huge_ttl_saturates() {
		let store = MemoryStore::default();
		let start = macros::datetime!(2025-11-10 12:00 UTC);

		MemoryStore::save_now(&store.0, "key", "value", u64::MAX, start);

		assert_eq!(
			MemoryStore::fetch_now(&store.0, "key", macros::datetime!(9000-01-01 00:00 UTC))
				.as_deref(),
			Some("value")
		);
	}

	#[tokio::test]
	async fn missing_key_is_not_an_error() {
		let store = MemoryStore::default();
		let value = store.get("absent").await.expect("Missing keys must not raise errors.");

		assert_eq!(value, None);
	}
}
