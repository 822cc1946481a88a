//! Teambition Web Service auth client: JWT signing with secret rotation, cached
//! `client_credentials` tokens, and retrying authenticated requests.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod authorize;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod jwt;
pub mod obs;
pub mod response;
pub mod retry;
pub mod service;
pub mod store;
pub mod ua;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{client::Client, config::ClientOptions, store::MemoryStore};

	/// Application id accepted by the mock auth service fixtures.
	pub const TEST_APP_ID: &str = "59294da476d70b4b83fa91a5";
	/// Shared secret paired with [`TEST_APP_ID`].
	pub const TEST_APP_SECRET: &str = "hello123";

	/// Constructs a reqwest-backed [`Client`] pointed at `host` with an in-memory cache and a
	/// fast retry policy.
	pub fn build_test_client(host: &str) -> (Client, Arc<MemoryStore>) {
		let store = Arc::new(MemoryStore::default());
		let options = ClientOptions::builder(TEST_APP_ID, [TEST_APP_SECRET])
			.host(host)
			.retry_delay(Duration::from_millis(10))
			.cache_store(store.clone())
			.build()
			.expect("Test client options should be valid.");
		let client = Client::new(options).expect("Test client should build.");

		(client, store)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use serde_json::{Map as JsonMap, Value as JsonValue};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use client::{Client, RequestOptions};
pub use config::{AppId, ClientOptions, ClientOptionsBuilder};
pub use error::{ConfigError, Error, Result, TransportError};
pub use http::{ErrorCode, HttpTransport, Method};
pub use jwt::{AppSecret, TokenSigner};
pub use response::{ApiError, Response};
pub use retry::RetryPolicy;
pub use store::{CacheStore, MemoryStore, StoreError};
#[cfg(feature = "redis")] pub use store::RedisStore;

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
