//! `client_credentials` token acquisition with cache-aside storage.
//!
//! [`Client::authorize`] looks the token up in the configured [`CacheStore`] first and only
//! calls `POST {host}/v1/apps/authorize` on a miss. Fresh tokens are cached for slightly less
//! than the upstream lifetime so callers never hold a token the service already considers
//! expired. Concurrent misses for the same key may each reach upstream unless
//! [`single_flight`](crate::config::ClientOptionsBuilder::single_flight) is enabled, in which
//! case a per-key guard lets waiters piggy-back on the in-flight call.

// self
use crate::{
	_prelude::*,
	client::Client,
	error::ConfigError,
	http::{HttpRequest, Method, url_join},
	jwt::DEFAULT_APP_TOKEN_PERIOD,
	obs::{self, OpKind, OpOutcome, OpSpan},
	retry,
	store::CacheStore,
};

/// Path of the authorize endpoint, resolved against the configured auth host.
pub const AUTHORIZE_PATH: &str = "/v1/apps/authorize";
/// Seconds subtracted from `expires_in` before caching.
pub const EXPIRE_GAP: u64 = 42;
/// Grantor type used when an application authorizes itself.
pub const SELF_GRANTOR_TYPE: &str = "self";
/// Client name reported in authorize calls.
pub const CLIENT_NAME: &str = "tws-auth";
/// Grant reported in authorize calls.
pub const GRANT_TYPE: &str = "client_credentials";

/// Successful authorize response.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
	/// Bearer token.
	pub access_token: String,
	/// Lifetime in seconds as reported upstream.
	pub expires_in: u64,
}
impl Authorization {
	/// TTL used when caching this token: `expires_in - 42` when that leaves time, otherwise
	/// `expires_in - 1`. Zero means the token must not be cached.
	pub fn cache_ttl(&self) -> u64 {
		if self.expires_in > EXPIRE_GAP {
			self.expires_in - EXPIRE_GAP
		} else {
			self.expires_in.saturating_sub(1)
		}
	}
}
impl Debug for Authorization {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Authorization")
			.field("access_token", &"<redacted>")
			.field("expires_in", &self.expires_in)
			.finish()
	}
}

#[derive(Debug, Serialize)]
struct AuthorizeBody<'a> {
	#[serde(rename = "_resourceId")]
	resource_id: &'a str,
	#[serde(rename = "resourceType")]
	resource_type: &'a str,
	#[serde(rename = "_grantorId")]
	grantor_id: &'a str,
	#[serde(rename = "grantorType")]
	grantor_type: &'a str,
	#[serde(rename = "_appId")]
	app_id: &'a str,
	name: &'static str,
	#[serde(rename = "grantType")]
	grant_type: &'static str,
}

/// Cache key for a grantor: `{app_id}${grantor_id}`, or `{app_id}${grantor_type}${grantor_id}`
/// when `with_type` is set.
pub fn cache_key(app_id: &str, grantor_id: &str, grantor_type: &str, with_type: bool) -> String {
	if with_type {
		format!("{app_id}${grantor_type}${grantor_id}")
	} else {
		format!("{app_id}${grantor_id}")
	}
}

impl Client {
	/// Returns a bearer token for `grantor_id` acting as `grantor_type`.
	///
	/// Errors from the cache store are propagated unchanged; a failed upstream call caches
	/// nothing.
	pub async fn authorize(&self, grantor_id: &str, grantor_type: &str) -> Result<String> {
		const KIND: OpKind = OpKind::Authorize;

		let span = OpSpan::new(KIND, "authorize");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.authorize_cached(grantor_id, grantor_type)).await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	/// Calls the authorize endpoint directly, bypassing the cache.
	pub async fn fetch_authorization(
		&self,
		grantor_id: &str,
		grantor_type: &str,
	) -> Result<Authorization> {
		if grantor_id.is_empty() || grantor_type.is_empty() {
			return Err(ConfigError::MissingGrantor.into());
		}

		let inner = &self.inner;
		let self_token = inner.signer.sign_app_token(DEFAULT_APP_TOKEN_PERIOD)?;
		let body = AuthorizeBody {
			resource_id: grantor_id,
			resource_type: grantor_type,
			grantor_id,
			grantor_type,
			app_id: inner.options.app_id.as_str(),
			name: CLIENT_NAME,
			grant_type: GRANT_TYPE,
		};
		let body = serde_json::to_value(&body)
			.map_err(|source| ConfigError::InvalidRequestData { source })?;
		let url = url_join(&inner.options.host, AUTHORIZE_PATH)?;
		let mut request = HttpRequest::new(Method::Post, url, inner.options.timeout);

		request.headers = inner.base_headers.clone();
		request.headers.insert("authorization".into(), format!("Bearer {self_token}"));
		request.body = Some(body);

		retry::execute(inner.transport.as_ref(), &request, &inner.options.retry).await?.into_body()
	}

	async fn authorize_cached(&self, grantor_id: &str, grantor_type: &str) -> Result<String> {
		if grantor_id.is_empty() || grantor_type.is_empty() {
			return Err(ConfigError::MissingGrantor.into());
		}

		let options = &self.inner.options;
		let Some(store) = options.cache_store.as_deref() else {
			return Ok(self.fetch_authorization(grantor_id, grantor_type).await?.access_token);
		};
		let key = cache_key(&options.app_id, grantor_id, grantor_type, options.cache_key_with_type);

		if let Some(token) = cached_token(store, &key).await? {
			return Ok(token);
		}
		if !options.single_flight {
			return self.fetch_and_cache(store, &key, grantor_id, grantor_type).await;
		}

		let guard = self.inner.flow_guard(&key);
		let result = async {
			let _singleflight = guard.lock().await;

			// A concurrent holder of the guard may have filled the cache while we waited.
			if let Some(token) = cached_token(store, &key).await? {
				return Ok(token);
			}

			self.fetch_and_cache(store, &key, grantor_id, grantor_type).await
		}
		.await;

		self.inner.release_flow_guard(&key, guard);

		result
	}

	async fn fetch_and_cache(
		&self,
		store: &dyn CacheStore,
		key: &str,
		grantor_id: &str,
		grantor_type: &str,
	) -> Result<String> {
		let authorization = self.fetch_authorization(grantor_id, grantor_type).await?;
		let ttl = authorization.cache_ttl();

		if ttl > 0 {
			store.set(key, &authorization.access_token, ttl).await?;
		}

		Ok(authorization.access_token)
	}
}

async fn cached_token(store: &dyn CacheStore, key: &str) -> Result<Option<String>> {
	let token = store.get(key).await?.filter(|token| !token.is_empty());

	if token.is_some() {
		obs::record_op_outcome(OpKind::Authorize, OpOutcome::CacheHit);
	}

	Ok(token)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn authorization(expires_in: u64) -> Authorization {
		Authorization { access_token: "T1".into(), expires_in }
	}

	#[test]
	fn cache_ttl_keeps_safety_gap() {
		assert_eq!(authorization(3600).cache_ttl(), 3558);
		assert_eq!(authorization(43).cache_ttl(), 1);
		assert_eq!(authorization(42).cache_ttl(), 41);
		assert_eq!(authorization(1).cache_ttl(), 0);
		assert_eq!(authorization(0).cache_ttl(), 0);
	}

	#[test]
	fn cache_key_optionally_includes_type() {
		let app = "59294da476d70b4b83fa91a5";

		assert_eq!(cache_key(app, "X", "user", false), format!("{app}$X"));
		assert_eq!(cache_key(app, "X", "user", true), format!("{app}$user$X"));
		assert_ne!(cache_key(app, "X", "self", true), cache_key(app, "X", "user", true));
		assert_eq!(cache_key(app, "X", "self", false), cache_key(app, "X", "user", false));
	}

	#[test]
	fn authorize_body_uses_wire_names() {
		let body = AuthorizeBody {
			resource_id: "g",
			resource_type: "user",
			grantor_id: "g",
			grantor_type: "user",
			app_id: "a",
			name: CLIENT_NAME,
			grant_type: GRANT_TYPE,
		};
		let value = serde_json::to_value(&body).expect("Authorize body should serialize.");

		assert_eq!(
			value,
			serde_json::json!({
				"_resourceId": "g",
				"resourceType": "user",
				"_grantorId": "g",
				"grantorType": "user",
				"_appId": "a",
				"name": "tws-auth",
				"grantType": "client_credentials",
			})
		);
	}

	#[test]
	fn authorization_debug_hides_token() {
		assert!(!format!("{:?}", authorization(60)).contains("T1"));
	}
}
