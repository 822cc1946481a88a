//! Authenticated request façade.
//!
//! A [`Client`] is cheap to clone: secrets, the cache store, and the transport live behind one
//! shared [`Arc`], while the host, header, query, and option overlays are owned per value. Every
//! `with_*` method returns a new client and leaves the receiver untouched.

// self
use crate::{
	_prelude::*,
	authorize::SELF_GRANTOR_TYPE,
	config::{AppId, ClientOptions},
	error::ConfigError,
	http::{ErrorCode, Headers, HttpRequest, HttpTransport, Method, Query, url_join},
	jwt::{Payload, TokenSigner},
	obs::{self, OpKind, OpOutcome, OpSpan},
	response::Response,
	retry::{self, RetryPolicy},
	store::CacheStore,
	ua,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Tenant type used by [`Client::with_tenant`].
pub const DEFAULT_TENANT_TYPE: &str = "organization";

/// Per-call transport overrides applied by [`Client::with_options`].
///
/// Unset fields keep the value inherited from the receiving client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
	/// Per-attempt timeout.
	pub timeout: Option<Duration>,
	/// Delay between retries.
	pub retry_delay: Option<Duration>,
	/// Attempt bound.
	pub max_attempts: Option<u32>,
	/// Retriable network codes.
	pub retry_error_codes: Option<Vec<ErrorCode>>,
}
impl RequestOptions {
	/// Sets the per-attempt timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Sets the delay between retries.
	pub fn retry_delay(mut self, delay: Duration) -> Self {
		self.retry_delay = Some(delay);

		self
	}

	/// Sets the attempt bound.
	pub fn max_attempts(mut self, max: u32) -> Self {
		self.max_attempts = Some(max);

		self
	}

	/// Sets the retriable network codes.
	pub fn retry_error_codes(mut self, codes: impl IntoIterator<Item = ErrorCode>) -> Self {
		self.retry_error_codes = Some(codes.into_iter().collect());

		self
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RequestSettings {
	pub(crate) timeout: Duration,
	pub(crate) retry: RetryPolicy,
}

pub(crate) struct ClientInner {
	pub(crate) options: ClientOptions,
	pub(crate) signer: TokenSigner,
	pub(crate) transport: Arc<dyn HttpTransport>,
	pub(crate) base_headers: Headers,
	pub(crate) flow_guards: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}
impl ClientInner {
	pub(crate) fn flow_guard(&self, key: &str) -> Arc<AsyncMutex<()>> {
		let mut guards = self.flow_guards.lock();

		guards.entry(key.to_owned()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}

	/// Drops `guard` and forgets the entry for `key` once no other caller holds it.
	pub(crate) fn release_flow_guard(&self, key: &str, guard: Arc<AsyncMutex<()>>) {
		let mut guards = self.flow_guards.lock();

		drop(guard);

		if guards.get(key).is_some_and(|entry| Arc::strong_count(entry) == 1) {
			guards.remove(key);
		}
	}
}

/// Teambition Web Service client.
#[derive(Clone)]
pub struct Client {
	pub(crate) inner: Arc<ClientInner>,
	host: Url,
	headers: Headers,
	query: Query,
	settings: RequestSettings,
}
impl Client {
	/// Builds a client backed by the default reqwest transport.
	#[cfg(feature = "reqwest")]
	pub fn new(options: ClientOptions) -> Result<Self> {
		let transport = ReqwestTransport::from_options(&options.pool, &options.tls)?;

		Self::with_transport(options, Arc::new(transport))
	}

	/// Builds a client on top of a caller-provided transport.
	pub fn with_transport(
		options: ClientOptions,
		transport: Arc<dyn HttpTransport>,
	) -> Result<Self> {
		let signer = TokenSigner::new(options.app_id.clone(), options.app_secrets.clone())?;
		let app = options.app_name.as_deref().zip(options.app_version.as_deref());
		let mut base_headers = Headers::new();

		base_headers.insert("user-agent".into(), ua::user_agent(app));

		let host = options.host.clone();
		let settings = RequestSettings { timeout: options.timeout, retry: options.retry.clone() };
		let inner = ClientInner {
			options,
			signer,
			transport,
			base_headers: base_headers.clone(),
			flow_guards: Default::default(),
		};

		Ok(Self {
			inner: Arc::new(inner),
			host,
			headers: base_headers,
			query: Query::new(),
			settings,
		})
	}

	/// Configuration the client was built from.
	pub fn options(&self) -> &ClientOptions {
		&self.inner.options
	}

	/// Application identifier.
	pub fn app_id(&self) -> &AppId {
		&self.inner.options.app_id
	}

	/// Base URL requests are resolved against.
	pub fn host(&self) -> &Url {
		&self.host
	}

	/// Headers sent with every request, keyed by lower-cased name.
	pub fn headers(&self) -> &Headers {
		&self.headers
	}

	/// Query parameters sent with every request.
	pub fn query(&self) -> &Query {
		&self.query
	}

	/// Per-attempt timeout in effect.
	pub fn timeout(&self) -> Duration {
		self.settings.timeout
	}

	/// Retry policy in effect.
	pub fn retry_policy(&self) -> &RetryPolicy {
		&self.settings.retry
	}

	/// Token signer shared by every derived client.
	pub fn signer(&self) -> &TokenSigner {
		&self.inner.signer
	}

	/// Token cache, when configured.
	pub fn cache_store(&self) -> Option<&Arc<dyn CacheStore>> {
		self.inner.options.cache_store.as_ref()
	}

	/// Returns a client that resolves request paths against `host`.
	///
	/// Token acquisition keeps using the configured auth host.
	pub fn with_host(&self, host: &str) -> Result<Self> {
		if host.is_empty() {
			return Err(ConfigError::MissingHost.into());
		}

		let host = Url::parse(host)
			.map_err(|source| ConfigError::InvalidUrl { value: host.to_owned(), source })?;
		let mut client = self.clone();

		client.host = host;

		Ok(client)
	}

	/// Returns a client that sends `headers` in addition to the inherited ones.
	pub fn with_headers<I, K, V>(&self, headers: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: Into<String>,
	{
		let mut client = self.clone();

		for (name, value) in headers {
			client.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
		}

		client
	}

	/// Returns a client that identifies as `user_agent`.
	pub fn with_user_agent(&self, user_agent: impl Into<String>) -> Self {
		self.with_headers([("user-agent", user_agent.into())])
	}

	/// Returns a client that sends `query` in addition to the inherited parameters.
	pub fn with_query<I, K, V>(&self, query: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let mut client = self.clone();

		client.query.extend(query.into_iter().map(|(k, v)| (k.into(), v.into())));

		client
	}

	/// Returns a client with transport overrides applied.
	pub fn with_options(&self, options: RequestOptions) -> Self {
		let mut client = self.clone();
		let settings = &mut client.settings;

		if let Some(timeout) = options.timeout {
			settings.timeout = timeout;
		}
		if let Some(delay) = options.retry_delay {
			settings.retry.retry_delay = delay;
		}
		if let Some(max) = options.max_attempts {
			settings.retry.max_attempts = max;
		}
		if let Some(codes) = options.retry_error_codes {
			settings.retry.retry_error_codes = codes;
		}

		client
	}

	/// Returns a client scoped to an organization tenant.
	pub fn with_tenant(&self, tenant_id: impl Into<String>) -> Self {
		self.with_tenant_of_type(tenant_id, DEFAULT_TENANT_TYPE)
	}

	/// Returns a client scoped to a tenant of the given type.
	pub fn with_tenant_of_type(
		&self,
		tenant_id: impl Into<String>,
		tenant_type: impl Into<String>,
	) -> Self {
		self.with_headers([
			("x-tenant-id", tenant_id.into()),
			("x-tenant-type", tenant_type.into()),
		])
	}

	/// Returns a client acting on behalf of `operator_id`.
	pub fn with_operator(&self, operator_id: impl Into<String>) -> Self {
		self.with_headers([("x-operator-id", operator_id.into())])
	}

	/// Signs `payload` with the primary secret.
	pub fn sign_token<T>(&self, payload: &T) -> Result<String>
	where
		T: Serialize,
	{
		self.inner.signer.sign(payload)
	}

	/// Signs a periodical app token (see [`TokenSigner::sign_app_token`]).
	pub fn sign_app_token(&self, period: u64) -> Result<String> {
		self.inner.signer.sign_app_token(period)
	}

	/// Decodes a token without verifying its signature.
	pub fn decode_token(&self, token: &str) -> Result<Payload> {
		self.inner.signer.decode(token)
	}

	/// Verifies a token against every configured secret.
	pub fn verify_token(&self, token: &str) -> Result<Payload> {
		self.inner.signer.verify(token)
	}

	/// Issues a request authenticated with the application's own access token.
	pub async fn request<D>(&self, method: Method, path: &str, data: D) -> Result<Response>
	where
		D: Serialize,
	{
		const KIND: OpKind = OpKind::Request;

		let data = request_data(data)?;
		let span = OpSpan::new(KIND, "request");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let token = self.authorize(self.app_id(), SELF_GRANTOR_TYPE).await?;
				let request = self.build_request(method, path, data, &[token.as_str()])?;

				self.send(&request).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	/// Issues a request authenticated with an explicit bearer token.
	pub async fn request_with_token<D>(
		&self,
		method: Method,
		path: &str,
		data: D,
		token: &str,
	) -> Result<Response>
	where
		D: Serialize,
	{
		self.request_with_tokens(method, path, data, &[token]).await
	}

	/// Issues a request carrying several principals' tokens, joined as `Bearer t1, t2`.
	pub async fn request_with_tokens<D>(
		&self,
		method: Method,
		path: &str,
		data: D,
		tokens: &[&str],
	) -> Result<Response>
	where
		D: Serialize,
	{
		let data = request_data(data)?;
		let request = self.build_request(method, path, data, tokens)?;

		self.send(&request).await
	}

	/// `GET` with the application's own token; `data` is merged into the query string.
	pub async fn get<T, D>(&self, path: &str, data: D) -> Result<T>
	where
		T: DeserializeOwned,
		D: Serialize,
	{
		self.request(Method::Get, path, data).await?.into_body()
	}

	/// `POST` with the application's own token.
	pub async fn post<T, D>(&self, path: &str, data: D) -> Result<T>
	where
		T: DeserializeOwned,
		D: Serialize,
	{
		self.request(Method::Post, path, data).await?.into_body()
	}

	/// `PUT` with the application's own token.
	pub async fn put<T, D>(&self, path: &str, data: D) -> Result<T>
	where
		T: DeserializeOwned,
		D: Serialize,
	{
		self.request(Method::Put, path, data).await?.into_body()
	}

	/// `PATCH` with the application's own token.
	pub async fn patch<T, D>(&self, path: &str, data: D) -> Result<T>
	where
		T: DeserializeOwned,
		D: Serialize,
	{
		self.request(Method::Patch, path, data).await?.into_body()
	}

	/// `DELETE` with the application's own token.
	pub async fn delete<T, D>(&self, path: &str, data: D) -> Result<T>
	where
		T: DeserializeOwned,
		D: Serialize,
	{
		self.request(Method::Delete, path, data).await?.into_body()
	}

	/// Assembles the outgoing request from the client overlays, the bearer tokens, and `data`.
	pub fn build_request(
		&self,
		method: Method,
		path: &str,
		data: Option<JsonValue>,
		tokens: &[&str],
	) -> Result<HttpRequest> {
		let url = url_join(&self.host, path)?;
		let mut request = HttpRequest::new(method, url, self.settings.timeout);

		request.headers = self.headers.clone();
		request.query = self.query.clone();

		if !tokens.is_empty() {
			request.headers.insert("authorization".into(), format!("Bearer {}", tokens.join(", ")));
		}

		match (method, data) {
			(_, None) => {},
			(Method::Get, Some(JsonValue::Object(map))) =>
				for (key, value) in map {
					let value = match value {
						JsonValue::String(s) => s,
						other => other.to_string(),
					};

					request.query.insert(key, value);
				},
			(Method::Get, Some(_)) => return Err(ConfigError::InvalidQueryData.into()),
			(_, Some(body)) => request.body = Some(body),
		}

		Ok(request)
	}

	/// Runs a prepared request through the retry executor with this client's policy.
	pub async fn send(&self, request: &HttpRequest) -> Result<Response> {
		retry::execute(self.inner.transport.as_ref(), request, &self.settings.retry).await
	}
}
impl Debug for Client {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("app_id", self.app_id())
			.field("host", &self.host.as_str())
			.field("headers", &self.headers)
			.field("query", &self.query)
			.field("timeout", &self.settings.timeout)
			.field("retry", &self.settings.retry)
			.finish_non_exhaustive()
	}
}

fn request_data<D>(data: D) -> Result<Option<JsonValue>>
where
	D: Serialize,
{
	let value =
		serde_json::to_value(data).map_err(|source| ConfigError::InvalidRequestData { source })?;

	Ok(if value.is_null() { None } else { Some(value) })
}
