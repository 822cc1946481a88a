//! Transport primitives for Teambition Web Service calls.
//!
//! The module exposes [`HttpTransport`] alongside the [`HttpRequest`] and [`RawResponse`]
//! envelopes so downstream crates can plug in custom HTTP stacks (or fakes in tests) without
//! losing retry classification. Implementations classify every network failure with an
//! [`ErrorCode`]; the retry executor only consults that code when deciding whether another
//! attempt is worthwhile.

// std
use std::{io::ErrorKind, ops::Deref, time::Instant};
// self
use crate::{
	_prelude::*,
	config::{PoolOptions, TlsOptions},
	error::{ConfigError, TransportError},
};

/// Header map keyed by lower-cased header names.
pub type Headers = BTreeMap<String, String>;
/// Query parameters merged into the request URL.
pub type Query = BTreeMap<String, String>;

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of performing a single exchange.
///
/// Implementations must not retry on their own; the executor in [`crate::retry`] owns the
/// attempt loop. Every failure must carry an [`ErrorCode`] so whitelisted network errors can
/// be told apart from everything else.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Performs exactly one HTTP exchange.
	fn send<'a>(&'a self, request: &'a HttpRequest) -> TransportFuture<'a>;
}

/// HTTP verbs used by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`; data is merged into the query string.
	Get,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
	/// `PATCH`.
	Patch,
	/// `DELETE`.
	Delete,
}
impl Method {
	/// Returns the upper-case wire representation.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Patch => "PATCH",
			Self::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Method {
	type Err = UnknownMethod;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"GET" => Ok(Self::Get),
			"POST" => Ok(Self::Post),
			"PUT" => Ok(Self::Put),
			"PATCH" => Ok(Self::Patch),
			"DELETE" => Ok(Self::Delete),
			_ => Err(UnknownMethod(s.to_owned())),
		}
	}
}

/// Error returned when parsing an unsupported HTTP method.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unsupported HTTP method `{0}`.")]
pub struct UnknownMethod(pub String);

/// Network error codes recognized by the retry whitelist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
	/// Connection reset by peer.
	#[serde(rename = "ECONNRESET")]
	ConnectionReset,
	/// DNS lookup found no such host.
	#[serde(rename = "ENOTFOUND")]
	NotFound,
	/// Socket went idle past the per-attempt timeout.
	#[serde(rename = "ESOCKETTIMEDOUT")]
	SocketTimeout,
	/// Connection could not be established before the timeout.
	#[serde(rename = "ETIMEDOUT")]
	ConnectTimeout,
	/// Connection refused by the remote host.
	#[serde(rename = "ECONNREFUSED")]
	ConnectionRefused,
	/// Remote host or network unreachable.
	#[serde(rename = "EHOSTUNREACH")]
	HostUnreachable,
	/// Write to a closed connection.
	#[serde(rename = "EPIPE")]
	BrokenPipe,
	/// DNS lookup failed temporarily.
	#[serde(rename = "EAI_AGAIN")]
	DnsRetry,
	/// Anything else (TLS, malformed response, request building). Never retried by default.
	#[serde(rename = "UNKNOWN")]
	Unknown,
}
impl ErrorCode {
	/// Returns the errno-style label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::ConnectionReset => "ECONNRESET",
			Self::NotFound => "ENOTFOUND",
			Self::SocketTimeout => "ESOCKETTIMEDOUT",
			Self::ConnectTimeout => "ETIMEDOUT",
			Self::ConnectionRefused => "ECONNREFUSED",
			Self::HostUnreachable => "EHOSTUNREACH",
			Self::BrokenPipe => "EPIPE",
			Self::DnsRetry => "EAI_AGAIN",
			Self::Unknown => "UNKNOWN",
		}
	}

	/// Maps an I/O error kind onto a code, when one applies.
	pub fn from_io_kind(kind: ErrorKind) -> Option<Self> {
		match kind {
			ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted =>
				Some(Self::ConnectionReset),
			ErrorKind::ConnectionRefused => Some(Self::ConnectionRefused),
			ErrorKind::BrokenPipe => Some(Self::BrokenPipe),
			ErrorKind::HostUnreachable | ErrorKind::NetworkUnreachable =>
				Some(Self::HostUnreachable),
			ErrorKind::TimedOut => Some(Self::SocketTimeout),
			_ => None,
		}
	}

	/// Maps error text (OS socket messages, `getaddrinfo` text) onto a code.
	pub fn from_message(message: &str) -> Option<Self> {
		let lower = message.to_ascii_lowercase();

		if lower.contains("connection refused") {
			return Some(Self::ConnectionRefused);
		}
		if lower.contains("connection reset") {
			return Some(Self::ConnectionReset);
		}
		if lower.contains("temporary failure in name resolution") || lower.contains("try again") {
			return Some(Self::DnsRetry);
		}
		if lower.contains("failed to lookup address")
			|| lower.contains("name or service not known")
			|| lower.contains("nodename nor servname")
			|| lower.contains("no address associated")
		{
			return Some(Self::NotFound);
		}

		None
	}

	/// Walks an error's source chain and returns the first recognizable code.
	pub fn classify(err: &(dyn StdError + 'static)) -> Option<Self> {
		let mut current = Some(err);

		while let Some(e) = current {
			if let Some(code) =
				e.downcast_ref::<std::io::Error>().and_then(|io| Self::from_io_kind(io.kind()))
			{
				return Some(code);
			}
			if let Some(code) = Self::from_message(&e.to_string()) {
				return Some(code);
			}

			current = e.source();
		}

		None
	}
}
impl Display for ErrorCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for ErrorCode {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(match s {
			"ECONNRESET" => Self::ConnectionReset,
			"ENOTFOUND" => Self::NotFound,
			"ESOCKETTIMEDOUT" => Self::SocketTimeout,
			"ETIMEDOUT" => Self::ConnectTimeout,
			"ECONNREFUSED" => Self::ConnectionRefused,
			"EHOSTUNREACH" => Self::HostUnreachable,
			"EPIPE" => Self::BrokenPipe,
			"EAI_AGAIN" => Self::DnsRetry,
			_ => Self::Unknown,
		})
	}
}

/// Outgoing request envelope handed to the transport.
#[derive(Clone)]
pub struct HttpRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL without the merged query string.
	pub url: Url,
	/// Headers keyed by lower-cased name.
	pub headers: Headers,
	/// Query parameters appended to `url`.
	pub query: Query,
	/// JSON body, when the method carries one.
	pub body: Option<JsonValue>,
	/// Timeout for this single attempt.
	pub timeout: Duration,
}
impl HttpRequest {
	/// Creates a bare request with no headers, query, or body.
	pub fn new(method: Method, url: Url, timeout: Duration) -> Self {
		Self { method, url, headers: Headers::new(), query: Query::new(), body: None, timeout }
	}
}
impl Debug for HttpRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers = self
			.headers
			.iter()
			.map(|(name, value)| {
				if name == "authorization" {
					(name.as_str(), "<redacted>")
				} else {
					(name.as_str(), value.as_str())
				}
			})
			.collect::<Vec<_>>();

		f.debug_struct("HttpRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("headers", &headers)
			.field("query", &self.query)
			.field("body", &self.body.is_some())
			.field("timeout", &self.timeout)
			.finish()
	}
}

/// Time spent in the phases of a single exchange.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimingPhases {
	/// Time until response headers arrived.
	pub response: Duration,
	/// Time until the body was fully read.
	pub total: Duration,
}

/// Response as produced by a transport, before attempt metadata is attached.
#[derive(Clone, Debug, Default)]
pub struct RawResponse {
	/// HTTP status code.
	pub status: u16,
	/// Canonical reason phrase for `status`.
	pub status_text: String,
	/// Headers keyed by lower-cased name; repeated headers are joined with `, `.
	pub headers: Headers,
	/// Raw body bytes.
	pub body: Vec<u8>,
	/// Timing of the exchange.
	pub timing: TimingPhases,
}

/// Joins `path` onto `base` with exactly one `/` between them.
///
/// Absolute `http(s)://` paths are used untouched so callers can target other hosts.
pub fn url_join(base: &Url, path: &str) -> Result<Url, ConfigError> {
	let joined = if path.starts_with("http://") || path.starts_with("https://") {
		path.to_owned()
	} else if path.is_empty() {
		base.as_str().to_owned()
	} else {
		let base = base.as_str().trim_end_matches('/');

		if path.starts_with('/') { format!("{base}{path}") } else { format!("{base}/{path}") }
	};

	Url::parse(&joined).map_err(|source| ConfigError::InvalidUrl { value: joined, source })
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Redirects are never followed; every other knob (pool, TLS) comes from
/// [`ReqwestTransport::from_options`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a reqwest client from pool sizing and TLS material.
	pub fn from_options(pool: &PoolOptions, tls: &TlsOptions) -> Result<Self, ConfigError> {
		let mut builder = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.pool_max_idle_per_host(pool.max_idle_per_host)
			.danger_accept_invalid_certs(!tls.strict_ssl);

		if let Some(idle) = pool.idle_timeout {
			builder = builder.pool_idle_timeout(idle);
		}
		for (index, pem) in tls.root_certs.iter().enumerate() {
			let certs = reqwest::Certificate::from_pem_bundle(pem)
				.map_err(|_| ConfigError::InvalidRootCert { index })?;

			if certs.is_empty() {
				return Err(ConfigError::InvalidRootCert { index });
			}
			for cert in certs {
				builder = builder.add_root_certificate(cert);
			}
		}

		match (&tls.cert_chain, &tls.private_key) {
			(Some(cert), Some(key)) => {
				let mut pem = cert.clone();

				pem.push(b'\n');
				pem.extend_from_slice(key);

				builder = builder.identity(reqwest::Identity::from_pem(&pem)?);
			},
			(None, None) => {},
			_ => return Err(ConfigError::IncompleteIdentity),
		}

		Ok(Self(builder.build()?))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send<'a>(&'a self, request: &'a HttpRequest) -> TransportFuture<'a> {
		Box::pin(async move {
			let started = Instant::now();
			let method = match request.method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
				Method::Put => reqwest::Method::PUT,
				Method::Patch => reqwest::Method::PATCH,
				Method::Delete => reqwest::Method::DELETE,
			};
			let mut builder = self.0.request(method, request.url.clone()).timeout(request.timeout);

			if !request.query.is_empty() {
				builder = builder.query(&request.query);
			}
			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = &request.body {
				let bytes = serde_json::to_vec(body)
					.map_err(|e| TransportError::with_source(ErrorCode::Unknown, e))?;

				builder =
					builder.header(reqwest::header::CONTENT_TYPE, "application/json").body(bytes);
			}

			let response = builder.send().await.map_err(map_reqwest_error)?;
			let response_at = started.elapsed();
			let status = response.status();
			let headers = collect_headers(response.headers());
			let body = response.bytes().await.map_err(map_reqwest_error)?.to_vec();

			Ok(RawResponse {
				status: status.as_u16(),
				status_text: status.canonical_reason().unwrap_or_default().to_owned(),
				headers,
				body,
				timing: TimingPhases { response: response_at, total: started.elapsed() },
			})
		})
	}
}

#[cfg(feature = "reqwest")]
fn collect_headers(map: &reqwest::header::HeaderMap) -> Headers {
	let mut headers = Headers::new();

	for (name, value) in map {
		let value = String::from_utf8_lossy(value.as_bytes());

		headers
			.entry(name.as_str().to_owned())
			.and_modify(|existing| {
				existing.push_str(", ");
				existing.push_str(&value);
			})
			.or_insert_with(|| value.into_owned());
	}

	headers
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(err: ReqwestError) -> TransportError {
	let code = classify_reqwest_error(&err);

	TransportError::with_source(code, err)
}

#[cfg(feature = "reqwest")]
fn classify_reqwest_error(err: &ReqwestError) -> ErrorCode {
	if err.is_timeout() {
		return if err.is_connect() { ErrorCode::ConnectTimeout } else { ErrorCode::SocketTimeout };
	}

	ErrorCode::classify(err).unwrap_or(ErrorCode::Unknown)
}

#[cfg(test)]
mod tests {
	// std
	use std::io;
	// self
	use super::*;

	#[derive(Debug, ThisError)]
	#[error("error trying to connect")]
	struct Wrapper(#[source] io::Error);

	#[test]
	fn url_join_normalizes_slashes() {
		let base = Url::parse("http://test.org/").expect("Base URL fixture should parse.");
		let nested = Url::parse("http://test.org/api/").expect("Nested URL fixture should parse.");

		assert_eq!(
			url_join(&base, "/v1/users").expect("Join should succeed.").as_str(),
			"http://test.org/v1/users"
		);
		assert_eq!(
			url_join(&base, "v1/users").expect("Join should succeed.").as_str(),
			"http://test.org/v1/users"
		);
		assert_eq!(
			url_join(&nested, "/v1/users:getByEmail")
				.expect("Join should keep the base path.")
				.as_str(),
			"http://test.org/api/v1/users:getByEmail"
		);
		assert_eq!(
			url_join(&base, "https://other.org/x")
				.expect("Absolute URLs should pass through.")
				.as_str(),
			"https://other.org/x"
		);
	}

	#[test]
	fn method_parses_case_insensitively() {
		assert_eq!("patch".parse::<Method>(), Ok(Method::Patch));
		assert_eq!(Method::Delete.to_string(), "DELETE");
		assert!("TRACE".parse::<Method>().is_err());
	}

	#[test]
	fn error_codes_classify_io_chains() {
		let refused = Wrapper(io::Error::from(io::ErrorKind::ConnectionRefused));
		let reset = Wrapper(io::Error::from(io::ErrorKind::ConnectionReset));
		let other = Wrapper(io::Error::other("tls handshake eof"));

		assert_eq!(ErrorCode::classify(&refused), Some(ErrorCode::ConnectionRefused));
		assert_eq!(ErrorCode::classify(&reset), Some(ErrorCode::ConnectionReset));
		assert_eq!(ErrorCode::classify(&other), None);
	}

	#[test]
	fn error_codes_classify_messages() {
		assert_eq!(
			ErrorCode::from_message(
				"failed to lookup address information: Name or service not known"
			),
			Some(ErrorCode::NotFound)
		);
		assert_eq!(
			ErrorCode::from_message(
				"failed to lookup address information: Temporary failure in name resolution"
			),
			Some(ErrorCode::DnsRetry)
		);
		assert_eq!(
			ErrorCode::from_message("tcp connect error: Connection refused (os error 111)"),
			Some(ErrorCode::ConnectionRefused)
		);
		assert_eq!(ErrorCode::from_message("certificate expired"), None);
	}

	#[test]
	fn error_codes_use_errno_labels() {
		let json = serde_json::to_string(&ErrorCode::DnsRetry)
			.expect("ErrorCode should serialize to JSON.");

		assert_eq!(json, "\"EAI_AGAIN\"");
		assert_eq!("EPIPE".parse::<ErrorCode>(), Ok(ErrorCode::BrokenPipe));
		assert_eq!(ErrorCode::ConnectTimeout.to_string(), "ETIMEDOUT");
	}

	#[test]
	fn request_debug_redacts_authorization() {
		let url = Url::parse("http://test.org/v1").expect("URL fixture should parse.");
		let mut request = HttpRequest::new(Method::Get, url, Duration::from_secs(1));

		request.headers.insert("authorization".into(), "Bearer secret-token".into());

		let rendered = format!("{request:?}");

		assert!(rendered.contains("<redacted>"));
		assert!(!rendered.contains("secret-token"));
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn transport_rejects_unparsable_root_cert() {
		let tls = TlsOptions {
			root_certs: vec![b"garbage".to_vec()],
			strict_ssl: true,
			..Default::default()
		};
		let err = ReqwestTransport::from_options(&PoolOptions::default(), &tls)
			.expect_err("A root certificate without PEM blocks must be rejected.");

		assert!(matches!(err, ConfigError::InvalidRootCert { index: 0 }));
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn transport_rejects_half_identity() {
		let tls = TlsOptions {
			cert_chain: Some(b"-----BEGIN CERTIFICATE-----".to_vec()),
			strict_ssl: true,
			..Default::default()
		};
		let err = ReqwestTransport::from_options(&PoolOptions::default(), &tls)
			.expect_err("A certificate chain without a private key must be rejected.");

		assert!(matches!(err, ConfigError::IncompleteIdentity));
	}
}
