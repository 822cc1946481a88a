//! Client-level error types shared by the executor, the coordinator, and the façade.

// self
use crate::{
	_prelude::*,
	http::{ErrorCode, Method},
	response::ApiError,
	store::StoreError,
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem; never retried.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Network-layer failure that survived the retry loop (or was not retriable at all).
	#[error("{original_method} {original_url} failed after {attempts} attempt(s): {source}")]
	Transport {
		/// Number of attempts actually made.
		attempts: u32,
		/// URL of the original request, without query string.
		original_url: String,
		/// Method of the original request.
		original_method: Method,
		/// Failure reported by the transport on the last attempt.
		#[source]
		source: TransportError,
	},
	/// Token verification failed against every configured secret.
	#[error("Token verification failed: {source}.")]
	Unauthorized {
		/// Verification error raised by the last secret tried.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// Token could not be decoded as a JWT.
	#[error("Token could not be decoded: {source}.")]
	MalformedToken {
		/// Underlying decoding failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// Upstream answered with a non-2xx status or an error envelope.
	#[error(transparent)]
	Api(#[from] Box<ApiError>),
	/// A successful response body did not match the expected shape.
	#[error("Response body from {original_method} {original_url} could not be decoded.")]
	Decode {
		/// URL of the original request.
		original_url: String,
		/// Method of the original request.
		original_method: Method,
		/// Structured parsing failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Cache store failure; propagated unchanged.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		StoreError,
	),
}
impl Error {
	/// HTTP status associated with the failure, when one exists.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Api(err) => Some(err.status),
			Self::Unauthorized { .. } => Some(401),
			_ => None,
		}
	}

	/// Machine-readable error code (`"UserNotFound"`, `"ECONNREFUSED"`, ...).
	pub fn code(&self) -> Option<&str> {
		match self {
			Self::Api(err) => Some(&err.code),
			Self::Transport { source, .. } => Some(source.code.as_str()),
			Self::Unauthorized { .. } => Some("Unauthorized"),
			_ => None,
		}
	}

	/// Number of HTTP attempts made before the failure surfaced.
	pub fn attempts(&self) -> Option<u32> {
		match self {
			Self::Transport { attempts, .. } => Some(*attempts),
			Self::Api(err) => Some(err.attempts),
			_ => None,
		}
	}
}
impl From<ApiError> for Error {
	fn from(e: ApiError) -> Self {
		Self::Api(Box::new(e))
	}
}

/// Configuration and validation failures raised at construction time.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// The application identifier is not a 24-character hex object id.
	#[error("appId: {value} is not a valid mongo object id.")]
	InvalidAppId {
		/// Rejected identifier.
		value: String,
	},
	/// No application secret was configured.
	#[error("appSecrets required.")]
	MissingAppSecrets,
	/// The host was explicitly set to an empty string.
	#[error("host required.")]
	MissingHost,
	/// A host or request URL cannot be parsed.
	#[error("URL `{value}` is invalid.")]
	InvalidUrl {
		/// Rejected URL text.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Only one half of the client TLS identity was supplied.
	#[error("certChain and privateKey must be supplied together.")]
	IncompleteIdentity,
	/// A trusted root certificate buffer holds no parsable PEM certificate.
	#[error("rootCerts[{index}] contains no valid PEM certificate.")]
	InvalidRootCert {
		/// Position of the rejected buffer among the configured root certificates.
		index: usize,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Authorization requires both a grantor id and a grantor type.
	#[error("_grantorId and grantorType required.")]
	MissingGrantor,
	/// Request data could not be serialized to JSON.
	#[error("Request data could not be serialized.")]
	InvalidRequestData {
		/// Serialization failure.
		#[source]
		source: serde_json::Error,
	},
	/// GET data must be a JSON object so it can be merged into the query string.
	#[error("GET data must be a JSON object.")]
	InvalidQueryData,
	/// Token signing failed.
	#[error("Token could not be signed.")]
	TokenSign {
		/// Underlying signing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Network-layer failure reported by an [`HttpTransport`](crate::http::HttpTransport).
#[derive(Debug, ThisError)]
#[error("{code}: {message}")]
pub struct TransportError {
	/// Classified error code used by the retry whitelist.
	pub code: ErrorCode,
	/// Human-readable description.
	pub message: String,
	/// Transport-specific cause, if any.
	#[source]
	pub source: Option<BoxError>,
}
impl TransportError {
	/// Creates an error without an underlying cause.
	pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
		Self { code, message: message.into(), source: None }
	}

	/// Wraps a transport-specific error under the provided code.
	pub fn with_source(code: ErrorCode, src: impl 'static + Send + Sync + StdError) -> Self {
		Self { code, message: src.to_string(), source: Some(Box::new(src)) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn transport_error_exposes_code_and_attempts() {
		let err = Error::Transport {
			attempts: 3,
			original_url: "http://127.0.0.1:1/".into(),
			original_method: Method::Get,
			source: TransportError::new(ErrorCode::ConnectionRefused, "connection refused"),
		};

		assert_eq!(err.code(), Some("ECONNREFUSED"));
		assert_eq!(err.attempts(), Some(3));
		assert_eq!(err.status(), None);
		assert!(err.to_string().starts_with("GET http://127.0.0.1:1/ failed after 3 attempt(s)"));
	}

	#[test]
	fn store_error_converts_with_source() {
		let store_error = StoreError::Backend { message: "redis unreachable".into() };
		let err: Error = store_error.clone().into();

		assert!(matches!(err, Error::Storage(_)));
		assert!(err.to_string().contains("redis unreachable"));

		let source =
			StdError::source(&err).expect("Client error should expose the store error as source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
