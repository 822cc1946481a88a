//! Bounded retry executor for transient network failures.
//!
//! Only failures whose [`ErrorCode`] appears in the policy whitelist are retried. HTTP error
//! statuses are responses, not failures, and are returned to the caller untouched.

// std
use std::time::Instant;
// self
use crate::{
	_prelude::*,
	http::{ErrorCode, HttpRequest, HttpTransport},
	obs,
	response::Response,
};

/// Delay between attempts when none (or a too-small one) is configured.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(300);
/// Smallest accepted delay; anything below falls back to [`DEFAULT_RETRY_DELAY`].
pub const MIN_RETRY_DELAY: Duration = Duration::from_millis(10);
/// Attempts per request when none is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Upper bound applied to configured attempts.
pub const MAX_ATTEMPTS_LIMIT: u32 = 10;
/// Codes retried by default. Timeouts are excluded and must be opted in.
pub const DEFAULT_RETRY_ERROR_CODES: [ErrorCode; 6] = [
	ErrorCode::ConnectionReset,
	ErrorCode::NotFound,
	ErrorCode::ConnectionRefused,
	ErrorCode::HostUnreachable,
	ErrorCode::BrokenPipe,
	ErrorCode::DnsRetry,
];

/// Retry tuning shared by every request a client issues.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
	/// Constant delay between attempts, truncated to whole milliseconds.
	pub retry_delay: Duration,
	/// Maximum attempts including the first; `0` selects the default.
	pub max_attempts: u32,
	/// Network error codes considered transient.
	pub retry_error_codes: Vec<ErrorCode>,
}
impl RetryPolicy {
	/// Sets the delay between attempts.
	pub fn with_retry_delay(mut self, delay: Duration) -> Self {
		self.retry_delay = delay;

		self
	}

	/// Sets the maximum attempts.
	pub fn with_max_attempts(mut self, max: u32) -> Self {
		self.max_attempts = max;

		self
	}

	/// Replaces the retriable codes.
	pub fn with_retry_error_codes(mut self, codes: impl IntoIterator<Item = ErrorCode>) -> Self {
		self.retry_error_codes = codes.into_iter().collect();

		self
	}

	/// Delay actually slept between attempts.
	pub fn effective_delay(&self) -> Duration {
		let millis = u64::try_from(self.retry_delay.as_millis()).unwrap_or(u64::MAX);
		let delay = Duration::from_millis(millis);

		if delay < MIN_RETRY_DELAY { DEFAULT_RETRY_DELAY } else { delay }
	}

	/// Attempt bound actually enforced.
	pub fn effective_max_attempts(&self) -> u32 {
		match self.max_attempts {
			0 => DEFAULT_MAX_ATTEMPTS,
			n => n.min(MAX_ATTEMPTS_LIMIT),
		}
	}

	/// Returns `true` when `code` is whitelisted.
	pub fn is_retriable(&self, code: ErrorCode) -> bool {
		self.retry_error_codes.contains(&code)
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			retry_delay: DEFAULT_RETRY_DELAY,
			max_attempts: DEFAULT_MAX_ATTEMPTS,
			retry_error_codes: DEFAULT_RETRY_ERROR_CODES.to_vec(),
		}
	}
}

/// Performs `request` through `transport`, retrying whitelisted network failures.
///
/// Both the returned [`Response`] and a terminal [`Error::Transport`] carry the number of
/// attempts made plus the original URL and method. No delay follows the final attempt.
pub async fn execute(
	transport: &dyn HttpTransport,
	request: &HttpRequest,
	policy: &RetryPolicy,
) -> Result<Response> {
	let max_attempts = policy.effective_max_attempts();
	let delay = policy.effective_delay();
	let started = Instant::now();
	let mut attempts = 0;

	loop {
		attempts += 1;

		let err = match transport.send(request).await {
			Ok(raw) => return Ok(Response::from_raw(raw, attempts, request, started.elapsed())),
			Err(e) => e,
		};

		if attempts >= max_attempts || !policy.is_retriable(err.code) {
			return Err(Error::Transport {
				attempts,
				original_url: request.url.to_string(),
				original_method: request.method,
				source: err,
			});
		}

		obs::record_retry_metric(err.code);
		obs::trace_retry(err.code, attempts, delay);

		tokio::time::sleep(delay).await;
	}
}
