//! Optional observability helpers for authorize and request operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `tws_auth.op` with the `op` and `stage`
//!   (call site) fields, plus `debug`/`warn` events for retries and cache store failures.
//! - Enable `metrics` to increment the `tws_auth_op_total` counter for every
//!   attempt/success/failure/cache hit, labeled by `op` + `outcome`, and the
//!   `tws_auth_retry_total` counter labeled by `code`.

mod metrics;
mod tracing;

pub use self::metrics::*;
pub use self::tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Token acquisition through the authorize endpoint (or the cache).
	Authorize,
	/// Authenticated resource request.
	Request,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::Authorize => "authorize",
			OpKind::Request => "request",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Token served from the cache store without an upstream call.
	CacheHit,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
			OpOutcome::CacheHit => "cache_hit",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
