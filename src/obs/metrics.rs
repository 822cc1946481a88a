// self
use crate::{
	http::ErrorCode,
	obs::{OpKind, OpOutcome},
};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"tws_auth_op_total",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Counts a retry scheduled after a whitelisted network failure.
pub fn record_retry_metric(code: ErrorCode) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("tws_auth_retry_total", "code" => code.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = code;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_metrics() {
		record_op_outcome(OpKind::Authorize, OpOutcome::CacheHit);
		record_retry_metric(ErrorCode::ConnectionRefused);
	}
}
