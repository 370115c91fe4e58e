// self
use crate::{_prelude::*, obs::SessionOp};

/// Runs `f` inside a `session_core.op` span tagged with the operation and stage.
pub fn in_op_span<T>(op: SessionOp, stage: &'static str, f: impl FnOnce() -> T) -> T {
	#[cfg(feature = "tracing")]
	{
		tracing::info_span!("session_core.op", op = op.as_str(), stage).in_scope(f)
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (op, stage);

		f()
	}
}

/// Awaits `fut` inside a `session_core.op` span without holding a guard across `.await` points.
pub async fn instrument_op<Fut>(op: SessionOp, stage: &'static str, fut: Fut) -> Fut::Output
where
	Fut: Future,
{
	#[cfg(feature = "tracing")]
	{
		use tracing::Instrument;

		fut.instrument(tracing::info_span!("session_core.op", op = op.as_str(), stage)).await
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (op, stage);

		fut.await
	}
}

/// Logs why a token or request was refused. The reason stays server-side.
pub fn log_rejection(reason: &'static str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(reason, "request rejected");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = reason;
	}
}

/// Logs an admission rejection together with the limited key.
pub fn log_admission_rejection(key: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(key = %key, "admission rejected");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = key;
	}
}

/// Logs a failure that left durable state half-updated.
pub fn log_partial_failure(op: SessionOp, detail: &'static str, error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(op = op.as_str(), detail, error = %error, "partial failure");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (op, detail, error);
	}
}
