//! Optional observability helpers for session operations and admission checks.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (default) to emit structured spans named `session_core.op` with the `op`
//!   and `stage` fields. Token rejection reasons are logged at `debug` inside the span and never
//!   returned to callers; partial failures are logged at `warn`.
//! - Enable `metrics` to increment `session_core_op_total` for every attempt/success/failure,
//!   labeled by `op` + `outcome`, and `session_core_admission_total` labeled by `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Session operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionOp {
	/// Pair issuance after registration.
	Register,
	/// Pair issuance after a successful login.
	Login,
	/// Refresh-token rotation.
	Refresh,
	/// Single refresh-token revocation.
	Logout,
	/// Password change followed by bulk revocation.
	ChangePassword,
	/// Access-token identity extraction.
	Authenticate,
}
impl SessionOp {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SessionOp::Register => "register",
			SessionOp::Login => "login",
			SessionOp::Refresh => "refresh",
			SessionOp::Logout => "logout",
			SessionOp::ChangePassword => "change_password",
			SessionOp::Authenticate => "authenticate",
		}
	}
}
impl Display for SessionOp {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
