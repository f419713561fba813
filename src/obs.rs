//! Optional observability helpers for pipeline flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `authflight.flow` with the `flow` and
//!   `stage` (call site) fields, plus debug/warn events for leader elections, follower
//!   waits, retries, and refresh failures.
//! - Enable `metrics` to increment the `authflight_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

pub(crate) use self::tracing::event;

// self
use crate::_prelude::*;

/// Flow kinds observed by the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Protected request sent through the pipeline.
	Send,
	/// Refresh wave driven by the coordinator.
	Refresh,
	/// Sign-in against the auth route.
	SignIn,
	/// Sign-up against the auth route.
	SignUp,
	/// Sign-up field validation against the auth route.
	ValidateSignUp,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Send => "send",
			FlowKind::Refresh => "refresh",
			FlowKind::SignIn => "sign_in",
			FlowKind::SignUp => "sign_up",
			FlowKind::ValidateSignUp => "validate_sign_up",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a pipeline helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records the terminal outcome of `result` for `kind`.
pub fn record_result<T, E>(kind: FlowKind, result: &std::result::Result<T, E>) {
	match result {
		Ok(_) => record_flow_outcome(kind, FlowOutcome::Success),
		Err(_) => record_flow_outcome(kind, FlowOutcome::Failure),
	}
}
