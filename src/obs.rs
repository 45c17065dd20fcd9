//! Optional observability helpers for orchestrator flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `session_broker.flow` with the `flow`
//!   (operation) and `stage` (call site) fields.
//! - Enable `metrics` to increment the `session_broker_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Orchestrator operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Authorization URL construction.
	Login,
	/// Authorization code callback.
	Callback,
	/// Session refresh.
	Refresh,
	/// Access token validation.
	ValidateAccess,
	/// Access token to external identity resolution.
	ResolveIdentity,
	/// Access token to provider access secret resolution.
	ResolveProviderSecret,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Login => "login",
			FlowKind::Callback => "callback",
			FlowKind::Refresh => "refresh",
			FlowKind::ValidateAccess => "validate_access",
			FlowKind::ResolveIdentity => "resolve_identity",
			FlowKind::ResolveProviderSecret => "resolve_provider_secret",
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
	/// Entry to an orchestrator operation.
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

	/// Terminal outcome of a finished call.
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure }
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
