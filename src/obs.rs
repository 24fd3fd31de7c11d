//! Observability helpers for broker operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `identity_broker.flow` with the `flow` (operation) and
//!   `stage` (call site) fields, and to log failures.
//! - Enable `metrics` to increment the `identity_broker_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Broker operations observed by the instrumentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Provider login (and registration).
	Login,
	/// Linking a provider to a signed-in account.
	AddProvider,
	/// Unlinking a provider.
	RemoveProvider,
	/// Account info lookup.
	Info,
	/// Display-name change.
	UpdateName,
	/// Public display-name lookup.
	DisplayName,
	/// Authorize URL construction.
	StartAuthorization,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Login => "login",
			FlowKind::AddProvider => "add_provider",
			FlowKind::RemoveProvider => "remove_provider",
			FlowKind::Info => "info",
			FlowKind::UpdateName => "update_name",
			FlowKind::DisplayName => "display_name",
			FlowKind::StartAuthorization => "start_authorization",
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
	/// Entry to a broker operation.
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
