// self
use crate::{_prelude::*, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by broker operations.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("identity_broker.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs a failed operation.
///
/// Internal errors are logged at `error` with their full cause chain; user-facing errors are
/// expected outcomes and only logged at `debug`.
pub fn log_failure(kind: FlowKind, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		if error.is_user_facing() {
			tracing::debug!(flow = kind.as_str(), error = %error, "operation rejected");
		} else {
			tracing::error!(
				flow = kind.as_str(),
				error = %error,
				causes = %cause_chain(error),
				"operation failed"
			);
		}
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, error);
	}
}

/// Renders every `source()` below `error`, joined with `: `.
pub fn cause_chain(error: &(dyn StdError + 'static)) -> String {
	let mut chain = Vec::new();
	let mut current = error.source();

	while let Some(cause) = current {
		chain.push(cause.to_string());
		current = cause.source();
	}

	chain.join(": ")
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn cause_chain_walks_sources() {
		let err: Error = StoreError::Backend { message: "disk full".into() }.into();

		assert_eq!(cause_chain(&err), "Backend failure: disk full.");
		assert_eq!(cause_chain(&Error::InvalidSession), "");

		log_failure(FlowKind::Info, &err);
	}

	#[cfg(feature = "tracing")]
	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = FlowSpan::new(FlowKind::Login, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
