// self
use crate::{_prelude::*, error::ErrorKind, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Span wrapping one orchestrator operation.
///
/// The span starts with `flow` and `stage`; `user` and `error` are filled in once known.
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
			let span = tracing::info_span!(
				"session_broker.flow",
				flow = kind.as_str(),
				stage,
				user = tracing::field::Empty,
				error = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Records the internal user the operation resolved to.
	pub fn record_user(&self, user: &str) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("user", user);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = user;
		}
	}

	/// Records the error class the operation failed with.
	pub fn record_error(&self, kind: ErrorKind) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("error", kind.as_str());
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = kind;
		}
	}

	/// Enters the span for synchronous operations.
	pub fn entered(self) -> FlowSpanGuard {
		#[cfg(feature = "tracing")]
		{
			FlowSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			FlowSpanGuard {}
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

/// RAII guard returned by [`FlowSpan::entered`].
pub struct FlowSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for FlowSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FlowSpanGuard(..)")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn span_fields_accept_late_records() {
		let span = FlowSpan::new(FlowKind::ValidateAccess, "validate_access");

		span.record_user("user-1");
		span.record_error(ErrorKind::Token);

		let _guard = span.entered();
	}

	#[cfg(feature = "tracing")]
	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = FlowSpan::new(FlowKind::Refresh, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
