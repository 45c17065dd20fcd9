//! Per-call cancellation and deadline scope.
//!
//! Every orchestrator operation takes a [`CallContext`] and hands the same value to each
//! collaborator call it makes. [`CallContext::run`] refuses to start a call once the
//! context is done and abandons an in-flight call as soon as the caller cancels or the
//! deadline passes. Transports may additionally turn [`CallContext::remaining`] into a request
//! timeout.

// std
use std::{
	future,
	pin::pin,
	sync::atomic::{AtomicBool, Ordering},
	task::{Context, Poll, Waker},
	time::Duration as StdDuration,
};
// crates.io
use futures_timer::Delay;
// self
use crate::_prelude::*;

#[derive(Debug, Default)]
struct CancellationState {
	cancelled: AtomicBool,
	wakers: Mutex<Vec<Waker>>,
}

/// Shared flag flipped by the caller to cancel every operation holding a clone.
#[derive(Clone, Debug, Default)]
pub struct CancellationFlag(Arc<CancellationState>);
impl CancellationFlag {
	/// Requests cancellation and wakes every call waiting on this flag.
	pub fn cancel(&self) {
		self.0.cancelled.store(true, Ordering::Release);

		for waker in self.0.wakers.lock().drain(..) {
			waker.wake();
		}
	}

	/// Returns `true` once [`cancel`](Self::cancel) has been called.
	pub fn is_cancelled(&self) -> bool {
		self.0.cancelled.load(Ordering::Acquire)
	}

	fn poll_cancelled(&self, cx: &mut Context<'_>) -> Poll<()> {
		if self.is_cancelled() {
			return Poll::Ready(());
		}

		{
			let mut wakers = self.0.wakers.lock();

			if !wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
				wakers.push(cx.waker().clone());
			}
		}

		// `cancel` may have drained the list between the first check and the push.
		if self.is_cancelled() { Poll::Ready(()) } else { Poll::Pending }
	}
}

/// Caller-owned cancellation and deadline scope.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
	cancellation: CancellationFlag,
	deadline: Option<OffsetDateTime>,
}
impl CallContext {
	/// Creates a context without a deadline that is never cancelled unless requested.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets an absolute deadline.
	pub fn with_deadline(mut self, deadline: OffsetDateTime) -> Self {
		self.deadline = Some(deadline);

		self
	}

	/// Sets a deadline relative to the current clock.
	pub fn with_timeout(self, timeout: Duration) -> Self {
		self.with_deadline(OffsetDateTime::now_utc() + timeout)
	}

	/// Shares an existing cancellation flag with this context.
	pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
		self.cancellation = flag;

		self
	}

	/// Flag that cancels this context.
	pub fn cancellation(&self) -> &CancellationFlag {
		&self.cancellation
	}

	/// Absolute deadline, if any.
	pub fn deadline(&self) -> Option<OffsetDateTime> {
		self.deadline
	}

	/// Time left before the deadline, clamped at zero.
	pub fn remaining(&self) -> Option<Duration> {
		self.deadline.map(|deadline| {
			let left = deadline - OffsetDateTime::now_utc();

			if left.is_negative() { Duration::ZERO } else { left }
		})
	}

	/// [`remaining`](Self::remaining) as a `std` duration, for transport timeouts.
	pub fn remaining_timeout(&self) -> Option<StdDuration> {
		self.remaining().map(Duration::unsigned_abs)
	}

	/// Fails with [`Error::Cancelled`] or [`Error::DeadlineExceeded`] when the call must stop.
	pub fn check(&self) -> Result<()> {
		if self.cancellation.is_cancelled() {
			return Err(Error::Cancelled);
		}
		if self.deadline.is_some_and(|deadline| OffsetDateTime::now_utc() >= deadline) {
			return Err(Error::DeadlineExceeded);
		}

		Ok(())
	}

	/// Checks the context, then drives a collaborator future until it finishes, the caller
	/// cancels, or the deadline passes.
	///
	/// Collaborator futures are lazy, so a failed check means the call never starts. An
	/// abandoned call is dropped and yields [`Error::Cancelled`] or [`Error::DeadlineExceeded`].
	pub async fn run<T, E, F>(&self, call: F) -> Result<T>
	where
		F: Future<Output = Result<T, E>>,
		Error: From<E>,
	{
		self.check()?;

		let mut call = pin!(call);
		let mut deadline = pin!(self.remaining_timeout().map(Delay::new));

		future::poll_fn(|cx| {
			if let Poll::Ready(output) = call.as_mut().poll(cx) {
				return Poll::Ready(output.map_err(Error::from));
			}
			if self.cancellation.poll_cancelled(cx).is_ready() {
				return Poll::Ready(Err(Error::Cancelled));
			}
			if deadline.as_mut().as_pin_mut().is_some_and(|timer| timer.poll(cx).is_ready()) {
				return Poll::Ready(Err(Error::DeadlineExceeded));
			}

			Poll::Pending
		})
		.await
	}
}
