//! Shared helpers for flow implementations (token authentication, observation, guards).

// crates.io
use async_lock::MutexGuardArc;
// self
use crate::{
	_prelude::*,
	auth::DisplayName,
	error::InputError,
	flows::SessionOrchestrator,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	token::{TokenError, TokenKind},
};

/// Per-display-name async locks serializing lookup-or-create of internal users.
#[derive(Debug, Default)]
pub(crate) struct UserGuards(Mutex<HashMap<DisplayName, Arc<AsyncMutex<()>>>>);
impl UserGuards {
	/// Waits for exclusive access to `name`; the entry is dropped with its last lease.
	///
	/// The lease exists before the wait starts, so a waiter dropped mid-wait still removes an
	/// idle entry.
	pub(crate) async fn acquire(&self, name: &DisplayName) -> UserLease<'_> {
		let mut lease = UserLease { guards: self, name: name.clone(), held: None };
		let lock = self.0.lock().entry(name.clone()).or_default().clone();

		lease.held = Some(lock.lock_arc().await);

		lease
	}

	#[cfg(test)]
	pub(crate) fn len(&self) -> usize {
		self.0.lock().len()
	}
}

/// Exclusive access to one display name, released on drop.
pub(crate) struct UserLease<'a> {
	guards: &'a UserGuards,
	name: DisplayName,
	held: Option<MutexGuardArc<()>>,
}
impl Drop for UserLease<'_> {
	fn drop(&mut self) {
		let mut guards = self.guards.0.lock();

		self.held.take();

		if guards.get(&self.name).is_some_and(|lock| Arc::strong_count(lock) == 1) {
			guards.remove(&self.name);
		}
	}
}

impl SessionOrchestrator {
	/// Validates a bearer token of `kind` and parses its subject.
	pub(crate) fn authenticate<T>(&self, token: &str, kind: TokenKind) -> Result<T>
	where
		T: FromStr,
	{
		if token.is_empty() {
			return Err(InputError::EmptyToken.into());
		}

		let claims = self.issuer.validate(token)?;
		let subject = claims.extract_subject(kind)?;

		Ok(parse_subject(subject)?)
	}

	/// Runs an async flow inside its span and records its outcome.
	pub(crate) async fn observe<T, Fut>(
		&self,
		kind: FlowKind,
		span: &FlowSpan,
		flow: Fut,
	) -> Result<T>
	where
		Fut: Future<Output = Result<T>>,
	{
		obs::record_flow_outcome(kind, FlowOutcome::Attempt);

		let result = span.instrument(flow).await;

		self.finish(kind, span, &result);

		result
	}

	/// Runs a synchronous flow inside its span and records its outcome.
	pub(crate) fn observe_now<T>(
		&self,
		kind: FlowKind,
		span: FlowSpan,
		flow: impl FnOnce() -> Result<T>,
	) -> Result<T> {
		obs::record_flow_outcome(kind, FlowOutcome::Attempt);

		let recorder = span.clone();
		let result = {
			let _entered = span.entered();

			flow()
		};

		self.finish(kind, &recorder, &result);

		result
	}

	fn finish<T>(&self, kind: FlowKind, span: &FlowSpan, result: &Result<T>) {
		obs::record_flow_outcome(kind, FlowOutcome::of(result));

		if let Err(err) = result {
			span.record_error(err.kind());
			obs::record_flow_error(kind, err.kind());
			self.metrics.record_failure();
		}
	}
}

/// Parses a token subject into a typed identifier.
pub(crate) fn parse_subject<T>(subject: &str) -> Result<T, TokenError>
where
	T: FromStr,
{
	subject.parse().map_err(|_| TokenError::InvalidSubjectFormat { subject: subject.into() })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::{ExternalId, UserId};

	#[test]
	fn subjects_parse_into_typed_ids() {
		assert_eq!(parse_subject::<u64>("42"), Ok(42));
		assert_eq!(
			parse_subject::<u64>("Hero"),
			Err(TokenError::InvalidSubjectFormat { subject: "Hero".into() })
		);
		assert_eq!(parse_subject::<ExternalId>("42"), Ok(ExternalId::from(42)));
		assert!(parse_subject::<UserId>("has space").is_err());
	}

	#[tokio::test]
	async fn guard_entries_are_dropped_with_last_lease() {
		let guards = UserGuards::default();
		let name = DisplayName::new("Hero#1234").expect("Display name fixture should be valid.");

		{
			let _lease = guards.acquire(&name).await;

			assert_eq!(guards.len(), 1);
		}

		assert_eq!(guards.len(), 0);
	}

	#[tokio::test]
	async fn second_lease_waits_for_first() {
		let guards = Arc::new(UserGuards::default());
		let name = DisplayName::new("Hero#1234").expect("Display name fixture should be valid.");
		let first = guards.acquire(&name).await;
		let waiter = {
			let guards = guards.clone();
			let name = name.clone();

			tokio::spawn(async move {
				let _lease = guards.acquire(&name).await;
			})
		};

		tokio::time::sleep(std::time::Duration::from_millis(20)).await;

		assert!(!waiter.is_finished());

		drop(first);
		waiter.await.expect("Waiting lease should complete once the first is released.");

		assert_eq!(guards.len(), 0);
	}

	#[tokio::test]
	async fn abandoned_waiter_leaves_no_entry() {
		let guards = UserGuards::default();
		let name = DisplayName::new("Hero#1234").expect("Display name fixture should be valid.");
		let first = guards.acquire(&name).await;
		let mut waiter = Box::pin(guards.acquire(&name));

		assert!(
			tokio::time::timeout(std::time::Duration::from_millis(10), &mut waiter).await.is_err()
		);

		drop(first);

		assert_eq!(guards.len(), 1);

		drop(waiter);

		assert_eq!(guards.len(), 0);
	}
}
