// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for orchestrator outcomes.
#[derive(Debug, Default)]
pub struct SessionMetrics {
	logins: AtomicU64,
	refreshes: AtomicU64,
	users_created: AtomicU64,
	provider_rotations: AtomicU64,
	failures: AtomicU64,
}
impl SessionMetrics {
	/// Returns the number of callbacks that issued a session.
	pub fn logins_completed(&self) -> u64 {
		self.logins.load(Ordering::Relaxed)
	}

	/// Returns the number of successful session refreshes.
	pub fn sessions_refreshed(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}

	/// Returns the number of internal users created by callbacks.
	pub fn users_created(&self) -> u64 {
		self.users_created.load(Ordering::Relaxed)
	}

	/// Returns the number of provider credentials renewed through the provider.
	pub fn provider_rotations(&self) -> u64 {
		self.provider_rotations.load(Ordering::Relaxed)
	}

	/// Returns the number of operations that failed, across all flows.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_login(&self) {
		self.logins.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh(&self) {
		self.refreshes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_user_created(&self) {
		self.users_created.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_provider_rotation(&self) {
		self.provider_rotations.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
