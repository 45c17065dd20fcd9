//! Session orchestration: login, callback, refresh, and resource-access flows.
//!
//! [`SessionOrchestrator`] composes the [`TokenIssuer`], an [`IdentityProvider`], and a
//! [`SessionStore`]. It talks to the network and to persistence only through those two
//! collaborators, forwards the caller's [`CallContext`] unchanged into every collaborator
//! call, and performs no retries: the first failure of any step is returned as is.

mod access;
mod callback;
mod common;
mod login;
mod metrics;
mod refresh;

pub use login::generate_state;
pub use metrics::SessionMetrics;

// self
use crate::{
	_prelude::*,
	config::{RefreshRotation, SessionConfig},
	error::ConfigError,
	flows::common::UserGuards,
	provider::IdentityProvider,
	store::SessionStore,
	token::TokenIssuer,
};

/// Coordinates session flows against one identity provider and one store.
///
/// Cloning is cheap and clones share collaborators, metrics, and the per-display-name
/// guards that serialize first logins.
#[derive(Clone)]
pub struct SessionOrchestrator {
	issuer: Arc<TokenIssuer>,
	provider: Arc<dyn IdentityProvider>,
	store: Arc<dyn SessionStore>,
	rotation: RefreshRotation,
	metrics: Arc<SessionMetrics>,
	user_guards: Arc<UserGuards>,
}
impl SessionOrchestrator {
	/// Creates an orchestrator with [`RefreshRotation::Permissive`] refresh handling.
	pub fn new(
		issuer: TokenIssuer,
		provider: Arc<dyn IdentityProvider>,
		store: Arc<dyn SessionStore>,
	) -> Self {
		Self {
			issuer: Arc::new(issuer),
			provider,
			store,
			rotation: RefreshRotation::default(),
			metrics: Default::default(),
			user_guards: Default::default(),
		}
	}

	/// Builds the issuer from `config` and applies its rotation policy.
	pub fn from_config(
		config: &SessionConfig,
		provider: Arc<dyn IdentityProvider>,
		store: Arc<dyn SessionStore>,
	) -> Result<Self, ConfigError> {
		let issuer = TokenIssuer::new(&config.issuer)?;

		Ok(Self::new(issuer, provider, store).with_rotation(config.rotation))
	}

	/// Overrides the refresh rotation policy.
	pub fn with_rotation(mut self, rotation: RefreshRotation) -> Self {
		self.rotation = rotation;

		self
	}

	/// Active refresh rotation policy.
	pub fn rotation(&self) -> RefreshRotation {
		self.rotation
	}

	/// Issuer used for every session token.
	pub fn issuer(&self) -> &TokenIssuer {
		&self.issuer
	}

	/// In-process counters shared by every clone of this orchestrator.
	pub fn metrics(&self) -> &SessionMetrics {
		&self.metrics
	}
}
impl Debug for SessionOrchestrator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionOrchestrator")
			.field("issuer", &self.issuer)
			.field("rotation", &self.rotation)
			.field("metrics", &self.metrics)
			.finish_non_exhaustive()
	}
}
