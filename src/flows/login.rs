//! Login initiation and state nonce generation.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
// self
use crate::{
	_prelude::*,
	flows::SessionOrchestrator,
	obs::{FlowKind, FlowSpan},
};

const STATE_BYTES: usize = 7;

/// Generates a URL-safe random state nonce (7 random bytes, base64url without padding).
///
/// The nonce is round-tripped opaquely through the provider; the orchestrator keeps no copy
/// and does not check it on callback.
pub fn generate_state() -> String {
	let mut bytes = [0_u8; STATE_BYTES];

	rand::rng().fill(&mut bytes);

	URL_SAFE_NO_PAD.encode(bytes)
}

impl SessionOrchestrator {
	/// Returns the provider authorization URL carrying `state` verbatim.
	///
	/// Nothing is persisted.
	pub fn initiate_login(&self, ctx: &CallContext, state: &str) -> Result<Url> {
		const KIND: FlowKind = FlowKind::Login;

		self.observe_now(KIND, FlowSpan::new(KIND, "initiate_login"), || {
			ctx.check()?;

			self.provider.authorization_url(state)
		})
	}
}
