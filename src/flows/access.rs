//! Resource-access flows keyed by an access token.

// self
use crate::{
	_prelude::*,
	auth::{ExternalId, ExternalIdentity, TokenSecret},
	error::NotFoundError,
	flows::SessionOrchestrator,
	obs::{FlowKind, FlowSpan},
	token::TokenKind,
};

impl SessionOrchestrator {
	/// Validates an access token and returns its numeric external id.
	pub fn validate_access(&self, ctx: &CallContext, access_token: &str) -> Result<u64> {
		const KIND: FlowKind = FlowKind::ValidateAccess;

		self.observe_now(KIND, FlowSpan::new(KIND, "validate_access"), || {
			ctx.check()?;

			self.authenticate(access_token, TokenKind::Access)
		})
	}

	/// Resolves the stored external identity behind an access token.
	pub async fn resolve_identity(
		&self,
		ctx: &CallContext,
		access_token: &str,
	) -> Result<ExternalIdentity> {
		const KIND: FlowKind = FlowKind::ResolveIdentity;

		let span = FlowSpan::new(KIND, "resolve_identity");

		self.observe(KIND, &span, async {
			let external_id: ExternalId = self.authenticate(access_token, TokenKind::Access)?;

			ctx.run(self.store.fetch_external_identity(ctx, &external_id))
				.await?
				.ok_or_else(|| NotFoundError::new("external identity", &external_id).into())
		})
		.await
	}

	/// Returns a live provider access secret for the identity behind an access token,
	/// renewing the stored provider credential first when it has expired.
	pub async fn resolve_provider_access_secret(
		&self,
		ctx: &CallContext,
		access_token: &str,
	) -> Result<TokenSecret> {
		const KIND: FlowKind = FlowKind::ResolveProviderSecret;

		let span = FlowSpan::new(KIND, "resolve_provider_access_secret");

		self.observe(KIND, &span, async {
			let external_id: ExternalId = self.authenticate(access_token, TokenKind::Access)?;
			let credential = ctx
				.run(self.store.fetch_provider_credential_by_external(ctx, &external_id))
				.await?
				.ok_or_else(|| NotFoundError::new("provider credential", &external_id))?;

			span.record_user(&credential.owner);

			Ok(self.ensure_fresh(ctx, credential).await?.access_secret)
		})
		.await
	}
}
