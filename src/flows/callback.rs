//! Authorization code callback: exchange, profile, lookup-or-create, and session issuance.

// self
use crate::{
	_prelude::*,
	auth::{DisplayName, InternalUser, ProviderCredential, SessionCredential},
	error::{InputError, NotFoundError},
	flows::SessionOrchestrator,
	obs::{FlowKind, FlowSpan},
	store::StoreError,
	token::SessionTokens,
};

impl SessionOrchestrator {
	/// Turns an authorization code into a fresh session.
	///
	/// The external identity, the provider credential, and the session metadata are upserted
	/// in that order. A failure after the first write leaves earlier writes in place; nothing
	/// is rolled back.
	pub async fn complete_callback(&self, ctx: &CallContext, code: &str) -> Result<SessionTokens> {
		const KIND: FlowKind = FlowKind::Callback;

		let span = FlowSpan::new(KIND, "complete_callback");

		self.observe(KIND, &span, async {
			if code.is_empty() {
				return Err(InputError::EmptyCode.into());
			}

			let grant = ctx.run(self.provider.exchange_code(ctx, code)).await?;
			let identity = ctx.run(self.provider.fetch_profile(ctx, &grant.access_secret)).await?;
			let user = self.resolve_user(ctx, &identity.display_name).await?;

			span.record_user(&user.id);

			ctx.run(self.store.save_external_identity(ctx, identity.clone())).await?;
			ctx.run(self.store.save_provider_credential(
				ctx,
				ProviderCredential::from_grant(user.id.clone(), identity.external_id.clone(), grant),
			))
			.await?;

			let tokens = self.issuer.issue_pair(&identity.external_id, &user.id)?;

			ctx.run(self.store.save_session_credential(ctx, SessionCredential {
				owner: user.id,
				display_name: identity.display_name,
				refresh_secret: tokens.refresh.secret().clone(),
				expires_at: tokens.refresh.expires_at(),
			}))
			.await?;
			self.metrics.record_login();

			Ok(tokens)
		})
		.await
	}

	// Lookup-or-create under a per-display-name lease; a store-level conflict from another
	// process falls back to reading the winner.
	async fn resolve_user(
		&self,
		ctx: &CallContext,
		display_name: &DisplayName,
	) -> Result<InternalUser> {
		let acquiring = self.user_guards.acquire(display_name);
		let _lease = ctx.run(async move { Ok::<_, Error>(acquiring.await) }).await?;

		if let Some(user) = ctx.run(self.store.fetch_user(ctx, display_name)).await? {
			return Ok(user);
		}

		let user = InternalUser::new(display_name.clone());

		match ctx.run(self.store.insert_user(ctx, user.clone())).await {
			Ok(()) => {
				#[cfg(feature = "tracing")]
				tracing::info!(
					user = %user.id,
					display_name = %user.display_name,
					"Created internal user."
				);

				self.metrics.record_user_created();

				Ok(user)
			},
			Err(Error::Storage(StoreError::Conflict { .. })) => {
				#[cfg(feature = "tracing")]
				tracing::warn!(display_name = %display_name, "User insert conflicted; re-reading.");

				ctx.run(self.store.fetch_user(ctx, display_name))
					.await?
					.ok_or_else(|| NotFoundError::new("user", display_name).into())
			},
			Err(err) => Err(err),
		}
	}
}
