//! Session refresh and the lazy provider credential refresh it shares with secret resolution.
//!
//! Provider credentials are renewed on demand only: when a flow reads one whose expiry has
//! passed, it trades the provider refresh secret for a new grant and upserts the result
//! before continuing. Concurrent flows may both renew the same credential; the store keeps
//! whichever write lands last.

// self
use crate::{
	_prelude::*,
	auth::{ProviderCredential, SessionCredential, UserId},
	config::RefreshRotation,
	error::NotFoundError,
	flows::SessionOrchestrator,
	obs::{FlowKind, FlowSpan},
	provider::{ProviderError, ProviderFailure, ProviderOperation},
	token::{SessionTokens, TokenError, TokenKind},
};

impl SessionOrchestrator {
	/// Trades a refresh token for a new access/refresh pair.
	///
	/// Under [`RefreshRotation::Permissive`] earlier refresh tokens keep working until they
	/// expire. Under [`RefreshRotation::Strict`] only the most recently issued one is accepted
	/// and anything else fails with [`TokenError::Revoked`].
	pub async fn refresh_session(
		&self,
		ctx: &CallContext,
		refresh_token: &str,
	) -> Result<SessionTokens> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh_session");

		self.observe(KIND, &span, async {
			let user: UserId = self.authenticate(refresh_token, TokenKind::Refresh)?;

			span.record_user(&user);

			if self.rotation == RefreshRotation::Strict {
				self.ensure_latest_refresh(ctx, &user, refresh_token).await?;
			}

			let credential = ctx
				.run(self.store.fetch_provider_credential(ctx, &user))
				.await?
				.ok_or_else(|| NotFoundError::new("provider credential", &user))?;
			let credential = self.ensure_fresh(ctx, credential).await?;
			let identity =
				ctx.run(self.provider.fetch_profile(ctx, &credential.access_secret)).await?;
			let tokens = self.issuer.issue_pair(&identity.external_id, &user)?;

			ctx.run(self.store.save_session_credential(ctx, SessionCredential {
				owner: user,
				display_name: identity.display_name,
				refresh_secret: tokens.refresh.secret().clone(),
				expires_at: tokens.refresh.expires_at(),
			}))
			.await?;
			self.metrics.record_refresh();

			Ok(tokens)
		})
		.await
	}

	/// Renews `credential` through the provider when it has expired and persists the result.
	pub(crate) async fn ensure_fresh(
		&self,
		ctx: &CallContext,
		credential: ProviderCredential,
	) -> Result<ProviderCredential> {
		if !credential.is_expired_at(OffsetDateTime::now_utc()) {
			return Ok(credential);
		}

		let Some(refresh_secret) = credential.refresh_secret.clone() else {
			return Err(ProviderError::new(
				ProviderOperation::RefreshCredential,
				ProviderFailure::EmptyInput { what: "provider refresh secret" },
			)
			.into());
		};
		let grant = ctx.run(self.provider.refresh_credential(ctx, &refresh_secret)).await?;
		let rotated = credential.rotate(grant);

		ctx.run(self.store.save_provider_credential(ctx, rotated.clone())).await?;

		#[cfg(feature = "tracing")]
		tracing::info!(
			user = %rotated.owner,
			expires_at = %rotated.expires_at,
			"Renewed provider credential."
		);

		self.metrics.record_provider_rotation();

		Ok(rotated)
	}

	async fn ensure_latest_refresh(
		&self,
		ctx: &CallContext,
		user: &UserId,
		refresh_token: &str,
	) -> Result<()> {
		let latest = ctx.run(self.store.fetch_session_credential(ctx, user)).await?;

		match latest {
			Some(latest) if latest.refresh_secret.expose() == refresh_token => Ok(()),
			_ => Err(TokenError::Revoked.into()),
		}
	}
}
