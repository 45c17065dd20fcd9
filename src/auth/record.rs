//! Records persisted through the session store.

// self
use crate::{
	_prelude::*,
	auth::{DisplayName, ExternalId, TokenSecret, UserId},
	provider::ProviderGrant,
};

/// Internal account minted on the first callback for a display name. Never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalUser {
	/// Stable internal identifier; the subject of refresh tokens.
	pub id: UserId,
	/// Display name the account was created for.
	pub display_name: DisplayName,
}
impl InternalUser {
	/// Mints a user with a fresh identifier.
	pub fn new(display_name: DisplayName) -> Self {
		Self { id: UserId::generate(), display_name }
	}
}

/// Provider-side identity, refreshed on every callback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
	/// Provider-issued identifier; the subject of access tokens.
	pub external_id: ExternalId,
	/// Current display name.
	pub display_name: DisplayName,
}

/// Provider OAuth credential owned by one internal user.
///
/// `expires_at` is in the provider's clock frame. Staleness is decided at read time.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCredential {
	/// Owning internal user; the upsert key.
	pub owner: UserId,
	/// External identity the credential was issued to.
	pub external_id: ExternalId,
	/// Provider access secret.
	pub access_secret: TokenSecret,
	/// Provider refresh secret, when one was issued.
	pub refresh_secret: Option<TokenSecret>,
	/// Token type reported by the provider (usually `bearer`).
	pub token_kind: String,
	/// Provider-reported expiry instant.
	pub expires_at: OffsetDateTime,
}
impl ProviderCredential {
	/// Binds a fresh provider grant to its owner.
	pub fn from_grant(owner: UserId, external_id: ExternalId, grant: ProviderGrant) -> Self {
		Self {
			owner,
			external_id,
			access_secret: grant.access_secret,
			refresh_secret: grant.refresh_secret,
			token_kind: grant.token_kind,
			expires_at: grant.expires_at,
		}
	}

	/// Replaces the secrets with a refreshed grant, keeping the prior refresh secret when the
	/// provider did not rotate it.
	pub fn rotate(self, grant: ProviderGrant) -> Self {
		Self {
			refresh_secret: grant.refresh_secret.or(self.refresh_secret),
			access_secret: grant.access_secret,
			token_kind: grant.token_kind,
			expires_at: grant.expires_at,
			..self
		}
	}

	/// Returns `true` once `instant` is strictly past the expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant > self.expires_at
	}
}
impl Debug for ProviderCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderCredential")
			.field("owner", &self.owner)
			.field("external_id", &self.external_id)
			.field("access_secret", &"<redacted>")
			.field("refresh_secret", &self.refresh_secret.as_ref().map(|_| "<redacted>"))
			.field("token_kind", &self.token_kind)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Metadata of the most recently issued session, one per internal user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredential {
	/// Owning internal user; the upsert key.
	pub owner: UserId,
	/// Display name at issuance time.
	pub display_name: DisplayName,
	/// Compact refresh token handed to the caller.
	pub refresh_secret: TokenSecret,
	/// Refresh token expiry.
	pub expires_at: OffsetDateTime,
}
impl Debug for SessionCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionCredential")
			.field("owner", &self.owner)
			.field("display_name", &self.display_name)
			.field("refresh_secret", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
