//! The identity provider collaborator and its implementations.
//!
//! [`IdentityProvider`] is the only path from the orchestrator to the upstream OAuth
//! provider. `descriptor` holds validated endpoint metadata (HTTPS-only endpoints, client
//! authentication preference, quirks), `strategy` classifies upstream failures, `live`
//! speaks OAuth 2.0 over a [`TokenHttpClient`](crate::http::TokenHttpClient), and
//! `scripted` is an in-memory double for tests and local development.

pub mod descriptor;
pub mod error;
pub mod live;
pub mod scripted;
pub mod strategy;

pub use descriptor::*;
pub use error::*;
pub use live::*;
pub use scripted::*;
pub use strategy::*;

// self
use crate::{
	_prelude::*,
	auth::{ExternalIdentity, TokenSecret},
};

/// Boxed future returned by [`IdentityProvider`] calls.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Upstream identity provider contract.
///
/// Every network call receives the caller's [`CallContext`]; implementations should abort
/// and return [`Error::Cancelled`] or [`Error::DeadlineExceeded`] once it is done.
/// Provider-side failures are reported as [`ProviderError`].
pub trait IdentityProvider
where
	Self: Send + Sync,
{
	/// Builds the URL the user agent is redirected to, embedding `state` verbatim.
	fn authorization_url(&self, state: &str) -> Result<Url>;

	/// Exchanges an authorization code for a provider grant.
	fn exchange_code<'a>(
		&'a self,
		ctx: &'a CallContext,
		code: &'a str,
	) -> ProviderFuture<'a, ProviderGrant>;

	/// Fetches the external profile authorized by `access_secret`.
	fn fetch_profile<'a>(
		&'a self,
		ctx: &'a CallContext,
		access_secret: &'a TokenSecret,
	) -> ProviderFuture<'a, ExternalIdentity>;

	/// Trades a provider refresh secret for a new grant.
	fn refresh_credential<'a>(
		&'a self,
		ctx: &'a CallContext,
		refresh_secret: &'a TokenSecret,
	) -> ProviderFuture<'a, ProviderGrant>;
}

/// Provider credential as returned by the token endpoint, before it is bound to an owner.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderGrant {
	/// Provider access secret.
	pub access_secret: TokenSecret,
	/// Provider refresh secret, when one was issued.
	pub refresh_secret: Option<TokenSecret>,
	/// Token type reported by the provider.
	pub token_kind: String,
	/// Expiry instant in the provider's clock frame.
	pub expires_at: OffsetDateTime,
}
impl Debug for ProviderGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderGrant")
			.field("access_secret", &"<redacted>")
			.field("refresh_secret", &self.refresh_secret.as_ref().map(|_| "<redacted>"))
			.field("token_kind", &self.token_kind)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
