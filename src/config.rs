//! Serde-friendly configuration for the issuer, the orchestrator, and the OAuth client.

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError, token::TokenKind};

/// Signing key and token lifetimes.
///
/// Lifetimes are (de)serialized as whole seconds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IssuerConfig {
	/// Symmetric signing secret.
	pub secret: TokenSecret,
	/// Access token lifetime (default 30 minutes).
	#[serde(default = "IssuerConfig::default_access_ttl", with = "whole_seconds")]
	pub access_ttl: Duration,
	/// Refresh token lifetime (default 30 days).
	#[serde(default = "IssuerConfig::default_refresh_ttl", with = "whole_seconds")]
	pub refresh_ttl: Duration,
}
impl IssuerConfig {
	const DEFAULT_ACCESS_TTL: Duration = Duration::minutes(30);
	const DEFAULT_REFRESH_TTL: Duration = Duration::days(30);

	/// Creates a configuration with default lifetimes.
	pub fn new(secret: TokenSecret) -> Self {
		Self {
			secret,
			access_ttl: Self::DEFAULT_ACCESS_TTL,
			refresh_ttl: Self::DEFAULT_REFRESH_TTL,
		}
	}

	/// Overrides the access token lifetime.
	pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
		self.access_ttl = ttl;

		self
	}

	/// Overrides the refresh token lifetime.
	pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
		self.refresh_ttl = ttl;

		self
	}

	/// Rejects empty secrets and non-positive lifetimes.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.secret.is_empty() {
			return Err(ConfigError::EmptySigningSecret);
		}
		if !self.access_ttl.is_positive() {
			return Err(ConfigError::NonPositiveLifetime { kind: TokenKind::Access });
		}
		if !self.refresh_ttl.is_positive() {
			return Err(ConfigError::NonPositiveLifetime { kind: TokenKind::Refresh });
		}

		Ok(())
	}

	fn default_access_ttl() -> Duration {
		Self::DEFAULT_ACCESS_TTL
	}

	fn default_refresh_ttl() -> Duration {
		Self::DEFAULT_REFRESH_TTL
	}
}

/// What happens to the previous refresh token after a successful refresh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshRotation {
	/// Earlier refresh tokens stay valid until their natural expiry.
	#[default]
	Permissive,
	/// Only the most recently issued refresh token is accepted.
	Strict,
}

/// Orchestrator configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
	/// Token issuer settings.
	pub issuer: IssuerConfig,
	/// Refresh token rotation policy.
	#[serde(default)]
	pub rotation: RefreshRotation,
}
impl SessionConfig {
	/// Creates a configuration with default lifetimes and permissive rotation.
	pub fn new(secret: TokenSecret) -> Self {
		Self { issuer: IssuerConfig::new(secret), rotation: RefreshRotation::default() }
	}
}

/// OAuth client registration at the identity provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OAuthClientConfig {
	/// Registered client identifier.
	pub client_id: String,
	/// Client secret for confidential clients.
	#[serde(default)]
	pub client_secret: Option<TokenSecret>,
	/// Redirect URI registered for the callback.
	pub redirect_uri: Url,
	/// Scopes requested during login.
	#[serde(default)]
	pub scopes: Vec<String>,
}
impl OAuthClientConfig {
	/// Creates a public-client registration without scopes.
	pub fn new(client_id: impl Into<String>, redirect_uri: Url) -> Self {
		Self { client_id: client_id.into(), client_secret: None, redirect_uri, scopes: Vec::new() }
	}

	/// Attaches a client secret.
	pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(TokenSecret::new(secret));

		self
	}

	/// Replaces the requested scopes.
	pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes = scopes.into_iter().map(Into::into).collect();

		self
	}
}

mod whole_seconds {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(value.whole_seconds())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		i64::deserialize(deserializer).map(Duration::seconds)
	}
}
