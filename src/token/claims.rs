//! Structured claim set and the signed token wrapper.

// crates.io
use serde::{Deserializer, Serializer};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	token::{TokenError, TokenKind},
};

/// Claim set of a session token: `{sub, iat, exp, typ}`.
///
/// `sub` and `typ` deserialize leniently (wrong JSON types become `None`) so their
/// absence surfaces as [`TokenError::MissingClaim`] or [`TokenError::WrongType`] rather
/// than a parse failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
	/// Subject: external id for access tokens, internal user id for refresh tokens.
	#[serde(default, deserialize_with = "lenient_subject", skip_serializing_if = "Option::is_none")]
	pub sub: Option<String>,
	/// Issued-at, Unix seconds.
	pub iat: i64,
	/// Expiry, Unix seconds.
	pub exp: i64,
	/// Token class.
	#[serde(default, deserialize_with = "lenient_kind", skip_serializing_if = "Option::is_none")]
	pub typ: Option<TokenKind>,
}
impl SessionClaims {
	/// Builds the claim set for a token issued at `issued_at` with the given lifetime.
	pub fn new(
		kind: TokenKind,
		subject: impl Into<String>,
		issued_at: OffsetDateTime,
		lifetime: Duration,
	) -> Self {
		let iat = issued_at.unix_timestamp();

		Self { sub: Some(subject.into()), iat, exp: iat + lifetime.whole_seconds(), typ: Some(kind) }
	}

	/// Returns the subject after checking the token class.
	pub fn extract_subject(&self, expected: TokenKind) -> Result<&str, TokenError> {
		if self.typ != Some(expected) {
			return Err(TokenError::WrongType { expected, found: self.typ });
		}

		self.sub.as_deref().ok_or(TokenError::MissingClaim { claim: "sub" })
	}

	/// Distance between `exp` and `iat`.
	pub fn lifetime(&self) -> Duration {
		Duration::seconds(self.exp - self.iat)
	}

	/// `iat` as an instant, if representable.
	pub fn issued_at(&self) -> Option<OffsetDateTime> {
		OffsetDateTime::from_unix_timestamp(self.iat).ok()
	}

	/// `exp` as an instant, if representable.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		OffsetDateTime::from_unix_timestamp(self.exp).ok()
	}
}

/// Compact signed token together with the claims it was signed over.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
	compact: TokenSecret,
	claims: SessionClaims,
}
impl IssuedToken {
	pub(crate) fn new(compact: String, claims: SessionClaims) -> Self {
		Self { compact: TokenSecret::new(compact), claims }
	}

	/// Compact serialized token to hand to the caller.
	pub fn as_str(&self) -> &str {
		self.compact.expose()
	}

	/// Token as a redacted secret.
	pub fn secret(&self) -> &TokenSecret {
		&self.compact
	}

	/// Signed claims.
	pub fn claims(&self) -> &SessionClaims {
		&self.claims
	}

	/// Expiry instant; falls back to the current clock for unrepresentable values.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.claims.expires_at().unwrap_or_else(OffsetDateTime::now_utc)
	}
}
impl Debug for IssuedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IssuedToken")
			.field("compact", &"<redacted>")
			.field("claims", &self.claims)
			.finish()
	}
}
impl Serialize for IssuedToken {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(self.as_str())
	}
}

/// Access/refresh pair returned by the callback and refresh flows.
///
/// Serializes as `{"access": "...", "refresh": "..."}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionTokens {
	/// Access token (subject: external id).
	pub access: IssuedToken,
	/// Refresh token (subject: internal user id).
	pub refresh: IssuedToken,
}

fn lenient_subject<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(match Value::deserialize(deserializer)? {
		Value::String(subject) => Some(subject),
		_ => None,
	})
}

fn lenient_kind<'de, D>(deserializer: D) -> Result<Option<TokenKind>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(match Value::deserialize(deserializer)? {
		Value::String(kind) => TokenKind::parse(&kind),
		_ => None,
	})
}
