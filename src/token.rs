//! Locally issued session tokens: typed claims, the access/refresh discriminator, and
//! the HMAC-signed [`TokenIssuer`].
//!
//! Access tokens carry the external identity as subject, refresh tokens the internal
//! user id. Every role-sensitive path goes through [`SessionClaims::extract_subject`], so
//! one class is never accepted in place of the other.

pub mod claims;
pub mod issuer;

pub use claims::*;
pub use issuer::*;

// self
use crate::_prelude::*;

/// Session token class carried in the `typ` claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
	/// Short-lived token authorizing resource access.
	Access,
	/// Long-lived token authorizing a new access/refresh pair.
	Refresh,
}
impl TokenKind {
	/// Returns the wire value of the `typ` claim.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenKind::Access => "access",
			TokenKind::Refresh => "refresh",
		}
	}

	/// Parses a wire value, returning `None` for unknown classes.
	pub fn parse(value: &str) -> Option<Self> {
		match value {
			"access" => Some(TokenKind::Access),
			"refresh" => Some(TokenKind::Refresh),
			_ => None,
		}
	}
}
impl Display for TokenKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Session token validation and discrimination failures.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TokenError {
	/// Token could not be parsed.
	#[error("Session token is malformed: {reason}.")]
	Malformed {
		/// Parser diagnostic.
		reason: String,
	},
	/// Algorithm or signature does not match the configured symmetric key.
	#[error("Session token signature is invalid.")]
	BadSignature,
	/// `exp` has passed.
	#[error("Session token has expired.")]
	Expired,
	/// Token class differs from what the call site requires.
	#[error("Expected a {expected} token.")]
	WrongType {
		/// Required class.
		expected: TokenKind,
		/// Class found in the token, if recognizable.
		found: Option<TokenKind>,
	},
	/// A required claim is absent or not a string.
	#[error("Session token is missing the `{claim}` claim.")]
	MissingClaim {
		/// Claim name.
		claim: &'static str,
	},
	/// Subject is present but not in the expected format.
	#[error("Session token subject `{subject}` has an invalid format.")]
	InvalidSubjectFormat {
		/// Offending subject.
		subject: String,
	},
	/// Refresh token was superseded by a newer one.
	#[error("Refresh token has been superseded.")]
	Revoked,
}
