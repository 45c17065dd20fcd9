//! Redacted wrapper for bearer secrets (provider credentials and session tokens).

// self
use crate::_prelude::*;

/// Secret string that never prints its contents through `Debug` or `Display`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw value. Callers must keep it out of logs.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the secret is an empty string.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl From<String> for TokenSecret {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
