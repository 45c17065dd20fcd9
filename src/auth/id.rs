//! Strongly typed identifiers for internal users, external identities, and providers.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal, $validate:ident) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				$validate($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				$validate($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier contains control characters.
	#[error("{kind} identifier contains control characters.")]
	ContainsControl {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier.
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! { UserId, "Stable identifier of an internal user.", "User", validate_token_like }
def_id! {
	ExternalId,
	"Identifier issued by the external identity provider.",
	"External",
	validate_token_like
}
def_id! {
	ProviderId,
	"Identifier for an identity provider descriptor.",
	"Provider",
	validate_token_like
}
def_id! {
	DisplayName,
	"Human-facing account name reported by the provider (e.g. a BattleTag).",
	"DisplayName",
	validate_display
}

impl UserId {
	/// Mints a fresh random identifier.
	pub fn generate() -> Self {
		Self(uuid::Uuid::new_v4().to_string())
	}
}

impl ExternalId {
	/// Parses the identifier as the provider's numeric account id.
	pub fn as_numeric(&self) -> Option<u64> {
		self.0.parse().ok()
	}
}
impl From<u64> for ExternalId {
	fn from(value: u64) -> Self {
		Self(value.to_string())
	}
}

fn validate_token_like(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}

	validate_display(kind, view)
}

fn validate_display(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.trim().is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_control) {
		return Err(IdentifierError::ContainsControl { kind });
	}
	if view.chars().count() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}
