// self
use crate::_prelude::*;

/// Provider-specific quirks that influence request construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderQuirks {
	/// Appends `access_type=offline` to the authorization URL so a refresh secret is issued.
	pub offline_access: bool,
	/// Character used to join scopes when constructing `scope` parameters.
	pub scope_delimiter: char,
}
impl Default for ProviderQuirks {
	fn default() -> Self {
		Self { offline_access: false, scope_delimiter: ' ' }
	}
}
