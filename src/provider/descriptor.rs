//! Provider descriptor data structures shared by the live adapter.
//!
//! The module exposes validated metadata and builder utilities so providers can
//! describe their endpoints in a transport-agnostic way.

/// Builder API for assembling provider descriptors.
pub mod builder;
/// Provider-specific quirk toggles.
pub mod quirks;

pub use builder::*;
pub use quirks::*;

// self
use crate::{_prelude::*, auth::ProviderId};

/// Preferred client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint the user agent is redirected to.
	pub authorization: Url,
	/// Token endpoint used for code exchanges and refreshes.
	pub token: Url,
	/// Userinfo endpoint returning the external profile.
	pub userinfo: Url,
}

/// Battle.net OAuth region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleNetRegion {
	/// `oauth.battle.net` (Americas, Europe, Korea, Taiwan).
	#[default]
	Global,
	/// `oauth.battlenet.com.cn`.
	China,
}
impl BattleNetRegion {
	const fn host(self) -> &'static str {
		match self {
			BattleNetRegion::Global => "oauth.battle.net",
			BattleNetRegion::China => "oauth.battlenet.com.cn",
		}
	}
}

/// Immutable provider descriptor consumed by the live adapter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Descriptor identifier.
	pub id: ProviderId,
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Preferred client authentication mechanism.
	pub preferred_client_auth_method: ClientAuthMethod,
	/// Provider-specific quirks.
	pub quirks: ProviderQuirks,
}
impl ProviderDescriptor {
	/// Creates a new builder for the provided identifier.
	pub fn builder(id: ProviderId) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(id)
	}

	/// Battle.net descriptor with offline access enabled.
	pub fn battle_net(region: BattleNetRegion) -> Result<Self, ProviderDescriptorError> {
		let host = region.host();
		let endpoint = |path: &'static str| {
			Url::parse(&format!("https://{host}/{path}")).map_err(|_| {
				ProviderDescriptorError::InvalidEndpointUrl { endpoint: path, host: host.into() }
			})
		};

		Self::builder(ProviderId::new("battle_net")?)
			.authorization_endpoint(endpoint("authorize")?)
			.token_endpoint(endpoint("token")?)
			.userinfo_endpoint(endpoint("userinfo")?)
			.preferred_client_auth_method(ClientAuthMethod::ClientSecretBasic)
			.quirks(ProviderQuirks { offline_access: true, ..Default::default() })
			.build()
	}
}
