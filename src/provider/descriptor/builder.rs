// self
use crate::{
	_prelude::*,
	auth::{IdentifierError, ProviderId},
	provider::{ClientAuthMethod, ProviderDescriptor, ProviderEndpoints, ProviderQuirks},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ProviderDescriptorError {
	/// Authorization endpoint is required to start a login.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Token endpoint is required for code exchanges and refreshes.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Userinfo endpoint is required for profile lookups.
	#[error("Missing userinfo endpoint.")]
	MissingUserinfoEndpoint,
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// A preset endpoint could not be assembled.
	#[error("The {endpoint} endpoint for host {host} is not a valid URL.")]
	InvalidEndpointUrl {
		/// Which endpoint failed.
		endpoint: &'static str,
		/// Host the endpoint was derived from.
		host: String,
	},
	/// Descriptor identifier failed validation.
	#[error("Descriptor identifier is invalid.")]
	InvalidId(#[from] IdentifierError),
	/// Reject scope delimiters that are control characters.
	#[error("Scope delimiter must be a printable character.")]
	InvalidScopeDelimiter {
		/// Invalid delimiter that was supplied.
		delimiter: char,
	},
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	/// Identifier for the descriptor being constructed.
	pub id: ProviderId,
	/// Authorization endpoint.
	pub authorization_endpoint: Option<Url>,
	/// Token endpoint used for exchanges and refreshes.
	pub token_endpoint: Option<Url>,
	/// Userinfo endpoint used for profile lookups.
	pub userinfo_endpoint: Option<Url>,
	/// Preferred client authentication method for the token endpoint.
	pub preferred_client_auth_method: ClientAuthMethod,
	/// Provider-specific quirks.
	pub quirks: ProviderQuirks,
}
impl ProviderDescriptorBuilder {
	/// Creates a new builder seeded with the provided identifier.
	pub fn new(id: ProviderId) -> Self {
		Self {
			id,
			authorization_endpoint: None,
			token_endpoint: None,
			userinfo_endpoint: None,
			preferred_client_auth_method: ClientAuthMethod::default(),
			quirks: ProviderQuirks::default(),
		}
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the userinfo endpoint.
	pub fn userinfo_endpoint(mut self, url: Url) -> Self {
		self.userinfo_endpoint = Some(url);

		self
	}

	/// Overrides the preferred client authentication method.
	pub fn preferred_client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.preferred_client_auth_method = method;

		self
	}

	/// Overrides the provider quirks.
	pub fn quirks(mut self, quirks: ProviderQuirks) -> Self {
		self.quirks = quirks;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let authorization = self
			.authorization_endpoint
			.ok_or(ProviderDescriptorError::MissingAuthorizationEndpoint)?;
		let token = self.token_endpoint.ok_or(ProviderDescriptorError::MissingTokenEndpoint)?;
		let userinfo =
			self.userinfo_endpoint.ok_or(ProviderDescriptorError::MissingUserinfoEndpoint)?;
		let descriptor = ProviderDescriptor {
			id: self.id,
			endpoints: ProviderEndpoints { authorization, token, userinfo },
			preferred_client_auth_method: self.preferred_client_auth_method,
			quirks: self.quirks,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ProviderDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		validate_endpoint("authorization", &self.endpoints.authorization)?;
		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("userinfo", &self.endpoints.userinfo)?;
		validate_scope_delimiter(self.quirks.scope_delimiter)?;

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	if url.scheme() != "https" {
		Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}

fn validate_scope_delimiter(delimiter: char) -> Result<(), ProviderDescriptorError> {
	if delimiter.is_control() {
		Err(ProviderDescriptorError::InvalidScopeDelimiter { delimiter })
	} else {
		Ok(())
	}
}
