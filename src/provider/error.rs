//! Identity provider failures, tagged with the collaborator call that produced them.

// self
use crate::{_prelude::*, auth::IdentifierError, error::BoxError, error::ConfigError};

/// Collaborator call a provider failure belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderOperation {
	/// Authorization code exchange.
	ExchangeCode,
	/// External profile lookup.
	FetchProfile,
	/// Provider credential refresh.
	RefreshCredential,
}
impl ProviderOperation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ProviderOperation::ExchangeCode => "exchange_code",
			ProviderOperation::FetchProfile => "fetch_profile",
			ProviderOperation::RefreshCredential => "refresh_credential",
		}
	}
}
impl Display for ProviderOperation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Identity provider call failed.
#[derive(Debug, ThisError)]
pub enum ProviderError {
	/// Authorization code could not be exchanged.
	#[error("Authorization code exchange failed.")]
	ExchangeFailed(#[source] ProviderFailure),
	/// External profile could not be fetched or parsed.
	#[error("External profile fetch failed.")]
	ProfileFetchFailed(#[source] ProviderFailure),
	/// Provider credential could not be refreshed.
	#[error("Provider credential refresh failed.")]
	RefreshFailed(#[source] ProviderFailure),
}
impl ProviderError {
	/// Tags `failure` with the operation it happened in.
	pub fn new(operation: ProviderOperation, failure: ProviderFailure) -> Self {
		match operation {
			ProviderOperation::ExchangeCode => Self::ExchangeFailed(failure),
			ProviderOperation::FetchProfile => Self::ProfileFetchFailed(failure),
			ProviderOperation::RefreshCredential => Self::RefreshFailed(failure),
		}
	}

	/// Operation that failed.
	pub fn operation(&self) -> ProviderOperation {
		match self {
			Self::ExchangeFailed(_) => ProviderOperation::ExchangeCode,
			Self::ProfileFetchFailed(_) => ProviderOperation::FetchProfile,
			Self::RefreshFailed(_) => ProviderOperation::RefreshCredential,
		}
	}

	/// Underlying failure.
	pub fn failure(&self) -> &ProviderFailure {
		match self {
			Self::ExchangeFailed(failure)
			| Self::ProfileFetchFailed(failure)
			| Self::RefreshFailed(failure) => failure,
		}
	}
}

/// Cause of a provider failure.
#[derive(Debug, ThisError)]
pub enum ProviderFailure {
	/// Required input (code or secret) was empty; the provider was not contacted.
	#[error("The {what} is empty.")]
	EmptyInput {
		/// Which input was empty.
		what: &'static str,
	},
	/// Provider rejected the grant (bad code, revoked refresh secret, insufficient scope).
	#[error("Provider rejected the request: {reason}.")]
	Rejected {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// Client authentication failed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// Non-success HTTP status without a structured OAuth error.
	#[error("Provider responded with HTTP status {status}.")]
	UnexpectedStatus {
		/// HTTP status code.
		status: u16,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Temporary provider-side failure.
	#[error("Provider is temporarily unavailable: {message}.")]
	Transient {
		/// Provider- or broker-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Response body could not be parsed.
	#[error("Provider returned a malformed payload.")]
	MalformedPayload(#[source] serde_path_to_error::Error<serde_json::Error>),
	/// Token response carried no `expires_in`.
	#[error("Token response is missing `expires_in`.")]
	MissingExpiresIn,
	/// Token response carried an `expires_in` that is zero or out of range.
	#[error("Token response carries an invalid `expires_in`.")]
	InvalidExpiresIn,
	/// Profile payload carried an unusable identifier or display name.
	#[error("Profile payload is invalid.")]
	InvalidProfile(#[source] IdentifierError),
	/// Network or IO failure.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Local configuration prevented the request from being built.
	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the identity provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the identity provider.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
