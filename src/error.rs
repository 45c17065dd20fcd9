//! Crate-level error taxonomy shared by the issuer, collaborators, and flows.

// self
use crate::{
	_prelude::*,
	provider::{ProviderDescriptorError, ProviderError},
	store::StoreError,
	token::{TokenError, TokenKind},
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

/// Canonical error exposed by every public operation.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Caller supplied empty or malformed input.
	#[error(transparent)]
	Input(#[from] InputError),
	/// Session token failed validation or discrimination.
	#[error(transparent)]
	Token(#[from] TokenError),
	/// External identity provider call failed.
	#[error(transparent)]
	Provider(#[from] ProviderError),
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		StoreError,
	),
	/// No stored record matched the lookup key.
	#[error(transparent)]
	NotFound(#[from] NotFoundError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// Caller cancelled the operation.
	#[error("Operation was cancelled by the caller.")]
	Cancelled,
	/// Caller deadline elapsed before the operation finished.
	#[error("Operation deadline elapsed.")]
	DeadlineExceeded,
}
impl Error {
	/// Returns the coarse taxonomy bucket of the error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Input(_) => ErrorKind::Input,
			Self::Token(_) => ErrorKind::Token,
			Self::Provider(_) => ErrorKind::Provider,
			Self::Storage(_) => ErrorKind::Persistence,
			Self::NotFound(_) => ErrorKind::NotFound,
			Self::Config(_) => ErrorKind::Config,
			Self::Cancelled => ErrorKind::Cancelled,
			Self::DeadlineExceeded => ErrorKind::DeadlineExceeded,
		}
	}

	/// Suggested HTTP status for transport layers that surface this error.
	pub fn status_hint(&self) -> u16 {
		match self.kind() {
			ErrorKind::Input => 400,
			ErrorKind::Token => 401,
			ErrorKind::NotFound => 404,
			ErrorKind::Cancelled => 499,
			ErrorKind::Provider => 502,
			ErrorKind::DeadlineExceeded => 504,
			ErrorKind::Persistence | ErrorKind::Config => 500,
		}
	}
}

/// Coarse error classes used for transport mapping, logs, and metrics labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Empty or malformed caller input.
	Input,
	/// Session token failure.
	Token,
	/// Identity provider failure.
	Provider,
	/// Store read/write failure.
	Persistence,
	/// Missing record.
	NotFound,
	/// Local configuration problem.
	Config,
	/// Caller cancellation.
	Cancelled,
	/// Caller deadline elapsed.
	DeadlineExceeded,
}
impl ErrorKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorKind::Input => "input",
			ErrorKind::Token => "token",
			ErrorKind::Provider => "provider",
			ErrorKind::Persistence => "persistence",
			ErrorKind::NotFound => "not_found",
			ErrorKind::Config => "config",
			ErrorKind::Cancelled => "cancelled",
			ErrorKind::DeadlineExceeded => "deadline_exceeded",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Empty or malformed caller input.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum InputError {
	/// Authorization callback arrived without a code.
	#[error("Authorization code is empty.")]
	EmptyCode,
	/// Bearer token is missing from the request.
	#[error("Bearer token is empty.")]
	EmptyToken,
}

/// Lookup failure for a record that must exist.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("No {entity} record matches `{key}`.")]
pub struct NotFoundError {
	/// Record family that was queried.
	pub entity: &'static str,
	/// Lookup key that produced no match.
	pub key: String,
}
impl NotFoundError {
	/// Builds a not-found error for the given record family and key.
	pub fn new(entity: &'static str, key: impl Display) -> Self {
		Self { entity, key: key.to_string() }
	}
}

/// Configuration and construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// The session signing secret is empty.
	#[error("Session signing secret cannot be empty.")]
	EmptySigningSecret,
	/// A session token lifetime is zero or negative.
	#[error("The {kind} token lifetime must be positive.")]
	NonPositiveLifetime {
		/// Token class with the invalid lifetime.
		kind: TokenKind,
	},
	/// The signing key could not produce a token.
	#[error("Session token could not be signed.")]
	TokenSigning {
		/// Underlying signing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] ProviderDescriptorError),
	/// An endpoint URL could not be handed to the OAuth client.
	#[error("Descriptor contains an invalid URL.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
