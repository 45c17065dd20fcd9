//! Internal OAuth client facade over the `oauth2` crate.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
	EndpointSet, HttpClientError, RedirectUrl, RefreshToken, RequestTokenError, Scope,
	TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::OAuthClientConfig,
	error::ConfigError,
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::{
		ClientAuthMethod, ProviderDescriptor, ProviderErrorContext, ProviderErrorKind,
		ProviderFailure, ProviderGrant, ProviderOperation, ProviderQuirks, ProviderStrategy,
		TransportError,
	},
};

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderFailure>> + 'a + Send>>;

/// Maps HTTP transport failures into [`ProviderFailure`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a provider failure.
	fn map_transport_error(
		&self,
		operation: ProviderOperation,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> ProviderFailure;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		_operation: ProviderOperation,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> ProviderFailure {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => map_generic_transport_error(meta, message),
			_ => map_generic_transport_error(meta, "unknown transport failure"),
		}
	}
}

/// Token-endpoint half of the OAuth client: authorization URLs, code exchange, refresh.
pub(crate) struct BasicFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredBasicClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
	strategy: Arc<dyn ProviderStrategy>,
	scope: Option<String>,
	quirks: ProviderQuirks,
}
impl<C, M> BasicFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_descriptor(
		descriptor: &ProviderDescriptor,
		client: &OAuthClientConfig,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
		strategy: Arc<dyn ProviderStrategy>,
	) -> Result<Self, ConfigError> {
		let auth_url = AuthUrl::new(descriptor.endpoints.authorization.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let redirect_url = RedirectUrl::new(client.redirect_uri.to_string())
			.map_err(|source| ConfigError::InvalidRedirect { source })?;
		let mut oauth_client = BasicClient::new(ClientId::new(client.client_id.clone()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url)
			.set_redirect_uri(redirect_url);

		if let Some(secret) = client.client_secret.as_ref() {
			oauth_client =
				oauth_client.set_client_secret(ClientSecret::new(secret.expose().to_owned()));
		}
		if matches!(descriptor.preferred_client_auth_method, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		let scope = (!client.scopes.is_empty())
			.then(|| client.scopes.join(&descriptor.quirks.scope_delimiter.to_string()));

		Ok(Self {
			oauth_client,
			http_client,
			error_mapper,
			strategy,
			scope,
			quirks: descriptor.quirks,
		})
	}

	pub(crate) fn authorize_url(&self, state: &str) -> Url {
		let state = state.to_owned();
		let mut request = self.oauth_client.authorize_url(move || CsrfToken::new(state));

		if let Some(scope) = self.scope.as_ref() {
			request = request.add_scope(Scope::new(scope.clone()));
		}
		if self.quirks.offline_access {
			request = request.add_extra_param("access_type", "offline");
		}

		request.url().0
	}

	pub(crate) fn exchange_code<'a>(
		&'a self,
		code: &'a str,
		slot: ResponseMetadataSlot,
		handle: C::Handle,
	) -> FacadeFuture<'a, ProviderGrant> {
		Box::pin(async move {
			let response = self
				.oauth_client
				.exchange_code(AuthorizationCode::new(code.to_owned()))
				.request_async(&handle)
				.await
				.map_err(|err| {
					self.map_request_error(ProviderOperation::ExchangeCode, slot.take(), err)
				})?;

			map_token_response(response)
		})
	}

	pub(crate) fn refresh<'a>(
		&'a self,
		refresh_secret: &'a TokenSecret,
		slot: ResponseMetadataSlot,
		handle: C::Handle,
	) -> FacadeFuture<'a, ProviderGrant> {
		Box::pin(async move {
			let refresh_token = RefreshToken::new(refresh_secret.expose().to_owned());
			let response = self
				.oauth_client
				.exchange_refresh_token(&refresh_token)
				.request_async(&handle)
				.await
				.map_err(|err| {
					self.map_request_error(ProviderOperation::RefreshCredential, slot.take(), err)
				})?;

			map_token_response(response)
		})
	}

	pub(crate) fn http_client(&self) -> &C {
		&self.http_client
	}

	pub(crate) fn error_mapper(&self) -> &M {
		&self.error_mapper
	}

	fn map_request_error(
		&self,
		operation: ProviderOperation,
		meta: Option<ResponseMetadata>,
		err: BasicRequestTokenError<HttpClientError<C::TransportError>>,
	) -> ProviderFailure {
		let meta_ref = meta.as_ref();

		match err {
			RequestTokenError::ServerResponse(response) =>
				self.map_server_response_error(operation, response, meta_ref),
			RequestTokenError::Request(error) =>
				self.error_mapper.map_transport_error(operation, meta_ref, error),
			RequestTokenError::Parse(error, _body) => ProviderFailure::MalformedPayload(error),
			RequestTokenError::Other(message) => ProviderFailure::Transient {
				message: format!("token endpoint returned an unexpected response: {message}"),
				status: meta_status(meta_ref),
				retry_after: meta_retry_after(meta_ref),
			},
		}
	}

	fn map_server_response_error(
		&self,
		operation: ProviderOperation,
		response: BasicErrorResponse,
		meta: Option<&ResponseMetadata>,
	) -> ProviderFailure {
		let mut ctx = ProviderErrorContext::new(operation)
			.with_oauth_error(response.error().as_ref().to_string());

		if let Some(description) = response.error_description() {
			ctx = ctx.with_error_description(description.clone());
		}
		if let Some(status) = meta_status(meta) {
			ctx = ctx.with_http_status(status);
		}

		let reason = response
			.error_description()
			.cloned()
			.unwrap_or_else(|| response.error().as_ref().to_string());

		classified_failure(self.strategy.classify(&ctx), reason, meta)
	}
}

fn classified_failure(
	kind: ProviderErrorKind,
	reason: String,
	meta: Option<&ResponseMetadata>,
) -> ProviderFailure {
	match kind {
		ProviderErrorKind::Rejected => ProviderFailure::Rejected { reason },
		ProviderErrorKind::InvalidClient => ProviderFailure::InvalidClient { reason },
		ProviderErrorKind::Transient => ProviderFailure::Transient {
			message: reason,
			status: meta_status(meta),
			retry_after: meta_retry_after(meta),
		},
	}
}

fn map_token_response(response: BasicTokenResponse) -> Result<ProviderGrant, ProviderFailure> {
	let expires_in = response.expires_in().ok_or(ProviderFailure::MissingExpiresIn)?;
	let expires_in =
		Duration::try_from(expires_in).map_err(|_| ProviderFailure::InvalidExpiresIn)?;

	if !expires_in.is_positive() {
		return Err(ProviderFailure::InvalidExpiresIn);
	}

	let expires_at = OffsetDateTime::now_utc()
		.checked_add(expires_in)
		.ok_or(ProviderFailure::InvalidExpiresIn)?;

	Ok(ProviderGrant {
		access_secret: TokenSecret::new(response.access_token().secret().to_owned()),
		refresh_secret: response
			.refresh_token()
			.map(|token| TokenSecret::new(token.secret().to_owned())),
		token_kind: response.token_type().as_ref().to_owned(),
		expires_at,
	})
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(meta: Option<&ResponseMetadata>, err: ReqwestError) -> ProviderFailure {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return ProviderFailure::Transient {
			message: "request timed out while calling the identity provider".into(),
			status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
			retry_after: meta_retry_after(meta),
		};
	}

	TransportError::from(err).into()
}

#[cfg(feature = "reqwest")]
fn map_generic_transport_error(
	meta: Option<&ResponseMetadata>,
	message: impl Display,
) -> ProviderFailure {
	ProviderFailure::Transient {
		message: format!("HTTP client error occurred while calling the identity provider: {message}"),
		status: meta_status(meta),
		retry_after: meta_retry_after(meta),
	}
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}
