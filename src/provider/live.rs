//! OAuth 2.0 identity provider backed by a [`TokenHttpClient`].
//!
//! Code exchange and refresh go through the `oauth2` facade; the profile is read from the
//! descriptor's userinfo endpoint and must look like `{"id": <u64>, "battletag": "..."}`.
//! The caller's remaining deadline becomes the per-request timeout of every call, and a
//! transport failure observed after the deadline is reported as
//! [`Error::DeadlineExceeded`].

// crates.io
use oauth2::{
	AsyncHttpClient,
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION},
	},
};
// self
use crate::{
	_prelude::*,
	auth::{DisplayName, ExternalId, ExternalIdentity, TokenSecret},
	config::OAuthClientConfig,
	error::ConfigError,
	http::{ResponseMetadataSlot, TokenHttpClient},
	oauth::{BasicFacade, TransportErrorMapper},
	provider::{
		IdentityProvider, ProviderDescriptor, ProviderError, ProviderFailure, ProviderFuture,
		ProviderGrant, ProviderOperation, ProviderStrategy,
	},
};
#[cfg(feature = "reqwest")]
use crate::{
	http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper, provider::DefaultProviderStrategy,
};

#[cfg(feature = "reqwest")]
/// Identity provider specialized for the crate's default reqwest transport stack.
pub type ReqwestIdentityProvider =
	OAuthIdentityProvider<ReqwestHttpClient, ReqwestTransportErrorMapper>;

#[derive(Deserialize)]
struct UserinfoPayload {
	id: u64,
	battletag: String,
}

/// Live [`IdentityProvider`] speaking OAuth 2.0 to the endpoints of a [`ProviderDescriptor`].
pub struct OAuthIdentityProvider<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	descriptor: ProviderDescriptor,
	client_id: String,
	facade: BasicFacade<C, M>,
}
impl<C, M> OAuthIdentityProvider<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a provider that reuses the caller-provided transport, mapper, and strategy.
	pub fn with_http_client(
		descriptor: ProviderDescriptor,
		client: &OAuthClientConfig,
		strategy: Arc<dyn ProviderStrategy>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self, ConfigError> {
		let facade = BasicFacade::from_descriptor(
			&descriptor,
			client,
			http_client.into(),
			mapper.into(),
			strategy,
		)?;

		Ok(Self { descriptor, client_id: client.client_id.clone(), facade })
	}

	/// Descriptor the provider talks to.
	pub fn descriptor(&self) -> &ProviderDescriptor {
		&self.descriptor
	}

	fn handle(&self, ctx: &CallContext) -> (ResponseMetadataSlot, C::Handle) {
		let slot = ResponseMetadataSlot::default();
		let handle = self.facade.http_client().handle(slot.clone(), ctx.remaining_timeout());

		(slot, handle)
	}

	async fn request_profile(
		&self,
		ctx: &CallContext,
		access_secret: &TokenSecret,
	) -> Result<ExternalIdentity, ProviderFailure> {
		const OPERATION: ProviderOperation = ProviderOperation::FetchProfile;

		let request = Request::builder()
			.method(Method::GET)
			.uri(self.descriptor.endpoints.userinfo.as_str())
			.header(AUTHORIZATION, format!("Bearer {}", access_secret.expose()))
			.header(ACCEPT, "application/json")
			.body(Vec::new())
			.map_err(ConfigError::from)?;
		let (slot, handle) = self.handle(ctx);
		let response = handle.call(request).await.map_err(|err| {
			self.facade.error_mapper().map_transport_error(OPERATION, slot.take().as_ref(), err)
		})?;
		let status = response.status();

		if !status.is_success() {
			return Err(ProviderFailure::UnexpectedStatus {
				status: status.as_u16(),
				retry_after: slot.take().and_then(|meta| meta.retry_after),
			});
		}

		let mut deserializer = serde_json::Deserializer::from_slice(response.body());
		let payload: UserinfoPayload = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(ProviderFailure::MalformedPayload)?;

		Ok(ExternalIdentity {
			external_id: ExternalId::from(payload.id),
			display_name: DisplayName::new(payload.battletag)
				.map_err(ProviderFailure::InvalidProfile)?,
		})
	}
}
#[cfg(feature = "reqwest")]
impl OAuthIdentityProvider<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a provider with the default reqwest transport (10 s timeout, no redirects) and
	/// the default error strategy.
	pub fn new(
		descriptor: ProviderDescriptor,
		client: &OAuthClientConfig,
	) -> Result<Self, ConfigError> {
		Self::with_http_client(
			descriptor,
			client,
			Arc::new(DefaultProviderStrategy),
			ReqwestHttpClient::new()?,
			ReqwestTransportErrorMapper,
		)
	}
}
impl<C, M> IdentityProvider for OAuthIdentityProvider<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn authorization_url(&self, state: &str) -> Result<Url> {
		Ok(self.facade.authorize_url(state))
	}

	fn exchange_code<'a>(
		&'a self,
		ctx: &'a CallContext,
		code: &'a str,
	) -> ProviderFuture<'a, ProviderGrant> {
		const OPERATION: ProviderOperation = ProviderOperation::ExchangeCode;

		Box::pin(async move {
			if code.is_empty() {
				return Err(empty_input(OPERATION, "authorization code"));
			}

			ctx.check()?;

			let (slot, handle) = self.handle(ctx);

			settle(ctx, OPERATION, self.facade.exchange_code(code, slot, handle).await)
		})
	}

	fn fetch_profile<'a>(
		&'a self,
		ctx: &'a CallContext,
		access_secret: &'a TokenSecret,
	) -> ProviderFuture<'a, ExternalIdentity> {
		const OPERATION: ProviderOperation = ProviderOperation::FetchProfile;

		Box::pin(async move {
			if access_secret.is_empty() {
				return Err(empty_input(OPERATION, "provider access secret"));
			}

			ctx.check()?;

			settle(ctx, OPERATION, self.request_profile(ctx, access_secret).await)
		})
	}

	fn refresh_credential<'a>(
		&'a self,
		ctx: &'a CallContext,
		refresh_secret: &'a TokenSecret,
	) -> ProviderFuture<'a, ProviderGrant> {
		const OPERATION: ProviderOperation = ProviderOperation::RefreshCredential;

		Box::pin(async move {
			if refresh_secret.is_empty() {
				return Err(empty_input(OPERATION, "provider refresh secret"));
			}

			ctx.check()?;

			let (slot, handle) = self.handle(ctx);

			settle(ctx, OPERATION, self.facade.refresh(refresh_secret, slot, handle).await)
		})
	}
}
impl<C, M> Debug for OAuthIdentityProvider<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthIdentityProvider")
			.field("descriptor", &self.descriptor)
			.field("client_id", &self.client_id)
			.finish()
	}
}

fn empty_input(operation: ProviderOperation, what: &'static str) -> Error {
	ProviderError::new(operation, ProviderFailure::EmptyInput { what }).into()
}

// Transport failures past the caller's deadline are reported as the deadline, not the provider.
fn settle<T>(
	ctx: &CallContext,
	operation: ProviderOperation,
	result: Result<T, ProviderFailure>,
) -> Result<T> {
	result.map_err(|failure| {
		let interrupted =
			matches!(failure, ProviderFailure::Transport(_) | ProviderFailure::Transient { .. })
				.then(|| ctx.check().err())
				.flatten();

		interrupted.unwrap_or_else(|| ProviderError::new(operation, failure).into())
	})
}
