//! Transport primitives for identity provider calls.
//!
//! The module exposes [`TokenHttpClient`] alongside [`ResponseMetadata`] and
//! [`ResponseMetadataSlot`] so downstream crates can plug in custom HTTP clients
//! without losing error classification. Implementations call
//! [`ResponseMetadataSlot::take`] before dispatching a request and
//! [`ResponseMetadataSlot::store`] once an HTTP status or retry hint is known.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
use std::time::Duration as StdDuration;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
#[cfg(feature = "reqwest")] use reqwest::{
	header::{HeaderMap, RETRY_AFTER},
	redirect::Policy,
};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Abstraction over HTTP transports used for token and userinfo requests.
///
/// Callers provide an implementation (typically behind `Arc<T>`) and the live provider
/// requests short-lived [`AsyncHttpClient`] handles that each carry a clone of a
/// [`ResponseMetadataSlot`] plus the time left on the caller's deadline. Handles must own
/// whatever state they need so their request futures remain `Send`.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle tied to a [`ResponseMetadataSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds a handle that records outcomes in `slot`.
	///
	/// When `timeout` is set, requests issued through the handle must be aborted once it
	/// elapses, overriding any longer client-wide timeout.
	///
	/// # Metadata Contract
	///
	/// - Call [`ResponseMetadataSlot::take`] before submitting the HTTP request so stale
	///   information never leaks across requests.
	/// - Once an HTTP response (successful or erroneous) provides status headers, save them with
	///   [`ResponseMetadataSlot::store`].
	fn handle(&self, slot: ResponseMetadataSlot, timeout: Option<StdDuration>) -> Self::Handle;
}

/// Captures metadata from the most recent HTTP response for downstream error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the provider, if available.
	pub status: Option<u16>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token and userinfo endpoints answer directly, so redirects are never followed. Configure
/// any custom [`ReqwestClient`] passed to [`with_client`](Self::with_client) the same way.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Network timeout applied to every request when the caller sets no tighter deadline.
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(10);

	/// Builds a client with the default timeout and redirects disabled.
	pub fn new() -> Result<Self, ConfigError> {
		Self::with_timeout(Self::DEFAULT_TIMEOUT)
	}

	/// Builds a client with a custom network timeout and redirects disabled.
	pub fn with_timeout(timeout: StdDuration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().timeout(timeout).redirect(Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type Handle = InstrumentedHandle;
	type TransportError = ReqwestError;

	fn handle(&self, slot: ResponseMetadataSlot, timeout: Option<StdDuration>) -> Self::Handle {
		InstrumentedHandle::new(self.0.clone(), slot, timeout)
	}
}

#[cfg(feature = "reqwest")]
struct InstrumentedHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
	timeout: Option<StdDuration>,
}

/// Handle returned by [`ReqwestHttpClient`] that satisfies [`TokenHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
#[cfg(feature = "reqwest")]
impl InstrumentedHandle {
	fn new(client: ReqwestClient, slot: ResponseMetadataSlot, timeout: Option<StdDuration>) -> Self {
		Self(Arc::new(InstrumentedHttpClient { client, slot, timeout }))
	}
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let mut request: reqwest::Request = request.try_into().map_err(Box::new)?;

			if let Some(timeout) = client.timeout {
				*request.timeout_mut() = Some(timeout);
			}

			let response = client.client.execute(request).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let retry_after = parse_retry_after(&headers);

			client.slot.store(ResponseMetadata { status: Some(status.as_u16()), retry_after });

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<i64>() {
		return Some(Duration::seconds(secs));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
