//! Fixtures shared by the integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::HashMap,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};
// crates.io
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};
// self
use session_broker::{
	auth::{
		DisplayName, ExternalId, ExternalIdentity, InternalUser, ProviderCredential,
		SessionCredential, TokenSecret, UserId,
	},
	config::{IssuerConfig, RefreshRotation},
	context::CallContext,
	flows::SessionOrchestrator,
	provider::{ProviderGrant, ScriptedIdentityProvider},
	store::{MemoryStore, SessionStore, StoreFuture},
	token::TokenIssuer,
};

pub const SIGNING_SECRET: &str = "integration-signing-secret";

/// [`SessionStore`] wrapper that counts calls per method and can hide one user lookup.
#[derive(Debug, Default)]
pub struct RecordingStore {
	inner: MemoryStore,
	calls: Mutex<HashMap<&'static str, usize>>,
	hide_next_user: AtomicBool,
}
impl RecordingStore {
	pub fn inner(&self) -> &MemoryStore {
		&self.inner
	}

	/// Number of calls made to `method`.
	pub fn calls(&self, method: &str) -> usize {
		self.calls.lock().get(method).copied().unwrap_or(0)
	}

	/// Total number of calls across all methods.
	pub fn total_calls(&self) -> usize {
		self.calls.lock().values().sum()
	}

	/// Makes the next `fetch_user` report no match, as if another process inserted the user
	/// right after the lookup.
	pub fn hide_next_user_lookup(&self) {
		self.hide_next_user.store(true, Ordering::SeqCst);
	}

	fn record(&self, method: &'static str) {
		*self.calls.lock().entry(method).or_default() += 1;
	}
}
impl SessionStore for RecordingStore {
	fn fetch_user<'a>(
		&'a self,
		ctx: &'a CallContext,
		display_name: &'a DisplayName,
	) -> StoreFuture<'a, Option<InternalUser>> {
		self.record("fetch_user");

		let hide = self.hide_next_user.swap(false, Ordering::SeqCst);

		Box::pin(async move {
			let user = self.inner.fetch_user(ctx, display_name).await?;

			Ok(if hide { None } else { user })
		})
	}

	fn insert_user<'a>(&'a self, ctx: &'a CallContext, user: InternalUser) -> StoreFuture<'a, ()> {
		self.record("insert_user");
		self.inner.insert_user(ctx, user)
	}

	fn save_external_identity<'a>(
		&'a self,
		ctx: &'a CallContext,
		identity: ExternalIdentity,
	) -> StoreFuture<'a, ()> {
		self.record("save_external_identity");
		self.inner.save_external_identity(ctx, identity)
	}

	fn fetch_external_identity<'a>(
		&'a self,
		ctx: &'a CallContext,
		external_id: &'a ExternalId,
	) -> StoreFuture<'a, Option<ExternalIdentity>> {
		self.record("fetch_external_identity");
		self.inner.fetch_external_identity(ctx, external_id)
	}

	fn save_provider_credential<'a>(
		&'a self,
		ctx: &'a CallContext,
		credential: ProviderCredential,
	) -> StoreFuture<'a, ()> {
		self.record("save_provider_credential");
		self.inner.save_provider_credential(ctx, credential)
	}

	fn fetch_provider_credential<'a>(
		&'a self,
		ctx: &'a CallContext,
		owner: &'a UserId,
	) -> StoreFuture<'a, Option<ProviderCredential>> {
		self.record("fetch_provider_credential");
		self.inner.fetch_provider_credential(ctx, owner)
	}

	fn fetch_provider_credential_by_external<'a>(
		&'a self,
		ctx: &'a CallContext,
		external_id: &'a ExternalId,
	) -> StoreFuture<'a, Option<ProviderCredential>> {
		self.record("fetch_provider_credential_by_external");
		self.inner.fetch_provider_credential_by_external(ctx, external_id)
	}

	fn save_session_credential<'a>(
		&'a self,
		ctx: &'a CallContext,
		credential: SessionCredential,
	) -> StoreFuture<'a, ()> {
		self.record("save_session_credential");
		self.inner.save_session_credential(ctx, credential)
	}

	fn fetch_session_credential<'a>(
		&'a self,
		ctx: &'a CallContext,
		owner: &'a UserId,
	) -> StoreFuture<'a, Option<SessionCredential>> {
		self.record("fetch_session_credential");
		self.inner.fetch_session_credential(ctx, owner)
	}
}

/// Orchestrator wired to a scripted provider and a recording store.
pub struct Harness {
	pub orchestrator: SessionOrchestrator,
	pub provider: Arc<ScriptedIdentityProvider>,
	pub store: Arc<RecordingStore>,
}
impl Harness {
	pub fn new() -> Self {
		Self::with_rotation(RefreshRotation::default())
	}

	pub fn with_rotation(rotation: RefreshRotation) -> Self {
		let provider = Arc::new(ScriptedIdentityProvider::new());
		let store = Arc::new(RecordingStore::default());
		let orchestrator = SessionOrchestrator::new(issuer(), provider.clone(), store.clone())
			.with_rotation(rotation);

		Self { orchestrator, provider, store }
	}

	/// Scripts `code` to yield `access`/`refresh` valid for `ttl` and the `42`/`Hero#1234`
	/// profile.
	pub fn script_login(&self, code: &str, access: &str, refresh: &str, ttl: Duration) {
		self.provider
			.script_exchange(code, grant(access, Some(refresh), OffsetDateTime::now_utc() + ttl))
			.script_profile(access, identity(42, "Hero#1234"));
	}
}

pub fn issuer() -> TokenIssuer {
	TokenIssuer::new(&IssuerConfig::new(TokenSecret::new(SIGNING_SECRET)))
		.expect("Issuer fixture should build.")
}

pub fn grant(access: &str, refresh: Option<&str>, expires_at: OffsetDateTime) -> ProviderGrant {
	ProviderGrant {
		access_secret: TokenSecret::new(access),
		refresh_secret: refresh.map(TokenSecret::new),
		token_kind: "bearer".into(),
		expires_at,
	}
}

pub fn identity(id: u64, name: &str) -> ExternalIdentity {
	ExternalIdentity {
		external_id: ExternalId::from(id),
		display_name: DisplayName::new(name).expect("Display name fixture should be valid."),
	}
}

#[cfg(feature = "reqwest")]
/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
/// `httpmock`.
pub fn test_reqwest_http_client() -> session_broker::http::ReqwestHttpClient {
	let client = session_broker::reqwest::Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.redirect(session_broker::reqwest::redirect::Policy::none())
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	session_broker::http::ReqwestHttpClient::with_client(client)
}
