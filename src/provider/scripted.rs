//! In-memory [`IdentityProvider`] that answers from scripted tables.
//!
//! Useful for tests and local development: codes, access secrets, and refresh secrets are
//! mapped to canned grants and profiles, every call is counted, and individual operations
//! can be stalled to exercise cancellation.

// std
use std::{
	collections::HashSet,
	future,
	sync::atomic::{AtomicU64, Ordering},
};
// self
use crate::{
	_prelude::*,
	auth::{ExternalIdentity, TokenSecret},
	error::ConfigError,
	provider::{
		IdentityProvider, ProviderError, ProviderFailure, ProviderFuture, ProviderGrant,
		ProviderOperation,
	},
};

const AUTHORIZATION_ENDPOINT: &str = "https://identity.test/authorize";

/// Snapshot of the calls a [`ScriptedIdentityProvider`] has served.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScriptedCalls {
	/// `authorization_url` calls.
	pub authorize: u64,
	/// `exchange_code` calls.
	pub exchange: u64,
	/// `fetch_profile` calls.
	pub profile: u64,
	/// `refresh_credential` calls.
	pub refresh: u64,
}
impl ScriptedCalls {
	/// Sum of all network-shaped calls (everything except `authorization_url`).
	pub fn network(&self) -> u64 {
		self.exchange + self.profile + self.refresh
	}
}

#[derive(Debug, Default)]
struct CallCounters {
	authorize: AtomicU64,
	exchange: AtomicU64,
	profile: AtomicU64,
	refresh: AtomicU64,
}

/// Scripted identity provider double.
#[derive(Debug, Default)]
pub struct ScriptedIdentityProvider {
	exchanges: Mutex<HashMap<String, ProviderGrant>>,
	profiles: Mutex<HashMap<String, ExternalIdentity>>,
	refreshes: Mutex<HashMap<String, ProviderGrant>>,
	stalled: Mutex<HashSet<ProviderOperation>>,
	counters: CallCounters,
}
impl ScriptedIdentityProvider {
	/// Creates a provider with empty scripts.
	pub fn new() -> Self {
		Self::default()
	}

	/// Answers `exchange_code(code)` with `grant`.
	pub fn script_exchange(&self, code: impl Into<String>, grant: ProviderGrant) -> &Self {
		self.exchanges.lock().insert(code.into(), grant);

		self
	}

	/// Answers `fetch_profile(access_secret)` with `identity`.
	pub fn script_profile(
		&self,
		access_secret: impl Into<String>,
		identity: ExternalIdentity,
	) -> &Self {
		self.profiles.lock().insert(access_secret.into(), identity);

		self
	}

	/// Answers `refresh_credential(refresh_secret)` with `grant`.
	pub fn script_refresh(&self, refresh_secret: impl Into<String>, grant: ProviderGrant) -> &Self {
		self.refreshes.lock().insert(refresh_secret.into(), grant);

		self
	}

	/// Makes every later call of `operation` hang until the caller gives up.
	pub fn stall(&self, operation: ProviderOperation) -> &Self {
		self.stalled.lock().insert(operation);

		self
	}

	/// Returns the number of calls served so far.
	pub fn calls(&self) -> ScriptedCalls {
		ScriptedCalls {
			authorize: self.counters.authorize.load(Ordering::Relaxed),
			exchange: self.counters.exchange.load(Ordering::Relaxed),
			profile: self.counters.profile.load(Ordering::Relaxed),
			refresh: self.counters.refresh.load(Ordering::Relaxed),
		}
	}

	// Calls are counted once polled, so a call refused by an expired context is not counted.
	async fn answer<T>(
		&self,
		ctx: &CallContext,
		counter: &AtomicU64,
		operation: ProviderOperation,
		input: &str,
		what: &'static str,
		lookup: impl FnOnce(&str) -> Option<T>,
	) -> Result<T> {
		counter.fetch_add(1, Ordering::Relaxed);

		if input.is_empty() {
			return Err(ProviderError::new(operation, ProviderFailure::EmptyInput { what }).into());
		}

		ctx.check()?;

		let stalled = self.stalled.lock().contains(&operation);

		if stalled {
			future::pending::<()>().await;
		}

		lookup(input).ok_or_else(|| {
			ProviderError::new(operation, ProviderFailure::Rejected {
				reason: format!("unknown {what}"),
			})
			.into()
		})
	}
}
impl IdentityProvider for ScriptedIdentityProvider {
	fn authorization_url(&self, state: &str) -> Result<Url> {
		self.counters.authorize.fetch_add(1, Ordering::Relaxed);

		let mut url = Url::parse(AUTHORIZATION_ENDPOINT)
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;

		url.query_pairs_mut().append_pair("response_type", "code").append_pair("state", state);

		Ok(url)
	}

	fn exchange_code<'a>(
		&'a self,
		ctx: &'a CallContext,
		code: &'a str,
	) -> ProviderFuture<'a, ProviderGrant> {
		Box::pin(self.answer(
			ctx,
			&self.counters.exchange,
			ProviderOperation::ExchangeCode,
			code,
			"authorization code",
			|code| self.exchanges.lock().get(code).cloned(),
		))
	}

	fn fetch_profile<'a>(
		&'a self,
		ctx: &'a CallContext,
		access_secret: &'a TokenSecret,
	) -> ProviderFuture<'a, ExternalIdentity> {
		Box::pin(self.answer(
			ctx,
			&self.counters.profile,
			ProviderOperation::FetchProfile,
			access_secret.expose(),
			"provider access secret",
			|secret| self.profiles.lock().get(secret).cloned(),
		))
	}

	fn refresh_credential<'a>(
		&'a self,
		ctx: &'a CallContext,
		refresh_secret: &'a TokenSecret,
	) -> ProviderFuture<'a, ProviderGrant> {
		Box::pin(self.answer(
			ctx,
			&self.counters.refresh,
			ProviderOperation::RefreshCredential,
			refresh_secret.expose(),
			"provider refresh secret",
			|secret| self.refreshes.lock().get(secret).cloned(),
		))
	}
}
