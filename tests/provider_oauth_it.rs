#![cfg(feature = "reqwest")]

mod support;

// std
use std::{collections::HashMap, sync::Arc, time::Duration as StdDuration};
// crates.io
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
// self
use session_broker::{
	auth::{ExternalId, ProviderId, TokenSecret},
	config::OAuthClientConfig,
	context::CallContext,
	error::Error,
	oauth::ReqwestTransportErrorMapper,
	provider::{
		ClientAuthMethod, DefaultProviderStrategy, IdentityProvider, OAuthIdentityProvider,
		ProviderDescriptor, ProviderError, ProviderFailure, ProviderQuirks,
		ReqwestIdentityProvider,
	},
	url::Url,
};
use support::test_reqwest_http_client;

const CLIENT_ID: &str = "client-it";
const CLIENT_SECRET: &str = "secret-it";

fn build_provider(server: &MockServer) -> ReqwestIdentityProvider {
	let provider_id =
		ProviderId::new("mock-battle-net").expect("Provider identifier should be valid.");
	let descriptor = ProviderDescriptor::builder(provider_id)
		.authorization_endpoint(
			Url::parse(&server.url("/authorize"))
				.expect("Mock authorization endpoint should parse successfully."),
		)
		.token_endpoint(
			Url::parse(&server.url("/token")).expect("Mock token endpoint should parse."),
		)
		.userinfo_endpoint(
			Url::parse(&server.url("/userinfo"))
				.expect("Mock userinfo endpoint should parse successfully."),
		)
		.preferred_client_auth_method(ClientAuthMethod::ClientSecretPost)
		.quirks(ProviderQuirks { offline_access: true, ..Default::default() })
		.build()
		.expect("Provider descriptor should build successfully.");
	let client = OAuthClientConfig::new(
		CLIENT_ID,
		Url::parse("https://app.example.com/callback").expect("Redirect URI should parse."),
	)
	.with_client_secret(CLIENT_SECRET)
	.with_scopes(["openid", "wow.profile"]);

	OAuthIdentityProvider::with_http_client(
		descriptor,
		&client,
		Arc::new(DefaultProviderStrategy),
		test_reqwest_http_client(),
		ReqwestTransportErrorMapper,
	)
	.expect("Provider should build from the mock descriptor.")
}

#[tokio::test]
async fn authorization_url_targets_mock_endpoint() {
	let server = MockServer::start_async().await;
	let provider = build_provider(&server);
	let url = provider.authorization_url("opaque").expect("Authorization URL should build.");
	let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();

	assert!(url.as_str().starts_with(&server.url("/authorize")));
	assert_eq!(pairs.get("client_id"), Some(&CLIENT_ID.into()));
	assert_eq!(pairs.get("state"), Some(&"opaque".into()));
	assert_eq!(pairs.get("scope"), Some(&"openid wow.profile".into()));
	assert_eq!(pairs.get("access_type"), Some(&"offline".into()));
}

#[tokio::test]
async fn exchange_and_profile_succeed() {
	let server = MockServer::start_async().await;
	let provider = build_provider(&server);
	let ctx = CallContext::new();
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200).header("content-type", "application/json").body(concat!(
				"{\"access_token\":\"P1\",\"refresh_token\":\"R1\",",
				"\"token_type\":\"bearer\",\"expires_in\":3600}",
			));
		})
		.await;
	let userinfo_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/userinfo").header("authorization", "Bearer P1");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"sub\":\"42\",\"id\":42,\"battletag\":\"Hero#1234\"}");
		})
		.await;
	let grant =
		provider.exchange_code(&ctx, "abc123").await.expect("Code exchange should succeed.");

	token_mock.assert_async().await;

	assert_eq!(grant.access_secret.expose(), "P1");
	assert_eq!(grant.refresh_secret.as_ref().map(TokenSecret::expose), Some("R1"));
	assert_eq!(grant.token_kind, "bearer");
	assert!(grant.expires_at > OffsetDateTime::now_utc() + Duration::minutes(59));

	let identity = provider
		.fetch_profile(&ctx, &grant.access_secret)
		.await
		.expect("Profile fetch should succeed.");

	userinfo_mock.assert_async().await;

	assert_eq!(identity.external_id, ExternalId::from(42));
	assert_eq!(identity.display_name.as_ref(), "Hero#1234");
}

#[tokio::test]
async fn rejected_code_is_classified() {
	let server = MockServer::start_async().await;
	let provider = build_provider(&server);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400).header("content-type", "application/json").body(
				"{\"error\":\"invalid_grant\",\"error_description\":\"code already used\"}",
			);
		})
		.await;

	let err = provider
		.exchange_code(&CallContext::new(), "used-code")
		.await
		.expect_err("Reused code must be rejected.");

	match err {
		Error::Provider(ProviderError::ExchangeFailed(ProviderFailure::Rejected { reason })) =>
			assert_eq!(reason, "code already used"),
		other => panic!("Unexpected error variant: {other:?}."),
	}
}

#[tokio::test]
async fn token_response_without_expiry_is_rejected() {
	let server = MockServer::start_async().await;
	let provider = build_provider(&server);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"P1\",\"token_type\":\"bearer\"}");
		})
		.await;

	let err = provider
		.exchange_code(&CallContext::new(), "abc123")
		.await
		.expect_err("Token response without expires_in must be rejected.");

	assert!(matches!(
		err,
		Error::Provider(ProviderError::ExchangeFailed(ProviderFailure::MissingExpiresIn))
	));
}

#[tokio::test]
async fn userinfo_failures_are_profile_errors() {
	let server = MockServer::start_async().await;
	let provider = build_provider(&server);
	let ctx = CallContext::new();

	server
		.mock_async(|when, then| {
			when.method(GET).path("/userinfo").header("authorization", "Bearer revoked");
			then.status(401).header("retry-after", "30");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/userinfo").header("authorization", "Bearer garbled");
			then.status(200).header("content-type", "application/json").body("{\"id\":\"x\"}");
		})
		.await;

	let err = provider
		.fetch_profile(&ctx, &TokenSecret::new("revoked"))
		.await
		.expect_err("Non-success userinfo status must fail.");

	match err {
		Error::Provider(ProviderError::ProfileFetchFailed(ProviderFailure::UnexpectedStatus {
			status,
			retry_after,
		})) => {
			assert_eq!(status, 401);
			assert_eq!(retry_after, Some(Duration::seconds(30)));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	let err = provider
		.fetch_profile(&ctx, &TokenSecret::new("garbled"))
		.await
		.expect_err("Malformed userinfo payload must fail.");

	match err {
		Error::Provider(ProviderError::ProfileFetchFailed(ProviderFailure::MalformedPayload(
			source,
		))) => assert_eq!(source.path().to_string(), "id"),
		other => panic!("Unexpected error variant: {other:?}."),
	}
}

#[tokio::test]
async fn refresh_without_new_refresh_secret_omits_it() {
	let server = MockServer::start_async().await;
	let provider = build_provider(&server);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"P2\",\"token_type\":\"bearer\",\"expires_in\":1800}");
		})
		.await;

	let grant = provider
		.refresh_credential(&CallContext::new(), &TokenSecret::new("R1"))
		.await
		.expect("Provider refresh should succeed.");

	assert_eq!(grant.access_secret.expose(), "P2");
	assert!(grant.refresh_secret.is_none());
}

#[tokio::test]
async fn slow_provider_is_cut_off_at_the_deadline() {
	let server = MockServer::start_async().await;
	let provider = build_provider(&server);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.delay(StdDuration::from_secs(3))
				.header("content-type", "application/json")
				.body("{\"access_token\":\"P1\",\"token_type\":\"bearer\",\"expires_in\":3600}");
		})
		.await;

	let ctx = CallContext::new().with_timeout(Duration::milliseconds(200));
	let err = provider
		.exchange_code(&ctx, "abc123")
		.await
		.expect_err("Exchange past the caller deadline must fail.");

	assert!(matches!(err, Error::DeadlineExceeded));
}
