mod support;

// std
use std::{sync::Arc, time::Duration as StdDuration};
// crates.io
use time::{Duration, OffsetDateTime};
// self
use session_broker::{
	auth::{DisplayName, ExternalId, InternalUser, UserId},
	context::CallContext,
	error::{Error, InputError},
	provider::{ProviderError, ProviderFailure, ProviderOperation},
	store::SessionStore,
	token::TokenKind,
};
use support::{Harness, grant, identity};

#[tokio::test]
async fn callback_creates_user_and_issues_keyed_tokens() {
	let harness = Harness::new();
	let ctx = CallContext::new();

	harness.script_login("abc123", "P1", "R1", Duration::hours(1));

	let tokens = harness
		.orchestrator
		.complete_callback(&ctx, "abc123")
		.await
		.expect("Callback with a scripted code should succeed.");
	let issuer = harness.orchestrator.issuer();
	let access = issuer.validate(tokens.access.as_str()).expect("Access token should validate.");
	let refresh = issuer.validate(tokens.refresh.as_str()).expect("Refresh token should validate.");

	assert_eq!(access.extract_subject(TokenKind::Access), Ok("42"));

	let name = DisplayName::new("Hero#1234").expect("Display name fixture should be valid.");
	let user = harness
		.store
		.inner()
		.fetch_user(&ctx, &name)
		.await
		.expect("User lookup should succeed.")
		.expect("Callback should create the user.");

	assert_eq!(refresh.extract_subject(TokenKind::Refresh), Ok(user.id.as_ref()));

	let identity = harness
		.store
		.inner()
		.fetch_external_identity(&ctx, &ExternalId::from(42))
		.await
		.expect("Identity lookup should succeed.")
		.expect("Callback should upsert the external identity.");
	let credential = harness
		.store
		.inner()
		.fetch_provider_credential(&ctx, &user.id)
		.await
		.expect("Credential lookup should succeed.")
		.expect("Callback should upsert the provider credential.");
	let session = harness
		.store
		.inner()
		.fetch_session_credential(&ctx, &user.id)
		.await
		.expect("Session lookup should succeed.")
		.expect("Callback should upsert the session credential.");

	assert_eq!(identity.display_name, name);
	assert_eq!(credential.access_secret.expose(), "P1");
	assert_eq!(credential.refresh_secret.as_ref().map(|secret| secret.expose()), Some("R1"));
	assert_eq!(credential.external_id, ExternalId::from(42));
	assert_eq!(session.refresh_secret.expose(), tokens.refresh.as_str());
	assert_eq!(session.expires_at, tokens.refresh.expires_at());
	assert!(session.expires_at > OffsetDateTime::now_utc() + Duration::days(29));
	assert_eq!(harness.orchestrator.metrics().logins_completed(), 1);
	assert_eq!(harness.orchestrator.metrics().users_created(), 1);
}

#[tokio::test]
async fn empty_code_fails_without_collaborator_calls() {
	let harness = Harness::new();
	let err = harness
		.orchestrator
		.complete_callback(&CallContext::new(), "")
		.await
		.expect_err("Empty code must be rejected.");

	assert!(matches!(err, Error::Input(InputError::EmptyCode)));
	assert_eq!(harness.provider.calls().network(), 0);
	assert_eq!(harness.store.total_calls(), 0);
	assert_eq!(harness.orchestrator.metrics().failures(), 1);
}

#[tokio::test]
async fn repeated_callbacks_reuse_the_same_user() {
	let harness = Harness::new();
	let ctx = CallContext::new();

	harness.script_login("code-1", "P1", "R1", Duration::hours(1));
	harness.script_login("code-2", "P2", "R2", Duration::hours(1));

	let first = harness
		.orchestrator
		.complete_callback(&ctx, "code-1")
		.await
		.expect("First callback should succeed.");
	let second = harness
		.orchestrator
		.complete_callback(&ctx, "code-2")
		.await
		.expect("Second callback should succeed.");
	let issuer = harness.orchestrator.issuer();
	let first_user = issuer
		.validate(first.refresh.as_str())
		.expect("First refresh token should validate.")
		.sub
		.clone();
	let second_user = issuer
		.validate(second.refresh.as_str())
		.expect("Second refresh token should validate.")
		.sub
		.clone();

	assert_eq!(first_user, second_user);
	assert_eq!(harness.store.calls("insert_user"), 1);
	assert_eq!(harness.orchestrator.metrics().users_created(), 1);

	let user_id = UserId::new(first_user.expect("Refresh token should carry a subject."))
		.expect("Subject should be a valid user id.");
	let credential = harness
		.store
		.inner()
		.fetch_provider_credential(&ctx, &user_id)
		.await
		.expect("Credential lookup should succeed.")
		.expect("Credential should exist.");

	assert_eq!(credential.access_secret.expose(), "P2");
}

#[tokio::test]
async fn concurrent_first_logins_create_one_user() {
	let harness = Arc::new(Harness::new());

	for n in 0..8 {
		harness.script_login(&format!("code-{n}"), &format!("P{n}"), "R", Duration::hours(1));
	}

	let tasks = (0..8)
		.map(|n| {
			let harness = harness.clone();

			tokio::spawn(async move {
				harness
					.orchestrator
					.complete_callback(&CallContext::new(), &format!("code-{n}"))
					.await
			})
		})
		.collect::<Vec<_>>();

	for task in tasks {
		task.await
			.expect("Callback task should not panic.")
			.expect("Concurrent callback should succeed.");
	}

	assert_eq!(harness.store.calls("insert_user"), 1);
	assert_eq!(harness.orchestrator.metrics().users_created(), 1);
}

#[tokio::test]
async fn insert_conflict_falls_back_to_existing_user() {
	let harness = Harness::new();
	let ctx = CallContext::new();
	let existing =
		InternalUser::new(DisplayName::new("Hero#1234").expect("Display name should be valid."));

	harness
		.store
		.inner()
		.insert_user(&ctx, existing.clone())
		.await
		.expect("Seeding the competing user should succeed.");
	harness.store.hide_next_user_lookup();
	harness.script_login("abc123", "P1", "R1", Duration::hours(1));

	let tokens = harness
		.orchestrator
		.complete_callback(&ctx, "abc123")
		.await
		.expect("Callback should recover from the insert conflict.");
	let refresh = harness
		.orchestrator
		.issuer()
		.validate(tokens.refresh.as_str())
		.expect("Refresh token should validate.");

	assert_eq!(refresh.extract_subject(TokenKind::Refresh), Ok(existing.id.as_ref()));
	assert_eq!(harness.store.calls("insert_user"), 1);
	assert_eq!(harness.store.calls("fetch_user"), 2);
	assert_eq!(harness.orchestrator.metrics().users_created(), 0);
}

#[tokio::test]
async fn provider_failure_stops_before_any_write() {
	let harness = Harness::new();
	let err = harness
		.orchestrator
		.complete_callback(&CallContext::new(), "unknown-code")
		.await
		.expect_err("Unscripted code must be rejected by the provider.");

	assert!(matches!(
		err,
		Error::Provider(ProviderError::ExchangeFailed(ProviderFailure::Rejected { .. }))
	));
	assert_eq!(err.status_hint(), 502);
	assert_eq!(harness.provider.calls().profile, 0);
	assert_eq!(harness.store.total_calls(), 0);
}

#[tokio::test]
async fn cancellation_abandons_in_flight_profile_fetch() {
	let harness = Harness::new();
	let ctx = CallContext::new();
	let flag = ctx.cancellation().clone();

	harness.script_login("abc123", "P1", "R1", Duration::hours(1));
	harness.provider.stall(ProviderOperation::FetchProfile);

	tokio::spawn(async move {
		tokio::time::sleep(StdDuration::from_millis(20)).await;
		flag.cancel();
	});

	let err = harness
		.orchestrator
		.complete_callback(&ctx, "abc123")
		.await
		.expect_err("Cancelled callback must fail.");

	assert!(matches!(err, Error::Cancelled));
	assert_eq!(harness.provider.calls().profile, 1);
	assert_eq!(harness.store.total_calls(), 0);
}

#[tokio::test]
async fn renamed_identity_is_upserted_with_a_new_user() {
	let harness = Harness::new();
	let ctx = CallContext::new();
	let expires_at = OffsetDateTime::now_utc() + Duration::hours(1);

	harness
		.provider
		.script_exchange("code-1", grant("P1", Some("R1"), expires_at))
		.script_profile("P1", identity(42, "Hero#1234"))
		.script_exchange("code-2", grant("P2", Some("R2"), expires_at))
		.script_profile("P2", identity(42, "Legend#5678"));

	let first = harness
		.orchestrator
		.complete_callback(&ctx, "code-1")
		.await
		.expect("First callback should succeed.");
	let second = harness
		.orchestrator
		.complete_callback(&ctx, "code-2")
		.await
		.expect("Callback after a rename should succeed.");
	let stored = harness
		.store
		.inner()
		.fetch_external_identity(&ctx, &ExternalId::from(42))
		.await
		.expect("Identity lookup should succeed.")
		.expect("Identity should exist.");

	assert_eq!(stored, identity(42, "Legend#5678"));
	assert_eq!(harness.store.calls("save_external_identity"), 2);

	let mut owners = Vec::new();

	for name in ["Hero#1234", "Legend#5678"] {
		let name = DisplayName::new(name).expect("Display name fixture should be valid.");
		let user = harness
			.store
			.inner()
			.fetch_user(&ctx, &name)
			.await
			.expect("User lookup should succeed.")
			.expect("Each display name should own a user.");

		owners.push(user.id);
	}

	let issuer = harness.orchestrator.issuer();
	let subject = |token: &str| issuer.validate(token).expect("Refresh token should validate.").sub;

	assert_ne!(owners[0], owners[1]);
	assert_eq!(subject(first.refresh.as_str()).as_deref(), Some(owners[0].as_ref()));
	assert_eq!(subject(second.refresh.as_str()).as_deref(), Some(owners[1].as_ref()));
	assert_eq!(harness.orchestrator.metrics().users_created(), 2);
}

#[tokio::test]
async fn deadline_abandons_in_flight_profile_fetch() {
	let harness = Harness::new();
	let ctx = CallContext::new().with_timeout(Duration::milliseconds(50));

	harness.script_login("abc123", "P1", "R1", Duration::hours(1));
	harness.provider.stall(ProviderOperation::FetchProfile);

	let err = tokio::time::timeout(
		StdDuration::from_secs(2),
		harness.orchestrator.complete_callback(&ctx, "abc123"),
	)
	.await
	.expect("Deadline should end the callback before the outer timeout.")
	.expect_err("Callback past its deadline must fail.");

	assert!(matches!(err, Error::DeadlineExceeded));
	assert_eq!(harness.provider.calls().profile, 1);
	assert_eq!(harness.store.total_calls(), 0);
}

#[tokio::test]
async fn elapsed_deadline_prevents_the_exchange() {
	let harness = Harness::new();
	let ctx = CallContext::new().with_deadline(OffsetDateTime::now_utc() - Duration::seconds(1));

	harness.script_login("abc123", "P1", "R1", Duration::hours(1));

	let err = harness
		.orchestrator
		.complete_callback(&ctx, "abc123")
		.await
		.expect_err("Callback past its deadline must fail.");

	assert!(matches!(err, Error::DeadlineExceeded));
	assert_eq!(err.status_hint(), 504);
	assert_eq!(harness.provider.calls().network(), 0);
}
