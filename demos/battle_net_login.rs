//! Prints a Battle.net login URL, then walks a scripted callback through the orchestrator so
//! the issued session can be refreshed and validated offline.

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::Result;
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use session_broker::{
	auth::{DisplayName, ExternalId, ExternalIdentity, TokenSecret},
	config::{OAuthClientConfig, SessionConfig},
	context::CallContext,
	flows::{SessionOrchestrator, generate_state},
	provider::{
		BattleNetRegion, ProviderDescriptor, ProviderGrant, ReqwestIdentityProvider,
		ScriptedIdentityProvider,
	},
	store::MemoryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let client_id = env::var("BNET_CLIENT_ID").unwrap_or_else(|_| "demo-client".into());
	let client = OAuthClientConfig::new(client_id, Url::parse("https://app.example.com/callback")?)
		.with_client_secret("demo-secret")
		.with_scopes(["openid", "wow.profile"]);
	let descriptor = ProviderDescriptor::battle_net(BattleNetRegion::Global)?;
	let config = SessionConfig::new(TokenSecret::new("demo-signing-secret"));
	let live = SessionOrchestrator::from_config(
		&config,
		Arc::new(ReqwestIdentityProvider::new(descriptor, &client)?),
		Arc::new(MemoryStore::default()),
	)?;
	let ctx = CallContext::new().with_timeout(Duration::seconds(10));
	let state = generate_state();

	println!("Send your user to {}.", live.initiate_login(&ctx, &state)?);
	println!("Keep `{state}` to compare against the callback's state parameter.");

	// The rest runs against a scripted provider so no Battle.net round trip is needed.
	let provider = Arc::new(ScriptedIdentityProvider::new());

	provider
		.script_exchange("demo-code", ProviderGrant {
			access_secret: TokenSecret::new("provider-access"),
			refresh_secret: Some(TokenSecret::new("provider-refresh")),
			token_kind: "bearer".into(),
			expires_at: OffsetDateTime::now_utc() + Duration::hours(24),
		})
		.script_profile("provider-access", ExternalIdentity {
			external_id: ExternalId::from(42),
			display_name: DisplayName::new("Hero#1234")?,
		});

	let offline =
		SessionOrchestrator::from_config(&config, provider, Arc::new(MemoryStore::default()))?;
	let tokens = offline.complete_callback(&ctx, "demo-code").await?;
	let external_id = offline.validate_access(&ctx, tokens.access.as_str())?;

	println!("Access token resolves to external id {external_id}.");

	let identity = offline.resolve_identity(&ctx, tokens.access.as_str()).await?;

	println!("Signed in as {}.", identity.display_name);

	let refreshed = offline.refresh_session(&ctx, tokens.refresh.as_str()).await?;

	println!("Refreshed session expires at {}.", refreshed.refresh.expires_at());

	let secret = offline.resolve_provider_access_secret(&ctx, refreshed.access.as_str()).await?;

	println!("Provider access secret has {} characters.", secret.expose().len());

	Ok(())
}
