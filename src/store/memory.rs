//! Thread-safe in-memory [`SessionStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{
		DisplayName, ExternalId, ExternalIdentity, InternalUser, ProviderCredential,
		SessionCredential, UserId,
	},
	store::{SessionStore, StoreFuture, StoreTables},
};

/// Thread-safe storage backend that keeps records in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<StoreTables>>);
impl MemoryStore {
	fn read<'a, T>(
		&'a self,
		ctx: &'a CallContext,
		f: impl 'a + Send + FnOnce(&StoreTables) -> T,
	) -> StoreFuture<'a, T>
	where
		T: 'a + Send,
	{
		Box::pin(async move {
			ctx.check()?;

			Ok(f(&self.0.read()))
		})
	}

	fn write<'a>(
		&'a self,
		ctx: &'a CallContext,
		f: impl 'a + Send + FnOnce(&mut StoreTables) -> Result<()>,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			ctx.check()?;

			f(&mut self.0.write())
		})
	}
}
impl SessionStore for MemoryStore {
	fn fetch_user<'a>(
		&'a self,
		ctx: &'a CallContext,
		display_name: &'a DisplayName,
	) -> StoreFuture<'a, Option<InternalUser>> {
		self.read(ctx, move |tables| tables.user(display_name))
	}

	fn insert_user<'a>(&'a self, ctx: &'a CallContext, user: InternalUser) -> StoreFuture<'a, ()> {
		self.write(ctx, move |tables| Ok(tables.insert_user(user)?))
	}

	fn save_external_identity<'a>(
		&'a self,
		ctx: &'a CallContext,
		identity: ExternalIdentity,
	) -> StoreFuture<'a, ()> {
		self.write(ctx, move |tables| {
			tables.upsert_identity(identity);

			Ok(())
		})
	}

	fn fetch_external_identity<'a>(
		&'a self,
		ctx: &'a CallContext,
		external_id: &'a ExternalId,
	) -> StoreFuture<'a, Option<ExternalIdentity>> {
		self.read(ctx, move |tables| tables.identity(external_id))
	}

	fn save_provider_credential<'a>(
		&'a self,
		ctx: &'a CallContext,
		credential: ProviderCredential,
	) -> StoreFuture<'a, ()> {
		self.write(ctx, move |tables| {
			tables.upsert_provider_credential(credential);

			Ok(())
		})
	}

	fn fetch_provider_credential<'a>(
		&'a self,
		ctx: &'a CallContext,
		owner: &'a UserId,
	) -> StoreFuture<'a, Option<ProviderCredential>> {
		self.read(ctx, move |tables| tables.provider_credential(owner))
	}

	fn fetch_provider_credential_by_external<'a>(
		&'a self,
		ctx: &'a CallContext,
		external_id: &'a ExternalId,
	) -> StoreFuture<'a, Option<ProviderCredential>> {
		self.read(ctx, move |tables| tables.provider_credential_by_external(external_id))
	}

	fn save_session_credential<'a>(
		&'a self,
		ctx: &'a CallContext,
		credential: SessionCredential,
	) -> StoreFuture<'a, ()> {
		self.write(ctx, move |tables| {
			tables.upsert_session_credential(credential);

			Ok(())
		})
	}

	fn fetch_session_credential<'a>(
		&'a self,
		ctx: &'a CallContext,
		owner: &'a UserId,
	) -> StoreFuture<'a, Option<SessionCredential>> {
		self.read(ctx, move |tables| tables.session_credential(owner))
	}
}
