//! Storage contract and built-in store implementations for session records.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{
		DisplayName, ExternalId, ExternalIdentity, InternalUser, ProviderCredential,
		SessionCredential, UserId,
	},
};

/// Boxed future returned by [`SessionStore`] calls.
///
/// Backends report their own failures as [`StoreError`] (wrapped in [`Error::Storage`]) and
/// may surface [`Error::Cancelled`] or [`Error::DeadlineExceeded`] from the caller's context.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Persistence contract for users, identities, and credentials.
///
/// Lookups return `Ok(None)` when nothing matches. Saves are upserts keyed by the record's
/// stable identifier, except [`insert_user`](Self::insert_user), which must reject a second
/// user for the same display name with [`StoreError::Conflict`].
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Looks up the internal user created for `display_name`.
	fn fetch_user<'a>(
		&'a self,
		ctx: &'a CallContext,
		display_name: &'a DisplayName,
	) -> StoreFuture<'a, Option<InternalUser>>;

	/// Creates a user; fails with [`StoreError::Conflict`] when the display name is taken.
	fn insert_user<'a>(&'a self, ctx: &'a CallContext, user: InternalUser) -> StoreFuture<'a, ()>;

	/// Upserts an external identity keyed by its external id.
	fn save_external_identity<'a>(
		&'a self,
		ctx: &'a CallContext,
		identity: ExternalIdentity,
	) -> StoreFuture<'a, ()>;

	/// Looks up an external identity by external id.
	fn fetch_external_identity<'a>(
		&'a self,
		ctx: &'a CallContext,
		external_id: &'a ExternalId,
	) -> StoreFuture<'a, Option<ExternalIdentity>>;

	/// Upserts a provider credential keyed by its owner.
	fn save_provider_credential<'a>(
		&'a self,
		ctx: &'a CallContext,
		credential: ProviderCredential,
	) -> StoreFuture<'a, ()>;

	/// Looks up the provider credential owned by `owner`.
	fn fetch_provider_credential<'a>(
		&'a self,
		ctx: &'a CallContext,
		owner: &'a UserId,
	) -> StoreFuture<'a, Option<ProviderCredential>>;

	/// Looks up the provider credential issued to `external_id`.
	fn fetch_provider_credential_by_external<'a>(
		&'a self,
		ctx: &'a CallContext,
		external_id: &'a ExternalId,
	) -> StoreFuture<'a, Option<ProviderCredential>>;

	/// Upserts session metadata keyed by its owner.
	fn save_session_credential<'a>(
		&'a self,
		ctx: &'a CallContext,
		credential: SessionCredential,
	) -> StoreFuture<'a, ()>;

	/// Looks up the session metadata owned by `owner`.
	fn fetch_session_credential<'a>(
		&'a self,
		ctx: &'a CallContext,
		owner: &'a UserId,
	) -> StoreFuture<'a, Option<SessionCredential>>;
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// A uniqueness constraint rejected the write.
	#[error("{entity} `{key}` already exists.")]
	Conflict {
		/// Kind of record that collided.
		entity: String,
		/// Key that collided.
		key: String,
	},
}

/// In-process tables shared by the built-in stores.
#[derive(Clone, Debug, Default)]
pub(crate) struct StoreTables {
	users: HashMap<DisplayName, InternalUser>,
	identities: HashMap<ExternalId, ExternalIdentity>,
	provider_credentials: HashMap<UserId, ProviderCredential>,
	session_credentials: HashMap<UserId, SessionCredential>,
}
impl StoreTables {
	pub(crate) fn user(&self, display_name: &DisplayName) -> Option<InternalUser> {
		self.users.get(display_name).cloned()
	}

	pub(crate) fn insert_user(&mut self, user: InternalUser) -> Result<(), StoreError> {
		if self.users.contains_key(&user.display_name) {
			return Err(StoreError::Conflict {
				entity: "user".into(),
				key: user.display_name.to_string(),
			});
		}

		self.users.insert(user.display_name.clone(), user);

		Ok(())
	}

	pub(crate) fn identity(&self, external_id: &ExternalId) -> Option<ExternalIdentity> {
		self.identities.get(external_id).cloned()
	}

	pub(crate) fn upsert_identity(&mut self, identity: ExternalIdentity) {
		self.identities.insert(identity.external_id.clone(), identity);
	}

	pub(crate) fn provider_credential(&self, owner: &UserId) -> Option<ProviderCredential> {
		self.provider_credentials.get(owner).cloned()
	}

	pub(crate) fn provider_credential_by_external(
		&self,
		external_id: &ExternalId,
	) -> Option<ProviderCredential> {
		self.provider_credentials
			.values()
			.filter(|credential| &credential.external_id == external_id)
			.max_by_key(|credential| credential.expires_at)
			.cloned()
	}

	pub(crate) fn upsert_provider_credential(&mut self, credential: ProviderCredential) {
		self.provider_credentials.insert(credential.owner.clone(), credential);
	}

	pub(crate) fn session_credential(&self, owner: &UserId) -> Option<SessionCredential> {
		self.session_credentials.get(owner).cloned()
	}

	pub(crate) fn upsert_session_credential(&mut self, credential: SessionCredential) {
		self.session_credentials.insert(credential.owner.clone(), credential);
	}
}

/// Serialized form of [`StoreTables`]; keys are rebuilt from the records on load.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct StoreSnapshot {
	#[serde(default)]
	users: Vec<InternalUser>,
	#[serde(default)]
	identities: Vec<ExternalIdentity>,
	#[serde(default)]
	provider_credentials: Vec<ProviderCredential>,
	#[serde(default)]
	session_credentials: Vec<SessionCredential>,
}
impl From<&StoreTables> for StoreSnapshot {
	fn from(tables: &StoreTables) -> Self {
		Self {
			users: tables.users.values().cloned().collect(),
			identities: tables.identities.values().cloned().collect(),
			provider_credentials: tables.provider_credentials.values().cloned().collect(),
			session_credentials: tables.session_credentials.values().cloned().collect(),
		}
	}
}
impl From<StoreSnapshot> for StoreTables {
	fn from(snapshot: StoreSnapshot) -> Self {
		let mut tables = Self::default();

		for user in snapshot.users {
			tables.users.insert(user.display_name.clone(), user);
		}
		for identity in snapshot.identities {
			tables.upsert_identity(identity);
		}
		for credential in snapshot.provider_credentials {
			tables.upsert_provider_credential(credential);
		}
		for credential in snapshot.session_credentials {
			tables.upsert_session_credential(credential);
		}

		tables
	}
}
