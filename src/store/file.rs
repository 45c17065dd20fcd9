//! Simple file-backed [`SessionStore`] for single-node deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{
		DisplayName, ExternalId, ExternalIdentity, InternalUser, ProviderCredential,
		SessionCredential, UserId,
	},
	store::{SessionStore, StoreError, StoreFuture, StoreSnapshot, StoreTables},
};

/// Persists session records to a JSON file after each mutation.
///
/// Every write replaces the whole snapshot through a temporary file and a rename, so a crash
/// leaves either the previous or the next snapshot on disk.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<StoreTables>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let tables = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(tables)) })
	}

	/// Location of the snapshot file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<StoreTables, StoreError> {
		if !path.exists() {
			return Ok(StoreTables::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(StoreTables::default());
		}

		let snapshot: StoreSnapshot =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(snapshot.into())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, tables: &StoreTables) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized = serde_json::to_vec_pretty(&StoreSnapshot::from(tables)).map_err(|e| {
			StoreError::Serialization { message: format!("Failed to serialize store snapshot: {e}") }
		})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	// Mutations are applied to a scratch copy so a failed persist leaves memory and disk in
	// agreement.
	fn mutate<'a>(
		&'a self,
		ctx: &'a CallContext,
		f: impl 'a + Send + FnOnce(&mut StoreTables) -> Result<(), StoreError>,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			ctx.check()?;

			let mut guard = self.inner.write();
			let mut next = guard.clone();

			f(&mut next)?;
			self.persist_locked(&next)?;
			*guard = next;

			Ok(())
		})
	}

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

			Ok(f(&self.inner.read()))
		})
	}
}
impl SessionStore for FileStore {
	fn fetch_user<'a>(
		&'a self,
		ctx: &'a CallContext,
		display_name: &'a DisplayName,
	) -> StoreFuture<'a, Option<InternalUser>> {
		self.read(ctx, move |tables| tables.user(display_name))
	}

	fn insert_user<'a>(&'a self, ctx: &'a CallContext, user: InternalUser) -> StoreFuture<'a, ()> {
		self.mutate(ctx, move |tables| tables.insert_user(user))
	}

	fn save_external_identity<'a>(
		&'a self,
		ctx: &'a CallContext,
		identity: ExternalIdentity,
	) -> StoreFuture<'a, ()> {
		self.mutate(ctx, move |tables| {
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
		self.mutate(ctx, move |tables| {
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
		self.mutate(ctx, move |tables| {
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

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;
	use crate::auth::TokenSecret;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"session_broker_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn save_and_reload_round_trip() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");
		let ctx = CallContext::new();
		let user = InternalUser::new(
			DisplayName::new("Hero#1234").expect("Display name fixture should be valid."),
		);
		let credential = SessionCredential {
			owner: user.id.clone(),
			display_name: user.display_name.clone(),
			refresh_secret: TokenSecret::new("refresh-token"),
			expires_at: OffsetDateTime::now_utc() + Duration::days(30),
		};

		rt.block_on(store.insert_user(&ctx, user.clone()))
			.expect("Failed to save fixture user to file store.");
		rt.block_on(store.save_session_credential(&ctx, credential.clone()))
			.expect("Failed to save fixture session to file store.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched_user = rt
			.block_on(reopened.fetch_user(&ctx, &user.display_name))
			.expect("Failed to fetch fixture user from file store.")
			.expect("File store lost user after reopen.");
		let fetched_session = rt
			.block_on(reopened.fetch_session_credential(&ctx, &user.id))
			.expect("Failed to fetch fixture session from file store.")
			.expect("File store lost session after reopen.");

		assert_eq!(fetched_user, user);
		assert_eq!(fetched_session.refresh_secret.expose(), "refresh-token");

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn conflicting_insert_leaves_snapshot_untouched() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");
		let ctx = CallContext::new();
		let name = DisplayName::new("Hero#1234").expect("Display name fixture should be valid.");
		let first = InternalUser::new(name.clone());

		rt.block_on(store.insert_user(&ctx, first.clone())).expect("First insert should succeed.");

		let err = rt
			.block_on(store.insert_user(&ctx, InternalUser::new(name.clone())))
			.expect_err("Duplicate display name must conflict.");

		assert!(matches!(err, Error::Storage(StoreError::Conflict { .. })));

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = rt
			.block_on(reopened.fetch_user(&ctx, &name))
			.expect("Lookup should succeed.")
			.expect("First user should persist.");

		assert_eq!(fetched.id, first.id);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
