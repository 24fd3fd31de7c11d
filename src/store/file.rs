//! File-backed [`AccountStore`] for single-node deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{
		AccountStore, StoreError, StoreFuture, StoreTransaction,
		memory::{MemoryStore, SnapshotSink, Tables},
	},
};

/// Persists committed transactions to a JSON snapshot.
///
/// Reads and transactions run against an in-memory copy; every commit rewrites the snapshot
/// through a temporary file before the new state becomes visible, so a failed write leaves both
/// the file and the in-memory tables untouched.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: MemoryStore,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		ensure_parent_exists(&path)?;

		let tables = load_snapshot(&path)?;
		let sink = Arc::new(SnapshotFile { path: path.clone() });

		Ok(Self { path, inner: MemoryStore::with_sink(tables, sink) })
	}

	/// Location of the snapshot file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Copy of the committed contents.
	pub async fn snapshot(&self) -> Tables {
		self.inner.snapshot().await
	}
}
impl AccountStore for FileStore {
	fn begin(&self) -> StoreFuture<'_, Box<dyn StoreTransaction>> {
		self.inner.begin()
	}
}

struct SnapshotFile {
	path: PathBuf,
}
impl SnapshotSink for SnapshotFile {
	fn persist(&self, tables: &Tables) -> Result<(), StoreError> {
		ensure_parent_exists(&self.path)?;

		let serialized = serde_json::to_vec_pretty(tables).map_err(|e| {
			StoreError::Serialization { message: format!("Failed to serialize snapshot: {e}") }
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
}

fn load_snapshot(path: &Path) -> Result<Tables, StoreError> {
	if !path.exists() {
		return Ok(Tables::default());
	}

	let bytes = fs::read(path).map_err(|e| StoreError::Backend {
		message: format!("Failed to read {}: {e}", path.display()),
	})?;

	if bytes.is_empty() {
		return Ok(Tables::default());
	}

	serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
		message: format!("Failed to parse {}: {e}", path.display()),
	})
}

fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
			message: format!("Failed to create store directory {}: {e}", parent.display()),
		})?;
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;
	use crate::{
		account::{Account, LoginLogEntry},
		auth::AccountId,
	};

	fn temp_path() -> PathBuf {
		let unique = format!(
			"identity_broker_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[tokio::test]
	async fn committed_transactions_survive_reopen() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let id = AccountId::new("c0ffee").expect("Account id fixture should be valid.");
		let mut tx = store.begin().await.expect("Transaction should open.");

		tx.insert_account(Account::new(id.clone(), Some("Alice".into()), None))
			.await
			.expect("Insert should succeed.");
		tx.append_login(LoginLogEntry {
			account_id: id.clone(),
			remote_addr: "127.0.0.1".into(),
			at: OffsetDateTime::now_utc(),
			success: true,
		})
		.await
		.expect("Audit append should succeed.");
		tx.commit().await.expect("Commit should persist the snapshot.");

		let mut uncommitted = store.begin().await.expect("Transaction should open.");

		uncommitted
			.set_account_name(&id, "Mallory")
			.await
			.expect("Rename should succeed inside the transaction.");
		drop(uncommitted);
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let tables = reopened.snapshot().await;

		assert_eq!(tables.accounts.len(), 1);
		assert_eq!(tables.accounts[0].name, "Alice");
		assert_eq!(tables.login_log.len(), 1);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
