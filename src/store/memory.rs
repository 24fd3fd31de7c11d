//! In-memory [`AccountStore`] with serializable transactions for local development and tests.

// crates.io
use async_lock::MutexGuardArc;
// self
use crate::{
	_prelude::*,
	account::{Account, LoginLogEntry, ProviderIdentity, Session},
	auth::{AccountId, ProviderId, SubjectId},
	store::{AccountStore, IdentityTokenUpdate, StoreError, StoreFuture, StoreTransaction},
};

/// Complete store contents; transactions mutate a private copy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tables {
	/// Accounts.
	pub accounts: Vec<Account>,
	/// Provider identities.
	pub identities: Vec<ProviderIdentity>,
	/// Sessions.
	pub sessions: Vec<Session>,
	/// Login audit log.
	pub login_log: Vec<LoginLogEntry>,
}
impl Tables {
	fn account(&self, id: &AccountId) -> Option<&Account> {
		self.accounts.iter().find(|account| &account.id == id)
	}

	fn account_mut(&mut self, id: &AccountId) -> Option<&mut Account> {
		self.accounts.iter_mut().find(|account| &account.id == id)
	}

	fn account_by_identity(&self, provider: &ProviderId, subject: &SubjectId) -> Option<&Account> {
		self.identities
			.iter()
			.find(|identity| identity.matches(provider, subject))
			.and_then(|identity| self.account(&identity.account_id))
	}

	fn insert_account(&mut self, account: Account) -> Result<(), StoreError> {
		if self.account(&account.id).is_some() {
			return Err(StoreError::Conflict {
				message: format!("account {} already exists", account.id),
			});
		}

		self.accounts.push(account);

		Ok(())
	}

	fn insert_identity(&mut self, identity: ProviderIdentity) -> Result<(), StoreError> {
		if self.identities.iter().any(|row| row.matches(&identity.provider, &identity.subject)) {
			return Err(StoreError::Conflict {
				message: format!(
					"identity {}/{} already linked",
					identity.provider, identity.subject
				),
			});
		}

		self.identities.push(identity);

		Ok(())
	}

	fn update_identity_tokens(
		&mut self,
		provider: &ProviderId,
		subject: &SubjectId,
		update: IdentityTokenUpdate,
	) -> u64 {
		let mut updated = 0;

		for row in self.identities.iter_mut().filter(|row| row.matches(provider, subject)) {
			row.access_token = update.access_token.clone();
			row.expires_at = update.expires_at;

			if let Some(refresh) = &update.refresh_token {
				row.refresh_token = Some(refresh.clone());
			}

			updated += 1;
		}

		updated
	}

	fn delete_identities(&mut self, id: &AccountId, provider: &ProviderId) -> u64 {
		let before = self.identities.len();

		self.identities.retain(|row| !(&row.account_id == id && &row.provider == provider));

		(before - self.identities.len()) as u64
	}

	fn insert_session(&mut self, session: Session) -> Result<(), StoreError> {
		if self.sessions.iter().any(|row| row.token_digest == session.token_digest) {
			return Err(StoreError::Conflict { message: "session digest already exists".into() });
		}

		self.sessions.push(session);

		Ok(())
	}

	fn delete_session(&mut self, digest: &str) -> bool {
		let before = self.sessions.len();

		self.sessions.retain(|row| row.token_digest != digest);

		before != self.sessions.len()
	}
}

/// Receives committed snapshots; used by persistent wrappers such as [`FileStore`].
///
/// [`FileStore`]: crate::store::FileStore
pub(crate) trait SnapshotSink
where
	Self: Send + Sync,
{
	fn persist(&self, tables: &Tables) -> Result<(), StoreError>;
}

/// Thread-safe storage backend that keeps every table in-process.
///
/// Transactions hold an exclusive lock for their whole lifetime, so concurrent operations are
/// serialized and a dropped transaction leaves no trace.
#[derive(Clone, Default)]
pub struct MemoryStore {
	tables: Arc<AsyncMutex<Tables>>,
	sink: Option<Arc<dyn SnapshotSink>>,
}
impl MemoryStore {
	/// Seeds a store with existing contents.
	pub fn with_tables(tables: Tables) -> Self {
		Self { tables: Arc::new(AsyncMutex::new(tables)), sink: None }
	}

	pub(crate) fn with_sink(tables: Tables, sink: Arc<dyn SnapshotSink>) -> Self {
		Self { tables: Arc::new(AsyncMutex::new(tables)), sink: Some(sink) }
	}

	/// Copy of the committed contents.
	pub async fn snapshot(&self) -> Tables {
		self.tables.lock().await.clone()
	}
}
impl Debug for MemoryStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MemoryStore").field("persistent", &self.sink.is_some()).finish()
	}
}
impl AccountStore for MemoryStore {
	fn begin(&self) -> StoreFuture<'_, Box<dyn StoreTransaction>> {
		Box::pin(async move {
			let guard = self.tables.lock_arc().await;
			let working = guard.clone();
			let tx: Box<dyn StoreTransaction> =
				Box::new(MemoryTransaction { guard, working, sink: self.sink.clone() });

			Ok(tx)
		})
	}
}

struct MemoryTransaction {
	guard: MutexGuardArc<Tables>,
	working: Tables,
	sink: Option<Arc<dyn SnapshotSink>>,
}
impl StoreTransaction for MemoryTransaction {
	fn account<'a>(&'a mut self, id: &'a AccountId) -> StoreFuture<'a, Option<Account>> {
		Box::pin(async move { Ok(self.working.account(id).cloned()) })
	}

	fn account_by_identity<'a>(
		&'a mut self,
		provider: &'a ProviderId,
		subject: &'a SubjectId,
	) -> StoreFuture<'a, Option<Account>> {
		Box::pin(async move { Ok(self.working.account_by_identity(provider, subject).cloned()) })
	}

	fn insert_account(&mut self, account: Account) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.working.insert_account(account) })
	}

	fn set_account_name<'a>(
		&'a mut self,
		id: &'a AccountId,
		name: &'a str,
	) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			Ok(self.working.account_mut(id).map(|account| account.name = name.to_owned()).is_some())
		})
	}

	fn set_account_disabled<'a>(
		&'a mut self,
		id: &'a AccountId,
		disabled: bool,
	) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			Ok(self.working.account_mut(id).map(|account| account.disabled = disabled).is_some())
		})
	}

	fn identities_by_subject<'a>(
		&'a mut self,
		provider: &'a ProviderId,
		subject: &'a SubjectId,
	) -> StoreFuture<'a, Vec<ProviderIdentity>> {
		Box::pin(async move {
			Ok(self
				.working
				.identities
				.iter()
				.filter(|row| row.matches(provider, subject))
				.cloned()
				.collect())
		})
	}

	fn identities_of<'a>(
		&'a mut self,
		id: &'a AccountId,
	) -> StoreFuture<'a, Vec<ProviderIdentity>> {
		Box::pin(async move {
			Ok(self
				.working
				.identities
				.iter()
				.filter(|row| &row.account_id == id)
				.cloned()
				.collect())
		})
	}

	fn insert_identity(&mut self, identity: ProviderIdentity) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.working.insert_identity(identity) })
	}

	fn update_identity_tokens<'a>(
		&'a mut self,
		provider: &'a ProviderId,
		subject: &'a SubjectId,
		update: IdentityTokenUpdate,
	) -> StoreFuture<'a, u64> {
		Box::pin(async move { Ok(self.working.update_identity_tokens(provider, subject, update)) })
	}

	fn delete_identities<'a>(
		&'a mut self,
		id: &'a AccountId,
		provider: &'a ProviderId,
	) -> StoreFuture<'a, u64> {
		Box::pin(async move { Ok(self.working.delete_identities(id, provider)) })
	}

	fn session<'a>(&'a mut self, digest: &'a str) -> StoreFuture<'a, Option<Session>> {
		Box::pin(async move {
			Ok(self.working.sessions.iter().find(|row| row.token_digest == digest).cloned())
		})
	}

	fn sessions_of<'a>(&'a mut self, id: &'a AccountId) -> StoreFuture<'a, Vec<Session>> {
		Box::pin(async move {
			Ok(self.working.sessions.iter().filter(|row| &row.account_id == id).cloned().collect())
		})
	}

	fn insert_session(&mut self, session: Session) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.working.insert_session(session) })
	}

	fn delete_session<'a>(&'a mut self, digest: &'a str) -> StoreFuture<'a, bool> {
		Box::pin(async move { Ok(self.working.delete_session(digest)) })
	}

	fn append_login(&mut self, entry: LoginLogEntry) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.working.login_log.push(entry);

			Ok(())
		})
	}

	fn commit(self: Box<Self>) -> StoreFuture<'static, ()> {
		Box::pin(async move {
			let MemoryTransaction { mut guard, working, sink } = *self;

			if let Some(sink) = sink {
				sink.persist(&working)?;
			}

			*guard = working;

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	fn account(id: &str) -> Account {
		Account::new(AccountId::new(id).expect("Account id fixture should be valid."), None, None)
	}

	#[tokio::test]
	async fn dropped_transactions_roll_back() {
		let store = MemoryStore::default();
		let mut tx = store.begin().await.expect("Transaction should open.");

		tx.insert_account(account("aaaa")).await.expect("Insert should succeed.");
		drop(tx);

		assert!(store.snapshot().await.accounts.is_empty());

		let mut tx = store.begin().await.expect("Transaction should open.");

		tx.insert_account(account("bbbb")).await.expect("Insert should succeed.");
		tx.commit().await.expect("Commit should succeed.");

		assert_eq!(store.snapshot().await.accounts.len(), 1);
	}

	#[tokio::test]
	async fn uniqueness_violations_surface_as_conflicts() {
		let store = MemoryStore::default();
		let mut tx = store.begin().await.expect("Transaction should open.");

		tx.insert_account(account("aaaa")).await.expect("First insert should succeed.");

		let err = tx.insert_account(account("aaaa")).await.expect_err("Duplicate id must fail.");

		assert!(matches!(err, StoreError::Conflict { .. }));

		let session = Session {
			account_id: AccountId::new("aaaa").expect("Account id fixture should be valid."),
			token_digest: "digest".into(),
			created_at: datetime!(2024-01-01 00:00 UTC),
			expires_at: datetime!(2024-01-01 01:00 UTC),
		};

		tx.insert_session(session.clone()).await.expect("First session insert should succeed.");

		let err = tx.insert_session(session).await.expect_err("Duplicate digest must fail.");

		assert!(matches!(err, StoreError::Conflict { .. }));
	}
}
