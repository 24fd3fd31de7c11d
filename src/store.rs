//! Storage contracts and built-in store implementations for accounts, identities, and sessions.
//!
//! Every broker operation that touches more than one entity runs inside a single
//! [`StoreTransaction`]. Writes become visible only after [`StoreTransaction::commit`];
//! dropping a transaction without committing rolls every write back. Backends must reject
//! duplicate account ids, duplicate (provider, subject) pairs, and duplicate session digests
//! with [`StoreError::Conflict`] so callers can retry the transaction.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::{MemoryStore, Tables};

// self
use crate::{
	_prelude::*,
	account::{Account, LoginLogEntry, ProviderIdentity, Session},
	auth::{AccountId, ProviderId, SubjectId, TokenSecret},
};

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend that hands out isolated transactions.
pub trait AccountStore
where
	Self: Send + Sync,
{
	/// Opens a transaction. Backends must provide serializable isolation for the statements
	/// issued through it, or surface [`StoreError::Conflict`] on commit.
	fn begin(&self) -> StoreFuture<'_, Box<dyn StoreTransaction>>;
}

/// Unit of work against an [`AccountStore`].
pub trait StoreTransaction
where
	Self: Send,
{
	/// Fetches an account by identifier.
	fn account<'a>(&'a mut self, id: &'a AccountId) -> StoreFuture<'a, Option<Account>>;

	/// Resolves the account owning a (provider, subject) identity.
	fn account_by_identity<'a>(
		&'a mut self,
		provider: &'a ProviderId,
		subject: &'a SubjectId,
	) -> StoreFuture<'a, Option<Account>>;

	/// Inserts an account; duplicate identifiers yield [`StoreError::Conflict`].
	fn insert_account(&mut self, account: Account) -> StoreFuture<'_, ()>;

	/// Updates the display name; returns false when the account does not exist.
	fn set_account_name<'a>(
		&'a mut self,
		id: &'a AccountId,
		name: &'a str,
	) -> StoreFuture<'a, bool>;

	/// Operator hook toggling the disabled flag; returns false when the account does not exist.
	fn set_account_disabled<'a>(
		&'a mut self,
		id: &'a AccountId,
		disabled: bool,
	) -> StoreFuture<'a, bool>;

	/// Every identity row matching the (provider, subject) pair.
	fn identities_by_subject<'a>(
		&'a mut self,
		provider: &'a ProviderId,
		subject: &'a SubjectId,
	) -> StoreFuture<'a, Vec<ProviderIdentity>>;

	/// Every identity row owned by the account.
	fn identities_of<'a>(&'a mut self, id: &'a AccountId)
	-> StoreFuture<'a, Vec<ProviderIdentity>>;

	/// Inserts an identity; a duplicate (provider, subject) yields [`StoreError::Conflict`].
	fn insert_identity(&mut self, identity: ProviderIdentity) -> StoreFuture<'_, ()>;

	/// Refreshes tokens on matching identity rows and returns the number of rows updated.
	fn update_identity_tokens<'a>(
		&'a mut self,
		provider: &'a ProviderId,
		subject: &'a SubjectId,
		update: IdentityTokenUpdate,
	) -> StoreFuture<'a, u64>;

	/// Deletes the account's identities for a provider and returns the number removed.
	fn delete_identities<'a>(
		&'a mut self,
		id: &'a AccountId,
		provider: &'a ProviderId,
	) -> StoreFuture<'a, u64>;

	/// Looks up a session by token digest.
	fn session<'a>(&'a mut self, digest: &'a str) -> StoreFuture<'a, Option<Session>>;

	/// Every session owned by the account, expired ones included.
	fn sessions_of<'a>(&'a mut self, id: &'a AccountId) -> StoreFuture<'a, Vec<Session>>;

	/// Inserts a session; a duplicate digest yields [`StoreError::Conflict`].
	fn insert_session(&mut self, session: Session) -> StoreFuture<'_, ()>;

	/// Deletes a session by digest; returns false when absent.
	fn delete_session<'a>(&'a mut self, digest: &'a str) -> StoreFuture<'a, bool>;

	/// Appends an audit entry.
	fn append_login(&mut self, entry: LoginLogEntry) -> StoreFuture<'_, ()>;

	/// Makes every write visible atomically.
	fn commit(self: Box<Self>) -> StoreFuture<'static, ()>;
}

/// Token refresh applied to an existing identity row.
#[derive(Clone, Debug)]
pub struct IdentityTokenUpdate {
	/// Replacement access token.
	pub access_token: TokenSecret,
	/// Replacement refresh token; `None` keeps the stored one.
	pub refresh_token: Option<TokenSecret>,
	/// Replacement expiry.
	pub expires_at: OffsetDateTime,
}

/// Error type produced by [`AccountStore`] implementations.
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
	/// Uniqueness violation or serialization conflict; the transaction may be retried.
	#[error("Conflict: {message}.")]
	Conflict {
		/// Which constraint was violated.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;

	#[test]
	fn store_error_converts_into_broker_error_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let broker_error: Error = store_error.clone().into();

		assert!(matches!(broker_error, Error::Storage(_)));
		assert!(broker_error.to_string().contains("database unreachable"));
		assert!(!broker_error.is_user_facing());

		let source = StdError::source(&broker_error)
			.expect("Broker error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
