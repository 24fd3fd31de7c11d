//! Login, registration, and provider-linking state machine.
//!
//! Each operation runs inside one store transaction: account creation, identity writes,
//! session issuance, and the audit entry either all land or none do. Uniqueness conflicts
//! reported by the store abort the transaction and are retried a bounded number of times.

// self
use crate::{
	_prelude::*,
	account::{Account, LoginLogEntry, ProviderIdentity, SessionManager, SessionStatus},
	auth::{AccountId, IdentityClaims, ProviderGrant, ProviderId, SessionToken},
	entropy::Entropy,
	store::{AccountStore, IdentityTokenUpdate, StoreTransaction},
};

const ACCOUNT_ID_ATTEMPTS: usize = 32;

/// Result of a successful login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginOutcome {
	/// Account the identity resolved to.
	pub account_id: AccountId,
	/// Newly issued session token.
	pub session: SessionToken,
	/// Whether the account was created by this login.
	pub created: bool,
}

/// Public view of an account for the session holder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
	/// Account identifier.
	pub id: AccountId,
	/// Display name.
	pub name: String,
	/// Email captured at creation.
	pub email: Option<String>,
	/// Providers linked to the account, sorted by name.
	pub linked_providers: Vec<ProviderId>,
}

/// Maps authenticated external identities onto local accounts.
#[derive(Clone)]
pub struct AccountLinker {
	store: Arc<dyn AccountStore>,
	sessions: SessionManager,
	entropy: Entropy,
	max_attempts: usize,
}
impl AccountLinker {
	/// Default number of attempts for a transaction that hits a uniqueness conflict.
	pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

	/// Creates a linker over the store.
	pub fn new(store: Arc<dyn AccountStore>, sessions: SessionManager, entropy: Entropy) -> Self {
		Self { store, sessions, entropy, max_attempts: Self::DEFAULT_MAX_ATTEMPTS }
	}

	/// Overrides the conflict retry bound (minimum 1).
	pub fn with_max_attempts(mut self, attempts: usize) -> Self {
		self.max_attempts = attempts.max(1);

		self
	}

	/// Session manager used for issuance and validation.
	pub fn sessions(&self) -> &SessionManager {
		&self.sessions
	}

	/// Logs in through a provider identity, registering a new account when none matches.
	///
	/// Disabled accounts are rejected with [`Error::AccountDisabled`]; the attempt is still
	/// recorded as a failed login.
	pub async fn login_or_register(
		&self,
		provider: &ProviderId,
		grant: &ProviderGrant,
		remote_addr: &str,
	) -> Result<LoginOutcome> {
		self.retry_on_conflict(|| self.try_login(provider, grant, remote_addr)).await
	}

	/// Entropy shared with the session manager.
	pub fn entropy(&self) -> &Entropy {
		&self.entropy
	}

	/// Resolves the enabled account behind a live session.
	///
	/// A live session of a disabled account fails with [`Error::AccountDisabled`]; missing or
	/// expired sessions fail with [`Error::InvalidSession`].
	pub async fn authenticate(&self, session: &SessionToken) -> Result<Account> {
		let mut tx = self.store.begin().await?;

		match self.sessions.status(&mut *tx, session, OffsetDateTime::now_utc()).await? {
			SessionStatus::Active(account) => Ok(account),
			SessionStatus::Disabled(_) => Err(Error::AccountDisabled),
			SessionStatus::Missing | SessionStatus::Expired => Err(Error::InvalidSession),
		}
	}

	/// Links a provider identity to the account behind `session`.
	///
	/// The link is recorded in the login log under `remote_addr`.
	pub async fn link_provider(
		&self,
		provider: &ProviderId,
		grant: &ProviderGrant,
		session: &SessionToken,
		remote_addr: &str,
	) -> Result<AccountId> {
		self.retry_on_conflict(|| self.try_link(provider, grant, session, remote_addr)).await
	}

	/// Removes every identity of `provider` from the account behind `session`.
	///
	/// Fails with [`Error::LastProvider`] when that would leave the account without any
	/// identity, and with [`Error::ProviderNotLinked`] when nothing matches.
	pub async fn unlink_provider(
		&self,
		provider: &ProviderId,
		session: &SessionToken,
	) -> Result<()> {
		let now = OffsetDateTime::now_utc();
		let mut tx = self.store.begin().await?;
		let account = self.sessions.validate(&mut *tx, session, now).await?;
		let linked = tx.identities_of(&account.id).await?;
		let matching = linked.iter().filter(|row| &row.provider == provider).count();

		if matching == 0 {
			return Err(Error::ProviderNotLinked { provider: provider.to_string() });
		}
		if matching == linked.len() {
			return Err(Error::LastProvider);
		}

		tx.delete_identities(&account.id, provider).await?;
		tx.commit().await?;

		Ok(())
	}

	/// Returns name, email, and linked providers of the account behind `session`.
	pub async fn info(&self, session: &SessionToken) -> Result<AccountInfo> {
		let now = OffsetDateTime::now_utc();
		let mut tx = self.store.begin().await?;
		let account = self.sessions.validate(&mut *tx, session, now).await?;
		let linked_providers = tx
			.identities_of(&account.id)
			.await?
			.into_iter()
			.map(|row| row.provider)
			.collect::<BTreeSet<_>>()
			.into_iter()
			.collect();

		Ok(AccountInfo {
			id: account.id,
			name: account.name,
			email: account.email,
			linked_providers,
		})
	}

	/// Renames the account behind `session`.
	pub async fn update_name(&self, session: &SessionToken, name: &str) -> Result<()> {
		let now = OffsetDateTime::now_utc();
		let mut tx = self.store.begin().await?;
		let account = self.sessions.validate(&mut *tx, session, now).await?;

		self.sessions.rename(&mut *tx, &account.id, name).await?;
		tx.commit().await?;

		Ok(())
	}

	/// Public display-name lookup by account identifier.
	pub async fn display_name(&self, id: &AccountId) -> Result<String> {
		let mut tx = self.store.begin().await?;

		tx.account(id).await?.map(|account| account.name).ok_or(Error::UnknownAccount)
	}

	async fn retry_on_conflict<T, F, Fut>(&self, mut op: F) -> Result<T>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let mut attempt = 1;

		loop {
			match op().await {
				Err(e) if e.is_conflict() && attempt < self.max_attempts => {
					#[cfg(feature = "tracing")]
					tracing::warn!(attempt, error = %e, "retrying transaction after conflict");

					attempt += 1;
				},
				result => return result,
			}
		}
	}

	async fn try_login(
		&self,
		provider: &ProviderId,
		grant: &ProviderGrant,
		remote_addr: &str,
	) -> Result<LoginOutcome> {
		let now = OffsetDateTime::now_utc();
		let mut tx = self.store.begin().await?;
		let existing = tx.account_by_identity(provider, &grant.claims.subject).await?;
		let (account, created) = match existing {
			Some(account) if account.disabled => {
				tx.append_login(login_entry(&account.id, remote_addr, now, false)).await?;
				tx.commit().await?;

				return Err(Error::AccountDisabled);
			},
			Some(account) => (account, false),
			None => (self.create_account(&mut *tx, &grant.claims).await?, true),
		};

		write_identity(&mut *tx, &account.id, provider, grant).await?;

		let session = self.sessions.issue(&mut *tx, &account.id, now).await?;

		tx.append_login(login_entry(&account.id, remote_addr, now, true)).await?;
		tx.commit().await?;

		#[cfg(feature = "tracing")]
		tracing::info!(account = %account.id, provider = %provider, created, "login succeeded");

		Ok(LoginOutcome { account_id: account.id, session, created })
	}

	async fn try_link(
		&self,
		provider: &ProviderId,
		grant: &ProviderGrant,
		session: &SessionToken,
		remote_addr: &str,
	) -> Result<AccountId> {
		let now = OffsetDateTime::now_utc();
		let mut tx = self.store.begin().await?;
		let account = match self.sessions.status(&mut *tx, session, now).await? {
			SessionStatus::Active(account) => account,
			SessionStatus::Disabled(_) => return Err(Error::AccountDisabled),
			SessionStatus::Missing | SessionStatus::Expired => return Err(Error::InvalidSession),
		};
		let linked = tx.identities_of(&account.id).await?;

		if linked.iter().any(|row| &row.provider == provider && row.subject != grant.claims.subject)
		{
			return Err(Error::ProviderAlreadyLinked { provider: provider.to_string() });
		}

		write_identity(&mut *tx, &account.id, provider, grant).await?;
		tx.append_login(login_entry(&account.id, remote_addr, now, true)).await?;
		tx.commit().await?;

		#[cfg(feature = "tracing")]
		tracing::info!(account = %account.id, provider = %provider, "provider linked");

		Ok(account.id)
	}

	async fn create_account(
		&self,
		tx: &mut dyn StoreTransaction,
		claims: &IdentityClaims,
	) -> Result<Account> {
		for _ in 0..ACCOUNT_ID_ATTEMPTS {
			let id = self.entropy.account_id()?;

			if tx.account(&id).await?.is_some() {
				#[cfg(feature = "tracing")]
				tracing::warn!(account = %id, "generated account id collided; retrying");

				continue;
			}

			let account = Account::new(id, claims.name.clone(), claims.email.clone());

			tx.insert_account(account.clone()).await?;

			return Ok(account);
		}

		Err(Error::invariant(format!(
			"no unique account id after {ACCOUNT_ID_ATTEMPTS} attempts"
		)))
	}
}
impl Debug for AccountLinker {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccountLinker")
			.field("sessions", &self.sessions)
			.field("max_attempts", &self.max_attempts)
			.finish()
	}
}

/// Planned write for a (provider, subject) pair.
#[derive(Debug, PartialEq, Eq)]
enum IdentityWrite {
	Insert,
	Update,
}

fn plan_identity_write(
	existing: &[ProviderIdentity],
	account: &AccountId,
	provider: &ProviderId,
	grant: &ProviderGrant,
) -> Result<IdentityWrite> {
	match existing {
		[] if grant.tokens.refresh_token.is_none() => Err(Error::MissingRefreshToken),
		[] => Ok(IdentityWrite::Insert),
		[row] if &row.account_id != account =>
			Err(Error::IdentityInUse { provider: provider.to_string() }),
		[_] => Ok(IdentityWrite::Update),
		rows => Err(Error::invariant(format!(
			"found {} identity rows for {provider}/{}",
			rows.len(),
			grant.claims.subject
		))),
	}
}

async fn write_identity(
	tx: &mut dyn StoreTransaction,
	account: &AccountId,
	provider: &ProviderId,
	grant: &ProviderGrant,
) -> Result<()> {
	let subject = &grant.claims.subject;
	let existing = tx.identities_by_subject(provider, subject).await?;
	let expires_at = grant.claims.expires_at_datetime();

	match plan_identity_write(&existing, account, provider, grant)? {
		IdentityWrite::Insert => {
			let identity = ProviderIdentity::new(
				account.clone(),
				provider.clone(),
				subject.clone(),
				grant.tokens.clone(),
				expires_at,
			);

			tx.insert_identity(identity).await?;
		},
		IdentityWrite::Update => {
			let update = IdentityTokenUpdate {
				access_token: grant.tokens.access_token.clone(),
				refresh_token: grant.tokens.refresh_token.clone(),
				expires_at,
			};

			tx.update_identity_tokens(provider, subject, update).await?;
		},
	}

	Ok(())
}

fn login_entry(
	account: &AccountId,
	remote_addr: &str,
	at: OffsetDateTime,
	success: bool,
) -> LoginLogEntry {
	LoginLogEntry { account_id: account.clone(), remote_addr: remote_addr.to_owned(), at, success }
}
