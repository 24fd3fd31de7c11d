//! Issuance and validation of broker session tokens.
//!
//! A session moves from absent to active when issued and ends either expired or evicted.
//! There is no refresh transition: renewing a session requires a fresh provider login.

// self
use crate::{
	_prelude::*,
	account::{Account, Session},
	auth::{AccountId, SessionToken},
	entropy::Entropy,
	store::StoreTransaction,
};

/// Resolution of a presented session token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionStatus {
	/// Token is live and its account is enabled.
	Active(Account),
	/// No session matches the token.
	Missing,
	/// Session exists but its expiry has passed.
	Expired,
	/// Session is live but its account is disabled.
	Disabled(Account),
}

/// Issues, validates, and caps per-account sessions.
#[derive(Clone, Debug)]
pub struct SessionManager {
	cap: usize,
	ttl: Duration,
	entropy: Entropy,
}
impl SessionManager {
	/// Default number of concurrently live sessions per account.
	pub const DEFAULT_CAP: usize = 5;
	/// Default session lifetime.
	pub const DEFAULT_TTL: Duration = Duration::hours(1);

	/// Creates a manager with the default cap and lifetime.
	pub fn new(entropy: Entropy) -> Self {
		Self { cap: Self::DEFAULT_CAP, ttl: Self::DEFAULT_TTL, entropy }
	}

	/// Overrides the per-account session cap (minimum 1).
	pub fn with_cap(mut self, cap: usize) -> Self {
		self.cap = cap.max(1);

		self
	}

	/// Overrides the session lifetime.
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;

		self
	}

	/// Configured per-account cap.
	pub fn cap(&self) -> usize {
		self.cap
	}

	/// Configured session lifetime.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Issues a new session for the account inside `tx`.
	///
	/// Expired sessions of the account are pruned first; while the account still holds `cap`
	/// live sessions, the one with the nearest expiry is evicted.
	pub async fn issue(
		&self,
		tx: &mut dyn StoreTransaction,
		account: &AccountId,
		now: OffsetDateTime,
	) -> Result<SessionToken> {
		let (expired, mut live): (Vec<_>, Vec<_>) =
			tx.sessions_of(account).await?.into_iter().partition(|s| s.is_expired_at(now));

		for session in expired {
			tx.delete_session(&session.token_digest).await?;
		}

		live.sort_by_key(|session| session.expires_at);

		let excess = (live.len() + 1).saturating_sub(self.cap);

		for session in live.iter().take(excess) {
			#[cfg(feature = "tracing")]
			tracing::debug!(account = %account, "evicting session with nearest expiry");

			tx.delete_session(&session.token_digest).await?;
		}

		let token = self.entropy.session_token();

		tx.insert_session(Session {
			account_id: account.clone(),
			token_digest: token.digest(),
			created_at: now,
			expires_at: now + self.ttl,
		})
		.await?;

		Ok(token)
	}

	/// Resolves a token without collapsing the failure reasons.
	///
	/// Expired rows are left in place; they are pruned the next time the account is issued a
	/// session.
	pub async fn status(
		&self,
		tx: &mut dyn StoreTransaction,
		token: &SessionToken,
		now: OffsetDateTime,
	) -> Result<SessionStatus> {
		let Some(session) = tx.session(&token.digest()).await? else {
			return Ok(SessionStatus::Missing);
		};

		if session.is_expired_at(now) {
			return Ok(SessionStatus::Expired);
		}

		let account = tx.account(&session.account_id).await?.ok_or_else(|| {
			Error::invariant(format!("session references missing account {}", session.account_id))
		})?;

		if account.disabled {
			Ok(SessionStatus::Disabled(account))
		} else {
			Ok(SessionStatus::Active(account))
		}
	}

	/// Returns the owning account of a live session; every other outcome is
	/// [`Error::InvalidSession`].
	pub async fn validate(
		&self,
		tx: &mut dyn StoreTransaction,
		token: &SessionToken,
		now: OffsetDateTime,
	) -> Result<Account> {
		match self.status(tx, token, now).await? {
			SessionStatus::Active(account) => Ok(account),
			_ => Err(Error::InvalidSession),
		}
	}

	/// Renames an account previously resolved through [`validate`](Self::validate).
	///
	/// Names made only of whitespace are rejected; any other name is stored verbatim.
	pub async fn rename(
		&self,
		tx: &mut dyn StoreTransaction,
		account: &AccountId,
		name: &str,
	) -> Result<()> {
		if name.trim().is_empty() {
			return Err(Error::EmptyName);
		}
		if !tx.set_account_name(account, name).await? {
			return Err(Error::UnknownAccount);
		}

		Ok(())
	}
}
