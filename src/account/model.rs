//! Persistent account entities.

// self
use crate::{
	_prelude::*,
	auth::{AccountId, ProviderId, ProviderTokens, SubjectId, TokenSecret},
};

/// Local account; one per unique human.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
	/// Immutable, collision-checked identifier.
	pub id: AccountId,
	/// Mutable display name.
	pub name: String,
	/// Email captured from the first successful login.
	pub email: Option<String>,
	/// Operator-set flag blocking every login.
	pub disabled: bool,
}
impl Account {
	/// New enabled account; the display name falls back to the identifier.
	pub fn new(id: AccountId, name: Option<String>, email: Option<String>) -> Self {
		let name = name.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| id.to_string());

		Self { id, name, email, disabled: false }
	}
}

/// Link between one account and one (provider, subject) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderIdentity {
	/// Owning account.
	pub account_id: AccountId,
	/// Provider that issued the subject.
	pub provider: ProviderId,
	/// Provider-scoped subject.
	pub subject: SubjectId,
	/// Last-known provider access token.
	pub access_token: TokenSecret,
	/// Last-known provider refresh token.
	pub refresh_token: Option<TokenSecret>,
	/// Expiry recorded from the provider's claims.
	pub expires_at: OffsetDateTime,
}
impl ProviderIdentity {
	/// Builds a fresh identity row from provider tokens.
	pub fn new(
		account_id: AccountId,
		provider: ProviderId,
		subject: SubjectId,
		tokens: ProviderTokens,
		expires_at: OffsetDateTime,
	) -> Self {
		Self {
			account_id,
			provider,
			subject,
			access_token: tokens.access_token,
			refresh_token: tokens.refresh_token,
			expires_at,
		}
	}

	/// Returns true when the row links the given (provider, subject) pair.
	pub fn matches(&self, provider: &ProviderId, subject: &SubjectId) -> bool {
		&self.provider == provider && &self.subject == subject
	}
}

/// Session row; only the token digest is persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	/// Owning account.
	pub account_id: AccountId,
	/// Digest of the bearer token.
	pub token_digest: String,
	/// Issue instant.
	pub created_at: OffsetDateTime,
	/// Expiry instant.
	pub expires_at: OffsetDateTime,
}
impl Session {
	/// Returns true once `now` has reached the expiry instant.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		now >= self.expires_at
	}
}

/// Append-only audit record of a login attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginLogEntry {
	/// Account the attempt resolved to.
	pub account_id: AccountId,
	/// Caller-supplied remote address.
	pub remote_addr: String,
	/// Attempt instant.
	pub at: OffsetDateTime,
	/// Whether a session or link resulted from the attempt.
	pub success: bool,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn account_name_defaults_to_identifier() {
		let id = AccountId::new("0f1e2d3c").expect("Account id fixture should be valid.");

		assert_eq!(Account::new(id.clone(), None, None).name, "0f1e2d3c");
		assert_eq!(Account::new(id.clone(), Some("  ".into()), None).name, "0f1e2d3c");
		assert_eq!(Account::new(id, Some("Alice".into()), None).name, "Alice");
	}
}
