//! Opaque bearer tokens issued by the broker itself.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Number of characters in every issued session token.
pub const SESSION_TOKEN_LEN: usize = 50;
/// Alphabet session tokens are drawn from (56 characters).
pub const SESSION_TOKEN_ALPHABET: &[u8] =
	b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ-_.~";

/// Session bearer token handed to the relying application.
///
/// Stores never see the raw value; they index sessions by [`digest`](Self::digest).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);
impl SessionToken {
	/// Wraps a token received from a caller.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw token. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Base64url (no padding) SHA-256 digest used as the storage key.
	pub fn digest(&self) -> String {
		let mut hasher = Sha256::new();

		hasher.update(self.0.as_bytes());

		URL_SAFE_NO_PAD.encode(hasher.finalize())
	}
}
impl Debug for SessionToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("SessionToken").field(&"<redacted>").finish()
	}
}
impl Display for SessionToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
