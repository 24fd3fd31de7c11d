//! Injected random source for identifiers, session tokens, and authorization state.

// crates.io
use rand::{Rng, RngCore, SeedableRng, distr::Alphanumeric, rngs::StdRng};
// self
use crate::{
	_prelude::*,
	auth::{AccountId, SESSION_TOKEN_ALPHABET, SESSION_TOKEN_LEN, SessionToken},
};

const ACCOUNT_ID_BYTES: usize = 16;
const STATE_LEN: usize = 32;

/// Shared, cloneable random source.
///
/// Production brokers seed from the OS; tests use [`Entropy::seeded`] so generated identifiers
/// and tokens are reproducible.
#[derive(Clone)]
pub struct Entropy(Arc<Mutex<StdRng>>);
impl Entropy {
	/// Seeds a generator from the operating system.
	pub fn from_os() -> Self {
		Self::from_rng(StdRng::from_os_rng())
	}

	/// Deterministic generator for tests and replays.
	pub fn seeded(seed: u64) -> Self {
		Self::from_rng(StdRng::seed_from_u64(seed))
	}

	fn from_rng(rng: StdRng) -> Self {
		Self(Arc::new(Mutex::new(rng)))
	}

	/// 32 lowercase hex characters from 16 random bytes.
	pub fn account_id(&self) -> Result<AccountId> {
		let mut bytes = [0_u8; ACCOUNT_ID_BYTES];

		self.0.lock().fill_bytes(&mut bytes);

		let hex = bytes.iter().map(|b| format!("{b:02x}")).collect::<String>();

		AccountId::new(&hex).map_err(|e| Error::invariant(e.to_string()))
	}

	/// Fixed-length session token drawn from the 56-character session alphabet.
	pub fn session_token(&self) -> SessionToken {
		let mut rng = self.0.lock();
		let token = (0..SESSION_TOKEN_LEN)
			.map(|_| {
				let idx = rng.random_range(0..SESSION_TOKEN_ALPHABET.len());

				char::from(SESSION_TOKEN_ALPHABET[idx])
			})
			.collect::<String>();

		SessionToken::new(token)
	}

	/// Alphanumeric nonce for authorization `state` parameters.
	pub fn state(&self) -> String {
		let mut rng = self.0.lock();

		(&mut *rng).sample_iter(Alphanumeric).take(STATE_LEN).map(char::from).collect()
	}
}
impl Default for Entropy {
	fn default() -> Self {
		Self::from_os()
	}
}
impl Debug for Entropy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Entropy(..)")
	}
}
