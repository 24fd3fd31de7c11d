//! ID-token verification against provider key sets.
//!
//! [`KeyStore`] caches each provider's JWKS; [`TokenVerifier`] resolves the token's `kid`,
//! refetching the key set exactly once on a miss, and validates signature, audience, issuer,
//! and expiry through `jsonwebtoken`.

pub mod keys;
pub mod verifier;

pub use keys::*;
pub use verifier::*;

// crates.io
use jsonwebtoken::{Algorithm, errors::Error as JwtError};
// self
use crate::_prelude::*;

/// Reasons an ID token is refused.
///
/// Every variant surfaces to callers as [`Error::InvalidToken`]; the cause is only logged.
#[derive(Debug, ThisError)]
pub enum TokenError {
	/// Token or its header could not be decoded.
	#[error("malformed token")]
	Malformed {
		/// Decoder failure.
		#[source]
		source: JwtError,
	},
	/// Header carries no `kid`.
	#[error("token header has no key id")]
	MissingKeyId,
	/// Key id is absent from the key set even after a refresh.
	#[error("no suitable key")]
	NoSuitableKey {
		/// Requested key id.
		kid: String,
	},
	/// Token is signed with a non-RSA algorithm.
	#[error("unsupported signing algorithm {algorithm:?}")]
	UnsupportedAlgorithm {
		/// Algorithm named in the header.
		algorithm: Algorithm,
	},
	/// Matching JWK cannot be turned into an RSA public key.
	#[error("key {kid} is not a usable RSA key: {reason}")]
	InvalidKey {
		/// Offending key id.
		kid: String,
		/// What was wrong with it.
		reason: String,
	},
	/// Signature, audience, issuer, or expiry check failed.
	#[error("token rejected: {source}")]
	Rejected {
		/// Validation failure.
		#[source]
		source: JwtError,
	},
}
