//! Key selection over `jsonwebtoken`'s JWKS model and the provider-keyed key cache.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE};
use jsonwebtoken::{
	DecodingKey,
	jwk::{AlgorithmParameters, Jwk, JwkSet, PublicKeyUse},
};
// self
use crate::{_prelude::*, auth::ProviderId, jwt::TokenError};

/// Finds the signing key with the given identifier; `enc` keys are skipped.
pub fn find_signing_key<'a>(set: &'a JwkSet, kid: &str) -> Option<&'a Jwk> {
	set.keys.iter().find(|key| {
		key.common.key_id.as_deref() == Some(kid)
			&& matches!(key.common.public_key_use, None | Some(PublicKeyUse::Signature))
	})
}

/// Builds the RSA verification key from the JWK's `n`/`e` components.
///
/// Components are decoded with [`decode_component`], so providers that keep base64 padding
/// are accepted as well as those that strip it.
pub fn decoding_key(key: &Jwk) -> Result<DecodingKey, TokenError> {
	let kid = key.common.key_id.clone().unwrap_or_default();
	let invalid = |reason: String| TokenError::InvalidKey { kid: kid.clone(), reason };
	let AlgorithmParameters::RSA(rsa) = &key.algorithm else {
		return Err(invalid("key type is not RSA".into()));
	};
	let modulus = decode_component(&rsa.n).map_err(|e| invalid(format!("modulus: {e}")))?;
	let exponent = decode_component(&rsa.e).map_err(|e| invalid(format!("exponent: {e}")))?;

	Ok(DecodingKey::from_rsa_raw_components(&modulus, &exponent))
}

/// Provider-keyed JWKS cache.
///
/// Refreshes overwrite the whole set for a provider. Concurrent refreshes are idempotent, so
/// no lock is held across the network fetch.
#[derive(Debug, Default)]
pub struct KeyStore {
	sets: RwLock<HashMap<ProviderId, Arc<JwkSet>>>,
}
impl KeyStore {
	/// Returns a copy of the cached key, if present.
	pub fn lookup(&self, provider: &ProviderId, kid: &str) -> Option<Jwk> {
		self.sets.read().get(provider).and_then(|set| find_signing_key(set, kid).cloned())
	}

	/// Replaces the cached key set for `provider`.
	pub fn replace(&self, provider: ProviderId, set: JwkSet) {
		self.sets.write().insert(provider, Arc::new(set));
	}

	/// Whether any key set is cached for `provider`.
	pub fn contains(&self, provider: &ProviderId) -> bool {
		self.sets.read().contains_key(provider)
	}
}

/// Decodes a base64url JWK component, restoring the padding providers strip.
pub fn decode_component(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
	let mut padded = value.trim().to_owned();

	while padded.len() % 4 != 0 {
		padded.push('=');
	}

	URL_SAFE.decode(padded)
}

#[cfg(test)]
mod tests {
	// crates.io
	use jsonwebtoken::{Algorithm, EncodingKey, Header, Validation};
	use serde_json::{Map, Value, json};
	// self
	use super::*;

	const MODULUS: &str = include_str!("../../tests/fixtures/signing_key.n");
	const PRIVATE_PEM: &[u8] = include_bytes!("../../tests/fixtures/signing_key.pem");

	fn key(value: Value) -> Jwk {
		serde_json::from_value(value).expect("JWK fixture should decode.")
	}

	fn rsa_key(kid: &str, usage: &str, modulus: &str) -> Jwk {
		key(json!({
			"kty": "RSA",
			"kid": kid,
			"alg": "RS256",
			"use": usage,
			"n": modulus,
			"e": "AQAB",
		}))
	}

	fn set(keys: Vec<Jwk>) -> JwkSet {
		JwkSet { keys }
	}

	#[test]
	fn components_are_padded_before_decoding() {
		assert_eq!(decode_component("AQAB").expect("Exponent should decode."), vec![1, 0, 1]);
		assert_eq!(decode_component("AQ").expect("Unpadded input should decode."), vec![1]);
		assert_eq!(decode_component("AQ==").expect("Padded input should decode."), vec![1]);
		assert_eq!(decode_component("_-8").expect("URL-safe input should decode."), vec![255, 239]);
		assert!(decode_component("A").is_err());
	}

	#[test]
	fn reconstructed_key_verifies_fixture_signature() {
		let encoding =
			EncodingKey::from_rsa_pem(PRIVATE_PEM).expect("Fixture private key should load.");
		let token = jsonwebtoken::encode(
			&Header::new(Algorithm::RS256),
			&json!({ "sub": "sub123", "exp": 4_102_444_800_i64 }),
			&encoding,
		)
		.expect("Fixture token should sign.");
		let stripped = MODULUS.trim().to_owned();
		let padded = format!("{stripped}==");

		for modulus in [stripped, padded] {
			let decoding = decoding_key(&rsa_key("k1", "sig", &modulus))
				.expect("Fixture JWK should convert.");
			let data = jsonwebtoken::decode::<Map<String, Value>>(
				&token,
				&decoding,
				&Validation::new(Algorithm::RS256),
			)
			.expect("Signature should verify with the reconstructed key.");

			assert_eq!(data.claims.get("sub").and_then(Value::as_str), Some("sub123"));
		}
	}

	#[test]
	fn non_rsa_keys_are_rejected() {
		let ec = key(json!({
			"kty": "EC",
			"kid": "ec1",
			"crv": "P-256",
			"x": "f83OJ3D2xF1Bg8vub9tLe1gHMzV76e8Tus9uPHvRVEU",
			"y": "x_FEzRu9m36HLN_tue659LNpXW6pCyStikYjKIWI5a0",
		}));

		assert!(matches!(
			decoding_key(&ec),
			Err(TokenError::InvalidKey { kid, .. }) if kid == "ec1"
		));
	}

	#[test]
	fn key_store_replaces_whole_sets() {
		let store = KeyStore::default();
		let provider = ProviderId::new("idp").expect("Provider fixture should be valid.");
		let modulus = MODULUS.trim();

		assert!(store.lookup(&provider, "k1").is_none());

		store.replace(
			provider.clone(),
			set(vec![rsa_key("k1", "sig", modulus), rsa_key("enc", "enc", modulus)]),
		);

		assert!(store.lookup(&provider, "k1").is_some());
		assert!(store.lookup(&provider, "enc").is_none());

		store.replace(provider.clone(), set(vec![rsa_key("k2", "sig", modulus)]));

		assert!(store.lookup(&provider, "k1").is_none());
		assert!(store.lookup(&provider, "k2").is_some());
		assert!(store.contains(&provider));
	}
}
