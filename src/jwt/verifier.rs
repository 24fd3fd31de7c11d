//! Signature and claim verification for provider ID tokens.

// crates.io
use jsonwebtoken::{
	Algorithm, Validation,
	jwk::{Jwk, JwkSet},
};
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	auth::ProviderId,
	error::ConfigError,
	http::{ProviderHttpClient, ProviderTransport},
	jwt::{KeyStore, TokenError, decoding_key},
	provider::ProviderDescriptor,
};

/// Verifies ID tokens and owns the JWKS cache.
pub struct TokenVerifier<C>
where
	C: ?Sized + ProviderHttpClient,
{
	keys: KeyStore,
	transport: ProviderTransport<C>,
}
impl<C> TokenVerifier<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Creates a verifier with an empty key cache.
	pub fn new(transport: ProviderTransport<C>) -> Self {
		Self { keys: KeyStore::default(), transport }
	}

	/// Key cache used by this verifier.
	pub fn keys(&self) -> &KeyStore {
		&self.keys
	}

	/// Verifies `token` for the descriptor's provider and returns its claims.
	///
	/// An unknown `kid` triggers exactly one JWKS fetch; when the key is still absent the
	/// token fails with [`TokenError::NoSuitableKey`]. Key-set fetch failures surface as
	/// transport or provider errors, every other failure as [`Error::InvalidToken`].
	pub async fn verify(
		&self,
		descriptor: &ProviderDescriptor,
		token: &str,
	) -> Result<Map<String, Value>> {
		let result = self.verify_inner(descriptor, token).await;

		#[cfg(feature = "tracing")]
		if let Err(e) = &result {
			tracing::warn!(provider = %descriptor.id, error = %e, "ID token verification failed");
		}

		result
	}

	/// Fetches the provider's JWKS and replaces the cached set.
	pub async fn refresh(&self, descriptor: &ProviderDescriptor) -> Result<()> {
		let uri = descriptor.endpoints.jwks_url().map_err(ConfigError::from)?;
		let set: JwkSet = self.transport.get_json("jwks", uri, &[], None).await?;

		#[cfg(feature = "tracing")]
		tracing::debug!(provider = %descriptor.id, keys = set.keys.len(), "refreshed JWKS");

		self.keys.replace(descriptor.id.clone(), set);

		Ok(())
	}

	async fn verify_inner(
		&self,
		descriptor: &ProviderDescriptor,
		token: &str,
	) -> Result<Map<String, Value>> {
		let (algorithm, kid) = inspect_header(token)?;
		let key = self.resolve_key(descriptor, &kid).await?;
		let verifying_key = decoding_key(&key)?;
		let validation = validation_for(descriptor, algorithm);
		let data = jsonwebtoken::decode::<Map<String, Value>>(token, &verifying_key, &validation)
			.map_err(|source| TokenError::Rejected { source })?;

		Ok(data.claims)
	}

	async fn resolve_key(&self, descriptor: &ProviderDescriptor, kid: &str) -> Result<Jwk> {
		if let Some(key) = self.cached(&descriptor.id, kid) {
			return Ok(key);
		}

		self.refresh(descriptor).await?;

		self.cached(&descriptor.id, kid)
			.ok_or_else(|| TokenError::NoSuitableKey { kid: kid.to_owned() }.into())
	}

	fn cached(&self, provider: &ProviderId, kid: &str) -> Option<Jwk> {
		self.keys.lookup(provider, kid)
	}
}
impl<C> Debug for TokenVerifier<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenVerifier").field("keys", &self.keys).finish()
	}
}

/// Reads the signing algorithm and key id, refusing anything but RSA.
pub(crate) fn inspect_header(token: &str) -> Result<(Algorithm, String), TokenError> {
	let header =
		jsonwebtoken::decode_header(token).map_err(|source| TokenError::Malformed { source })?;

	if !is_rsa(header.alg) {
		return Err(TokenError::UnsupportedAlgorithm { algorithm: header.alg });
	}

	let kid = header.kid.filter(|kid| !kid.is_empty()).ok_or(TokenError::MissingKeyId)?;

	Ok((header.alg, kid))
}

fn is_rsa(algorithm: Algorithm) -> bool {
	matches!(
		algorithm,
		Algorithm::RS256
			| Algorithm::RS384
			| Algorithm::RS512
			| Algorithm::PS256
			| Algorithm::PS384
			| Algorithm::PS512
	)
}

fn validation_for(descriptor: &ProviderDescriptor, algorithm: Algorithm) -> Validation {
	let mut validation = Validation::new(algorithm);
	// Audience and issuer are only compared when present, so both must also be required.
	let mut required = vec!["exp", "sub", "aud"];

	validation.set_audience(&[descriptor.client_id.as_str()]);

	if let Some(issuer) = &descriptor.endpoints.issuer {
		validation.set_issuer(&[issuer.as_str()]);
		required.push("iss");
	}

	validation.set_required_spec_claims(&required);

	validation
}
