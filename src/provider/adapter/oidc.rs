// self
use crate::{
	_prelude::*,
	auth::IdentityClaims,
	error::ProviderError,
	http::ProviderHttpClient,
	jwt::TokenVerifier,
	oauth::CodeExchange,
	provider::ProviderDescriptor,
};

/// Verifies the returned ID token and reads `sub`, `name`, `email`, and `exp` from it.
pub(super) async fn claims<C>(
	verifier: &TokenVerifier<C>,
	descriptor: &ProviderDescriptor,
	exchange: &CodeExchange,
) -> Result<IdentityClaims>
where
	C: ?Sized + ProviderHttpClient,
{
	let id_token = exchange
		.id_token
		.as_deref()
		.filter(|token| !token.is_empty())
		.ok_or(ProviderError::MissingClaim { claim: "id_token" })?;
	let claims = verifier.verify(descriptor, id_token).await?;

	Ok(IdentityClaims::from_claim_map(&claims)?)
}
