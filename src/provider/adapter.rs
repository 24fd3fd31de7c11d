//! Per-kind code exchange, dispatched on [`ProviderKind`].
//!
//! Every variant performs the same `oauth2` code exchange and then normalizes the provider's
//! identity data into [`IdentityClaims`]: OIDC verifies the returned ID token, Facebook reads
//! the Graph user-info endpoint, and Fitbit combines its profile with token introspection.

mod facebook;
mod fitbit;
mod oidc;

// self
use crate::{
	_prelude::*,
	auth::{IdentityClaims, ProviderGrant, ProviderTokens, ProviderTokensBuilderError},
	error::ProviderError,
	http::{ProviderHttpClient, ProviderTransport},
	jwt::TokenVerifier,
	oauth::{CodeExchange, CodeExchangeFacade},
	provider::{ProviderDescriptor, ProviderKind},
};

/// Exchanges authorization codes for provider tokens and normalized claims.
pub struct ProviderAdapter<C>
where
	C: ?Sized + ProviderHttpClient,
{
	transport: ProviderTransport<C>,
	verifier: Arc<TokenVerifier<C>>,
}
impl<C> ProviderAdapter<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Creates an adapter sharing the verifier's key cache.
	pub fn new(transport: ProviderTransport<C>, verifier: Arc<TokenVerifier<C>>) -> Self {
		Self { transport, verifier }
	}

	/// Verifier used for OIDC ID tokens.
	pub fn verifier(&self) -> &Arc<TokenVerifier<C>> {
		&self.verifier
	}

	/// Builds the authorize URL users are redirected to.
	pub fn authorize_url(&self, descriptor: &ProviderDescriptor, state: String) -> Result<Url> {
		let facade = self.facade(descriptor)?;

		Ok(facade.authorize_url(descriptor, state))
	}

	/// Exchanges `code` and returns provider tokens plus normalized claims.
	pub async fn exchange(
		&self,
		descriptor: &ProviderDescriptor,
		code: &str,
	) -> Result<ProviderGrant> {
		let exchange = self.facade(descriptor)?.exchange_code(code).await?;
		let claims = match descriptor.kind {
			ProviderKind::Oidc => oidc::claims(&self.verifier, descriptor, &exchange).await?,
			ProviderKind::Facebook =>
				facebook::claims(&self.transport, descriptor, &exchange).await?,
			ProviderKind::Fitbit => fitbit::claims(&self.transport, descriptor, &exchange).await?,
		};

		#[cfg(feature = "tracing")]
		tracing::debug!(
			provider = %descriptor.id,
			kind = %descriptor.kind,
			subject = %claims.subject,
			"provider exchange completed"
		);

		into_grant(exchange, claims, OffsetDateTime::now_utc())
	}

	fn facade(&self, descriptor: &ProviderDescriptor) -> Result<CodeExchangeFacade<C>> {
		CodeExchangeFacade::from_descriptor(descriptor, Arc::clone(self.transport.client()))
	}
}
impl<C> Debug for ProviderAdapter<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderAdapter").field("verifier", &self.verifier).finish()
	}
}

fn into_grant(
	exchange: CodeExchange,
	claims: IdentityClaims,
	now: OffsetDateTime,
) -> Result<ProviderGrant> {
	let mut builder =
		ProviderTokens::builder().access_token(exchange.access_token.expose()).issued_at(now);

	builder = match exchange.expires_in {
		Some(lifetime) => builder.expires_in(lifetime),
		None => builder.expires_at(claims.expires_at_datetime()),
	};

	if let Some(refresh) = &exchange.refresh_token {
		builder = builder.refresh_token(refresh.expose());
	}

	let tokens = builder.build().map_err(|e| match e {
		ProviderTokensBuilderError::MissingAccessToken =>
			ProviderError::MissingClaim { claim: "access_token" },
		ProviderTokensBuilderError::MissingExpiry => ProviderError::MissingClaim { claim: "exp" },
	})?;

	Ok(ProviderGrant { tokens, claims })
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;
	use crate::auth::{SubjectId, TokenSecret};

	fn claims() -> IdentityClaims {
		IdentityClaims::new(
			SubjectId::new("sub123").expect("Subject fixture should be valid."),
			None,
			None,
			1_714_570_000,
		)
	}

	#[test]
	fn grant_expiry_prefers_the_token_lifetime() {
		let now = datetime!(2024-05-01 12:00 UTC);
		let exchange = CodeExchange {
			access_token: TokenSecret::new("access"),
			refresh_token: Some(TokenSecret::new("refresh")),
			expires_in: Some(Duration::seconds(60)),
			id_token: None,
		};
		let grant = into_grant(exchange.clone(), claims(), now).expect("Grant should build.");

		assert_eq!(grant.tokens.expires_at, now + Duration::seconds(60));
		assert!(grant.tokens.refresh_token.is_some());

		let grant = into_grant(CodeExchange { expires_in: None, ..exchange }, claims(), now)
			.expect("Grant should build.");

		assert_eq!(grant.tokens.expires_at, claims().expires_at_datetime());
	}

	#[test]
	fn empty_access_tokens_are_rejected() {
		let exchange = CodeExchange {
			access_token: TokenSecret::new(""),
			refresh_token: None,
			expires_in: Some(Duration::seconds(60)),
			id_token: None,
		};
		let err = into_grant(exchange, claims(), OffsetDateTime::now_utc())
			.expect_err("Empty access token must fail.");

		assert!(matches!(
			err,
			Error::Provider(ProviderError::MissingClaim { claim: "access_token" })
		));
	}
}
