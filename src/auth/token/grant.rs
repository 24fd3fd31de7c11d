//! Tokens returned by a provider after a successful code exchange.

// self
use crate::{
	_prelude::*,
	auth::{IdentityClaims, token::secret::TokenSecret},
};

/// Errors produced by [`ProviderTokensBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderTokensBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
}

/// Provider access/refresh tokens captured during login or linking.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderTokens {
	/// Access token secret.
	pub access_token: TokenSecret,
	/// Refresh token secret; absent when the provider only grants it once.
	pub refresh_token: Option<TokenSecret>,
	/// Expiry instant of the access token.
	pub expires_at: OffsetDateTime,
}
impl ProviderTokens {
	/// Returns a builder for assembling provider tokens.
	pub fn builder() -> ProviderTokensBuilder {
		ProviderTokensBuilder::default()
	}
}
impl Debug for ProviderTokens {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderTokens")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Everything a provider exchange yields: tokens plus normalized claims.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderGrant {
	/// Provider-issued tokens.
	pub tokens: ProviderTokens,
	/// Normalized identity claims.
	pub claims: IdentityClaims,
}

/// Builder for [`ProviderTokens`].
#[derive(Clone, Debug, Default)]
pub struct ProviderTokensBuilder {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl ProviderTokensBuilder {
	/// Sets the access token.
	pub fn access_token(mut self, value: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(value));

		self
	}

	/// Sets the refresh token; empty strings are treated as absent.
	pub fn refresh_token(mut self, value: impl Into<String>) -> Self {
		let value = value.into();

		self.refresh_token = if value.is_empty() { None } else { Some(TokenSecret::new(value)) };

		self
	}

	/// Sets the instant `expires_in` is measured from; defaults to now.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder.
	pub fn build(self) -> Result<ProviderTokens, ProviderTokensBuilderError> {
		let access_token = self
			.access_token
			.filter(|secret| !secret.expose().is_empty())
			.ok_or(ProviderTokensBuilderError::MissingAccessToken)?;
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(at), _) => at,
			(None, Some(delta)) => self.issued_at.unwrap_or_else(OffsetDateTime::now_utc) + delta,
			(None, None) => return Err(ProviderTokensBuilderError::MissingExpiry),
		};

		Ok(ProviderTokens { access_token, refresh_token: self.refresh_token, expires_at })
	}
}
