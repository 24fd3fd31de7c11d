//! Provider descriptor data structures shared by every adapter.

/// Builder API for assembling provider descriptors.
pub mod builder;
/// Provider-specific quirk toggles.
pub mod quirks;
/// Hardcoded endpoints for providers without discovery.
pub mod well_known;

pub use builder::*;
pub use quirks::*;
pub use well_known::*;

// self
use crate::{
	_prelude::*,
	auth::{ProviderId, ScopeSet, TokenSecret},
};

/// Provider protocol family; selects the exchange variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
	/// Generic OpenID Connect provider with discovery and signed ID tokens.
	Oidc,
	/// Facebook Graph login.
	Facebook,
	/// Fitbit OAuth 2.0 with token introspection.
	Fitbit,
}
impl ProviderKind {
	/// Lowercase tag used in configuration and logs.
	pub fn as_str(self) -> &'static str {
		match self {
			ProviderKind::Oidc => "oidc",
			ProviderKind::Facebook => "facebook",
			ProviderKind::Fitbit => "fitbit",
		}
	}
}
impl Display for ProviderKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint users are redirected to.
	pub authorization: Url,
	/// Token endpoint used for code exchanges.
	pub token: Url,
	/// User-info (Facebook) or profile (Fitbit) endpoint.
	pub userinfo: Option<Url>,
	/// JWKS endpoint (OIDC).
	pub jwks: Option<Url>,
	/// Token introspection endpoint (Fitbit).
	pub introspection: Option<Url>,
	/// Expected `iss` claim of ID tokens, when discovery published one.
	pub issuer: Option<String>,
}
impl ProviderEndpoints {
	/// User-info endpoint, required by Facebook and Fitbit descriptors.
	pub fn userinfo_url(&self) -> Result<&Url, ProviderDescriptorError> {
		require("userinfo", &self.userinfo)
	}

	/// JWKS endpoint, required by OIDC descriptors.
	pub fn jwks_url(&self) -> Result<&Url, ProviderDescriptorError> {
		require("jwks", &self.jwks)
	}

	/// Introspection endpoint, required by Fitbit descriptors.
	pub fn introspection_url(&self) -> Result<&Url, ProviderDescriptorError> {
		require("introspection", &self.introspection)
	}
}

/// Immutable provider descriptor consumed by adapters and flows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderDescriptor {
	/// Provider name used in requests and storage.
	pub id: ProviderId,
	/// Protocol family.
	pub kind: ProviderKind,
	/// OAuth client identifier; also the expected ID-token audience.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Redirect URI registered with the provider.
	pub redirect_uri: Url,
	/// Scopes requested during authorization.
	pub scopes: ScopeSet,
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Provider-specific quirks.
	pub quirks: ProviderQuirks,
}
impl ProviderDescriptor {
	/// Creates a new builder for the provided identifier and kind.
	pub fn builder(id: ProviderId, kind: ProviderKind) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(id, kind)
	}
}

fn require<'a>(
	name: &'static str,
	endpoint: &'a Option<Url>,
) -> Result<&'a Url, ProviderDescriptorError> {
	endpoint.as_ref().ok_or(ProviderDescriptorError::MissingEndpoint { endpoint: name })
}
