//! OpenID Connect discovery, resolved once while the broker starts.

// self
use crate::{
	_prelude::*,
	http::{ProviderHttpClient, ProviderTransport},
	provider::ProviderDescriptorBuilder,
};

/// Subset of an OIDC discovery document the broker consumes.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DiscoveryDocument {
	/// Issuer identifier; ID tokens must carry it as `iss`.
	#[serde(default)]
	pub issuer: Option<String>,
	/// Authorization endpoint.
	pub authorization_endpoint: Url,
	/// Token endpoint.
	pub token_endpoint: Url,
	/// User-info endpoint.
	#[serde(default)]
	pub userinfo_endpoint: Option<Url>,
	/// JWKS endpoint.
	pub jwks_uri: Url,
}
impl DiscoveryDocument {
	/// Fetches and decodes the discovery document at `uri`.
	pub async fn fetch<C>(transport: &ProviderTransport<C>, uri: &Url) -> Result<Self>
	where
		C: ?Sized + ProviderHttpClient,
	{
		let document: Self = transport.get_json("discovery", uri, &[], None).await?;

		#[cfg(feature = "tracing")]
		tracing::info!(
			discovery = %uri,
			issuer = document.issuer.as_deref().unwrap_or_default(),
			"resolved provider discovery document"
		);

		Ok(document)
	}

	/// Copies the discovered endpoints onto a descriptor builder.
	pub fn apply(self, builder: ProviderDescriptorBuilder) -> ProviderDescriptorBuilder {
		let mut builder = builder
			.authorization_endpoint(self.authorization_endpoint)
			.token_endpoint(self.token_endpoint)
			.jwks_endpoint(self.jwks_uri);

		if let Some(userinfo) = self.userinfo_endpoint {
			builder = builder.userinfo_endpoint(userinfo);
		}
		if let Some(issuer) = self.issuer.filter(|issuer| !issuer.is_empty()) {
			builder = builder.issuer(issuer);
		}

		builder
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::ProviderId,
		provider::{ProviderDescriptor, ProviderKind},
	};

	#[test]
	fn discovered_endpoints_complete_an_oidc_descriptor() {
		let document: DiscoveryDocument = serde_json::from_str(
			r#"{
				"issuer": "https://accounts.example.com",
				"authorization_endpoint": "https://accounts.example.com/o/oauth2/v2/auth",
				"token_endpoint": "https://oauth2.example.com/token",
				"jwks_uri": "https://www.example.com/oauth2/v3/certs",
				"response_types_supported": ["code"]
			}"#,
		)
		.expect("Discovery fixture should decode.");
		let builder = ProviderDescriptor::builder(
			ProviderId::new("example").expect("Provider fixture should be valid."),
			ProviderKind::Oidc,
		)
		.client_id("client")
		.client_secret("secret")
		.redirect_uri(Url::parse("https://app.test/cb").expect("Redirect should parse."));
		let descriptor = document.apply(builder).build().expect("Descriptor should build.");

		assert_eq!(descriptor.endpoints.issuer.as_deref(), Some("https://accounts.example.com"));
		assert_eq!(
			descriptor.endpoints.jwks.as_ref().map(Url::as_str),
			Some("https://www.example.com/oauth2/v3/certs")
		);
		assert!(descriptor.endpoints.userinfo.is_none());
	}
}
