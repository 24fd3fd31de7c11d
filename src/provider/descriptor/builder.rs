// self
use crate::{
	_prelude::*,
	auth::{ProviderId, ScopeSet, TokenSecret},
	provider::{
		ProviderDescriptor, ProviderEndpoints, ProviderKind, ProviderQuirks, WellKnownEndpoints,
	},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ProviderDescriptorError {
	/// Client identifier is mandatory.
	#[error("Missing client id.")]
	MissingClientId,
	/// Redirect URI is mandatory.
	#[error("Missing redirect URI.")]
	MissingRedirectUri,
	/// The provider kind needs an endpoint that was not supplied.
	#[error("Missing {endpoint} endpoint.")]
	MissingEndpoint {
		/// Which endpoint is missing.
		endpoint: &'static str,
	},
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Reject scope delimiters that are control characters.
	#[error("Scope delimiter must be a printable character.")]
	InvalidScopeDelimiter {
		/// Invalid delimiter that was supplied.
		delimiter: char,
	},
}

/// Builder for [`ProviderDescriptor`] values.
///
/// Facebook and Fitbit descriptors fall back to [`WellKnownEndpoints`] for every endpoint
/// left unset; OIDC descriptors take theirs from discovery.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	/// Identifier for the descriptor being constructed.
	pub id: ProviderId,
	/// Provider protocol family.
	pub kind: ProviderKind,
	/// OAuth client identifier.
	pub client_id: Option<String>,
	/// OAuth client secret.
	pub client_secret: Option<TokenSecret>,
	/// Registered redirect URI.
	pub redirect_uri: Option<Url>,
	/// Requested scopes.
	pub scopes: ScopeSet,
	/// Authorization endpoint.
	pub authorization_endpoint: Option<Url>,
	/// Token endpoint.
	pub token_endpoint: Option<Url>,
	/// User-info or profile endpoint.
	pub userinfo_endpoint: Option<Url>,
	/// JWKS endpoint.
	pub jwks_endpoint: Option<Url>,
	/// Introspection endpoint.
	pub introspection_endpoint: Option<Url>,
	/// Expected ID-token issuer.
	pub issuer: Option<String>,
	/// Provider-specific quirks.
	pub quirks: ProviderQuirks,
}
impl ProviderDescriptorBuilder {
	/// Creates a new builder seeded with the identifier and the kind's default quirks.
	pub fn new(id: ProviderId, kind: ProviderKind) -> Self {
		Self {
			id,
			kind,
			client_id: None,
			client_secret: None,
			redirect_uri: None,
			scopes: ScopeSet::default(),
			authorization_endpoint: None,
			token_endpoint: None,
			userinfo_endpoint: None,
			jwks_endpoint: None,
			introspection_endpoint: None,
			issuer: None,
			quirks: ProviderQuirks::for_kind(kind),
		}
	}

	/// Sets the client identifier.
	pub fn client_id(mut self, value: impl Into<String>) -> Self {
		self.client_id = Some(value.into());

		self
	}

	/// Sets the client secret.
	pub fn client_secret(mut self, value: impl Into<String>) -> Self {
		self.client_secret = Some(TokenSecret::new(value));

		self
	}

	/// Sets the redirect URI.
	pub fn redirect_uri(mut self, url: Url) -> Self {
		self.redirect_uri = Some(url);

		self
	}

	/// Sets the requested scopes.
	pub fn scopes(mut self, scopes: ScopeSet) -> Self {
		self.scopes = scopes;

		self
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the user-info or profile endpoint.
	pub fn userinfo_endpoint(mut self, url: Url) -> Self {
		self.userinfo_endpoint = Some(url);

		self
	}

	/// Sets the JWKS endpoint.
	pub fn jwks_endpoint(mut self, url: Url) -> Self {
		self.jwks_endpoint = Some(url);

		self
	}

	/// Sets the introspection endpoint.
	pub fn introspection_endpoint(mut self, url: Url) -> Self {
		self.introspection_endpoint = Some(url);

		self
	}

	/// Sets the expected ID-token issuer.
	pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
		self.issuer = Some(issuer.into());

		self
	}

	/// Overrides the provider quirks.
	pub fn quirks(mut self, quirks: ProviderQuirks) -> Self {
		self.quirks = quirks;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let client_id = self
			.client_id
			.filter(|id| !id.trim().is_empty())
			.ok_or(ProviderDescriptorError::MissingClientId)?;
		let redirect_uri = self.redirect_uri.ok_or(ProviderDescriptorError::MissingRedirectUri)?;
		let well_known = WellKnownEndpoints::for_kind(self.kind);
		let well_known = well_known.as_ref();
		let authorization = self
			.authorization_endpoint
			.or_else(|| well_known.map(|w| w.authorization.clone()))
			.ok_or(ProviderDescriptorError::MissingEndpoint { endpoint: "authorization" })?;
		let token = self
			.token_endpoint
			.or_else(|| well_known.map(|w| w.token.clone()))
			.ok_or(ProviderDescriptorError::MissingEndpoint { endpoint: "token" })?;
		let endpoints = ProviderEndpoints {
			authorization,
			token,
			userinfo: self.userinfo_endpoint.or_else(|| well_known.map(|w| w.userinfo.clone())),
			jwks: self.jwks_endpoint,
			introspection: self
				.introspection_endpoint
				.or_else(|| well_known.and_then(|w| w.introspection.clone())),
			issuer: self.issuer,
		};
		let descriptor = ProviderDescriptor {
			id: self.id,
			kind: self.kind,
			client_id,
			client_secret: self.client_secret.unwrap_or_else(|| TokenSecret::new("")),
			redirect_uri,
			scopes: self.scopes,
			endpoints,
			quirks: self.quirks,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ProviderDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		match self.kind {
			ProviderKind::Oidc => {
				self.endpoints.jwks_url()?;
			},
			ProviderKind::Facebook => {
				self.endpoints.userinfo_url()?;
			},
			ProviderKind::Fitbit => {
				self.endpoints.userinfo_url()?;
				self.endpoints.introspection_url()?;
			},
		}

		validate_endpoint("authorization", &self.endpoints.authorization)?;
		validate_endpoint("token", &self.endpoints.token)?;

		for (name, url) in [
			("userinfo", &self.endpoints.userinfo),
			("jwks", &self.endpoints.jwks),
			("introspection", &self.endpoints.introspection),
		] {
			if let Some(url) = url {
				validate_endpoint(name, url)?;
			}
		}

		validate_scope_delimiter(self.quirks.scope_delimiter)?;

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	if url.scheme() != "https" {
		Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}

fn validate_scope_delimiter(delimiter: char) -> Result<(), ProviderDescriptorError> {
	if delimiter.is_control() {
		Err(ProviderDescriptorError::InvalidScopeDelimiter { delimiter })
	} else {
		Ok(())
	}
}
