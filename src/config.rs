//! Broker configuration loaded from JSON.
//!
//! Configuration is read once at startup. OIDC providers are completed by fetching their
//! discovery document in [`BrokerConfig::resolve`]; there is no runtime reload.

// std
use std::path::Path;
// self
use crate::{
	_prelude::*,
	auth::{ProviderId, ScopeSet},
	error::ConfigError,
	http::{ProviderHttpClient, ProviderTransport},
	provider::{DiscoveryDocument, ProviderDescriptor, ProviderDescriptorBuilder, ProviderKind},
};

/// Top-level broker configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
	/// Configured identity providers; names must be unique.
	pub providers: Vec<ProviderConfig>,
	/// Concurrently live sessions per account.
	#[serde(default = "default_session_cap")]
	pub session_cap: usize,
	/// Session lifetime in seconds.
	#[serde(default = "default_session_ttl_secs")]
	pub session_ttl_secs: u64,
	/// Request-scoped timeout for every outbound provider call, in seconds.
	#[serde(default = "default_http_timeout_secs")]
	pub http_timeout_secs: u64,
	/// Attempts for a transaction that hits a store uniqueness conflict.
	#[serde(default = "default_max_transaction_attempts")]
	pub max_transaction_attempts: usize,
}
impl BrokerConfig {
	/// Parses and validates a JSON document.
	pub fn from_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
		let mut deserializer = serde_json::Deserializer::from_slice(bytes);
		let config: Self = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| ConfigError::Parse { source })?;

		config.validate()?;

		Ok(config)
	}

	/// Reads, parses, and validates a JSON file.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let bytes = std::fs::read(path)
			.map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;

		Self::from_slice(&bytes)
	}

	/// Session lifetime as a [`Duration`].
	pub fn session_ttl(&self) -> Duration {
		Duration::seconds(i64::try_from(self.session_ttl_secs).unwrap_or(i64::MAX))
	}

	/// Outbound request timeout as a [`Duration`].
	pub fn http_timeout(&self) -> Duration {
		Duration::seconds(i64::try_from(self.http_timeout_secs).unwrap_or(i64::MAX))
	}

	/// Checks cross-field invariants serde cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		for (field, value) in [
			("session_cap", self.session_cap as u64),
			("session_ttl_secs", self.session_ttl_secs),
			("http_timeout_secs", self.http_timeout_secs),
			("max_transaction_attempts", self.max_transaction_attempts as u64),
		] {
			if value == 0 {
				return Err(invalid(field, "must be greater than zero"));
			}
		}

		let mut seen = BTreeSet::new();

		for (idx, provider) in self.providers.iter().enumerate() {
			provider.validate(idx)?;

			if !seen.insert(provider.name.as_str()) {
				return Err(ConfigError::DuplicateProvider { provider: provider.name.clone() });
			}
		}

		Ok(())
	}

	/// Turns every provider entry into a validated descriptor.
	///
	/// OIDC providers fetch their discovery document through `transport`; a single failing
	/// provider fails the whole resolution.
	pub async fn resolve<C>(
		&self,
		transport: &ProviderTransport<C>,
	) -> Result<Vec<ProviderDescriptor>>
	where
		C: ?Sized + ProviderHttpClient,
	{
		let mut descriptors = Vec::with_capacity(self.providers.len());

		for provider in &self.providers {
			descriptors.push(provider.resolve(transport).await?);
		}

		Ok(descriptors)
	}
}

/// One configured identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
	/// Name callers use to select the provider.
	pub name: String,
	/// Protocol family.
	#[serde(rename = "type")]
	pub kind: ProviderKind,
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: String,
	/// Registered redirect URI.
	pub redirect_uri: Url,
	/// Requested scopes, separated by whitespace or commas.
	#[serde(default)]
	pub scopes: String,
	/// Discovery document location; required for `oidc`.
	#[serde(default)]
	pub discover_uri: Option<Url>,
}
impl ProviderConfig {
	/// Builder pre-filled with everything except discovered endpoints.
	pub fn descriptor_builder(&self) -> Result<ProviderDescriptorBuilder, ConfigError> {
		let id = ProviderId::new(&self.name)
			.map_err(|e| invalid(format!("providers.{}.name", self.name), e))?;
		let scopes = ScopeSet::from_str(&self.scopes)
			.map_err(|e| invalid(format!("providers.{}.scopes", self.name), e))?;

		Ok(ProviderDescriptor::builder(id, self.kind)
			.client_id(&self.client_id)
			.client_secret(&self.client_secret)
			.redirect_uri(self.redirect_uri.clone())
			.scopes(scopes))
	}

	async fn resolve<C>(&self, transport: &ProviderTransport<C>) -> Result<ProviderDescriptor>
	where
		C: ?Sized + ProviderHttpClient,
	{
		let mut builder = self.descriptor_builder()?;

		if let (ProviderKind::Oidc, Some(uri)) = (self.kind, &self.discover_uri) {
			builder = DiscoveryDocument::fetch(transport, uri).await?.apply(builder);
		}

		Ok(builder.build().map_err(ConfigError::from)?)
	}

	fn validate(&self, idx: usize) -> Result<(), ConfigError> {
		if self.name.trim().is_empty() {
			return Err(invalid(format!("providers[{idx}].name"), "cannot be empty"));
		}
		if self.kind == ProviderKind::Oidc && self.discover_uri.is_none() {
			return Err(invalid(
				format!("providers[{idx}].discover_uri"),
				"is required for oidc providers",
			));
		}

		self.descriptor_builder().map(|_| ())
	}
}

fn invalid(field: impl Into<String>, reason: impl Display) -> ConfigError {
	ConfigError::InvalidValue { field: field.into(), reason: reason.to_string() }
}

fn default_session_cap() -> usize {
	5
}

fn default_session_ttl_secs() -> u64 {
	3_600
}

fn default_http_timeout_secs() -> u64 {
	10
}

fn default_max_transaction_attempts() -> usize {
	3
}
