// self
use crate::{_prelude::*, provider::ProviderKind};

/// How client credentials reach the token endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}

/// Provider-specific quirks that influence how adapters behave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderQuirks {
	/// Client authentication used for the code exchange.
	pub client_auth: ClientAuthMethod,
	/// Character used to join scopes when constructing `scope` parameters.
	pub scope_delimiter: char,
}
impl ProviderQuirks {
	/// Quirks each provider kind expects out of the box.
	pub fn for_kind(kind: ProviderKind) -> Self {
		match kind {
			ProviderKind::Oidc =>
				Self { client_auth: ClientAuthMethod::ClientSecretPost, scope_delimiter: ' ' },
			ProviderKind::Facebook =>
				Self { client_auth: ClientAuthMethod::ClientSecretPost, scope_delimiter: ',' },
			ProviderKind::Fitbit =>
				Self { client_auth: ClientAuthMethod::ClientSecretBasic, scope_delimiter: ' ' },
		}
	}
}
