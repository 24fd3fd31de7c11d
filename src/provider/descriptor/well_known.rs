// self
use crate::{_prelude::*, provider::ProviderKind};

/// Facebook dialog endpoint.
pub const FACEBOOK_AUTHORIZATION_URL: &str = "https://www.facebook.com/v2.12/dialog/oauth";
/// Facebook token endpoint.
pub const FACEBOOK_TOKEN_URL: &str = "https://graph.facebook.com/v2.12/oauth/access_token";
/// Facebook Graph user-info endpoint.
pub const FACEBOOK_USERINFO_URL: &str = "https://graph.facebook.com/me";
/// Fitbit authorization endpoint.
pub const FITBIT_AUTHORIZATION_URL: &str = "https://www.fitbit.com/oauth2/authorize";
/// Fitbit token endpoint.
pub const FITBIT_TOKEN_URL: &str = "https://api.fitbit.com/oauth2/token";
/// Fitbit profile endpoint.
pub const FITBIT_PROFILE_URL: &str = "https://api.fitbit.com/1/user/-/profile.json";
/// Fitbit token introspection endpoint.
pub const FITBIT_INTROSPECTION_URL: &str = "https://api.fitbit.com/1.1/oauth2/introspect";

/// Hardcoded endpoints for a provider kind that publishes no discovery document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WellKnownEndpoints {
	/// Authorization endpoint.
	pub authorization: Url,
	/// Token endpoint.
	pub token: Url,
	/// User-info or profile endpoint.
	pub userinfo: Url,
	/// Introspection endpoint, when the provider has one.
	pub introspection: Option<Url>,
}
impl WellKnownEndpoints {
	/// Endpoints for `kind`; `None` for OIDC, which relies on discovery.
	pub fn for_kind(kind: ProviderKind) -> Option<Self> {
		match kind {
			ProviderKind::Oidc => None,
			ProviderKind::Facebook => Some(Self {
				authorization: parse(FACEBOOK_AUTHORIZATION_URL)?,
				token: parse(FACEBOOK_TOKEN_URL)?,
				userinfo: parse(FACEBOOK_USERINFO_URL)?,
				introspection: None,
			}),
			ProviderKind::Fitbit => Some(Self {
				authorization: parse(FITBIT_AUTHORIZATION_URL)?,
				token: parse(FITBIT_TOKEN_URL)?,
				userinfo: parse(FITBIT_PROFILE_URL)?,
				introspection: Some(parse(FITBIT_INTROSPECTION_URL)?),
			}),
		}
	}
}

fn parse(raw: &str) -> Option<Url> {
	Url::parse(raw).ok()
}
