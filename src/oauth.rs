//! Internal OAuth client facade for authorization-code exchanges.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, CsrfToken,
	EndpointNotSet, EndpointSet, ExtraTokenFields, RedirectUrl, RequestTokenError,
	StandardRevocableToken, StandardTokenResponse, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
		BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, ProviderError},
	http::{ProviderHttpClient, ResponseMetadata, ResponseMetadataSlot, map_http_client_error},
	provider::{ClientAuthMethod, ProviderDescriptor},
};

const TOKEN_ENDPOINT: &str = "token";

/// Extra token-response fields the broker reads; only OIDC providers return an ID token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenFields {
	/// Signed ID token, when the provider issues one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id_token: Option<String>,
}
impl ExtraTokenFields for IdTokenFields {}

type ExchangeTokenResponse = StandardTokenResponse<IdTokenFields, BasicTokenType>;
type ExchangeClient = Client<
	BasicErrorResponse,
	ExchangeTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;

/// Raw result of a successful code exchange, before provider-specific normalization.
#[derive(Clone, PartialEq, Eq)]
pub struct CodeExchange {
	/// Provider access token.
	pub access_token: TokenSecret,
	/// Provider refresh token, when granted.
	pub refresh_token: Option<TokenSecret>,
	/// Relative access-token lifetime reported by the provider.
	pub expires_in: Option<Duration>,
	/// Signed ID token (OIDC only).
	pub id_token: Option<String>,
}
impl Debug for CodeExchange {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CodeExchange")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_in", &self.expires_in)
			.field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// Per-provider `oauth2` client bound to a shared HTTP transport.
pub(crate) struct CodeExchangeFacade<C>
where
	C: ?Sized + ProviderHttpClient,
{
	oauth_client: ExchangeClient,
	http_client: Arc<C>,
	scope_delimiter: char,
}
impl<C> CodeExchangeFacade<C>
where
	C: ?Sized + ProviderHttpClient,
{
	pub(crate) fn from_descriptor(
		descriptor: &ProviderDescriptor,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self> {
		let auth_url = AuthUrl::new(descriptor.endpoints.authorization.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let redirect_url = RedirectUrl::new(descriptor.redirect_uri.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let mut oauth_client: ExchangeClient =
			Client::new(ClientId::new(descriptor.client_id.clone()))
				.set_client_secret(ClientSecret::new(descriptor.client_secret.expose().to_owned()))
				.set_auth_uri(auth_url)
				.set_token_uri(token_url)
				.set_redirect_uri(redirect_url);

		if matches!(descriptor.quirks.client_auth, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Ok(Self {
			oauth_client,
			http_client: http_client.into(),
			scope_delimiter: descriptor.quirks.scope_delimiter,
		})
	}

	/// Builds the provider authorize URL carrying `state`.
	pub(crate) fn authorize_url(&self, descriptor: &ProviderDescriptor, state: String) -> Url {
		let mut request = self.oauth_client.authorize_url(move || CsrfToken::new(state));

		if let Some(scope) = descriptor.scopes.join(self.scope_delimiter) {
			request = request.add_extra_param("scope", scope);
		}

		request.url().0
	}

	/// Exchanges an authorization code for provider tokens.
	pub(crate) async fn exchange_code(&self, code: &str) -> Result<CodeExchange> {
		let slot = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(slot.clone());
		let response = self
			.oauth_client
			.exchange_code(AuthorizationCode::new(code.to_owned()))
			.request_async(&handle)
			.await
			.map_err(|e| map_request_error::<C>(slot.take(), e))?;
		let expires_in = response
			.expires_in()
			.map(|lifetime| i64::try_from(lifetime.as_secs()).map(Duration::seconds))
			.transpose()
			.map_err(|_| ProviderError::Unexpected {
				endpoint: TOKEN_ENDPOINT,
				message: "expires_in is out of range".into(),
			})?;

		Ok(CodeExchange {
			access_token: TokenSecret::new(response.access_token().secret().to_owned()),
			refresh_token: response
				.refresh_token()
				.map(|token| token.secret().to_owned())
				.filter(|token| !token.is_empty())
				.map(TokenSecret::new),
			expires_in,
			id_token: response.extra_fields().id_token.clone(),
		})
	}
}

fn map_request_error<C>(
	meta: Option<ResponseMetadata>,
	err: RequestTokenError<oauth2::HttpClientError<C::TransportError>, BasicErrorResponse>,
) -> Error
where
	C: ?Sized + ProviderHttpClient,
{
	let status = meta.and_then(|meta| meta.status);

	match err {
		RequestTokenError::ServerResponse(response) => {
			let message = match response.error_description() {
				Some(description) => format!("{}: {description}", response.error().as_ref()),
				None => response.error().as_ref().to_owned(),
			};

			ProviderError::Rejected { endpoint: TOKEN_ENDPOINT, message, status }.into()
		},
		RequestTokenError::Request(e) => map_http_client_error::<C>(TOKEN_ENDPOINT, e),
		RequestTokenError::Parse(source, _body) =>
			ProviderError::Malformed { endpoint: TOKEN_ENDPOINT, source }.into(),
		RequestTokenError::Other(message) => match status {
			Some(status) if !(200..300).contains(&status) =>
				ProviderError::Status { endpoint: TOKEN_ENDPOINT, status }.into(),
			_ => ProviderError::Unexpected { endpoint: TOKEN_ENDPOINT, message }.into(),
		},
	}
}
