//! Transport primitives for calls to identity providers.
//!
//! The module exposes [`ProviderHttpClient`] alongside [`ResponseMetadata`] and
//! [`ResponseMetadataSlot`] so downstream crates can plug in custom HTTP clients. The same
//! handle serves both the `oauth2` code exchange and the broker's own JSON calls (user-info,
//! introspection, discovery, JWKS) made through [`ProviderTransport`].

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		Method,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, ProviderError, TransportError},
};

/// Abstraction over HTTP transports used for every outbound provider call.
///
/// Implementations must be `Send + Sync + 'static` so a single client can be shared by the
/// broker, its verifier, and every adapter. Handles they return must own whatever state the
/// request needs so their futures stay `Send` for the lifetime of the call.
pub trait ProviderHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle tied to a [`ResponseMetadataSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds an [`AsyncHttpClient`] handle that records outcomes in `slot`.
	///
	/// Call [`ResponseMetadataSlot::take`] before submitting a request and
	/// [`ResponseMetadataSlot::store`] as soon as a response status is known.
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;

	/// Returns true when the transport error represents an elapsed request timeout.
	fn is_timeout(_error: &Self::TransportError) -> bool {
		false
	}
}

/// Captures metadata from the most recent HTTP response for downstream error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the provider, if available.
	pub status: Option<u16>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Provider endpoints must answer directly; configure any custom [`ReqwestClient`] with
/// redirects disabled and a request timeout.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client that gives up on any single provider call after `timeout`.
	pub fn with_timeout(timeout: Duration) -> Result<Self, ConfigError> {
		let timeout = std::time::Duration::try_from(timeout).map_err(|e| {
			ConfigError::InvalidValue { field: "http_timeout_secs".into(), reason: e.to_string() }
		})?;
		let client = ReqwestClient::builder()
			.timeout(timeout)
			.redirect(reqwest::redirect::Policy::none())
			.build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ProviderHttpClient for ReqwestHttpClient {
	type Handle = InstrumentedHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		InstrumentedHandle(Arc::new(InstrumentedHttpClient { client: self.0.clone(), slot }))
	}

	fn is_timeout(error: &Self::TransportError) -> bool {
		error.is_timeout()
	}
}

#[cfg(feature = "reqwest")]
struct InstrumentedHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}

/// Handle returned by [`ReqwestHttpClient`] that records the response status.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let response = client
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			client.slot.store(ResponseMetadata { status: Some(status.as_u16()) });

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// JSON GET/POST helper over a [`ProviderHttpClient`].
///
/// Any transport failure or non-2xx status is a hard failure for that call.
pub struct ProviderTransport<C>
where
	C: ?Sized + ProviderHttpClient,
{
	client: Arc<C>,
}
impl<C> ProviderTransport<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Wraps a shared HTTP client.
	pub fn new(client: impl Into<Arc<C>>) -> Self {
		Self { client: client.into() }
	}

	/// Underlying client, shared with the `oauth2` facade.
	pub fn client(&self) -> &Arc<C> {
		&self.client
	}

	/// Issues a GET with `query` appended to `url` and decodes the JSON body.
	pub async fn get_json<T>(
		&self,
		endpoint: &'static str,
		url: &Url,
		query: &[(&str, &str)],
		bearer: Option<&str>,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut url = url.clone();

		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(query);
		}

		let request = build_request(Method::GET, &url, bearer, None)?;

		self.send_json(endpoint, request).await
	}

	/// Issues a url-encoded form POST and decodes the JSON body.
	pub async fn post_form_json<T>(
		&self,
		endpoint: &'static str,
		url: &Url,
		form: &[(&str, &str)],
		bearer: Option<&str>,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let body = url::form_urlencoded::Serializer::new(String::new())
			.extend_pairs(form)
			.finish()
			.into_bytes();
		let request = build_request(Method::POST, url, bearer, Some(body))?;

		self.send_json(endpoint, request).await
	}

	async fn send_json<T>(&self, endpoint: &'static str, request: HttpRequest) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let slot = ResponseMetadataSlot::default();
		let handle = self.client.with_metadata(slot.clone());
		let response =
			handle.call(request).await.map_err(|e| map_http_client_error::<C>(endpoint, e))?;
		let status = response.status();

		if !status.is_success() {
			let status = slot.take().and_then(|meta| meta.status).unwrap_or(status.as_u16());

			return Err(ProviderError::Status { endpoint, status }.into());
		}

		decode_json(endpoint, response.body())
	}
}
impl<C> Clone for ProviderTransport<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn clone(&self) -> Self {
		Self { client: Arc::clone(&self.client) }
	}
}
impl<C> Debug for ProviderTransport<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ProviderTransport(..)")
	}
}

/// Decodes a JSON body, naming the failing field on error.
pub(crate) fn decode_json<T>(endpoint: &'static str, body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut de)
		.map_err(|source| ProviderError::Malformed { endpoint, source }.into())
}

/// Maps a transport failure reported through an [`AsyncHttpClient`] into a broker error.
pub(crate) fn map_http_client_error<C>(
	endpoint: &'static str,
	err: HttpClientError<C::TransportError>,
) -> Error
where
	C: ?Sized + ProviderHttpClient,
{
	match err {
		HttpClientError::Reqwest(inner) if C::is_timeout(&inner) =>
			TransportError::Timeout { endpoint }.into(),
		HttpClientError::Reqwest(inner) =>
			TransportError::Network { endpoint, source: inner }.into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(source) => TransportError::Io { endpoint, source }.into(),
		HttpClientError::Other(message) => TransportError::Other { endpoint, message }.into(),
		_ => TransportError::Other { endpoint, message: "unclassified client failure".into() }
			.into(),
	}
}

fn build_request(
	method: Method,
	url: &Url,
	bearer: Option<&str>,
	form: Option<Vec<u8>>,
) -> Result<HttpRequest> {
	let mut builder = oauth2::http::Request::builder()
		.method(method)
		.uri(url.as_str())
		.header(ACCEPT, "application/json");

	if let Some(token) = bearer {
		builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
	}

	let request = match form {
		Some(body) =>
			builder.header(CONTENT_TYPE, "application/x-www-form-urlencoded").body(body),
		None => builder.body(Vec::new()),
	};

	request.map_err(|e| ConfigError::from(e).into())
}
