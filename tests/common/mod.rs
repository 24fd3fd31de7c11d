//! Shared fixtures for the integration tests: RSA signing keys, HTTPS mock providers, and
//! broker builders wired to an in-memory store.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use identity_broker::{
	account::{AccountLinker, SessionManager},
	auth::ProviderId,
	entropy::Entropy,
	flows::Broker,
	http::ReqwestHttpClient,
	jsonwebtoken::{self, Algorithm, EncodingKey, Header},
	provider::{ProviderDescriptor, ProviderDescriptorBuilder, ProviderKind},
	reqwest::Client as ReqwestClient,
	store::MemoryStore,
	url::Url,
};
use serde_json::{Value, json};

pub const CLIENT_ID: &str = "client-it";
pub const CLIENT_SECRET: &str = "secret-it";
pub const SIGNING_KID: &str = "signing";
pub const ROTATED_KID: &str = "rotated";
pub const SIGNING_MODULUS: &str = include_str!("../fixtures/signing_key.n");
pub const SIGNING_PEM: &[u8] = include_bytes!("../fixtures/signing_key.pem");
pub const ROTATED_MODULUS: &str = include_str!("../fixtures/rotated_key.n");
pub const ROTATED_PEM: &[u8] = include_bytes!("../fixtures/rotated_key.pem");

/// Far-future expiry used for every minted token.
pub const FAR_EXPIRY: i64 = 4_102_444_800;

pub type TestBroker = Broker<ReqwestHttpClient>;

/// Reqwest client that trusts the self-signed certificate served by `httpmock`.
pub fn insecure_http_client() -> ReqwestHttpClient {
	let client = ReqwestClient::builder()
		.danger_accept_invalid_certs(true)
		.build()
		.expect("Insecure test client should build.");

	ReqwestHttpClient::with_client(client)
}

pub fn url(server: &MockServer, path: &str) -> Url {
	Url::parse(&server.url(path)).expect("Mock URL should parse.")
}

pub fn provider_id(name: &str) -> ProviderId {
	ProviderId::new(name).expect("Provider fixture should be valid.")
}

pub fn jwk(kid: &str, modulus: &str) -> Value {
	json!({
		"kty": "RSA",
		"kid": kid,
		"alg": "RS256",
		"use": "sig",
		"n": modulus.trim(),
		"e": "AQAB",
	})
}

/// Signs `claims` with the PEM key and stamps `kid` into the header.
pub fn mint_token(kid: &str, pem: &[u8], claims: &Value) -> String {
	let mut header = Header::new(Algorithm::RS256);

	header.kid = Some(kid.into());

	let key = EncodingKey::from_rsa_pem(pem).expect("Fixture private key should load.");

	jsonwebtoken::encode(&header, claims, &key).expect("Fixture token should sign.")
}

/// ID token for `subject` accepted by descriptors built with [`oidc_builder`].
pub fn id_token(subject: &str, name: &str) -> String {
	mint_token(
		SIGNING_KID,
		SIGNING_PEM,
		&json!({
			"sub": subject,
			"aud": CLIENT_ID,
			"exp": FAR_EXPIRY,
			"name": name,
			"email": format!("{subject}@example.com"),
		}),
	)
}

pub fn oidc_builder(server: &MockServer, name: &str) -> ProviderDescriptorBuilder {
	ProviderDescriptor::builder(provider_id(name), ProviderKind::Oidc)
		.client_id(CLIENT_ID)
		.client_secret(CLIENT_SECRET)
		.redirect_uri(Url::parse("https://app.test/callback").expect("Redirect should parse."))
		.authorization_endpoint(url(server, &format!("/{name}/authorize")))
		.token_endpoint(url(server, &format!("/{name}/token")))
		.jwks_endpoint(url(server, &format!("/{name}/jwks")))
}

pub fn oidc_descriptor(server: &MockServer, name: &str) -> ProviderDescriptor {
	oidc_builder(server, name).build().expect("OIDC descriptor should build.")
}

pub fn facebook_descriptor(server: &MockServer) -> ProviderDescriptor {
	ProviderDescriptor::builder(provider_id("facebook"), ProviderKind::Facebook)
		.client_id(CLIENT_ID)
		.client_secret(CLIENT_SECRET)
		.redirect_uri(Url::parse("https://app.test/callback").expect("Redirect should parse."))
		.token_endpoint(url(server, "/facebook/token"))
		.userinfo_endpoint(url(server, "/facebook/me"))
		.build()
		.expect("Facebook descriptor should build.")
}

pub fn fitbit_descriptor(server: &MockServer) -> ProviderDescriptor {
	ProviderDescriptor::builder(provider_id("fitbit"), ProviderKind::Fitbit)
		.client_id(CLIENT_ID)
		.client_secret(CLIENT_SECRET)
		.redirect_uri(Url::parse("https://app.test/callback").expect("Redirect should parse."))
		.token_endpoint(url(server, "/fitbit/token"))
		.userinfo_endpoint(url(server, "/fitbit/profile"))
		.introspection_endpoint(url(server, "/fitbit/introspect"))
		.build()
		.expect("Fitbit descriptor should build.")
}

/// Mounts a JWKS endpoint publishing the signing key.
pub async fn mount_jwks(server: &MockServer, name: &str) {
	server
		.mock_async(|when, then| {
			when.method(GET).path(format!("/{name}/jwks"));
			then.status(200).json_body(json!({ "keys": [jwk(SIGNING_KID, SIGNING_MODULUS)] }));
		})
		.await;
}

/// Mounts a token endpoint answering `code` with an ID token for `subject`.
pub async fn mount_oidc_code(
	server: &MockServer,
	name: &str,
	code: &str,
	subject: &str,
	display_name: &str,
	refresh_token: Option<&str>,
) {
	let mut body = json!({
		"access_token": format!("access-{code}"),
		"token_type": "bearer",
		"expires_in": 3600,
		"id_token": id_token(subject, display_name),
	});

	if let Some(refresh) = refresh_token {
		body["refresh_token"] = json!(refresh);
	}

	server
		.mock_async(|when, then| {
			when.method(POST)
				.path(format!("/{name}/token"))
				.form_urlencoded_tuple("code", code);
			then.status(200).json_body(body);
		})
		.await;
}

pub fn broker_with(
	descriptors: Vec<ProviderDescriptor>,
	store: MemoryStore,
	entropy: Entropy,
) -> TestBroker {
	let linker = AccountLinker::new(
		Arc::new(store),
		SessionManager::new(entropy.clone()),
		entropy,
	);

	Broker::new(descriptors, insecure_http_client(), linker).expect("Broker should build.")
}
