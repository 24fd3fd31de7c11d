#![cfg(feature = "reqwest")]

mod common;

// crates.io
use httpmock::prelude::*;
use identity_broker::{
	account::Account,
	auth::SessionToken,
	entropy::Entropy,
	error::Error,
	store::{AccountStore, MemoryStore, Tables},
};
use serde_json::json;
// self
use common::*;

const ADDR: &str = "203.0.113.7";

async fn setup(seed: u64) -> (MockServer, MemoryStore, TestBroker) {
	let server = MockServer::start_async().await;
	let store = MemoryStore::default();
	let broker = broker_with(
		vec![oidc_descriptor(&server, "google"), oidc_descriptor(&server, "github")],
		store.clone(),
		Entropy::seeded(seed),
	);

	mount_jwks(&server, "google").await;
	mount_jwks(&server, "github").await;

	(server, store, broker)
}

async fn disable(store: &MemoryStore, account: &Account) {
	let mut tx = store.begin().await.expect("Transaction should open.");

	assert!(tx.set_account_disabled(&account.id, true).await.expect("Update should succeed."));

	tx.commit().await.expect("Commit should succeed.");
}

#[tokio::test]
async fn first_login_registers_and_second_login_reuses_the_account() {
	let (server, store, broker) = setup(1).await;

	mount_oidc_code(&server, "google", "code-1", "sub123", "Alice", Some("refresh-1")).await;
	mount_oidc_code(&server, "google", "code-2", "sub123", "Alice", None).await;

	let first = broker.login("google", "code-1", ADDR).await.expect("First login should succeed.");
	let tables = store.snapshot().await;

	assert!(first.created);
	assert_eq!(tables.accounts.len(), 1);
	assert_eq!(tables.accounts[0].name, "Alice");
	assert_eq!(tables.accounts[0].email.as_deref(), Some("sub123@example.com"));
	assert_eq!(tables.identities.len(), 1);
	assert_eq!(tables.sessions.len(), 1);
	assert_ne!(tables.sessions[0].token_digest, first.session.expose());

	let second =
		broker.login("google", "code-2", ADDR).await.expect("Second login should succeed.");
	let tables = store.snapshot().await;

	assert!(!second.created);
	assert_eq!(second.account_id, first.account_id);
	assert_ne!(second.session, first.session);
	assert_eq!(tables.identities.len(), 1);
	assert_eq!(tables.identities[0].access_token.expose(), "access-code-2");
	assert_eq!(tables.identities[0].refresh_token.as_ref().map(|t| t.expose()), Some("refresh-1"));
	assert_eq!(tables.sessions.len(), 2);
	assert_eq!(tables.login_log.len(), 2);
	assert!(tables.login_log.iter().all(|entry| entry.success && entry.remote_addr == ADDR));
}

#[tokio::test]
async fn first_login_without_refresh_token_leaves_no_trace() {
	let (server, store, broker) = setup(2).await;

	mount_oidc_code(&server, "google", "code-1", "sub123", "Alice", None).await;

	let err = broker.login("google", "code-1", ADDR).await.expect_err("Login must fail.");

	assert!(matches!(err, Error::MissingRefreshToken));
	assert_eq!(err.user_message(), "Internal server error");
	assert_eq!(store.snapshot().await, Tables::default());
}

#[tokio::test]
async fn unknown_providers_are_rejected_before_any_exchange() {
	let (_server, _store, broker) = setup(3).await;
	let err = broker.login("myspace", "code", ADDR).await.expect_err("Login must fail.");

	assert!(matches!(err, Error::UnknownProvider { .. }));
	assert_eq!(err.user_message(), "Invalid SSO provider");
}

#[tokio::test]
async fn disabled_accounts_never_receive_a_session() {
	let (server, store, broker) = setup(4).await;

	mount_oidc_code(&server, "google", "code-1", "sub123", "Alice", Some("refresh-1")).await;
	mount_oidc_code(&server, "google", "code-2", "sub123", "Alice", Some("refresh-2")).await;

	let first = broker.login("google", "code-1", ADDR).await.expect("First login should succeed.");

	disable(&store, &store.snapshot().await.accounts[0]).await;

	let err = broker.login("google", "code-2", ADDR).await.expect_err("Disabled login must fail.");
	let tables = store.snapshot().await;

	assert!(matches!(err, Error::AccountDisabled));
	assert_eq!(err.user_message(), "Account disabled");
	assert_eq!(tables.sessions.len(), 1);
	assert_eq!(tables.login_log.len(), 2);
	assert!(!tables.login_log[1].success);
	assert!(matches!(broker.info(&first.session).await, Err(Error::InvalidSession)));
}

#[tokio::test]
async fn sixth_session_evicts_the_oldest() {
	let (server, store, broker) = setup(5).await;
	let mut sessions = Vec::new();

	for idx in 0..6 {
		let code = format!("code-{idx}");

		mount_oidc_code(&server, "google", &code, "sub123", "Alice", Some("refresh")).await;
		sessions.push(
			broker.login("google", &code, ADDR).await.expect("Login should succeed.").session,
		);
	}

	assert_eq!(store.snapshot().await.sessions.len(), 5);
	assert!(matches!(broker.info(&sessions[0]).await, Err(Error::InvalidSession)));

	for session in &sessions[1..] {
		broker.info(session).await.expect("Surviving sessions should stay valid.");
	}
}

#[tokio::test]
async fn colliding_account_ids_are_regenerated() {
	let server = MockServer::start_async().await;
	let squatted = Entropy::seeded(6).account_id().expect("Predicted id should be valid.");
	let store = MemoryStore::with_tables(Tables {
		accounts: vec![Account::new(squatted.clone(), Some("Squatter".into()), None)],
		..Tables::default()
	});
	let broker =
		broker_with(vec![oidc_descriptor(&server, "google")], store.clone(), Entropy::seeded(6));

	mount_jwks(&server, "google").await;
	mount_oidc_code(&server, "google", "code-1", "sub123", "Alice", Some("refresh-1")).await;

	let outcome = broker.login("google", "code-1", ADDR).await.expect("Login should succeed.");

	assert!(outcome.created);
	assert_ne!(outcome.account_id, squatted);
	assert_eq!(store.snapshot().await.accounts.len(), 2);
}

#[tokio::test]
async fn providers_can_be_linked_and_unlinked_but_never_the_last() {
	let (server, store, broker) = setup(7).await;

	mount_oidc_code(&server, "google", "code-1", "sub123", "Alice", Some("refresh-1")).await;
	mount_oidc_code(&server, "github", "gh-1", "octo", "Octo", Some("gh-refresh")).await;

	let login = broker.login("google", "code-1", ADDR).await.expect("Login should succeed.");
	let linked = broker
		.add_provider("github", "gh-1", &login.session, ADDR)
		.await
		.expect("Linking should succeed.");

	assert_eq!(linked, login.account_id);

	let info = broker.info(&login.session).await.expect("Info should succeed.");
	let providers = info.linked_providers.iter().map(|p| p.to_string()).collect::<Vec<_>>();

	assert_eq!(info.name, "Alice");
	assert_eq!(providers, ["github", "google"]);

	broker.remove_provider("google", &login.session).await.expect("Unlink should succeed.");

	assert_eq!(store.snapshot().await.identities.len(), 1);

	let err = broker
		.remove_provider("github", &login.session)
		.await
		.expect_err("Removing the last provider must fail.");

	assert_eq!(err.user_message(), "can't remove last identity provider");
	assert_eq!(store.snapshot().await.identities.len(), 1);

	let err = broker
		.remove_provider("google", &login.session)
		.await
		.expect_err("Unlinked providers cannot be removed again.");

	assert!(matches!(err, Error::ProviderNotLinked { .. }));
}

#[tokio::test]
async fn linking_requires_a_valid_session_before_exchanging() {
	let (server, _store, broker) = setup(8).await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/github/token");
			then.status(500);
		})
		.await;
	let err = broker
		.add_provider("github", "gh-1", &SessionToken::new("bogus"), ADDR)
		.await
		.expect_err("Linking without a session must fail.");

	assert!(matches!(err, Error::InvalidSession));

	token.assert_hits_async(0).await;
}

#[tokio::test]
async fn disabled_accounts_cannot_link_providers() {
	let (server, store, broker) = setup(12).await;

	mount_oidc_code(&server, "google", "code-1", "sub123", "Alice", Some("refresh-1")).await;

	let login = broker.login("google", "code-1", ADDR).await.expect("Login should succeed.");

	disable(&store, &store.snapshot().await.accounts[0]).await;

	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/github/token");
			then.status(500);
		})
		.await;
	let err = broker
		.add_provider("github", "gh-1", &login.session, ADDR)
		.await
		.expect_err("Disabled accounts must not link providers.");
	let tables = store.snapshot().await;

	assert!(matches!(err, Error::AccountDisabled));
	assert_eq!(err.user_message(), "Account disabled");
	assert_eq!(tables.identities.len(), 1);
	assert_eq!(tables.sessions.len(), 1);

	token.assert_hits_async(0).await;
}

#[tokio::test]
async fn identities_cannot_move_between_accounts() {
	let (server, _store, broker) = setup(9).await;

	mount_oidc_code(&server, "google", "code-1", "sub123", "Alice", Some("refresh-1")).await;
	mount_oidc_code(&server, "github", "gh-1", "octo", "Octo", Some("gh-refresh")).await;
	mount_oidc_code(&server, "google", "code-2", "sub123", "Alice", Some("refresh-2")).await;

	broker.login("google", "code-1", ADDR).await.expect("Alice should log in.");

	let octo = broker.login("github", "gh-1", ADDR).await.expect("Octo should log in.");
	let err = broker
		.add_provider("google", "code-2", &octo.session, ADDR)
		.await
		.expect_err("Linking a foreign identity must fail.");

	assert!(matches!(err, Error::IdentityInUse { .. }));
	assert!(err.is_user_facing());
}

#[tokio::test]
async fn names_can_be_updated_and_looked_up() {
	let (server, _store, broker) = setup(10).await;

	mount_oidc_code(&server, "google", "code-1", "sub123", "Alice", Some("refresh-1")).await;

	let login = broker.login("google", "code-1", ADDR).await.expect("Login should succeed.");
	let err = broker.update_name(&login.session, "   ").await.expect_err("Blank names must fail.");

	assert_eq!(err.user_message(), "Name cannot be empty");

	broker.update_name(&login.session, "Alicia").await.expect("Rename should succeed.");

	assert_eq!(
		broker.display_name(&login.account_id).await.expect("Lookup should succeed."),
		"Alicia"
	);

	let unknown = Entropy::seeded(99).account_id().expect("Id should be valid.");

	assert!(matches!(broker.display_name(&unknown).await, Err(Error::UnknownAccount)));
}

#[tokio::test]
async fn failed_exchanges_are_reported_as_internal() {
	let (server, store, broker) = setup(11).await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/google/token");
			then.status(400).json_body(json!({ "error": "invalid_grant" }));
		})
		.await;

	let err = broker.login("google", "reused", ADDR).await.expect_err("Login must fail.");

	assert!(!err.is_user_facing());
	assert_eq!(err.user_message(), "Internal server error");
	assert!(store.snapshot().await.accounts.is_empty());
}
