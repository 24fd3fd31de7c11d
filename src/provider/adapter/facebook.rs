// self
use crate::{
	_prelude::*,
	auth::{IdentityClaims, SubjectId},
	error::{ConfigError, ProviderError},
	http::{ProviderHttpClient, ProviderTransport},
	oauth::CodeExchange,
	provider::ProviderDescriptor,
};

#[derive(Debug, Deserialize)]
struct GraphUser {
	#[serde(default)]
	id: String,
	#[serde(default)]
	name: Option<String>,
	#[serde(default)]
	error: Option<GraphError>,
}

#[derive(Debug, Deserialize)]
struct GraphError {
	#[serde(default)]
	message: String,
	#[serde(default, rename = "type")]
	kind: String,
	#[serde(default)]
	code: i64,
}

/// Reads `id` and `name` from the Graph user-info endpoint; expiry is now plus `expires_in`.
pub(super) async fn claims<C>(
	transport: &ProviderTransport<C>,
	descriptor: &ProviderDescriptor,
	exchange: &CodeExchange,
) -> Result<IdentityClaims>
where
	C: ?Sized + ProviderHttpClient,
{
	let userinfo = descriptor.endpoints.userinfo_url().map_err(ConfigError::from)?;
	let user: GraphUser = transport
		.get_json(
			"userinfo",
			userinfo,
			&[("access_token", exchange.access_token.expose()), ("fields", "id,name")],
			None,
		)
		.await?;

	normalize(user, exchange, OffsetDateTime::now_utc())
}

fn normalize(
	user: GraphUser,
	exchange: &CodeExchange,
	now: OffsetDateTime,
) -> Result<IdentityClaims> {
	if let Some(error) = user.error {
		return Err(ProviderError::Rejected {
			endpoint: "userinfo",
			message: format!("{} ({} {})", error.message, error.kind, error.code),
			status: None,
		}
		.into());
	}

	let subject =
		SubjectId::new(&user.id).map_err(|_| ProviderError::MissingClaim { claim: "sub" })?;
	let lifetime = exchange.expires_in.ok_or(ProviderError::MissingClaim { claim: "expires_in" })?;

	Ok(IdentityClaims::new(subject, user.name, None, (now + lifetime).unix_timestamp()))
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;
	use crate::auth::TokenSecret;

	fn exchange() -> CodeExchange {
		CodeExchange {
			access_token: TokenSecret::new("fb-access"),
			refresh_token: None,
			expires_in: Some(Duration::seconds(5_000)),
			id_token: None,
		}
	}

	fn user(body: &str) -> GraphUser {
		serde_json::from_str(body).expect("Graph fixture should decode.")
	}

	#[test]
	fn graph_user_becomes_claims() {
		let now = datetime!(2024-05-01 12:00 UTC);
		let claims = normalize(user(r#"{"id":"10001","name":"Bob"}"#), &exchange(), now)
			.expect("Graph user should normalize.");

		assert_eq!(&*claims.subject, "10001");
		assert_eq!(claims.name.as_deref(), Some("Bob"));
		assert_eq!(claims.expires_at, now.unix_timestamp() + 5_000);
	}

	#[test]
	fn graph_errors_and_empty_ids_fail() {
		let now = datetime!(2024-05-01 12:00 UTC);
		let err = normalize(
			user(r#"{"error":{"message":"bad token","type":"OAuthException","code":190}}"#),
			&exchange(),
			now,
		)
		.expect_err("Graph error object must fail.");

		assert!(matches!(err, Error::Provider(ProviderError::Rejected { .. })));
		assert!(!err.is_user_facing());

		let err = normalize(user(r#"{"id":"","name":"Bob"}"#), &exchange(), now)
			.expect_err("Empty id must fail.");

		assert!(matches!(err, Error::Provider(ProviderError::MissingClaim { claim: "sub" })));
	}
}
