// crates.io
use serde_json::Value;
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
struct Profile {
	#[serde(default)]
	user: ProfileUser,
	#[serde(default)]
	errors: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ProfileUser {
	#[serde(default, rename = "displayName")]
	display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Introspection {
	#[serde(default)]
	active: Value,
	#[serde(default, rename = "userId")]
	user_id: Option<IntrospectedUser>,
	/// Milliseconds since the epoch.
	#[serde(default)]
	exp: i64,
}

#[derive(Debug, Deserialize)]
struct IntrospectedUser {
	#[serde(default)]
	id: String,
}

/// Reads the display name from the profile and subject plus expiry from introspection.
///
/// Both follow-up calls authenticate with the freshly issued access token.
pub(super) async fn claims<C>(
	transport: &ProviderTransport<C>,
	descriptor: &ProviderDescriptor,
	exchange: &CodeExchange,
) -> Result<IdentityClaims>
where
	C: ?Sized + ProviderHttpClient,
{
	let access = exchange.access_token.expose();
	let profile_url = descriptor.endpoints.userinfo_url().map_err(ConfigError::from)?;
	let introspection_url = descriptor.endpoints.introspection_url().map_err(ConfigError::from)?;
	// Bearer with the user's access token, not the client's Basic credentials; the client
	// secret only ever goes to the token endpoint.
	let profile: Profile = transport.get_json("userinfo", profile_url, &[], Some(access)).await?;
	let introspection: Introspection = transport
		.post_form_json("introspection", introspection_url, &[("token", access)], Some(access))
		.await?;

	normalize(profile, introspection)
}

fn normalize(profile: Profile, introspection: Introspection) -> Result<IdentityClaims> {
	if !profile.errors.is_empty() {
		return Err(ProviderError::Rejected {
			endpoint: "userinfo",
			message: Value::Array(profile.errors).to_string(),
			status: None,
		}
		.into());
	}
	if !is_active(&introspection.active) {
		return Err(ProviderError::InactiveToken.into());
	}

	let subject = introspection
		.user_id
		.and_then(|user| SubjectId::new(user.id).ok())
		.ok_or(ProviderError::MissingClaim { claim: "sub" })?;

	if introspection.exp <= 0 {
		return Err(ProviderError::MissingClaim { claim: "exp" }.into());
	}

	Ok(IdentityClaims::new(subject, profile.user.display_name, None, introspection.exp / 1_000))
}

fn is_active(flag: &Value) -> bool {
	match flag {
		Value::Bool(active) => *active,
		Value::Number(number) => number.as_i64() == Some(1),
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn profile() -> Profile {
		serde_json::from_str(r#"{"user":{"displayName":"Carol"}}"#)
			.expect("Profile fixture should decode.")
	}

	fn introspection(body: &str) -> Introspection {
		serde_json::from_str(body).expect("Introspection fixture should decode.")
	}

	#[test]
	fn introspection_supplies_subject_and_expiry_in_seconds() {
		let claims = normalize(
			profile(),
			introspection(r#"{"active":1,"userId":{"id":"ABC12"},"exp":1714570000123}"#),
		)
		.expect("Active token should normalize.");

		assert_eq!(&*claims.subject, "ABC12");
		assert_eq!(claims.name.as_deref(), Some("Carol"));
		assert_eq!(claims.expires_at, 1_714_570_000);
	}

	#[test]
	fn inactive_tokens_fail_closed() {
		for body in [
			r#"{"active":0,"userId":{"id":"ABC12"},"exp":1714570000123}"#,
			r#"{"active":false,"userId":{"id":"ABC12"},"exp":1714570000123}"#,
			r#"{"userId":{"id":"ABC12"},"exp":1714570000123}"#,
		] {
			let err = normalize(profile(), introspection(body)).expect_err("Inactive must fail.");

			assert!(matches!(err, Error::Provider(ProviderError::InactiveToken)));
		}

		assert!(
			normalize(profile(), introspection(r#"{"active":true,"userId":{"id":"A"},"exp":5000}"#))
				.is_ok()
		);
	}
}
