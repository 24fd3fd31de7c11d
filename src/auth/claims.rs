//! Normalized identity claims shared by every provider variant.

// crates.io
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, auth::SubjectId, error::ProviderError};

/// Identity attributes extracted from a provider response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
	/// Provider-scoped subject identifier.
	pub subject: SubjectId,
	/// Display name, when the provider supplied a non-empty one.
	pub name: Option<String>,
	/// Email address, when the provider supplied one.
	pub email: Option<String>,
	/// Expiry as Unix epoch seconds.
	pub expires_at: i64,
}
impl IdentityClaims {
	/// Builds claims, discarding blank optional attributes.
	pub fn new(
		subject: SubjectId,
		name: Option<String>,
		email: Option<String>,
		expires_at: i64,
	) -> Self {
		Self { subject, name: non_blank(name), email: non_blank(email), expires_at }
	}

	/// Normalizes a verified ID-token claim map (`sub`, `name`, `email`, `exp`).
	pub fn from_claim_map(claims: &Map<String, Value>) -> Result<Self, ProviderError> {
		let subject = claims
			.get("sub")
			.and_then(Value::as_str)
			.and_then(|raw| SubjectId::new(raw).ok())
			.ok_or(ProviderError::MissingClaim { claim: "sub" })?;
		let expires_at = claims
			.get("exp")
			.and_then(|value| value.as_i64().or_else(|| value.as_f64().map(|f| f as i64)))
			.ok_or(ProviderError::MissingClaim { claim: "exp" })?;
		let text = |key: &str| claims.get(key).and_then(Value::as_str).map(str::to_owned);

		Ok(Self::new(subject, text("name"), text("email"), expires_at))
	}

	/// Expiry as an [`OffsetDateTime`], clamped to the representable range.
	pub fn expires_at_datetime(&self) -> OffsetDateTime {
		OffsetDateTime::from_unix_timestamp(self.expires_at).unwrap_or(if self.expires_at < 0 {
			OffsetDateTime::UNIX_EPOCH
		} else {
			time::PrimitiveDateTime::MAX.assume_utc()
		})
	}
}

fn non_blank(value: Option<String>) -> Option<String> {
	value.filter(|v| !v.trim().is_empty())
}
