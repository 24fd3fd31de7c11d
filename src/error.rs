//! Broker-level error types shared across flows, providers, and stores.
//!
//! Every [`Error`] belongs to one of two classes. User-facing errors describe a problem the
//! caller can act on (bad session, unknown provider, disabled account) and render their own
//! message. Internal errors carry transport, provider, storage, or invariant details that are
//! logged in full but only ever shown to the caller as [`INTERNAL_ERROR_MESSAGE`].

// self
use crate::{_prelude::*, jwt::TokenError, store::StoreError};

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Generic message rendered for every internal error.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Session token is unknown, expired, or evicted.
	#[error("Invalid session")]
	InvalidSession,
	/// No provider is configured under the requested name.
	#[error("Invalid SSO provider")]
	UnknownProvider {
		/// Requested provider name.
		provider: String,
	},
	/// Account has been disabled by an operator.
	#[error("Account disabled")]
	AccountDisabled,
	/// Display names cannot be empty.
	#[error("Name cannot be empty")]
	EmptyName,
	/// Removing the provider would leave the account without any identity.
	#[error("can't remove last identity provider")]
	LastProvider,
	/// Account has no identity for the requested provider.
	#[error("Provider is not linked to this account")]
	ProviderNotLinked {
		/// Requested provider name.
		provider: String,
	},
	/// The external identity already belongs to another account.
	#[error("This identity is already linked to another account")]
	IdentityInUse {
		/// Provider that issued the identity.
		provider: String,
	},
	/// The account already links a different identity from this provider.
	#[error("Provider is already linked to this account")]
	ProviderAlreadyLinked {
		/// Provider that issued the identity.
		provider: String,
	},
	/// No account exists for the requested identifier.
	#[error("No user with this ID")]
	UnknownAccount,
	/// Authorization redirect returned a `state` that was never issued.
	#[error("Authorization state mismatch")]
	StateMismatch,

	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Provider returned an error object or a response the broker cannot use.
	#[error(transparent)]
	Provider(#[from] ProviderError),
	/// ID token failed verification.
	#[error("Invalid token: {0}")]
	InvalidToken(#[from] TokenError),
	/// First-time identity link attempted without a refresh token.
	#[error("Cannot create provider session without a refresh token.")]
	MissingRefreshToken,
	/// Persisted state violates a uniqueness guarantee; indicates data corruption.
	#[error("Invariant violated: {message}.")]
	Invariant {
		/// Description of the violated invariant.
		message: String,
	},
}
impl Error {
	/// Builds an [`Error::Invariant`] from any displayable message.
	pub fn invariant(message: impl Into<String>) -> Self {
		Self::Invariant { message: message.into() }
	}

	/// Returns true when the error may be shown to the end user verbatim.
	pub fn is_user_facing(&self) -> bool {
		matches!(
			self,
			Error::InvalidSession
				| Error::UnknownProvider { .. }
				| Error::AccountDisabled
				| Error::EmptyName
				| Error::LastProvider
				| Error::ProviderNotLinked { .. }
				| Error::IdentityInUse { .. }
				| Error::ProviderAlreadyLinked { .. }
				| Error::UnknownAccount
				| Error::StateMismatch
		)
	}

	/// Message safe to return across the broker boundary.
	pub fn user_message(&self) -> String {
		if self.is_user_facing() { self.to_string() } else { INTERNAL_ERROR_MESSAGE.into() }
	}

	/// Returns true when the failure is a storage uniqueness conflict.
	pub fn is_conflict(&self) -> bool {
		matches!(self, Error::Storage(StoreError::Conflict { .. }))
	}
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Provider descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::provider::ProviderDescriptorError),
	/// Configuration file could not be read.
	#[error("Failed to read configuration from {path}.")]
	Read {
		/// Path of the configuration file.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Configuration JSON could not be parsed.
	#[error("Configuration is malformed.")]
	Parse {
		/// Structured parsing failure naming the offending field.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Configuration value is present but unusable.
	#[error("Configuration value `{field}` is invalid: {reason}.")]
	InvalidValue {
		/// Offending field.
		field: String,
		/// Why the value was rejected.
		reason: String,
	},
	/// Two providers share the same name.
	#[error("Provider `{provider}` is configured more than once.")]
	DuplicateProvider {
		/// Provider name.
		provider: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {endpoint} endpoint.")]
	Network {
		/// Endpoint label.
		endpoint: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request exceeded the configured timeout.
	#[error("Request to the {endpoint} endpoint timed out.")]
	Timeout {
		/// Endpoint label.
		endpoint: &'static str,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the {endpoint} endpoint.")]
	Io {
		/// Endpoint label.
		endpoint: &'static str,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// HTTP client failed without a structured cause.
	#[error("HTTP client error occurred while calling the {endpoint} endpoint: {message}.")]
	Other {
		/// Endpoint label.
		endpoint: &'static str,
		/// Client-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(endpoint: &'static str, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { endpoint, source: Box::new(src) }
	}
}

/// Provider responses the broker refuses to accept.
#[derive(Debug, ThisError)]
pub enum ProviderError {
	/// Endpoint answered with a non-success HTTP status.
	#[error("The {endpoint} endpoint returned HTTP {status}.")]
	Status {
		/// Endpoint label.
		endpoint: &'static str,
		/// HTTP status code.
		status: u16,
	},
	/// Provider returned an explicit error object.
	#[error("The {endpoint} endpoint returned an error: {message}.")]
	Rejected {
		/// Endpoint label.
		endpoint: &'static str,
		/// Provider-supplied error summary; never shown to end users.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Response body could not be decoded.
	#[error("The {endpoint} endpoint returned malformed JSON.")]
	Malformed {
		/// Endpoint label.
		endpoint: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Response was well-formed but unusable.
	#[error("The {endpoint} endpoint returned an unexpected response: {message}.")]
	Unexpected {
		/// Endpoint label.
		endpoint: &'static str,
		/// Description of the problem.
		message: String,
	},
	/// A claim required by the broker is missing or empty.
	#[error("Provider response is missing the `{claim}` claim.")]
	MissingClaim {
		/// Claim name.
		claim: &'static str,
	},
	/// Token introspection reported the access token as inactive.
	#[error("Provider reported the access token as inactive.")]
	InactiveToken,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn user_facing_errors_render_their_own_message() {
		assert_eq!(Error::LastProvider.user_message(), "can't remove last identity provider");
		assert_eq!(Error::AccountDisabled.user_message(), "Account disabled");
		assert!(Error::InvalidSession.is_user_facing());
	}

	#[test]
	fn internal_errors_hide_details() {
		let err: Error = ProviderError::Rejected {
			endpoint: "token",
			message: "invalid_grant: code reused by client 1234".into(),
			status: Some(400),
		}
		.into();

		assert!(!err.is_user_facing());
		assert_eq!(err.user_message(), INTERNAL_ERROR_MESSAGE);
		assert!(err.to_string().contains("code reused"));
		assert_eq!(Error::invariant("two rows").user_message(), INTERNAL_ERROR_MESSAGE);
		assert_eq!(Error::MissingRefreshToken.user_message(), INTERNAL_ERROR_MESSAGE);
	}

	#[test]
	fn store_conflicts_are_detected() {
		let err: Error = StoreError::Conflict { message: "duplicate".into() }.into();

		assert!(err.is_conflict());
		assert!(!Error::InvalidSession.is_conflict());
	}
}
