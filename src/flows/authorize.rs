//! Authorize URL construction for the provider redirect.

// self
use crate::{
	_prelude::*,
	auth::ProviderId,
	flows::{self, Broker},
	http::ProviderHttpClient,
	obs::FlowKind,
};

/// Redirect target plus the `state` nonce the callback must echo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationRequest {
	/// Provider the request targets.
	pub provider: ProviderId,
	/// Fully-formed authorize URL to send the end user to.
	pub url: Url,
	/// Opaque state value that must round-trip via the redirect.
	pub state: String,
}
impl AuthorizationRequest {
	/// Validates the `state` returned on the authorization redirect.
	pub fn validate_state(&self, returned_state: &str) -> Result<()> {
		if returned_state == self.state { Ok(()) } else { Err(Error::StateMismatch) }
	}
}

impl<C> Broker<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Builds the authorize URL for `provider` with a fresh random `state`.
	pub async fn start_authorization(&self, provider: &str) -> Result<AuthorizationRequest> {
		flows::observe(FlowKind::StartAuthorization, "start_authorization", async move {
			let descriptor = self.descriptor(provider)?;
			let state = self.linker.entropy().state();
			let url = self.adapter.authorize_url(descriptor, state.clone())?;

			Ok(AuthorizationRequest { provider: descriptor.id.clone(), url, state })
		})
		.await
	}
}
