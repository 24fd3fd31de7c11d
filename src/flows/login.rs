//! Provider login and provider linking.

// self
use crate::{
	_prelude::*,
	account::LoginOutcome,
	auth::{AccountId, SessionToken},
	flows::{self, Broker},
	http::ProviderHttpClient,
	obs::FlowKind,
};

impl<C> Broker<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Exchanges `code` with `provider` and signs the identity in, registering a new account
	/// on first sight.
	///
	/// Returns a fresh session token; the login is recorded under `remote_addr`.
	pub async fn login(
		&self,
		provider: &str,
		code: &str,
		remote_addr: &str,
	) -> Result<LoginOutcome> {
		flows::observe(FlowKind::Login, "login", async move {
			let descriptor = self.descriptor(provider)?;
			let grant = self.adapter.exchange(descriptor, code).await?;

			self.linker.login_or_register(&descriptor.id, &grant, remote_addr).await
		})
		.await
	}

	/// Links the identity behind `code` to the account owning `session`.
	///
	/// The session is validated before any provider call so tokens are never exchanged for a
	/// caller who could not store them.
	pub async fn add_provider(
		&self,
		provider: &str,
		code: &str,
		session: &SessionToken,
		remote_addr: &str,
	) -> Result<AccountId> {
		flows::observe(FlowKind::AddProvider, "add_provider", async move {
			let descriptor = self.descriptor(provider)?;

			self.linker.authenticate(session).await?;

			let grant = self.adapter.exchange(descriptor, code).await?;

			self.linker.link_provider(&descriptor.id, &grant, session, remote_addr).await
		})
		.await
	}
}
