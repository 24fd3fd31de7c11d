//! Session-authenticated account operations.

// self
use crate::{
	_prelude::*,
	account::AccountInfo,
	auth::{AccountId, SessionToken},
	flows::{self, Broker},
	http::ProviderHttpClient,
	obs::FlowKind,
};

impl<C> Broker<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Unlinks `provider` from the account owning `session`.
	///
	/// The last linked provider can never be removed.
	pub async fn remove_provider(&self, provider: &str, session: &SessionToken) -> Result<()> {
		flows::observe(FlowKind::RemoveProvider, "remove_provider", async move {
			let descriptor = self.descriptor(provider)?;

			self.linker.unlink_provider(&descriptor.id, session).await
		})
		.await
	}

	/// Name, email, and linked providers of the account owning `session`.
	pub async fn info(&self, session: &SessionToken) -> Result<AccountInfo> {
		flows::observe(FlowKind::Info, "info", self.linker.info(session)).await
	}

	/// Renames the account owning `session`.
	///
	/// Whitespace-only names fail with [`Error::EmptyName`]; other names are stored unchanged.
	pub async fn update_name(&self, session: &SessionToken, name: &str) -> Result<()> {
		flows::observe(FlowKind::UpdateName, "update_name", self.linker.update_name(session, name))
			.await
	}

	/// Public display name of an account.
	pub async fn display_name(&self, account: &AccountId) -> Result<String> {
		flows::observe(FlowKind::DisplayName, "display_name", self.linker.display_name(account))
			.await
	}
}
