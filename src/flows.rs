//! Broker facade exposing the login, linking, and account operations.
//!
//! Every operation runs inside a [`FlowSpan`], records attempt/success/failure counters, and
//! logs its failure before returning. Callers render errors through
//! [`Error::user_message`], which never leaks internal details.

mod account;
mod authorize;
mod login;

pub use authorize::*;

// self
use crate::{
	_prelude::*,
	account::{AccountLinker, SessionManager},
	auth::ProviderId,
	config::BrokerConfig,
	entropy::Entropy,
	error::ConfigError,
	http::{ProviderHttpClient, ProviderTransport},
	jwt::TokenVerifier,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{ProviderAdapter, ProviderDescriptor},
	store::AccountStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport stack.
pub type ReqwestBroker = Broker<ReqwestHttpClient>;

/// Coordinates provider exchanges and account linking for a fixed provider set.
///
/// The broker owns the resolved provider descriptors, the adapter (and with it the JWKS
/// cache), and the account linker. Clones share all of them.
pub struct Broker<C>
where
	C: ?Sized + ProviderHttpClient,
{
	providers: Arc<HashMap<ProviderId, ProviderDescriptor>>,
	adapter: Arc<ProviderAdapter<C>>,
	linker: AccountLinker,
}
impl<C> Broker<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Creates a broker over already resolved descriptors.
	///
	/// Fails when two descriptors share a provider id.
	pub fn new(
		descriptors: impl IntoIterator<Item = ProviderDescriptor>,
		http_client: impl Into<Arc<C>>,
		linker: AccountLinker,
	) -> Result<Self, ConfigError> {
		let mut providers = HashMap::new();

		for descriptor in descriptors {
			if let Some(previous) = providers.insert(descriptor.id.clone(), descriptor) {
				return Err(ConfigError::DuplicateProvider { provider: previous.id.to_string() });
			}
		}

		let transport = ProviderTransport::<C>::new(http_client);
		let verifier = Arc::new(TokenVerifier::new(transport.clone()));

		Ok(Self {
			providers: Arc::new(providers),
			adapter: Arc::new(ProviderAdapter::new(transport, verifier)),
			linker,
		})
	}

	/// Resolves configuration (running OIDC discovery) and builds a broker on `http_client`.
	pub async fn from_config_with_client(
		config: &BrokerConfig,
		store: Arc<dyn AccountStore>,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self> {
		let http_client = http_client.into();
		let transport = ProviderTransport::<C>::new(Arc::clone(&http_client));
		let descriptors = config.resolve(&transport).await?;
		let entropy = Entropy::from_os();
		let sessions = SessionManager::new(entropy.clone())
			.with_cap(config.session_cap)
			.with_ttl(config.session_ttl());
		let linker = AccountLinker::new(store, sessions, entropy)
			.with_max_attempts(config.max_transaction_attempts);

		#[cfg(feature = "tracing")]
		tracing::info!(providers = descriptors.len(), "broker configured");

		Ok(Self::new(descriptors, http_client, linker)?)
	}

	/// Descriptor registered under `name`.
	pub fn provider(&self, name: &str) -> Option<&ProviderDescriptor> {
		self.providers.get(name)
	}

	/// Names of every configured provider, sorted.
	pub fn provider_names(&self) -> Vec<&str> {
		let mut names = self.providers.keys().map(AsRef::<str>::as_ref).collect::<Vec<_>>();

		names.sort_unstable();

		names
	}

	/// ID-token verifier owning the JWKS cache.
	pub fn verifier(&self) -> &Arc<TokenVerifier<C>> {
		self.adapter.verifier()
	}

	/// Account linker backing the account operations.
	pub fn linker(&self) -> &AccountLinker {
		&self.linker
	}

	fn descriptor(&self, name: &str) -> Result<&ProviderDescriptor> {
		self.providers.get(name).ok_or_else(|| Error::UnknownProvider { provider: name.into() })
	}
}
#[cfg(feature = "reqwest")]
impl Broker<ReqwestHttpClient> {
	/// Builds a broker from configuration on a reqwest client bounded by the configured
	/// request timeout.
	pub async fn from_config(config: &BrokerConfig, store: Arc<dyn AccountStore>) -> Result<Self> {
		let http_client = ReqwestHttpClient::with_timeout(config.http_timeout())?;

		Self::from_config_with_client(config, store, http_client).await
	}
}
impl<C> Clone for Broker<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			providers: Arc::clone(&self.providers),
			adapter: Arc::clone(&self.adapter),
			linker: self.linker.clone(),
		}
	}
}
impl<C> Debug for Broker<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker")
			.field("providers", &self.provider_names())
			.field("linker", &self.linker)
			.finish()
	}
}

/// Runs `fut` inside a flow span and records its outcome.
async fn observe<T, Fut>(kind: FlowKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(kind, stage);

	obs::record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
		Err(e) => {
			obs::record_flow_outcome(kind, FlowOutcome::Failure);
			obs::log_failure(kind, e);
		},
	}

	result
}
