//! High-level token client: silent acquisition, authorization-code helpers, logout.

pub mod authorize;
pub mod options;
pub mod silent;

mod metrics;

pub use authorize::*;
pub use metrics::SilentMetrics;
pub use options::*;

// self
use crate::{
	_prelude::*,
	cache::{CacheBackend, TokenStore},
	config::ClientConfig,
	exchange::{ExchangeClient, TokenTransport},
	query::{QueryValue, create_query_string},
};
#[cfg(feature = "reqwest")]
use crate::exchange::ReqwestTransport;

/// Singleflight registry key: one guard per (audience, normalized scope) pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct FlightKey {
	audience: String,
	scope: String,
}

/// Coordinates silent token acquisition against a single issuer.
///
/// The client owns the configuration, token store, and exchange client so flow
/// implementations can focus on the decision pipeline (cache read, refresh exchange,
/// write-back). Requests for distinct (audience, scope) pairs never block each other.
pub struct Client {
	/// Immutable client configuration.
	pub config: ClientConfig,
	/// Typed token store over the injected backend.
	pub store: TokenStore,
	/// Token endpoint client.
	pub exchange: ExchangeClient,
	/// Shared metrics recorder for silent flow outcomes.
	pub silent_metrics: Arc<SilentMetrics>,
	flight_guards: Mutex<HashMap<FlightKey, Arc<AsyncMutex<()>>>>,
}
impl Client {
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		backend: Arc<dyn CacheBackend>,
		transport: Arc<dyn TokenTransport>,
	) -> Self {
		let exchange =
			ExchangeClient::new(transport, config.token_endpoint.clone(), &config.client_id);

		Self {
			config,
			store: TokenStore::new(backend),
			exchange,
			silent_metrics: Default::default(),
			flight_guards: Default::default(),
		}
	}

	/// Builds the end-session URL, optionally carrying a post-logout return target.
	pub fn logout_url(&self, return_to: Option<&str>) -> Url {
		let mut url = self.config.logout_endpoint.clone();
		let query =
			create_query_string([("return_to", return_to.map(QueryValue::from))]);

		if query.is_empty() {
			url.set_query(None);
		} else {
			url.set_query(Some(&query));
		}

		url
	}

	/// Returns (and creates on demand) the singleflight guard for a flight key.
	pub(crate) fn flight_guard(&self, audience: &str, scope: &str) -> Arc<AsyncMutex<()>> {
		let key = FlightKey { audience: audience.to_owned(), scope: scope.to_owned() };
		let mut guards = self.flight_guards.lock();

		guards.entry(key).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
#[cfg(feature = "reqwest")]
impl Client {
	/// Creates a new client over the crate's default reqwest transport.
	pub fn new(config: ClientConfig, backend: Arc<dyn CacheBackend>) -> Self {
		Self::with_transport(config, backend, Arc::new(ReqwestTransport::default()))
	}
}
impl Debug for Client {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client").field("config", &self.config).finish_non_exhaustive()
	}
}
