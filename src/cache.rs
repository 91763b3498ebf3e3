//! Storage contracts, cache keys, the index, and built-in backends.

pub mod file;
pub mod index;
pub mod key;
pub mod memory;
pub mod store;

pub use file::FileBackend;
pub use index::CacheIndex;
pub use key::{CacheKey, INDEX_KEY, NAMESPACE, TokenKind};
pub use memory::MemoryBackend;
pub use store::{CachedEntry, TokenStore};

// self
use crate::_prelude::*;

/// Boxed future returned by [`CacheBackend`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Raw value shape exchanged with backends.
pub type CacheValue = serde_json::Value;

/// Options accepted by [`CacheBackend::set`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SetOptions {
	/// Time-to-live after which the backend must stop returning the entry. `None` stores
	/// the entry without an expiry.
	pub ttl: Option<Duration>,
}
impl SetOptions {
	/// Options carrying the provided time-to-live.
	pub fn with_ttl(ttl: Duration) -> Self {
		Self { ttl: Some(ttl) }
	}
}

/// Storage backend contract implemented by session-scoped, persistent, and in-memory
/// variants, each a drop-in for the others.
///
/// The core assumes nothing beyond these three operations: no iteration, no transactions.
/// TTL expiry enforcement at read time is the backend's responsibility; the token store
/// only computes the TTL it passes to [`set`](Self::set).
pub trait CacheBackend
where
	Self: Send + Sync,
{
	/// Fetches the value stored under `key`, if present and unexpired.
	fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<CacheValue>>;

	/// Stores or replaces the value under `key`.
	fn set<'a>(&'a self, key: &'a str, value: CacheValue, options: SetOptions)
	-> CacheFuture<'a, ()>;

	/// Removes the value stored under `key`, if any.
	fn remove<'a>(&'a self, key: &'a str) -> CacheFuture<'a, ()>;
}

/// Error type produced by [`CacheBackend`] implementations and the token store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CacheError {
	/// Entry (de)serialization failure surfaced by the store.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
