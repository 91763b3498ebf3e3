//! Typed token store layered over a raw [`CacheBackend`].

// self
use crate::{
	_prelude::*,
	auth::ScopeClass,
	cache::{CacheBackend, CacheError, CacheIndex, CacheKey, CacheValue, INDEX_KEY, SetOptions},
	jwt::{Claims, TokenHeader},
};

/// Entry stored for one cache key: decoded header plus claim payload.
///
/// Access-token entries carry the presented raw string in `payload._raw`; ID-token entries
/// carry their raw string in `payload.__bearer`; refresh-token entries are opaque and only
/// populate `payload._raw`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedEntry {
	/// Decoded token header (empty for opaque refresh tokens).
	pub header: TokenHeader,
	/// Claim payload.
	pub payload: Claims,
}
impl CachedEntry {
	/// Entry wrapping an opaque (non-JWT) token string such as a refresh token.
	pub fn opaque(raw: impl Into<String>) -> Self {
		Self {
			header: TokenHeader::default(),
			payload: Claims { raw: Some(raw.into()), ..Claims::default() },
		}
	}
}

/// Thin adapter adding typed entries, TTL bookkeeping, and index maintenance on top of a
/// raw get/set/remove backend.
pub struct TokenStore {
	backend: Arc<dyn CacheBackend>,
	// Serializes index read-modify-write cycles; the backend offers no transactions.
	index_guard: AsyncMutex<()>,
}
impl TokenStore {
	/// Wraps the provided backend.
	pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
		Self { backend, index_guard: AsyncMutex::new(()) }
	}

	/// Fetches the entry stored under a typed key.
	pub async fn entry(&self, key: &CacheKey) -> Result<Option<CachedEntry>, CacheError> {
		self.entry_at(&key.to_string()).await
	}

	/// Fetches the entry stored under a raw key string (used for index candidates).
	pub async fn entry_at(&self, key: &str) -> Result<Option<CachedEntry>, CacheError> {
		match self.backend.get(key).await? {
			Some(value) => deserialize_entry(value).map(Some),
			None => Ok(None),
		}
	}

	/// Stores an entry under a typed key with an optional time-to-live.
	pub async fn put_entry(
		&self,
		key: &CacheKey,
		entry: &CachedEntry,
		ttl: Option<Duration>,
	) -> Result<(), CacheError> {
		let value = serialize_entry(entry)?;

		self.backend.set(&key.to_string(), value, SetOptions { ttl }).await
	}

	/// Removes the entry stored under a typed key.
	pub async fn remove_entry(&self, key: &CacheKey) -> Result<(), CacheError> {
		self.backend.remove(&key.to_string()).await
	}

	/// Returns the stored index, or an empty one if absent.
	pub async fn read_index(&self) -> Result<CacheIndex, CacheError> {
		match self.backend.get(INDEX_KEY).await? {
			Some(value) => serde_json::from_value(value).map_err(|e| CacheError::Serialization {
				message: format!("Failed to parse the cache index: {e}"),
			}),
			None => Ok(CacheIndex::default()),
		}
	}

	/// Ordered candidate keys recorded for the (audience, class) slot, or empty if none.
	pub async fn resolve_from_index(
		&self,
		audience: &str,
		class: ScopeClass,
	) -> Result<Vec<String>, CacheError> {
		Ok(self.read_index().await?.keys_for(audience, class).to_vec())
	}

	/// Merges `key` into the (audience, class) slot and persists the whole index.
	///
	/// Stale references in that slot (keys whose entries no longer resolve) are pruned as
	/// part of the write; unrelated audience/class slots are never erased.
	pub async fn write_index_entry(
		&self,
		audience: &str,
		class: ScopeClass,
		key: &CacheKey,
	) -> Result<(), CacheError> {
		let _guard = self.index_guard.lock().await;
		let mut index = self.read_index().await?;
		let mut live = Vec::new();

		for candidate in index.keys_for(audience, class) {
			if self.backend.get(candidate).await?.is_some() {
				live.push(candidate.clone());
			}
		}

		index.replace_slot(audience, class, live);
		index.merge_key(audience, class, key.to_string());

		let value = serde_json::to_value(&index).map_err(|e| CacheError::Serialization {
			message: format!("Failed to serialize the cache index: {e}"),
		})?;

		self.backend.set(INDEX_KEY, value, SetOptions::default()).await
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenStore").finish_non_exhaustive()
	}
}

fn serialize_entry(entry: &CachedEntry) -> Result<CacheValue, CacheError> {
	serde_json::to_value(entry).map_err(|e| CacheError::Serialization {
		message: format!("Failed to serialize cache entry: {e}"),
	})
}

fn deserialize_entry(value: CacheValue) -> Result<CachedEntry, CacheError> {
	serde_json::from_value(value).map_err(|e| CacheError::Serialization {
		message: format!("Failed to parse cache entry: {e}"),
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::ScopeSet,
		cache::{MemoryBackend, TokenKind},
	};

	fn store() -> TokenStore {
		TokenStore::new(Arc::new(MemoryBackend::default()))
	}

	fn access_key(audience: &str) -> CacheKey {
		let scope = ScopeSet::from_str("openid").expect("Scope fixture should be valid.");

		CacheKey::new(TokenKind::AccessToken, "client1", audience, &scope)
	}

	#[tokio::test]
	async fn entries_round_trip_through_the_backend() {
		let store = store();
		let key = access_key("myorg.com");
		let entry = CachedEntry::opaque("someAccessToken");

		store
			.put_entry(&key, &entry, Some(Duration::hours(1)))
			.await
			.expect("Entry write should succeed.");

		let fetched = store
			.entry(&key)
			.await
			.expect("Entry read should succeed.")
			.expect("Entry should be present after write.");

		assert_eq!(fetched.payload.raw.as_deref(), Some("someAccessToken"));

		store.remove_entry(&key).await.expect("Entry removal should succeed.");

		assert!(store.entry(&key).await.expect("Entry read should succeed.").is_none());
	}

	#[tokio::test]
	async fn missing_index_reads_as_empty() {
		let store = store();
		let index = store.read_index().await.expect("Index read should succeed.");

		assert!(index.is_empty());
	}

	#[tokio::test]
	async fn index_writes_prune_stale_keys_in_their_slot_only() {
		let store = store();
		let live_key = access_key("myorg.com");
		let other_key = access_key("other.example.com");

		store
			.put_entry(&live_key, &CachedEntry::opaque("live"), None)
			.await
			.expect("Live entry write should succeed.");
		store
			.put_entry(&other_key, &CachedEntry::opaque("other"), None)
			.await
			.expect("Other entry write should succeed.");

		// Record a key for the slot, then delete its entry so the reference goes stale.
		let stale_key = access_key("myorg.com.stale");

		store
			.write_index_entry("myorg.com", crate::auth::ScopeClass::Openid, &stale_key)
			.await
			.expect("Stale index write should succeed.");
		store
			.write_index_entry("other.example.com", crate::auth::ScopeClass::Offline, &other_key)
			.await
			.expect("Other-slot index write should succeed.");
		store
			.write_index_entry("myorg.com", crate::auth::ScopeClass::Openid, &live_key)
			.await
			.expect("Live index write should succeed.");

		let index = store.read_index().await.expect("Index read should succeed.");

		assert_eq!(
			index.keys_for("myorg.com", crate::auth::ScopeClass::Openid),
			[live_key.to_string()],
			"Stale reference should be pruned on the next successful write for the slot.",
		);
		assert_eq!(
			index.keys_for("other.example.com", crate::auth::ScopeClass::Offline),
			[other_key.to_string()],
			"Writes for one slot must not erase unrelated slots.",
		);
	}
}
