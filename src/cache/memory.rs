//! Process-local backend, the default for tests and short-lived tools.

// self
use crate::{
	_prelude::*,
	cache::{CacheBackend, CacheFuture, CacheValue, SetOptions},
};

#[derive(Clone, Debug)]
struct Slot {
	value: CacheValue,
	expires_at: Option<OffsetDateTime>,
}
impl Slot {
	fn is_expired(&self, now: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|at| at <= now)
	}
}

/// In-memory [`CacheBackend`] over a shared hash map.
///
/// TTL handling is lazy: expired slots are dropped when a read observes them, not by a
/// background sweeper. Clones share the same underlying map.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
	slots: Arc<RwLock<HashMap<String, Slot>>>,
}
impl MemoryBackend {
	/// Creates an empty backend.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of live entries, expired slots excluded.
	pub fn len(&self) -> usize {
		let now = OffsetDateTime::now_utc();

		self.slots.read().values().filter(|s| !s.is_expired(now)).count()
	}

	/// Whether no live entries exist.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
impl CacheBackend for MemoryBackend {
	fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<CacheValue>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let expired = {
				let slots = self.slots.read();

				match slots.get(key) {
					Some(slot) if slot.is_expired(now) => true,
					Some(slot) => return Ok(Some(slot.value.clone())),
					None => return Ok(None),
				}
			};

			if expired {
				self.slots.write().remove(key);
			}

			Ok(None)
		})
	}

	fn set<'a>(
		&'a self,
		key: &'a str,
		value: CacheValue,
		options: SetOptions,
	) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			let expires_at = options.ttl.map(|ttl| OffsetDateTime::now_utc() + ttl);

			self.slots.write().insert(key.to_owned(), Slot { value, expires_at });

			Ok(())
		})
	}

	fn remove<'a>(&'a self, key: &'a str) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			self.slots.write().remove(key);

			Ok(())
		})
	}
}
