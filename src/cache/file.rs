//! File-backed [`CacheBackend`] for CLIs and other processes that outlive a session.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	cache::{CacheBackend, CacheError, CacheFuture, CacheValue, SetOptions},
};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Slot {
	value: CacheValue,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	expires_at: Option<OffsetDateTime>,
}
impl Slot {
	fn is_expired(&self, now: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|at| at <= now)
	}
}

/// Persists cache entries to a JSON snapshot after each mutation.
///
/// Snapshots are replaced atomically via a temporary file and rename. Entries whose TTL has
/// elapsed are dropped when the snapshot is loaded and skipped at read time.
#[derive(Clone, Debug)]
pub struct FileBackend {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<String, Slot>>>,
}
impl FileBackend {
	/// Opens (or creates) a backend at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = if path.exists() { Self::load_snapshot(&path)? } else { HashMap::new() };

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<String, Slot>, CacheError> {
		let metadata = path.metadata().map_err(|e| CacheError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| CacheError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let entries: Vec<(String, Slot)> =
			serde_json::from_slice(&bytes).map_err(|e| CacheError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;
		let now = OffsetDateTime::now_utc();

		Ok(entries.into_iter().filter(|(_, slot)| !slot.is_expired(now)).collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), CacheError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| CacheError::Backend {
				message: format!("Failed to create cache directory {}: {e}", parent.display()),
			})?;
		}
		Ok(())
	}

	fn persist_locked(&self, contents: &HashMap<String, Slot>) -> Result<(), CacheError> {
		Self::ensure_parent_exists(&self.path)?;

		let snapshot: Vec<_> = contents.iter().collect();
		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| CacheError::Serialization {
				message: format!("Failed to serialize cache snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| CacheError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| CacheError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| CacheError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| CacheError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl CacheBackend for FileBackend {
	fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<CacheValue>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let expired = {
				let slots = self.inner.read();

				match slots.get(key) {
					Some(slot) if slot.is_expired(now) => true,
					Some(slot) => return Ok(Some(slot.value.clone())),
					None => return Ok(None),
				}
			};

			if expired {
				let mut guard = self.inner.write();

				guard.remove(key);
				self.persist_locked(&guard)?;
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
			let mut guard = self.inner.write();

			guard.insert(key.to_owned(), Slot { value, expires_at });
			self.persist_locked(&guard)?;

			Ok(())
		})
	}

	fn remove<'a>(&'a self, key: &'a str) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.remove(key);
			self.persist_locked(&guard)?;

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use serde_json::json;
	use tokio::runtime::Runtime;
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"oidc_silent_file_cache_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn set_and_reload_round_trip() {
		let path = temp_path();
		let backend = FileBackend::open(&path).expect("Failed to open cache snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file cache test.");

		rt.block_on(backend.set("k", json!({"v": 1}), SetOptions::default()))
			.expect("Failed to write fixture entry to file cache.");
		drop(backend);

		let reopened = FileBackend::open(&path).expect("Failed to reopen cache snapshot.");
		let fetched = rt
			.block_on(reopened.get("k"))
			.expect("Failed to read fixture entry from file cache.")
			.expect("File cache lost entry after reopen.");

		assert_eq!(fetched, json!({"v": 1}));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary cache snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn expired_entries_are_dropped_on_reload() {
		let path = temp_path();
		let backend = FileBackend::open(&path).expect("Failed to open cache snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file cache test.");

		rt.block_on(backend.set("gone", json!("x"), SetOptions::with_ttl(Duration::seconds(-1))))
			.expect("Failed to write fixture entry to file cache.");
		rt.block_on(backend.set("live", json!("y"), SetOptions::with_ttl(Duration::hours(1))))
			.expect("Failed to write fixture entry to file cache.");
		drop(backend);

		let reopened = FileBackend::open(&path).expect("Failed to reopen cache snapshot.");

		assert_eq!(
			rt.block_on(reopened.get("gone")).expect("Failed to read from file cache."),
			None
		);
		assert_eq!(
			rt.block_on(reopened.get("live")).expect("Failed to read from file cache."),
			Some(json!("y"))
		);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary cache snapshot {}: {e}", path.display())
		});
	}
}
