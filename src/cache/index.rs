//! The stored cache index: audience → scope class → recorded cache keys.

// self
use crate::{_prelude::*, auth::ScopeClass};

/// Index of cache keys present per (audience, scope class) slot.
///
/// Lives under the reserved [`INDEX_KEY`](super::INDEX_KEY) entry. Every key referenced
/// here has (or recently had) a corresponding stored entry; stale references are tolerated
/// as cache misses and pruned on the next successful write for their slot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheIndex(BTreeMap<String, BTreeMap<ScopeClass, Vec<String>>>);
impl CacheIndex {
	/// Returns true when no slot records any key.
	pub fn is_empty(&self) -> bool {
		self.0.values().flat_map(|classes| classes.values()).all(Vec::is_empty)
	}

	/// Ordered keys recorded for the (audience, class) slot.
	pub fn keys_for(&self, audience: &str, class: ScopeClass) -> &[String] {
		self.0
			.get(audience)
			.and_then(|classes| classes.get(&class))
			.map(Vec::as_slice)
			.unwrap_or_default()
	}

	/// Merges `key` into the (audience, class) slot, deduplicating while preserving order.
	///
	/// Unrelated audience/class slots are never touched.
	pub fn merge_key(&mut self, audience: &str, class: ScopeClass, key: impl Into<String>) {
		let key = key.into();
		let slot = self.0.entry(audience.to_owned()).or_default().entry(class).or_default();

		if !slot.contains(&key) {
			slot.push(key);
		}
	}

	/// Replaces the (audience, class) slot's key list wholesale; other slots are untouched.
	pub fn replace_slot(&mut self, audience: &str, class: ScopeClass, keys: Vec<String>) {
		self.0.entry(audience.to_owned()).or_default().insert(class, keys);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn merges_are_non_destructive_across_slots() {
		let mut index = CacheIndex::default();

		index.merge_key("audience-a", ScopeClass::Openid, "key-a");
		index.merge_key("audience-b", ScopeClass::Offline, "key-b");

		assert_eq!(index.keys_for("audience-a", ScopeClass::Openid), ["key-a"]);
		assert_eq!(index.keys_for("audience-b", ScopeClass::Offline), ["key-b"]);
		assert!(index.keys_for("audience-a", ScopeClass::Offline).is_empty());
	}

	#[test]
	fn merges_deduplicate_but_keep_order() {
		let mut index = CacheIndex::default();

		index.merge_key("aud", ScopeClass::Openid, "first");
		index.merge_key("aud", ScopeClass::Openid, "second");
		index.merge_key("aud", ScopeClass::Openid, "first");

		assert_eq!(index.keys_for("aud", ScopeClass::Openid), ["first", "second"]);
	}

	#[test]
	fn replace_slot_leaves_other_classes_alone() {
		let mut index = CacheIndex::default();

		index.merge_key("aud", ScopeClass::Openid, "live");
		index.merge_key("aud", ScopeClass::Offline, "other");
		index.replace_slot("aud", ScopeClass::Openid, vec!["pruned".into()]);

		assert_eq!(index.keys_for("aud", ScopeClass::Openid), ["pruned"]);
		assert_eq!(index.keys_for("aud", ScopeClass::Offline), ["other"]);
	}

	#[test]
	fn serializes_with_lowercase_class_labels() {
		let mut index = CacheIndex::default();

		index.merge_key("myorg.com", ScopeClass::Openid, "k");

		let payload = serde_json::to_value(&index).expect("Index should serialize to JSON.");

		assert_eq!(payload["myorg.com"]["openid"][0], "k");
	}
}
