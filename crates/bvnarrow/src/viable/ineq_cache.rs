//! A bounded cache of the decision diagrams of affine inequalities.

use std::collections::BTreeMap;

use tracing::trace;

use crate::{bdd::Ref, BitWidth, Value};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Identifies the inequality `a * x + b <= c * x + d` over `width` bits.
pub(crate) struct IneqKey {
	/// The number of bits of the values.
	pub(crate) width: BitWidth,
	/// The coefficient of the left-hand side.
	pub(crate) a: Value,
	/// The constant of the left-hand side.
	pub(crate) b: Value,
	/// The coefficient of the right-hand side.
	pub(crate) c: Value,
	/// The constant of the right-hand side.
	pub(crate) d: Value,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Cache from inequalities to the decision diagrams of the values that satisfy
/// them.
///
/// When the cache is full, the entry that was used the least number of times
/// is evicted. Ties are broken in favour of evicting the smallest key.
pub(crate) struct IneqCache {
	/// The maximum number of entries.
	capacity: usize,
	/// The cached decision diagrams and the number of times they were used.
	entries: BTreeMap<IneqKey, CacheEntry>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// A decision diagram stored in the [`IneqCache`].
struct CacheEntry {
	/// The values that satisfy the inequality.
	le: Ref,
	/// The number of times that the entry was used.
	activity: u64,
}

impl IneqCache {
	/// Remove all cached entries.
	pub(crate) fn clear(&mut self) {
		self.entries.clear();
	}

	/// Returns whether the cache contains an entry for `key`.
	pub(crate) fn contains(&self, key: &IneqKey) -> bool {
		self.entries.contains_key(key)
	}

	/// Returns the cached decision diagram for `key`, creating it using `build`
	/// if it is not yet cached.
	pub(crate) fn get_or_insert_with(
		&mut self,
		key: IneqKey,
		build: impl FnOnce(&IneqKey) -> Ref,
	) -> Ref {
		if let Some(entry) = self.entries.get_mut(&key) {
			entry.activity += 1;
			trace!(width = key.width, activity = entry.activity, "inequality cache hit");
			return entry.le;
		}
		if self.entries.len() >= self.capacity {
			let least = self
				.entries
				.iter()
				.min_by_key(|(_, entry)| entry.activity)
				.map(|(key, _)| key.clone());
			if let Some(least) = least {
				trace!(width = least.width, "evict inequality from cache");
				let _ = self.entries.remove(&least);
			}
		}
		let le = build(&key);
		if self.capacity > 0 {
			let _ = self.entries.insert(key, CacheEntry { le, activity: 1 });
		}
		le
	}

	/// Returns the number of cached inequalities.
	pub(crate) fn len(&self) -> usize {
		self.entries.len()
	}

	/// Create an empty cache that holds at most `capacity` entries.
	pub(crate) fn new(capacity: usize) -> Self {
		Self {
			capacity,
			entries: BTreeMap::new(),
		}
	}
}

#[cfg(test)]
mod tests {
	use crate::{
		bdd::Ref,
		viable::ineq_cache::{IneqCache, IneqKey},
		Value,
	};

	#[test]
	fn test_least_active_eviction() {
		let key = |d: u32| IneqKey {
			width: 8,
			a: Value::from(1_u32),
			b: Value::from(0_u32),
			c: Value::from(2_u32),
			d: Value::from(d),
		};
		let mut cache = IneqCache::new(2);
		let mut builds = 0;
		let mut get = |cache: &mut IneqCache, d: u32| {
			cache.get_or_insert_with(key(d), |_| {
				builds += 1;
				Ref::ONE
			})
		};

		assert_eq!(get(&mut cache, 1), Ref::ONE);
		let _ = get(&mut cache, 1);
		let _ = get(&mut cache, 2);
		assert_eq!(cache.len(), 2);

		// Key 2 is the least active entry.
		let _ = get(&mut cache, 3);
		assert!(cache.contains(&key(1)));
		assert!(!cache.contains(&key(2)));
		assert!(cache.contains(&key(3)));

		// Tie between keys 1 and 3 after using key 3 again, the smallest is evicted.
		let _ = get(&mut cache, 3);
		let _ = get(&mut cache, 4);
		assert!(!cache.contains(&key(1)));
		assert!(cache.contains(&key(3)));
		assert!(cache.contains(&key(4)));
		drop(get);
		assert_eq!(builds, 4);
	}
}
