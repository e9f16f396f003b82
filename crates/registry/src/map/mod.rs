//! Single-key map that resolves through linearizations.
//!
//! A plain map only finds keys that are present. A [`PriorityMap`] also
//! finds values stored on an ancestor of the requested key: `get` walks the
//! key's linearization and returns the first stored hit, so a value stored
//! on the key itself always beats an inherited one.


use rustc_hash::FxHashMap;

use crate::error::NotFound;
use crate::graph::DescriptorId;
use crate::object::Provided;

/// Map keyed by descriptor, resolving misses through ancestors.
#[derive(Debug, Clone)]
pub struct PriorityMap<V> {
	entries: FxHashMap<DescriptorId, V>,
}

impl<V> Default for PriorityMap<V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<V> PriorityMap<V> {
	pub fn new() -> Self {
		Self {
			entries: FxHashMap::default(),
		}
	}

	/// Stores `value` under exactly `key`, returning the previous value.
	pub fn insert(&mut self, key: impl Into<DescriptorId>, value: V) -> Option<V> {
		self.entries.insert(key.into(), value)
	}

	/// Removes the value stored under exactly `key`.
	pub fn remove(&mut self, key: impl Into<DescriptorId>) -> Result<V, NotFound> {
		self.entries.remove(&key.into()).ok_or(NotFound)
	}

	/// Most specific stored value along `key`'s linearization.
	pub fn get<K: Provided + ?Sized>(&self, key: &K) -> Option<&V> {
		key.provided().iter().find_map(|id| self.entries.get(id))
	}

	/// Every stored value along `key`'s linearization, most specific first.
	pub fn all<K: Provided + ?Sized>(&self, key: &K) -> Vec<&V> {
		key.provided()
			.iter()
			.filter_map(|id| self.entries.get(id))
			.collect()
	}

	/// Value stored under exactly `key`, ignoring ancestors.
	#[inline]
	pub fn get_exact(&self, key: impl Into<DescriptorId>) -> Option<&V> {
		self.entries.get(&key.into())
	}

	#[inline]
	pub fn get_exact_or<'a>(&'a self, key: impl Into<DescriptorId>, default: &'a V) -> &'a V {
		self.get_exact(key).unwrap_or(default)
	}

	#[inline]
	pub fn contains_exact(&self, key: impl Into<DescriptorId>) -> bool {
		self.entries.contains_key(&key.into())
	}

	pub(crate) fn get_exact_mut(&mut self, key: DescriptorId) -> Option<&mut V> {
		self.entries.get_mut(&key)
	}

	pub(crate) fn get_or_insert_with(&mut self, key: DescriptorId, default: impl FnOnce() -> V) -> &mut V {
		self.entries.entry(key).or_insert_with(default)
	}

	/// Exact keys, in no particular order.
	pub fn keys(&self) -> impl Iterator<Item = DescriptorId> + '_ {
		self.entries.keys().copied()
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
