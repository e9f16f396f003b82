#![cfg_attr(doc, allow(rustdoc::private_intra_doc_links))]
//! Arity-aware multi-key index.
//!
//! # Purpose
//!
//! Maps fixed-length tuples of descriptors to values. Looking a tuple up
//! compares it position by position with the registered tuples: each
//! registered position must equal the looked-up descriptor or one of its
//! ancestors.
//!
//! # Mental Model
//!
//! Registrations live in one bucket per arity. Inside a bucket every
//! position is one [`PriorityMap`] layer keyed by the exact descriptor used at
//! registration; the last layer holds the values. A nullary registration
//! occupies its own slot.
//!
//! # Precedence Contract
//!
//! 1. **First position dominates:** candidates for position 0 are tried in
//!    the order of its linearization, most specific first.
//! 2. **Later positions break ties:** for each candidate present at a layer
//!    the remaining positions are resolved with the same rule, left to right.
//! 3. The first complete match wins.
//!
//! - Enforced in: [`resolve`].
//! - Tested by: `index::tests::test_positional_dominance`.
//!
//! # Invariants
//!
//! - Arity is part of the key: a 2-tuple never matches a 3-tuple lookup.
//!   - Enforced in: [`MultiKeyIndex::get`] (bucket selection).
//! - [`MultiKeyIndex::all`] reports each stored value at most once. Every
//!   node sits under exactly one path of exact ids, and a linearization lists
//!   each id once, so the walk reaches each node at most once with no
//!   bookkeeping.
//!   - Enforced in: [`collect`].
//!   - Tested by: `index::tests::test_all_on_shared_ancestors_reports_each_value_once`.
//! - Removing a key prunes every layer it leaves empty, so `insert` followed
//!   by `remove` restores the previous structure.
//!   - Enforced in: [`remove_in`].
//!   - Tested by: `index::tests::test_remove_prunes_layers`.


use rustc_hash::FxHashMap;

use crate::error::NotFound;
use crate::graph::DescriptorId;
use crate::map::PriorityMap;
use crate::object::Provided;

#[derive(Debug, Clone)]
enum Node<V> {
	Leaf(V),
	Branch(PriorityMap<Node<V>>),
}

/// Map from descriptor tuples to values with positional fallback.
#[derive(Debug, Clone)]
pub struct MultiKeyIndex<V> {
	nullary: Option<V>,
	by_arity: FxHashMap<usize, PriorityMap<Node<V>>>,
	len: usize,
}

impl<V> Default for MultiKeyIndex<V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<V> MultiKeyIndex<V> {
	pub fn new() -> Self {
		Self {
			nullary: None,
			by_arity: FxHashMap::default(),
			len: 0,
		}
	}

	/// Stores `value` under exactly `keys`, returning the previous value.
	pub fn insert(&mut self, keys: &[DescriptorId], value: V) -> Option<V> {
		let Some((&last, prefix)) = keys.split_last() else {
			let previous = self.nullary.replace(value);
			if previous.is_none() {
				self.len += 1;
			}
			return previous;
		};

		let mut layer = self.by_arity.entry(keys.len()).or_default();
		for &key in prefix {
			layer = match layer.get_or_insert_with(key, || Node::Branch(PriorityMap::new())) {
				Node::Branch(next) => next,
				Node::Leaf(_) => unreachable!("arity bucket {} holds a value above its last position", keys.len()),
			};
		}

		let previous = match layer.insert(last, Node::Leaf(value)) {
			Some(Node::Leaf(previous)) => Some(previous),
			Some(Node::Branch(_)) => unreachable!("arity bucket {} holds a layer at its last position", keys.len()),
			None => None,
		};
		if previous.is_none() {
			self.len += 1;
		}
		previous
	}

	/// Removes the value stored under exactly `keys`.
	pub fn remove(&mut self, keys: &[DescriptorId]) -> Result<V, NotFound> {
		let Some((&first, rest)) = keys.split_first() else {
			let value = self.nullary.take().ok_or(NotFound)?;
			self.len -= 1;
			return Ok(value);
		};

		let layer = self.by_arity.get_mut(&keys.len()).ok_or(NotFound)?;
		let value = remove_in(layer, first, rest)?;
		if layer.is_empty() {
			self.by_arity.remove(&keys.len());
		}
		self.len -= 1;
		Ok(value)
	}

	/// Best match for `keys`, following the precedence contract.
	pub fn get<K: Provided>(&self, keys: &[K]) -> Option<&V> {
		let Some((first, rest)) = keys.split_first() else {
			return self.nullary.as_ref();
		};
		resolve(self.by_arity.get(&keys.len())?, first, rest)
	}

	/// Every value matching `keys`, in precedence order.
	pub fn all<K: Provided>(&self, keys: &[K]) -> Vec<&V> {
		let Some((first, rest)) = keys.split_first() else {
			return self.nullary.iter().collect();
		};
		let Some(layer) = self.by_arity.get(&keys.len()) else {
			return Vec::new();
		};

		let mut out = Vec::new();
		collect(layer, first, rest, &mut out);
		out
	}

	/// Value stored under exactly `keys`, without ancestor fallback.
	pub fn get_exact(&self, keys: &[DescriptorId]) -> Option<&V> {
		let Some((&first, rest)) = keys.split_first() else {
			return self.nullary.as_ref();
		};
		let mut node = self.by_arity.get(&keys.len())?.get_exact(first)?;
		for &key in rest {
			node = match node {
				Node::Branch(layer) => layer.get_exact(key)?,
				Node::Leaf(_) => return None,
			};
		}
		match node {
			Node::Leaf(value) => Some(value),
			Node::Branch(_) => None,
		}
	}

	#[inline]
	pub fn contains_exact(&self, keys: &[DescriptorId]) -> bool {
		self.get_exact(keys).is_some()
	}

	/// Number of stored values across all arities.
	#[inline]
	pub fn len(&self) -> usize {
		self.len
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}
}

fn resolve<'a, V, K: Provided>(layer: &'a PriorityMap<Node<V>>, first: &K, rest: &[K]) -> Option<&'a V> {
	first.provided().iter().find_map(|&id| match (layer.get_exact(id)?, rest.split_first()) {
		(Node::Leaf(value), None) => Some(value),
		(Node::Branch(next), Some((head, tail))) => resolve(next, head, tail),
		_ => None,
	})
}

fn collect<'a, V, K: Provided>(layer: &'a PriorityMap<Node<V>>, first: &K, rest: &[K], out: &mut Vec<&'a V>) {
	for &id in first.provided() {
		let Some(node) = layer.get_exact(id) else {
			continue;
		};
		match (node, rest.split_first()) {
			(Node::Leaf(value), None) => out.push(value),
			(Node::Branch(next), Some((head, tail))) => collect(next, head, tail, out),
			_ => {}
		}
	}
}

fn remove_in<V>(layer: &mut PriorityMap<Node<V>>, key: DescriptorId, rest: &[DescriptorId]) -> Result<V, NotFound> {
	let Some((&next_key, tail)) = rest.split_first() else {
		if !matches!(layer.get_exact(key), Some(Node::Leaf(_))) {
			return Err(NotFound);
		}
		return match layer.remove(key)? {
			Node::Leaf(value) => Ok(value),
			Node::Branch(_) => unreachable!("checked for a leaf above"),
		};
	};

	let Some(Node::Branch(next)) = layer.get_exact_mut(key) else {
		return Err(NotFound);
	};
	let value = remove_in(next, next_key, tail)?;
	if next.is_empty() {
		let _ = layer.remove(key);
	}
	Ok(value)
}
