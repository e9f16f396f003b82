#![cfg_attr(doc, allow(rustdoc::private_intra_doc_links))]
//! Component registry keyed by source tuple, target and name.
//!
//! # Role
//!
//! A [`Registry`] stores [`Component`]s under `(sources..., target, name)`.
//! The `(target, name)` pair selects a partition; inside it a
//! [`MultiKeyIndex`] resolves the source tuple with positional fallback.
//! Utilities and adapters share the structure; only [`Registry::adapt`]
//! invokes a component.
//!
//! # Invariants
//!
//! - Self-adaptation: a single object that already provides the target is
//!   returned unchanged by `adapt`, whatever is registered.
//!   - Enforced in: [`Registry::adapt`].
//!   - Tested by: `registry::tests::test_adapter_to_itself_wins_over_registration`.
//! - Components are cloned out of the table and the lock is released before
//!   invocation, so factories may call back into the registry.
//!   - Enforced in: [`Registry::adapt`], [`Registry::subscribers`].
//!   - Tested by: `registry::tests::test_factory_may_reenter_registry`.
//! - Unregistering the last component of a partition drops the partition.
//!   - Enforced in: [`Registry::unregister`].
//!   - Failure symptom: `is_empty` stays false after every component is gone.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::component::{self, Component, Source};
use crate::error::{ComponentInvocationError, RegistryError};
use crate::graph::{CapabilityGraph, Descriptor, DescriptorId};
use crate::index::MultiKeyIndex;
use crate::lookup::Lookup;
use crate::object::Object;

/// How [`Registry::register`] treats a key that already holds a component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
	/// Overwrite with the new component.
	#[default]
	Replace,
	/// Keep the first component registered for a key.
	KeepExisting,
	/// Fail with [`RegistryError::DuplicateRejected`].
	Reject,
}

/// Result of a successful registration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InsertAction {
	/// Key was new; component inserted.
	InsertedNew,
	/// Key existed; kept the existing component (policy chose existing).
	KeptExisting,
	/// Key existed; replaced with the new component (policy chose new).
	ReplacedExisting,
}

/// Construction options of a [`Registry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegistryOptions {
	/// Name used in log events.
	pub label: &'static str,
	pub duplicates: DuplicatePolicy,
}

impl Default for RegistryOptions {
	fn default() -> Self {
		Self {
			label: "registry",
			duplicates: DuplicatePolicy::default(),
		}
	}
}

type Keys = SmallVec<[DescriptorId; 4]>;
type Partitions = FxHashMap<DescriptorId, FxHashMap<Box<str>, MultiKeyIndex<Component>>>;

/// Registry of utilities and adapters over one capability graph.
pub struct Registry {
	graph: Arc<CapabilityGraph>,
	options: RegistryOptions,
	partitions: RwLock<Partitions>,
}

impl std::fmt::Debug for Registry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Registry")
			.field("label", &self.options.label)
			.field("graph", &self.graph.id())
			.field("len", &self.len())
			.finish()
	}
}

impl Registry {
	pub fn new(graph: Arc<CapabilityGraph>) -> Self {
		Self::with_options(graph, RegistryOptions::default())
	}

	pub fn with_options(graph: Arc<CapabilityGraph>, options: RegistryOptions) -> Self {
		Self {
			graph,
			options,
			partitions: RwLock::new(FxHashMap::default()),
		}
	}

	#[inline]
	pub fn graph(&self) -> &Arc<CapabilityGraph> {
		&self.graph
	}

	#[inline]
	pub fn label(&self) -> &'static str {
		self.options.label
	}

	#[inline]
	pub fn duplicate_policy(&self) -> DuplicatePolicy {
		self.options.duplicates
	}

	/// Number of registered components across every partition.
	pub fn len(&self) -> usize {
		self.partitions
			.read()
			.values()
			.flat_map(|by_name| by_name.values())
			.map(MultiKeyIndex::len)
			.sum()
	}

	pub fn is_empty(&self) -> bool {
		self.partitions.read().is_empty()
	}

	/// Registers `component` for `sources` to `target` under `name`.
	pub fn register(
		&self,
		sources: &[Source],
		target: &Descriptor,
		name: &str,
		component: impl Into<Component>,
	) -> Result<InsertAction, RegistryError> {
		let keys = self.normalize(sources)?;
		self.check_target(target)?;
		let component = component.into();

		let mut partitions = self.partitions.write();
		let index = partitions
			.entry(target.id())
			.or_default()
			.entry(Box::from(name))
			.or_default();

		let action = if !index.contains_exact(&keys) {
			index.insert(&keys, component);
			InsertAction::InsertedNew
		} else {
			match self.options.duplicates {
				DuplicatePolicy::Replace => {
					index.insert(&keys, component);
					InsertAction::ReplacedExisting
				}
				DuplicatePolicy::KeepExisting => {
					tracing::warn!(
						registry = self.options.label,
						target = %target,
						name,
						sources = %display_sources(sources),
						"kept existing component"
					);
					InsertAction::KeptExisting
				}
				DuplicatePolicy::Reject => {
					tracing::warn!(
						registry = self.options.label,
						target = %target,
						name,
						sources = %display_sources(sources),
						"rejected duplicate component"
					);
					return Err(RegistryError::DuplicateRejected {
						sources: source_names(sources),
						target: target.name().to_owned(),
						name: name.to_owned(),
					});
				}
			}
		};

		tracing::debug!(
			registry = self.options.label,
			target = %target,
			name,
			sources = %display_sources(sources),
			?action,
			"registered component"
		);
		Ok(action)
	}

	/// Removes the component registered for exactly `sources`, `target` and `name`.
	pub fn unregister(&self, sources: &[Source], target: &Descriptor, name: &str) -> Result<Component, RegistryError> {
		let keys = self.normalize(sources)?;
		self.check_target(target)?;
		let not_registered = || RegistryError::NotRegistered {
			sources: source_names(sources),
			target: target.name().to_owned(),
			name: name.to_owned(),
		};

		let mut partitions = self.partitions.write();
		let by_name = partitions.get_mut(&target.id()).ok_or_else(not_registered)?;
		let index = by_name.get_mut(name).ok_or_else(not_registered)?;
		let component = index.remove(&keys).map_err(|_| not_registered())?;
		if index.is_empty() {
			by_name.remove(name);
		}
		if by_name.is_empty() {
			partitions.remove(&target.id());
		}

		tracing::debug!(
			registry = self.options.label,
			target = %target,
			name,
			sources = %display_sources(sources),
			"unregistered component"
		);
		Ok(component)
	}

	/// Best component for `objects`, returned without invoking it.
	pub fn lookup(&self, objects: &[Object], target: &Descriptor, name: &str) -> Option<Component> {
		let partitions = self.partitions.read();
		let found = partitions
			.get(&target.id())
			.and_then(|by_name| by_name.get(name))
			.and_then(|index| index.get(objects))
			.cloned();
		if found.is_none() {
			tracing::trace!(
				registry = self.options.label,
				target = %target,
				name,
				arity = objects.len(),
				"lookup miss"
			);
		}
		found
	}

	/// Adapts `objects` to `target`.
	///
	/// Returns `Ok(None)` when nothing matches.
	pub fn adapt(&self, objects: &[Object], target: &Descriptor, name: &str) -> Result<Option<Object>, ComponentInvocationError> {
		if let Some(object) = self_adapted(objects, target) {
			return Ok(Some(object));
		}
		let Some(component) = self.lookup(objects, target, name) else {
			return Ok(None);
		};
		component::invoke(&component, objects, target).map(Some)
	}

	/// Every component matching `objects`, most specific first.
	pub fn lookup_all(&self, objects: &[Object], target: &Descriptor, name: &str) -> Vec<Component> {
		let partitions = self.partitions.read();
		partitions
			.get(&target.id())
			.and_then(|by_name| by_name.get(name))
			.map(|index| index.all(objects).into_iter().cloned().collect())
			.unwrap_or_default()
	}

	/// Results of every matching component: adapters are invoked with
	/// `objects`, utilities are returned as they are.
	pub fn subscribers(
		&self,
		objects: &[Object],
		target: &Descriptor,
		name: &str,
	) -> Result<Vec<Object>, ComponentInvocationError> {
		self.lookup_all(objects, target, name)
			.iter()
			.map(|component| match component {
				Component::Utility(object) => Ok(object.clone()),
				Component::Adapter(_) => component::invoke(component, objects, target),
			})
			.collect()
	}

	fn normalize(&self, sources: &[Source]) -> Result<Keys, RegistryError> {
		sources
			.iter()
			.enumerate()
			.map(|(position, source)| match source {
				Source::Descriptor(descriptor) if self.graph.contains(descriptor) => Ok(descriptor.id()),
				Source::Descriptor(descriptor) => Err(RegistryError::InvalidSource {
					position,
					label: descriptor.name().to_owned(),
					reason: "descriptor belongs to another capability graph",
				}),
				Source::Concrete { type_id, type_name } => self
					.graph
					.type_descriptor_of(*type_id)
					.map(|descriptor| descriptor.id())
					.ok_or_else(|| RegistryError::InvalidSource {
						position,
						label: (*type_name).to_owned(),
						reason: "type has no declared descriptor",
					}),
			})
			.collect()
	}

	fn check_target(&self, target: &Descriptor) -> Result<(), RegistryError> {
		if self.graph.contains(target) {
			Ok(())
		} else {
			Err(RegistryError::InvalidTarget {
				target: target.name().to_owned(),
			})
		}
	}
}

impl Lookup for Registry {
	fn lookup(&self, objects: &[Object], target: &Descriptor, name: &str) -> Option<Component> {
		Registry::lookup(self, objects, target, name)
	}

	fn adapt(&self, objects: &[Object], target: &Descriptor, name: &str) -> Result<Option<Object>, ComponentInvocationError> {
		Registry::adapt(self, objects, target, name)
	}
}

/// The single object of `objects` when it already provides `target`.
pub(crate) fn self_adapted(objects: &[Object], target: &Descriptor) -> Option<Object> {
	if let [only] = objects
		&& only.provides(target)
	{
		return Some(only.clone());
	}
	None
}

fn source_names(sources: &[Source]) -> Vec<String> {
	sources.iter().map(ToString::to_string).collect()
}

fn display_sources(sources: &[Source]) -> String {
	source_names(sources).join(", ")
}
