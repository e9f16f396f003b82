//! Composable lookups.
//!
//! # Role
//!
//! [`Lookup`] is the read side shared by registries and their compositions.
//! Every composition answers with the first member that does not miss:
//! [`ListLookup`] walks an ordered list, [`ChainLookup`] tries a primary
//! before its fallback, and [`LookupStack`] layers pushed overlays over a
//! mandatory base.
//!
//! Each composition's `adapt` first returns a single object that already
//! provides the target, exactly as a [`Registry`](crate::registry::Registry)
//! does, so self-adaptation never depends on what is composed.
//!
//! A miss is `None`; callers that want an error instead use [`LookupExt`].

mod stack;


use std::sync::Arc;

pub use stack::LookupStack;

use crate::component::Component;
use crate::error::{ComponentInvocationError, ComponentLookupError, DispatchError, LookupKind};
use crate::graph::Descriptor;
use crate::object::Object;
use crate::registry::self_adapted;

/// Read access to registered components.
pub trait Lookup: Send + Sync {
	/// Best component for `objects`, not invoked.
	fn lookup(&self, objects: &[Object], target: &Descriptor, name: &str) -> Option<Component>;

	/// Best component for `objects`, invoked with them.
	fn adapt(&self, objects: &[Object], target: &Descriptor, name: &str) -> Result<Option<Object>, ComponentInvocationError>;
}

impl<L: Lookup + ?Sized> Lookup for Arc<L> {
	fn lookup(&self, objects: &[Object], target: &Descriptor, name: &str) -> Option<Component> {
		(**self).lookup(objects, target, name)
	}

	fn adapt(&self, objects: &[Object], target: &Descriptor, name: &str) -> Result<Option<Object>, ComponentInvocationError> {
		(**self).adapt(objects, target, name)
	}
}

/// Lookups that fail loudly on a miss.
pub trait LookupExt: Lookup {
	/// Like [`Lookup::lookup`], but a miss is a [`ComponentLookupError`].
	fn component(&self, objects: &[Object], target: &Descriptor, name: &str) -> Result<Component, ComponentLookupError> {
		self.lookup(objects, target, name)
			.ok_or_else(|| lookup_error(LookupKind::Component, objects, target, name))
	}

	/// Like [`Lookup::adapt`], but a miss is a [`ComponentLookupError`].
	///
	/// A single object that already provides `target` is returned without
	/// consulting the lookup.
	fn adapter(&self, objects: &[Object], target: &Descriptor, name: &str) -> Result<Object, DispatchError> {
		if let Some(object) = self_adapted(objects, target) {
			return Ok(object);
		}
		self.adapt(objects, target, name)?
			.ok_or_else(|| lookup_error(LookupKind::Adapter, objects, target, name).into())
	}
}

impl<L: Lookup + ?Sized> LookupExt for L {}

pub(crate) fn lookup_error(kind: LookupKind, objects: &[Object], target: &Descriptor, name: &str) -> ComponentLookupError {
	ComponentLookupError {
		kind,
		sources: objects.iter().map(|object| object.type_name().to_owned()).collect(),
		target: target.name().to_owned(),
		name: name.to_owned(),
	}
}

/// Ordered lookups; the first hit wins.
#[derive(Clone, Default)]
pub struct ListLookup {
	lookups: Vec<Arc<dyn Lookup>>,
}

impl ListLookup {
	pub fn new(lookups: Vec<Arc<dyn Lookup>>) -> Self {
		Self { lookups }
	}

	/// Appends `lookup` after the existing members.
	pub fn push(&mut self, lookup: Arc<dyn Lookup>) {
		self.lookups.push(lookup);
	}

	pub fn len(&self) -> usize {
		self.lookups.len()
	}

	pub fn is_empty(&self) -> bool {
		self.lookups.is_empty()
	}
}

impl FromIterator<Arc<dyn Lookup>> for ListLookup {
	fn from_iter<I: IntoIterator<Item = Arc<dyn Lookup>>>(iter: I) -> Self {
		Self::new(iter.into_iter().collect())
	}
}

impl std::fmt::Debug for ListLookup {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ListLookup")
			.field("len", &self.lookups.len())
			.finish()
	}
}

impl Lookup for ListLookup {
	fn lookup(&self, objects: &[Object], target: &Descriptor, name: &str) -> Option<Component> {
		self.lookups
			.iter()
			.find_map(|lookup| lookup.lookup(objects, target, name))
	}

	fn adapt(&self, objects: &[Object], target: &Descriptor, name: &str) -> Result<Option<Object>, ComponentInvocationError> {
		if let Some(object) = self_adapted(objects, target) {
			return Ok(Some(object));
		}
		for lookup in &self.lookups {
			if let Some(object) = lookup.adapt(objects, target, name)? {
				return Ok(Some(object));
			}
		}
		Ok(None)
	}
}

/// A primary lookup with a fallback behind it.
#[derive(Clone)]
pub struct ChainLookup {
	primary: Arc<dyn Lookup>,
	fallback: Arc<dyn Lookup>,
}

impl ChainLookup {
	pub fn new(primary: Arc<dyn Lookup>, fallback: Arc<dyn Lookup>) -> Self {
		Self { primary, fallback }
	}

	pub fn primary(&self) -> &Arc<dyn Lookup> {
		&self.primary
	}

	pub fn fallback(&self) -> &Arc<dyn Lookup> {
		&self.fallback
	}
}

impl std::fmt::Debug for ChainLookup {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ChainLookup").finish_non_exhaustive()
	}
}

impl Lookup for ChainLookup {
	fn lookup(&self, objects: &[Object], target: &Descriptor, name: &str) -> Option<Component> {
		self.primary
			.lookup(objects, target, name)
			.or_else(|| self.fallback.lookup(objects, target, name))
	}

	fn adapt(&self, objects: &[Object], target: &Descriptor, name: &str) -> Result<Option<Object>, ComponentInvocationError> {
		if let Some(object) = self_adapted(objects, target) {
			return Ok(Some(object));
		}
		match self.primary.adapt(objects, target, name)? {
			Some(object) => Ok(Some(object)),
			None => self.fallback.adapt(objects, target, name),
		}
	}
}
