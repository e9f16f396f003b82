//! Runtime values and the capability sets they present.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::graph::{Descriptor, DescriptorId, Linearization};

/// Anything that presents an ordered capability set to a lookup.
pub trait Provided {
	/// Descriptor ids, most specific first, each listed once.
	fn provided(&self) -> &[DescriptorId];
}

impl Provided for Descriptor {
	fn provided(&self) -> &[DescriptorId] {
		self.linearization()
	}
}

impl Provided for Linearization {
	fn provided(&self) -> &[DescriptorId] {
		self
	}
}

impl Provided for Object {
	fn provided(&self) -> &[DescriptorId] {
		&self.provided
	}
}

impl Provided for [DescriptorId] {
	fn provided(&self) -> &[DescriptorId] {
		self
	}
}

impl<T: Provided + ?Sized> Provided for &T {
	fn provided(&self) -> &[DescriptorId] {
		(**self).provided()
	}
}

/// Shared, type-erased value together with the capabilities it provides.
///
/// Clones share the value; [`Object::ptr_eq`] compares that identity.
#[derive(Clone)]
pub struct Object {
	value: Arc<dyn Any + Send + Sync>,
	type_name: &'static str,
	provided: Linearization,
}

impl Object {
	/// Wraps a value that provides no capabilities.
	///
	/// Such objects never match a source position; they are the usual shape
	/// of utility payloads and adapter results.
	pub fn new<T: Any + Send + Sync>(value: T) -> Self {
		Self::with_provided(value, Linearization::empty())
	}

	/// Wraps a value with an explicit capability set.
	pub fn with_provided<T: Any + Send + Sync>(value: T, provided: Linearization) -> Self {
		Self {
			value: Arc::new(value),
			type_name: std::any::type_name::<T>(),
			provided,
		}
	}

	/// Rust type name of the wrapped value.
	#[inline]
	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	#[inline]
	pub fn linearization(&self) -> &Linearization {
		&self.provided
	}

	/// Returns true if the capability set includes `descriptor`.
	pub fn provides(&self, descriptor: &Descriptor) -> bool {
		self.provided.contains(&descriptor.id())
	}

	pub fn is<T: Any>(&self) -> bool {
		self.value.is::<T>()
	}

	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.value.downcast_ref::<T>()
	}

	/// Returns true if both objects share the same value allocation.
	pub fn ptr_eq(&self, other: &Object) -> bool {
		Arc::ptr_eq(&self.value, &other.value)
	}
}

impl fmt::Debug for Object {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Object")
			.field("type", &self.type_name)
			.field("provided", &self.provided)
			.finish()
	}
}
