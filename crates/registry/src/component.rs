//! Registered payloads and registration sources.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::error::{ComponentInvocationError, InvocationFailure};
use crate::graph::Descriptor;
use crate::object::Object;

/// Error type factories may return.
pub type FactoryError = Box<dyn std::error::Error + Send + Sync>;

type FactoryFn = dyn Fn(&[Object]) -> Result<Object, FactoryError> + Send + Sync;

/// Adapter factory: builds an object from the looked-up sources.
#[derive(Clone)]
pub struct Factory {
	label: Arc<str>,
	arity: usize,
	func: Arc<FactoryFn>,
}

impl Factory {
	/// Creates a factory taking exactly `arity` source objects.
	pub fn new<F>(label: impl Into<Arc<str>>, arity: usize, func: F) -> Self
	where
		F: Fn(&[Object]) -> Result<Object, FactoryError> + Send + Sync + 'static,
	{
		Self {
			label: label.into(),
			arity,
			func: Arc::new(func),
		}
	}

	#[inline]
	pub fn label(&self) -> &str {
		&self.label
	}

	#[inline]
	pub fn arity(&self) -> usize {
		self.arity
	}

	pub fn ptr_eq(&self, other: &Factory) -> bool {
		Arc::ptr_eq(&self.func, &other.func)
	}

	fn call(&self, objects: &[Object]) -> Result<Object, InvocationFailure> {
		if objects.len() != self.arity {
			return Err(InvocationFailure::ArityMismatch {
				expected: self.arity,
				given: objects.len(),
			});
		}
		(self.func)(objects).map_err(InvocationFailure::Failed)
	}
}

impl fmt::Debug for Factory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Factory")
			.field("label", &self.label)
			.field("arity", &self.arity)
			.finish_non_exhaustive()
	}
}

/// Payload stored in a registry.
#[derive(Debug, Clone)]
pub enum Component {
	/// Returned as-is by lookups; cannot adapt.
	Utility(Object),
	/// Invoked with the sources when adapting.
	Adapter(Factory),
}

impl Component {
	/// Wraps `value` as a utility payload.
	pub fn utility<T: Any + Send + Sync>(value: T) -> Self {
		Component::Utility(Object::new(value))
	}

	/// Wraps `func` as an adapter factory.
	pub fn adapter<F>(label: impl Into<Arc<str>>, arity: usize, func: F) -> Self
	where
		F: Fn(&[Object]) -> Result<Object, FactoryError> + Send + Sync + 'static,
	{
		Component::Adapter(Factory::new(label, arity, func))
	}

	/// Name used in diagnostics.
	pub fn label(&self) -> &str {
		match self {
			Component::Utility(object) => object.type_name(),
			Component::Adapter(factory) => factory.label(),
		}
	}

	pub fn as_object(&self) -> Option<&Object> {
		match self {
			Component::Utility(object) => Some(object),
			Component::Adapter(_) => None,
		}
	}

	pub fn as_factory(&self) -> Option<&Factory> {
		match self {
			Component::Adapter(factory) => Some(factory),
			Component::Utility(_) => None,
		}
	}

	/// Returns true if both components share the same payload allocation.
	pub fn ptr_eq(&self, other: &Component) -> bool {
		match (self, other) {
			(Component::Utility(a), Component::Utility(b)) => a.ptr_eq(b),
			(Component::Adapter(a), Component::Adapter(b)) => a.ptr_eq(b),
			_ => false,
		}
	}

	/// Invokes the payload with `objects` as positional arguments.
	pub fn invoke(&self, objects: &[Object]) -> Result<Object, InvocationFailure> {
		match self {
			Component::Utility(_) => Err(InvocationFailure::NotCallable),
			Component::Adapter(factory) => factory.call(objects),
		}
	}
}

impl From<Object> for Component {
	fn from(object: Object) -> Self {
		Component::Utility(object)
	}
}

impl From<Factory> for Component {
	fn from(factory: Factory) -> Self {
		Component::Adapter(factory)
	}
}

/// Invokes `component`, attributing failures to the component, target and sources.
pub(crate) fn invoke(component: &Component, objects: &[Object], target: &Descriptor) -> Result<Object, ComponentInvocationError> {
	component.invoke(objects).map_err(|reason| ComponentInvocationError {
		component: component.label().to_owned(),
		target: target.name().to_owned(),
		sources: objects.iter().map(|object| object.type_name().to_owned()).collect(),
		reason,
	})
}

/// What a registration is made for at one source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
	/// A descriptor of the registry's graph, used as-is.
	Descriptor(Descriptor),
	/// A Rust type, replaced by the descriptor declared for it.
	Concrete { type_id: TypeId, type_name: &'static str },
}

impl Source {
	/// Source standing for the concrete type `T`.
	pub fn of<T: Any>() -> Self {
		Source::Concrete {
			type_id: TypeId::of::<T>(),
			type_name: std::any::type_name::<T>(),
		}
	}
}

impl From<Descriptor> for Source {
	fn from(descriptor: Descriptor) -> Self {
		Source::Descriptor(descriptor)
	}
}

impl From<&Descriptor> for Source {
	fn from(descriptor: &Descriptor) -> Self {
		Source::Descriptor(descriptor.clone())
	}
}

impl fmt::Display for Source {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Source::Descriptor(descriptor) => f.write_str(descriptor.name()),
			Source::Concrete { type_name, .. } => f.write_str(type_name),
		}
	}
}
