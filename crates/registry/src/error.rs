//! Error kinds raised by the dispatch core.

use std::fmt;

use crate::component::FactoryError;

/// Miss on an exact map or index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("key not found")]
pub struct NotFound;

/// Capability graph construction errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
	/// No linearization satisfies the orderings of every parent.
	#[error("inconsistent capability hierarchy for {name:?} (parents: {})", .parents.join(", "))]
	InconsistentHierarchy { name: String, parents: Vec<String> },
	/// The name is already taken by another descriptor of the same graph.
	#[error("descriptor {name:?} is already defined")]
	DuplicateName { name: String },
	/// A descriptor handle created by a different graph was passed in.
	#[error("descriptor {name:?} does not belong to this capability graph")]
	ForeignDescriptor { name: String },
}

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
	/// A source is neither a descriptor of the registry's graph nor a declared concrete type.
	#[error("invalid source at position {position} ({label}): {reason}")]
	InvalidSource {
		position: usize,
		label: String,
		reason: &'static str,
	},
	/// The target descriptor belongs to another graph.
	#[error("target {target:?} does not belong to the registry's capability graph")]
	InvalidTarget { target: String },
	/// Unregistration of a key that holds no component.
	#[error("no component registered for sources [{}] to target {target} named {name:?}", .sources.join(", "))]
	NotRegistered {
		sources: Vec<String>,
		target: String,
		name: String,
	},
	/// Re-registration refused by [`crate::DuplicatePolicy::Reject`].
	#[error("component already registered for sources [{}] to target {target} named {name:?}", .sources.join(", "))]
	DuplicateRejected {
		sources: Vec<String>,
		target: String,
		name: String,
	},
}

/// Which operation reported a lookup miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
	Component,
	Adapter,
}

impl fmt::Display for LookupKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			LookupKind::Component => f.write_str("component"),
			LookupKind::Adapter => f.write_str("adapter"),
		}
	}
}

/// No component matched and the caller supplied no default.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not find {kind} from sources [{}] to target {target} named {name:?}", .sources.join(", "))]
pub struct ComponentLookupError {
	pub kind: LookupKind,
	pub sources: Vec<String>,
	pub target: String,
	pub name: String,
}

/// Why invoking a component failed.
#[derive(Debug, thiserror::Error)]
pub enum InvocationFailure {
	/// A utility value was asked to adapt.
	#[error("component is not callable")]
	NotCallable,
	/// The factory was declared for a different number of sources.
	#[error("takes exactly {expected} argument(s) ({given} given)")]
	ArityMismatch { expected: usize, given: usize },
	/// The factory itself reported an error.
	#[error("factory failed: {0}")]
	Failed(#[source] FactoryError),
}

/// A found component could not be invoked with the supplied objects.
#[derive(Debug, thiserror::Error)]
#[error("invoking {component} for sources [{}] to target {target}: {reason}", .sources.join(", "))]
pub struct ComponentInvocationError {
	pub component: String,
	pub target: String,
	pub sources: Vec<String>,
	#[source]
	pub reason: InvocationFailure,
}

/// Popping the base of a [`crate::LookupStack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot pop the base lookup of a lookup stack")]
pub struct StackUnderflowError;

/// Ambient context used before `initialize` (or after `clear`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
	#[error("no implicit registry: the execution context is not initialized")]
	NoImplicitRegistry,
	#[error("no implicit lookup: the execution context is not initialized")]
	NoImplicitLookup,
}

/// Umbrella error of the ambient convenience API.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
	#[error(transparent)]
	Lookup(#[from] ComponentLookupError),
	#[error(transparent)]
	Invocation(#[from] ComponentInvocationError),
	#[error(transparent)]
	Context(#[from] ContextError),
	#[error(transparent)]
	Registry(#[from] RegistryError),
}
