//! Multi-argument component dispatch.
//!
//! Values present ordered sets of capability descriptors; a [`Registry`]
//! maps tuples of descriptors plus a target capability and a name to
//! components, and resolves a tuple of values to the best match with
//! deterministic tie-breaking.
//!
//! # Modules
//!
//! - [`graph`] - Capability descriptors and their C3 linearizations
//! - [`object`] - Runtime values and the capabilities they provide
//! - [`map`] - Single-key map resolving through linearizations
//! - [`index`] - Arity-aware multi-key index with positional fallback
//! - [`component`] - Utility and adapter payloads, registration sources
//! - [`registry`] - Registration, lookup, adaptation, subscribers
//! - [`lookup`] - List, chain and stack composition of lookups
//! - [`context`] - Thread-scoped ambient lookup
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use crux_registry::{CapabilityGraph, Component, Object, Registry, Source};
//!
//! struct Document;
//! struct Summary(&'static str);
//!
//! let graph = Arc::new(CapabilityGraph::new());
//! let readable = graph.define("Readable", &[]).unwrap();
//! let summarizer = graph.define("Summarizer", &[]).unwrap();
//! graph.define_type::<Document>(&[&readable]).unwrap();
//!
//! let registry = Registry::new(graph.clone());
//! registry
//! 	.register(
//! 		&[Source::of::<Document>()],
//! 		&summarizer,
//! 		"",
//! 		Component::adapter("summary", 1, |_| Ok(Object::new(Summary("short")))),
//! 	)
//! 	.unwrap();
//!
//! let summary = registry
//! 	.adapt(&[graph.object(Document)], &summarizer, "")
//! 	.unwrap()
//! 	.unwrap();
//! assert_eq!(summary.downcast_ref::<Summary>().unwrap().0, "short");
//! ```

pub mod component;
pub mod context;
pub mod error;
pub mod graph;
pub mod index;
pub mod lookup;
pub mod map;
pub mod object;
pub mod registry;

pub use component::{Component, Factory, FactoryError, Source};
pub use context::{ContextGuard, ExecutionContext, find_ambient_lookup, implicit};
pub use error::{
	ComponentInvocationError, ComponentLookupError, ContextError, DispatchError, GraphError,
	InvocationFailure, LookupKind, NotFound, RegistryError, StackUnderflowError,
};
pub use graph::{CapabilityGraph, Descriptor, DescriptorId, DescriptorKind, Linearization};
pub use index::MultiKeyIndex;
pub use lookup::{ChainLookup, ListLookup, Lookup, LookupExt, LookupStack};
pub use map::PriorityMap;
pub use object::{Object, Provided};
pub use registry::{DuplicatePolicy, InsertAction, Registry, RegistryOptions};
