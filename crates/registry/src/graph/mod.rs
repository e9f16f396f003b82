#![cfg_attr(doc, allow(rustdoc::private_intra_doc_links))]
//! Capability hierarchy arena.
//!
//! # Role
//!
//! Descriptors are nodes of a multiple-inheritance DAG. The graph owns them
//! in an append-only arena addressed by [`DescriptorId`]; parents are stored
//! as ids, never as live references. Each node's linearization (itself plus
//! every ancestor, most specific first) is computed once at definition with
//! C3 and shared by every [`Descriptor`] handle, so lookups never consult the
//! graph again.
//!
//! # Invariants
//!
//! - Parents must exist before their children, so cycles cannot be built.
//! - A linearization lists each ancestor exactly once, starts with the
//!   descriptor itself, and keeps every parent linearization as a subsequence.
//!   - Enforced in: [`c3::linearize`].
//!   - Tested by: `graph::tests::prop_linearization_is_monotonic`.
//! - Inconsistent hierarchies fail in [`CapabilityGraph::define`], never later.

mod c3;


use std::any::{Any, TypeId};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::GraphError;
use crate::object::Object;

static NEXT_GRAPH_ID: AtomicU32 = AtomicU32::new(1);

/// Dense descriptor id, unique across graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId {
	graph: u32,
	index: u32,
}

impl DescriptorId {
	/// Arena slot of this descriptor within its graph.
	#[inline]
	pub const fn index(self) -> u32 {
		self.index
	}
}

impl From<&Descriptor> for DescriptorId {
	fn from(descriptor: &Descriptor) -> Self {
		descriptor.id
	}
}

/// Ordered capability set, most specific first.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Linearization(Arc<[DescriptorId]>);

impl Linearization {
	/// The capability set of a value that provides nothing.
	pub fn empty() -> Self {
		Self(Arc::from([]))
	}

	#[inline]
	pub fn as_slice(&self) -> &[DescriptorId] {
		&self.0
	}
}

impl Deref for Linearization {
	type Target = [DescriptorId];

	fn deref(&self) -> &[DescriptorId] {
		&self.0
	}
}

impl From<Vec<DescriptorId>> for Linearization {
	fn from(ids: Vec<DescriptorId>) -> Self {
		Self(ids.into())
	}
}

impl fmt::Debug for Linearization {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.0.iter().map(|id| id.index)).finish()
	}
}

/// Whether a descriptor is an explicit interface or stands for a Rust type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
	Interface,
	Concrete(TypeId),
}

/// Handle to a node of a [`CapabilityGraph`].
///
/// Cheap to clone; equality and hashing use the id only.
#[derive(Clone)]
pub struct Descriptor {
	id: DescriptorId,
	name: Arc<str>,
	linearization: Linearization,
}

impl Descriptor {
	#[inline]
	pub fn id(&self) -> DescriptorId {
		self.id
	}

	#[inline]
	pub fn name(&self) -> &str {
		&self.name
	}

	/// This descriptor followed by all of its ancestors.
	#[inline]
	pub fn linearization(&self) -> &Linearization {
		&self.linearization
	}

	/// Returns true if `other` is this descriptor or one of its ancestors.
	pub fn extends(&self, other: &Descriptor) -> bool {
		self.linearization.contains(&other.id)
	}
}

impl PartialEq for Descriptor {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for Descriptor {}

impl std::hash::Hash for Descriptor {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl fmt::Debug for Descriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "<Descriptor {}>", self.name)
	}
}

impl fmt::Display for Descriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name)
	}
}

struct Node {
	descriptor: Descriptor,
	parents: Box<[DescriptorId]>,
	kind: DescriptorKind,
}

#[derive(Default)]
struct Arena {
	nodes: Vec<Node>,
	by_name: FxHashMap<Arc<str>, DescriptorId>,
	by_type: FxHashMap<TypeId, DescriptorId>,
}

/// Append-only arena of capability descriptors.
pub struct CapabilityGraph {
	id: u32,
	arena: RwLock<Arena>,
}

impl Default for CapabilityGraph {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for CapabilityGraph {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CapabilityGraph")
			.field("id", &self.id)
			.field("len", &self.len())
			.finish()
	}
}

impl CapabilityGraph {
	pub fn new() -> Self {
		Self {
			id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
			arena: RwLock::new(Arena::default()),
		}
	}

	/// Process-unique id of this graph.
	#[inline]
	pub fn id(&self) -> u32 {
		self.id
	}

	/// Defines an interface descriptor with the given parents, earliest first.
	pub fn define(&self, name: &str, parents: &[&Descriptor]) -> Result<Descriptor, GraphError> {
		self.insert(name, parents, DescriptorKind::Interface)
	}

	/// Defines the descriptor standing for the concrete type `T`.
	///
	/// `parents` lists the interfaces `T` implements and the descriptors of
	/// the types it specializes.
	pub fn define_type<T: Any>(&self, parents: &[&Descriptor]) -> Result<Descriptor, GraphError> {
		self.insert(
			std::any::type_name::<T>(),
			parents,
			DescriptorKind::Concrete(TypeId::of::<T>()),
		)
	}

	fn insert(&self, name: &str, parents: &[&Descriptor], kind: DescriptorKind) -> Result<Descriptor, GraphError> {
		let mut arena = self.arena.write();

		let taken = arena.by_name.contains_key(name)
			|| matches!(kind, DescriptorKind::Concrete(type_id) if arena.by_type.contains_key(&type_id));
		if taken {
			return Err(GraphError::DuplicateName { name: name.to_owned() });
		}
		if let Some(foreign) = parents.iter().find(|parent| !owns(self.id, &arena, parent)) {
			return Err(GraphError::ForeignDescriptor {
				name: foreign.name().to_owned(),
			});
		}

		let id = DescriptorId {
			graph: self.id,
			index: arena.nodes.len() as u32,
		};
		let parent_ids: Box<[DescriptorId]> = parents.iter().map(|parent| parent.id).collect();
		let parent_linearizations: SmallVec<[&[DescriptorId]; 4]> =
			parents.iter().map(|parent| parent.linearization.as_slice()).collect();

		let linearization = c3::linearize(Some(id), &parent_linearizations, &parent_ids).ok_or_else(|| {
			GraphError::InconsistentHierarchy {
				name: name.to_owned(),
				parents: parents.iter().map(|parent| parent.name().to_owned()).collect(),
			}
		})?;

		let name: Arc<str> = Arc::from(name);
		let descriptor = Descriptor {
			id,
			name: name.clone(),
			linearization: linearization.into(),
		};

		arena.by_name.insert(name, id);
		if let DescriptorKind::Concrete(type_id) = kind {
			arena.by_type.insert(type_id, id);
		}
		arena.nodes.push(Node {
			descriptor: descriptor.clone(),
			parents: parent_ids,
			kind,
		});

		tracing::trace!(graph = self.id, descriptor = %descriptor, ?kind, "defined descriptor");
		Ok(descriptor)
	}

	/// Looks up a descriptor by name.
	pub fn get(&self, name: &str) -> Option<Descriptor> {
		let arena = self.arena.read();
		let id = *arena.by_name.get(name)?;
		Some(arena.nodes[id.index as usize].descriptor.clone())
	}

	/// Resolves an id created by this graph.
	pub fn descriptor(&self, id: DescriptorId) -> Option<Descriptor> {
		if id.graph != self.id {
			return None;
		}
		self.arena
			.read()
			.nodes
			.get(id.index as usize)
			.map(|node| node.descriptor.clone())
	}

	/// Declared parents of `descriptor`, in declaration order.
	pub fn parents(&self, descriptor: &Descriptor) -> Option<Vec<Descriptor>> {
		let arena = self.arena.read();
		if !owns(self.id, &arena, descriptor) {
			return None;
		}
		let node = &arena.nodes[descriptor.id.index as usize];
		Some(
			node.parents
				.iter()
				.map(|parent| arena.nodes[parent.index as usize].descriptor.clone())
				.collect(),
		)
	}

	/// Kind of a descriptor of this graph.
	pub fn kind(&self, descriptor: &Descriptor) -> Option<DescriptorKind> {
		let arena = self.arena.read();
		owns(self.id, &arena, descriptor).then(|| arena.nodes[descriptor.id.index as usize].kind)
	}

	/// Descriptor declared for the concrete type `T`.
	pub fn type_descriptor<T: Any>(&self) -> Option<Descriptor> {
		self.type_descriptor_of(TypeId::of::<T>())
	}

	/// Descriptor declared for the concrete type identified by `type_id`.
	pub fn type_descriptor_of(&self, type_id: TypeId) -> Option<Descriptor> {
		let arena = self.arena.read();
		let id = *arena.by_type.get(&type_id)?;
		Some(arena.nodes[id.index as usize].descriptor.clone())
	}

	/// Returns true if `descriptor` was created by this graph.
	pub fn contains(&self, descriptor: &Descriptor) -> bool {
		owns(self.id, &self.arena.read(), descriptor)
	}

	pub fn len(&self) -> usize {
		self.arena.read().nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Wraps `value`, presenting the descriptor declared for its type.
	///
	/// Values of undeclared types present an empty capability set.
	pub fn object<T: Any + Send + Sync>(&self, value: T) -> Object {
		let provided = self
			.type_descriptor::<T>()
			.map_or_else(Linearization::empty, |descriptor| descriptor.linearization);
		Object::with_provided(value, provided)
	}

	/// Wraps `value`, presenting `direct` ahead of its type's descriptor.
	///
	/// The capability set is the C3 merge of the direct descriptors followed
	/// by the type descriptor, computed here once. Direct descriptors the
	/// type descriptor already extends add nothing and are skipped.
	pub fn object_providing<T: Any + Send + Sync>(&self, value: T, direct: &[&Descriptor]) -> Result<Object, GraphError> {
		let type_descriptor = self.type_descriptor::<T>();

		{
			let arena = self.arena.read();
			if let Some(foreign) = direct.iter().find(|base| !owns(self.id, &arena, base)) {
				return Err(GraphError::ForeignDescriptor {
					name: foreign.name().to_owned(),
				});
			}
		}

		let mut bases: SmallVec<[&Descriptor; 4]> = direct
			.iter()
			.copied()
			.filter(|base| !type_descriptor.as_ref().is_some_and(|declared| declared.extends(base)))
			.collect();
		bases.extend(type_descriptor.as_ref());

		let base_ids: SmallVec<[DescriptorId; 4]> = bases.iter().map(|base| base.id).collect();
		let base_linearizations: SmallVec<[&[DescriptorId]; 4]> =
			bases.iter().map(|base| base.linearization.as_slice()).collect();
		let provided = c3::linearize(None, &base_linearizations, &base_ids).ok_or_else(|| GraphError::InconsistentHierarchy {
			name: std::any::type_name::<T>().to_owned(),
			parents: bases.iter().map(|base| base.name().to_owned()).collect(),
		})?;

		Ok(Object::with_provided(value, provided.into()))
	}
}

fn owns(graph: u32, arena: &Arena, descriptor: &Descriptor) -> bool {
	descriptor.id.graph == graph && (descriptor.id.index as usize) < arena.nodes.len()
}
