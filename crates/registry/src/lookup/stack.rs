use std::sync::Arc;

use parking_lot::RwLock;

use super::{ChainLookup, Lookup};
use crate::component::Component;
use crate::error::{ComponentInvocationError, StackUnderflowError};
use crate::graph::Descriptor;
use crate::object::Object;
use crate::registry::self_adapted;

struct Frame {
	overlay: Arc<dyn Lookup>,
	/// `overlay` chained onto the previous top.
	top: Arc<dyn Lookup>,
}

/// Base lookup with a stack of overlays pushed on top of it.
///
/// Pushing a lookup makes it consulted first, with the previous top as its
/// fallback. The base can never be popped.
pub struct LookupStack {
	base: Arc<dyn Lookup>,
	frames: RwLock<Vec<Frame>>,
}

impl LookupStack {
	pub fn new(base: Arc<dyn Lookup>) -> Self {
		Self {
			base,
			frames: RwLock::new(Vec::new()),
		}
	}

	/// Installs `overlay` as the new top.
	pub fn push(&self, overlay: Arc<dyn Lookup>) {
		let mut frames = self.frames.write();
		let below = frames.last().map_or_else(|| self.base.clone(), |frame| frame.top.clone());
		let top: Arc<dyn Lookup> = Arc::new(ChainLookup::new(overlay.clone(), below));
		frames.push(Frame { overlay, top });
		tracing::debug!(depth = frames.len(), "pushed lookup overlay");
	}

	/// Removes the most recently pushed overlay and returns it.
	pub fn pop(&self) -> Result<Arc<dyn Lookup>, StackUnderflowError> {
		let mut frames = self.frames.write();
		let frame = frames.pop().ok_or(StackUnderflowError)?;
		tracing::debug!(depth = frames.len(), "popped lookup overlay");
		Ok(frame.overlay)
	}

	/// Number of overlays above the base.
	pub fn depth(&self) -> usize {
		self.frames.read().len()
	}

	/// Lookup currently answering for the stack.
	pub fn top(&self) -> Arc<dyn Lookup> {
		self.frames
			.read()
			.last()
			.map_or_else(|| self.base.clone(), |frame| frame.top.clone())
	}

	pub fn base(&self) -> &Arc<dyn Lookup> {
		&self.base
	}
}

impl std::fmt::Debug for LookupStack {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LookupStack")
			.field("depth", &self.depth())
			.finish_non_exhaustive()
	}
}

impl Lookup for LookupStack {
	fn lookup(&self, objects: &[Object], target: &Descriptor, name: &str) -> Option<Component> {
		self.top().lookup(objects, target, name)
	}

	fn adapt(&self, objects: &[Object], target: &Descriptor, name: &str) -> Result<Option<Object>, ComponentInvocationError> {
		if let Some(object) = self_adapted(objects, target) {
			return Ok(Some(object));
		}
		self.top().adapt(objects, target, name)
	}
}
