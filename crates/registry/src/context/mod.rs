#![cfg_attr(doc, allow(rustdoc::private_intra_doc_links))]
//! Ambient, thread-scoped default lookup.
//!
//! # Role
//!
//! An [`ExecutionContext`] lets callers resolve components without passing a
//! registry around. It holds one shared base [`Registry`] and, per thread, an
//! optional override of the lookup used by that thread.
//!
//! # Invariants
//!
//! - Fail closed: before `initialize` and after `clear`, every read reports a
//!   [`ContextError`] instead of falling back to an empty registry.
//!   - Enforced in: [`ExecutionContext::current_lookup`].
//!   - Tested by: `context::tests::test_uninitialized_context_fails_closed`.
//! - Overrides do not cross threads: a thread that never called
//!   `set_lookup` resolves to the current base, whatever its spawner did.
//!   - Enforced in: [`Overrides`] (keyed by [`ThreadId`]).
//!   - Tested by: `context::tests::test_override_is_not_inherited_by_spawned_threads`.
//! - `initialize` and `clear` drop every thread's override, including
//!   threads that are not running at that moment.
//!   - Enforced in: [`ExecutionContext::replace_base`].
//!   - Tested by: `context::tests::test_reinitialize_discards_overrides_on_every_thread`.
//!   - Failure symptom: a thread keeps answering from a registry that was cleared.
//! - Overrides are owned by their context: dropping the context, or
//!   re-initializing it, releases every overriding lookup.
//!   - Enforced in: [`ExecutionContext`] (the table is a field, not thread-local storage).
//!   - Tested by: `context::tests::test_clear_releases_overrides_of_other_threads`.
//!   - Tested by: `context::tests::test_overrides_are_released_with_the_context`.
//!
//! An override set by a thread that has since exited stays in the table
//! until the next `initialize`, `clear` or drop of the context.


use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::thread::{self, ThreadId};

use arc_swap::ArcSwapOption;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::component::{Component, Source};
use crate::error::{ContextError, DispatchError};
use crate::graph::{CapabilityGraph, Descriptor};
use crate::lookup::{Lookup, LookupExt};
use crate::object::Object;
use crate::registry::{InsertAction, Registry, self_adapted};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Per-thread lookup overrides of one context.
#[derive(Default)]
struct Overrides {
	/// Bumped by every `initialize` and `clear`.
	epoch: u64,
	by_thread: FxHashMap<ThreadId, Arc<dyn Lookup>>,
}

/// Shared base registry plus per-thread lookup overrides.
pub struct ExecutionContext {
	id: u64,
	base: ArcSwapOption<Registry>,
	/// Writers hold this lock while swapping `base`.
	overrides: RwLock<Overrides>,
}

impl Default for ExecutionContext {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for ExecutionContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let overrides = self.overrides.read();
		f.debug_struct("ExecutionContext")
			.field("id", &self.id)
			.field("epoch", &overrides.epoch)
			.field("overrides", &overrides.by_thread.len())
			.field("initialized", &self.is_initialized())
			.finish()
	}
}

impl ExecutionContext {
	/// Creates an uninitialized context.
	pub fn new() -> Self {
		Self {
			id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
			base: ArcSwapOption::empty(),
			overrides: RwLock::new(Overrides::default()),
		}
	}

	/// Installs a fresh registry over `graph` as the base and returns it.
	pub fn initialize(&self, graph: Arc<CapabilityGraph>) -> Arc<Registry> {
		let registry = Arc::new(Registry::new(graph));
		self.initialize_with_registry(registry.clone());
		registry
	}

	/// Installs `registry` as the base, discarding every thread's override.
	pub fn initialize_with_registry(&self, registry: Arc<Registry>) {
		let label = registry.label();
		let (epoch, dropped) = self.replace_base(Some(registry));
		tracing::debug!(context = self.id, epoch, dropped, registry = label, "initialized execution context");
	}

	/// Removes the base, returning to the fail-closed state.
	pub fn clear(&self) {
		let (epoch, dropped) = self.replace_base(None);
		tracing::debug!(context = self.id, epoch, dropped, "cleared execution context");
	}

	pub fn is_initialized(&self) -> bool {
		self.base.load().is_some()
	}

	/// The base registry.
	pub fn registry(&self) -> Result<Arc<Registry>, ContextError> {
		self.base.load_full().ok_or(ContextError::NoImplicitRegistry)
	}

	/// The base registry, as a lookup.
	pub fn base_lookup(&self) -> Result<Arc<dyn Lookup>, ContextError> {
		self.base
			.load_full()
			.map(|registry| registry as Arc<dyn Lookup>)
			.ok_or(ContextError::NoImplicitLookup)
	}

	/// Lookup used by the calling thread: its override if set since the
	/// last `initialize`, the base otherwise.
	pub fn current_lookup(&self) -> Result<Arc<dyn Lookup>, ContextError> {
		let overrides = self.overrides.read();
		let base = self.base_lookup()?;
		Ok(overrides
			.by_thread
			.get(&thread::current().id())
			.cloned()
			.unwrap_or(base))
	}

	/// Overrides the lookup of the calling thread only.
	pub fn set_lookup(&self, lookup: Arc<dyn Lookup>) -> Result<(), ContextError> {
		let mut overrides = self.overrides.write();
		if !self.is_initialized() {
			return Err(ContextError::NoImplicitLookup);
		}
		overrides.by_thread.insert(thread::current().id(), lookup);
		tracing::debug!(context = self.id, epoch = overrides.epoch, "set thread lookup override");
		Ok(())
	}

	/// Returns the calling thread to the base lookup.
	pub fn reset_lookup(&self) {
		self.overrides.write().by_thread.remove(&thread::current().id());
	}

	/// Number of threads currently overriding the base.
	pub fn override_count(&self) -> usize {
		self.overrides.read().by_thread.len()
	}

	/// Registers a component in the base registry.
	pub fn register(
		&self,
		sources: &[Source],
		target: &Descriptor,
		name: &str,
		component: impl Into<Component>,
	) -> Result<InsertAction, DispatchError> {
		Ok(self.registry()?.register(sources, target, name, component)?)
	}

	/// Resolves a component through the calling thread's lookup.
	pub fn component(&self, objects: &[Object], target: &Descriptor, name: &str) -> Result<Component, DispatchError> {
		Ok(self.current_lookup()?.component(objects, target, name)?)
	}

	/// Adapts `objects` through the calling thread's lookup.
	///
	/// Self-adaptation needs no lookup, so it succeeds on an uninitialized
	/// context too.
	pub fn adapter(&self, objects: &[Object], target: &Descriptor, name: &str) -> Result<Object, DispatchError> {
		if let Some(object) = self_adapted(objects, target) {
			return Ok(object);
		}
		self.current_lookup()?.adapter(objects, target, name)
	}

	/// Initializes with `registry` until the returned guard is dropped.
	pub fn install(&self, registry: Arc<Registry>) -> ContextGuard<'_> {
		self.initialize_with_registry(registry);
		ContextGuard { context: self }
	}

	/// Swaps the base and drops all overrides under one write lock, so no
	/// reader pairs a new base with an old override.
	fn replace_base(&self, base: Option<Arc<Registry>>) -> (u64, usize) {
		let (epoch, previous, stale) = {
			let mut overrides = self.overrides.write();
			let previous = self.base.swap(base);
			overrides.epoch += 1;
			(overrides.epoch, previous, std::mem::take(&mut overrides.by_thread))
		};
		// released after the lock so their destructors may use this context
		drop(previous);
		(epoch, stale.len())
	}
}

/// Clears its context when dropped.
#[must_use = "the context is cleared as soon as the guard is dropped"]
pub struct ContextGuard<'a> {
	context: &'a ExecutionContext,
}

impl ContextGuard<'_> {
	pub fn context(&self) -> &ExecutionContext {
		self.context
	}
}

impl Drop for ContextGuard<'_> {
	fn drop(&mut self) {
		self.context.clear();
	}
}

static IMPLICIT: LazyLock<ExecutionContext> = LazyLock::new(ExecutionContext::new);

/// The process-wide execution context.
pub fn implicit() -> &'static ExecutionContext {
	&IMPLICIT
}

/// Lookup of the calling thread in the process-wide context.
///
/// An error means no ambient context is configured; a configured lookup
/// that finds nothing is a separate, later outcome.
pub fn find_ambient_lookup() -> Result<Arc<dyn Lookup>, ContextError> {
	implicit().current_lookup()
}
