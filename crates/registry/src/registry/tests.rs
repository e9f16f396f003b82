use std::sync::Arc;

use pretty_assertions::assert_eq;
use rstest::rstest;

use super::{DuplicatePolicy, InsertAction, Registry, RegistryOptions};
use crate::component::{Component, Factory, Source};
use crate::error::{InvocationFailure, RegistryError};
use crate::graph::{CapabilityGraph, Descriptor};
use crate::object::Object;

struct Alpha;
struct Beta;
struct Undeclared;

struct Adapted {
	sources: Vec<Object>,
}

struct Fixture {
	graph: Arc<CapabilityGraph>,
	i_alpha: Descriptor,
	i_beta: Descriptor,
	i_target: Descriptor,
}

impl Fixture {
	fn new() -> Self {
		let graph = Arc::new(CapabilityGraph::new());
		let i_alpha = graph.define("IAlpha", &[]).unwrap();
		let i_beta = graph.define("IBeta", &[]).unwrap();
		let i_target = graph.define("ITarget", &[]).unwrap();
		graph.define_type::<Alpha>(&[&i_alpha]).unwrap();
		graph.define_type::<Beta>(&[&i_beta]).unwrap();
		Self {
			graph,
			i_alpha,
			i_beta,
			i_target,
		}
	}

	fn registry(&self) -> Registry {
		Registry::new(self.graph.clone())
	}

	fn registry_with(&self, duplicates: DuplicatePolicy) -> Registry {
		Registry::with_options(
			self.graph.clone(),
			RegistryOptions {
				label: "test",
				duplicates,
			},
		)
	}

	fn alpha(&self) -> Object {
		self.graph.object(Alpha)
	}

	fn beta(&self) -> Object {
		self.graph.object(Beta)
	}
}

/// Factory wrapping its sources in an [`Adapted`].
fn adapted_factory(arity: usize) -> Factory {
	Factory::new("Adapted", arity, |objects| {
		Ok(Object::new(Adapted {
			sources: objects.to_vec(),
		}))
	})
}

fn found_object(component: Option<Component>) -> Object {
	component
		.and_then(|component| component.as_object().cloned())
		.expect("utility component")
}

#[test]
fn test_utility_no_source() {
	let fx = Fixture::new();
	let reg = fx.registry();
	let foo = Object::new("foo");
	reg.register(&[], &fx.i_target, "", foo.clone()).unwrap();

	assert!(found_object(reg.lookup(&[], &fx.i_target, "")).ptr_eq(&foo));
}

#[test]
fn test_utility_one_source() {
	let fx = Fixture::new();
	let reg = fx.registry();
	let foo = Object::new("foo");
	reg.register(&[(&fx.i_alpha).into()], &fx.i_target, "", foo.clone())
		.unwrap();

	assert!(found_object(reg.lookup(&[fx.alpha()], &fx.i_target, "")).ptr_eq(&foo));
}

#[test]
fn test_utility_two_sources() {
	let fx = Fixture::new();
	let reg = fx.registry();
	let foo = Object::new("foo");
	reg.register(
		&[(&fx.i_alpha).into(), (&fx.i_beta).into()],
		&fx.i_target,
		"",
		foo.clone(),
	)
	.unwrap();

	assert!(found_object(reg.lookup(&[fx.alpha(), fx.beta()], &fx.i_target, "")).ptr_eq(&foo));
	assert!(reg.lookup(&[fx.beta(), fx.alpha()], &fx.i_target, "").is_none());
}

#[test]
fn test_type_based_registration() {
	let fx = Fixture::new();
	let reg = fx.registry();
	let foo = Object::new("foo");
	reg.register(&[Source::of::<Alpha>()], &fx.i_target, "", foo.clone())
		.unwrap();

	assert!(found_object(reg.lookup(&[fx.alpha()], &fx.i_target, "")).ptr_eq(&foo));
}

#[test]
fn test_type_inheritance() {
	struct Gamma;
	struct Delta;

	let fx = Fixture::new();
	let gamma = fx.graph.define_type::<Gamma>(&[]).unwrap();
	fx.graph.define_type::<Delta>(&[&gamma]).unwrap();
	let reg = fx.registry();
	let foo = Object::new("foo");
	reg.register(&[Source::of::<Gamma>()], &fx.i_target, "", foo.clone())
		.unwrap();

	let delta = fx.graph.object(Delta);
	assert!(found_object(reg.lookup(&[delta], &fx.i_target, "")).ptr_eq(&foo));
}

#[test]
fn test_not_found() {
	let fx = Fixture::new();
	let reg = fx.registry();

	assert!(reg.lookup(&[], &fx.i_target, "").is_none());
	assert!(reg.lookup(&[fx.alpha()], &fx.i_target, "").is_none());
	assert!(reg.adapt(&[fx.alpha()], &fx.i_target, "").unwrap().is_none());
}

#[test]
fn test_utility_to_itself() {
	let fx = Fixture::new();
	let reg = fx.registry();
	let foo = Object::new("foo");
	reg.register(&[(&fx.i_alpha).into()], &fx.i_alpha, "", foo.clone())
		.unwrap();

	// plain lookup never self-adapts
	assert!(found_object(reg.lookup(&[fx.alpha()], &fx.i_alpha, "")).ptr_eq(&foo));
}

#[test]
fn test_adapter_no_source() {
	let fx = Fixture::new();
	let reg = fx.registry();
	let foo = Object::new("foo");
	let produced = foo.clone();
	reg.register(
		&[],
		&fx.i_target,
		"",
		Component::adapter("factory", 0, move |_| Ok(produced.clone())),
	)
	.unwrap();

	let adapted = reg.adapt(&[], &fx.i_target, "").unwrap().unwrap();
	assert!(adapted.ptr_eq(&foo));
}

#[test]
fn test_adapter_one_source() {
	let fx = Fixture::new();
	let reg = fx.registry();
	reg.register(&[(&fx.i_alpha).into()], &fx.i_target, "", adapted_factory(1))
		.unwrap();

	let alpha = fx.alpha();
	let adapted = reg
		.adapt(std::slice::from_ref(&alpha), &fx.i_target, "")
		.unwrap()
		.unwrap();
	let adapted = adapted.downcast_ref::<Adapted>().unwrap();
	assert_eq!(adapted.sources.len(), 1);
	assert!(adapted.sources[0].ptr_eq(&alpha));
}

#[test]
fn test_adapter_to_itself_wins_over_registration() {
	let fx = Fixture::new();
	let reg = fx.registry();
	let alpha = fx.alpha();

	let adapted = reg
		.adapt(std::slice::from_ref(&alpha), &fx.i_alpha, "")
		.unwrap()
		.unwrap();
	assert!(adapted.ptr_eq(&alpha));

	reg.register(&[(&fx.i_alpha).into()], &fx.i_alpha, "", adapted_factory(1))
		.unwrap();
	let adapted = reg
		.adapt(std::slice::from_ref(&alpha), &fx.i_alpha, "")
		.unwrap()
		.unwrap();
	assert!(adapted.ptr_eq(&alpha));
}

#[test]
fn test_adapter_two_sources() {
	let fx = Fixture::new();
	let reg = fx.registry();
	reg.register(
		&[(&fx.i_alpha).into(), (&fx.i_beta).into()],
		&fx.i_target,
		"",
		adapted_factory(2),
	)
	.unwrap();

	let objects = [fx.alpha(), fx.beta()];
	let adapted = reg.adapt(&objects, &fx.i_target, "").unwrap().unwrap();
	let adapted = adapted.downcast_ref::<Adapted>().unwrap();
	assert!(adapted.sources[0].ptr_eq(&objects[0]));
	assert!(adapted.sources[1].ptr_eq(&objects[1]));
}

#[test]
fn test_names_partition_registrations() {
	let fx = Fixture::new();
	let reg = fx.registry();
	let named = Object::new("named");
	let unnamed = Object::new("unnamed");
	reg.register(&[(&fx.i_alpha).into()], &fx.i_target, "x", named.clone())
		.unwrap();

	assert!(reg.lookup(&[fx.alpha()], &fx.i_target, "").is_none());
	assert!(found_object(reg.lookup(&[fx.alpha()], &fx.i_target, "x")).ptr_eq(&named));

	reg.register(&[(&fx.i_alpha).into()], &fx.i_target, "", unnamed.clone())
		.unwrap();
	assert!(found_object(reg.lookup(&[fx.alpha()], &fx.i_target, "")).ptr_eq(&unnamed));
	assert!(found_object(reg.lookup(&[fx.alpha()], &fx.i_target, "x")).ptr_eq(&named));
	assert!(reg.lookup(&[fx.alpha()], &fx.i_beta, "x").is_none());
}

#[test]
fn test_utility_is_not_callable() {
	let fx = Fixture::new();
	let reg = fx.registry();
	reg.register(&[(&fx.i_alpha).into()], &fx.i_target, "", Object::new("foo"))
		.unwrap();

	let err = reg.adapt(&[fx.alpha()], &fx.i_target, "").unwrap_err();
	assert!(matches!(err.reason, InvocationFailure::NotCallable));
	assert_eq!(err.target, "ITarget");
}

#[test]
fn test_arity_mismatch_names_the_component() {
	let fx = Fixture::new();
	let reg = fx.registry();
	reg.register(&[(&fx.i_alpha).into()], &fx.i_target, "", adapted_factory(2))
		.unwrap();

	let err = reg.adapt(&[fx.alpha()], &fx.i_target, "").unwrap_err();
	assert!(matches!(
		err.reason,
		InvocationFailure::ArityMismatch { expected: 2, given: 1 }
	));
	let message = err.to_string();
	assert!(message.contains("Adapted"), "{message}");
	assert!(message.contains("takes exactly 2 argument(s) (1 given)"), "{message}");
}

#[test]
fn test_factory_failure_is_reported() {
	let fx = Fixture::new();
	let reg = fx.registry();
	reg.register(
		&[(&fx.i_alpha).into()],
		&fx.i_target,
		"",
		Component::adapter("broken", 1, |_| Err("no luck".into())),
	)
	.unwrap();

	let err = reg.adapt(&[fx.alpha()], &fx.i_target, "").unwrap_err();
	assert_eq!(err.component, "broken");
	assert!(matches!(&err.reason, InvocationFailure::Failed(inner) if inner.to_string() == "no luck"));
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(2)]
#[case(3)]
fn test_register_then_adapt_at_arity(#[case] arity: usize) {
	let fx = Fixture::new();
	let reg = fx.registry();
	let sources: Vec<Source> = (0..arity).map(|_| (&fx.i_alpha).into()).collect();
	let objects: Vec<Object> = (0..arity).map(|_| fx.alpha()).collect();
	reg.register(&sources, &fx.i_target, "", adapted_factory(arity))
		.unwrap();

	let adapted = reg.adapt(&objects, &fx.i_target, "").unwrap().unwrap();
	let adapted = adapted.downcast_ref::<Adapted>().unwrap();
	assert_eq!(adapted.sources.len(), arity);
	assert!(
		adapted
			.sources
			.iter()
			.zip(&objects)
			.all(|(got, sent)| got.ptr_eq(sent))
	);
}

#[rstest]
#[case(DuplicatePolicy::Replace, InsertAction::ReplacedExisting, "second")]
#[case(DuplicatePolicy::KeepExisting, InsertAction::KeptExisting, "first")]
fn test_duplicate_policy(#[case] policy: DuplicatePolicy, #[case] action: InsertAction, #[case] winner: &str) {
	let fx = Fixture::new();
	let reg = fx.registry_with(policy);
	let source: Source = (&fx.i_alpha).into();

	assert_eq!(
		reg.register(std::slice::from_ref(&source), &fx.i_target, "", Object::new("first")),
		Ok(InsertAction::InsertedNew)
	);
	assert_eq!(
		reg.register(std::slice::from_ref(&source), &fx.i_target, "", Object::new("second")),
		Ok(action)
	);
	assert_eq!(reg.len(), 1);

	let found = found_object(reg.lookup(&[fx.alpha()], &fx.i_target, ""));
	assert_eq!(found.downcast_ref::<&'static str>(), Some(&winner));
}

#[test]
fn test_duplicate_policy_reject() {
	let fx = Fixture::new();
	let reg = fx.registry_with(DuplicatePolicy::Reject);
	let source: Source = (&fx.i_alpha).into();
	reg.register(std::slice::from_ref(&source), &fx.i_target, "", Object::new("first"))
		.unwrap();

	assert_eq!(
		reg.register(std::slice::from_ref(&source), &fx.i_target, "", Object::new("second")),
		Err(RegistryError::DuplicateRejected {
			sources: vec!["IAlpha".to_owned()],
			target: "ITarget".to_owned(),
			name: String::new(),
		})
	);
}

#[test]
fn test_unregister_prunes_partitions() {
	let fx = Fixture::new();
	let reg = fx.registry();
	let source: Source = (&fx.i_alpha).into();
	reg.register(std::slice::from_ref(&source), &fx.i_target, "", Object::new("foo"))
		.unwrap();
	assert!(!reg.is_empty());

	let removed = reg
		.unregister(std::slice::from_ref(&source), &fx.i_target, "")
		.unwrap();
	assert!(removed.as_object().is_some());
	assert!(reg.is_empty());
	assert!(reg.lookup(&[fx.alpha()], &fx.i_target, "").is_none());

	assert!(matches!(
		reg.unregister(std::slice::from_ref(&source), &fx.i_target, ""),
		Err(RegistryError::NotRegistered { .. })
	));
}

#[test]
fn test_invalid_sources_and_targets() {
	let fx = Fixture::new();
	let reg = fx.registry();
	let other = CapabilityGraph::new();
	let foreign = other.define("Foreign", &[]).unwrap();

	assert_eq!(
		reg.register(
			&[(&fx.i_alpha).into(), Source::of::<Undeclared>()],
			&fx.i_target,
			"",
			Object::new("foo"),
		),
		Err(RegistryError::InvalidSource {
			position: 1,
			label: std::any::type_name::<Undeclared>().to_owned(),
			reason: "type has no declared descriptor",
		})
	);
	assert!(matches!(
		reg.register(&[(&foreign).into()], &fx.i_target, "", Object::new("foo")),
		Err(RegistryError::InvalidSource { position: 0, .. })
	));
	assert_eq!(
		reg.register(&[], &foreign, "", Object::new("foo")),
		Err(RegistryError::InvalidTarget {
			target: "Foreign".to_owned(),
		})
	);
	assert!(reg.is_empty());
}

#[test]
fn test_lookup_all_and_subscribers() {
	let fx = Fixture::new();
	let reg = fx.registry();
	let by_type = Object::new("by type");
	reg.register(&[Source::of::<Alpha>()], &fx.i_target, "", by_type.clone())
		.unwrap();
	reg.register(&[(&fx.i_alpha).into()], &fx.i_target, "", adapted_factory(1))
		.unwrap();

	let alpha = fx.alpha();
	let all = reg.lookup_all(std::slice::from_ref(&alpha), &fx.i_target, "");
	assert_eq!(all.len(), 2);
	assert!(all[0].as_object().unwrap().ptr_eq(&by_type));
	assert_eq!(all[1].label(), "Adapted");

	let subscribers = reg
		.subscribers(std::slice::from_ref(&alpha), &fx.i_target, "")
		.unwrap();
	assert_eq!(subscribers.len(), 2);
	assert!(subscribers[0].ptr_eq(&by_type));
	let adapted = subscribers[1].downcast_ref::<Adapted>().unwrap();
	assert!(adapted.sources[0].ptr_eq(&alpha));

	assert!(reg.lookup_all(&[fx.beta()], &fx.i_target, "").is_empty());
}

#[test]
fn test_factory_may_reenter_registry() {
	let fx = Fixture::new();
	let reg = Arc::new(fx.registry());
	let weak = Arc::downgrade(&reg);
	let i_beta = fx.i_beta.clone();
	let i_target = fx.i_target.clone();
	reg.register(
		&[(&fx.i_alpha).into()],
		&fx.i_target,
		"",
		Component::adapter("reentrant", 1, move |_| {
			let reg = weak.upgrade().ok_or("registry dropped")?;
			reg.register(&[(&i_beta).into()], &i_target, "", Object::new("late"))?;
			Ok(Object::new("done"))
		}),
	)
	.unwrap();

	let done = reg.adapt(&[fx.alpha()], &fx.i_target, "").unwrap().unwrap();
	assert_eq!(done.downcast_ref::<&'static str>(), Some(&"done"));
	assert!(reg.lookup(&[fx.beta()], &fx.i_target, "").is_some());
}
