//! Instance construction: stage order, both binding paths, error
//! propagation and mounting.

mod common;

use common::{counting_runtime, internal_options, render_fn, runtime_with, scope, Log};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use weft_runtime::{
    keys, DefinitionId, DiagnosticKind, EffectiveOptions, EventsInstaller, InjectionResolver,
    Instance, InternalComponentOptions, LifecycleInstaller, LifecycleStage, Mounter, OptionValue,
    Options, ProvideResolver, Registry, RenderInstaller, RenderNode, RenderOverride, Runtime,
    RuntimeConfig, RuntimeError, StateResolver, Subsystems, Uid,
};

/// Collaborator that records its label and the stage it was called at.
#[derive(Clone)]
struct Step {
    log: Log,
    label: &'static str,
}

impl Step {
    fn new(log: &Log, label: &'static str) -> Self {
        Self {
            log: log.clone(),
            label,
        }
    }

    fn record(&self, instance: &Instance) -> anyhow::Result<()> {
        self.log.push(format!("{}@{:?}", self.label, instance.stage()));
        Ok(())
    }
}

impl LifecycleInstaller for Step {
    fn init_lifecycle(&self, instance: &mut Instance) -> anyhow::Result<()> {
        self.record(instance)
    }
}

impl EventsInstaller for Step {
    fn init_events(&self, instance: &mut Instance) -> anyhow::Result<()> {
        self.record(instance)
    }
}

impl RenderInstaller for Step {
    fn init_render(&self, instance: &mut Instance) -> anyhow::Result<()> {
        self.record(instance)
    }
}

impl InjectionResolver for Step {
    fn resolve_injections(&self, instance: &mut Instance) -> anyhow::Result<()> {
        self.record(instance)
    }
}

impl StateResolver for Step {
    fn resolve_state(&self, instance: &mut Instance) -> anyhow::Result<()> {
        self.record(instance)
    }
}

impl ProvideResolver for Step {
    fn resolve_provide(&self, instance: &mut Instance) -> anyhow::Result<()> {
        self.record(instance)
    }
}

impl Mounter for Step {
    fn mount(
        &self,
        _runtime: &mut Runtime,
        instance: &mut Instance,
        _target: &OptionValue,
    ) -> anyhow::Result<()> {
        self.record(instance)
    }
}

fn recording_subsystems(log: &Log) -> Subsystems {
    Subsystems::default()
        .with_lifecycle(Step::new(log, "lifecycle"))
        .with_events(Step::new(log, "events"))
        .with_render(Step::new(log, "render"))
        .with_injections(Step::new(log, "injections"))
        .with_state(Step::new(log, "state"))
        .with_provide(Step::new(log, "provide"))
        .with_mount(Step::new(log, "mount"))
}

#[derive(Debug, thiserror::Error)]
#[error("state backend unavailable")]
struct StateUnavailable;

struct FailingState;

impl StateResolver for FailingState {
    fn resolve_state(&self, _instance: &mut Instance) -> anyhow::Result<()> {
        Err(StateUnavailable.into())
    }
}

// ================================================================
// Identity
// ================================================================

#[test]
fn uids_are_sequential_across_both_paths() {
    let (mut runtime, _) = counting_runtime(RuntimeConfig::production());
    let root = runtime.define(Options::new());

    let mut uids = Vec::new();
    for i in 0..10 {
        let instance = if i % 2 == 0 {
            runtime.create(root, None).unwrap()
        } else {
            let internal = internal_options(root, None, |_| {});
            runtime.create(root, Some(internal.into())).unwrap()
        };
        uids.push(instance.uid().unwrap());
    }

    let expected: Vec<Uid> = (0..10).map(Uid::new).collect();
    assert_eq!(uids, expected);
    assert_eq!(runtime.instances_created(), 10);
}

#[test]
fn example_scenario() {
    let (mut runtime, _) = counting_runtime(RuntimeConfig::production());
    let log = Log::new();
    let a = runtime.define(
        Options::new()
            .with(keys::DATA, OptionValue::factory(|_| Ok(scope(json!({"x": 1})))))
            .with(keys::CREATED, log.hook("fnA")),
    );

    let mut first = runtime.create(a, None).unwrap();
    let second = runtime.create(a, None).unwrap();
    assert_eq!(first.uid(), Some(Uid::new(0)));
    assert_eq!(second.uid(), Some(Uid::new(1)));
    assert_eq!(first.data().get("x"), Some(&json!(1)));
    assert_eq!(second.data().get("x"), Some(&json!(1)));

    first.data_mut().insert("x".into(), json!(2));
    assert_eq!(second.data().get("x"), Some(&json!(1)));

    let b = runtime
        .extend(a, Options::new().with(keys::CREATED, log.hook("fnB")))
        .unwrap();
    runtime.create(b, None).unwrap();
    // Two instances of A, then one of B.
    assert_eq!(log.entries(), vec!["fnA", "fnA", "fnA", "fnB"]);
}

// ================================================================
// Stage order
// ================================================================

#[test]
fn stages_run_in_fixed_order() {
    let log = Log::new();
    let mut runtime = runtime_with(recording_subsystems(&log));
    let def = runtime.define(
        Options::new()
            .with(keys::EL, json!("#app"))
            .with(keys::BEFORE_CREATE, log.hook("beforeCreate"))
            .with(keys::CREATED, log.hook("created")),
    );

    let instance = runtime.create(def, None).unwrap();
    assert_eq!(
        log.entries(),
        vec![
            "lifecycle@OptionsBound",
            "events@LifecycleScaffolded",
            "render@EventsBound",
            "beforeCreate",
            "injections@BeforeCreateFired",
            "state@InjectionsResolved",
            "provide@StateResolved",
            "created",
            "mount@CreatedFired",
        ]
    );
    assert_eq!(instance.stage(), LifecycleStage::Mounted);
}

#[test]
fn hooks_fire_ancestor_first_across_three_levels() {
    let log = Log::new();
    let (mut runtime, _) = counting_runtime(RuntimeConfig::production());
    let level = |name: &str| {
        Options::new()
            .with(keys::BEFORE_CREATE, log.hook(&format!("beforeCreate:{name}")))
            .with(keys::CREATED, log.hook(&format!("created:{name}")))
    };
    let grandparent = runtime.define(level("G"));
    let parent = runtime.extend(grandparent, level("P")).unwrap();
    let child = runtime.extend(parent, level("C")).unwrap();

    runtime.create(child, None).unwrap();
    assert_eq!(
        log.entries(),
        vec![
            "beforeCreate:G",
            "beforeCreate:P",
            "beforeCreate:C",
            "created:G",
            "created:P",
            "created:C",
        ]
    );
}

#[test]
fn state_sees_injections_and_provide_sees_state() {
    struct FixedInjection;

    impl InjectionResolver for FixedInjection {
        fn resolve_injections(&self, instance: &mut Instance) -> anyhow::Result<()> {
            instance.injected_mut().insert("base".into(), json!(21));
            Ok(())
        }
    }

    let mut runtime = runtime_with(Subsystems::default().with_injections(FixedInjection));
    let computed = Registry::from([(
        "doubled".to_string(),
        OptionValue::getter(|vm| {
            let base = vm.property("base").and_then(Value::as_i64).unwrap_or(0);
            Ok(json!(base * 2))
        }),
    )]);
    let def = runtime.define(
        Options::new()
            .with(keys::COMPUTED, OptionValue::Registry(computed))
            .with(
                keys::PROVIDE,
                OptionValue::factory(|vm| {
                    let answer = vm.computed().get("doubled").cloned().unwrap_or(Value::Null);
                    Ok(scope(json!({ "answer": answer })))
                }),
            ),
    );

    let instance = runtime.create(def, None).unwrap();
    assert_eq!(instance.computed().get("doubled"), Some(&json!(42)));
    assert_eq!(instance.provided().get("answer"), Some(&json!(42)));
}

#[test]
fn default_state_fills_props_methods_data_and_computed() {
    let (mut runtime, _) = counting_runtime(RuntimeConfig::production());
    let props = Registry::from([
        ("title".to_string(), OptionValue::Value(json!({"default": "untitled"}))),
        ("count".to_string(), OptionValue::Value(json!({}))),
    ]);
    let methods = Registry::from([(
        "bump".to_string(),
        OptionValue::handler(|vm, args| {
            let by = args.first().and_then(Value::as_i64).unwrap_or(1);
            let current = vm.data().get("n").and_then(Value::as_i64).unwrap_or(0);
            vm.data_mut().insert("n".into(), json!(current + by));
            Ok(())
        }),
    )]);
    let computed = Registry::from([(
        "label".to_string(),
        OptionValue::getter(|vm| {
            let title = vm.property("title").and_then(Value::as_str).unwrap_or_default();
            Ok(json!(format!("{title}!")))
        }),
    )]);
    let def = runtime.define(
        Options::new()
            .with(keys::PROPS, OptionValue::Registry(props))
            .with(keys::METHODS, OptionValue::Registry(methods))
            .with(keys::COMPUTED, OptionValue::Registry(computed))
            .with(keys::DATA, OptionValue::factory(|_| Ok(scope(json!({"n": 0}))))),
    );

    let per_call = Options::new().with(keys::PROPS_DATA, json!({"count": 3}));
    let mut instance = runtime.create(def, Some(per_call.into())).unwrap();

    assert_eq!(instance.props().get("title"), Some(&json!("untitled")));
    assert_eq!(instance.props().get("count"), Some(&json!(3)));
    assert_eq!(instance.computed().get("label"), Some(&json!("untitled!")));

    instance.call_method("bump", &[json!(5)]).unwrap();
    assert_eq!(instance.data().get("n"), Some(&json!(5)));
    assert!(instance.call_method("missing", &[]).is_err());
}

// ================================================================
// Full path
// ================================================================

#[test]
fn full_path_merges_per_call_options_over_resolved_definition() {
    let log = Log::new();
    let (mut runtime, merges) = counting_runtime(RuntimeConfig::production());
    let root = runtime.define(
        Options::new()
            .with("color", json!("red"))
            .with(keys::CREATED, log.hook("definition")),
    );
    let child = runtime.extend(root, Options::new()).unwrap();
    let before = merges.calls();

    let per_call = Options::new()
        .with("color", json!("blue"))
        .with(keys::CREATED, log.hook("per-call"));
    let instance = runtime.create(child, Some(per_call.into())).unwrap();

    assert_eq!(merges.calls(), before + 1);
    assert!(!instance.options().is_layered());
    assert_eq!(instance.options().str("color"), Some("blue"));
    assert_eq!(log.entries(), vec!["definition", "per-call"]);
    assert!(instance.flags().is_managed);
    assert!(!instance.flags().is_internal);
}

#[test]
fn full_path_without_options_still_binds_resolved_definition() {
    let (mut runtime, _) = counting_runtime(RuntimeConfig::production());
    let root = runtime.define(Options::new().with(keys::NAME, json!("app")));
    let instance = runtime.create(root, None).unwrap();
    assert!(instance.options().is_bound());
    assert_eq!(instance.options().name(), Some("app"));
    assert_eq!(instance.display_name(), "<Root>");
}

// ================================================================
// Fast path
// ================================================================

#[test]
fn fast_path_never_merges_and_layers_node_fields() {
    let (mut runtime, merges) = counting_runtime(RuntimeConfig::production());
    let root = runtime.define(Options::new().with("color", json!("red")));
    let props = Registry::from([("title".to_string(), OptionValue::Value(json!({})))]);
    let item = runtime
        .extend(root, Options::new().with(keys::PROPS, OptionValue::Registry(props)))
        .unwrap();
    let parent = runtime.create(root, None).unwrap();
    let before = merges.calls();

    let clicks = Log::new();
    let on_click = clicks.clone();
    let internal = internal_options(item, parent.uid(), move |component| {
        component.props_data.insert("title".into(), json!("hello"));
        component.listeners.insert(
            "click".into(),
            OptionValue::handler(move |_, _| {
                on_click.push("click");
                Ok(())
            }),
        );
        component.children.push(Arc::new(RenderNode::text("body")));
        component
            .children
            .push(Arc::new(RenderNode::element("h1").with_slot("header")));
        component.tag = Some("todo-item".into());
    });
    let node = Arc::clone(&internal.parent_node);
    let mut child = runtime.create(item, Some(internal.into())).unwrap();

    assert_eq!(merges.calls(), before);
    let options = child.options();
    assert!(options.is_layered());
    assert_eq!(options.get(keys::PARENT), Some(&OptionValue::InstanceRef(parent.uid().unwrap())));
    assert_eq!(options.get(keys::PARENT_VNODE), Some(&OptionValue::Node(node)));
    assert_eq!(
        options.get(keys::PROPS_DATA),
        Some(&OptionValue::Value(json!({"title": "hello"})))
    );
    assert!(options.registry(keys::PARENT_LISTENERS).unwrap().contains_key("click"));
    assert_eq!(options.str(keys::COMPONENT_TAG), Some("todo-item"));
    assert_eq!(options.str("color"), Some("red"));
    let EffectiveOptions::Layered(layered) = options else {
        panic!("expected layered options");
    };
    assert_eq!(layered.overrides().len(), 6);
    assert!(Arc::ptr_eq(layered.fallback(), runtime.definition(item).unwrap().options()));

    assert!(child.flags().is_internal);
    assert_eq!(child.links().parent, parent.uid());
    assert_eq!(child.props().get("title"), Some(&json!("hello")));
    assert_eq!(child.render_slot().slots["default"].len(), 1);
    assert_eq!(child.render_slot().slots["header"].len(), 1);
    assert_eq!(child.display_name(), "<TodoItem>");

    child.emit("click", &[]).unwrap();
    assert_eq!(clicks.entries(), vec!["click"]);
}

#[test]
fn fast_path_without_parent_records_null_parent() {
    let (mut runtime, _) = counting_runtime(RuntimeConfig::production());
    let root = runtime.define(Options::new());
    let internal = internal_options(root, None, |_| {});
    let instance = runtime.create(root, Some(internal.into())).unwrap();

    assert_eq!(
        instance.options().get(keys::PARENT),
        Some(&OptionValue::Value(Value::Null))
    );
    assert_eq!(
        instance.options().get(keys::COMPONENT_TAG),
        Some(&OptionValue::Value(Value::Null))
    );
    assert_eq!(instance.links().parent, None);
    assert_eq!(instance.display_name(), "<Anonymous>");
}

#[test]
fn fast_path_render_override_replaces_definition_render() {
    let (mut runtime, _) = counting_runtime(RuntimeConfig::production());
    let root = runtime.define(
        Options::new()
            .with(keys::RENDER, OptionValue::render(|_| Ok(RenderNode::element("old")))),
    );
    let mut internal = internal_options(root, None, |_| {});
    internal.render = Some(RenderOverride {
        render: render_fn(|_| Ok(RenderNode::element("new"))),
        static_render_fns: vec![render_fn(|_| Ok(RenderNode::element("static")))],
    });
    let instance = runtime.create(root, Some(internal.into())).unwrap();

    let Some(OptionValue::Render(render)) = instance.options().get(keys::RENDER) else {
        panic!("render should be bound");
    };
    assert_eq!(render(&instance).unwrap().tag, "new");
    assert!(matches!(
        instance.options().get(keys::STATIC_RENDER_FNS),
        Some(OptionValue::RenderList(fns)) if fns.len() == 1
    ));
}

#[test]
fn fast_path_requires_component_options() {
    let (mut runtime, _) = counting_runtime(RuntimeConfig::production());
    let root = runtime.define(Options::new());
    let internal = InternalComponentOptions {
        parent: None,
        parent_node: Arc::new(RenderNode::element("div")),
        render: None,
    };
    let mut instance = Instance::new(root);

    let err = runtime
        .construct(&mut instance, Some(internal.into()))
        .unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::MissingComponentOptions { uid } if uid == Uid::new(0)
    ));
    assert_eq!(instance.stage(), LifecycleStage::IdentityAssigned);
}

#[test]
fn fast_path_rejects_node_for_another_definition() {
    let (mut runtime, _) = counting_runtime(RuntimeConfig::production());
    let card = runtime.define(Options::new());
    let list = runtime.define(Options::new());
    let internal = internal_options(list, None, |_| {});

    let err = runtime.create(card, Some(internal.into())).unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::DefinitionMismatch { expected, found, .. } if expected == card && found == list
    ));
}

#[test]
fn non_handler_listener_is_rejected_by_default_events() {
    let (mut runtime, _) = counting_runtime(RuntimeConfig::production());
    let root = runtime.define(Options::new());
    let internal = internal_options(root, None, |component| {
        component
            .listeners
            .insert("click".into(), OptionValue::Value(json!("oops")));
    });
    let err = runtime.create(root, Some(internal.into())).unwrap_err();
    assert!(matches!(err, RuntimeError::Collaborator(_)));
}

// ================================================================
// Failures
// ================================================================

#[test]
fn collaborator_error_is_returned_unchanged() {
    let log = Log::new();
    let mut runtime = runtime_with(Subsystems::default().with_state(FailingState));
    let def = runtime.define(Options::new().with(keys::CREATED, log.hook("created")));
    let mut instance = Instance::new(def);

    let err = runtime.construct(&mut instance, None).unwrap_err();
    assert_eq!(err.to_string(), "state backend unavailable");
    let RuntimeError::Collaborator(inner) = err else {
        panic!("expected a collaborator error");
    };
    assert!(inner.downcast_ref::<StateUnavailable>().is_some());

    assert_eq!(instance.stage(), LifecycleStage::InjectionsResolved);
    assert!(log.entries().is_empty());
}

#[test]
fn hook_error_stops_the_pipeline() {
    let log = Log::new();
    let mut runtime = runtime_with(recording_subsystems(&log));
    let def = runtime.define(
        Options::new()
            .with_hook(keys::BEFORE_CREATE, |_| Err(anyhow::anyhow!("refused")))
            .with(keys::CREATED, log.hook("created")),
    );

    let mut instance = Instance::new(def);
    let err = runtime.construct(&mut instance, None).unwrap_err();
    assert_eq!(err.to_string(), "refused");
    assert_eq!(instance.stage(), LifecycleStage::RenderScaffolded);
    assert_eq!(
        log.entries(),
        vec!["lifecycle@OptionsBound", "events@LifecycleScaffolded", "render@EventsBound"]
    );
}

#[test]
fn unknown_definition_fails_before_assigning_uid() {
    let (mut runtime, _) = counting_runtime(RuntimeConfig::production());
    let err = runtime.create(DefinitionId::from_index(7), None).unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownDefinition(_)));
    assert_eq!(runtime.instances_created(), 0);
}

// ================================================================
// Diagnostics
// ================================================================

#[test]
fn reconstructing_an_instance_warns_in_development() {
    let (mut runtime, _) = counting_runtime(RuntimeConfig::development());
    let def = runtime.define(Options::new());
    let mut instance = runtime.create(def, None).unwrap();
    assert!(runtime.warnings().is_empty());

    runtime.construct(&mut instance, None).unwrap();
    let warnings = runtime.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, DiagnosticKind::Misuse);
    assert_eq!(instance.uid(), Some(Uid::new(1)));
}

#[test]
fn reconstructing_an_instance_is_silent_in_production() {
    let (mut runtime, _) = counting_runtime(RuntimeConfig::production());
    let def = runtime.define(Options::new());
    let mut instance = runtime.create(def, None).unwrap();
    runtime.construct(&mut instance, None).unwrap();
    assert!(runtime.warnings().is_empty());
}

#[test]
fn reconstruction_installs_parent_listeners_once() {
    let clicks = Log::new();
    let (mut runtime, _) = counting_runtime(RuntimeConfig::development());
    let def = runtime.define(Options::new());
    let on_click = clicks.clone();
    let internal = internal_options(def, None, move |component| {
        component.listeners.insert(
            "click".into(),
            OptionValue::handler(move |_, _| {
                on_click.push("click");
                Ok(())
            }),
        );
    });

    let mut instance = Instance::new(def);
    runtime
        .construct(&mut instance, Some(internal.clone().into()))
        .unwrap();
    runtime.construct(&mut instance, Some(internal.into())).unwrap();

    instance.emit("click", &[]).unwrap();
    assert_eq!(clicks.entries(), vec!["click"]);
}

#[test]
fn reconstruction_drops_state_from_previous_binding() {
    let (mut runtime, _) = counting_runtime(RuntimeConfig::development());
    let def = runtime.define(Options::new());
    let props = Registry::from([("a".to_string(), OptionValue::Value(json!({})))]);
    let first = Options::new()
        .with(keys::PROPS, OptionValue::Registry(props))
        .with(keys::PROPS_DATA, json!({"a": 1}))
        .with(keys::PROVIDE, json!({"theme": "dark"}));

    let mut instance = Instance::new(def);
    runtime.construct(&mut instance, Some(first.into())).unwrap();
    assert_eq!(instance.props().get("a"), Some(&json!(1)));

    runtime.construct(&mut instance, None).unwrap();
    assert!(instance.props().is_empty());
    assert!(instance.provided().is_empty());
}

#[test]
fn facade_depends_on_build_mode() {
    let (mut dev, _) = counting_runtime(RuntimeConfig::development());
    let def = dev.define(Options::new());
    assert!(dev.create(def, None).unwrap().render_proxy().is_guarded());

    let (mut prod, _) = counting_runtime(RuntimeConfig::production());
    let def = prod.define(Options::new());
    assert!(!prod.create(def, None).unwrap().render_proxy().is_guarded());
}

// ================================================================
// Hook events
// ================================================================

#[test]
fn hook_listeners_fire_after_hooks() {
    let log = Log::new();
    let (mut runtime, _) = counting_runtime(RuntimeConfig::production());
    let def = runtime.define(Options::new().with(keys::CREATED, log.hook("hook")));

    let listener_log = log.clone();
    let internal = internal_options(def, None, move |component| {
        component.listeners.insert(
            "hook:created".into(),
            OptionValue::handler(move |_, _| {
                listener_log.push("listener");
                Ok(())
            }),
        );
    });
    runtime.create(def, Some(internal.into())).unwrap();
    assert_eq!(log.entries(), vec!["hook", "listener"]);
}

// ================================================================
// Mounting
// ================================================================

#[test]
fn el_triggers_mount() {
    let log = Log::new();
    let (mut runtime, _) = counting_runtime(RuntimeConfig::production());
    let def = runtime.define(
        Options::new()
            .with(keys::BEFORE_MOUNT, log.hook("beforeMount"))
            .with(keys::MOUNTED, log.hook("mounted"))
            .with(
                keys::RENDER,
                OptionValue::render(|vm| {
                    let title = vm.property("title").and_then(Value::as_str).unwrap_or("none");
                    Ok(RenderNode::element("main").with_child(RenderNode::text(title)))
                }),
            )
            .with(keys::DATA, OptionValue::factory(|_| Ok(scope(json!({"title": "hi"}))))),
    );

    let per_call = Options::new().with(keys::EL, json!("#app"));
    let instance = runtime.create(def, Some(per_call.into())).unwrap();

    assert_eq!(instance.stage(), LifecycleStage::Mounted);
    assert!(instance.links().is_mounted);
    assert_eq!(instance.links().mount_target, Some(json!("#app")));
    let tree = instance.render_slot().tree.as_ref().unwrap();
    assert_eq!(tree.tag, "main");
    assert_eq!(tree.children[0].text.as_deref(), Some("hi"));
    assert_eq!(log.entries(), vec!["beforeMount", "mounted"]);
}

#[test]
fn no_el_stops_after_created() {
    let log = Log::new();
    let (mut runtime, _) = counting_runtime(RuntimeConfig::production());
    let def = runtime.define(Options::new().with(keys::MOUNTED, log.hook("mounted")));
    let instance = runtime.create(def, None).unwrap();

    assert_eq!(instance.stage(), LifecycleStage::CreatedFired);
    assert!(!instance.links().is_mounted);
    assert!(log.entries().is_empty());
}

#[test]
fn mounter_can_construct_children_through_the_runtime() {
    struct SpawnChild {
        spawned: Arc<Mutex<Vec<Instance>>>,
    }

    impl Mounter for SpawnChild {
        fn mount(
            &self,
            runtime: &mut Runtime,
            instance: &mut Instance,
            _target: &OptionValue,
        ) -> anyhow::Result<()> {
            let Some(leaf) = runtime.lookup_component(instance.definition(), "leaf")? else {
                anyhow::bail!("leaf is not registered");
            };
            let internal = internal_options(leaf, instance.uid(), |component| {
                component.tag = Some("leaf".into());
            });
            let child = runtime.create(leaf, Some(internal.into()))?;
            instance.links_mut().children.extend(child.uid());
            self.spawned.lock().unwrap().push(child);
            Ok(())
        }
    }

    let spawned = Arc::new(Mutex::new(Vec::new()));
    let mut runtime = Runtime::builder()
        .config(RuntimeConfig::production())
        .subsystems(Subsystems::default().with_mount(SpawnChild {
            spawned: Arc::clone(&spawned),
        }))
        .build();
    let leaf = runtime.define(Options::new());
    let mut app_options = Options::new().with(keys::EL, json!("#app"));
    app_options.register_component("leaf", leaf);
    let app = runtime.define(app_options);

    let parent = runtime.create(app, None).unwrap();
    let children = spawned.lock().unwrap();
    assert_eq!(parent.stage(), LifecycleStage::Mounted);
    assert_eq!(parent.uid(), Some(Uid::new(0)));
    assert_eq!(parent.links().children, vec![Uid::new(1)]);
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].definition(), leaf);
    assert_eq!(children[0].links().parent, Some(Uid::new(0)));
    assert_eq!(children[0].stage(), LifecycleStage::CreatedFired);
    assert_eq!(children[0].display_name(), "<Leaf>");
}
