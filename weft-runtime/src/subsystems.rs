//! Capability slots filled in during construction.
//!
//! Each slot has its own trait so a host can replace any one of them (a
//! reactive state system, a virtual-DOM renderer, an injection resolver that
//! walks live ancestors) without touching the others. The defaults in this
//! module read the bound options and populate the instance's slots.

use crate::instance::Instance;
use crate::options::{keys, OptionValue, Scope};
use crate::runtime::Runtime;
use anyhow::bail;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Parent/child registration.
pub trait LifecycleInstaller {
    fn init_lifecycle(&self, instance: &mut Instance) -> anyhow::Result<()>;
}

/// Event bindings.
pub trait EventsInstaller {
    fn init_events(&self, instance: &mut Instance) -> anyhow::Result<()>;
}

/// Render bookkeeping (slots, parent node).
pub trait RenderInstaller {
    fn init_render(&self, instance: &mut Instance) -> anyhow::Result<()>;
}

/// Injected values. Runs before state so state can read them.
pub trait InjectionResolver {
    fn resolve_injections(&self, instance: &mut Instance) -> anyhow::Result<()>;
}

/// Props, methods, data and computed values.
pub trait StateResolver {
    fn resolve_state(&self, instance: &mut Instance) -> anyhow::Result<()>;
}

/// Provided values. Runs after state so they can reference it.
pub trait ProvideResolver {
    fn resolve_provide(&self, instance: &mut Instance) -> anyhow::Result<()>;
}

/// Mounting onto a target. Receives the runtime so rendering can construct
/// child instances recursively.
pub trait Mounter {
    fn mount(
        &self,
        runtime: &mut Runtime,
        instance: &mut Instance,
        target: &OptionValue,
    ) -> anyhow::Result<()>;
}

/// The full set of collaborators the pipeline delegates to.
#[derive(Clone)]
pub struct Subsystems {
    pub lifecycle: Arc<dyn LifecycleInstaller>,
    pub events: Arc<dyn EventsInstaller>,
    pub render: Arc<dyn RenderInstaller>,
    pub injections: Arc<dyn InjectionResolver>,
    pub state: Arc<dyn StateResolver>,
    pub provide: Arc<dyn ProvideResolver>,
    pub mount: Arc<dyn Mounter>,
}

impl Default for Subsystems {
    fn default() -> Self {
        Self {
            lifecycle: Arc::new(DefaultLifecycle),
            events: Arc::new(DefaultEvents),
            render: Arc::new(DefaultRender),
            injections: Arc::new(DefaultInjections),
            state: Arc::new(DefaultState),
            provide: Arc::new(DefaultProvide),
            mount: Arc::new(DefaultMount),
        }
    }
}

impl Subsystems {
    #[must_use]
    pub fn with_lifecycle(mut self, slot: impl LifecycleInstaller + 'static) -> Self {
        self.lifecycle = Arc::new(slot);
        self
    }

    #[must_use]
    pub fn with_events(mut self, slot: impl EventsInstaller + 'static) -> Self {
        self.events = Arc::new(slot);
        self
    }

    #[must_use]
    pub fn with_render(mut self, slot: impl RenderInstaller + 'static) -> Self {
        self.render = Arc::new(slot);
        self
    }

    #[must_use]
    pub fn with_injections(mut self, slot: impl InjectionResolver + 'static) -> Self {
        self.injections = Arc::new(slot);
        self
    }

    #[must_use]
    pub fn with_state(mut self, slot: impl StateResolver + 'static) -> Self {
        self.state = Arc::new(slot);
        self
    }

    #[must_use]
    pub fn with_provide(mut self, slot: impl ProvideResolver + 'static) -> Self {
        self.provide = Arc::new(slot);
        self
    }

    #[must_use]
    pub fn with_mount(mut self, slot: impl Mounter + 'static) -> Self {
        self.mount = Arc::new(slot);
        self
    }
}

// ── Defaults ─────────────────────────────────────────────────────

/// Records the parent link and resets lifecycle flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLifecycle;

impl LifecycleInstaller for DefaultLifecycle {
    fn init_lifecycle(&self, instance: &mut Instance) -> anyhow::Result<()> {
        let parent = match instance.options().get(keys::PARENT) {
            Some(OptionValue::InstanceRef(uid)) => Some(*uid),
            _ => None,
        };
        let links = instance.links_mut();
        links.parent = parent;
        links.children.clear();
        links.is_mounted = false;
        links.is_destroyed = false;
        links.is_being_destroyed = false;
        Ok(())
    }
}

/// Installs listeners handed down by the parent render node.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEvents;

impl EventsInstaller for DefaultEvents {
    fn init_events(&self, instance: &mut Instance) -> anyhow::Result<()> {
        instance.clear_listeners();
        let Some(listeners) = instance.options().registry(keys::PARENT_LISTENERS).cloned() else {
            return Ok(());
        };
        for (event, value) in listeners {
            match value {
                OptionValue::Handler(handler) => instance.on(event, handler),
                other => bail!("listener '{event}' must be a handler, found {}", other.kind()),
            }
        }
        Ok(())
    }
}

/// Keeps the parent node and sorts render children into named slots.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRender;

impl RenderInstaller for DefaultRender {
    fn init_render(&self, instance: &mut Instance) -> anyhow::Result<()> {
        let parent_node = match instance.options().get(keys::PARENT_VNODE) {
            Some(OptionValue::Node(node)) => Some(Arc::clone(node)),
            _ => None,
        };
        let children = match instance.options().get(keys::RENDER_CHILDREN) {
            Some(OptionValue::Nodes(nodes)) => nodes.clone(),
            _ => Vec::new(),
        };
        let slot = instance.render_slot_mut();
        slot.parent_node = parent_node;
        slot.slots.clear();
        for child in children {
            let name = child.slot.clone().unwrap_or_else(|| "default".to_string());
            slot.slots.entry(name).or_default().push(child);
        }
        Ok(())
    }
}

/// Fills declared injections from their `default` entries.
///
/// Declarations live in the `inject` registry as `{ "default": value }`
/// objects. This resolver has no view of ancestor instances, so a
/// declaration without a default is reported and left unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultInjections;

impl InjectionResolver for DefaultInjections {
    fn resolve_injections(&self, instance: &mut Instance) -> anyhow::Result<()> {
        instance.injected_mut().clear();
        let Some(declared) = instance.options().registry(keys::INJECT).cloned() else {
            return Ok(());
        };
        for (key, declaration) in declared {
            let default = declaration
                .as_value()
                .and_then(|v| v.get("default"))
                .cloned();
            match default {
                Some(value) => {
                    instance.injected_mut().insert(key, value);
                }
                None => warn!(uid = ?instance.uid(), key = %key, "injection not found"),
            }
        }
        Ok(())
    }
}

/// Props, methods, data and computed values, in that order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultState;

impl DefaultState {
    fn reset(instance: &mut Instance) {
        instance.props_mut().clear();
        instance.methods_mut().clear();
        instance.data_mut().clear();
        instance.computed_mut().clear();
    }

    fn init_props(instance: &mut Instance) {
        let Some(declared) = instance.options().registry(keys::PROPS).cloned() else {
            return;
        };
        let supplied = instance
            .options()
            .get(keys::PROPS_DATA)
            .and_then(OptionValue::as_value)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        for (key, declaration) in declared {
            let value = supplied.get(&key).cloned().or_else(|| {
                declaration
                    .as_value()
                    .and_then(|v| v.get("default"))
                    .cloned()
            });
            instance
                .props_mut()
                .insert(key, value.unwrap_or(Value::Null));
        }
    }

    fn init_methods(instance: &mut Instance) -> anyhow::Result<()> {
        let Some(methods) = instance.options().registry(keys::METHODS).cloned() else {
            return Ok(());
        };
        for (name, value) in methods {
            let handler = match value {
                OptionValue::Handler(handler) => handler,
                other => bail!("method '{name}' must be a handler, found {}", other.kind()),
            };
            if instance.props().contains_key(&name) {
                warn!(uid = ?instance.uid(), method = %name, "method has already been defined as a prop");
            }
            instance.methods_mut().insert(name, handler);
        }
        Ok(())
    }

    fn init_data(instance: &mut Instance) -> anyhow::Result<()> {
        let data: Scope = match instance.options().get(keys::DATA).cloned() {
            None => return Ok(()),
            Some(OptionValue::Factory(factory)) => factory(instance)?,
            Some(other) => bail!("data must be a factory, found {}", other.kind()),
        };
        for key in data.keys() {
            if instance.props().contains_key(key) {
                warn!(uid = ?instance.uid(), key = %key, "data property is already declared as a prop");
            } else if instance.has_method(key) {
                warn!(uid = ?instance.uid(), key = %key, "data property shadows a method");
            }
        }
        *instance.data_mut() = data;
        Ok(())
    }

    /// Getters run once, in key order; each sees the values computed before it.
    fn init_computed(instance: &mut Instance) -> anyhow::Result<()> {
        let Some(computed) = instance.options().registry(keys::COMPUTED).cloned() else {
            return Ok(());
        };
        for (key, value) in computed {
            let getter = match value {
                OptionValue::Getter(getter) => getter,
                other => bail!("computed '{key}' must be a getter, found {}", other.kind()),
            };
            let result = getter(instance)?;
            instance.computed_mut().insert(key, result);
        }
        Ok(())
    }
}

impl StateResolver for DefaultState {
    fn resolve_state(&self, instance: &mut Instance) -> anyhow::Result<()> {
        Self::reset(instance);
        Self::init_props(instance);
        Self::init_methods(instance)?;
        Self::init_data(instance)?;
        Self::init_computed(instance)?;
        debug!(
            uid = ?instance.uid(),
            props = instance.props().len(),
            data = instance.data().len(),
            computed = instance.computed().len(),
            "state resolved"
        );
        Ok(())
    }
}

/// Evaluates the `provide` factory (or plain object).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProvide;

impl ProvideResolver for DefaultProvide {
    fn resolve_provide(&self, instance: &mut Instance) -> anyhow::Result<()> {
        instance.provided_mut().clear();
        let provided = match instance.options().get(keys::PROVIDE).cloned() {
            None => return Ok(()),
            Some(OptionValue::Factory(factory)) => factory(instance)?,
            Some(OptionValue::Value(Value::Object(scope))) => scope,
            Some(other) => bail!("provide must be a factory or object, found {}", other.kind()),
        };
        *instance.provided_mut() = provided;
        Ok(())
    }
}

/// Fires `beforeMount`, renders once if a render function is bound, marks the
/// instance mounted and fires `mounted`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMount;

impl Mounter for DefaultMount {
    fn mount(
        &self,
        _runtime: &mut Runtime,
        instance: &mut Instance,
        target: &OptionValue,
    ) -> anyhow::Result<()> {
        instance.links_mut().mount_target = target.as_value().cloned();
        instance.call_hook(keys::BEFORE_MOUNT)?;
        if let Some(OptionValue::Render(render)) = instance.options().get(keys::RENDER).cloned() {
            let tree = render(instance)?;
            instance.render_slot_mut().tree = Some(Arc::new(tree));
        }
        instance.links_mut().is_mounted = true;
        instance.call_hook(keys::MOUNTED)
    }
}
