//! The options model shared by definitions, merge rules and instances.
//!
//! An [`Options`] value is a flat, ordered map from field name to
//! [`OptionValue`]. Plain data is carried as JSON; behavior (hooks, data
//! factories, computed getters, listeners, render functions) is carried as
//! reference-counted callables so options can be cloned cheaply and compared
//! by identity.

use crate::instance::Instance;
use crate::node::RenderNode;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use weft_types::{DefinitionId, Uid};

/// A JSON object used for props, data, computed, injected and provided values.
pub type Scope = serde_json::Map<String, Value>;

/// Lifecycle hook. Receives the instance being constructed.
pub type Hook = Arc<dyn Fn(&mut Instance) -> anyhow::Result<()> + Send + Sync>;

/// Event listener or method. Receives the instance and the call arguments.
pub type Handler = Arc<dyn Fn(&mut Instance, &[Value]) -> anyhow::Result<()> + Send + Sync>;

/// Produces a fresh scope per instance (`data`, `provide`).
pub type Factory = Arc<dyn Fn(&Instance) -> anyhow::Result<Scope> + Send + Sync>;

/// Derives one value from the instance (computed entries).
pub type Getter = Arc<dyn Fn(&Instance) -> anyhow::Result<Value> + Send + Sync>;

/// Produces the render tree for an instance.
pub type RenderFn = Arc<dyn Fn(&Instance) -> anyhow::Result<RenderNode> + Send + Sync>;

/// Named sub-registry (components, directives, computed, methods, ...).
pub type Registry = BTreeMap<String, OptionValue>;

/// Well-known option keys.
pub mod keys {
    pub const NAME: &str = "name";
    pub const EL: &str = "el";
    pub const DATA: &str = "data";
    pub const PROPS: &str = "props";
    pub const PROPS_DATA: &str = "propsData";
    pub const COMPUTED: &str = "computed";
    pub const METHODS: &str = "methods";
    pub const WATCH: &str = "watch";
    pub const PROVIDE: &str = "provide";
    pub const INJECT: &str = "inject";
    pub const COMPONENTS: &str = "components";
    pub const DIRECTIVES: &str = "directives";
    pub const FILTERS: &str = "filters";
    pub const RENDER: &str = "render";
    pub const STATIC_RENDER_FNS: &str = "staticRenderFns";

    // Set by the fast construction path only.
    pub const PARENT: &str = "parent";
    pub const PARENT_VNODE: &str = "_parentVnode";
    pub const PARENT_LISTENERS: &str = "_parentListeners";
    pub const RENDER_CHILDREN: &str = "_renderChildren";
    pub const COMPONENT_TAG: &str = "_componentTag";

    pub const BEFORE_CREATE: &str = "beforeCreate";
    pub const CREATED: &str = "created";
    pub const BEFORE_MOUNT: &str = "beforeMount";
    pub const MOUNTED: &str = "mounted";
    pub const BEFORE_UPDATE: &str = "beforeUpdate";
    pub const UPDATED: &str = "updated";
    pub const ACTIVATED: &str = "activated";
    pub const DEACTIVATED: &str = "deactivated";
    pub const BEFORE_DESTROY: &str = "beforeDestroy";
    pub const DESTROYED: &str = "destroyed";
    pub const ERROR_CAPTURED: &str = "errorCaptured";

    /// Every hook name whose sequences concatenate across an ancestor chain.
    pub const LIFECYCLE_HOOKS: &[&str] = &[
        BEFORE_CREATE,
        CREATED,
        BEFORE_MOUNT,
        MOUNTED,
        BEFORE_UPDATE,
        UPDATED,
        ACTIVATED,
        DEACTIVATED,
        BEFORE_DESTROY,
        DESTROYED,
        ERROR_CAPTURED,
    ];
}

/// A single option field.
#[derive(Clone)]
pub enum OptionValue {
    /// Plain data (name, el, props declarations, prop data, ...).
    Value(Value),
    /// Ordered hook sequence.
    Hooks(Vec<Hook>),
    Handler(Handler),
    Factory(Factory),
    Getter(Getter),
    Render(RenderFn),
    RenderList(Vec<RenderFn>),
    Registry(Registry),
    /// A definition registered by name inside a `components` registry.
    Component(DefinitionId),
    /// Link to another instance (the parent of an internally spawned child).
    InstanceRef(Uid),
    Node(Arc<RenderNode>),
    Nodes(Vec<Arc<RenderNode>>),
}

impl OptionValue {
    /// Wraps a single hook into a one-element sequence.
    pub fn hook<F>(f: F) -> Self
    where
        F: Fn(&mut Instance) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::Hooks(vec![Arc::new(f)])
    }

    pub fn handler<F>(f: F) -> Self
    where
        F: Fn(&mut Instance, &[Value]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::Handler(Arc::new(f))
    }

    pub fn factory<F>(f: F) -> Self
    where
        F: Fn(&Instance) -> anyhow::Result<Scope> + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(f))
    }

    pub fn getter<F>(f: F) -> Self
    where
        F: Fn(&Instance) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self::Getter(Arc::new(f))
    }

    pub fn render<F>(f: F) -> Self
    where
        F: Fn(&Instance) -> anyhow::Result<RenderNode> + Send + Sync + 'static,
    {
        Self::Render(Arc::new(f))
    }

    /// Short name of the variant, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Hooks(_) => "hooks",
            Self::Handler(_) => "handler",
            Self::Factory(_) => "factory",
            Self::Getter(_) => "getter",
            Self::Render(_) => "render",
            Self::RenderList(_) => "render-list",
            Self::Registry(_) => "registry",
            Self::Component(_) => "component",
            Self::InstanceRef(_) => "instance-ref",
            Self::Node(_) => "node",
            Self::Nodes(_) => "nodes",
        }
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    #[must_use]
    pub fn as_hooks(&self) -> Option<&[Hook]> {
        match self {
            Self::Hooks(hooks) => Some(hooks),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_registry(&self) -> Option<&Registry> {
        match self {
            Self::Registry(registry) => Some(registry),
            _ => None,
        }
    }
}

impl From<Value> for OptionValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Compares two callables by the address of their shared allocation.
pub(crate) fn same_callable<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

fn same_callables<T: ?Sized>(a: &[Arc<T>], b: &[Arc<T>]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_callable(x, y))
}

/// Structural equality for data, identity equality for callables.
///
/// This is the comparison the resolver uses to decide whether a field was
/// edited after its options were sealed.
impl PartialEq for OptionValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::Hooks(a), Self::Hooks(b)) => same_callables(a, b),
            (Self::Handler(a), Self::Handler(b)) => same_callable(a, b),
            (Self::Factory(a), Self::Factory(b)) => same_callable(a, b),
            (Self::Getter(a), Self::Getter(b)) => same_callable(a, b),
            (Self::Render(a), Self::Render(b)) => same_callable(a, b),
            (Self::RenderList(a), Self::RenderList(b)) => same_callables(a, b),
            (Self::Registry(a), Self::Registry(b)) => a == b,
            (Self::Component(a), Self::Component(b)) => a == b,
            (Self::InstanceRef(a), Self::InstanceRef(b)) => a == b,
            (Self::Node(a), Self::Node(b)) => Arc::ptr_eq(a, b),
            (Self::Nodes(a), Self::Nodes(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Arc::ptr_eq(x, y))
            }
            _ => false,
        }
    }
}

impl fmt::Debug for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            Self::Hooks(hooks) => write!(f, "Hooks({})", hooks.len()),
            Self::RenderList(fns) => write!(f, "RenderList({})", fns.len()),
            Self::Registry(registry) => f.debug_map().entries(registry.iter()).finish(),
            Self::Component(id) => write!(f, "Component({id})"),
            Self::InstanceRef(uid) => write!(f, "InstanceRef({uid})"),
            Self::Node(node) => write!(f, "Node(<{}>)", node.tag),
            Self::Nodes(nodes) => write!(f, "Nodes({})", nodes.len()),
            other => f.write_str(other.kind()),
        }
    }
}

/// An ordered set of option fields.
#[derive(Clone, Default, PartialEq)]
pub struct Options {
    fields: BTreeMap<String, OptionValue>,
}

impl Options {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder shorthand for a one-hook sequence.
    #[must_use]
    pub fn with_hook<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&mut Instance) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.with(name, OptionValue::hook(f))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Option<OptionValue> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        self.fields.remove(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.fields.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
        self.fields.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Overwrites or adds every field of `other`.
    pub fn extend(&mut self, other: Options) {
        self.fields.extend(other.fields);
    }

    /// Returns the `name` field, if it is a string.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.get(keys::NAME).and_then(OptionValue::as_str)
    }

    /// Returns the hook sequence registered under `name` (empty if none).
    #[must_use]
    pub fn hooks(&self, name: &str) -> &[Hook] {
        self.get(name).and_then(OptionValue::as_hooks).unwrap_or(&[])
    }

    #[must_use]
    pub fn registry(&self, key: &str) -> Option<&Registry> {
        self.get(key).and_then(OptionValue::as_registry)
    }

    /// Registers `definition` under `name` in the `components` registry,
    /// creating the registry if needed. A non-registry `components` field is
    /// replaced.
    pub fn register_component(&mut self, name: impl Into<String>, definition: DefinitionId) {
        let entry = self
            .fields
            .entry(keys::COMPONENTS.to_string())
            .or_insert_with(|| OptionValue::Registry(Registry::new()));
        if !matches!(entry, OptionValue::Registry(_)) {
            *entry = OptionValue::Registry(Registry::new());
        }
        if let OptionValue::Registry(registry) = entry {
            registry.insert(name.into(), OptionValue::Component(definition));
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.fields.iter()).finish()
    }
}

impl FromIterator<(String, OptionValue)> for Options {
    fn from_iter<I: IntoIterator<Item = (String, OptionValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Options {
    type Item = (String, OptionValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, OptionValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
