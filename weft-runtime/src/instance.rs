//! Live instances and the options they are bound to.

use crate::naming::classify;
use crate::node::RenderNode;
use crate::options::{keys, Handler, Hook, OptionValue, Options, Registry, Scope};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use weft_types::{DefinitionId, Uid};

/// Construction stages, in the only order the pipeline visits them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleStage {
    #[default]
    Uninitialized,
    IdentityAssigned,
    OptionsBound,
    LifecycleScaffolded,
    EventsBound,
    RenderScaffolded,
    BeforeCreateFired,
    InjectionsResolved,
    StateResolved,
    ProvideResolved,
    CreatedFired,
    Mounted,
}

/// Marks set by the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstanceFlags {
    /// Constructed by a runtime pipeline.
    pub is_managed: bool,
    /// Spawned by a parent render pass rather than by user code.
    pub is_internal: bool,
}

/// Options of an internally spawned instance: a handful of explicit
/// overrides in front of the definition's shared static options.
#[derive(Clone, Debug)]
pub struct LayeredOptions {
    overrides: Options,
    fallback: Arc<Options>,
}

impl LayeredOptions {
    #[must_use]
    pub fn new(fallback: Arc<Options>) -> Self {
        Self {
            overrides: Options::new(),
            fallback,
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<OptionValue>) {
        self.overrides.insert(key, value);
    }

    /// Looks `key` up in the overrides first, then in the fallback.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.overrides.get(key).or_else(|| self.fallback.get(key))
    }

    #[must_use]
    pub fn overrides(&self) -> &Options {
        &self.overrides
    }

    #[must_use]
    pub fn fallback(&self) -> &Arc<Options> {
        &self.fallback
    }
}

/// The configuration an instance actually uses.
#[derive(Clone, Debug, Default)]
pub enum EffectiveOptions {
    /// Not bound yet.
    #[default]
    Unbound,
    /// Full path: resolved definition options merged with per-call options.
    Resolved(Arc<Options>),
    /// Fast path: overrides delegating to the definition's options.
    Layered(LayeredOptions),
}

impl EffectiveOptions {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        match self {
            Self::Unbound => None,
            Self::Resolved(options) => options.get(key),
            Self::Layered(layered) => layered.get(key),
        }
    }

    #[must_use]
    pub fn is_layered(&self) -> bool {
        matches!(self, Self::Layered(_))
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        !matches!(self, Self::Unbound)
    }

    #[must_use]
    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(OptionValue::as_str)
    }

    #[must_use]
    pub fn hooks(&self, name: &str) -> &[Hook] {
        self.get(name).and_then(OptionValue::as_hooks).unwrap_or(&[])
    }

    #[must_use]
    pub fn registry(&self, key: &str) -> Option<&Registry> {
        self.get(key).and_then(OptionValue::as_registry)
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.str(keys::NAME)
    }
}

/// Parent/child bookkeeping owned by the lifecycle subsystem.
#[derive(Debug, Clone, Default)]
pub struct LifecycleLinks {
    pub parent: Option<Uid>,
    pub children: Vec<Uid>,
    pub is_mounted: bool,
    pub is_destroyed: bool,
    pub is_being_destroyed: bool,
    pub mount_target: Option<Value>,
}

/// Render bookkeeping owned by the render subsystem.
#[derive(Debug, Clone, Default)]
pub struct RenderSlot {
    /// Placeholder node in the parent's tree that spawned this instance.
    pub parent_node: Option<Arc<RenderNode>>,
    /// Slot name to slot content.
    pub slots: BTreeMap<String, Vec<Arc<RenderNode>>>,
    /// Last rendered tree.
    pub tree: Option<Arc<RenderNode>>,
}

/// How property access from render code reaches the instance.
#[derive(Debug, Clone, Default)]
pub enum ProxyMode {
    #[default]
    Raw,
    /// Development facade; names listed here never trigger warnings.
    Guarded { allowed_globals: Arc<BTreeSet<String>> },
}

/// A live object created from a definition.
pub struct Instance {
    uid: Option<Uid>,
    definition: DefinitionId,
    options: EffectiveOptions,
    flags: InstanceFlags,
    stage: LifecycleStage,
    proxy: ProxyMode,
    links: LifecycleLinks,
    listeners: BTreeMap<String, Vec<Handler>>,
    render: RenderSlot,
    methods: BTreeMap<String, Handler>,
    injected: Scope,
    props: Scope,
    data: Scope,
    computed: Scope,
    provided: Scope,
}

impl Instance {
    /// Creates an uninitialized instance of `definition`, ready to be passed
    /// to [`Runtime::construct`](crate::Runtime::construct).
    #[must_use]
    pub fn new(definition: DefinitionId) -> Self {
        Self {
            uid: None,
            definition,
            options: EffectiveOptions::Unbound,
            flags: InstanceFlags::default(),
            stage: LifecycleStage::Uninitialized,
            proxy: ProxyMode::Raw,
            links: LifecycleLinks::default(),
            listeners: BTreeMap::new(),
            render: RenderSlot::default(),
            methods: BTreeMap::new(),
            injected: Scope::new(),
            props: Scope::new(),
            data: Scope::new(),
            computed: Scope::new(),
            provided: Scope::new(),
        }
    }

    /// The uid. Only `None` before construction.
    #[must_use]
    pub fn uid(&self) -> Option<Uid> {
        self.uid
    }

    #[must_use]
    pub fn definition(&self) -> DefinitionId {
        self.definition
    }

    #[must_use]
    pub fn options(&self) -> &EffectiveOptions {
        &self.options
    }

    #[must_use]
    pub fn flags(&self) -> InstanceFlags {
        self.flags
    }

    #[must_use]
    pub fn stage(&self) -> LifecycleStage {
        self.stage
    }

    #[must_use]
    pub fn proxy_mode(&self) -> &ProxyMode {
        &self.proxy
    }

    #[must_use]
    pub fn links(&self) -> &LifecycleLinks {
        &self.links
    }

    pub fn links_mut(&mut self) -> &mut LifecycleLinks {
        &mut self.links
    }

    #[must_use]
    pub fn render_slot(&self) -> &RenderSlot {
        &self.render
    }

    pub fn render_slot_mut(&mut self) -> &mut RenderSlot {
        &mut self.render
    }

    #[must_use]
    pub fn injected(&self) -> &Scope {
        &self.injected
    }

    pub fn injected_mut(&mut self) -> &mut Scope {
        &mut self.injected
    }

    #[must_use]
    pub fn props(&self) -> &Scope {
        &self.props
    }

    pub fn props_mut(&mut self) -> &mut Scope {
        &mut self.props
    }

    #[must_use]
    pub fn data(&self) -> &Scope {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Scope {
        &mut self.data
    }

    #[must_use]
    pub fn computed(&self) -> &Scope {
        &self.computed
    }

    pub fn computed_mut(&mut self) -> &mut Scope {
        &mut self.computed
    }

    #[must_use]
    pub fn provided(&self) -> &Scope {
        &self.provided
    }

    pub fn provided_mut(&mut self) -> &mut Scope {
        &mut self.provided
    }

    pub fn methods_mut(&mut self) -> &mut BTreeMap<String, Handler> {
        &mut self.methods
    }

    #[must_use]
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Looks a property up in props, data, computed and injected values, in
    /// that order.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.props
            .get(key)
            .or_else(|| self.data.get(key))
            .or_else(|| self.computed.get(key))
            .or_else(|| self.injected.get(key))
    }

    /// Calls a method registered by the state subsystem.
    pub fn call_method(&mut self, name: &str, args: &[Value]) -> anyhow::Result<()> {
        let method = self
            .methods
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("method '{name}' is not defined"))?;
        method(self, args)
    }

    /// Adds a listener for `event`.
    pub fn on(&mut self, event: impl Into<String>, handler: Handler) {
        self.listeners.entry(event.into()).or_default().push(handler);
    }

    /// Removes every listener.
    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    #[must_use]
    pub fn has_listener(&self, event: &str) -> bool {
        self.listeners.get(event).is_some_and(|handlers| !handlers.is_empty())
    }

    /// Invokes every listener of `event` in registration order.
    pub fn emit(&mut self, event: &str, args: &[Value]) -> anyhow::Result<()> {
        let handlers = self.listeners.get(event).cloned().unwrap_or_default();
        for handler in &handlers {
            handler(&mut *self, args)?;
        }
        Ok(())
    }

    /// Fires every hook registered under `name`, then any `hook:<name>`
    /// listeners. The first error stops the sequence and is returned as is.
    pub fn call_hook(&mut self, name: &str) -> anyhow::Result<()> {
        let hooks = self.options.hooks(name).to_vec();
        for hook in &hooks {
            hook(&mut *self)?;
        }
        let event = format!("hook:{name}");
        if self.has_listener(&event) {
            self.emit(&event, &[])?;
        }
        Ok(())
    }

    /// Display name used in diagnostics and measurements: `<Root>` for
    /// top-level instances, `<Name>` when a name or tag is known, else
    /// `<Anonymous>`.
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.links.parent.is_none() && !self.flags.is_internal {
            return "<Root>".to_string();
        }
        match self
            .options
            .name()
            .or_else(|| self.options.str(keys::COMPONENT_TAG))
        {
            Some(name) => format!("<{}>", classify(name)),
            None => "<Anonymous>".to_string(),
        }
    }

    // ── Pipeline-only mutation ───────────────────────────────────────

    pub(crate) fn assign_uid(&mut self, uid: Uid) {
        self.uid = Some(uid);
    }

    pub(crate) fn bind_options(&mut self, options: EffectiveOptions) {
        self.options = options;
    }

    pub(crate) fn flags_mut(&mut self) -> &mut InstanceFlags {
        &mut self.flags
    }

    pub(crate) fn set_proxy(&mut self, proxy: ProxyMode) {
        self.proxy = proxy;
    }

    pub(crate) fn advance(&mut self, stage: LifecycleStage) {
        debug!(uid = ?self.uid, ?stage, "instance stage");
        self.stage = stage;
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("uid", &self.uid)
            .field("definition", &self.definition)
            .field("stage", &self.stage)
            .field("flags", &self.flags)
            .field("options", &self.options)
            .field("props", &self.props)
            .field("data", &self.data)
            .field("computed", &self.computed)
            .field("injected", &self.injected)
            .field("provided", &self.provided)
            .finish_non_exhaustive()
    }
}
