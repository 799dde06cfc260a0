//! Instance construction.
//!
//! [`Runtime::construct`] drives an instance from `Uninitialized` to
//! `CreatedFired` (and `Mounted` when an `el` is bound) in a fixed order:
//!
//! 1. assign uid
//! 2. bind options (fast path for internal instances, full merge otherwise)
//! 3. install the diagnostic facade (development) or leave the instance raw
//! 4. lifecycle, 5. events, 6. render scaffolding
//! 7. `beforeCreate`
//! 8. injections, 9. state, 10. provide
//! 11. `created`
//! 12. mount
//!
//! Nothing is retried or rolled back. The first failure is returned as is
//! and leaves the instance at the last stage it reached.

use crate::error::{RuntimeError, RuntimeResult};
use crate::instance::{EffectiveOptions, Instance, LayeredOptions, LifecycleStage, ProxyMode};
use crate::node::RenderNode;
use crate::options::{keys, OptionValue, Options, RenderFn};
use crate::probe::PerfTags;
use crate::runtime::{DiagnosticKind, Runtime};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use weft_types::{DefinitionId, Uid};

/// Per-call options accepted by the construction entry point.
#[derive(Clone, Debug)]
pub enum ConstructOptions {
    /// User-initiated construction; merged over the resolved definition.
    User(Options),
    /// Spawned by a parent render pass; takes the fast path.
    Internal(InternalComponentOptions),
}

/// Payload of an internal construction.
#[derive(Clone, Debug)]
pub struct InternalComponentOptions {
    pub parent: Option<Uid>,
    /// Placeholder node whose component options describe this instance.
    pub parent_node: Arc<RenderNode>,
    pub render: Option<RenderOverride>,
}

/// Render function pair that replaces the definition's own.
#[derive(Clone)]
pub struct RenderOverride {
    pub render: RenderFn,
    pub static_render_fns: Vec<RenderFn>,
}

impl std::fmt::Debug for RenderOverride {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderOverride")
            .field("static_render_fns", &self.static_render_fns.len())
            .finish_non_exhaustive()
    }
}

impl From<Options> for ConstructOptions {
    fn from(options: Options) -> Self {
        Self::User(options)
    }
}

impl From<InternalComponentOptions> for ConstructOptions {
    fn from(options: InternalComponentOptions) -> Self {
        Self::Internal(options)
    }
}

impl Runtime {
    /// Creates and constructs an instance of `definition`.
    pub fn create(
        &mut self,
        definition: DefinitionId,
        options: Option<ConstructOptions>,
    ) -> RuntimeResult<Instance> {
        let mut instance = Instance::new(definition);
        self.construct(&mut instance, options)?;
        Ok(instance)
    }

    /// Runs the construction pipeline on `instance`.
    ///
    /// Constructing an instance that has already left `Uninitialized` is a
    /// misuse; development builds report it and carry on.
    pub fn construct(
        &mut self,
        instance: &mut Instance,
        options: Option<ConstructOptions>,
    ) -> RuntimeResult<()> {
        if instance.stage() != LifecycleStage::Uninitialized && self.is_development() {
            self.diagnose(
                DiagnosticKind::Misuse,
                format!(
                    "instance {:?} is already at {:?}; construct a fresh instance instead",
                    instance.uid(),
                    instance.stage()
                ),
            );
        }
        self.definition(instance.definition())?;

        let uid = self.uids.next_uid();
        instance.assign_uid(uid);
        instance.advance(LifecycleStage::IdentityAssigned);

        let tags = self.probe.is_active().then(|| PerfTags::for_uid(uid));
        if let Some(tags) = &tags {
            self.probe.mark(&tags.start);
        }

        instance.flags_mut().is_managed = true;
        let bound = match options {
            Some(ConstructOptions::Internal(internal)) => {
                instance.flags_mut().is_internal = true;
                self.bind_internal(instance.definition(), uid, internal)?
            }
            Some(ConstructOptions::User(options)) => self.bind_resolved(instance, &options)?,
            None => self.bind_resolved(instance, &Options::new())?,
        };
        instance.bind_options(bound);
        instance.advance(LifecycleStage::OptionsBound);

        if self.is_development() {
            instance.set_proxy(ProxyMode::Guarded {
                allowed_globals: Arc::clone(&self.allowed_globals),
            });
        } else {
            instance.set_proxy(ProxyMode::Raw);
        }

        let subsystems = self.subsystems.clone();
        subsystems.lifecycle.init_lifecycle(instance)?;
        instance.advance(LifecycleStage::LifecycleScaffolded);
        subsystems.events.init_events(instance)?;
        instance.advance(LifecycleStage::EventsBound);
        subsystems.render.init_render(instance)?;
        instance.advance(LifecycleStage::RenderScaffolded);

        instance.call_hook(keys::BEFORE_CREATE)?;
        instance.advance(LifecycleStage::BeforeCreateFired);
        subsystems.injections.resolve_injections(instance)?;
        instance.advance(LifecycleStage::InjectionsResolved);
        subsystems.state.resolve_state(instance)?;
        instance.advance(LifecycleStage::StateResolved);
        subsystems.provide.resolve_provide(instance)?;
        instance.advance(LifecycleStage::ProvideResolved);
        instance.call_hook(keys::CREATED)?;
        instance.advance(LifecycleStage::CreatedFired);

        if let Some(tags) = &tags {
            let name = instance.display_name();
            self.probe.mark(&tags.end);
            self.probe.measure(&format!("weft {name} init"), &tags.start, &tags.end);
        }

        if let Some(target) = instance.options().get(keys::EL).cloned() {
            subsystems.mount.mount(self, instance, &target)?;
            instance.advance(LifecycleStage::Mounted);
        }
        Ok(())
    }

    /// Full path: resolved definition options merged with the per-call
    /// options, with the instance as merge context.
    fn bind_resolved(
        &mut self,
        instance: &Instance,
        options: &Options,
    ) -> RuntimeResult<EffectiveOptions> {
        let resolved = self.resolve(instance.definition())?;
        let merged = self.merge.merge(&resolved, options, Some(instance))?;
        Ok(EffectiveOptions::Resolved(Arc::new(merged)))
    }

    /// Fast path: explicit overrides in front of the definition's static
    /// options. Never resolves and never merges.
    fn bind_internal(
        &self,
        definition: DefinitionId,
        uid: Uid,
        internal: InternalComponentOptions,
    ) -> RuntimeResult<EffectiveOptions> {
        let fallback = Arc::clone(self.definition(definition)?.options());
        let component = internal
            .parent_node
            .component
            .as_ref()
            .ok_or(RuntimeError::MissingComponentOptions { uid })?;
        if component.definition != definition {
            return Err(RuntimeError::DefinitionMismatch {
                uid,
                expected: definition,
                found: component.definition,
            });
        }

        let mut layered = LayeredOptions::new(fallback);
        layered.set(
            keys::PARENT,
            internal
                .parent
                .map_or(OptionValue::Value(Value::Null), OptionValue::InstanceRef),
        );
        layered.set(keys::PARENT_VNODE, OptionValue::Node(Arc::clone(&internal.parent_node)));
        layered.set(keys::PROPS_DATA, Value::Object(component.props_data.clone()));
        layered.set(keys::PARENT_LISTENERS, OptionValue::Registry(component.listeners.clone()));
        layered.set(keys::RENDER_CHILDREN, OptionValue::Nodes(component.children.clone()));
        layered.set(keys::COMPONENT_TAG, json!(component.tag));
        if let Some(render) = internal.render {
            layered.set(keys::RENDER, OptionValue::Render(render.render));
            layered.set(
                keys::STATIC_RENDER_FNS,
                OptionValue::RenderList(render.static_render_fns),
            );
        }

        debug!(uid = %uid, overrides = layered.overrides().len(), "Bound internal options");
        Ok(EffectiveOptions::Layered(layered))
    }
}
