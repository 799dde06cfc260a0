//! Definition resolution and instance construction for Weft.
//!
//! - [`Runtime`] owns every definition and constructs instances from them
//! - [`Runtime::resolve`] merges a definition's ancestor chain, caching the
//!   result per definition and re-merging only after a parent or local change
//! - [`Runtime::construct`] runs the fixed construction pipeline, with a fast
//!   path for instances spawned by a parent render pass
//! - [`MergeStrategy`] / [`MergeRules`] define how option fields combine
//! - [`Subsystems`] are the collaborators each pipeline stage delegates to
//! - [`PerformanceProbe`] and [`DiagnosticGuard`] are development-only aids

mod config;
mod definition;
mod error;
mod guard;
mod instance;
mod merge;
pub mod naming;
mod node;
mod options;
mod pipeline;
mod probe;
mod resolver;
mod runtime;
mod subsystems;

pub use config::RuntimeConfig;
pub use definition::Definition;
pub use error::{MergeError, RuntimeError, RuntimeResult};
pub use guard::{DiagnosticGuard, RenderProxy, RenderScope};
pub use instance::{
    EffectiveOptions, Instance, InstanceFlags, LayeredOptions, LifecycleLinks, LifecycleStage,
    ProxyMode, RenderSlot,
};
pub use merge::{CustomRule, FieldRule, MergeRules, MergeStrategy, RuleTableMerge};
pub use node::{ComponentNodeOptions, RenderNode};
pub use options::{
    keys, Factory, Getter, Handler, Hook, OptionValue, Options, Registry, RenderFn, Scope,
};
pub use pipeline::{ConstructOptions, InternalComponentOptions, RenderOverride};
pub use probe::{InMemoryTimeline, Measure, PerfTags, PerformanceProbe, TimingFacility};
pub use runtime::{Diagnostic, DiagnosticKind, Runtime, RuntimeBuilder};
pub use subsystems::{
    DefaultEvents, DefaultInjections, DefaultLifecycle, DefaultMount, DefaultProvide,
    DefaultRender, DefaultState, EventsInstaller, InjectionResolver, LifecycleInstaller, Mounter,
    ProvideResolver, RenderInstaller, StateResolver, Subsystems,
};
pub use weft_types::{BuildMode, DefinitionId, Generation, Uid};
