//! The runtime context: owns every definition, the uid and generation
//! counters, the merge strategy, the subsystems and the timing probe.

use crate::config::RuntimeConfig;
use crate::definition::Definition;
use crate::error::{RuntimeError, RuntimeResult};
use crate::merge::{MergeStrategy, RuleTableMerge};
use crate::naming::{camelize, capitalize, validate_component_name};
use crate::options::{keys, OptionValue, Options};
use crate::probe::{PerformanceProbe, TimingFacility};
use crate::subsystems::Subsystems;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};
use weft_types::{DefinitionId, Generation, GenerationCounter, UidAllocator};

/// Category of a non-fatal development diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The construction entry point was used the wrong way.
    Misuse,
    InvalidComponentName,
}

/// A non-fatal development diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Builds a [`Runtime`].
#[derive(Default)]
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    merge: Option<Arc<dyn MergeStrategy>>,
    subsystems: Subsystems,
    timing: Option<Arc<dyn TimingFacility>>,
}

impl RuntimeBuilder {
    #[must_use]
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the default [`RuleTableMerge`].
    #[must_use]
    pub fn merge_strategy(mut self, strategy: Arc<dyn MergeStrategy>) -> Self {
        self.merge = Some(strategy);
        self
    }

    #[must_use]
    pub fn subsystems(mut self, subsystems: Subsystems) -> Self {
        self.subsystems = subsystems;
        self
    }

    /// Installs a host timing facility. It is only used in development
    /// builds with `performance` enabled.
    #[must_use]
    pub fn timing(mut self, facility: Arc<dyn TimingFacility>) -> Self {
        self.timing = Some(facility);
        self
    }

    #[must_use]
    pub fn build(self) -> Runtime {
        let instrumented = self.config.is_development() && self.config.performance;
        Runtime {
            probe: PerformanceProbe::new(instrumented, self.timing),
            merge: self
                .merge
                .unwrap_or_else(|| Arc::new(RuleTableMerge::default())),
            subsystems: self.subsystems,
            allowed_globals: Arc::new(self.config.allowed_globals.clone()),
            config: self.config,
            definitions: Vec::new(),
            uids: UidAllocator::new(),
            generations: GenerationCounter::new(),
            warnings: Vec::new(),
        }
    }
}

/// Process-wide context for resolving definitions and constructing
/// instances. Single threaded; every operation takes `&mut self`.
pub struct Runtime {
    pub(crate) config: RuntimeConfig,
    pub(crate) definitions: Vec<Definition>,
    pub(crate) uids: UidAllocator,
    pub(crate) generations: GenerationCounter,
    pub(crate) merge: Arc<dyn MergeStrategy>,
    pub(crate) subsystems: Subsystems,
    pub(crate) probe: PerformanceProbe,
    pub(crate) allowed_globals: Arc<BTreeSet<String>>,
    warnings: Vec<Diagnostic>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Runtime {
    /// A runtime with default merge rules and subsystems.
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        Self::builder().config(config).build()
    }

    #[must_use]
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        self.config.is_development()
    }

    #[must_use]
    pub fn probe(&self) -> &PerformanceProbe {
        &self.probe
    }

    /// Number of instances constructed so far.
    #[must_use]
    pub fn instances_created(&self) -> u64 {
        self.uids.issued()
    }

    // ================================================================
    // Definitions
    // ================================================================

    /// Registers a root definition.
    pub fn define(&mut self, options: Options) -> DefinitionId {
        let id = self.next_definition_id();
        let generation = self.generations.bump();
        info!(definition = %id, name = ?options.name(), "Definition created");
        self.definitions.push(Definition::root(id, options, generation));
        id
    }

    /// Creates a definition extending `parent` with `extend_options`.
    ///
    /// The child is merged immediately and, when the merged options carry a
    /// name, registers itself in its own `components` registry.
    pub fn extend(&mut self, parent: DefinitionId, extend_options: Options) -> RuntimeResult<DefinitionId> {
        let parent_options = self.resolve(parent)?;
        let super_generation = self.definition(parent)?.generation();

        if self.is_development()
            && let Some(name) = extend_options.name()
            && let Err(message) = validate_component_name(name)
        {
            self.diagnose(DiagnosticKind::InvalidComponentName, message);
        }

        let mut merged = self.merge.merge(&parent_options, &extend_options, None)?;
        let id = self.next_definition_id();
        if let Some(name) = merged.name().map(str::to_owned) {
            merged.register_component(name, id);
        }
        let generation = self.generations.bump();
        info!(definition = %id, parent = %parent, name = ?merged.name(), "Definition extended");
        self.definitions.push(Definition::extended(
            id,
            parent,
            merged,
            extend_options,
            super_generation,
            generation,
        ));
        Ok(id)
    }

    /// Merges `options` into a definition.
    ///
    /// On a root definition this is a global mixin merged in place: every
    /// descendant sees a new parent generation and re-merges on its next
    /// resolution. On an extended definition `options` are merged into its
    /// extend options and the definition is recomputed against the current
    /// parent, so parent values are never captured in the result.
    pub fn mixin(&mut self, id: DefinitionId, options: Options) -> RuntimeResult<()> {
        if self.definition(id)?.parent().is_none() {
            let current = Arc::clone(self.definition(id)?.options());
            let merged = self.merge.merge(&current, &options, None)?;
            let generation = self.generations.bump();
            self.definition_mut(id)?.replace_options(merged, generation);
            info!(definition = %id, generation = %generation, "Mixin applied");
            return Ok(());
        }

        // Fold pending in-place edits first so the mixin lands on top of them.
        self.resolve(id)?;
        let extend_options = self
            .merge
            .merge(self.definition(id)?.extend_options(), &options, None)?;
        let generation = self.generations.bump();
        self.definition_mut(id)?
            .replace_extend_options(extend_options, generation);
        self.resolve(id)?;
        info!(definition = %id, generation = %generation, "Mixin applied to extend options");
        Ok(())
    }

    /// Edits one field of a definition's options in place.
    pub fn set_option(
        &mut self,
        id: DefinitionId,
        key: &str,
        value: impl Into<OptionValue>,
    ) -> RuntimeResult<Generation> {
        let generation = self.generations.bump();
        self.definition_mut(id)?.set_option(key, value.into(), generation);
        Ok(generation)
    }

    #[must_use]
    pub fn get_definition(&self, id: DefinitionId) -> Option<&Definition> {
        self.definitions.get(id.index())
    }

    pub fn definition(&self, id: DefinitionId) -> RuntimeResult<&Definition> {
        self.get_definition(id)
            .ok_or(RuntimeError::UnknownDefinition(id))
    }

    pub(crate) fn definition_mut(&mut self, id: DefinitionId) -> RuntimeResult<&mut Definition> {
        self.definitions
            .get_mut(id.index())
            .ok_or(RuntimeError::UnknownDefinition(id))
    }

    /// Looks `name` up in the `components` registry of the resolved options
    /// of `id`, trying the name as given, camelized, then PascalCase.
    pub fn lookup_component(&mut self, id: DefinitionId, name: &str) -> RuntimeResult<Option<DefinitionId>> {
        let options = self.resolve(id)?;
        let Some(registry) = options.registry(keys::COMPONENTS) else {
            return Ok(None);
        };
        let camel = camelize(name);
        let pascal = capitalize(&camel);
        let found = [name, camel.as_str(), pascal.as_str()]
            .into_iter()
            .find_map(|candidate| match registry.get(candidate) {
                Some(OptionValue::Component(def)) => Some(*def),
                _ => None,
            });
        Ok(found)
    }

    fn next_definition_id(&self) -> DefinitionId {
        DefinitionId::from_index(self.definitions.len() as u32)
    }

    // ================================================================
    // Diagnostics
    // ================================================================

    pub(crate) fn diagnose(&mut self, kind: DiagnosticKind, message: String) {
        warn!(?kind, "{}", message);
        self.warnings.push(Diagnostic { kind, message });
    }

    #[must_use]
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    /// Drains collected diagnostics.
    pub fn take_warnings(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.warnings)
    }
}
