//! Definitions: reusable templates that instances are created from.

use crate::options::{same_callable, Hook, OptionValue, Options, Registry};
use std::sync::Arc;
use weft_types::{DefinitionId, Generation};

/// A definition stored in the runtime's arena.
///
/// For a root definition `options` are the authored options. For an extended
/// definition they are the last merge result of the parent's resolved options
/// with `extend_options`, and may be edited in place afterwards; such edits
/// are detected by diffing against `sealed`.
#[derive(Debug, Clone)]
pub struct Definition {
    id: DefinitionId,
    parent: Option<DefinitionId>,
    options: Arc<Options>,
    sealed: Arc<Options>,
    extend_options: Options,
    super_generation: Option<Generation>,
    generation: Generation,
}

impl Definition {
    pub(crate) fn root(id: DefinitionId, options: Options, generation: Generation) -> Self {
        let options = Arc::new(options);
        Self {
            id,
            parent: None,
            sealed: Arc::clone(&options),
            options,
            extend_options: Options::new(),
            super_generation: None,
            generation,
        }
    }

    pub(crate) fn extended(
        id: DefinitionId,
        parent: DefinitionId,
        merged: Options,
        extend_options: Options,
        super_generation: Generation,
        generation: Generation,
    ) -> Self {
        let options = Arc::new(merged);
        Self {
            id,
            parent: Some(parent),
            sealed: Arc::clone(&options),
            options,
            extend_options,
            super_generation: Some(super_generation),
            generation,
        }
    }

    #[must_use]
    pub fn id(&self) -> DefinitionId {
        self.id
    }

    /// The definition this one extends.
    #[must_use]
    pub fn parent(&self) -> Option<DefinitionId> {
        self.parent
    }

    /// Current options, shared with instances bound on the fast path.
    #[must_use]
    pub fn options(&self) -> &Arc<Options> {
        &self.options
    }

    /// Snapshot taken when `options` were last computed.
    #[must_use]
    pub fn sealed(&self) -> &Arc<Options> {
        &self.sealed
    }

    /// Options passed to `extend`, plus any edits folded in since.
    #[must_use]
    pub fn extend_options(&self) -> &Options {
        &self.extend_options
    }

    /// Parent generation the cached options were merged from.
    #[must_use]
    pub fn super_generation(&self) -> Option<Generation> {
        self.super_generation
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.options.name()
    }

    /// Fields of `options` that differ from the sealed snapshot.
    ///
    /// Keys removed since sealing are not reported. Hook sequences and
    /// registries keep only what came from `extend_options` or changed after
    /// sealing, so values inherited from the parent are not folded back in
    /// where they would shadow later parent changes.
    pub(crate) fn modified_options(&self) -> Option<Options> {
        if Arc::ptr_eq(&self.options, &self.sealed) {
            return None;
        }
        let modified: Options = self
            .options
            .iter()
            .filter(|(key, value)| self.sealed.get(key) != Some(*value))
            .map(|(key, latest)| {
                let value = match latest {
                    OptionValue::Hooks(hooks) => OptionValue::Hooks(dedupe_hooks(
                        hooks,
                        self.extend_options.get(key),
                        self.sealed.get(key),
                    )),
                    OptionValue::Registry(entries) => OptionValue::Registry(local_entries(
                        entries,
                        self.extend_options.get(key),
                        self.sealed.get(key),
                    )),
                    other => other.clone(),
                };
                (key.clone(), value)
            })
            .collect();
        (!modified.is_empty()).then_some(modified)
    }

    pub(crate) fn fold_modifications(&mut self, modified: Options) {
        self.extend_options.extend(modified);
    }

    /// Replaces `extend_options` and drops the cached parent generation, so
    /// the next resolution re-merges.
    pub(crate) fn replace_extend_options(&mut self, extend_options: Options, generation: Generation) {
        self.extend_options = extend_options;
        self.super_generation = None;
        self.generation = generation;
    }

    /// Installs freshly merged options and reseals.
    pub(crate) fn rebind(
        &mut self,
        options: Arc<Options>,
        super_generation: Generation,
        generation: Generation,
    ) {
        self.sealed = Arc::clone(&options);
        self.options = options;
        self.super_generation = Some(super_generation);
        self.generation = generation;
    }

    /// Replaces the options of a root definition. Descendants pick the change
    /// up through the new generation.
    pub(crate) fn replace_options(&mut self, options: Options, generation: Generation) {
        self.options = Arc::new(options);
        self.generation = generation;
    }

    pub(crate) fn set_option(&mut self, key: &str, value: OptionValue, generation: Generation) {
        Arc::make_mut(&mut self.options).insert(key, value);
        self.generation = generation;
    }
}

fn dedupe_hooks(latest: &[Hook], extended: Option<&OptionValue>, sealed: Option<&OptionValue>) -> Vec<Hook> {
    let contains = |value: Option<&OptionValue>, hook: &Hook| {
        value
            .and_then(OptionValue::as_hooks)
            .is_some_and(|seq| seq.iter().any(|h| same_callable(h, hook)))
    };
    latest
        .iter()
        .filter(|hook| contains(extended, *hook) || !contains(sealed, *hook))
        .cloned()
        .collect()
}

fn local_entries(latest: &Registry, extended: Option<&OptionValue>, sealed: Option<&OptionValue>) -> Registry {
    let extended = extended.and_then(OptionValue::as_registry);
    let sealed = sealed.and_then(OptionValue::as_registry);
    latest
        .iter()
        .filter(|(name, value)| {
            extended.is_some_and(|r| r.contains_key(*name))
                || sealed.and_then(|r| r.get(*name)) != Some(*value)
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
