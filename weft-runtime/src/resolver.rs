//! Configuration resolution.
//!
//! Resolving a definition merges its ancestor chain into one option set.
//! Results are cached on each definition and keyed by the parent's
//! generation, so an unchanged chain is never re-merged. In-place edits made
//! after a definition's options were sealed are detected by diffing against
//! the sealed snapshot and folded into the definition's extend options before
//! re-merging.

use crate::error::RuntimeResult;
use crate::options::Options;
use crate::runtime::Runtime;
use std::sync::Arc;
use tracing::debug;
use weft_types::DefinitionId;

impl Runtime {
    /// Returns the final options of `id`, re-merging only what changed.
    ///
    /// Resolution has one observable side effect: a recomputed definition
    /// whose options carry a `name` registers itself under that name in its
    /// own `components` registry.
    pub fn resolve(&mut self, id: DefinitionId) -> RuntimeResult<Arc<Options>> {
        let Some(parent) = self.definition(id)?.parent() else {
            return Ok(Arc::clone(self.definition(id)?.options()));
        };

        let parent_options = self.resolve(parent)?;
        let parent_generation = self.definition(parent)?.generation();

        let definition = self.definition(id)?;
        let modified = definition.modified_options();
        if definition.super_generation() == Some(parent_generation) && modified.is_none() {
            return Ok(Arc::clone(definition.options()));
        }

        let modified_keys = modified.as_ref().map_or(0, Options::len);
        let generation = self.generations.bump();
        let strategy = Arc::clone(&self.merge);
        let definition = self.definition_mut(id)?;
        if let Some(modified) = modified {
            definition.fold_modifications(modified);
        }

        let mut merged = strategy.merge(&parent_options, definition.extend_options(), None)?;
        if let Some(name) = merged.name().map(str::to_owned) {
            merged.register_component(name, id);
        }
        definition.rebind(Arc::new(merged), parent_generation, generation);

        debug!(
            definition = %id,
            parent = %parent,
            parent_generation = %parent_generation,
            generation = %generation,
            modified_keys,
            "Definition options recomputed"
        );
        Ok(Arc::clone(definition.options()))
    }
}
