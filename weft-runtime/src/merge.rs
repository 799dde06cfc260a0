//! Field-level merge rules.
//!
//! A [`MergeStrategy`] combines a parent option set with a child option set.
//! The resolver caches merge results, so every strategy must be deterministic
//! and free of side effects for identical inputs.
//!
//! The bundled strategy, [`RuleTableMerge`], looks each key up in a
//! [`MergeRules`] table:
//!
//! | rule           | behavior                                                   |
//! |----------------|------------------------------------------------------------|
//! | `Override`     | child value if present, else parent value                  |
//! | `Concat`       | hook sequences, parent first then child                    |
//! | `Registry`     | key-by-key merge of named sub-registries, child precedence |
//! | `Factory`      | combined factory: parent scope overlaid with child scope   |
//! | `InstanceOnly` | like `Override`, warns when merged outside instance creation |
//! | `Custom`       | caller-supplied function                                   |

use crate::error::MergeError;
use crate::instance::Instance;
use crate::options::{keys, Factory, OptionValue, Options, Registry, Scope};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Combines a parent and a child option set into one.
pub trait MergeStrategy {
    /// `context` is the instance under construction when merging per-call
    /// options, and `None` when merging definitions.
    fn merge(
        &self,
        parent: &Options,
        child: &Options,
        context: Option<&Instance>,
    ) -> Result<Options, MergeError>;
}

/// Signature of a caller-supplied field rule. Returning `Ok(None)` drops the
/// field from the result.
pub type CustomRule = Arc<
    dyn Fn(
            Option<&OptionValue>,
            Option<&OptionValue>,
            Option<&Instance>,
        ) -> Result<Option<OptionValue>, MergeError>
        + Send
        + Sync,
>;

/// How a single option key is merged.
#[derive(Clone)]
pub enum FieldRule {
    Override,
    Concat,
    Registry,
    Factory,
    InstanceOnly,
    Custom(CustomRule),
}

impl fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Override => f.write_str("Override"),
            Self::Concat => f.write_str("Concat"),
            Self::Registry => f.write_str("Registry"),
            Self::Factory => f.write_str("Factory"),
            Self::InstanceOnly => f.write_str("InstanceOnly"),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Per-key rule table with a fallback rule for unlisted keys.
#[derive(Debug, Clone)]
pub struct MergeRules {
    rules: HashMap<String, FieldRule>,
    fallback: FieldRule,
}

impl MergeRules {
    /// An empty table where every key uses `fallback`.
    #[must_use]
    pub fn empty(fallback: FieldRule) -> Self {
        Self {
            rules: HashMap::new(),
            fallback,
        }
    }

    /// The standard component table.
    #[must_use]
    pub fn standard() -> Self {
        let mut rules = Self::empty(FieldRule::Override);
        for hook in keys::LIFECYCLE_HOOKS {
            rules.set(*hook, FieldRule::Concat);
        }
        for key in [
            keys::COMPONENTS,
            keys::DIRECTIVES,
            keys::FILTERS,
            keys::COMPUTED,
            keys::METHODS,
            keys::PROPS,
            keys::INJECT,
            keys::WATCH,
        ] {
            rules.set(key, FieldRule::Registry);
        }
        rules.set(keys::DATA, FieldRule::Factory);
        rules.set(keys::PROVIDE, FieldRule::Factory);
        rules.set(keys::EL, FieldRule::InstanceOnly);
        rules.set(keys::PROPS_DATA, FieldRule::InstanceOnly);
        rules
    }

    /// Sets the rule for `key`, replacing any previous one.
    pub fn set(&mut self, key: impl Into<String>, rule: FieldRule) -> &mut Self {
        self.rules.insert(key.into(), rule);
        self
    }

    /// Builder form of [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, rule: FieldRule) -> Self {
        self.set(key, rule);
        self
    }

    /// Returns the rule that applies to `key`.
    #[must_use]
    pub fn rule_for(&self, key: &str) -> &FieldRule {
        self.rules.get(key).unwrap_or(&self.fallback)
    }
}

impl Default for MergeRules {
    fn default() -> Self {
        Self::standard()
    }
}

/// [`MergeStrategy`] driven by a [`MergeRules`] table.
#[derive(Debug, Clone, Default)]
pub struct RuleTableMerge {
    rules: MergeRules,
}

impl RuleTableMerge {
    #[must_use]
    pub fn new(rules: MergeRules) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn rules(&self) -> &MergeRules {
        &self.rules
    }
}

impl MergeStrategy for RuleTableMerge {
    fn merge(
        &self,
        parent: &Options,
        child: &Options,
        context: Option<&Instance>,
    ) -> Result<Options, MergeError> {
        let mut merged = Options::new();
        let keys = parent
            .keys()
            .chain(child.keys().filter(|key| !parent.contains_key(key)));
        for key in keys {
            let rule = self.rules.rule_for(key);
            if let Some(value) = merge_field(rule, key, parent.get(key), child.get(key), context)? {
                merged.insert(key, value);
            }
        }
        Ok(merged)
    }
}

fn merge_field(
    rule: &FieldRule,
    key: &str,
    parent: Option<&OptionValue>,
    child: Option<&OptionValue>,
    context: Option<&Instance>,
) -> Result<Option<OptionValue>, MergeError> {
    match rule {
        FieldRule::Override => Ok(child.or(parent).cloned()),
        FieldRule::InstanceOnly => {
            if context.is_none() && child.is_some() {
                warn!(key, "option can only be used during instance creation");
            }
            Ok(child.or(parent).cloned())
        }
        FieldRule::Concat => merge_hooks(key, parent, child).map(Some),
        FieldRule::Registry => merge_registries(key, parent, child).map(Some),
        FieldRule::Factory => merge_factories(key, parent, child).map(Some),
        FieldRule::Custom(f) => f(parent, child, context),
    }
}

fn mismatch(key: &str, expected: &'static str, found: &OptionValue) -> MergeError {
    MergeError::TypeMismatch {
        key: key.to_string(),
        expected,
        found: found.kind(),
    }
}

fn merge_hooks(
    key: &str,
    parent: Option<&OptionValue>,
    child: Option<&OptionValue>,
) -> Result<OptionValue, MergeError> {
    let mut hooks = Vec::new();
    for value in [parent, child].into_iter().flatten() {
        let seq = value.as_hooks().ok_or_else(|| mismatch(key, "hooks", value))?;
        hooks.extend(seq.iter().cloned());
    }
    Ok(OptionValue::Hooks(hooks))
}

fn merge_registries(
    key: &str,
    parent: Option<&OptionValue>,
    child: Option<&OptionValue>,
) -> Result<OptionValue, MergeError> {
    let mut registry = Registry::new();
    for value in [parent, child].into_iter().flatten() {
        let entries = value
            .as_registry()
            .ok_or_else(|| mismatch(key, "registry", value))?;
        registry.extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    Ok(OptionValue::Registry(registry))
}

fn merge_factories(
    key: &str,
    parent: Option<&OptionValue>,
    child: Option<&OptionValue>,
) -> Result<OptionValue, MergeError> {
    let as_factory = |value: &OptionValue| match value {
        OptionValue::Factory(f) => Ok(Arc::clone(f)),
        other => Err(mismatch(key, "factory", other)),
    };
    match (parent, child) {
        (Some(p), Some(c)) => {
            let parent: Factory = as_factory(p)?;
            let child: Factory = as_factory(c)?;
            Ok(OptionValue::factory(move |vm| {
                let mut scope = parent(vm)?;
                overlay(&mut scope, child(vm)?);
                Ok(scope)
            }))
        }
        (Some(only), None) | (None, Some(only)) => as_factory(only).map(OptionValue::Factory),
        (None, None) => Err(MergeError::MissingField(key.to_string())),
    }
}

/// Overlays `top` onto `base`; nested objects present on both sides are
/// merged recursively, everything else is taken from `top`.
fn overlay(base: &mut Scope, top: Scope) {
    for (key, value) in top {
        match (base.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => overlay(existing, incoming),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
