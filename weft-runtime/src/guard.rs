//! Development-only property access checks.
//!
//! Render code reads instance properties through a [`RenderScope`]. In
//! production the instance itself is the scope. In development the pipeline
//! marks the instance as guarded, and [`Instance::render_proxy`] hands out a
//! [`DiagnosticGuard`] that reports reads of names the instance does not
//! define.

use crate::instance::{Instance, ProxyMode};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeSet;
use tracing::warn;

/// Property access capability shared by instances and their guard.
pub trait RenderScope {
    /// Whether render code should treat `key` as defined.
    fn has(&self, key: &str) -> bool;

    fn get(&self, key: &str) -> Option<&Value>;
}

impl RenderScope for Instance {
    fn has(&self, key: &str) -> bool {
        self.property(key).is_some() || self.has_method(key)
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.property(key)
    }
}

/// Wraps an instance and warns on access to undefined names.
pub struct DiagnosticGuard<'a> {
    instance: &'a Instance,
    allowed_globals: &'a BTreeSet<String>,
    warnings: RefCell<Vec<String>>,
}

impl<'a> DiagnosticGuard<'a> {
    #[must_use]
    pub fn new(instance: &'a Instance, allowed_globals: &'a BTreeSet<String>) -> Self {
        Self {
            instance,
            allowed_globals,
            warnings: RefCell::new(Vec::new()),
        }
    }

    /// Warnings emitted so far.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }

    fn is_allowed(&self, key: &str) -> bool {
        self.allowed_globals.contains(key) || key.starts_with('_')
    }

    fn warn_missing(&self, key: &str) {
        let message = format!(
            "property \"{key}\" is not defined on the instance but referenced during render"
        );
        warn!(uid = ?self.instance.uid(), key, "{}", message);
        self.warnings.borrow_mut().push(message);
    }
}

impl RenderScope for DiagnosticGuard<'_> {
    fn has(&self, key: &str) -> bool {
        let has = self.instance.has(key);
        let allowed = self.is_allowed(key);
        if !has && !allowed {
            self.warn_missing(key);
        }
        has || !allowed
    }

    fn get(&self, key: &str) -> Option<&Value> {
        let value = self.instance.get(key);
        if value.is_none() && !self.instance.has_method(key) && !self.is_allowed(key) {
            self.warn_missing(key);
        }
        value
    }
}

/// Scope handed to render code: the raw instance or its guard.
pub enum RenderProxy<'a> {
    Raw(&'a Instance),
    Guarded(DiagnosticGuard<'a>),
}

impl RenderProxy<'_> {
    #[must_use]
    pub fn is_guarded(&self) -> bool {
        matches!(self, Self::Guarded(_))
    }

    /// Warnings emitted through the guard; always empty for a raw proxy.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        match self {
            Self::Raw(_) => Vec::new(),
            Self::Guarded(guard) => guard.warnings(),
        }
    }
}

impl RenderScope for RenderProxy<'_> {
    fn has(&self, key: &str) -> bool {
        match self {
            Self::Raw(instance) => instance.has(key),
            Self::Guarded(guard) => guard.has(key),
        }
    }

    fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Raw(instance) => RenderScope::get(*instance, key),
            Self::Guarded(guard) => guard.get(key),
        }
    }
}

impl Instance {
    /// The scope render code should read through.
    #[must_use]
    pub fn render_proxy(&self) -> RenderProxy<'_> {
        match self.proxy_mode() {
            ProxyMode::Raw => RenderProxy::Raw(self),
            ProxyMode::Guarded { allowed_globals } => {
                RenderProxy::Guarded(DiagnosticGuard::new(self, allowed_globals))
            }
        }
    }
}
