//! Shared test helpers for runtime tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;
use weft_runtime::{
    ComponentNodeOptions, DefinitionId, Instance, InternalComponentOptions, MergeError,
    MergeStrategy, OptionValue, Options, RenderFn, RenderNode, RuleTableMerge, Runtime,
    RuntimeConfig, Scope, Subsystems,
};

/// Installs a test-writer subscriber once; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Rule-table merge that counts how often it runs.
#[derive(Default)]
pub struct CountingMerge {
    inner: RuleTableMerge,
    calls: AtomicUsize,
}

impl CountingMerge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MergeStrategy for CountingMerge {
    fn merge(
        &self,
        parent: &Options,
        child: &Options,
        context: Option<&Instance>,
    ) -> Result<Options, MergeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.merge(parent, child, context)
    }
}

/// Runtime with a counting merge strategy.
pub fn counting_runtime(config: RuntimeConfig) -> (Runtime, Arc<CountingMerge>) {
    init_tracing();
    let merge = CountingMerge::new();
    let runtime = Runtime::builder()
        .config(config)
        .merge_strategy(merge.clone())
        .build();
    (runtime, merge)
}

pub fn runtime_with(subsystems: Subsystems) -> Runtime {
    init_tracing();
    Runtime::builder()
        .config(RuntimeConfig::production())
        .subsystems(subsystems)
        .build()
}

/// Ordered record of events shared between hooks, collaborators and the test.
#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// A one-hook sequence that records `label`.
    pub fn hook(&self, label: &str) -> OptionValue {
        let log = self.clone();
        let label = label.to_string();
        OptionValue::hook(move |_| {
            log.push(label.clone());
            Ok(())
        })
    }
}

/// Internal construction payload for a placeholder node of `definition`.
pub fn internal_options(
    definition: DefinitionId,
    parent: Option<weft_runtime::Uid>,
    configure: impl FnOnce(&mut ComponentNodeOptions),
) -> InternalComponentOptions {
    let mut component = ComponentNodeOptions::new(definition);
    configure(&mut component);
    InternalComponentOptions {
        parent,
        parent_node: Arc::new(RenderNode::component("vnode-placeholder", component)),
        render: None,
    }
}

pub fn render_fn<F>(f: F) -> RenderFn
where
    F: Fn(&Instance) -> anyhow::Result<RenderNode> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Builds a scope from a JSON object literal.
pub fn scope(value: serde_json::Value) -> Scope {
    value.as_object().cloned().unwrap_or_default()
}
