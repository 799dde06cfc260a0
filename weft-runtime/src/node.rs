//! Render-tree nodes handed to the pipeline by the render subsystem.
//!
//! The pipeline never builds or diffs these; it only reads the component
//! payload of the node that spawned an internal instance.

use crate::options::{Registry, Scope};
use std::sync::Arc;
use weft_types::DefinitionId;

/// One node of a render tree.
#[derive(Debug, Clone, Default)]
pub struct RenderNode {
    pub tag: String,
    pub key: Option<String>,
    pub text: Option<String>,
    /// Named slot this node is rendered into, if any.
    pub slot: Option<String>,
    pub children: Vec<Arc<RenderNode>>,
    /// Present when the node stands for a child component.
    pub component: Option<ComponentNodeOptions>,
}

impl RenderNode {
    /// Creates an element node.
    #[must_use]
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Creates a text node.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Creates a placeholder node for a child component.
    #[must_use]
    pub fn component(tag: impl Into<String>, options: ComponentNodeOptions) -> Self {
        Self {
            tag: tag.into(),
            component: Some(options),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_slot(mut self, slot: impl Into<String>) -> Self {
        self.slot = Some(slot.into());
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: RenderNode) -> Self {
        self.children.push(Arc::new(child));
        self
    }
}

/// Component payload carried by a placeholder node.
#[derive(Debug, Clone)]
pub struct ComponentNodeOptions {
    pub definition: DefinitionId,
    pub props_data: Scope,
    /// Listener name to [`OptionValue::Handler`](crate::OptionValue::Handler).
    pub listeners: Registry,
    /// Content passed between the component's tags.
    pub children: Vec<Arc<RenderNode>>,
    pub tag: Option<String>,
}

impl ComponentNodeOptions {
    #[must_use]
    pub fn new(definition: DefinitionId) -> Self {
        Self {
            definition,
            props_data: Scope::new(),
            listeners: Registry::new(),
            children: Vec::new(),
            tag: None,
        }
    }
}
