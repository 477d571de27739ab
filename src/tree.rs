//! Render tree.
//!
//! The walker's output: plain elements and component nodes carrying resolved
//! attributes and handlers. Prop values flow downward through a two-phase
//! protocol: `refresh` re-syncs a component's own linked attributes and then
//! `notify`s, which refreshes every node in its children and body.

use serde::Serialize;
use std::rc::Rc;
use tracing::warn;

use crate::component::{Accessor, Event, EventHandler, Mutator, Wrapper};
use crate::error::{BindError, BindResult};
use crate::value::Value;

// ═══════════════════════════════════════════════════════════════════════════════
// ATTRIBUTES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    Static,
    Dynamic,
    Linked,
}

pub enum Attribute {
    /// Literal key/value from markup.
    Static { key: String, value: String },
    /// Recomputed from scope on every read.
    Dynamic { key: String, source: Accessor },
    /// Dynamic, plus `sync` pushes the computed value into the owning
    /// component's declared property on refresh.
    Linked {
        key: String,
        source: Accessor,
        sync: Mutator,
    },
}

impl Attribute {
    pub fn constant(key: &str, value: &str) -> Self {
        let frozen = Value::from(value);
        Attribute::Dynamic {
            key: key.to_string(),
            source: Rc::new(move || frozen.clone()),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Attribute::Static { key, .. }
            | Attribute::Dynamic { key, .. }
            | Attribute::Linked { key, .. } => key,
        }
    }

    pub fn value(&self) -> Value {
        match self {
            Attribute::Static { value, .. } => Value::Text(value.clone()),
            Attribute::Dynamic { source, .. } | Attribute::Linked { source, .. } => source(),
        }
    }

    /// The value rendered as attribute text.
    pub fn text(&self) -> String {
        self.value().to_string()
    }

    pub fn binding(&self) -> BindingKind {
        match self {
            Attribute::Static { .. } => BindingKind::Static,
            Attribute::Dynamic { .. } => BindingKind::Dynamic,
            Attribute::Linked { .. } => BindingKind::Linked,
        }
    }

    pub fn refresh(&self) -> BindResult<()> {
        match self {
            Attribute::Linked { source, sync, .. } => sync(source()),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("key", &self.key())
            .field("binding", &self.binding())
            .field("value", &self.value())
            .finish()
    }
}

pub struct Handler {
    pub key: String,
    pub invoke: EventHandler,
}

impl Handler {
    pub fn new(key: &str, invoke: EventHandler) -> Self {
        Handler {
            key: key.to_string(),
            invoke,
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler").field("key", &self.key).finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct PlainNode {
    pub tag: String,
    pub children: Vec<Node>,
    pub properties: Vec<Attribute>,
    pub handlers: Vec<Handler>,
}

#[derive(Debug)]
pub struct ComponentNode {
    pub tag: String,
    /// The component's own template, expanded in the component's scope.
    pub children: Vec<Node>,
    /// Markup nested at the usage site.
    pub body: Vec<Node>,
    pub properties: Vec<Attribute>,
    pub handlers: Vec<Handler>,
    pub instance: Rc<Wrapper>,
}

#[derive(Debug)]
pub enum Node {
    Plain(PlainNode),
    Component(ComponentNode),
}

impl Node {
    pub fn tag(&self) -> &str {
        match self {
            Node::Plain(n) => &n.tag,
            Node::Component(n) => &n.tag,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Plain(n) => &n.children,
            Node::Component(n) => &n.children,
        }
    }

    /// Always empty for plain elements.
    pub fn body(&self) -> &[Node] {
        match self {
            Node::Plain(_) => &[],
            Node::Component(n) => &n.body,
        }
    }

    pub fn properties(&self) -> &[Attribute] {
        match self {
            Node::Plain(n) => &n.properties,
            Node::Component(n) => &n.properties,
        }
    }

    pub fn handlers(&self) -> &[Handler] {
        match self {
            Node::Plain(n) => &n.handlers,
            Node::Component(n) => &n.handlers,
        }
    }

    pub fn property(&self, key: &str) -> Option<&Attribute> {
        self.properties().iter().find(|p| p.key() == key)
    }

    pub fn instance(&self) -> Option<&Rc<Wrapper>> {
        match self {
            Node::Plain(_) => None,
            Node::Component(n) => Some(&n.instance),
        }
    }

    pub fn is_component(&self) -> bool {
        matches!(self, Node::Component(_))
    }

    /// Children followed by body.
    pub fn child_nodes(&self) -> impl Iterator<Item = &Node> {
        self.children().iter().chain(self.body().iter())
    }

    /// Follow `path` through [`Node::child_nodes`] indices.
    pub fn find(&self, path: &[usize]) -> Option<&Node> {
        match path.split_first() {
            None => Some(self),
            Some((first, rest)) => self.child_nodes().nth(*first)?.find(rest),
        }
    }

    /// Pre-order traversal of this node and everything below it.
    pub fn iter(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Sync this node's linked attributes, then notify.
    pub fn refresh(&self) -> Vec<BindError> {
        let mut errors = Vec::new();
        self.refresh_with(&mut |_tag: &str, err: BindError| errors.push(err));
        errors
    }

    /// Refresh every node in children and body.
    pub fn notify(&self) -> Vec<BindError> {
        let mut errors = Vec::new();
        self.notify_with(&mut |_tag: &str, err: BindError| errors.push(err));
        errors
    }

    /// Like [`Node::notify`], handing each failure to `on_error` with the tag
    /// of the component whose linked attribute failed.
    pub fn notify_with(&self, on_error: &mut dyn FnMut(&str, BindError)) {
        for child in self.child_nodes() {
            child.refresh_with(on_error);
        }
    }

    fn refresh_with(&self, on_error: &mut dyn FnMut(&str, BindError)) {
        if let Node::Component(n) = self {
            for prop in &n.properties {
                if let Err(err) = prop.refresh() {
                    warn!(tag = %n.tag, key = prop.key(), error = %err, "Linked attribute sync failed");
                    on_error(&n.tag, err);
                }
            }
        }
        self.notify_with(on_error);
    }

    /// Invoke this node's own handler for `key`. No bubbling, no refresh.
    pub fn handle(&self, key: &str, event: &Event) -> bool {
        match self.handlers().iter().find(|h| h.key == key) {
            Some(handler) => {
                (handler.invoke)(event);
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            tag: self.tag().to_string(),
            component: self.is_component(),
            instance_id: self
                .instance()
                .and_then(|w| w.instance_id())
                .map(|id| id.to_string()),
            attributes: self
                .properties()
                .iter()
                .map(|p| AttributeSnapshot {
                    key: p.key().to_string(),
                    value: p.value(),
                    binding: p.binding(),
                })
                .collect(),
            handlers: self.handlers().iter().map(|h| h.key.clone()).collect(),
            children: self.children().iter().map(Node::snapshot).collect(),
            body: self.body().iter().map(Node::snapshot).collect(),
        }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        let node = self.stack.pop()?;
        let below: Vec<&'a Node> = node.child_nodes().collect();
        self.stack.extend(below.into_iter().rev());
        Some(node)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SNAPSHOTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolved, serializable view of a node for a presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub tag: String,
    pub component: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    pub attributes: Vec<AttributeSnapshot>,
    pub handlers: Vec<String>,
    pub children: Vec<NodeSnapshot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<NodeSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSnapshot {
    pub key: String,
    pub value: Value,
    pub binding: BindingKind,
}
