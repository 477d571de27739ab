//! Markup walker.
//!
//! Turns a parsed [`MarkupTree`] into a render tree. Each element is either a
//! registered component kind, which gets a fresh instance, a child scope and
//! its template expanded underneath, or a plain element bound against the
//! scope it appears in.
//!
//! Failures local to one element (missing template, missing handler, failed
//! initialization, nesting too deep) drop that element and its subtree,
//! record a diagnostic and let the walk carry on with the siblings.

use std::rc::Rc;
use tracing::{debug, error, instrument, warn};

use crate::component::{is_identifier, Wrapper};
use crate::config::Config;
use crate::error::{BindError, BindResult, Diagnostic};
use crate::parse::{MarkupAttribute, MarkupNode, MarkupTree};
use crate::registry::Registry;
use crate::scope::Scope;
use crate::templates::TemplateStore;
use crate::tree::{Attribute, ComponentNode, Handler, Node, PlainNode};

#[derive(Debug, Default)]
pub struct WalkOutput {
    pub nodes: Vec<Node>,
    pub diagnostics: Vec<Diagnostic>,
}

impl WalkOutput {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn fatal(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_fatal())
    }

    pub fn has_fatal(&self) -> bool {
        self.fatal().next().is_some()
    }
}

pub struct Walker<'a> {
    registry: &'a Registry,
    templates: &'a TemplateStore,
    config: &'a Config,
    depth: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Walker<'a> {
    pub fn new(registry: &'a Registry, templates: &'a TemplateStore, config: &'a Config) -> Self {
        Walker {
            registry,
            templates,
            config,
            depth: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Walker for a component template one level further down.
    fn nested(&self) -> Walker<'a> {
        Walker {
            registry: self.registry,
            templates: self.templates,
            config: self.config,
            depth: self.depth + 1,
            diagnostics: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Walk `tree` in `scope`, then run one notify pass over the result so
    /// linked properties hold their initial values.
    #[instrument(skip_all, fields(roots = tree.nodes.len(), depth = self.depth))]
    pub fn walk(mut self, tree: &MarkupTree, scope: &Scope) -> WalkOutput {
        let mut nodes = Vec::new();
        for root in self.walk_nodes(&tree.nodes, scope) {
            let diagnostics = &mut self.diagnostics;
            root.notify_with(&mut |tag: &str, err: BindError| {
                diagnostics.push(Diagnostic::new(&err, Some(tag)));
            });
            nodes.push(root);
        }

        debug!(
            nodes = nodes.len(),
            diagnostics = self.diagnostics.len(),
            "Walk finished"
        );
        WalkOutput {
            nodes,
            diagnostics: self.diagnostics,
        }
    }

    /// Walk a sibling list without the initial notify.
    pub fn walk_nodes(&mut self, markup: &[MarkupNode], scope: &Scope) -> Vec<Node> {
        let mut nodes = Vec::with_capacity(markup.len());
        for element in markup {
            match self.walk_node(element, scope) {
                Ok(node) => nodes.push(node),
                Err(err) => {
                    error!(tag = element.tag(), error = %err, "Dropping element");
                    self.record(&err, Some(element.tag()));
                }
            }
        }
        nodes
    }

    fn walk_node(&mut self, element: &MarkupNode, scope: &Scope) -> BindResult<Node> {
        if self.registry.exists(element.tag()) {
            self.walk_component(element, scope)
        } else {
            self.walk_plain(element, scope)
        }
    }

    fn walk_plain(&mut self, element: &MarkupNode, scope: &Scope) -> BindResult<Node> {
        let (properties, handlers) = self.bind_attributes(element, scope, None)?;
        let children = self.walk_nodes(element.children(), scope);

        Ok(Node::Plain(PlainNode {
            tag: element.tag().to_string(),
            children,
            properties,
            handlers,
        }))
    }

    fn walk_component(&mut self, element: &MarkupNode, scope: &Scope) -> BindResult<Node> {
        let kind = element.tag();
        if self.depth >= self.config.max_depth {
            return Err(BindError::RecursionLimit {
                kind: kind.to_string(),
                limit: self.config.max_depth,
            });
        }

        let instance = Rc::new(self.registry.instance(kind)?);
        let child_scope = Scope::extend(instance.clone(), scope);

        let (properties, handlers) =
            self.bind_attributes(element, &child_scope, Some(&instance))?;
        let children = self.expand_template(kind, &instance, &child_scope)?;
        let body = self.walk_nodes(element.children(), &child_scope);

        debug!(
            kind,
            instance = instance.instance_id().unwrap_or_default(),
            children = children.len(),
            body = body.len(),
            "Bound component"
        );

        Ok(Node::Component(ComponentNode {
            tag: kind.to_string(),
            children,
            body,
            properties,
            handlers,
            instance,
        }))
    }

    /// Walk the template registered for `kind`. A kind without a template
    /// expands to nothing.
    fn expand_template(
        &mut self,
        kind: &str,
        instance: &Rc<Wrapper>,
        child_scope: &Scope,
    ) -> BindResult<Vec<Node>> {
        let Some(template_id) = self.registry.template_id_of(kind) else {
            return Ok(Vec::new());
        };
        let parsed = self
            .templates
            .parse(template_id)
            .ok_or_else(|| BindError::MissingTemplate {
                kind: kind.to_string(),
                template_id: template_id.to_string(),
            })?;

        for message in &parsed.errors {
            let err = BindError::Parse {
                source_id: template_id.to_string(),
                message: message.clone(),
            };
            warn!(kind, template_id, error = %err, "Template parsed with errors");
            self.record(&err, Some(kind));
        }

        let template_scope = if self.config.isolate_templates {
            Scope::extend(instance.clone(), &Scope::root())
        } else {
            child_scope.clone()
        };

        let mut nested = self.nested();
        let children = nested.walk_nodes(&parsed.tree.nodes, &template_scope);
        self.diagnostics.append(&mut nested.diagnostics);
        Ok(children)
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // ATTRIBUTES
    // ═══════════════════════════════════════════════════════════════════════════════

    /// Split markup attributes into properties and handlers. `owner` is the
    /// component the element instantiates, if any.
    fn bind_attributes(
        &mut self,
        element: &MarkupNode,
        scope: &Scope,
        owner: Option<&Rc<Wrapper>>,
    ) -> BindResult<(Vec<Attribute>, Vec<Handler>)> {
        let mut properties = Vec::new();
        let mut handlers = Vec::new();

        for attr in element.attributes() {
            if let Some(key) = attr.name.strip_prefix(self.config.prop_sigil) {
                properties.push(self.bind_property(element.tag(), key, attr, scope, owner));
            } else if let Some(key) = attr.name.strip_prefix(self.config.event_sigil) {
                let invoke = scope
                    .resolve_handler(&attr.value)
                    .ok_or_else(|| BindError::UnresolvedHandler {
                        key: key.to_string(),
                        name: attr.value.clone(),
                    })?;
                handlers.push(Handler::new(key, invoke));
            } else {
                properties.push(Attribute::Static {
                    key: attr.name.clone(),
                    value: attr.value.clone(),
                });
            }
        }

        Ok((properties, handlers))
    }

    fn bind_property(
        &mut self,
        tag: &str,
        key: &str,
        attr: &MarkupAttribute,
        scope: &Scope,
        owner: Option<&Rc<Wrapper>>,
    ) -> Attribute {
        let name = attr.value.trim();
        let source = if is_identifier(name) {
            scope.resolve_accessor(name)
        } else {
            None
        };

        let Some(source) = source else {
            let err = BindError::UnresolvedBinding {
                key: key.to_string(),
                name: attr.value.clone(),
            };
            warn!(tag, key, name = %attr.value, "Binding left unresolved");
            self.record(&err, Some(tag));
            return Attribute::constant(key, &attr.value);
        };

        let sync = owner.and_then(|wrapper| {
            let field = wrapper.is_declared_property(key)?;
            wrapper.mutator(field)
        });

        match sync {
            Some(sync) => Attribute::Linked {
                key: key.to_string(),
                source,
                sync,
            },
            None => Attribute::Dynamic {
                key: key.to_string(),
                source,
            },
        }
    }

    fn record(&mut self, err: &BindError, tag: Option<&str>) {
        self.diagnostics.push(Diagnostic::new(err, tag));
    }
}
