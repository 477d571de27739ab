//! Application entry point.
//!
//! [`App`] owns the registry, the template store and the configuration.
//! [`App::mount`] parses a target template, walks it with the empty root
//! scope and hands back a [`Mount`] holding the live render tree.

use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

use crate::component::{Component, Event};
use crate::config::Config;
use crate::error::{BindError, BindResult, Diagnostic};
use crate::registry::Registry;
use crate::scope::Scope;
use crate::templates::TemplateStore;
use crate::tree::{Node, NodeSnapshot};
use crate::walker::Walker;

#[derive(Default)]
pub struct App {
    config: Config,
    registry: Registry,
    templates: TemplateStore,
}

impl App {
    pub fn new(config: Config) -> BindResult<Self> {
        config.validate()?;
        Ok(App {
            config,
            registry: Registry::new(),
            templates: TemplateStore::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    pub fn templates_mut(&mut self) -> &mut TemplateStore {
        &mut self.templates
    }

    /// Register component `C` under `kind`, expanding into `template_id`.
    pub fn component<C: Component>(&mut self, kind: &str, template_id: &str) -> BindResult<&mut Self> {
        self.registry.component::<C>(kind, template_id)?;
        Ok(self)
    }

    pub fn template(&mut self, id: &str, content: &str) -> &mut Self {
        self.templates.register(id, content);
        self
    }

    pub fn load_templates(&mut self, dir: &Path, extension: &str) -> usize {
        self.templates.load_dir(dir, extension)
    }

    #[instrument(skip(self))]
    pub fn mount(&self, template_id: &str) -> BindResult<Mount> {
        let parsed = self
            .templates
            .parse(template_id)
            .ok_or_else(|| BindError::MissingTemplate {
                kind: "mount".to_string(),
                template_id: template_id.to_string(),
            })?;

        let mut diagnostics: Vec<Diagnostic> = parsed
            .errors
            .iter()
            .map(|message| {
                let err = BindError::Parse {
                    source_id: template_id.to_string(),
                    message: message.clone(),
                };
                warn!(error = %err, "Mount target parsed with errors");
                Diagnostic::new(&err, None)
            })
            .collect();

        let output = Walker::new(&self.registry, &self.templates, &self.config)
            .walk(&parsed.tree, &Scope::root());
        diagnostics.extend(output.diagnostics);

        info!(
            template_id,
            roots = output.nodes.len(),
            diagnostics = diagnostics.len(),
            "Mounted template"
        );

        Ok(Mount {
            template_id: template_id.to_string(),
            nodes: output.nodes,
            diagnostics,
            refresh_after_dispatch: self.config.refresh_after_dispatch,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MOUNT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct Mount {
    template_id: String,
    nodes: Vec<Node>,
    diagnostics: Vec<Diagnostic>,
    refresh_after_dispatch: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MountSnapshot {
    pub template_id: String,
    pub nodes: Vec<NodeSnapshot>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Mount {
    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Re-sync every linked attribute in the tree.
    pub fn notify(&self) -> Vec<BindError> {
        self.nodes.iter().flat_map(Node::notify).collect()
    }

    /// The first index picks a root; the rest follow [`Node::find`].
    pub fn find(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        self.nodes.get(*first)?.find(rest)
    }

    /// Deliver `event` to the `key` handler of the node at `path`. Returns
    /// whether a handler ran.
    pub fn dispatch(&self, path: &[usize], key: &str, event: &Event) -> bool {
        let Some(node) = self.find(path) else {
            debug!(?path, key, "No node at dispatch path");
            return false;
        };
        if !node.handle(key, event) {
            return false;
        }
        if self.refresh_after_dispatch {
            for err in self.notify() {
                warn!(key, error = %err, "Refresh after dispatch failed");
            }
        }
        true
    }

    pub fn snapshot(&self) -> MountSnapshot {
        MountSnapshot {
            template_id: self.template_id.clone(),
            nodes: self.nodes.iter().map(Node::snapshot).collect(),
            diagnostics: self.diagnostics.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }
}
