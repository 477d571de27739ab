//! Component-kind registry.
//!
//! Maps kind names (the tag used in markup) to prototype wrappers and to the
//! id of the template each kind expands into. Kind names are matched without
//! regard to case because HTML tag names are case-insensitive.

use std::collections::HashMap;
use tracing::debug;

use crate::component::{Component, Wrapper};
use crate::error::{BindError, BindResult};

#[derive(Default)]
pub struct Registry {
    prototypes: HashMap<String, Wrapper>,
    templates: HashMap<String, String>,
}

fn normalize(kind: &str) -> String {
    kind.to_lowercase()
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: &str, prototype: Wrapper) {
        debug!(kind, component = prototype.kind(), "Registering component kind");
        self.prototypes.insert(normalize(kind), prototype);
    }

    pub fn register_template(&mut self, kind: &str, template_id: &str) {
        debug!(kind, template_id, "Registering component template");
        self.templates
            .insert(normalize(kind), template_id.to_string());
    }

    /// Wrap `C` and register it under `kind` with its template.
    pub fn component<C: Component>(&mut self, kind: &str, template_id: &str) -> BindResult<()> {
        let prototype = Wrapper::wrap::<C>()?;
        self.register(kind, prototype);
        self.register_template(kind, template_id);
        Ok(())
    }

    pub fn exists(&self, kind: &str) -> bool {
        self.prototypes.contains_key(&normalize(kind))
    }

    /// A fresh, independent instance of `kind`.
    pub fn instance(&self, kind: &str) -> BindResult<Wrapper> {
        let prototype = self
            .prototypes
            .get(&normalize(kind))
            .ok_or_else(|| BindError::UnknownComponent {
                kind: kind.to_string(),
            })?;
        prototype.instantiate()
    }

    pub fn template_id_of(&self, kind: &str) -> Option<&str> {
        self.templates.get(&normalize(kind)).map(|s| s.as_str())
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.prototypes.keys().map(|s| s.as_str())
    }
}
