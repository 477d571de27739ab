//! Scope chain.
//!
//! A scope is an immutable, singly linked list of live component wrappers,
//! innermost first. Name lookups walk outward and the closest definition wins.

use std::rc::Rc;

use crate::component::{Accessor, EventHandler, Wrapper};

struct Layer {
    wrapper: Rc<Wrapper>,
    parent: Scope,
}

#[derive(Clone, Default)]
pub struct Scope {
    layer: Option<Rc<Layer>>,
}

impl Scope {
    /// The empty terminal scope. Every lookup against it fails.
    pub fn root() -> Self {
        Scope::default()
    }

    pub fn extend(wrapper: Rc<Wrapper>, parent: &Scope) -> Self {
        Scope {
            layer: Some(Rc::new(Layer {
                wrapper,
                parent: parent.clone(),
            })),
        }
    }

    pub fn is_root(&self) -> bool {
        self.layer.is_none()
    }

    pub fn wrapper(&self) -> Option<&Rc<Wrapper>> {
        self.layer.as_ref().map(|layer| &layer.wrapper)
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.layer.as_ref().map(|layer| &layer.parent)
    }

    /// Number of wrappers between this scope and the root.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self;
        while let Some(layer) = &current.layer {
            depth += 1;
            current = &layer.parent;
        }
        depth
    }

    pub fn resolve_accessor(&self, name: &str) -> Option<Accessor> {
        self.resolve(|wrapper| wrapper.accessor(name))
    }

    pub fn resolve_handler(&self, name: &str) -> Option<EventHandler> {
        self.resolve(|wrapper| wrapper.handler(name))
    }

    fn resolve<T>(&self, lookup: impl Fn(&Wrapper) -> Option<T>) -> Option<T> {
        let mut current = self;
        while let Some(layer) = &current.layer {
            if let Some(found) = lookup(&layer.wrapper) {
                return Some(found);
            }
            current = &layer.parent;
        }
        None
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut chain = Vec::new();
        let mut current = self;
        while let Some(layer) = &current.layer {
            chain.push(layer.wrapper.kind());
            current = &layer.parent;
        }
        f.debug_tuple("Scope").field(&chain).finish()
    }
}
