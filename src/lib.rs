//! # Bindery
//!
//! Reactive component binding over HTML-like markup.
//!
//! ## Pipeline
//!
//! 1. **Register**: component types implement [`Component`] and describe their
//!    fields, declared properties and `Handle*` methods. Each kind is stored in
//!    the [`Registry`] as a prototype [`Wrapper`] plus a template id.
//! 2. **Parse**: markup text becomes a [`MarkupTree`] (html5ever based).
//! 3. **Walk**: the [`Walker`] instantiates a fresh wrapper per component
//!    usage, chains [`Scope`]s, expands component templates and binds
//!    attributes into a render tree of [`Node`]s.
//! 4. **Propagate**: `notify()` re-evaluates linked attributes top-down and
//!    pushes parent values into child properties.
//!
//! ## Binding syntax
//!
//! - `:key="Name"` reads `Name` from the nearest component in scope. If `key`
//!   is a declared property of the element's own component the binding is
//!   linked and writes through on refresh.
//! - `@event="HandleName"` binds a `Handle*` method from the scope chain.
//! - Anything else is a literal attribute.

mod app;
mod component;
mod config;
mod error;
mod parse;
mod registry;
mod scope;
mod templates;
mod tree;
mod value;
mod walker;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod walker_tests;

pub use app::{App, Mount, MountSnapshot};
pub use component::{
    Accessor, Component, Descriptor, Event, EventHandler, Mutator, Wrapper, HANDLER_PREFIX,
};
pub use config::Config;
pub use error::*;
pub use parse::{parse_markup, MarkupAttribute, MarkupNode, MarkupTree, ParseOutput};
pub use registry::Registry;
pub use scope::Scope;
pub use templates::TemplateStore;
pub use tree::{
    Attribute, AttributeSnapshot, BindingKind, ComponentNode, Descendants, Handler, Node,
    NodeSnapshot, PlainNode,
};
pub use value::{FieldValue, Value, ValueKind};
pub use walker::{WalkOutput, Walker};
