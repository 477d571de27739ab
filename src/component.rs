//! Component wrapper.
//!
//! A component author implements [`Component`] and lists the component's
//! fields and methods in [`Component::describe`]. [`Wrapper::wrap`] turns that
//! description into a prototype; [`Wrapper::instantiate`] produces live,
//! independent instances with name-keyed accessors, mutators and handlers.

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, trace};

use crate::error::{BindError, BindResult};
use crate::value::{FieldValue, Value, ValueKind};

/// Methods whose name starts with this prefix are exposed as event handlers.
pub const HANDLER_PREFIX: &str = "Handle";

lazy_static! {
    static ref IDENT_RE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Whether `name` can name a field, method or scope binding.
pub(crate) fn is_identifier(name: &str) -> bool {
    IDENT_RE.is_match(name)
}

pub type Accessor = Rc<dyn Fn() -> Value>;
pub type Mutator = Rc<dyn Fn(Value) -> BindResult<()>>;
pub type EventHandler = Rc<dyn Fn(&Event)>;

/// An event delivered to a handler.
#[derive(Debug, Clone, Default)]
pub struct Event {
    pub kind: String,
    pub target: Option<String>,
    pub detail: Option<Value>,
}

impl Event {
    pub fn new(kind: &str) -> Self {
        Event {
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// A user-defined component.
///
/// `init` runs exactly once per instance, on a freshly defaulted value, before
/// any accessor can observe it.
pub trait Component: Default + 'static {
    fn init(&mut self) -> Result<(), String>;

    fn describe(descriptor: &mut Descriptor<Self>);
}

// ═══════════════════════════════════════════════════════════════════════════════
// DESCRIPTORS
// ═══════════════════════════════════════════════════════════════════════════════

type FieldGetter<C> = Rc<dyn Fn(&C) -> Value>;
type FieldSetter<C> = Rc<dyn Fn(&mut C, Value) -> bool>;

struct FieldDescriptor<C> {
    pub name: String,
    pub kind: ValueKind,
    pub prop: bool,
    get: FieldGetter<C>,
    set: FieldSetter<C>,
}

struct MethodDescriptor<C> {
    pub name: String,
    call: fn(&mut C, &Event),
}

/// Field and method inventory of one component kind.
pub struct Descriptor<C> {
    fields: Vec<FieldDescriptor<C>>,
    methods: Vec<MethodDescriptor<C>>,
}

impl<C: 'static> Descriptor<C> {
    fn new() -> Self {
        Descriptor {
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Internal state field.
    pub fn field<T: FieldValue>(
        &mut self,
        name: &str,
        get: fn(&C) -> &T,
        get_mut: fn(&mut C) -> &mut T,
    ) -> &mut Self {
        self.push_field(name, false, get, get_mut)
    }

    /// Field that usage sites may set through a linked attribute.
    pub fn prop<T: FieldValue>(
        &mut self,
        name: &str,
        get: fn(&C) -> &T,
        get_mut: fn(&mut C) -> &mut T,
    ) -> &mut Self {
        self.push_field(name, true, get, get_mut)
    }

    pub fn method(&mut self, name: &str, call: fn(&mut C, &Event)) -> &mut Self {
        self.methods.push(MethodDescriptor {
            name: name.to_string(),
            call,
        });
        self
    }

    fn push_field<T: FieldValue>(
        &mut self,
        name: &str,
        prop: bool,
        get: fn(&C) -> &T,
        get_mut: fn(&mut C) -> &mut T,
    ) -> &mut Self {
        self.fields.push(FieldDescriptor {
            name: name.to_string(),
            kind: T::KIND,
            prop,
            get: Rc::new(move |c: &C| get(c).to_value()),
            set: Rc::new(move |c: &mut C, value: Value| match T::from_value(value) {
                Some(v) => {
                    *get_mut(c) = v;
                    true
                }
                None => false,
            }),
        });
        self
    }

    fn validate(&self, kind: &str) -> BindResult<()> {
        let invalid = |reason: String| BindError::InvalidInput {
            kind: kind.to_string(),
            reason,
        };

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !is_identifier(&field.name) {
                return Err(invalid(format!("'{}' is not a valid field name", field.name)));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(invalid(format!("field '{}' is declared twice", field.name)));
            }
        }

        let mut seen = HashSet::new();
        for method in &self.methods {
            if !is_identifier(&method.name) {
                return Err(invalid(format!("'{}' is not a valid method name", method.name)));
            }
            if !seen.insert(method.name.as_str()) {
                return Err(invalid(format!("method '{}' is declared twice", method.name)));
            }
        }

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROTOTYPES
// ═══════════════════════════════════════════════════════════════════════════════

static INSTANCE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn generate_instance_id() -> String {
    let id = INSTANCE_ID_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("inst_{}", id)
}

/// Everything a live instance exposes by name.
#[derive(Default)]
struct Bindings {
    instance: Option<Rc<dyn Any>>,
    accessors: HashMap<String, Accessor>,
    mutators: HashMap<String, Mutator>,
    declared_properties: HashMap<String, String>,
    event_handlers: HashMap<String, EventHandler>,
}

trait Blueprint {
    fn kind(&self) -> &'static str;
    fn build(&self) -> BindResult<Bindings>;
}

struct Prototype<C> {
    descriptor: Descriptor<C>,
}

impl<C: Component> Blueprint for Prototype<C> {
    fn kind(&self) -> &'static str {
        type_name::<C>()
    }

    fn build(&self) -> BindResult<Bindings> {
        let mut value = C::default();
        value
            .init()
            .map_err(|reason| BindError::InitializationFailed {
                kind: self.kind().to_string(),
                reason,
            })?;

        let cell = Rc::new(RefCell::new(value));
        let mut bindings = Bindings::default();

        for field in &self.descriptor.fields {
            let get = field.get.clone();
            let target = cell.clone();
            let accessor: Accessor = Rc::new(move || get(&*target.borrow()));
            bindings.accessors.insert(field.name.clone(), accessor);

            let set = field.set.clone();
            let target = cell.clone();
            let name = field.name.clone();
            let expected = field.kind;
            let mutator: Mutator = Rc::new(move |value: Value| {
                let found = value.kind();
                if set(&mut *target.borrow_mut(), value) {
                    Ok(())
                } else {
                    Err(BindError::TypeMismatch {
                        field: name.clone(),
                        expected,
                        found,
                    })
                }
            });
            bindings.mutators.insert(field.name.clone(), mutator);

            if field.prop {
                bindings
                    .declared_properties
                    .insert(field.name.to_lowercase(), field.name.clone());
            }
        }

        for method in &self.descriptor.methods {
            if !method.name.starts_with(HANDLER_PREFIX) {
                trace!(kind = self.kind(), method = %method.name, "Skipping non-handler method");
                continue;
            }
            let call = method.call;
            let target = cell.clone();
            let handler: EventHandler = Rc::new(move |event: &Event| {
                call(&mut *target.borrow_mut(), event);
            });
            bindings.event_handlers.insert(method.name.clone(), handler);
        }

        bindings.instance = Some(cell as Rc<dyn Any>);
        Ok(bindings)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WRAPPER
// ═══════════════════════════════════════════════════════════════════════════════

/// Uniform get/set/handle surface over one component kind.
///
/// A wrapper returned by [`Wrapper::wrap`] is a prototype: it knows the kind
/// but owns no instance, so every lookup on it fails. Call
/// [`Wrapper::instantiate`] to obtain a live one.
pub struct Wrapper {
    blueprint: Rc<dyn Blueprint>,
    bindings: Rc<Bindings>,
    instance_id: Option<String>,
}

impl Wrapper {
    pub fn wrap<C: Component>() -> BindResult<Self> {
        let mut descriptor = Descriptor::new();
        C::describe(&mut descriptor);
        descriptor.validate(type_name::<C>())?;

        debug!(
            kind = type_name::<C>(),
            fields = descriptor.fields.len(),
            methods = descriptor.methods.len(),
            "Wrapped component"
        );

        Ok(Wrapper {
            blueprint: Rc::new(Prototype { descriptor }),
            bindings: Rc::new(Bindings::default()),
            instance_id: None,
        })
    }

    /// Allocate a fresh instance of the same kind and run its initializer.
    pub fn instantiate(&self) -> BindResult<Self> {
        let bindings = self.blueprint.build()?;
        let instance_id = generate_instance_id();
        trace!(kind = self.kind(), instance_id = %instance_id, "Instantiated component");
        Ok(Wrapper {
            blueprint: self.blueprint.clone(),
            bindings: Rc::new(bindings),
            instance_id: Some(instance_id),
        })
    }

    pub fn kind(&self) -> &'static str {
        self.blueprint.kind()
    }

    pub fn is_prototype(&self) -> bool {
        self.instance_id.is_none()
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    pub fn accessor(&self, name: &str) -> Option<Accessor> {
        self.bindings.accessors.get(name).cloned()
    }

    pub fn mutator(&self, name: &str) -> Option<Mutator> {
        self.bindings.mutators.get(name).cloned()
    }

    /// Case-insensitive lookup; returns the canonical field name.
    pub fn is_declared_property(&self, name: &str) -> Option<&str> {
        self.bindings
            .declared_properties
            .get(&name.to_lowercase())
            .map(|s| s.as_str())
    }

    pub fn handler(&self, name: &str) -> Option<EventHandler> {
        self.bindings.event_handlers.get(name).cloned()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.accessor(name).map(|accessor| accessor())
    }

    pub fn set(&self, name: &str, value: impl Into<Value>) -> BindResult<()> {
        let mutator = self.mutator(name).ok_or_else(|| BindError::UnknownField {
            kind: self.kind().to_string(),
            field: name.to_string(),
        })?;
        mutator(value.into())
    }

    pub fn accessor_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.accessors.keys().map(|s| s.as_str())
    }

    pub fn mutator_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.mutators.keys().map(|s| s.as_str())
    }

    pub fn handler_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.event_handlers.keys().map(|s| s.as_str())
    }

    /// Typed read access to the live instance.
    pub fn inspect<C: Component, R>(&self, f: impl FnOnce(&C) -> R) -> Option<R> {
        let cell = self.typed_instance::<C>()?;
        let guard = cell.borrow();
        Some(f(&*guard))
    }

    /// Typed write access to the live instance.
    pub fn update<C: Component, R>(&self, f: impl FnOnce(&mut C) -> R) -> Option<R> {
        let cell = self.typed_instance::<C>()?;
        let mut guard = cell.borrow_mut();
        Some(f(&mut *guard))
    }

    fn typed_instance<C: Component>(&self) -> Option<Rc<RefCell<C>>> {
        let instance = self.bindings.instance.clone()?;
        instance.downcast::<RefCell<C>>().ok()
    }
}

impl std::fmt::Debug for Wrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wrapper")
            .field("kind", &self.kind())
            .field("instance_id", &self.instance_id)
            .finish()
    }
}
