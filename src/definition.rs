//! Service definitions.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::container::Container;
use crate::error::DiResult;
use crate::value::{Instance, Value};

/// Callable backing a closure definition; invoked with the container on every build.
pub type ServiceClosure = Arc<dyn Fn(&Container) -> DiResult<Instance> + Send + Sync>;

/// A method to invoke on a service right after it is constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// Method name as registered in the [`ClassRegistry`](crate::ClassRegistry)
    pub method: String,
    /// Unresolved arguments (may contain placeholders and `@` references)
    pub arguments: Vec<Value>,
}

impl MethodCall {
    /// Creates a method call.
    pub fn new(method: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// Object held by an object definition.
#[derive(Clone)]
pub struct ObjectRef(ObjectInner);

#[derive(Clone)]
enum ObjectInner {
    Owned(Instance),
    // the container binds itself without keeping itself alive
    Container(Weak<Container>),
}

impl ObjectRef {
    pub(crate) fn owned(instance: Instance) -> Self {
        ObjectRef(ObjectInner::Owned(instance))
    }

    pub(crate) fn container(container: Weak<Container>) -> Self {
        ObjectRef(ObjectInner::Container(container))
    }

    pub(crate) fn is_container(&self) -> bool {
        matches!(self.0, ObjectInner::Container(_))
    }

    /// The held object; `None` only if it is the container and it has been dropped.
    pub fn instance(&self) -> Option<Instance> {
        match &self.0 {
            ObjectInner::Owned(instance) => Some(instance.clone()),
            ObjectInner::Container(container) => container.upgrade().map(|c| c as Instance),
        }
    }
}

/// Construction strategy of a definition.
#[derive(Clone)]
pub enum Kind {
    /// Built from a class identifier by the type locator
    Plain,
    /// Always the same object
    Object(ObjectRef),
    /// Built by a closure receiving the container
    Closure(ServiceClosure),
    /// Built by calling a method on another service
    Factory {
        /// Name of the factory service (may be a placeholder)
        service: String,
        /// Method producing the service
        method: String,
        /// Unresolved arguments for the factory method
        arguments: Vec<Value>,
    },
}

impl Kind {
    /// Short label used in diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Kind::Plain => "plain",
            Kind::Object(_) => "object",
            Kind::Closure(_) => "closure",
            Kind::Factory { .. } => "factory",
        }
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Factory { service, method, arguments } => f
                .debug_struct("Factory")
                .field("service", service)
                .field("method", method)
                .field("arguments", arguments)
                .finish(),
            other => f.write_str(other.label()),
        }
    }
}

/// Declarative record of how to build one service.
///
/// Definitions are shared: every alias of a service points at the same
/// `Arc<Definition>`, so calls appended through `notify` and the cached
/// singleton instance are visible under all names.
pub struct Definition {
    pub(crate) name: String,
    pub(crate) kind: Kind,
    pub(crate) class: Option<String>,
    pub(crate) extends: Option<String>,
    pub(crate) arguments: Vec<Value>,
    pub(crate) singleton: bool,
    pub(crate) is_abstract: bool,
    pub(crate) read_only: bool,
    pub(crate) private: bool,
    method_calls: Mutex<Vec<MethodCall>>,
    instance: Mutex<Option<Instance>>,
}

impl Definition {
    pub(crate) fn new(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            name: name.into(),
            kind,
            class: None,
            extends: None,
            arguments: Vec::new(),
            singleton: true,
            is_abstract: false,
            read_only: false,
            private: false,
            method_calls: Mutex::new(Vec::new()),
            instance: Mutex::new(None),
        }
    }

    /// Name the definition was registered under (aliases share it).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Construction strategy.
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// Class identifier, possibly a placeholder.
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// Name of the parent definition, possibly a placeholder.
    pub fn extends(&self) -> Option<&str> {
        self.extends.as_deref()
    }

    /// Unresolved constructor arguments.
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Snapshot of the method-call queue.
    pub fn method_calls(&self) -> Vec<MethodCall> {
        self.method_calls.lock().clone()
    }

    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    /// Cached singleton instance, if already resolved.
    pub fn instance(&self) -> Option<Instance> {
        self.instance.lock().clone()
    }

    /// True once a singleton has been built.
    pub fn is_instantiated(&self) -> bool {
        self.instance.lock().is_some()
    }

    pub(crate) fn add_method_call(&self, call: MethodCall) {
        self.method_calls.lock().push(call);
    }

    /// Caches `instance`; non-singletons keep nothing.
    pub(crate) fn set_instance(&self, instance: Instance) {
        // a cached strong handle to the container would keep it alive forever
        let holds_container = matches!(&self.kind, Kind::Object(object) if object.is_container());
        if self.singleton && !holds_container {
            *self.instance.lock() = Some(instance);
        }
    }

    pub(crate) fn clear_instance(&self) {
        self.instance.lock().take();
    }

    /// Effective definition after folding `parent` in.
    ///
    /// Class and arguments come from `self` when set, otherwise from the
    /// parent; the parent's calls run first. The result never carries a
    /// cached instance.
    pub(crate) fn merged_with(&self, parent: &Definition) -> Definition {
        let mut calls = parent.method_calls();
        calls.extend(self.method_calls());

        Definition {
            name: self.name.clone(),
            kind: self.kind.clone(),
            class: self.class.clone().or_else(|| parent.class.clone()),
            extends: self.extends.clone(),
            arguments: if self.arguments.is_empty() {
                parent.arguments.clone()
            } else {
                self.arguments.clone()
            },
            singleton: self.singleton,
            is_abstract: self.is_abstract,
            read_only: self.read_only,
            private: self.private,
            method_calls: Mutex::new(calls),
            instance: Mutex::new(None),
        }
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("class", &self.class)
            .field("extends", &self.extends)
            .field("arguments", &self.arguments)
            .field("method_calls", &*self.method_calls.lock())
            .field("singleton", &self.singleton)
            .field("abstract", &self.is_abstract)
            .field("read_only", &self.read_only)
            .field("private", &self.private)
            .field("instantiated", &self.is_instantiated())
            .finish()
    }
}
