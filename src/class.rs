//! Type locator: how class identifiers become instances and how methods are invoked.
//!
//! Definitions name their implementation by a class identifier string (which
//! may itself be a `%parameter%`). The host application registers, at startup,
//! a constructor for every identifier it wants the container to build and the
//! methods that `call`/`notify` entries and factories may invoke.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{BoxError, DiError};
use crate::value::{Arguments, Instance};

pub(crate) type Constructor = Arc<dyn Fn(&Arguments) -> Result<Instance, BoxError> + Send + Sync>;
type Method = Arc<dyn Fn(&Instance, &Arguments) -> Result<Option<Instance>, BoxError> + Send + Sync>;

struct ClassEntry {
    type_name: &'static str,
    constructor: Option<Constructor>,
}

/// Outcome of looking a class identifier up.
pub(crate) enum ClassLookup {
    Found(Constructor),
    NotInstantiable,
    Missing,
}

/// Registry of constructible classes and invocable methods.
///
/// Classes are keyed by identifier, methods by the concrete type of the
/// instance they are called on, so an object handed to
/// [`Container::set`](crate::Container::set) gets its methods as long as its
/// type was registered here (named or not).
///
/// # Examples
///
/// ```rust
/// use splot_di::{ClassRegistry, Container, ServiceOptions};
/// use parking_lot::Mutex;
///
/// #[derive(Default)]
/// struct Mailer {
///     transport: Mutex<String>,
/// }
///
/// let mut classes = ClassRegistry::new();
/// classes
///     .class::<Mailer>("Mailer")
///     .default_constructor()
///     .method("setTransport", |mailer, args| {
///         *mailer.transport.lock() = args.string(0)?;
///         Ok(())
///     });
///
/// let container = Container::with_classes(classes);
/// container
///     .register("mailer", ServiceOptions::class("Mailer").call("setTransport", ["smtp"]))
///     .unwrap();
///
/// let mailer = container.get_as::<Mailer>("mailer").unwrap();
/// assert_eq!(*mailer.transport.lock(), "smtp");
/// ```
#[derive(Default)]
pub struct ClassRegistry {
    classes: HashMap<String, ClassEntry>,
    methods: HashMap<TypeId, HashMap<String, Method>>,
    type_names: HashMap<TypeId, &'static str>,
}

impl ClassRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under the class identifier `name`.
    ///
    /// Without a constructor the class is known but not instantiable.
    pub fn class<T: Any + Send + Sync>(&mut self, name: impl Into<String>) -> ClassBuilder<'_, T> {
        let name = name.into();
        let type_name = std::any::type_name::<T>();
        self.type_names.insert(TypeId::of::<T>(), type_name);
        self.classes.insert(
            name.clone(),
            ClassEntry {
                type_name,
                constructor: None,
            },
        );
        ClassBuilder {
            registry: self,
            name: Some(name),
            _marker: PhantomData,
        }
    }

    /// Registers methods for a type that is never built from a class identifier.
    pub fn methods_of<T: Any + Send + Sync>(&mut self) -> ClassBuilder<'_, T> {
        self.type_names
            .insert(TypeId::of::<T>(), std::any::type_name::<T>());
        ClassBuilder {
            registry: self,
            name: None,
            _marker: PhantomData,
        }
    }

    /// Checks whether a class identifier is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Checks whether `method` can be invoked on instances of `T`.
    pub fn has_method<T: Any>(&self, method: &str) -> bool {
        self.methods
            .get(&TypeId::of::<T>())
            .is_some_and(|methods| methods.contains_key(method))
    }

    /// Number of registered class identifiers.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// True when no class identifier is registered.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub(crate) fn lookup(&self, name: &str) -> ClassLookup {
        match self.classes.get(name) {
            Some(ClassEntry { constructor: Some(constructor), .. }) => ClassLookup::Found(constructor.clone()),
            Some(_) => ClassLookup::NotInstantiable,
            None => ClassLookup::Missing,
        }
    }

    #[cfg_attr(not(feature = "diagnostics"), allow(dead_code))]
    pub(crate) fn type_name_of(&self, name: &str) -> Option<&'static str> {
        self.classes.get(name).map(|entry| entry.type_name)
    }

    /// Invokes `method` on `instance`, dispatching on the instance's concrete type.
    pub(crate) fn invoke(
        &self,
        instance: &Instance,
        method: &str,
        arguments: &Arguments,
    ) -> Result<Option<Instance>, BoxError> {
        let type_id = (**instance).type_id();
        let handler = self
            .methods
            .get(&type_id)
            .and_then(|methods| methods.get(method))
            .ok_or_else(|| {
                let type_name = self
                    .type_names
                    .get(&type_id)
                    .copied()
                    .unwrap_or("unregistered type");
                DiError::invalid_service(
                    type_name,
                    format!("method \"{}\" is not registered for this type", method),
                )
            })?;
        handler(instance, arguments)
    }

    fn insert_method(&mut self, type_id: TypeId, name: String, method: Method) {
        self.methods.entry(type_id).or_default().insert(name, method);
    }
}

impl std::fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut classes: Vec<_> = self.classes.keys().collect();
        classes.sort();
        f.debug_struct("ClassRegistry")
            .field("classes", &classes)
            .field("method_types", &self.methods.len())
            .finish()
    }
}

/// Builder returned by [`ClassRegistry::class`] and [`ClassRegistry::methods_of`].
///
/// Every call writes straight into the registry, so the builder can be dropped
/// at any point.
pub struct ClassBuilder<'a, T> {
    registry: &'a mut ClassRegistry,
    name: Option<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Any + Send + Sync> ClassBuilder<'a, T> {
    /// Sets the constructor receiving the resolved constructor arguments.
    ///
    /// Has no effect on a builder created by [`ClassRegistry::methods_of`].
    pub fn constructor<F>(self, constructor: F) -> Self
    where
        F: Fn(&Arguments) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        if let Some(entry) = self
            .name
            .as_ref()
            .and_then(|name| self.registry.classes.get_mut(name))
        {
            entry.constructor = Some(Arc::new(move |arguments: &Arguments| {
                constructor(arguments).map(|value| Arc::new(value) as Instance)
            }));
        }
        self
    }

    /// Uses `T::default()`, ignoring any arguments.
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.constructor(|_| Ok(T::default()))
    }

    /// Registers a method usable from `call` and `notify` entries.
    pub fn method<F>(self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&T, &Arguments) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.insert(name.into(), move |this: &T, arguments: &Arguments| {
            method(this, arguments).map(|()| None)
        })
    }

    /// Registers a method that produces a new service, for factory definitions.
    pub fn factory_method<P, F>(self, name: impl Into<String>, method: F) -> Self
    where
        P: Any + Send + Sync,
        F: Fn(&T, &Arguments) -> Result<P, BoxError> + Send + Sync + 'static,
    {
        self.insert(name.into(), move |this: &T, arguments: &Arguments| {
            method(this, arguments).map(|product| Some(Arc::new(product) as Instance))
        })
    }

    fn insert<F>(self, name: String, method: F) -> Self
    where
        F: Fn(&T, &Arguments) -> Result<Option<Instance>, BoxError> + Send + Sync + 'static,
    {
        let type_name = std::any::type_name::<T>();
        let erased: Method = Arc::new(move |instance: &Instance, arguments: &Arguments| {
            let this = instance.downcast_ref::<T>().ok_or_else(|| {
                DiError::invalid_service(type_name, "instance does not match the registered type")
            })?;
            method(this, arguments)
        });
        self.registry.insert_method(TypeId::of::<T>(), name, erased);
        self
    }
}
