//! The service container.
//!
//! [`Container`] owns every piece of shared state: the parameter table, the
//! definition registry with its pending-notify queue, the loading set used for
//! cycle detection, and the resolver with its plan cache. Nothing is global;
//! two containers never see each other's services.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::class::ClassRegistry;
use crate::config::{self, Sections};
use crate::definition::{Definition, Kind, MethodCall, ObjectRef};
use crate::error::{DiError, DiResult};
use crate::internal::{LoadingGuard, LoadingSet};
use crate::options::ServiceOptions;
use crate::parameters::{Parameters, ParametersResolver};
use crate::registration::Registry;
use crate::resolver::link::bind_self;
use crate::resolver::ServicesResolver;
use crate::value::{key_to_string, Instance, Mapping, Value};

/// Names under which every container binds itself.
pub const CONTAINER_NAMES: [&str; 4] = ["container", "service_container", "services_container", "di_container"];

/// Service container resolving named services on demand.
///
/// Services are declared with [`register`](Container::register) (built from a
/// class identifier or a factory), [`set`](Container::set) (a ready object) or
/// [`set_closure`](Container::set_closure), and are built lazily the first
/// time they are requested with [`get`](Container::get). Arguments may refer
/// to parameters with `%name%` and to other services with `@name` or
/// `@name?`.
///
/// # Lifetimes
///
/// Definitions are singletons unless registered with `singleton(false)`: the
/// first successful resolution is cached on the definition and returned to
/// every later caller, including callers using an alias.
///
/// # Thread Safety
///
/// The container is `Send + Sync` and handed out as an `Arc`. Internal state
/// sits behind `parking_lot` locks that are never held across a constructor,
/// a method call or a nested resolution. Resolution itself is a single
/// depth-first walk: overlapping `get` calls from several threads share one
/// loading set and must be serialized by the caller.
///
/// # Examples
///
/// ```
/// use splot_di::{Arguments, ClassRegistry, Container, ServiceOptions};
///
/// struct Transport(String);
/// struct Mailer { transport: std::sync::Arc<Transport> }
///
/// let mut classes = ClassRegistry::new();
/// classes
///     .class::<Transport>("Transport")
///     .constructor(|args: &Arguments| Ok(Transport(args.string(0)?)));
/// classes
///     .class::<Mailer>("Mailer")
///     .constructor(|args: &Arguments| Ok(Mailer { transport: args.service(0)? }));
///
/// let container = Container::with_classes(classes);
/// container.set_parameter("mailer.transport", "smtp");
/// container
///     .register("transport", ServiceOptions::class("Transport").argument("%mailer.transport%"))
///     .unwrap();
/// container
///     .register("mailer", ServiceOptions::class("Mailer").argument("@transport"))
///     .unwrap();
///
/// let mailer = container.get_as::<Mailer>("mailer").unwrap();
/// assert_eq!(mailer.transport.0, "smtp");
/// assert!(std::sync::Arc::ptr_eq(&mailer, &container.get_as::<Mailer>("mailer").unwrap()));
/// ```
pub struct Container {
    me: Weak<Container>,
    pub(crate) parameters: RwLock<Parameters>,
    registry: Mutex<Registry>,
    loading: Mutex<LoadingSet>,
    loaded_files: Mutex<HashSet<PathBuf>>,
    resolver: ServicesResolver,
}

impl Container {
    /// Creates a container without any classes.
    ///
    /// Objects, closures and factories over them still work; plain class
    /// definitions need [`Container::with_classes`].
    pub fn new() -> Arc<Self> {
        Self::with_classes(ClassRegistry::new())
    }

    /// Creates a container that instantiates plain definitions from `classes`.
    pub fn with_classes(classes: ClassRegistry) -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<Container>| {
            let mut definition = Definition::new(CONTAINER_NAMES[0], Kind::Object(ObjectRef::container(me.clone())));
            definition.read_only = true;
            let definition = Arc::new(definition);

            let mut registry = Registry::default();
            for name in CONTAINER_NAMES {
                registry.insert(name, definition.clone());
            }

            Container {
                me: me.clone(),
                parameters: RwLock::new(Parameters::default()),
                registry: Mutex::new(registry),
                loading: Mutex::new(LoadingSet::default()),
                loaded_files: Mutex::new(HashSet::new()),
                resolver: ServicesResolver::new(classes),
            }
        })
    }

    /// A strong handle to this container, e.g. from inside a closure definition.
    ///
    /// `None` only while the container is being dropped.
    pub fn handle(&self) -> Option<Arc<Container>> {
        self.me.upgrade()
    }

    /// The class registry used for plain definitions.
    pub fn classes(&self) -> &ClassRegistry {
        self.resolver.classes()
    }

    // ----- Registration -----

    /// Registers a service built from a class identifier or a factory.
    ///
    /// A `&str` is shorthand for `ServiceOptions::class(..)`. Fails with
    /// [`DiError::ReadOnly`] when `name` holds a read-only definition and with
    /// [`DiError::InvalidService`] for malformed options. A `notify` call run
    /// against an already-built service may also fail; the definition stays
    /// registered in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use splot_di::{Container, DiError, ServiceOptions};
    ///
    /// let container = Container::new();
    /// container.register("locked", ServiceOptions::class("App\\Locked").read_only(true)).unwrap();
    ///
    /// let err = container.register("locked", "App\\Other").unwrap_err();
    /// assert!(matches!(err, DiError::ReadOnly(_)));
    /// assert_eq!(container.get_definition("locked").unwrap().class(), Some("App\\Locked"));
    /// ```
    pub fn register(&self, name: &str, options: impl Into<ServiceOptions>) -> DiResult<Arc<Definition>> {
        let options = options.into();
        let kind = match &options.factory_service {
            Some(service) => Kind::Factory {
                service: service.clone(),
                method: options.factory_method.clone().unwrap_or_default(),
                arguments: options.factory_arguments.clone(),
            },
            None => Kind::Plain,
        };
        self.add_service(name, kind, options)
    }

    /// Registers a service from a configuration value (class name string,
    /// compact factory list or option mapping).
    pub fn register_value(&self, name: &str, options: &Value) -> DiResult<Arc<Definition>> {
        self.register(name, ServiceOptions::from_value(name, options)?)
    }

    /// Binds `value` as an object service; every `get` returns the same instance.
    ///
    /// `value` is wrapped in an `Arc`; pass an existing [`Instance`] through
    /// [`Container::set_instance`] instead.
    pub fn set<T: Any + Send + Sync>(&self, name: &str, value: T, options: ServiceOptions) -> DiResult<Arc<Definition>> {
        self.set_instance(name, Arc::new(value), options)
    }

    /// Binds an already type-erased instance as an object service.
    pub fn set_instance(&self, name: &str, instance: Instance, options: ServiceOptions) -> DiResult<Arc<Definition>> {
        self.add_service(name, Kind::Object(ObjectRef::owned(instance)), options)
    }

    /// Binds a closure receiving the container.
    ///
    /// The closure runs on every resolution unless the service is a singleton.
    pub fn set_closure<F>(&self, name: &str, closure: F, options: ServiceOptions) -> DiResult<Arc<Definition>>
    where
        F: Fn(&Container) -> DiResult<Instance> + Send + Sync + 'static,
    {
        self.add_service(name, Kind::Closure(Arc::new(closure)), options)
    }

    fn add_service(&self, name: &str, kind: Kind, options: ServiceOptions) -> DiResult<Arc<Definition>> {
        options.validate(name)?;
        if let Some(target) = &options.alias {
            return self.add_alias(name, target);
        }

        let ServiceOptions {
            class,
            extends,
            arguments,
            call,
            notify,
            is_abstract,
            singleton,
            aliases,
            private,
            read_only,
            ..
        } = options;

        let mut definition = Definition::new(name, kind);
        definition.class = class;
        definition.extends = extends;
        definition.arguments = arguments;
        definition.singleton = singleton;
        definition.is_abstract = is_abstract;
        definition.private = private;
        definition.read_only = read_only;
        for call in call {
            definition.add_method_call(call);
        }
        let definition = Arc::new(definition);

        // calls against services that are already built run once the lock is released
        let mut live_calls = Vec::new();
        {
            let mut registry = self.registry.lock();
            check_writable(&registry, name)?;

            let previous = registry.get(name).cloned();
            for alias in aliases.iter().filter(|alias| alias.as_str() != name) {
                if let Some(existing) = registry.get(alias) {
                    let replaced = previous.as_ref().is_some_and(|previous| Arc::ptr_eq(previous, existing));
                    if !replaced {
                        return Err(DiError::invalid_service(
                            name,
                            format!("alias \"{}\" is already bound to another service", alias),
                        ));
                    }
                }
            }

            registry.insert(name, definition.clone());
            for alias in &aliases {
                registry.insert(alias, definition.clone());
            }

            for bound in std::iter::once(name).chain(aliases.iter().map(String::as_str)) {
                for call in registry.take_pending(bound) {
                    debug!(service = name, bound, method = %call.method, "draining pending notify call");
                    definition.add_method_call(call);
                }
            }

            for notify in notify {
                let call = MethodCall::new(notify.method, bind_self(name, notify.arguments));
                match registry.get(&notify.service).cloned() {
                    Some(target) => {
                        if let Some(instance) = target.instance() {
                            live_calls.push((target.clone(), instance, call.clone()));
                        }
                        target.add_method_call(call);
                    }
                    None => {
                        debug!(service = name, target = %notify.service, "queueing notify call");
                        registry.enqueue(&notify.service, call);
                    }
                }
            }
        }

        self.resolver.clear_plans();
        debug!(service = name, kind = definition.kind().label(), aliases = ?aliases, "registered service");

        for (target, instance, call) in live_calls {
            self.call_live(&target, &instance, &call)?;
        }
        Ok(definition)
    }

    fn add_alias(&self, name: &str, target: &str) -> DiResult<Arc<Definition>> {
        let (definition, drained) = {
            let mut registry = self.registry.lock();
            check_writable(&registry, name)?;

            let definition = registry.get(target).cloned().ok_or_else(|| {
                DiError::wrap(
                    name,
                    format!("alias target \"{}\" is not defined", target),
                    DiError::ServiceNotFound(target.to_string()),
                )
            })?;
            if let Some(existing) = registry.get(name) {
                if !Arc::ptr_eq(existing, &definition) {
                    return Err(DiError::invalid_service(
                        name,
                        format!("cannot alias \"{}\": the name is bound to another service", target),
                    ));
                }
            }

            registry.insert(name, definition.clone());
            let drained = registry.take_pending(name);
            for call in &drained {
                definition.add_method_call(call.clone());
            }
            (definition, drained)
        };

        self.resolver.clear_plans();
        debug!(alias = name, target, drained = drained.len(), "registered alias");

        if let Some(instance) = definition.instance() {
            for call in &drained {
                self.call_live(&definition, &instance, call)?;
            }
        }
        Ok(definition)
    }

    /// Runs `call` on an already-built service as if it were still being resolved,
    /// so private services referenced by the call can be injected.
    fn call_live(&self, target: &Definition, instance: &Instance, call: &MethodCall) -> DiResult<()> {
        if let Err(chain) = self.loading.lock().enter(target.name()) {
            warn!(service = target.name(), chain = ?chain, "circular reference detected");
            return Err(DiError::CircularReference {
                chain,
                service: target.name().to_string(),
            });
        }
        let _guard = LoadingGuard::new(&self.loading, target.name());
        self.resolver.call_method(self, target.name(), instance, call)
    }

    // ----- Resolution -----

    /// Resolves the service registered under `name`.
    ///
    /// Fails with [`DiError::ServiceNotFound`] for unknown names,
    /// [`DiError::PrivateService`] when a private service is requested from
    /// outside a resolution, and [`DiError::CircularReference`] when `name`
    /// is already being resolved further up the stack.
    pub fn get(&self, name: &str) -> DiResult<Instance> {
        let definition = self
            .definition(name)
            .ok_or_else(|| DiError::ServiceNotFound(name.to_string()))?;

        {
            let mut loading = self.loading.lock();
            // a name in the loading set means the set is non-empty, so checking
            // private before the cycle check cannot change the outcome
            if definition.is_private() && loading.is_empty() {
                return Err(DiError::PrivateService(name.to_string()));
            }

            // finished singletons are never re-entered
            if definition.is_singleton() {
                if let Some(instance) = definition.instance() {
                    return Ok(instance);
                }
            }

            if let Err(chain) = loading.enter(name) {
                warn!(service = name, chain = ?chain, "circular reference detected");
                return Err(DiError::CircularReference {
                    chain,
                    service: name.to_string(),
                });
            }
        }

        let _guard = LoadingGuard::new(&self.loading, name);
        self.resolver.resolve(self, &definition)
    }

    /// Resolves `name` and downcasts it to `T`.
    pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> DiResult<Arc<T>> {
        self.get(name)?.downcast::<T>().map_err(|_| {
            DiError::invalid_service(name, format!("service is not a {}", std::any::type_name::<T>()))
        })
    }

    /// Returns true if `name` is bound (aliases included).
    pub fn has(&self, name: &str) -> bool {
        self.registry.lock().contains(name)
    }

    /// The definition bound to `name`.
    pub fn get_definition(&self, name: &str) -> DiResult<Arc<Definition>> {
        self.definition(name)
            .ok_or_else(|| DiError::ServiceNotFound(name.to_string()))
    }

    /// Every bound name, aliases included, sorted.
    pub fn definition_names(&self) -> Vec<String> {
        self.registry.lock().names()
    }

    pub(crate) fn definition(&self, name: &str) -> Option<Arc<Definition>> {
        self.registry.lock().get(name).cloned()
    }

    // ----- Parameters -----

    /// Sets a parameter. Strings may contain `%name%` placeholders.
    pub fn set_parameter(&self, name: &str, value: impl Into<Value>) {
        self.parameters.write().set(name, value.into());
        self.resolver.clear_plans();
        debug!(parameter = name, "parameter set");
    }

    /// Serializes `value` into the parameter table.
    ///
    /// ```
    /// use splot_di::Container;
    ///
    /// let container = Container::new();
    /// container.set_parameter_from("ports", &vec![80u16, 443]).unwrap();
    /// let ports: Vec<u16> = container.get_parameter_as("ports").unwrap();
    /// assert_eq!(ports, vec![80, 443]);
    /// ```
    pub fn set_parameter_from<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> DiResult<()> {
        let value = serde_yaml::to_value(value)?;
        self.set_parameter(name, value);
        Ok(())
    }

    /// The interpolated value of parameter `name`.
    pub fn get_parameter(&self, name: &str) -> DiResult<Value> {
        let parameters = self.parameters.read();
        ParametersResolver::new(&parameters)
            .resolve_parameter(name)
            .ok_or_else(|| DiError::ParameterNotFound(name.to_string()))
    }

    /// The interpolated value of parameter `name`, deserialized into `T`.
    pub fn get_parameter_as<T: DeserializeOwned>(&self, name: &str) -> DiResult<T> {
        Ok(serde_yaml::from_value(self.get_parameter(name)?)?)
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.read().contains(name)
    }

    /// Every parameter, interpolated, in insertion order.
    pub fn dump_parameters(&self) -> Mapping {
        let parameters = self.parameters.read();
        ParametersResolver::new(&parameters).resolve_all()
    }

    /// Interpolates a class or service name; non-string results use their text form.
    pub(crate) fn interpolate_name(&self, name: &str) -> String {
        let parameters = self.parameters.read();
        match ParametersResolver::new(&parameters).resolve(&Value::String(name.to_string())) {
            Value::String(text) => text,
            other => key_to_string(&other),
        }
    }

    // ----- Loading -----

    /// Loads parameters and services from a YAML file.
    ///
    /// Loading the same path again is a no-op. A path is remembered only
    /// once it has loaded successfully.
    pub fn load_from_file(&self, path: impl AsRef<Path>) -> DiResult<()> {
        let path = path.as_ref();
        let key = config::loaded_key(path);
        if self.loaded_files.lock().contains(&key) {
            debug!(path = %path.display(), "configuration file already loaded");
            return Ok(());
        }

        let tree = config::read_tree(path)?;
        self.load_tree(&path.display().to_string(), &tree)?;

        self.loaded_files.lock().insert(key);
        debug!(path = %path.display(), "loaded configuration file");
        Ok(())
    }

    /// Loads parameters, then services, from a configuration tree.
    pub fn load_from_array(&self, tree: &Value) -> DiResult<()> {
        self.load_tree("configuration tree", tree)
    }

    /// Parses `yaml` and loads it like [`Container::load_from_array`].
    pub fn load_from_str(&self, yaml: &str) -> DiResult<()> {
        let tree = config::parse_yaml(yaml)?;
        self.load_tree("inline configuration", &tree)
    }

    fn load_tree(&self, origin: &str, tree: &Value) -> DiResult<()> {
        let sections = Sections::of(origin, tree)?;

        if let Some(parameters) = sections.parameters {
            for (name, value) in parameters {
                self.set_parameter(&key_to_string(name), value.clone());
            }
        }

        if let Some(services) = sections.services {
            for (name, options) in services {
                self.register_value(&key_to_string(name), options)?;
            }
        }
        Ok(())
    }

    // ----- Diagnostics -----

    /// Renders bound names, aliases, pending notify calls and parameters.
    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        let mut s = String::new();
        s.push_str("=== Container Debug ===\n");
        s.push_str("Services:\n");
        {
            let registry = self.registry.lock();
            let mut entries: Vec<_> = registry.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            for (name, definition) in entries {
                if name != definition.name() {
                    s.push_str(&format!("  {} -> {}\n", name, definition.name()));
                    continue;
                }
                let type_name = definition
                    .class()
                    .and_then(|class| self.resolver.classes().type_name_of(class))
                    .unwrap_or("-");
                s.push_str(&format!(
                    "  {}: {} class={:?} type={} singleton={} instantiated={}\n",
                    name,
                    definition.kind().label(),
                    definition.class(),
                    type_name,
                    definition.is_singleton(),
                    definition.is_instantiated()
                ));
            }
            s.push_str(&format!("Pending notify calls: {}\n", registry.pending_count()));
        }
        s.push_str(&format!("Cached plans: {}\n", self.resolver.plan_count()));
        s.push_str("Parameters:\n");
        for (name, value) in self.parameters.read().raw() {
            s.push_str(&format!("  {}: {:?}\n", key_to_string(name), value));
        }
        s
    }
}

fn check_writable(registry: &Registry, name: &str) -> DiResult<()> {
    match registry.get(name) {
        Some(existing) if existing.is_read_only() => Err(DiError::ReadOnly(name.to_string())),
        _ => Ok(()),
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("services", &self.definition_names())
            .field("parameters", &self.parameters.read().raw().len())
            .field("classes", self.resolver.classes())
            .finish()
    }
}
