//! Resolution engine: turns definitions into instances.
//!
//! The resolver merges `extends` hierarchies, builds and caches instantiation
//! plans, resolves arguments (which may re-enter the container for `@name`
//! references) and runs method calls. All registry state lives in the
//! [`Container`]; the resolver only owns the class registry and the plan cache.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::class::{ClassLookup, ClassRegistry, Constructor};
use crate::container::Container;
use crate::definition::{Definition, Kind, MethodCall};
use crate::error::{DiError, DiResult};
use crate::parameters::ParametersResolver;
use crate::value::{key_to_string, Argument, Arguments, Instance, Value};

pub mod link;

pub use link::ServiceLink;
use link::Unresolved;

/// Cached recipe for building a plain service: the located constructor plus
/// arguments with parameters already interpolated.
struct Plan {
    class: String,
    constructor: Constructor,
    arguments: Vec<Unresolved>,
}

pub(crate) struct ServicesResolver {
    classes: ClassRegistry,
    /// Keyed by service name; dropped wholesale on any registry or parameter change
    plans: Mutex<HashMap<String, Arc<Plan>>>,
}

impl ServicesResolver {
    pub(crate) fn new(classes: ClassRegistry) -> Self {
        Self {
            classes,
            plans: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub(crate) fn clear_plans(&self) {
        let mut plans = self.plans.lock();
        if !plans.is_empty() {
            debug!(plans = plans.len(), "dropping cached instantiation plans");
            plans.clear();
        }
    }

    #[cfg_attr(not(feature = "diagnostics"), allow(dead_code))]
    pub(crate) fn plan_count(&self) -> usize {
        self.plans.lock().len()
    }

    /// Resolves `definition` into an instance.
    ///
    /// The caller has already placed the service in the loading set.
    pub(crate) fn resolve(&self, container: &Container, definition: &Arc<Definition>) -> DiResult<Instance> {
        if definition.is_singleton() {
            if let Some(instance) = definition.instance() {
                return Ok(instance);
            }
        }

        if definition.is_abstract() {
            return Err(DiError::AbstractService(definition.name().to_string()));
        }

        let effective = self.resolve_hierarchy(container, definition)?;
        let instance = self.instantiate(container, &effective)?;

        // cached before the calls run so setter injection can close a cycle between singletons
        definition.set_instance(instance.clone());

        for call in effective.method_calls() {
            if let Err(err) = self.call_method(container, definition.name(), &instance, &call) {
                definition.clear_instance();
                return Err(err);
            }
        }

        Ok(instance)
    }

    /// Resolves the arguments of `call` and invokes it on `instance`.
    pub(crate) fn call_method(
        &self,
        container: &Container,
        service: &str,
        instance: &Instance,
        call: &MethodCall,
    ) -> DiResult<()> {
        let arguments = self.parse_arguments(container, &call.arguments);
        let arguments = self.resolve_arguments(container, &arguments).map_err(|err| {
            DiError::wrap(
                service,
                format!("arguments of method \"{}\" could not be resolved", call.method),
                err,
            )
        })?;

        trace!(service, method = %call.method, "calling method");
        self.classes
            .invoke(instance, &call.method, &arguments)
            .map_err(|err| DiError::wrap_boxed(service, format!("method \"{}\" failed", call.method), err))?;
        Ok(())
    }

    fn resolve_hierarchy(&self, container: &Container, definition: &Arc<Definition>) -> DiResult<Arc<Definition>> {
        let mut extending = Vec::new();
        self.merge_parents(container, definition, &mut extending)
    }

    fn merge_parents(
        &self,
        container: &Container,
        definition: &Arc<Definition>,
        extending: &mut Vec<String>,
    ) -> DiResult<Arc<Definition>> {
        let Some(extends) = definition.extends() else {
            return Ok(definition.clone());
        };

        if extending.iter().any(|name| name == definition.name()) {
            return Err(DiError::CircularReference {
                chain: std::mem::take(extending),
                service: definition.name().to_string(),
            });
        }
        extending.push(definition.name().to_string());

        let parent_name = container.interpolate_name(extends);
        let parent = container.definition(&parent_name).ok_or_else(|| {
            DiError::invalid_service(
                definition.name(),
                format!("tried to extend an undefined service \"{}\"", parent_name),
            )
        })?;

        if matches!(parent.kind(), Kind::Object(_) | Kind::Factory { .. }) {
            return Err(DiError::invalid_service(
                definition.name(),
                format!("cannot extend {} service \"{}\"", parent.kind().label(), parent.name()),
            ));
        }

        let parent = self.merge_parents(container, &parent, extending)?;
        Ok(Arc::new(definition.merged_with(&parent)))
    }

    fn instantiate(&self, container: &Container, definition: &Definition) -> DiResult<Instance> {
        match definition.kind() {
            Kind::Object(object) => object.instance().ok_or_else(|| {
                DiError::invalid_service(definition.name(), "the object is no longer available")
            }),
            Kind::Closure(closure) => closure(container),
            Kind::Factory { service, method, arguments } => {
                self.instantiate_from_factory(container, definition.name(), service, method, arguments)
            }
            Kind::Plain => self.instantiate_class(container, definition),
        }
    }

    fn instantiate_class(&self, container: &Container, definition: &Definition) -> DiResult<Instance> {
        let name = definition.name();
        let plan = self.plan_for(container, definition)?;

        let arguments = self.resolve_arguments(container, &plan.arguments).map_err(|err| {
            DiError::wrap(name, "one or more of its arguments could not be resolved", err)
        })?;

        trace!(service = name, class = %plan.class, "instantiating");
        (plan.constructor)(&arguments).map_err(|err| {
            DiError::wrap_boxed(name, format!("constructor of class {} failed", plan.class), err)
        })
    }

    fn plan_for(&self, container: &Container, definition: &Definition) -> DiResult<Arc<Plan>> {
        let name = definition.name();
        if let Some(plan) = self.plans.lock().get(name).cloned() {
            trace!(service = name, "instantiation plan cache hit");
            return Ok(plan);
        }

        let class = definition
            .class()
            .ok_or_else(|| DiError::invalid_service(name, "no class was defined"))?;
        let class = container.interpolate_name(class);

        let constructor = match self.classes.lookup(&class) {
            ClassLookup::Found(constructor) => constructor,
            ClassLookup::NotInstantiable => {
                return Err(DiError::invalid_service(
                    name,
                    format!("the class {} is not instantiable", class),
                ))
            }
            ClassLookup::Missing => {
                return Err(DiError::invalid_service(name, format!("class {} was not found", class)))
            }
        };

        let plan = Arc::new(Plan {
            arguments: self.parse_arguments(container, definition.arguments()),
            class,
            constructor,
        });
        self.plans.lock().insert(name.to_string(), plan.clone());
        Ok(plan)
    }

    fn instantiate_from_factory(
        &self,
        container: &Container,
        name: &str,
        service: &str,
        method: &str,
        arguments: &[Value],
    ) -> DiResult<Instance> {
        let factory_name = container.interpolate_name(service);
        let factory_name = factory_name.strip_prefix('@').unwrap_or(&factory_name);

        let factory = container.get(factory_name).map_err(|err| {
            DiError::wrap(name, format!("factory service \"{}\" could not be resolved", factory_name), err)
        })?;

        let arguments = self.parse_arguments(container, arguments);
        let arguments = self
            .resolve_arguments(container, &arguments)
            .map_err(|err| DiError::wrap(name, "factory arguments could not be resolved", err))?;

        trace!(service = name, factory = factory_name, method, "calling factory");
        self.classes
            .invoke(&factory, method, &arguments)
            .map_err(|err| DiError::wrap_boxed(name, format!("factory method \"{}\" failed", method), err))?
            .ok_or_else(|| {
                DiError::invalid_service(name, format!("factory method \"{}\" did not return a service", method))
            })
    }

    /// Interpolates parameters and turns `@name` strings into links.
    fn parse_arguments(&self, container: &Container, arguments: &[Value]) -> Vec<Unresolved> {
        let parameters = container.parameters.read();
        let resolver = ParametersResolver::new(&parameters);
        arguments.iter().map(|argument| parse(&resolver, argument)).collect()
    }

    fn resolve_arguments(&self, container: &Container, arguments: &[Unresolved]) -> DiResult<Arguments> {
        arguments
            .iter()
            .map(|argument| resolve_argument(container, argument))
            .collect::<DiResult<Vec<_>>>()
            .map(Arguments::new)
    }
}

fn parse(resolver: &ParametersResolver<'_>, argument: &Value) -> Unresolved {
    match argument {
        Value::Sequence(items) => Unresolved::List(items.iter().map(|item| parse(resolver, item)).collect()),
        Value::Mapping(mapping) => Unresolved::Map(
            mapping
                .iter()
                .map(|(key, item)| (key_to_string(key), parse(resolver, item)))
                .collect(),
        ),
        Value::String(_) => match resolver.resolve(argument) {
            Value::String(text) => match ServiceLink::parse(&text) {
                Some(link) => Unresolved::Link(link),
                None => Unresolved::Value(Value::String(text)),
            },
            other => Unresolved::Value(other),
        },
        other => Unresolved::Value(other.clone()),
    }
}

fn resolve_argument(container: &Container, argument: &Unresolved) -> DiResult<Argument> {
    match argument {
        Unresolved::Value(value) => Ok(Argument::from(value.clone())),
        Unresolved::List(items) => items
            .iter()
            .map(|item| resolve_argument(container, item))
            .collect::<DiResult<Vec<_>>>()
            .map(Argument::List),
        Unresolved::Map(entries) => entries
            .iter()
            .map(|(key, item)| resolve_argument(container, item).map(|item| (key.clone(), item)))
            .collect::<DiResult<Vec<_>>>()
            .map(Argument::Map),
        Unresolved::Link(link) => {
            if link.is_optional() && !container.has(link.name()) {
                return Ok(Argument::null());
            }
            container.get(link.name()).map(Argument::Service)
        }
    }
}
