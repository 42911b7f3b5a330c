//! Per-service option schema.
//!
//! Options are either built in code with [`ServiceOptions`]'s builder methods
//! or read from a configuration tree with [`ServiceOptions::from_value`], which
//! also understands the compact forms used in configuration files:
//!
//! ```yaml
//! services:
//!     mailer: App\Mailer                      # class name only
//!     product: [factory_service, create]      # compact factory
//!     other: [factory_service, create, [a]]   # compact factory with arguments
//!     verbose:
//!         factory: [factory_service, create, a]
//! ```

use crate::definition::MethodCall;
use crate::error::{DiError, DiResult};
use crate::value::{key_to_string, Mapping, Value};

/// Deferred method call declared by one service against another.
#[derive(Debug, Clone, PartialEq)]
pub struct Notify {
    /// Service that receives the call
    pub service: String,
    /// Method to call on it
    pub method: String,
    /// Unresolved arguments; a lone `"@"` stands for the declaring service
    pub arguments: Vec<Value>,
}

/// Options of a service definition.
///
/// Defaults follow the schema: no class, no arguments, singleton, not
/// abstract, not private, not read-only.
///
/// # Examples
///
/// ```rust
/// use splot_di::ServiceOptions;
///
/// let options = ServiceOptions::class("App\\Mailer")
///     .arguments(["@transport", "%mailer.sender%"])
///     .call("setLogger", ["@logger?"])
///     .aliases(["mailer.default"])
///     .singleton(false);
///
/// assert_eq!(options.class_name(), Some("App\\Mailer"));
/// assert!(!options.is_singleton());
/// ```
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub(crate) class: Option<String>,
    pub(crate) extends: Option<String>,
    pub(crate) arguments: Vec<Value>,
    pub(crate) factory_service: Option<String>,
    pub(crate) factory_method: Option<String>,
    pub(crate) factory_arguments: Vec<Value>,
    pub(crate) call: Vec<MethodCall>,
    pub(crate) notify: Vec<Notify>,
    pub(crate) is_abstract: bool,
    pub(crate) singleton: bool,
    pub(crate) alias: Option<String>,
    pub(crate) aliases: Vec<String>,
    pub(crate) private: bool,
    pub(crate) read_only: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            class: None,
            extends: None,
            arguments: Vec::new(),
            factory_service: None,
            factory_method: None,
            factory_arguments: Vec::new(),
            call: Vec::new(),
            notify: Vec::new(),
            is_abstract: false,
            singleton: true,
            alias: None,
            aliases: Vec::new(),
            private: false,
            read_only: false,
        }
    }
}

fn values<I>(items: I) -> Vec<Value>
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    items.into_iter().map(Into::into).collect()
}

impl ServiceOptions {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a service built from class identifier `class`.
    pub fn class(class: impl Into<String>) -> Self {
        Self::default().with_class(class)
    }

    /// Options for a service built by `service.method(arguments...)`.
    pub fn factory<I>(service: impl Into<String>, method: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let mut options = Self::default();
        options.factory_service = Some(service.into());
        options.factory_method = Some(method.into());
        options.factory_arguments = values(arguments);
        options
    }

    /// Options making the name an alias of `target`.
    pub fn alias_of(target: impl Into<String>) -> Self {
        let mut options = Self::default();
        options.alias = Some(target.into());
        options
    }

    /// Sets the class identifier.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Inherits class, arguments and calls from `parent`.
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    /// Appends one constructor argument.
    pub fn argument(mut self, argument: impl Into<Value>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    /// Appends constructor arguments.
    pub fn arguments<I>(mut self, arguments: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.arguments.extend(values(arguments));
        self
    }

    /// Queues a method call to run after construction.
    pub fn call<I>(mut self, method: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.call.push(MethodCall::new(method, values(arguments)));
        self
    }

    /// Declares a deferred call of `method` on `service`.
    pub fn notify<I>(mut self, service: impl Into<String>, method: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.notify.push(Notify {
            service: service.into(),
            method: method.into(),
            arguments: values(arguments),
        });
        self
    }

    pub fn singleton(mut self, singleton: bool) -> Self {
        self.singleton = singleton;
        self
    }

    pub fn abstract_service(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    pub fn private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Makes the name an alias of `target`.
    pub fn alias(mut self, target: impl Into<String>) -> Self {
        self.alias = Some(target.into());
        self
    }

    /// Additional names bound to the same definition.
    pub fn aliases<I>(mut self, aliases: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    /// Reads options for service `name` from a configuration value.
    ///
    /// Accepts a class-name string, a 2-3 element compact factory list, a
    /// mapping with the schema keys (and an optional `factory` list), or null.
    pub fn from_value(name: &str, value: &Value) -> DiResult<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::String(class) => Ok(Self::class(class.clone())),
            Value::Sequence(items) if items.len() == 2 || items.len() == 3 => {
                let mut options = Self::default();
                options.expand_factory(name, items)?;
                Ok(options)
            }
            Value::Mapping(mapping) => Self::from_mapping(name, mapping),
            Value::Tagged(tagged) => Self::from_value(name, &tagged.value),
            _ => Err(DiError::invalid_service(
                name,
                "options must be a class name, a compact factory definition or a mapping",
            )),
        }
    }

    fn from_mapping(name: &str, mapping: &Mapping) -> DiResult<Self> {
        let mut options = Self::default();

        if let Some(factory) = mapping.get("factory") {
            let items = factory.as_sequence().ok_or_else(|| {
                DiError::invalid_service(name, "factory must be a [service, method, arguments?] list")
            })?;
            options.expand_factory(name, items)?;
        }

        for (key, value) in mapping {
            let key = key_to_string(key);
            match key.as_str() {
                "class" => options.class = optional_string(name, "class", value)?,
                "extends" => options.extends = optional_string(name, "extends", value)?,
                "arguments" => options.arguments = argument_list(value),
                "factory_service" => {
                    options.factory_service = optional_string(name, "factory_service", value)?
                }
                "factory_method" => {
                    options.factory_method = optional_string(name, "factory_method", value)?
                }
                "factory_arguments" => options.factory_arguments = argument_list(value),
                "call" => options.call = method_calls(name, value)?,
                "notify" => options.notify = notifications(name, value)?,
                "abstract" => options.is_abstract = flag(name, "abstract", value)?,
                "singleton" => options.singleton = flag(name, "singleton", value)?,
                "private" => options.private = flag(name, "private", value)?,
                "read_only" => options.read_only = flag(name, "read_only", value)?,
                "alias" => options.alias = optional_string(name, "alias", value)?,
                "aliases" => options.aliases = string_list(name, "aliases", value)?,
                // already expanded, and unknown keys are ignored
                _ => {}
            }
        }

        Ok(options)
    }

    fn expand_factory(&mut self, name: &str, items: &[Value]) -> DiResult<()> {
        let service = items.first().and_then(Value::as_str);
        let method = items.get(1).and_then(Value::as_str);
        let (Some(service), Some(method)) = (service, method) else {
            return Err(DiError::invalid_service(
                name,
                "you have to specify factory service name and method when registering a service built from a factory",
            ));
        };
        self.factory_service = Some(service.to_string());
        self.factory_method = Some(method.to_string());
        self.factory_arguments = items.get(2).map(argument_list).unwrap_or_default();
        Ok(())
    }

    /// Checks invariants that builder-made options can still violate.
    pub(crate) fn validate(&self, name: &str) -> DiResult<()> {
        if self.factory_service.is_some() && self.factory_method.as_deref().map_or(true, str::is_empty) {
            return Err(DiError::invalid_service(
                name,
                "cannot define service built from factory without specifying factory method",
            ));
        }
        if self.call.iter().any(|call| call.method.is_empty()) {
            return Err(DiError::invalid_service(name, "invalid method calls definition"));
        }
        for notify in &self.notify {
            if notify.service.is_empty() {
                return Err(DiError::invalid_service(
                    name,
                    "invalid service name given to notify about existence",
                ));
            }
            if notify.method.is_empty() {
                return Err(DiError::invalid_service(
                    name,
                    "invalid method name to call given to notify about existence",
                ));
            }
        }
        Ok(())
    }
}

impl From<&str> for ServiceOptions {
    fn from(class: &str) -> Self {
        Self::class(class)
    }
}

impl From<String> for ServiceOptions {
    fn from(class: String) -> Self {
        Self::class(class)
    }
}

/// Argument list: sequences as-is, null as empty, any scalar wrapped.
fn argument_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Sequence(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

fn optional_string(name: &str, key: &str, value: &Value) -> DiResult<Option<String>> {
    match value {
        Value::Null | Value::Bool(false) => Ok(None),
        Value::String(text) if text.is_empty() => Ok(None),
        Value::String(text) => Ok(Some(text.clone())),
        _ => Err(DiError::invalid_service(name, format!("option \"{}\" must be a string", key))),
    }
}

fn flag(name: &str, key: &str, value: &Value) -> DiResult<bool> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::Null => Ok(false),
        _ => Err(DiError::invalid_service(name, format!("option \"{}\" must be a boolean", key))),
    }
}

fn string_list(name: &str, key: &str, value: &Value) -> DiResult<Vec<String>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(text) => Ok(vec![text.clone()]),
        Value::Sequence(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    DiError::invalid_service(name, format!("option \"{}\" must list names", key))
                })
            })
            .collect(),
        _ => Err(DiError::invalid_service(name, format!("option \"{}\" must list names", key))),
    }
}

fn method_calls(name: &str, value: &Value) -> DiResult<Vec<MethodCall>> {
    let entries = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Sequence(entries) => entries,
        _ => return Err(DiError::invalid_service(name, "invalid method calls definition")),
    };

    entries
        .iter()
        .map(|entry| {
            let tuple = entry.as_sequence();
            let method = tuple
                .and_then(|tuple| tuple.first())
                .and_then(Value::as_str)
                .filter(|method| !method.is_empty())
                .ok_or_else(|| DiError::invalid_service(name, "invalid method calls definition"))?;
            let arguments = tuple
                .and_then(|tuple| tuple.get(1))
                .map(argument_list)
                .unwrap_or_default();
            Ok(MethodCall::new(method, arguments))
        })
        .collect()
}

fn notifications(name: &str, value: &Value) -> DiResult<Vec<Notify>> {
    let entries = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Sequence(entries) => entries,
        _ => {
            return Err(DiError::invalid_service(
                name,
                "invalid service name given to notify about existence",
            ))
        }
    };

    entries
        .iter()
        .map(|entry| {
            let tuple = entry.as_sequence();
            let service = tuple
                .and_then(|tuple| tuple.first())
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    DiError::invalid_service(name, "invalid service name given to notify about existence")
                })?;
            let method = tuple
                .and_then(|tuple| tuple.get(1))
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    DiError::invalid_service(name, "invalid method name to call given to notify about existence")
                })?;
            let arguments = tuple
                .and_then(|tuple| tuple.get(2))
                .map(argument_list)
                .unwrap_or_default();
            Ok(Notify {
                service: service.to_string(),
                method: method.to_string(),
                arguments,
            })
        })
        .collect()
}
