//! Configuration values and resolved arguments.
//!
//! Definitions and parameters are described with the generic configuration
//! tree ([`Value`]). Once parameters are interpolated and service references
//! resolved, arguments reach constructors and methods as [`Argument`]s, which
//! can additionally carry live service instances.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};

pub use serde_yaml::{Mapping, Value};

/// Type-erased service instance.
///
/// Every resolved service is shared through one of these; use
/// [`Arc::downcast`] or [`Container::get_as`](crate::Container::get_as) to get
/// the concrete type back.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// A fully resolved argument.
#[derive(Clone)]
pub enum Argument {
    /// Scalar value (null, bool, number or string)
    Value(Value),
    /// Ordered sequence
    List(Vec<Argument>),
    /// Mapping in declaration order
    Map(Vec<(String, Argument)>),
    /// Live service instance injected from a `@name` reference
    Service(Instance),
}

impl Argument {
    /// Null argument, also produced by an optional reference to an undefined service.
    pub fn null() -> Self {
        Argument::Value(Value::Null)
    }

    /// Returns true for null.
    pub fn is_null(&self) -> bool {
        matches!(self, Argument::Value(Value::Null))
    }

    /// Borrows the string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Argument::Value(value) => value.as_str(),
            _ => None,
        }
    }

    /// Integer view. Numeric strings are accepted since in-string interpolation produces text.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Argument::Value(Value::Number(number)) => number.as_i64(),
            Argument::Value(Value::String(text)) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Float view, accepting integers and numeric strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Argument::Value(Value::Number(number)) => number.as_f64(),
            Argument::Value(Value::String(text)) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean view.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Argument::Value(value) => value.as_bool(),
            _ => None,
        }
    }

    /// Borrows the injected instance, if this is a service.
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Argument::Service(instance) => Some(instance),
            _ => None,
        }
    }

    /// Downcasts an injected service to `T`.
    pub fn as_service<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.as_instance()
            .and_then(|instance| instance.clone().downcast::<T>().ok())
    }

    /// Borrows the elements of a list.
    pub fn as_list(&self) -> Option<&[Argument]> {
        match self {
            Argument::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrows the entries of a map.
    pub fn as_map(&self) -> Option<&[(String, Argument)]> {
        match self {
            Argument::Map(entries) => Some(entries),
            _ => None,
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Argument::List(items) => f.debug_tuple("List").field(items).finish(),
            Argument::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            Argument::Service(_) => f.write_str("Service(..)"),
        }
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        match value {
            Value::Sequence(items) => Argument::List(items.into_iter().map(Argument::from).collect()),
            Value::Mapping(mapping) => Argument::Map(
                mapping
                    .into_iter()
                    .map(|(key, value)| (key_to_string(&key), Argument::from(value)))
                    .collect(),
            ),
            Value::Tagged(tagged) => Argument::from(tagged.value),
            scalar => Argument::Value(scalar),
        }
    }
}

/// Renders a mapping key as text.
pub(crate) fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|text| text.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Positional arguments handed to a constructor, method or factory method.
///
/// The typed accessors return [`DiError::Argument`] on a shape mismatch, so a
/// constructor can be written with `?` throughout.
///
/// # Examples
///
/// ```rust
/// use splot_di::{Argument, Arguments, Value};
///
/// let args = Arguments::new(vec![
///     Argument::from(Value::from("splot")),
///     Argument::from(Value::from(2)),
///     Argument::null(),
/// ]);
///
/// assert_eq!(args.str(0).unwrap(), "splot");
/// assert_eq!(args.i64(1).unwrap(), 2);
/// assert!(args.optional_service::<String>(2).unwrap().is_none());
/// assert!(args.optional_service::<String>(7).unwrap().is_none());
/// assert!(args.bool(0).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    items: Vec<Argument>,
}

impl Arguments {
    /// Wraps a list of resolved arguments.
    pub fn new(items: Vec<Argument>) -> Self {
        Self { items }
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no arguments were given.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Argument at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&Argument> {
        self.items.get(index)
    }

    /// Iterates over the arguments in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Argument> {
        self.items.iter()
    }

    /// Consumes the list.
    pub fn into_vec(self) -> Vec<Argument> {
        self.items
    }

    fn require(&self, index: usize, expected: &'static str) -> DiResult<&Argument> {
        self.items
            .get(index)
            .ok_or(DiError::Argument { index, expected })
    }

    /// String argument.
    pub fn str(&self, index: usize) -> DiResult<&str> {
        self.require(index, "a string")?
            .as_str()
            .ok_or(DiError::Argument { index, expected: "a string" })
    }

    /// Owned string argument.
    pub fn string(&self, index: usize) -> DiResult<String> {
        self.str(index).map(str::to_string)
    }

    /// Integer argument.
    pub fn i64(&self, index: usize) -> DiResult<i64> {
        self.require(index, "an integer")?
            .as_i64()
            .ok_or(DiError::Argument { index, expected: "an integer" })
    }

    /// Float argument.
    pub fn f64(&self, index: usize) -> DiResult<f64> {
        self.require(index, "a number")?
            .as_f64()
            .ok_or(DiError::Argument { index, expected: "a number" })
    }

    /// Boolean argument.
    pub fn bool(&self, index: usize) -> DiResult<bool> {
        self.require(index, "a boolean")?
            .as_bool()
            .ok_or(DiError::Argument { index, expected: "a boolean" })
    }

    /// Required service argument of type `T`.
    pub fn service<T: Any + Send + Sync>(&self, index: usize) -> DiResult<Arc<T>> {
        self.require(index, "a service")?
            .as_service::<T>()
            .ok_or(DiError::Argument { index, expected: "a service of the requested type" })
    }

    /// Optional service argument; a missing position or null yields `None`.
    pub fn optional_service<T: Any + Send + Sync>(&self, index: usize) -> DiResult<Option<Arc<T>>> {
        match self.items.get(index) {
            None => Ok(None),
            Some(argument) if argument.is_null() => Ok(None),
            Some(argument) => argument
                .as_service::<T>()
                .map(Some)
                .ok_or(DiError::Argument { index, expected: "a service of the requested type" }),
        }
    }

    /// List argument.
    pub fn list(&self, index: usize) -> DiResult<&[Argument]> {
        self.require(index, "a list")?
            .as_list()
            .ok_or(DiError::Argument { index, expected: "a list" })
    }

    /// Map argument.
    pub fn map(&self, index: usize) -> DiResult<&[(String, Argument)]> {
        self.require(index, "a map")?
            .as_map()
            .ok_or(DiError::Argument { index, expected: "a map" })
    }
}

impl From<Vec<Argument>> for Arguments {
    fn from(items: Vec<Argument>) -> Self {
        Self::new(items)
    }
}

impl<'a> IntoIterator for &'a Arguments {
    type Item = &'a Argument;
    type IntoIter = std::slice::Iter<'a, Argument>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
