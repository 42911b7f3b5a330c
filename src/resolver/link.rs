//! Service references inside arguments.

use crate::value::Value;

/// Reference to another service, parsed from an `@name` or `@name?` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLink {
    name: String,
    optional: bool,
}

impl ServiceLink {
    /// Parses `text` if it starts with `@`.
    ///
    /// ```rust
    /// use splot_di::ServiceLink;
    ///
    /// let link = ServiceLink::parse("@logger?").unwrap();
    /// assert_eq!(link.name(), "logger");
    /// assert!(link.is_optional());
    /// assert!(ServiceLink::parse("logger").is_none());
    /// ```
    pub fn parse(text: &str) -> Option<Self> {
        let name = text.strip_prefix('@')?;
        Some(match name.strip_suffix('?') {
            Some(name) => Self {
                name: name.to_string(),
                optional: true,
            },
            None => Self {
                name: name.to_string(),
                optional: false,
            },
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Optional links resolve to null when the target is undefined.
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// Argument after parameter interpolation, before service lookup.
#[derive(Debug, Clone)]
pub(crate) enum Unresolved {
    Value(Value),
    List(Vec<Unresolved>),
    Map(Vec<(String, Unresolved)>),
    Link(ServiceLink),
}

/// Replaces every lone `"@"` with a reference to `service`.
///
/// Used for `notify` arguments, where `@` means the declaring service.
pub(crate) fn bind_self(service: &str, arguments: Vec<Value>) -> Vec<Value> {
    arguments
        .into_iter()
        .map(|argument| bind_self_value(service, argument))
        .collect()
}

fn bind_self_value(service: &str, value: Value) -> Value {
    match value {
        Value::String(text) if text == "@" => Value::String(format!("@{}", service)),
        Value::Sequence(items) => Value::Sequence(bind_self(service, items)),
        Value::Mapping(mapping) => Value::Mapping(
            mapping
                .into_iter()
                .map(|(key, item)| (key, bind_self_value(service, item)))
                .collect(),
        ),
        other => other,
    }
}
