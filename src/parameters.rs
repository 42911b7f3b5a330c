//! Parameter table and `%name%` placeholder interpolation.

use crate::value::{Mapping, Value};

/// Flat name to value store, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub(crate) struct Parameters {
    values: Mapping,
}

impl Parameters {
    pub(crate) fn set(&mut self, name: &str, value: Value) {
        self.values.insert(Value::String(name.to_string()), value);
    }

    /// Raw, uninterpolated value.
    pub(crate) fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub(crate) fn raw(&self) -> &Mapping {
        &self.values
    }
}

/// Resolves placeholders against a parameter table.
///
/// - A string that is exactly one `%name%` token becomes the parameter's value
///   with its original type.
/// - Tokens embedded in a longer string are replaced by the parameter's text form.
/// - Undefined names are left as literal text.
/// - Sequences and mappings are resolved element by element; other values pass through.
///
/// Parameter values are themselves interpolated, so `%full%` defined as
/// `"%name%-1"` yields the expanded text. A placeholder that refers back to a
/// parameter currently being expanded is left literal.
pub(crate) struct ParametersResolver<'a> {
    parameters: &'a Parameters,
}

impl<'a> ParametersResolver<'a> {
    pub(crate) fn new(parameters: &'a Parameters) -> Self {
        Self { parameters }
    }

    pub(crate) fn resolve(&self, value: &Value) -> Value {
        self.resolve_with(value, &mut Vec::new())
    }

    /// Expanded value of parameter `name`; `None` if it is undefined.
    pub(crate) fn resolve_parameter(&self, name: &str) -> Option<Value> {
        self.lookup(name, &mut Vec::new())
    }

    /// Resolves every parameter of the table.
    pub(crate) fn resolve_all(&self) -> Mapping {
        self.parameters
            .raw()
            .iter()
            .map(|(name, value)| {
                let resolved = name
                    .as_str()
                    .and_then(|name| self.resolve_parameter(name))
                    .unwrap_or_else(|| self.resolve(value));
                (name.clone(), resolved)
            })
            .collect()
    }

    fn resolve_with(&self, value: &Value, expanding: &mut Vec<String>) -> Value {
        match value {
            Value::String(text) => self.interpolate(text, expanding),
            Value::Sequence(items) => Value::Sequence(
                items
                    .iter()
                    .map(|item| self.resolve_with(item, expanding))
                    .collect(),
            ),
            Value::Mapping(mapping) => Value::Mapping(
                mapping
                    .iter()
                    .map(|(key, item)| (key.clone(), self.resolve_with(item, expanding)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Expanded value of parameter `name`, unless it is undefined or already being expanded.
    fn lookup(&self, name: &str, expanding: &mut Vec<String>) -> Option<Value> {
        if expanding.iter().any(|current| current == name) {
            return None;
        }
        let raw = self.parameters.get(name)?;
        expanding.push(name.to_string());
        let resolved = self.resolve_with(raw, expanding);
        expanding.pop();
        Some(resolved)
    }

    fn interpolate(&self, text: &str, expanding: &mut Vec<String>) -> Value {
        if let Some(name) = whole_token(text) {
            return self
                .lookup(name, expanding)
                .unwrap_or_else(|| Value::String(text.to_string()));
        }

        let mut output = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find('%') {
            output.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('%') else {
                output.push_str(&rest[start..]);
                return Value::String(output);
            };

            let name = &after[..end];
            if !is_token_name(name) {
                // not a token, the closing '%' may open the next one
                output.push('%');
                rest = after;
                continue;
            }

            match self.lookup(name, expanding).as_ref().and_then(to_text) {
                Some(replacement) => output.push_str(&replacement),
                None => {
                    output.push('%');
                    output.push_str(name);
                    output.push('%');
                }
            }
            rest = &after[end + 1..];
        }
        output.push_str(rest);
        Value::String(output)
    }
}

/// Name inside `text` when the whole string is a single `%name%` token.
fn whole_token(text: &str) -> Option<&str> {
    let name = text.strip_prefix('%')?.strip_suffix('%')?;
    is_token_name(name).then_some(name)
}

fn is_token_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('%') && !name.chars().any(char::is_whitespace)
}

/// Text form of a scalar used for in-string substitution.
fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table(entries: &[(&str, Value)]) -> Parameters {
        let mut parameters = Parameters::default();
        for (name, value) in entries {
            parameters.set(name, value.clone());
        }
        parameters
    }

    #[test]
    fn test_whole_token_preserves_type() {
        let parameters = table(&[("debug", Value::Bool(true)), ("version", Value::from(3))]);
        let resolver = ParametersResolver::new(&parameters);

        assert_eq!(resolver.resolve(&Value::from("%debug%")), Value::Bool(true));
        assert_eq!(resolver.resolve(&Value::from("%version%")), Value::from(3));
    }

    #[test]
    fn test_embedded_tokens() {
        let parameters = table(&[
            ("name", Value::from("splot")),
            ("version", Value::from(0.5)),
        ]);
        let resolver = ParametersResolver::new(&parameters);

        assert_eq!(
            resolver.resolve(&Value::from("%name% v.%version%")),
            Value::from("splot v.0.5")
        );
        assert_eq!(
            resolver.resolve(&Value::from("%name%.argumented")),
            Value::from("splot.argumented")
        );
    }

    #[test]
    fn test_undefined_tokens_stay_literal() {
        let parameters = table(&[("name", Value::from("x"))]);
        let resolver = ParametersResolver::new(&parameters);

        assert_eq!(resolver.resolve(&Value::from("%missing%")), Value::from("%missing%"));
        assert_eq!(
            resolver.resolve(&Value::from("%missing%-%name%")),
            Value::from("%missing%-x")
        );
    }

    #[test]
    fn test_percent_signs_that_are_not_tokens() {
        let parameters = table(&[("name", Value::from("x"))]);
        let resolver = ParametersResolver::new(&parameters);

        assert_eq!(
            resolver.resolve(&Value::from("100% of %name%")),
            Value::from("100% of x")
        );
        assert_eq!(resolver.resolve(&Value::from("50%")), Value::from("50%"));
        assert_eq!(resolver.resolve(&Value::from("%%")), Value::from("%%"));
    }

    #[test]
    fn test_nested_parameters() {
        let parameters = table(&[
            ("name", Value::from("di")),
            ("name.prefixed", Value::from("lib.%name%")),
            ("full_name", Value::from("splot.%name.prefixed%.lib")),
        ]);
        let resolver = ParametersResolver::new(&parameters);

        assert_eq!(
            resolver.resolve(&Value::from("%full_name%")),
            Value::from("splot.lib.di.lib")
        );
    }

    #[test]
    fn test_self_reference_does_not_loop() {
        let parameters = table(&[
            ("a", Value::from("%b%")),
            ("b", Value::from("<%a%>")),
        ]);
        let resolver = ParametersResolver::new(&parameters);

        assert_eq!(resolver.resolve(&Value::from("%a%")), Value::from("<%a%>"));
        assert_eq!(resolver.resolve_parameter("a"), Some(Value::from("<%a%>")));
        assert_eq!(resolver.resolve_parameter("b"), Some(Value::from("<%b%>")));
        assert_eq!(resolver.resolve_parameter("missing"), None);
    }

    #[test]
    fn test_deep_sequences() {
        let parameters = table(&[("prefix", Value::from("di"))]);
        let resolver = ParametersResolver::new(&parameters);

        let deep: Value = serde_yaml::from_str(
            "['%prefix% Salvatore', '%prefix% Rodriguez', ['%prefix% Santa Cruz'], 7]",
        )
        .unwrap();
        let expected: Value =
            serde_yaml::from_str("['di Salvatore', 'di Rodriguez', ['di Santa Cruz'], 7]").unwrap();

        assert_eq!(resolver.resolve(&deep), expected);
    }

    #[test]
    fn test_resolve_all_keeps_order() {
        let parameters = table(&[
            ("zeta", Value::from("%alpha%")),
            ("alpha", Value::from("a")),
        ]);
        let resolver = ParametersResolver::new(&parameters);

        let dumped = resolver.resolve_all();
        let keys: Vec<_> = dumped.iter().filter_map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(dumped.get("zeta"), Some(&Value::from("a")));
    }

    proptest! {
        #[test]
        fn text_without_percent_is_untouched(text in "[^%]{0,40}") {
            let parameters = table(&[("name", Value::from("x"))]);
            let resolver = ParametersResolver::new(&parameters);
            prop_assert_eq!(resolver.resolve(&Value::from(text.clone())), Value::from(text));
        }

        #[test]
        fn embedded_token_is_replaced(prefix in "[a-z ]{0,10}", suffix in "[a-z ]{1,10}", value in "[a-z0-9]{0,10}") {
            let parameters = table(&[("token", Value::from(value.clone()))]);
            let resolver = ParametersResolver::new(&parameters);
            let input = format!("{}%token%{}", prefix, suffix);
            prop_assert_eq!(
                resolver.resolve(&Value::from(input)),
                Value::from(format!("{}{}{}", prefix, value, suffix))
            );
        }
    }
}
