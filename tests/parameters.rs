mod common;

use common::*;
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use splot_di::{DiError, Mapping, Value};

fn yaml(text: &str) -> Value {
    serde_yaml::from_str(text).unwrap()
}

#[test]
fn test_setting_and_getting_parameter() {
    let container = container();
    container.set_parameter("name", "splot");
    container.set_parameter("version", 2);
    container.set_parameter("debug", true);

    assert_eq!(container.get_parameter("name").unwrap(), Value::from("splot"));
    assert_eq!(container.get_parameter("version").unwrap(), Value::from(2));
    assert_eq!(container.get_parameter("debug").unwrap(), Value::from(true));
}

#[test]
fn test_has_parameter() {
    let container = container();
    assert!(!container.has_parameter("name"));
    container.set_parameter("name", "splot");
    assert!(container.has_parameter("name"));
}

#[test]
fn test_setting_array_as_parameter() {
    let container = container();
    let authors = yaml("[Michał Dudek, John Doe]");
    container.set_parameter("authors", authors.clone());
    assert_eq!(container.get_parameter("authors").unwrap(), authors);
}

#[test]
fn test_getting_undefined_parameter() {
    let container = container();
    let err = container.get_parameter("undefined").unwrap_err();
    assert!(matches!(err, DiError::ParameterNotFound(ref name) if name == "undefined"));
}

#[test]
fn test_resolving_parameters() {
    let container = container();
    container.set_parameter("name", "x");
    container.set_parameter("full", "%name%-1");
    container.set_parameter("full2", "%missing%");
    container.set_parameter("twice", "%name%.%name%");

    assert_eq!(container.get_parameter("full").unwrap(), Value::from("x-1"));
    assert_eq!(container.get_parameter("full2").unwrap(), Value::from("%missing%"));
    assert_eq!(container.get_parameter("twice").unwrap(), Value::from("x.x"));
}

#[test]
fn test_deep_resolving_parameters() {
    let container = container();
    container.set_parameter("name", "di");
    container.set_parameter("version", 2);
    container.set_parameter(
        "deep",
        yaml("{lib: '%name%', meta: {version: '%version%', tags: ['%name%-%version%', plain]}}"),
    );

    assert_eq!(
        container.get_parameter("deep").unwrap(),
        yaml("{lib: di, meta: {version: 2, tags: [di-2, plain]}}")
    );
}

#[test]
fn test_whole_token_keeps_type() {
    let container = container();
    container.set_parameter("list", yaml("[a, b]"));
    container.set_parameter("alias", "%list%");
    container.set_parameter("embedded", "items: %list%");

    assert_eq!(container.get_parameter("alias").unwrap(), yaml("[a, b]"));
    // a list cannot be rendered into a longer string
    assert_eq!(container.get_parameter("embedded").unwrap(), Value::from("items: %list%"));
}

#[test]
fn test_self_reference_is_left_literal() {
    let container = container();
    container.set_parameter("a", "%b%");
    container.set_parameter("b", "%a%");
    container.set_parameter("c", "x%c%x");

    assert_eq!(container.get_parameter("a").unwrap(), Value::from("%a%"));
    assert_eq!(container.get_parameter("c").unwrap(), Value::from("x%c%x"));
}

#[test]
fn test_loading_parameters_from_yaml() {
    let container = container();
    container
        .load_from_str("parameters:\n    name: di\n    full_name: 'splot.%name%'\n")
        .unwrap();
    assert_eq!(container.get_parameter("full_name").unwrap(), Value::from("splot.di"));
}

#[test]
fn test_dump_parameters() {
    let container = coverall();
    let expected = yaml(
        r#"
debug: true
debug.relative: true
name: di
name.prefixed: lib.di
vendor: splot
full_name: splot.lib.di.lib
version: 2
authors: [Michał Dudek, John Doe, di Salvatore]
authors.compact: [Michał Dudek, John Doe, di Salvatore]
simple_service.class: Test\SimpleService
parametrized_service.class: Test\ParametrizedService
called_service.class: Test\CalledService
extended_service.class: Test\ExtendedService
collection_service.class: Test\CollectionService
simple_factory.class: Test\SimpleFactory
named_factory.class: Test\NamedFactory
named_factory.product.class: Test\NamedProduct
"#,
    );

    let dumped = container.dump_parameters();
    assert_eq!(Value::Mapping(dumped.clone()), expected);

    let order: Vec<_> = dumped.iter().filter_map(|(key, _)| key.as_str()).take(3).collect();
    assert_eq!(order, vec!["debug", "debug.relative", "name"]);
}

#[test]
fn test_dump_is_empty_without_parameters() {
    assert_eq!(container().dump_parameters(), Mapping::new());
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Database {
    host: String,
    port: u16,
}

#[test]
fn test_typed_parameters() {
    let container = container();
    container.set_parameter("db.host", "localhost");
    container
        .set_parameter_from(
            "db",
            &Database {
                host: "%db.host%".to_string(),
                port: 5432,
            },
        )
        .unwrap();

    let db: Database = container.get_parameter_as("db").unwrap();
    assert_eq!(
        db,
        Database {
            host: "localhost".to_string(),
            port: 5432
        }
    );

    let err = container.get_parameter_as::<Database>("db.host").unwrap_err();
    assert!(matches!(err, DiError::Yaml(_)));
}

#[test]
fn test_parameters_reach_constructor_arguments() {
    let container = container();
    container.set_parameter("name", "di");
    container.set_parameter("version", 2);
    container.set_parameter("debug", true);
    container.register("simple", SIMPLE).unwrap();
    container
        .register(
            "parametrized",
            splot_di::ServiceOptions::class(PARAMETRIZED).arguments([
                "@simple",
                "%name%.parametrized",
                "%version%",
                "%debug%",
                "@simple.undefined?",
            ]),
        )
        .unwrap();

    let service = container.get_as::<ParametrizedService>("parametrized").unwrap();
    assert_eq!(service.name, "di.parametrized");
    assert_eq!(service.version, 2);
    assert!(service.debug);
    assert!(service.not_existent.is_none());
}

#[test]
fn test_parameter_change_reaches_next_build() {
    let container = container();
    container.set_parameter("version", 1);
    container
        .register(
            "called",
            splot_di::ServiceOptions::class(CALLED)
                .arguments(["called", "%version%"])
                .singleton(false),
        )
        .unwrap();

    assert_eq!(container.get_as::<CalledService>("called").unwrap().version(), 1);
    container.set_parameter("version", 5);
    assert_eq!(container.get_as::<CalledService>("called").unwrap().version(), 5);
}

proptest! {
    #[test]
    fn prop_parameter_round_trips(name in "[a-z][a-z._]{0,12}", value in "[^%]{0,30}") {
        let container = container();
        container.set_parameter(&name, value.as_str());
        prop_assert!(container.has_parameter(&name));
        prop_assert_eq!(container.get_parameter(&name).unwrap(), Value::from(value.as_str()));
    }

    #[test]
    fn prop_interpolation_matches_concatenation(
        prefix in "[a-z ]{0,8}",
        value in "[a-z0-9]{1,8}",
        suffix in "[a-z ]{1,8}",
    ) {
        let container = container();
        container.set_parameter("inner", value.as_str());
        container.set_parameter("outer", format!("{}%inner%{}", prefix, suffix));
        prop_assert_eq!(
            container.get_parameter("outer").unwrap(),
            Value::from(format!("{}{}{}", prefix, value, suffix))
        );
    }
}
