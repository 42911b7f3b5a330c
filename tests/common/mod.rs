//! Shared fixture types and the class registry that knows how to build them.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use splot_di::{Argument, Arguments, BoxError, ClassRegistry, Container, Instance};
use tracing_subscriber::EnvFilter;

pub const SIMPLE: &str = "Test\\SimpleService";
pub const PARAMETRIZED: &str = "Test\\ParametrizedService";
pub const CALLED: &str = "Test\\CalledService";
pub const EXTENDED: &str = "Test\\ExtendedService";
pub const COLLECTION: &str = "Test\\CollectionService";
pub const SIMPLE_FACTORY: &str = "Test\\SimpleFactory";
pub const NAMED_FACTORY: &str = "Test\\NamedFactory";
pub const NAMED_PRODUCT: &str = "Test\\NamedProduct";
pub const NODE: &str = "Test\\Node";
pub const FAILING: &str = "Test\\Failing";
pub const INTERFACE: &str = "Test\\Interface";

#[derive(Debug, Default)]
pub struct SimpleService;

#[derive(Debug)]
pub struct ParametrizedService {
    pub simple: Arc<SimpleService>,
    pub name: String,
    pub version: i64,
    pub debug: bool,
    pub not_existent: Option<Arc<SimpleService>>,
}

#[derive(Debug, Default)]
pub struct CalledService {
    name: Mutex<String>,
    version: Mutex<i64>,
    simple: Mutex<Option<Arc<SimpleService>>>,
    optionally_simple: Mutex<Option<Arc<SimpleService>>>,
}

impl CalledService {
    pub fn new(name: String, version: i64) -> Self {
        Self {
            name: Mutex::new(name),
            version: Mutex::new(version),
            ..Self::default()
        }
    }

    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    pub fn version(&self) -> i64 {
        *self.version.lock()
    }

    pub fn set_version_directly(&self, version: i64) {
        *self.version.lock() = version;
    }

    pub fn simple(&self) -> Option<Arc<SimpleService>> {
        self.simple.lock().clone()
    }

    pub fn optionally_simple(&self) -> Option<Arc<SimpleService>> {
        self.optionally_simple.lock().clone()
    }

    fn set_name(&self, args: &Arguments) -> Result<(), BoxError> {
        *self.name.lock() = args.string(0)?;
        Ok(())
    }

    fn set_version(&self, args: &Arguments) -> Result<(), BoxError> {
        *self.version.lock() = args.i64(0)?;
        Ok(())
    }

    fn set_simple(&self, args: &Arguments) -> Result<(), BoxError> {
        *self.simple.lock() = Some(args.service(0)?);
        if let Some(optionally_simple) = args.optional_service(1)? {
            *self.optionally_simple.lock() = Some(optionally_simple);
        }
        Ok(())
    }

    fn set_optionally_simple(&self, args: &Arguments) -> Result<(), BoxError> {
        *self.optionally_simple.lock() = args.optional_service(0)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct ExtendedService {
    pub base: CalledService,
    subname: Mutex<String>,
    extended: Mutex<bool>,
}

impl ExtendedService {
    pub fn subname(&self) -> String {
        self.subname.lock().clone()
    }

    pub fn is_extended(&self) -> bool {
        *self.extended.lock()
    }
}

/// Collects services handed to it through `addService(name, service)`.
#[derive(Default)]
pub struct CollectionService {
    services: Mutex<Vec<(String, Instance)>>,
}

impl CollectionService {
    pub fn names(&self) -> Vec<String> {
        self.services.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn service(&self, name: &str) -> Option<Instance> {
        self.services
            .lock()
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, service)| service.clone())
    }
}

#[derive(Debug, Default)]
pub struct SimpleFactory;

#[derive(Debug, Default)]
pub struct NamedFactory;

#[derive(Debug)]
pub struct NamedProduct {
    pub name: String,
}

/// Graph node for cycle tests: an optional peer from the constructor, another from `setPeer`.
#[derive(Default)]
pub struct Node {
    pub constructed_with: Option<Instance>,
    pub peer: Mutex<Option<Instance>>,
}

#[derive(Debug)]
pub struct FixtureError(pub &'static str);

impl std::fmt::Display for FixtureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for FixtureError {}

pub fn classes() -> ClassRegistry {
    let mut classes = ClassRegistry::new();

    classes.class::<SimpleService>(SIMPLE).default_constructor();

    classes.class::<ParametrizedService>(PARAMETRIZED).constructor(|args: &Arguments| {
        Ok(ParametrizedService {
            simple: args.service(0)?,
            name: args.string(1)?,
            version: args.i64(2)?,
            debug: args.bool(3)?,
            not_existent: args.optional_service(4)?,
        })
    });

    classes
        .class::<CalledService>(CALLED)
        .constructor(|args: &Arguments| Ok(CalledService::new(args.string(0)?, args.i64(1)?)))
        .method("setName", CalledService::set_name)
        .method("setVersion", CalledService::set_version)
        .method("setSimple", CalledService::set_simple)
        .method("setOptionallySimple", CalledService::set_optionally_simple);

    classes
        .class::<ExtendedService>(EXTENDED)
        .constructor(|args: &Arguments| {
            Ok(ExtendedService {
                base: CalledService::new(args.string(0)?, args.i64(1)?),
                subname: Mutex::new(String::new()),
                extended: Mutex::new(false),
            })
        })
        .method("setName", |this: &ExtendedService, args: &Arguments| this.base.set_name(args))
        .method("setVersion", |this: &ExtendedService, args: &Arguments| this.base.set_version(args))
        .method("setSimple", |this: &ExtendedService, args: &Arguments| this.base.set_simple(args))
        .method("setOptionallySimple", |this: &ExtendedService, args: &Arguments| {
            this.base.set_optionally_simple(args)
        })
        .method("setSubname", |this: &ExtendedService, args: &Arguments| {
            *this.subname.lock() = args.string(0)?;
            Ok(())
        })
        .method("setExtended", |this: &ExtendedService, args: &Arguments| {
            *this.extended.lock() = args.bool(0)?;
            Ok(())
        });

    classes
        .class::<CollectionService>(COLLECTION)
        .default_constructor()
        .method("addService", |this: &CollectionService, args: &Arguments| {
            let service = args
                .get(1)
                .and_then(Argument::as_instance)
                .cloned()
                .ok_or(FixtureError("addService expects a service"))?;
            this.services.lock().push((args.string(0)?, service));
            Ok(())
        })
        .method("addEntry", |this: &CollectionService, args: &Arguments| {
            let entry = args.map(0)?;
            let field = |key: &str| entry.iter().find(|(name, _)| name == key).map(|(_, value)| value);
            let name = field("name")
                .and_then(Argument::as_str)
                .ok_or(FixtureError("addEntry expects a name"))?;
            let service = field("service")
                .and_then(Argument::as_instance)
                .cloned()
                .ok_or(FixtureError("addEntry expects a service"))?;
            this.services.lock().push((name.to_string(), service));
            Ok(())
        });

    classes
        .class::<SimpleFactory>(SIMPLE_FACTORY)
        .default_constructor()
        .factory_method("get", |_: &SimpleFactory, _: &Arguments| Ok(SimpleService));

    classes
        .class::<NamedFactory>(NAMED_FACTORY)
        .default_constructor()
        .factory_method("provide", |_: &NamedFactory, args: &Arguments| {
            Ok(NamedProduct { name: args.string(0)? })
        });

    classes.class::<NamedProduct>(NAMED_PRODUCT);

    classes
        .class::<Node>(NODE)
        .constructor(|args: &Arguments| {
            Ok(Node {
                constructed_with: args.get(0).and_then(Argument::as_instance).cloned(),
                peer: Mutex::new(None),
            })
        })
        .method("setPeer", |this: &Node, args: &Arguments| {
            *this.peer.lock() = args.get(0).and_then(Argument::as_instance).cloned();
            Ok(())
        })
        .method("explode", |_: &Node, _: &Arguments| Err(Box::new(FixtureError("explode")) as BoxError));

    classes
        .class::<FixtureError>(FAILING)
        .constructor(|_: &Arguments| Err(Box::new(FixtureError("constructor failed")) as BoxError));

    // known to the locator but without a constructor
    classes.class::<SimpleService>(INTERFACE);

    classes
}

/// Installs a `RUST_LOG`-filtered subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("splot_di=warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn container() -> Arc<Container> {
    init_tracing();
    Container::with_classes(classes())
}

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Container with `coverall.yml` loaded.
pub fn coverall() -> Arc<Container> {
    let container = container();
    container
        .load_from_file(fixture("coverall.yml"))
        .expect("coverall fixture should load");
    container
}

pub fn same(a: &Instance, b: &Instance) -> bool {
    Arc::ptr_eq(a, b)
}
