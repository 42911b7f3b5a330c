//! # splot-di
//!
//! Named-service dependency injection container with parameters, inheritance
//! and deferred notifications.
//!
//! ## Features
//!
//! - **Named services**: definitions built from class identifiers, ready objects, closures or factories
//! - **Parameters**: `%name%` placeholders interpolated recursively through argument trees
//! - **Service links**: `@name` and optional `@name?` references resolved on demand
//! - **Inheritance**: `extends` merges class, arguments and method calls from a parent definition
//! - **Notify**: method calls declared against services that may not be registered yet
//! - **Circular dependency detection**: cycles are reported with every service involved
//! - **YAML configuration**: `parameters` and `services` sections loaded from files or strings
//!
//! ## Quick Start
//!
//! ```rust
//! use splot_di::{Arguments, ClassRegistry, Container, ServiceOptions};
//! use parking_lot::Mutex;
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! #[derive(Default)]
//! struct UserService {
//!     db: Mutex<Option<Arc<Database>>>,
//! }
//!
//! // Tell the container how to build each class
//! let mut classes = ClassRegistry::new();
//! classes
//!     .class::<Database>("App\\Database")
//!     .constructor(|args: &Arguments| Ok(Database { url: args.string(0)? }));
//! classes
//!     .class::<UserService>("App\\UserService")
//!     .default_constructor()
//!     .method("setDatabase", |service: &UserService, args: &Arguments| {
//!         *service.db.lock() = Some(args.service(0)?);
//!         Ok(())
//!     });
//!
//! // Declare services
//! let container = Container::with_classes(classes);
//! container.set_parameter("db.url", "postgres://localhost");
//! container
//!     .register("db", ServiceOptions::class("App\\Database").argument("%db.url%"))
//!     .unwrap();
//! container
//!     .register(
//!         "users",
//!         ServiceOptions::class("App\\UserService").call("setDatabase", ["@db"]),
//!     )
//!     .unwrap();
//!
//! // Resolve
//! let users = container.get_as::<UserService>("users").unwrap();
//! let db = users.db.lock().clone().unwrap();
//! assert_eq!(db.url, "postgres://localhost");
//! ```
//!
//! ## Configuration Files
//!
//! ```rust
//! use splot_di::{ClassRegistry, Container};
//!
//! #[derive(Default)]
//! struct Mailer;
//!
//! let mut classes = ClassRegistry::new();
//! classes.class::<Mailer>("App\\Mailer").default_constructor();
//!
//! let container = Container::with_classes(classes);
//! container
//!     .load_from_str(
//!         r#"
//! parameters:
//!     mailer.class: App\Mailer
//! services:
//!     mailer:
//!         class: '%mailer.class%'
//!         aliases: [mail]
//! "#,
//!     )
//!     .unwrap();
//!
//! let mailer = container.get("mailer").unwrap();
//! assert!(std::sync::Arc::ptr_eq(&mailer, &container.get("mail").unwrap()));
//! ```
//!
//! ## Lifetimes
//!
//! - **Singleton** (default): built once, cached on the definition and shared by every alias
//! - **Non-singleton** (`singleton(false)`): built fresh on every `get`
//!
//! ## Thread Safety
//!
//! [`Container`] is `Send + Sync`. Registration and resolution take `&self`;
//! a single resolution runs depth-first on the calling thread, so overlapping
//! resolutions from several threads must be serialized by the caller.

pub mod class;
mod config;
pub mod container;
pub mod definition;
pub mod error;
pub mod options;
pub mod resolver;
pub mod value;

mod internal;
mod parameters;
mod registration;

pub use class::{ClassBuilder, ClassRegistry};
pub use container::{Container, CONTAINER_NAMES};
pub use definition::{Definition, Kind, MethodCall, ObjectRef, ServiceClosure};
pub use error::{BoxError, DiError, DiResult};
pub use options::{Notify, ServiceOptions};
pub use resolver::ServiceLink;
pub use value::{Argument, Arguments, Instance, Mapping, Value};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Engine {
        cylinders: i64,
    }

    fn classes() -> ClassRegistry {
        let mut classes = ClassRegistry::new();
        classes
            .class::<Engine>("Engine")
            .constructor(|args: &Arguments| Ok(Engine { cylinders: args.i64(0)? }));
        classes
    }

    #[test]
    fn test_singleton_and_transient() {
        let container = Container::with_classes(classes());
        container
            .register("shared", ServiceOptions::class("Engine").argument(4))
            .unwrap();
        container
            .register("fresh", ServiceOptions::class("Engine").argument(6).singleton(false))
            .unwrap();

        let a = container.get("shared").unwrap();
        let b = container.get("shared").unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let c = container.get("fresh").unwrap();
        let d = container.get("fresh").unwrap();
        assert!(!Arc::ptr_eq(&c, &d));
        assert_eq!(c.downcast_ref::<Engine>().unwrap().cylinders, 6);
    }

    #[test]
    fn test_container_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Container>();
        assert_send_sync::<Definition>();
        assert_send_sync::<DiError>();
    }

    #[test]
    fn test_get_as_wrong_type() {
        let container = Container::with_classes(classes());
        container
            .register("engine", ServiceOptions::class("Engine").argument(2))
            .unwrap();

        let err = container.get_as::<String>("engine").unwrap_err();
        assert!(matches!(err, DiError::InvalidService { .. }));
    }
}
