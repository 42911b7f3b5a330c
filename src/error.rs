//! Error types for the service container.

use std::path::PathBuf;

/// Boxed error returned by user-supplied constructors and methods.
///
/// Any error type converts into it with `?`, including [`DiError`] itself,
/// which lets argument accessors be used directly inside constructors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependency injection errors
///
/// Represents the error conditions that can occur while registering
/// definitions, reading parameters, loading configuration files or resolving
/// services.
///
/// Circular references are never re-wrapped: whatever depth the cycle was
/// detected at, the caller of the outermost `get` receives the
/// [`DiError::CircularReference`] carrying the full chain. Every other failure
/// that happens while building a service's arguments or running its method
/// calls is wrapped in [`DiError::InvalidService`] naming the enclosing
/// service, with the original error kept as `source`.
///
/// # Examples
///
/// ```rust
/// use splot_di::{Container, DiError};
///
/// let container = Container::new();
/// match container.get("mailer") {
///     Err(DiError::ServiceNotFound(name)) => assert_eq!(name, "mailer"),
///     _ => unreachable!(),
/// }
///
/// let cycle = DiError::CircularReference {
///     chain: vec!["a".to_string(), "b".to_string()],
///     service: "a".to_string(),
/// };
/// assert!(cycle.is_circular());
/// assert_eq!(
///     cycle.to_string(),
///     "Circular reference detected during loading of chained services a, b. Referenced service: \"a\""
/// );
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DiError {
    /// Requested a name that has no definition
    #[error("Requested undefined service \"{0}\"")]
    ServiceNotFound(String),

    /// Requested a private service from outside of a resolution
    #[error("Requested private service \"{0}\"")]
    PrivateService(String),

    /// A service was requested while it was already being loaded
    #[error(
        "Circular reference detected during loading of chained services {}. Referenced service: \"{service}\"",
        chain.join(", ")
    )]
    CircularReference {
        /// Every service that was mid-resolution when the cycle was detected, in loading order
        chain: Vec<String>,
        /// The service whose request closed the cycle
        service: String,
    },

    /// Abstract definitions can only be extended
    #[error("Could not instantiate abstract service \"{0}\"")]
    AbstractService(String),

    /// Tried to overwrite a read-only definition
    #[error("Could not overwrite a read only service \"{0}\"")]
    ReadOnly(String),

    /// Malformed definition or a failure while building the service
    #[error("Invalid service \"{service}\": {message}")]
    InvalidService {
        /// Name of the service the failure is attributed to
        service: String,
        /// What went wrong
        message: String,
        /// Proximate failure, if any
        #[source]
        source: Option<BoxError>,
    },

    /// Direct lookup of an undefined parameter
    #[error("Requested undefined parameter \"{0}\"")]
    ParameterNotFound(String),

    /// A resolved argument did not have the shape a constructor or method asked for
    #[error("Argument #{index} is not {expected}")]
    Argument {
        /// Zero-based argument position
        index: usize,
        /// Human readable description of the expected shape
        expected: &'static str,
    },

    /// Configuration file does not exist
    #[error("Could not find file \"{}\" to load into the container", .0.display())]
    FileNotFound(PathBuf),

    /// Configuration file or tree has an unsupported format or shape
    #[error("Could not load \"{path}\" into the container: {message}")]
    InvalidFile {
        /// Origin of the tree (file path or a descriptive label)
        path: String,
        /// What went wrong
        message: String,
    },

    /// Reading a configuration file failed
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Parsing or converting YAML failed
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl DiError {
    /// Creates an [`DiError::InvalidService`] without an underlying cause.
    pub fn invalid_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        DiError::InvalidService {
            service: service.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Returns true for [`DiError::CircularReference`].
    pub fn is_circular(&self) -> bool {
        matches!(self, DiError::CircularReference { .. })
    }

    /// Walks `InvalidService` wrappers down to the innermost container error.
    ///
    /// Stops at the first wrapper whose cause is not a [`DiError`].
    pub fn root_cause(&self) -> &DiError {
        let mut current = self;
        while let DiError::InvalidService { source: Some(source), .. } = current {
            match source.downcast_ref::<DiError>() {
                Some(inner) => current = inner,
                None => break,
            }
        }
        current
    }

    /// Wraps `err` as the cause of an `InvalidService` for `service`.
    ///
    /// Circular references pass through untouched.
    pub(crate) fn wrap(service: &str, message: impl Into<String>, err: DiError) -> DiError {
        if err.is_circular() {
            return err;
        }
        DiError::InvalidService {
            service: service.to_string(),
            message: message.into(),
            source: Some(Box::new(err)),
        }
    }

    /// Same as [`DiError::wrap`] for errors coming back from user code.
    pub(crate) fn wrap_boxed(service: &str, message: impl Into<String>, err: BoxError) -> DiError {
        match err.downcast::<DiError>() {
            Ok(inner) => DiError::wrap(service, message, *inner),
            Err(other) => DiError::InvalidService {
                service: service.to_string(),
                message: message.into(),
                source: Some(other),
            },
        }
    }
}

/// Result type for DI operations
///
/// A convenience type alias for `Result<T, DiError>` used throughout splot-di.
///
/// # Examples
///
/// ```rust
/// use splot_di::{DiError, DiResult};
///
/// fn lookup(found: bool) -> DiResult<&'static str> {
///     if found {
///         Ok("mailer")
///     } else {
///         Err(DiError::ServiceNotFound("mailer".to_string()))
///     }
/// }
///
/// assert!(lookup(true).is_ok());
/// assert!(lookup(false).is_err());
/// ```
pub type DiResult<T> = Result<T, DiError>;
