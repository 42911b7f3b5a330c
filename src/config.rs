//! Configuration file loading.
//!
//! A configuration tree has two optional top-level sections:
//!
//! ```yaml
//! parameters:
//!     mailer.transport: smtp
//! services:
//!     mailer:
//!         class: App\Mailer
//!         arguments: ['%mailer.transport%']
//! ```
//!
//! Files are read here; the container consumes the resulting tree.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DiError, DiResult};
use crate::value::{Mapping, Value};

/// Supported on-disk formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    Yaml,
}

impl Format {
    /// Detects the format from the file extension (case-insensitive).
    pub(crate) fn from_path(path: &Path) -> DiResult<Self> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("yml") | Some("yaml") => Ok(Format::Yaml),
            Some(other) => Err(DiError::InvalidFile {
                path: path.display().to_string(),
                message: format!("unsupported file extension \"{}\"", other),
            }),
            None => Err(DiError::InvalidFile {
                path: path.display().to_string(),
                message: "file has no extension".to_string(),
            }),
        }
    }
}

/// Key under which a loaded path is remembered.
pub(crate) fn loaded_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Reads and parses `path` into a configuration tree.
pub(crate) fn read_tree(path: &Path) -> DiResult<Value> {
    if !path.is_file() {
        return Err(DiError::FileNotFound(path.to_path_buf()));
    }

    match Format::from_path(path)? {
        Format::Yaml => {
            let contents = fs::read_to_string(path)?;
            parse_yaml(&contents)
        }
    }
}

pub(crate) fn parse_yaml(contents: &str) -> DiResult<Value> {
    if contents.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_yaml::from_str(contents)?)
}

/// The two sections of a configuration tree.
#[derive(Debug, Default)]
pub(crate) struct Sections<'a> {
    pub(crate) parameters: Option<&'a Mapping>,
    pub(crate) services: Option<&'a Mapping>,
}

impl<'a> Sections<'a> {
    /// Splits `tree` into its sections. A null tree has none.
    pub(crate) fn of(origin: &str, tree: &'a Value) -> DiResult<Self> {
        let root = match tree {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(root) => root,
            Value::Tagged(tagged) => return Self::of(origin, &tagged.value),
            _ => {
                return Err(DiError::InvalidFile {
                    path: origin.to_string(),
                    message: "configuration root must be a mapping".to_string(),
                })
            }
        };

        Ok(Self {
            parameters: section(origin, root, "parameters")?,
            services: section(origin, root, "services")?,
        })
    }
}

fn section<'a>(origin: &str, root: &'a Mapping, key: &str) -> DiResult<Option<&'a Mapping>> {
    match root.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Mapping(section)) => Ok(Some(section)),
        Some(_) => Err(DiError::InvalidFile {
            path: origin.to_string(),
            message: format!("section \"{}\" must be a mapping", key),
        }),
    }
}
