//! Core error types for hopgate

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the core crate
#[derive(Error, Debug)]
pub enum HopError {
    /// Alias or group resolution failed
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// Input rejected before any process was started
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// External program failed
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Configuration store error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lookup and mutation errors on the topology
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// No group owns a node with this alias
    #[error("node with alias '{0}' not found")]
    NodeNotFound(String),

    /// No group with this name
    #[error("group '{0}' not found")]
    GroupNotFound(String),

    /// A group with this name already exists
    #[error("group '{0}' already exists")]
    DuplicateGroup(String),

    /// The alias is already taken inside the group
    #[error("alias '{alias}' already exists in group '{group}'")]
    DuplicateAlias { group: String, alias: String },
}

/// Caller-side validation failures, reported before anything runs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is empty
    #[error("{entity} is missing required field '{field}'")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },

    /// Transfer paths do not name exactly one remote side
    #[error("one path must be local and one must be remote (e.g. 'node-alias:/path')")]
    TransferPaths,
}

/// Failures of an invoked external program
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The program could not be started
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program exited unsuccessfully (code is `None` when killed by a signal)
    #[error("'{program}' exited with {}", code.map(|c| format!("status {c}")).unwrap_or_else(|| "a signal".to_string()))]
    Failed { program: String, code: Option<i32> },

    /// Waiting on the program failed
    #[error("failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    /// Exit code to surface from the CLI for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            ProcessError::Failed {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be written
    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
