//! Error types for ec2-ssh-stack.
//!
//! Everything that can stop a declaration pass or a synthesis lands here.
//! The two precondition failures ([`Error::MissingParameter`] and
//! [`Error::FileRead`]) are raised before any resource is declared.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for stack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for ec2-ssh-stack.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Precondition Errors
    // ========================================================================
    /// A required context parameter is absent or empty.
    #[error("{hint}")]
    MissingParameter {
        /// Context key that was looked up
        name: String,
        /// Message telling the user how to supply it
        hint: String,
    },

    /// The bootstrap script could not be read.
    #[error("Failed to read bootstrap script '{path}': {source}")]
    FileRead {
        /// Path that was read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The SSH source address is not an IPv4 CIDR block (strict mode only).
    #[error("Invalid source address '{value}': {message}")]
    InvalidSourceAddress {
        /// Raw value from the context
        value: String,
        /// What is wrong with it
        message: String,
    },

    // ========================================================================
    // Graph Errors
    // ========================================================================
    /// Two declarations produced the same logical id.
    #[error("Resource '{0}' is already declared in this stack")]
    DuplicateResource(String),

    /// Two outputs share a name.
    #[error("Output '{0}' is already declared in this stack")]
    DuplicateOutput(String),

    /// A dependency edge names a resource that was never declared.
    #[error("Resource '{0}' is not declared in this stack")]
    UnknownResource(String),

    /// The dependency edges form a cycle.
    #[error("Dependency cycle between resources: {0}")]
    DependencyCycle(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// A context lookup could not be resolved by its provider.
    #[error("Context lookup '{key}' failed: {message}")]
    ContextLookup {
        /// Context key being resolved
        key: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // IO / Serialization Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Error {
    /// Creates a missing parameter error with the standard hint for `name`.
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        let name = name.into();
        let hint = format!(
            "IP address must be provided via context. Use: ec2-ssh-stack synth -c {}=your.ip.address/32",
            name
        );
        Self::MissingParameter { name, hint }
    }

    /// Creates a bootstrap script read error.
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid source address error.
    pub fn invalid_source(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSourceAddress {
            value: value.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid config error.
    pub fn invalid_config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Returns true if the error was raised before anything was declared.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::MissingParameter { .. }
                | Error::FileRead { .. }
                | Error::InvalidSourceAddress { .. }
        )
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::MissingParameter { .. } => 2,
            Error::FileRead { .. } => 3,
            Error::InvalidSourceAddress { .. } => 4,
            _ => 1,
        }
    }
}
