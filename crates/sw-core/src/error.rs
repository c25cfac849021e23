//! Error types for sw-core

use thiserror::Error;

/// Core error type for Shardway
///
/// Every variant is global: a `CoreError` stops a run before any shard is
/// touched.
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E004: A migrations folder was not supplied
    #[error("[E004] {which} must be provided")]
    PathNotProvided { which: &'static str },

    /// E005: A migrations folder does not exist
    #[error("[E005] Path '{path}' must exist")]
    PathNotFound { path: String },

    /// E006: A migrations folder is not a directory
    #[error("[E006] Path '{path}' is not a directory")]
    NotADirectory { path: String },

    /// E007: A file in a migrations folder does not follow the naming convention
    #[error("[E007] Malformed migration name '{name}': {reason}")]
    MalformedMigrationName { name: String, reason: String },

    /// E008: Two migrations in the same scope share a version
    #[error("[E008] Duplicate {scope} migration version V{version}: '{first}' and '{second}'")]
    DuplicateVersion {
        scope: String,
        version: String,
        first: String,
        second: String,
    },

    /// E009: A version string could not be parsed
    #[error("[E009] Invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    /// E010: IO error with file path context
    #[error("[E010] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },
}

impl CoreError {
    /// Returns `true` for errors caused by bad or missing configuration,
    /// including the migrations folder checks.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            CoreError::ConfigNotFound { .. }
                | CoreError::ConfigParseError { .. }
                | CoreError::ConfigInvalid { .. }
                | CoreError::PathNotProvided { .. }
                | CoreError::PathNotFound { .. }
                | CoreError::NotADirectory { .. }
        )
    }

    /// Returns `true` for errors raised while loading the migration catalog.
    pub fn is_catalog_error(&self) -> bool {
        matches!(
            self,
            CoreError::MalformedMigrationName { .. } | CoreError::DuplicateVersion { .. }
        )
    }
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
