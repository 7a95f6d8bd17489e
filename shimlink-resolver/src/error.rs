// Configuration and module loading errors

use shimlink_diagnostics::{error_codes, Diagnostic, Span};
use std::path::PathBuf;
use thiserror::Error;

use crate::target::BuildTarget;

/// Problems found while building the alias table.
///
/// `DuplicateAlias` is recoverable (last write wins); every other variant
/// stops configuration loading.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("`{module}` is aliased twice for target `{target}`: `{current}` replaces `{previous}`")]
    DuplicateAlias {
        module: String,
        target: BuildTarget,
        previous: String,
        current: String,
    },

    #[error("`{module}` has no entry for target(s) {}", join_targets(.missing))]
    IncompleteEntry {
        module: String,
        missing: Vec<BuildTarget>,
    },

    #[error("unknown build target `{0}`")]
    UnknownTarget(String),

    #[error("invalid alias entry for `{module}`: {reason}")]
    InvalidEntry { module: String, reason: String },

    #[error("alias entry with an empty module identifier")]
    EmptyModuleId,

    #[error("malformed configuration: {0}")]
    Malformed(String),
}

fn join_targets(targets: &[BuildTarget]) -> String {
    targets
        .iter()
        .map(|t| format!("`{}`", t))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ConfigurationError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ConfigurationError::DuplicateAlias { .. })
    }

    pub fn code(&self) -> &'static str {
        match self {
            ConfigurationError::DuplicateAlias { .. } => error_codes::DUPLICATE_ALIAS,
            ConfigurationError::IncompleteEntry { .. } => error_codes::INCOMPLETE_ALIAS,
            ConfigurationError::UnknownTarget(_) => error_codes::UNKNOWN_TARGET,
            ConfigurationError::InvalidEntry { .. } | ConfigurationError::EmptyModuleId => {
                error_codes::INVALID_ENTRY
            }
            ConfigurationError::Malformed(_) => error_codes::CONFIG_PARSE,
        }
    }

    /// Render as a diagnostic pointing at the configuration file
    pub fn to_diagnostic(&self, config_file: &str) -> Diagnostic {
        let span = Span::new(config_file.to_string(), 0, 0, 0);
        match self {
            ConfigurationError::DuplicateAlias { .. } => Diagnostic::warning(self.code(), self.to_string(), span)
                .with_help("remove one of the entries; the last one wins".to_string()),
            ConfigurationError::IncompleteEntry { .. } => Diagnostic::error(self.code(), self.to_string(), span)
                .with_help("add the missing targets or set `fillDefaults: true`".to_string()),
            _ => Diagnostic::error(self.code(), self.to_string(), span),
        }
    }
}

/// Every fatal problem found while loading a configuration
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid alias configuration: {}", join_errors(.errors))]
pub struct InvalidConfiguration {
    pub errors: Vec<ConfigurationError>,
}

fn join_errors(errors: &[ConfigurationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure to locate or read a module; aborts the check of that pair
#[derive(Error, Debug)]
pub enum ModuleLoadError {
    #[error("cannot resolve module `{specifier}` for target `{target}`")]
    NotFound {
        specifier: String,
        target: BuildTarget,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid package manifest {}: {message}", .path.display())]
    InvalidPackage { path: PathBuf, message: String },
}

impl ModuleLoadError {
    pub fn code(&self) -> &'static str {
        match self {
            ModuleLoadError::NotFound { .. } => error_codes::MODULE_NOT_FOUND,
            ModuleLoadError::Io { .. } => error_codes::MODULE_READ,
            ModuleLoadError::InvalidPackage { .. } => error_codes::INVALID_PACKAGE,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let span = match self {
            ModuleLoadError::NotFound { specifier, .. } => Span::new(specifier.clone(), 0, 0, 0),
            ModuleLoadError::Io { path, .. } | ModuleLoadError::InvalidPackage { path, .. } => {
                Span::from_path(path)
            }
        };
        Diagnostic::error(self.code(), self.to_string(), span)
    }
}
