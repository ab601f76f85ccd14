//! Error types for module discovery and lifecycle

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum ModuleError {
    #[error("module `{name}` is registered more than once")]
    #[diagnostic(
        code(modman::discovery::duplicate_module),
        help("Each module must have a unique name. Rename or unregister one of them.")
    )]
    DuplicateModule { name: String },

    #[error("invalid module name `{name}`")]
    #[diagnostic(
        code(modman::discovery::invalid_name),
        help("Module names must be non-empty and may contain letters, digits, '_', '-' and '.'")
    )]
    InvalidModuleName { name: String },

    #[error("malformed configuration for `{key}`: {reason}")]
    #[diagnostic(code(modman::discovery::malformed_config))]
    MalformedConfig { key: String, reason: String },

    #[error("dependency cycle between modules: {}", .cycle.join(" -> "))]
    #[diagnostic(
        code(modman::discovery::dependency_cycle),
        help("Remove one of the `requires` entries so the modules can be ordered")
    )]
    DependencyCycle { cycle: Vec<String> },

    #[error("module `{module}` failed to initialize")]
    #[diagnostic(code(modman::module::initialization))]
    Initialization {
        module: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("module `{module}` requires `{dependency}`, which is not active")]
    #[diagnostic(
        code(modman::module::missing_dependency),
        help("Enable `{dependency}` in the module settings")
    )]
    MissingDependency { module: String, dependency: String },

    #[error("module `{module}` failed to connect with other modules")]
    #[diagnostic(code(modman::module::connection))]
    Connection {
        module: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("no enabled module named `{name}`")]
    #[diagnostic(code(modman::manager::not_found))]
    NotFound { name: String },
}

impl ModuleError {
    /// Short machine-friendly label used when logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateModule { .. } => "duplicate_module",
            Self::InvalidModuleName { .. } => "invalid_name",
            Self::MalformedConfig { .. } => "malformed_config",
            Self::DependencyCycle { .. } => "dependency_cycle",
            Self::Initialization { .. } => "initialization",
            Self::MissingDependency { .. } => "missing_dependency",
            Self::Connection { .. } => "connection",
            Self::NotFound { .. } => "not_found",
        }
    }

    /// Render the error together with its whole cause chain on one line
    pub fn describe(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}
