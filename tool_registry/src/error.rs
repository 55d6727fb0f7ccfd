//! Tool registry error types.
//!
//! Configuration errors abort a resolution pass before anything is exposed.
//! `WriteDisabled` and `IncompatibleTool` are runtime policy rejections raised
//! when a tool is invoked, never by the resolver itself.

use thiserror::Error;

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Tool '{0}' is not a valid tool name.")]
    UnknownTool(String),

    #[error("Duplicate {field} field for tool '{tool}' in {source_name}. Found multiple aliases: {keys:?}")]
    DuplicateField {
        tool: String,
        field: String,
        source_name: &'static str,
        keys: Vec<String>,
    },

    #[error("Display name '{name}' for tool '{tool}' does not follow the required pattern '{pattern}'.")]
    InvalidDisplayName {
        tool: String,
        name: String,
        pattern: &'static str,
    },

    #[error("Display name '{0}' conflicts with another tool.")]
    DisplayNameConflict(String),

    #[error("Argument '{argument}' does not exist on tool '{tool}'.")]
    InvalidArgument { tool: String, argument: String },

    #[error("Description for argument '{argument}' on tool '{tool}' must be a string.")]
    InvalidArgumentType { tool: String, argument: String },

    #[error("Field '{field}' for tool '{tool}' must be a string.")]
    InvalidFieldType { tool: String, field: String },

    #[error("Invalid {bound} version '{value}': {reason}")]
    InvalidVersion {
        bound: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid regular expression '{pattern}' in {source_name}: {reason}")]
    InvalidRegex {
        pattern: String,
        source_name: &'static str,
        reason: String,
    },

    #[error("Invalid tool name '{name}' in {source_name}: no tool with that display name")]
    UnknownFilterTool {
        name: String,
        source_name: &'static str,
    },

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Write operations are disabled. Method \"{method}\" is not allowed. Enable write operations by setting OPENSEARCH_SETTINGS_ALLOW_WRITE=true or configuring allow_write: true in your config file.")]
    WriteDisabled { method: String },

    #[error("{0}")]
    IncompatibleTool(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RegistryError {
    /// Whether this error came from configuration (as opposed to a runtime
    /// policy rejection or an I/O failure).
    pub fn is_config_error(&self) -> bool {
        !matches!(
            self,
            RegistryError::WriteDisabled { .. }
                | RegistryError::IncompatibleTool(_)
                | RegistryError::Io(_)
                | RegistryError::Yaml(_)
                | RegistryError::Json(_)
        )
    }
}
