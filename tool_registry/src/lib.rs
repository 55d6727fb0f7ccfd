//! OpenSearch tool registry resolution.
//!
//! Turns the static tool catalogue plus layered configuration (a structured
//! config file, flat `tool.<Id>.<field>` overrides, `OPENSEARCH_*` environment
//! filters) into the tool set exposed to a calling agent.
//!
//! ## Modules
//!
//! - [`resolver`]: the resolution pass and last-good snapshot handle
//! - [`overrides`], [`aliases`], [`validation`]: metadata customization
//! - [`filter`]: enable/disable rules and the write gate
//! - [`version`]: cluster version compatibility
//! - [`config`], [`settings`]: configuration surface and handler context
//!
//! ## Shared Types
//!
//! - [`ToolDescriptor`]: one tool's metadata
//! - [`ToolRegistry`]: descriptors keyed by canonical identifier

// Shared types (used across modules)
pub mod capability;
pub mod descriptor;
pub mod error;
pub mod registry;
pub mod schema;

// Pipeline stages
pub mod aliases;
pub mod catalog;
pub mod config;
pub mod filter;
pub mod overrides;
pub mod resolver;
pub mod settings;
pub mod validation;
pub mod version;

pub use capability::{HttpMethod, MethodSet};
pub use catalog::{default_catalog, BASE_TOOL_FIELDS, CORE_TOOLS};
pub use config::{
    ConfigLoader, EnvFilterConfig, FileConfigLoader, StaticConfigLoader, ToolConfigFile,
};
pub use descriptor::{HandlerRef, ToolDescriptor};
pub use error::{RegistryError, RegistryResult};
pub use filter::{apply_filters, FilterCriteria};
pub use overrides::{OverrideSet, OverrideSource, ToolOverride};
pub use registry::ToolRegistry;
pub use resolver::{
    ExposedRegistry, FixedVersion, RegistryResolver, ResolveRequest, ServerMode, ToolsetHandle,
    VersionSource,
};
pub use schema::{FieldSchema, InputSchema};
pub use settings::{ToolContext, WriteGate};
pub use validation::{validate_overrides, DISPLAY_NAME_PATTERN};
pub use version::{ensure_compatible, is_compatible, Version};
