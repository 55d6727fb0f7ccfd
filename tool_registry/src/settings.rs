//! Write-capability context shared with tool handlers.
//!
//! The gate starts unset. A resolution pass publishes the resolved value once;
//! handlers only read it. Reads before the first publish fall back to the
//! `OPENSEARCH_SETTINGS_ALLOW_WRITE` environment default.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::{
    capability::HttpMethod,
    config::{parse_allow_write, EnvFilterConfig, ToolConfigFile, ENV_ALLOW_WRITE},
    descriptor::ToolDescriptor,
    error::{RegistryError, RegistryResult},
    version::{ensure_compatible, Version},
};

#[derive(Debug, Default)]
pub struct WriteGate {
    resolved: RwLock<Option<bool>>,
}

impl WriteGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate that is already resolved, mostly for tests and embedders.
    pub fn resolved(allow_write: bool) -> Self {
        Self {
            resolved: RwLock::new(Some(allow_write)),
        }
    }

    pub fn set(&self, allow_write: bool) {
        *self.resolved.write() = Some(allow_write);
        debug!("Set allow_write setting to: {}", allow_write);
    }

    /// The published value, if a resolution pass has run.
    pub fn get(&self) -> Option<bool> {
        *self.resolved.read()
    }

    pub fn is_resolved(&self) -> bool {
        self.get().is_some()
    }

    pub fn allow_write(&self) -> bool {
        self.get().unwrap_or_else(|| {
            parse_allow_write(std::env::var(ENV_ALLOW_WRITE).ok().as_deref())
        })
    }
}

/// Resolve the write setting for a pass: the config file's
/// `tool_filters.settings.allow_write` wins over the environment default.
pub fn resolve_allow_write(config: Option<&ToolConfigFile>, env: &EnvFilterConfig) -> bool {
    match config.and_then(ToolConfigFile::allow_write) {
        Some(allow_write) => {
            debug!("Using allow_write setting from config file");
            allow_write
        }
        None => env.allow_write(),
    }
}

/// Per-invocation context handed to tool handlers.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    write_gate: Arc<WriteGate>,
    version: Option<Version>,
}

impl ToolContext {
    pub fn new(write_gate: Arc<WriteGate>) -> Self {
        Self {
            write_gate,
            version: None,
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: Option<Version>) -> Self {
        self.version = version;
        self
    }

    pub fn write_gate(&self) -> &Arc<WriteGate> {
        &self.write_gate
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    pub fn allow_write(&self) -> bool {
        self.write_gate.allow_write()
    }

    /// Reject mutating methods while writes are disabled.
    pub fn ensure_write_allowed(&self, method: HttpMethod) -> RegistryResult<()> {
        if method.is_write() && !self.allow_write() {
            return Err(RegistryError::WriteDisabled {
                method: method.to_string(),
            });
        }
        Ok(())
    }

    /// Reject a tool the connected cluster does not support.
    pub fn ensure_compatible(&self, tool: &ToolDescriptor) -> RegistryResult<()> {
        ensure_compatible(self.version.as_ref(), tool)
    }
}
