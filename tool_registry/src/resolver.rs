//! Registry resolution: overrides, validation, filtering and compatibility
//! gating composed into one pass.
//!
//! A pass works on a private copy of the caller's registry. The write gate
//! and the [`ToolsetHandle`] snapshot are only updated once the whole pass
//! has succeeded, so a failed pass leaves the previous state in place.

use std::{
    collections::{btree_map, BTreeMap, HashSet},
    fmt,
    path::PathBuf,
    str::FromStr,
    sync::Arc,
};

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    catalog::BASE_TOOL_FIELDS,
    config::{ConfigLoader, EnvFilterConfig, FileConfigLoader, ToolConfigFile},
    descriptor::ToolDescriptor,
    error::{RegistryError, RegistryResult},
    filter::{apply_filters, FilterCriteria},
    overrides::OverrideSet,
    registry::ToolRegistry,
    settings::{resolve_allow_write, ToolContext, WriteGate},
    validation::{is_valid_display_name, validate_overrides, DISPLAY_NAME_PATTERN},
    version::{is_tool_compatible, validate_bounds, Version},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    /// One cluster: the full pipeline runs.
    #[default]
    Single,
    /// Several clusters of differing capability: everything is exposed as-is.
    Multi,
}

impl ServerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerMode::Single => "single",
            ServerMode::Multi => "multi",
        }
    }
}

impl fmt::Display for ServerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerMode {
    type Err = RegistryError;

    fn from_str(s: &str) -> RegistryResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(ServerMode::Single),
            "multi" => Ok(ServerMode::Multi),
            other => Err(RegistryError::ConfigInvalid(format!(
                "Unknown server mode '{}', expected 'single' or 'multi'",
                other
            ))),
        }
    }
}

/// Provides the version of the connected cluster. `None` means the version
/// cannot be discovered (e.g. a serverless deployment).
pub trait VersionSource: Send + Sync {
    fn reference_version(&self) -> Option<Version>;
}

/// A version known up front.
#[derive(Debug, Clone, Default)]
pub struct FixedVersion(pub Option<Version>);

impl VersionSource for FixedVersion {
    fn reference_version(&self) -> Option<Version> {
        self.0.clone()
    }
}

/// Inputs of one resolution pass.
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    pub config_path: Option<PathBuf>,
    /// Flat `tool.<Id>.<field>` overrides.
    pub flat_overrides: BTreeMap<String, String>,
    pub mode: ServerMode,
}

impl ResolveRequest {
    pub fn new(mode: ServerMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.flat_overrides.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: BTreeMap<String, String>) -> Self {
        self.flat_overrides.extend(overrides);
        self
    }
}

/// The tool set presented to the calling agent.
///
/// In single mode tools are keyed by display name and base connection fields
/// are stripped from their schemas. In multi mode they are keyed by
/// identifier and left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExposedRegistry {
    pub mode: ServerMode,
    pub allow_write: bool,
    tools: BTreeMap<String, ToolDescriptor>,
}

impl ExposedRegistry {
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ToolDescriptor> {
        self.tools.iter()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&ToolDescriptor> {
        self.tools.values().find(|tool| tool.id == id)
    }

    /// Back to an identifier-keyed registry.
    pub fn to_registry(&self) -> ToolRegistry {
        self.tools.values().cloned().collect()
    }
}

/// Runs resolution passes and publishes the write gate.
pub struct RegistryResolver {
    loader: Arc<dyn ConfigLoader>,
    versions: Arc<dyn VersionSource>,
    env: EnvFilterConfig,
    write_gate: Arc<WriteGate>,
}

impl fmt::Debug for RegistryResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryResolver")
            .field("env", &self.env)
            .field("write_gate", &self.write_gate)
            .finish_non_exhaustive()
    }
}

impl Default for RegistryResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryResolver {
    /// Resolver reading config files from disk, with no discoverable version
    /// and no environment filters.
    pub fn new() -> Self {
        Self {
            loader: Arc::new(FileConfigLoader),
            versions: Arc::new(FixedVersion::default()),
            env: EnvFilterConfig::default(),
            write_gate: Arc::new(WriteGate::new()),
        }
    }

    /// Resolver picking up `OPENSEARCH_*` filter variables.
    pub fn from_env() -> Self {
        Self::new().with_env(EnvFilterConfig::from_env())
    }

    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn ConfigLoader>) -> Self {
        self.loader = loader;
        self
    }

    #[must_use]
    pub fn with_version_source(mut self, versions: Arc<dyn VersionSource>) -> Self {
        self.versions = versions;
        self
    }

    #[must_use]
    pub fn with_version(self, version: Option<Version>) -> Self {
        self.with_version_source(Arc::new(FixedVersion(version)))
    }

    #[must_use]
    pub fn with_env(mut self, env: EnvFilterConfig) -> Self {
        self.env = env;
        self
    }

    #[must_use]
    pub fn with_write_gate(mut self, write_gate: Arc<WriteGate>) -> Self {
        self.write_gate = write_gate;
        self
    }

    pub fn write_gate(&self) -> &Arc<WriteGate> {
        &self.write_gate
    }

    /// Context for tool handlers, sharing this resolver's write gate.
    pub fn tool_context(&self) -> ToolContext {
        ToolContext::new(self.write_gate.clone()).with_version(self.versions.reference_version())
    }

    /// Resolve `registry` into the exposed tool set. The caller's registry is
    /// never modified.
    pub fn resolve(
        &self,
        registry: &ToolRegistry,
        request: &ResolveRequest,
    ) -> RegistryResult<ExposedRegistry> {
        let config_path = request.config_path.as_deref();
        let file = config_path.and_then(|path| self.loader.load_config(path));
        let allow_write = resolve_allow_write(file.as_ref(), &self.env);

        if request.mode == ServerMode::Multi {
            self.write_gate.set(allow_write);
            return Ok(ExposedRegistry {
                mode: ServerMode::Multi,
                allow_write,
                tools: registry
                    .iter()
                    .map(|(id, tool)| (id.clone(), tool.clone()))
                    .collect(),
            });
        }

        for tool in registry.values() {
            validate_bounds(tool)?;
        }
        let mut working = registry.clone();

        let overrides = self.load_overrides(file.as_ref(), request)?;
        if !overrides.is_empty() {
            validate_overrides(&overrides, &working)?;
            overrides.apply(&mut working);
            debug!(
                "Applied overrides for {} tool(s) from {}",
                overrides.len(),
                overrides.source().label()
            );
        }

        let criteria = match config_path {
            Some(_) => {
                if self.env.is_set() {
                    warn!("Both config file and environment variables are set. Using config file.");
                }
                file.as_ref()
                    .map(|config| config.filter_criteria(allow_write))
                    .unwrap_or_else(|| FilterCriteria::new().with_allow_write(allow_write))
            }
            None => self.env.filter_criteria(),
        };
        apply_filters(&mut working, &criteria)?;

        let version = self.versions.reference_version();
        match &version {
            Some(v) => info!("Connected OpenSearch version: {}", v),
            None => info!("Connected OpenSearch version: unknown"),
        }

        let mut tools: BTreeMap<String, ToolDescriptor> = BTreeMap::new();
        let mut seen = HashSet::new();
        for id in working.sorted_ids() {
            let Some(tool) = working.get(&id) else {
                continue;
            };
            if !is_tool_compatible(version.as_ref(), tool)? {
                debug!("Tool '{}' is not compatible with this cluster, skipping", tool.id);
                continue;
            }
            if !is_valid_display_name(&tool.display_name) {
                return Err(RegistryError::InvalidDisplayName {
                    tool: tool.id.clone(),
                    name: tool.display_name.clone(),
                    pattern: DISPLAY_NAME_PATTERN,
                });
            }
            if !seen.insert(tool.display_name.to_lowercase()) {
                return Err(RegistryError::DisplayNameConflict(tool.display_name.clone()));
            }

            let mut exposed = tool.clone();
            exposed.input_schema = tool.input_schema.without_fields(BASE_TOOL_FIELDS);
            tools.insert(exposed.display_name.clone(), exposed);
        }

        self.write_gate.set(allow_write);
        info!("Exposing {} tool(s)", tools.len());
        Ok(ExposedRegistry {
            mode: ServerMode::Single,
            allow_write,
            tools,
        })
    }

    /// The structured file wins whenever it has a non-empty `tools` section;
    /// flat overrides are then ignored entirely.
    fn load_overrides(
        &self,
        file: Option<&ToolConfigFile>,
        request: &ResolveRequest,
    ) -> RegistryResult<OverrideSet> {
        match file {
            Some(config) if config.has_tool_overrides() => {
                if !request.flat_overrides.is_empty() {
                    debug!("Config file provides tool overrides; ignoring flat overrides");
                }
                OverrideSet::from_structured(&config.tools)
            }
            _ => OverrideSet::from_flat(&request.flat_overrides),
        }
    }
}

/// Holds the most recent successful resolution. Empty until the first pass
/// succeeds.
#[derive(Debug)]
pub struct ToolsetHandle {
    current: ArcSwapOption<ExposedRegistry>,
}

impl Default for ToolsetHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolsetHandle {
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
        }
    }

    pub fn current(&self) -> Option<Arc<ExposedRegistry>> {
        self.current.load_full()
    }

    /// Run a pass and publish it. On failure the previous snapshot stays.
    pub fn refresh(
        &self,
        resolver: &RegistryResolver,
        registry: &ToolRegistry,
        request: &ResolveRequest,
    ) -> RegistryResult<Arc<ExposedRegistry>> {
        match resolver.resolve(registry, request) {
            Ok(exposed) => {
                let exposed = Arc::new(exposed);
                self.current.store(Some(exposed.clone()));
                Ok(exposed)
            }
            Err(e) => {
                warn!("Tool resolution failed, keeping previous tool set: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        capability::{HttpMethod, MethodSet},
        catalog::{default_catalog, CLUSTER_NAME_FIELD},
        config::StaticConfigLoader,
    };

    fn resolver_with(path: &str, yaml: &str) -> RegistryResolver {
        let config = ToolConfigFile::from_yaml_str(yaml).unwrap();
        RegistryResolver::new()
            .with_loader(Arc::new(StaticConfigLoader::new().with_config(path, config)))
    }

    #[test]
    fn test_server_mode_parse() {
        assert_eq!("Multi".parse::<ServerMode>().unwrap(), ServerMode::Multi);
        assert_eq!(ServerMode::default(), ServerMode::Single);
        assert!("both".parse::<ServerMode>().is_err());
    }

    #[test]
    fn test_multi_mode_returns_registry_unchanged() {
        let catalog = default_catalog();
        let resolver = RegistryResolver::new().with_version(Some(Version::new(1, 0, 0)));
        let request = ResolveRequest::new(ServerMode::Multi).with_override("tool.ListIndexTool.name", "Bad!");

        let exposed = resolver.resolve(&catalog, &request).unwrap();
        assert_eq!(exposed.len(), catalog.len());
        let tool = exposed.get("GetQueryInsightsTool").unwrap();
        assert!(tool.input_schema.has_field(CLUSTER_NAME_FIELD));
        assert_eq!(resolver.write_gate().get(), Some(true));
    }

    #[test]
    fn test_single_mode_defaults_to_core_tools() {
        let exposed = RegistryResolver::new()
            .resolve(&default_catalog(), &ResolveRequest::default())
            .unwrap();
        let names: Vec<&str> = exposed.names().collect();
        assert_eq!(
            names,
            vec![
                "GenericOpenSearchApiTool",
                "GetShardsTool",
                "IndexMappingTool",
                "ListIndexTool",
                "SearchIndexTool",
            ]
        );
        for (_, tool) in exposed.iter() {
            assert!(!tool.input_schema.has_field(CLUSTER_NAME_FIELD));
        }
    }

    #[test]
    fn test_caller_registry_untouched() {
        let catalog = default_catalog();
        let before = catalog.clone();
        let request = ResolveRequest::default().with_override("tool.ListIndexTool.name", "Lister");
        let exposed = RegistryResolver::new().resolve(&catalog, &request).unwrap();

        assert!(exposed.contains("Lister"));
        assert_eq!(exposed.get("Lister").unwrap().id, "ListIndexTool");
        assert_eq!(catalog, before);
    }

    #[test]
    fn test_config_file_settings_gate() {
        let resolver = resolver_with(
            "tools.yml",
            "tool_filters:\n  settings:\n    allow_write: false\n",
        );
        let exposed = resolver
            .resolve(&default_catalog(), &ResolveRequest::default().with_config_path("tools.yml"))
            .unwrap();
        assert!(!exposed.allow_write);
        assert_eq!(resolver.write_gate().get(), Some(false));
        // GET is still declared, so the generic tool survives the gate
        assert!(exposed.contains("GenericOpenSearchApiTool"));
    }

    #[test]
    fn test_env_filters_ignored_with_config_path() {
        let env = EnvFilterConfig {
            disabled_tools: vec!["ListIndexTool".to_string()],
            ..Default::default()
        };
        let resolver = resolver_with("tools.yml", "tool_filters:\n  enabled_tools: [CatNodesTool]\n")
            .with_env(env.clone());

        let exposed = resolver
            .resolve(&default_catalog(), &ResolveRequest::default().with_config_path("tools.yml"))
            .unwrap();
        assert!(exposed.contains("ListIndexTool"));
        assert!(exposed.contains("CatNodesTool"));

        let exposed = RegistryResolver::new()
            .with_env(env)
            .resolve(&default_catalog(), &ResolveRequest::default())
            .unwrap();
        assert!(!exposed.contains("ListIndexTool"));
    }

    #[test]
    fn test_unreadable_config_falls_back_to_defaults() {
        let resolver = RegistryResolver::new()
            .with_loader(Arc::new(StaticConfigLoader::new()))
            .with_env(EnvFilterConfig {
                allow_write: Some("false".to_string()),
                ..Default::default()
            });
        let request = ResolveRequest::default()
            .with_config_path("missing.yml")
            .with_override("tool.ListIndexTool.name", "Lister");

        let exposed = resolver.resolve(&default_catalog(), &request).unwrap();
        assert!(exposed.contains("Lister"));
        assert!(!exposed.allow_write);
    }

    #[test]
    fn test_failed_pass_does_not_publish_gate() {
        let resolver = resolver_with(
            "tools.yml",
            "tools:\n  NoSuchTool:\n    name: X\ntool_filters:\n  settings:\n    allow_write: false\n",
        );
        let err = resolver
            .resolve(&default_catalog(), &ResolveRequest::default().with_config_path("tools.yml"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownTool(_)));
        assert!(!resolver.write_gate().is_resolved());
    }

    #[test]
    fn test_malformed_version_bound_is_fatal() {
        let registry: ToolRegistry = [ToolDescriptor::new("ListIndexTool", "List")
            .with_methods(MethodSet::read_only())
            .with_min_version("one")]
        .into_iter()
        .collect();
        let err = RegistryResolver::new()
            .resolve(&registry, &ResolveRequest::default())
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidVersion { .. }));
    }

    #[test]
    fn test_malformed_bound_on_filtered_tool_is_fatal() {
        let registry: ToolRegistry = [
            ToolDescriptor::new("ListIndexTool", "List"),
            ToolDescriptor::new("Other", "Not a core tool").with_min_version("garbage"),
        ]
        .into_iter()
        .collect();
        let err = RegistryResolver::new()
            .with_version(Some(Version::new(2, 19, 0)))
            .resolve(&registry, &ResolveRequest::default())
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidVersion { bound: "minimum", ref value, .. } if value == "garbage"
        ));
    }

    #[test]
    fn test_tool_context_shares_gate() {
        let resolver = resolver_with(
            "tools.yml",
            "tool_filters:\n  settings:\n    allow_write: false\n",
        )
        .with_version(Some(Version::new(2, 11, 0)));
        let ctx = resolver.tool_context();
        resolver
            .resolve(&default_catalog(), &ResolveRequest::default().with_config_path("tools.yml"))
            .unwrap();

        assert!(ctx.ensure_write_allowed(HttpMethod::Post).is_err());
        assert_eq!(ctx.version(), Some(&Version::new(2, 11, 0)));
    }

    #[test]
    fn test_handle_keeps_last_good() {
        let handle = ToolsetHandle::new();
        let resolver = RegistryResolver::new();
        let catalog = default_catalog();
        assert!(handle.current().is_none());

        let bad = ResolveRequest::default().with_override("tool.ListIndexTool.name", "bad name");
        assert!(handle.refresh(&resolver, &catalog, &bad).is_err());
        assert!(handle.current().is_none());

        let first = handle
            .refresh(&resolver, &catalog, &ResolveRequest::default())
            .unwrap();
        assert_eq!(first.len(), 5);

        assert!(handle.refresh(&resolver, &catalog, &bad).is_err());
        assert_eq!(handle.current(), Some(first));
    }
}
