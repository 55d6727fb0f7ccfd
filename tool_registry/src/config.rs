//! Tool configuration surface.
//!
//! Two sources feed a resolution pass: a structured YAML file and a set of
//! environment variables. Environment filters are only consulted when no
//! config file path is supplied.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::{error::RegistryResult, filter::FilterCriteria};

pub const ENV_ENABLED_TOOLS: &str = "OPENSEARCH_ENABLED_TOOLS";
pub const ENV_DISABLED_TOOLS: &str = "OPENSEARCH_DISABLED_TOOLS";
pub const ENV_TOOL_CATEGORIES: &str = "OPENSEARCH_TOOL_CATEGORIES";
pub const ENV_ENABLED_CATEGORIES: &str = "OPENSEARCH_ENABLED_CATEGORIES";
pub const ENV_DISABLED_CATEGORIES: &str = "OPENSEARCH_DISABLED_CATEGORIES";
pub const ENV_ENABLED_TOOLS_REGEX: &str = "OPENSEARCH_ENABLED_TOOLS_REGEX";
pub const ENV_DISABLED_TOOLS_REGEX: &str = "OPENSEARCH_DISABLED_TOOLS_REGEX";
pub const ENV_ALLOW_WRITE: &str = "OPENSEARCH_SETTINGS_ALLOW_WRITE";

/// Treat an explicit YAML `null` (e.g. `tools:` with nothing under it) like a
/// missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parsed tool configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ToolConfigFile {
    /// Per-tool overrides keyed by canonical tool identifier. Kept untyped;
    /// alias resolution decides what each key means.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tools: Map<String, Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub tool_filters: ToolFiltersConfig,

    /// Category name → tool display names.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tool_category: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ToolFiltersConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub enabled_tools: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub disabled_tools: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub enabled_categories: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub disabled_categories: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub enabled_tools_regex: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub disabled_tools_regex: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<FilterSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FilterSettings {
    /// When present, overrides `OPENSEARCH_SETTINGS_ALLOW_WRITE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_write: Option<bool>,
}

impl ToolConfigFile {
    pub fn from_yaml_str(content: &str) -> RegistryResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// The file's write setting, if it declares one.
    pub fn allow_write(&self) -> Option<bool> {
        self.tool_filters
            .settings
            .as_ref()
            .and_then(|settings| settings.allow_write)
    }

    pub fn has_tool_overrides(&self) -> bool {
        !self.tools.is_empty()
    }

    /// Filter criteria described by this file. `allow_write` is the already
    /// resolved write setting.
    pub fn filter_criteria(&self, allow_write: bool) -> FilterCriteria {
        let filters = &self.tool_filters;
        FilterCriteria {
            enabled_tools: filters.enabled_tools.clone(),
            disabled_tools: filters.disabled_tools.clone(),
            enabled_categories: filters.enabled_categories.clone(),
            disabled_categories: filters.disabled_categories.clone(),
            enabled_tools_regex: filters.enabled_tools_regex.clone(),
            disabled_tools_regex: filters.disabled_tools_regex.clone(),
            categories: self.tool_category.clone(),
            allow_write,
        }
    }
}

/// Source of structured tool configuration.
pub trait ConfigLoader: Send + Sync {
    /// Returns `None` when the file is missing or unusable; the failure is
    /// logged, never fatal.
    fn load_config(&self, path: &Path) -> Option<ToolConfigFile>;
}

/// Reads configuration from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileConfigLoader;

impl ConfigLoader for FileConfigLoader {
    fn load_config(&self, path: &Path) -> Option<ToolConfigFile> {
        match ToolConfigFile::from_file(path) {
            Ok(config) => {
                debug!("Loaded tool config from {}", path.display());
                Some(config)
            }
            Err(e) => {
                error!("Error loading tool config file {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Already-parsed configuration, for callers that read the file themselves.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigLoader {
    configs: BTreeMap<PathBuf, ToolConfigFile>,
}

impl StaticConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, path: impl Into<PathBuf>, config: ToolConfigFile) -> Self {
        self.configs.insert(path.into(), config);
        self
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load_config(&self, path: &Path) -> Option<ToolConfigFile> {
        let config = self.configs.get(path).cloned();
        if config.is_none() {
            warn!("No tool config registered for {}", path.display());
        }
        config
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn parse_comma_separated(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// `"true"` (any case) means true; anything else is false. Unset means true.
pub fn parse_allow_write(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.to_lowercase() == "true")
}

/// Filters taken from `OPENSEARCH_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvFilterConfig {
    pub enabled_tools: Vec<String>,
    pub disabled_tools: Vec<String>,
    pub tool_categories: BTreeMap<String, Vec<String>>,
    pub enabled_categories: Vec<String>,
    pub disabled_categories: Vec<String>,
    pub enabled_tools_regex: Vec<String>,
    pub disabled_tools_regex: Vec<String>,
    /// Raw `OPENSEARCH_SETTINGS_ALLOW_WRITE`, if set.
    pub allow_write: Option<String>,
}

impl EnvFilterConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let list = |key: &str| {
            lookup(key)
                .map(|value| parse_comma_separated(&value))
                .unwrap_or_default()
        };

        let tool_categories = match lookup(ENV_TOOL_CATEGORIES) {
            Some(raw) if !raw.trim().is_empty() => {
                serde_json::from_str::<BTreeMap<String, Vec<String>>>(&raw).unwrap_or_else(|e| {
                    warn!("Invalid JSON in tool_categories: {} ({})", raw, e);
                    BTreeMap::new()
                })
            }
            _ => BTreeMap::new(),
        };

        Self {
            enabled_tools: list(ENV_ENABLED_TOOLS),
            disabled_tools: list(ENV_DISABLED_TOOLS),
            tool_categories,
            enabled_categories: list(ENV_ENABLED_CATEGORIES),
            disabled_categories: list(ENV_DISABLED_CATEGORIES),
            enabled_tools_regex: list(ENV_ENABLED_TOOLS_REGEX),
            disabled_tools_regex: list(ENV_DISABLED_TOOLS_REGEX),
            allow_write: lookup(ENV_ALLOW_WRITE),
        }
    }

    /// Environment-level write setting (default: writes allowed).
    pub fn allow_write(&self) -> bool {
        parse_allow_write(self.allow_write.as_deref())
    }

    /// Whether any filter variable is set.
    pub fn is_set(&self) -> bool {
        self != &Self::default()
    }

    pub fn filter_criteria(&self) -> FilterCriteria {
        FilterCriteria {
            enabled_tools: self.enabled_tools.clone(),
            disabled_tools: self.disabled_tools.clone(),
            enabled_categories: self.enabled_categories.clone(),
            disabled_categories: self.disabled_categories.clone(),
            enabled_tools_regex: self.enabled_tools_regex.clone(),
            disabled_tools_regex: self.disabled_tools_regex.clone(),
            categories: self.tool_categories.clone(),
            allow_write: self.allow_write(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, io::Write};

    use serial_test::serial;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_yaml_full_config() {
        let yaml = r#"
tools:
  ListIndexTool:
    display_name: "Lister"
    description: "Custom description"
  SearchIndexTool:
    args:
      index: "Index to search"
tool_category:
  critical:
    - SearchIndexTool
    - ExplainTool
tool_filters:
  enabled_tools:
    - IndicesStatsTool
  disabled_tools:
    - MsearchTool
  disabled_categories:
    - critical
  enabled_tools_regex:
    - "get.*"
  settings:
    allow_write: false
"#;

        let config = ToolConfigFile::from_yaml_str(yaml).expect("Failed to parse YAML");
        assert!(config.has_tool_overrides());
        assert_eq!(config.tools["ListIndexTool"]["display_name"], "Lister");
        assert_eq!(config.tool_category["critical"].len(), 2);
        assert_eq!(config.tool_filters.enabled_tools, vec!["IndicesStatsTool"]);
        assert_eq!(config.allow_write(), Some(false));

        let criteria = config.filter_criteria(false);
        assert_eq!(criteria.disabled_categories, vec!["critical"]);
        assert_eq!(criteria.enabled_tools_regex, vec!["get.*"]);
        assert!(criteria.categories.contains_key("critical"));
        assert!(!criteria.allow_write);
    }

    #[test]
    fn test_yaml_minimal_and_empty_sections() {
        let config = ToolConfigFile::from_yaml_str("tools:\ntool_filters:\n").unwrap();
        assert!(!config.has_tool_overrides());
        assert_eq!(config.allow_write(), None);

        let config = ToolConfigFile::from_yaml_str("").unwrap();
        assert_eq!(config, ToolConfigFile::default());
    }

    #[test]
    fn test_yaml_settings_without_allow_write() {
        let yaml = "tool_filters:\n  settings: {}\n";
        let config = ToolConfigFile::from_yaml_str(yaml).unwrap();
        assert!(config.tool_filters.settings.is_some());
        assert_eq!(config.allow_write(), None);
    }

    #[test]
    fn test_yaml_invalid_is_error() {
        assert!(ToolConfigFile::from_yaml_str("tools: [unclosed").is_err());
        assert!(ToolConfigFile::from_yaml_str("tool_filters:\n  enabled_tools: 3\n").is_err());
    }

    #[test]
    fn test_file_loader() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tools:\n  CountTool:\n    name: Counter").unwrap();

        let config = FileConfigLoader.load_config(file.path()).unwrap();
        assert_eq!(config.tools["CountTool"]["name"], "Counter");
    }

    #[test]
    fn test_file_loader_missing_or_invalid() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileConfigLoader
            .load_config(&dir.path().join("missing.yml"))
            .is_none());

        let path = dir.path().join("broken.yml");
        fs::write(&path, "tools: [").unwrap();
        assert!(FileConfigLoader.load_config(&path).is_none());
    }

    #[test]
    fn test_static_loader() {
        let loader = StaticConfigLoader::new().with_config("tools.yml", ToolConfigFile::default());
        assert!(loader.load_config(Path::new("tools.yml")).is_some());
        assert!(loader.load_config(Path::new("other.yml")).is_none());
    }

    #[test]
    fn test_parse_comma_separated() {
        assert_eq!(
            parse_comma_separated(" ListIndexTool, ,SearchIndexTool ,"),
            vec!["ListIndexTool", "SearchIndexTool"]
        );
        assert!(parse_comma_separated("").is_empty());
    }

    #[test]
    fn test_parse_allow_write() {
        assert!(parse_allow_write(None));
        assert!(parse_allow_write(Some("TRUE")));
        assert!(!parse_allow_write(Some("false")));
        assert!(!parse_allow_write(Some("yes")));
        assert!(!parse_allow_write(Some("")));
    }

    #[test]
    fn test_env_lookup() {
        let env = EnvFilterConfig::from_lookup(lookup(&[
            (ENV_ENABLED_TOOLS, "ListIndexTool,CountTool"),
            (ENV_DISABLED_TOOLS_REGEX, "search.*"),
            (ENV_TOOL_CATEGORIES, r#"{"critical": ["SearchIndexTool"]}"#),
            (ENV_ALLOW_WRITE, "False"),
        ]));

        assert!(env.is_set());
        assert_eq!(env.enabled_tools, vec!["ListIndexTool", "CountTool"]);
        assert_eq!(env.disabled_tools_regex, vec!["search.*"]);
        assert_eq!(env.tool_categories["critical"], vec!["SearchIndexTool"]);
        assert!(!env.allow_write());

        let criteria = env.filter_criteria();
        assert!(!criteria.allow_write);
        assert!(criteria.categories.contains_key("critical"));
    }

    #[test]
    fn test_env_invalid_categories_json_is_ignored() {
        let env = EnvFilterConfig::from_lookup(lookup(&[(ENV_TOOL_CATEGORIES, "{not json")]));
        assert!(env.tool_categories.is_empty());
    }

    #[test]
    fn test_env_empty() {
        let env = EnvFilterConfig::from_lookup(lookup(&[]));
        assert!(!env.is_set());
        assert!(env.allow_write());
        assert!(env.filter_criteria().is_unrestricted());
    }

    #[test]
    #[serial]
    fn test_env_from_process() {
        std::env::set_var(ENV_DISABLED_CATEGORIES, "core_tools");
        std::env::remove_var(ENV_ALLOW_WRITE);

        let env = EnvFilterConfig::from_env();
        assert_eq!(env.disabled_categories, vec!["core_tools"]);
        assert!(env.allow_write());

        std::env::remove_var(ENV_DISABLED_CATEGORIES);
    }
}
