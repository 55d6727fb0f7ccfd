//! Override loading from the structured config file or flat `tool.<Id>.<field>`
//! keys.
//!
//! Both loaders produce the same [`OverrideSet`]; the resolver decides which
//! one to use for a pass and never merges them.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    aliases::{resolve_alias, CanonicalField, ARGS_KEY},
    error::{RegistryError, RegistryResult},
    registry::ToolRegistry,
};

static FLAT_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^tool\.(\w+)\.(.+)$").expect("flat override key pattern"));

/// Where an override set came from; used to label errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideSource {
    ConfigFile,
    Flat,
}

impl OverrideSource {
    pub fn label(&self) -> &'static str {
        match self {
            OverrideSource::ConfigFile => "config file",
            OverrideSource::Flat => "CLI arguments",
        }
    }
}

/// Customizations for a single tool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOverride {
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// Argument name → new description. Values stay untyped until validation.
    pub args: BTreeMap<String, Value>,
}

impl ToolOverride {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.description.is_none() && self.args.is_empty()
    }

    fn set(&mut self, field: CanonicalField, value: String) {
        match field {
            CanonicalField::DisplayName => self.display_name = Some(value),
            CanonicalField::Description => self.description = Some(value),
        }
    }
}

/// Normalized overrides keyed by canonical tool identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideSet {
    source: OverrideSource,
    tools: BTreeMap<String, ToolOverride>,
}

impl OverrideSet {
    pub fn new(source: OverrideSource) -> Self {
        Self {
            source,
            tools: BTreeMap::new(),
        }
    }

    pub fn source(&self) -> OverrideSource {
        self.source
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn get(&self, id: &str) -> Option<&ToolOverride> {
        self.tools.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ToolOverride)> {
        self.tools.iter()
    }

    pub fn insert(&mut self, id: impl Into<String>, tool: ToolOverride) {
        self.tools.insert(id.into(), tool);
    }

    fn entry(&mut self, id: &str) -> &mut ToolOverride {
        self.tools.entry(id.to_string()).or_default()
    }

    /// Load the `tools` section of a structured config file.
    ///
    /// Unrecognized keys are logged and skipped. Two aliases of the same field
    /// within one tool are an error.
    pub fn from_structured(tools: &Map<String, Value>) -> RegistryResult<Self> {
        let source = OverrideSource::ConfigFile;
        let mut set = Self::new(source);

        for (tool_id, config) in tools {
            let entries = match config {
                Value::Object(entries) => entries,
                Value::Null => {
                    set.entry(tool_id);
                    continue;
                }
                other => {
                    return Err(RegistryError::ConfigInvalid(format!(
                        "Configuration for tool '{}' in {} must be a mapping, got {}",
                        tool_id,
                        source.label(),
                        value_kind(other)
                    )))
                }
            };

            let tool = set.entry(tool_id);
            let mut seen: Vec<CanonicalField> = Vec::new();

            for (key, value) in entries {
                if key == ARGS_KEY {
                    load_structured_args(tool_id, value, tool)?;
                    continue;
                }

                let Some(field) = resolve_alias(key) else {
                    warn!(
                        "Invalid field '{}' for tool '{}' in config file will be ignored. Only display_name and description are supported.",
                        key, tool_id
                    );
                    continue;
                };

                if seen.contains(&field) {
                    let keys = entries
                        .keys()
                        .filter(|k| resolve_alias(k) == Some(field))
                        .cloned()
                        .collect();
                    return Err(RegistryError::DuplicateField {
                        tool: tool_id.clone(),
                        field: field.to_string(),
                        source_name: source.label(),
                        keys,
                    });
                }
                seen.push(field);

                let text = scalar_text(value).ok_or_else(|| RegistryError::InvalidFieldType {
                    tool: tool_id.clone(),
                    field: key.clone(),
                })?;
                tool.set(field, text);
            }
        }

        debug!("Loaded overrides for {} tool(s) from config file", set.len());
        Ok(set)
    }

    /// Load flat `tool.<Id>.<field>` overrides.
    ///
    /// Recognized forms are `tool.<Id>.<alias>`, `tool.<Id>.args.<Arg>` and
    /// `tool.<Id>.args.<Arg>.<description alias>`. Anything else is logged and
    /// ignored. Duplicate targets fail with the literal conflicting keys.
    pub fn from_flat(overrides: &BTreeMap<String, String>) -> RegistryResult<Self> {
        let source = OverrideSource::Flat;
        let mut targets: BTreeMap<(String, FlatTarget), Vec<(&str, &str)>> = BTreeMap::new();

        for (key, raw) in overrides {
            let Some(captures) = FLAT_KEY.captures(key) else {
                warn!(
                    "Invalid argument '{}' will be ignored. Expected format: tool.<ToolName>.<field>=<value>",
                    key
                );
                continue;
            };
            let tool_id = &captures[1];
            let Some(target) = FlatTarget::parse(&captures[2]) else {
                warn!(
                    "Invalid field in argument '{}' for tool '{}' will be ignored. Only display_name, description and args.<name> are supported.",
                    key, tool_id
                );
                continue;
            };
            targets
                .entry((tool_id.to_string(), target))
                .or_default()
                .push((key.as_str(), raw.as_str()));
        }

        for ((tool_id, target), keys) in &targets {
            if keys.len() > 1 {
                return Err(RegistryError::DuplicateField {
                    tool: tool_id.clone(),
                    field: target.label(),
                    source_name: source.label(),
                    keys: keys.iter().map(|(key, _)| key.to_string()).collect(),
                });
            }
        }

        let mut set = Self::new(source);
        for ((tool_id, target), keys) in targets {
            let tool = set.entry(&tool_id);
            for (_, raw) in keys {
                let value = coerce_value(raw);
                match &target {
                    FlatTarget::Field(field) => {
                        // Metadata fields are text; keep the literal form of scalars.
                        let text = match value {
                            Value::String(s) => s,
                            Value::Bool(_) | Value::Number(_) => raw.to_string(),
                            _ => {
                                return Err(RegistryError::InvalidFieldType {
                                    tool: tool_id.clone(),
                                    field: field.to_string(),
                                })
                            }
                        };
                        tool.set(*field, text);
                    }
                    FlatTarget::Arg(arg) => {
                        tool.args.insert(arg.clone(), value);
                    }
                }
            }
        }

        debug!("Loaded overrides for {} tool(s) from flat keys", set.len());
        Ok(set)
    }

    /// Write validated overrides into `registry`. Identifiers no longer in the
    /// registry are skipped.
    pub fn apply(&self, registry: &mut ToolRegistry) {
        for (tool_id, config) in &self.tools {
            let Some(tool) = registry.get_mut(tool_id) else {
                continue;
            };
            if let Some(name) = &config.display_name {
                tool.display_name = name.clone();
            }
            if let Some(description) = &config.description {
                tool.description = description.clone();
            }
            for (arg, value) in &config.args {
                if let Some(text) = value.as_str() {
                    tool.input_schema.set_field_description(arg, text);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum FlatTarget {
    Field(CanonicalField),
    Arg(String),
}

impl FlatTarget {
    fn parse(path: &str) -> Option<Self> {
        if let Some(field) = resolve_alias(path) {
            return Some(FlatTarget::Field(field));
        }
        let rest = path.strip_prefix(ARGS_KEY)?.strip_prefix('.')?;
        match rest.split('.').collect::<Vec<_>>().as_slice() {
            [arg] if !arg.is_empty() => Some(FlatTarget::Arg(arg.to_string())),
            [arg, sub]
                if !arg.is_empty() && resolve_alias(sub) == Some(CanonicalField::Description) =>
            {
                Some(FlatTarget::Arg(arg.to_string()))
            }
            _ => None,
        }
    }

    fn label(&self) -> String {
        match self {
            FlatTarget::Field(field) => field.to_string(),
            FlatTarget::Arg(arg) => format!("argument '{}' description", arg),
        }
    }
}

fn load_structured_args(tool_id: &str, value: &Value, tool: &mut ToolOverride) -> RegistryResult<()> {
    match value {
        Value::Object(args) => {
            for (arg, description) in args {
                tool.args.insert(arg.clone(), description.clone());
            }
            Ok(())
        }
        Value::Null => Ok(()),
        other => Err(RegistryError::ConfigInvalid(format!(
            "'args' for tool '{}' must be a mapping of argument name to description, got {}",
            tool_id,
            value_kind(other)
        ))),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

/// Best-effort typed parsing of a flat override value.
pub fn coerce_value(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = raw.parse::<f64>() {
        if let Some(number) = serde_json::Number::from_f64(float) {
            return Value::Number(number);
        }
    }
    let trimmed = raw.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(parsed @ (Value::Object(_) | Value::Array(_))) = serde_json::from_str::<Value>(raw) {
            return parsed;
        }
    }
    Value::String(raw.to_string())
}
