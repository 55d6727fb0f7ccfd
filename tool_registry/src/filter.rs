//! Filter engine: shrinks a registry to the active tool set.
//!
//! Order matters and is fixed:
//! 1. write gate (drop tools without a non-mutating method)
//! 2. category expansion (`core_tools` is always enabled)
//! 3. regex expansion against the display names that survived step 1
//! 4. enabled set (a no-op when empty)
//! 5. disabled set, so a tool in both ends up excluded
//!
//! Every name is validated before the registry is touched; a failed pass
//! leaves it as it was.

use std::collections::{BTreeMap, HashMap, HashSet};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    catalog::{CORE_TOOLS, CORE_TOOLS_CATEGORY},
    error::{RegistryError, RegistryResult},
    registry::ToolRegistry,
};

/// Enable/disable rules for one resolution pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub enabled_tools: Vec<String>,
    pub disabled_tools: Vec<String>,
    pub enabled_categories: Vec<String>,
    pub disabled_categories: Vec<String>,
    pub enabled_tools_regex: Vec<String>,
    pub disabled_tools_regex: Vec<String>,
    /// User-defined categories: name → display names.
    pub categories: BTreeMap<String, Vec<String>>,
    pub allow_write: bool,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            enabled_tools: Vec::new(),
            disabled_tools: Vec::new(),
            enabled_categories: Vec::new(),
            disabled_categories: Vec::new(),
            enabled_tools_regex: Vec::new(),
            disabled_tools_regex: Vec::new(),
            categories: BTreeMap::new(),
            allow_write: true,
        }
    }
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn enable_tools<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled_tools.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn disable_tools<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled_tools.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn enable_categories<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled_categories.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn disable_categories<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled_categories.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn enable_regex(mut self, pattern: impl Into<String>) -> Self {
        self.enabled_tools_regex.push(pattern.into());
        self
    }

    #[must_use]
    pub fn disable_regex(mut self, pattern: impl Into<String>) -> Self {
        self.disabled_tools_regex.push(pattern.into());
        self
    }

    #[must_use]
    pub fn with_category<I, S>(mut self, name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories
            .insert(name.into(), members.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_allow_write(mut self, allow_write: bool) -> Self {
        self.allow_write = allow_write;
        self
    }

    /// True when nothing beyond the defaults is configured.
    pub fn is_unrestricted(&self) -> bool {
        self == &Self::default()
    }
}

/// A tool name pattern, matched case-insensitively from the start of the
/// display name.
#[derive(Debug, Clone)]
pub struct NamePattern {
    source: String,
    regex: Regex,
}

impl NamePattern {
    pub fn new(pattern: &str, source_name: &'static str) -> RegistryResult<Self> {
        let regex = RegexBuilder::new(&format!("^(?:{})", pattern))
            .case_insensitive(true)
            .build()
            .map_err(|e| RegistryError::InvalidRegex {
                pattern: pattern.to_string(),
                source_name,
                reason: e.to_string(),
            })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, display_name: &str) -> bool {
        self.regex.is_match(display_name)
    }
}

fn expand_categories(
    names: &[String],
    categories: &BTreeMap<String, Vec<String>>,
) -> Vec<String> {
    let mut tools = Vec::new();
    for category in names {
        match categories.get(category) {
            Some(members) => tools.extend(members.iter().cloned()),
            None => warn!("Category '{}' not found in tool categories", category),
        }
    }
    tools
}

fn expand_regex(
    patterns: &[String],
    source_name: &'static str,
    display_names: &[&str],
) -> RegistryResult<Vec<String>> {
    let mut matched = Vec::new();
    for pattern in patterns {
        let pattern = NamePattern::new(pattern, source_name)?;
        matched.extend(
            display_names
                .iter()
                .filter(|name| pattern.matches(name))
                .map(|name| name.to_string()),
        );
    }
    Ok(matched)
}

/// Resolve display names to identifiers, naming the list a bad entry came from.
fn resolve_names(
    names: &[String],
    lookup: &HashMap<String, String>,
    source_name: &'static str,
    resolved: &mut HashSet<String>,
) -> RegistryResult<()> {
    for name in names {
        let id = lookup
            .get(&name.to_lowercase())
            .ok_or_else(|| RegistryError::UnknownFilterTool {
                name: name.clone(),
                source_name,
            })?;
        resolved.insert(id.clone());
    }
    Ok(())
}

/// Apply `criteria` to `registry` in place.
pub fn apply_filters(registry: &mut ToolRegistry, criteria: &FilterCriteria) -> RegistryResult<()> {
    // Both indexes reflect the registry before the write gate runs.
    let lookup = registry.display_name_index();
    let core_display_names: Vec<String> = CORE_TOOLS
        .iter()
        .filter_map(|id| registry.get(id))
        .map(|tool| tool.display_name.clone())
        .collect();

    let mut categories = BTreeMap::new();
    categories.insert(CORE_TOOLS_CATEGORY.to_string(), core_display_names);
    categories.extend(criteria.categories.clone());

    let gated: HashSet<String> = if criteria.allow_write {
        HashSet::new()
    } else {
        registry
            .values()
            .filter(|tool| !tool.http_methods.supports_read())
            .map(|tool| tool.id.clone())
            .collect()
    };

    let mut enabled_category_names = vec![CORE_TOOLS_CATEGORY.to_string()];
    enabled_category_names.extend(criteria.enabled_categories.iter().cloned());
    let enabled_from_categories = expand_categories(&enabled_category_names, &categories);
    let disabled_from_categories = expand_categories(&criteria.disabled_categories, &categories);

    let mut current_names: Vec<&str> = registry
        .values()
        .filter(|tool| !gated.contains(&tool.id))
        .map(|tool| tool.display_name.as_str())
        .collect();
    current_names.sort_unstable();
    let enabled_from_regex = expand_regex(
        &criteria.enabled_tools_regex,
        "enabled_tools_regex",
        &current_names,
    )?;
    let disabled_from_regex = expand_regex(
        &criteria.disabled_tools_regex,
        "disabled_tools_regex",
        &current_names,
    )?;

    let enabled = if criteria.enabled_tools.is_empty()
        && enabled_from_categories.is_empty()
        && enabled_from_regex.is_empty()
    {
        None
    } else {
        let mut ids = HashSet::new();
        resolve_names(&criteria.enabled_tools, &lookup, "enabled_tools", &mut ids)?;
        resolve_names(&enabled_from_categories, &lookup, "enabled_categories", &mut ids)?;
        resolve_names(&enabled_from_regex, &lookup, "enabled_tools_regex", &mut ids)?;
        Some(ids)
    };

    let mut disabled = HashSet::new();
    resolve_names(&criteria.disabled_tools, &lookup, "disabled_tools", &mut disabled)?;
    resolve_names(&disabled_from_categories, &lookup, "disabled_categories", &mut disabled)?;
    resolve_names(&disabled_from_regex, &lookup, "disabled_tools_regex", &mut disabled)?;

    let before = registry.len();
    registry.retain(|id, _| {
        !gated.contains(id)
            && enabled.as_ref().map_or(true, |ids| ids.contains(id))
            && !disabled.contains(id)
    });

    if !gated.is_empty() {
        debug!("Write gate removed {} tool(s)", gated.len());
    }
    info!(
        "Applied tool filter: {} of {} tool(s) remain",
        registry.len(),
        before
    );
    Ok(())
}
