//! Referential and naming checks for an override set, run before anything is
//! applied.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    error::{RegistryError, RegistryResult},
    overrides::OverrideSet,
    registry::ToolRegistry,
};

pub const DISPLAY_NAME_PATTERN: &str = r"^[a-zA-Z0-9_-]+$";

static DISPLAY_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(DISPLAY_NAME_PATTERN).expect("display name pattern"));

pub fn is_valid_display_name(name: &str) -> bool {
    DISPLAY_NAME_RE.is_match(name)
}

/// Validate `overrides` against `registry`, failing on the first violation.
///
/// Checks run in a fixed order: unknown tool, display name collision,
/// display name pattern, then argument references and types.
pub fn validate_overrides(overrides: &OverrideSet, registry: &ToolRegistry) -> RegistryResult<()> {
    for (tool_id, _) in overrides.iter() {
        if !registry.contains(tool_id) {
            return Err(RegistryError::UnknownTool(tool_id.clone()));
        }
    }

    // Names still taken after every renamed tool gives up its current one.
    let mut taken: HashSet<String> = registry
        .values()
        .filter(|tool| {
            overrides
                .get(&tool.id)
                .and_then(|o| o.display_name.as_ref())
                .is_none()
        })
        .map(|tool| tool.display_name.to_lowercase())
        .collect();

    for (_, config) in overrides.iter() {
        if let Some(name) = &config.display_name {
            if !taken.insert(name.to_lowercase()) {
                return Err(RegistryError::DisplayNameConflict(name.clone()));
            }
        }
    }

    for (tool_id, config) in overrides.iter() {
        if let Some(name) = &config.display_name {
            if !is_valid_display_name(name) {
                return Err(RegistryError::InvalidDisplayName {
                    tool: tool_id.clone(),
                    name: name.clone(),
                    pattern: DISPLAY_NAME_PATTERN,
                });
            }
        }
    }

    for (tool_id, config) in overrides.iter() {
        let Some(tool) = registry.get(tool_id) else {
            continue;
        };
        for (argument, value) in &config.args {
            if !tool.input_schema.has_field(argument) {
                return Err(RegistryError::InvalidArgument {
                    tool: tool_id.clone(),
                    argument: argument.clone(),
                });
            }
            if !value.is_string() {
                return Err(RegistryError::InvalidArgumentType {
                    tool: tool_id.clone(),
                    argument: argument.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::{json, Value};

    use super::*;
    use crate::{
        descriptor::ToolDescriptor,
        overrides::{OverrideSource, ToolOverride},
        schema::{FieldSchema, InputSchema},
    };

    fn registry() -> ToolRegistry {
        [
            ToolDescriptor::new("ListIndexTool", "List"),
            ToolDescriptor::new("SearchIndexTool", "Search").with_schema(
                InputSchema::object().required_field("index", FieldSchema::string("Index")),
            ),
            ToolDescriptor::new("CountTool", "Count"),
        ]
        .into_iter()
        .collect()
    }

    fn rename(pairs: &[(&str, &str)]) -> OverrideSet {
        let mut set = OverrideSet::new(OverrideSource::ConfigFile);
        for (id, name) in pairs {
            set.insert(
                *id,
                ToolOverride {
                    display_name: Some(name.to_string()),
                    ..Default::default()
                },
            );
        }
        set
    }

    fn args(id: &str, args: &[(&str, Value)]) -> OverrideSet {
        let mut set = OverrideSet::new(OverrideSource::Flat);
        set.insert(
            id,
            ToolOverride {
                args: args
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect::<BTreeMap<_, _>>(),
                ..Default::default()
            },
        );
        set
    }

    #[test]
    fn test_valid_renames() {
        assert!(validate_overrides(&rename(&[("ListIndexTool", "Lister")]), &registry()).is_ok());
    }

    #[test]
    fn test_unknown_tool() {
        let err = validate_overrides(&rename(&[("NonExistentTool", "X")]), &registry()).unwrap_err();
        assert!(err.to_string().contains("is not a valid tool name"));
        assert!(err.to_string().contains("NonExistentTool"));
    }

    #[test]
    fn test_unknown_tool_checked_before_pattern() {
        let set = rename(&[("ListIndexTool", "bad name!"), ("Missing", "Ok")]);
        let err = validate_overrides(&set, &registry()).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownTool(_)));
    }

    #[test]
    fn test_two_tools_same_name() {
        let set = rename(&[("ListIndexTool", "Shared"), ("SearchIndexTool", "Shared")]);
        let err = validate_overrides(&set, &registry()).unwrap_err();
        assert!(err.to_string().contains("conflicts with another tool"));
        assert!(err.to_string().contains("Shared"));
    }

    #[test]
    fn test_rename_onto_existing_tool() {
        let err = validate_overrides(&rename(&[("ListIndexTool", "countTOOL")]), &registry()).unwrap_err();
        assert!(matches!(err, RegistryError::DisplayNameConflict(name) if name == "countTOOL"));
    }

    #[test]
    fn test_swap_names_is_allowed() {
        let set = rename(&[("ListIndexTool", "CountTool"), ("CountTool", "ListIndexTool")]);
        assert!(validate_overrides(&set, &registry()).is_ok());
    }

    #[test]
    fn test_rename_to_own_name() {
        assert!(validate_overrides(&rename(&[("CountTool", "CountTool")]), &registry()).is_ok());
    }

    #[test]
    fn test_pattern_violation() {
        for bad in ["X!", "has space", "dotted.name", ""] {
            let err = validate_overrides(&rename(&[("ListIndexTool", bad)]), &registry()).unwrap_err();
            assert!(
                matches!(&err, RegistryError::InvalidDisplayName { name, .. } if name == bad),
                "{}",
                bad
            );
            assert!(err.to_string().contains("does not follow the required pattern"));
        }
    }

    #[test]
    fn test_conflict_checked_before_pattern() {
        let set = rename(&[("ListIndexTool", "Bad!"), ("SearchIndexTool", "Bad!")]);
        let err = validate_overrides(&set, &registry()).unwrap_err();
        assert!(matches!(err, RegistryError::DisplayNameConflict(_)));
    }

    #[test]
    fn test_argument_must_exist() {
        let err = validate_overrides(
            &args("SearchIndexTool", &[("missing", json!("x"))]),
            &registry(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not exist on tool 'SearchIndexTool'"));
    }

    #[test]
    fn test_argument_must_be_string() {
        let err = validate_overrides(&args("SearchIndexTool", &[("index", json!(3))]), &registry())
            .unwrap_err();
        assert!(err.to_string().contains("must be a string"));
        assert!(validate_overrides(
            &args("SearchIndexTool", &[("index", json!("Index name"))]),
            &registry()
        )
        .is_ok());
    }

    #[test]
    fn test_display_name_pattern() {
        assert!(is_valid_display_name("My_Tool-2"));
        assert!(!is_valid_display_name("my tool"));
    }
}
