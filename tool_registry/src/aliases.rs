//! Synonym keys accepted for customizable tool metadata.

use std::fmt;

/// Key of the nested per-argument description block.
pub const ARGS_KEY: &str = "args";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    DisplayName,
    Description,
}

impl CanonicalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::DisplayName => "display_name",
            CanonicalField::Description => "description",
        }
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        FIELD_ALIASES
            .iter()
            .find(|(field, _)| field == self)
            .map(|(_, aliases)| *aliases)
            .unwrap_or(&[])
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const FIELD_ALIASES: &[(CanonicalField, &[&str])] = &[
    (
        CanonicalField::DisplayName,
        &["name", "displayName", "display_name", "customName"],
    ),
    (
        CanonicalField::Description,
        &["description", "desc", "customDescription"],
    ),
];

/// Map a key to the field it stands for. Matching is exact (case-sensitive).
pub fn resolve_alias(key: &str) -> Option<CanonicalField> {
    FIELD_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&key))
        .map(|(field, _)| *field)
}
