//! Input schema tree for tool arguments.
//!
//! Schemas are plain values: stripping or re-describing a field produces a
//! new tree and never touches the catalogue's template.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RegistryResult;

/// One argument definition inside an object schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Anything else (`anyOf`, `items`, `examples`, ...) passes through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldSchema {
    pub fn typed(field_type: &str, description: &str) -> Self {
        Self {
            field_type: Some(field_type.to_string()),
            description: Some(description.to_string()),
            ..Default::default()
        }
    }

    pub fn string(description: &str) -> Self {
        Self::typed("string", description)
    }

    pub fn integer(description: &str) -> Self {
        Self::typed("integer", description)
    }

    pub fn boolean(description: &str) -> Self {
        Self::typed("boolean", description)
    }

    pub fn object(description: &str) -> Self {
        Self::typed("object", description)
    }

    /// A field with no declared type (accepts any JSON value).
    pub fn any(description: &str) -> Self {
        Self {
            description: Some(description.to_string()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Object schema: named properties plus the required list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type", default = "default_object_type")]
    pub schema_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, FieldSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_object_type() -> String {
    "object".to_string()
}

impl Default for InputSchema {
    fn default() -> Self {
        Self::object()
    }
}

impl InputSchema {
    pub fn object() -> Self {
        Self {
            schema_type: default_object_type(),
            title: None,
            properties: BTreeMap::new(),
            required: Vec::new(),
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    #[must_use]
    pub fn field(mut self, name: &str, field: FieldSchema) -> Self {
        self.properties.insert(name.to_string(), field);
        self
    }

    #[must_use]
    pub fn required_field(mut self, name: &str, field: FieldSchema) -> Self {
        self.properties.insert(name.to_string(), field);
        if !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
        self
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Replace the description of an existing field. Returns `false` if the
    /// field is not declared.
    pub fn set_field_description(&mut self, name: &str, description: &str) -> bool {
        match self.properties.get_mut(name) {
            Some(field) => {
                field.description = Some(description.to_string());
                true
            }
            None => false,
        }
    }

    /// Copy of this schema without the named fields (and without them in
    /// `required`).
    pub fn without_fields(&self, names: &[&str]) -> InputSchema {
        let mut stripped = self.clone();
        stripped
            .properties
            .retain(|name, _| !names.contains(&name.as_str()));
        stripped
            .required
            .retain(|name| !names.contains(&name.as_str()));
        stripped
    }

    pub fn to_json(&self) -> RegistryResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
