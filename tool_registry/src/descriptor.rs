//! Tool descriptor: one entry per tool capability.

use std::{fmt, sync::Arc};

use serde::{Serialize, Serializer};

use crate::{capability::MethodSet, schema::InputSchema};

/// Opaque reference to the function that executes a tool. The registry
/// carries it around but never looks inside.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct HandlerRef(Arc<str>);

impl HandlerRef {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandlerRef({})", self.0)
    }
}

impl Serialize for HandlerRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// A tool's metadata. `id` is the canonical identifier and never changes;
/// display name, description and argument descriptions are the customizable
/// parts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub http_methods: MethodSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_version: Option<String>,
    pub input_schema: InputSchema,
    #[serde(skip)]
    pub handler: Option<HandlerRef>,
}

impl ToolDescriptor {
    /// New descriptor whose display name starts out equal to its identifier.
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            description: description.into(),
            http_methods: MethodSet::read_only(),
            min_version: None,
            max_version: None,
            input_schema: InputSchema::object(),
            handler: None,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    #[must_use]
    pub fn with_methods(mut self, methods: MethodSet) -> Self {
        self.http_methods = methods;
        self
    }

    #[must_use]
    pub fn with_min_version(mut self, version: impl Into<String>) -> Self {
        self.min_version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_max_version(mut self, version: impl Into<String>) -> Self {
        self.max_version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema: InputSchema) -> Self {
        self.input_schema = schema;
        self
    }

    #[must_use]
    pub fn with_handler(mut self, handler: HandlerRef) -> Self {
        self.handler = Some(handler);
        self
    }
}
