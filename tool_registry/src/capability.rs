//! HTTP capability methods declared by each tool.
//!
//! A tool's method set drives the write gate: tools that cannot serve at
//! least one read-only method are dropped when writes are disallowed, and
//! mutating methods are rejected at invocation time.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 6] = [
        HttpMethod::Get,
        HttpMethod::Head,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }

    /// POST, PUT, DELETE and PATCH mutate cluster state.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Delete | HttpMethod::Patch
        )
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = RegistryError;

    fn from_str(s: &str) -> RegistryResult<Self> {
        let upper = s.trim().to_ascii_uppercase();
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == upper)
            .ok_or_else(|| {
                RegistryError::ConfigInvalid(format!(
                    "Invalid HTTP method \"{}\". Valid methods are: GET, HEAD, POST, PUT, DELETE, PATCH",
                    s
                ))
            })
    }
}

/// Ordered, duplicate-free set of method tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodSet(Vec<HttpMethod>);

impl MethodSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_only() -> Self {
        Self(vec![HttpMethod::Get])
    }

    /// Parse the comma-separated catalogue form, e.g. `"GET, POST"`.
    pub fn parse(methods: &str) -> RegistryResult<Self> {
        let mut set = Self::new();
        for token in methods.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            set.insert(token.parse()?);
        }
        Ok(set)
    }

    pub fn insert(&mut self, method: HttpMethod) {
        if !self.0.contains(&method) {
            self.0.push(method);
        }
    }

    #[must_use]
    pub fn with(mut self, method: HttpMethod) -> Self {
        self.insert(method);
        self
    }

    pub fn contains(&self, method: HttpMethod) -> bool {
        self.0.contains(&method)
    }

    /// True when at least one declared method is non-mutating.
    pub fn supports_read(&self) -> bool {
        self.0.iter().any(|m| !m.is_write())
    }

    pub fn has_write(&self) -> bool {
        self.0.iter().any(HttpMethod::is_write)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HttpMethod> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.0.iter().map(HttpMethod::as_str).collect();
        f.write_str(&joined.join(", "))
    }
}

impl FromIterator<HttpMethod> for MethodSet {
    fn from_iter<I: IntoIterator<Item = HttpMethod>>(iter: I) -> Self {
        let mut set = MethodSet::new();
        for method in iter {
            set.insert(method);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catalogue_form() {
        let set = MethodSet::parse("GET, POST, PUT, DELETE, HEAD, PATCH").unwrap();
        assert!(set.supports_read());
        assert!(set.has_write());
        assert_eq!(set.to_string(), "GET, POST, PUT, DELETE, HEAD, PATCH");
    }

    #[test]
    fn test_parse_dedupes_and_ignores_case() {
        let set = MethodSet::parse("get,GET , head").unwrap();
        assert_eq!(set.iter().count(), 2);
        assert!(!set.has_write());
    }

    #[test]
    fn test_parse_rejects_unknown_token() {
        let err = MethodSet::parse("GET, FETCH").unwrap_err();
        assert!(err.to_string().contains("FETCH"));
    }

    #[test]
    fn test_put_only_is_not_readable() {
        let set = MethodSet::new().with(HttpMethod::Put);
        assert!(!set.supports_read());
        assert!(set.has_write());
    }

    #[test]
    fn test_write_classification() {
        assert!(!HttpMethod::Get.is_write());
        assert!(!HttpMethod::Head.is_write());
        for method in [
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Delete,
            HttpMethod::Patch,
        ] {
            assert!(method.is_write(), "{} should be a write method", method);
        }
    }
}
