//! Registry of tool descriptors keyed by canonical identifier.

use std::collections::{hash_map, HashMap};

use crate::descriptor::ToolDescriptor;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a descriptor under its own identifier, replacing any previous
    /// entry with the same id.
    pub fn insert(&mut self, tool: ToolDescriptor) -> Option<ToolDescriptor> {
        self.tools.insert(tool.id.clone(), tool)
    }

    pub fn get(&self, id: &str) -> Option<&ToolDescriptor> {
        self.tools.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ToolDescriptor> {
        self.tools.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tools.contains_key(id)
    }

    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&String, &mut ToolDescriptor) -> bool,
    {
        self.tools.retain(f);
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, ToolDescriptor> {
        self.tools.iter()
    }

    pub fn values(&self) -> hash_map::Values<'_, String, ToolDescriptor> {
        self.tools.values()
    }

    /// Identifiers in sorted order, for deterministic processing.
    pub fn sorted_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tools.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Case-insensitive display name → identifier index.
    pub fn display_name_index(&self) -> HashMap<String, String> {
        self.tools
            .values()
            .map(|tool| (tool.display_name.to_lowercase(), tool.id.clone()))
            .collect()
    }
}

impl FromIterator<ToolDescriptor> for ToolRegistry {
    fn from_iter<I: IntoIterator<Item = ToolDescriptor>>(iter: I) -> Self {
        let mut registry = ToolRegistry::new();
        for tool in iter {
            registry.insert(tool);
        }
        registry
    }
}

impl IntoIterator for ToolRegistry {
    type Item = (String, ToolDescriptor);
    type IntoIter = hash_map::IntoIter<String, ToolDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.tools.into_iter()
    }
}

impl<'a> IntoIterator for &'a ToolRegistry {
    type Item = (&'a String, &'a ToolDescriptor);
    type IntoIter = hash_map::Iter<'a, String, ToolDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.tools.iter()
    }
}
