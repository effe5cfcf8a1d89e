//! Tool registry for managing available tools

use crate::{Error, Result, Tool};
use std::sync::Arc;

/// Ordered collection of tools.
///
/// Registration order is kept so that the tool list offered to the backend
/// is stable between runs. Registering a second tool with the same name
/// replaces the first in place.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        if let Some(slot) = self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            *slot = tool;
        } else {
            self.tools.push(tool);
        }
    }

    /// Builder-style variant of [`register`](Self::register)
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// Check whether a tool with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    /// List all registered tools in registration order
    pub fn list_tools(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.clone()
    }

    /// Names of all registered tools in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Build a registry holding only the named tools.
    ///
    /// The result follows the order of `allowed`. Naming a tool that is not
    /// registered is an error rather than a silent omission.
    pub fn scoped<S: AsRef<str>>(&self, allowed: &[S]) -> Result<Self> {
        let mut scoped = Self::new();
        for name in allowed {
            let name = name.as_ref();
            let tool = self
                .get(name)
                .ok_or_else(|| Error::ToolNotFound(name.to_string()))?;
            scoped.register(tool);
        }
        Ok(scoped)
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
