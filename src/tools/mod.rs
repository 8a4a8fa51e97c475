//! Tools the model can invoke
//!
//! Every tool converts its faults into a descriptive result string; from the
//! model's point of view a tool call always produces a result, never an
//! error. Tools marked `direct` end the turn with their own output instead of
//! going back to the model for another round.

pub mod npm_install;
pub mod render_component;
pub mod run_code;
pub mod send_file;

pub use npm_install::NpmInstall;
pub use render_component::RenderComponent;
pub use run_code::ExecutePython;
pub use send_file::SendFile;

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::ToolSpec;
use crate::session::Session;

/// Static description of one tool
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON schema of the arguments object
    pub parameters: Value,
    /// Direct tools end the turn with their own output
    pub direct: bool,
}

impl ToolDescriptor {
    /// Declaration sent to the model with each request
    pub fn to_spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.to_string(),
            description: self.description.to_string(),
            parameters: self.parameters.clone(),
        }
    }
}

/// A callable tool
#[async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;

    /// Run the tool against the session context.
    ///
    /// Always returns a result string; underlying faults are folded into a
    /// descriptive message.
    async fn execute(&self, args: &Value, session: &mut Session) -> String;
}

/// Fixed set of tools available to the model
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// The built-in tool set
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ExecutePython));
        registry.register(Box::new(SendFile));
        registry.register(Box::new(NpmInstall));
        registry.register(Box::new(RenderComponent));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    /// Declarations for all registered tools
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.descriptor().to_spec()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.descriptor().name == name)
            .map(Box::as_ref)
    }

    pub fn is_direct(&self, name: &str) -> bool {
        self.get(name).map(|t| t.descriptor().direct).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_has_all_tools() {
        let registry = ToolRegistry::builtin();
        assert_eq!(registry.len(), 4);
        assert!(registry.get("execute_python").is_some());
        assert!(registry.get("send_file_to_user").is_some());
        assert!(registry.get("install_npm_dependencies").is_some());
        assert!(registry.get("render_react").is_some());
        assert!(registry.get("unknown_tool").is_none());
    }

    #[test]
    fn test_direct_flags() {
        let registry = ToolRegistry::builtin();
        assert!(!registry.is_direct("execute_python"));
        assert!(registry.is_direct("send_file_to_user"));
        assert!(registry.is_direct("install_npm_dependencies"));
        assert!(registry.is_direct("render_react"));
        assert!(!registry.is_direct("unknown_tool"));
    }

    #[test]
    fn test_specs_carry_schemas() {
        let registry = ToolRegistry::builtin();
        let specs = registry.specs();
        assert_eq!(specs.len(), 4);

        let execute = specs.iter().find(|s| s.name == "execute_python").unwrap();
        assert_eq!(execute.parameters["type"], "object");
        assert!(execute.parameters["properties"].get("code").is_some());
    }
}
