//! Execution engines are opaque to the graph builder: it only asks them for
//! install steps, run steps and the tool-server configuration document.

pub mod cli_engine;

pub use cli_engine::CliEngine;

use crate::config::{CompileError, WorkflowSpec};
use crate::jobs::Step;

pub const PROMPT_PATH: &str = "/tmp/gh-aw/aw-prompts/prompt.txt";
pub const MCP_CONFIG_PATH: &str = "/tmp/gh-aw/mcp-config/mcp-servers.json";
pub const AGENT_LOG_PATH: &str = "/tmp/gh-aw/agent-stdio.log";

/// Tool-server view handed to the engine after permission inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTools {
    pub github_toolsets: Vec<String>,
    pub read_only: bool,
    pub safe_outputs_enabled: bool,
}

pub trait AgenticEngine: Send + Sync {
    fn id(&self) -> &str;

    fn display_name(&self) -> &str;

    fn installation_steps(&self, spec: &WorkflowSpec) -> Vec<Step>;

    fn execution_steps(&self, spec: &WorkflowSpec, log_file: &str) -> Vec<Step>;

    fn render_mcp_config(&self, tools: &ResolvedTools) -> String;
}

pub struct EngineRegistry {
    engines: Vec<Box<dyn AgenticEngine>>,
}

impl EngineRegistry {
    pub fn empty() -> Self {
        Self {
            engines: Vec::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(CliEngine::new(
            "copilot",
            "GitHub Copilot CLI",
            "@github/copilot",
            "copilot --allow-all-tools --add-dir /tmp/gh-aw/ --prompt \"$(cat \"$GH_AW_PROMPT\")\"",
        )));
        registry.register(Box::new(CliEngine::new(
            "claude",
            "Claude Code",
            "@anthropic-ai/claude-code",
            "claude --print --mcp-config \"$GH_AW_MCP_CONFIG\" \"$(cat \"$GH_AW_PROMPT\")\"",
        )));
        registry.register(Box::new(CliEngine::new(
            "codex",
            "Codex",
            "@openai/codex",
            "codex exec --full-auto \"$(cat \"$GH_AW_PROMPT\")\"",
        )));
        registry
    }

    /// Later registrations with the same id replace earlier ones.
    pub fn register(&mut self, engine: Box<dyn AgenticEngine>) {
        self.engines.retain(|existing| existing.id() != engine.id());
        self.engines.push(engine);
    }

    pub fn ids(&self) -> Vec<&str> {
        self.engines.iter().map(|engine| engine.id()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&dyn AgenticEngine> {
        self.engines
            .iter()
            .find(|engine| engine.id() == id)
            .map(|engine| engine.as_ref())
    }

    pub fn resolve(&self, id: &str) -> Result<&dyn AgenticEngine, CompileError> {
        self.get(id).ok_or_else(|| CompileError::UnknownEngine {
            engine: id.to_string(),
            available: self.ids().join(", "),
        })
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_engine_lists_available_ids() {
        let registry = EngineRegistry::builtin();
        assert!(registry.resolve("claude").is_ok());
        match registry.resolve("gemini") {
            Err(CompileError::UnknownEngine { available, .. }) => {
                assert_eq!(available, "copilot, claude, codex");
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("gemini should not resolve"),
        }
    }

    #[test]
    fn registering_an_existing_id_replaces_it() {
        let mut registry = EngineRegistry::builtin();
        registry.register(Box::new(CliEngine::new("codex", "Custom", "pkg", "run")));
        assert_eq!(registry.ids(), vec!["copilot", "claude", "codex"]);
        assert_eq!(registry.get("codex").map(|e| e.display_name()), Some("Custom"));
    }
}
