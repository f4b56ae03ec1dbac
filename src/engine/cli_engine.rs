use super::{AgenticEngine, ResolvedTools, MCP_CONFIG_PATH, PROMPT_PATH};
use crate::config::WorkflowSpec;
use crate::jobs::Step;
use serde_json::json;

const SETUP_NODE_ACTION: &str = "actions/setup-node@v4";
const NODE_VERSION: &str = "24";
const GITHUB_MCP_SERVER_IMAGE: &str = "ghcr.io/github/github-mcp-server:v0.20.1";

/// An engine driven by an npm-distributed command line agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliEngine {
    id: String,
    display_name: String,
    package: String,
    command: String,
}

impl CliEngine {
    pub fn new(id: &str, display_name: &str, package: &str, command: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            package: package.to_string(),
            command: command.to_string(),
        }
    }
}

impl AgenticEngine for CliEngine {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn installation_steps(&self, spec: &WorkflowSpec) -> Vec<Step> {
        let version = spec
            .engine
            .as_ref()
            .and_then(|engine| engine.version.as_deref())
            .unwrap_or("latest");
        vec![
            Step::uses("Setup Node.js", SETUP_NODE_ACTION).with_input("node-version", NODE_VERSION),
            Step::run(
                &format!("Install {}", self.display_name),
                format!("npm install -g {}@{version}", self.package),
            ),
        ]
    }

    fn execution_steps(&self, spec: &WorkflowSpec, log_file: &str) -> Vec<Step> {
        let mut step = Step::run(
            &format!("Execute {}", self.display_name),
            format!("set -o pipefail\n{} 2>&1 | tee {log_file}", self.command),
        )
        .with_id("agentic_execution")
        .with_env("GH_AW_PROMPT", PROMPT_PATH)
        .with_env("GH_AW_MCP_CONFIG", MCP_CONFIG_PATH)
        .with_env("GITHUB_TOKEN", "${{ secrets.GITHUB_TOKEN }}");
        if let Some(model) = spec.engine.as_ref().and_then(|engine| engine.model.as_deref()) {
            step = step.with_env("GH_AW_MODEL", model);
        }
        step.timeout_minutes = spec.timeout_minutes;
        vec![step]
    }

    fn render_mcp_config(&self, tools: &ResolvedTools) -> String {
        let mut github_env = serde_json::Map::new();
        github_env.insert(
            "GITHUB_PERSONAL_ACCESS_TOKEN".to_string(),
            json!("${GITHUB_TOKEN}"),
        );
        github_env.insert(
            "GITHUB_TOOLSETS".to_string(),
            json!(tools.github_toolsets.join(",")),
        );
        if tools.read_only {
            github_env.insert("GITHUB_READ_ONLY".to_string(), json!("1"));
        }
        let mut servers = serde_json::Map::new();
        servers.insert(
            "github".to_string(),
            json!({
                "type": "stdio",
                "command": "docker",
                "args": ["run", "-i", "--rm", "-e", "GITHUB_PERSONAL_ACCESS_TOKEN", "-e", "GITHUB_TOOLSETS", "-e", "GITHUB_READ_ONLY", GITHUB_MCP_SERVER_IMAGE],
                "env": github_env,
            }),
        );
        if tools.safe_outputs_enabled {
            servers.insert(
                "safeoutputs".to_string(),
                json!({
                    "type": "stdio",
                    "command": "node",
                    "args": ["/tmp/gh-aw/actions/safe_outputs_mcp_server.cjs"],
                    "env": { "GH_AW_SAFE_OUTPUTS": "${GH_AW_SAFE_OUTPUTS}" },
                }),
            );
        }
        // serde_json keeps map keys sorted, so the document is stable.
        serde_json::to_string_pretty(&json!({ "mcpServers": servers }))
            .unwrap_or_else(|_| "{}".to_string())
    }
}
