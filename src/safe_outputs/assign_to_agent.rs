use super::common::{
    assemble_job, declaration_map, parse_max, parse_string, parse_target, parse_target_repo,
    targets_triggering_entity, warn_unknown_keys, MaxPolicy, PrefixedEnv, SafeOutputContext,
    SafeOutputJobParts,
};
use crate::config::CompileError;
use crate::jobs::{Condition, JobSpec};
use crate::permissions::{PermissionScope, PermissionSet};
use serde_yaml::Mapping;

pub const ASSIGN_TO_AGENT_KEY: &str = "assign-to-agent";
pub const ASSIGN_TO_AGENT_JOB: &str = "assign_to_agent";
pub const DEFAULT_AGENT: &str = "copilot";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignToAgentConfig {
    pub max: u32,
    pub agent: Option<String>,
    pub target: Option<String>,
    pub target_repo: Option<String>,
    pub github_token: Option<String>,
}

impl AssignToAgentConfig {
    pub fn agent(&self) -> &str {
        self.agent.as_deref().unwrap_or(DEFAULT_AGENT)
    }
}

pub fn parse_assign_to_agent(raw: &Mapping) -> Result<Option<AssignToAgentConfig>, CompileError> {
    let kind = ASSIGN_TO_AGENT_KEY;
    let Some(map) = declaration_map(raw, kind, None) else {
        return Ok(None);
    };
    warn_unknown_keys(kind, &map, &["name", "target", "target-repo"]);
    Ok(Some(AssignToAgentConfig {
        max: MaxPolicy::Default(1).resolve(kind, parse_max(kind, &map)),
        agent: parse_string(kind, &map, "name"),
        target: parse_target(kind, &map),
        target_repo: parse_target_repo(kind, &map)?,
        github_token: parse_string(kind, &map, "github-token"),
    }))
}

pub fn build_assign_to_agent(
    ctx: &SafeOutputContext<'_>,
    config: &AssignToAgentConfig,
) -> JobSpec {
    let mut env = PrefixedEnv::new("GH_AW_ASSIGN_TO_AGENT");
    env.set("MAX", config.max.to_string())
        .set("DEFAULT", config.agent())
        .set_opt("TARGET", config.target.as_deref())
        .set_opt("TARGET_REPO", config.target_repo.as_deref());

    assemble_job(
        ctx,
        SafeOutputJobParts {
            job_name: ASSIGN_TO_AGENT_JOB,
            step_name: "Assign To Agent",
            script: "assign_to_agent",
            permissions: PermissionSet::new()
                .read(PermissionScope::Contents)
                .write(PermissionScope::Issues),
            env: env.into_vars(),
            output_keys: &["assigned_agents"],
            extra_condition: targets_triggering_entity(config.target.as_deref())
                .then(|| Condition::any_of(["github.event.issue.number"])),
            github_token: config.github_token.as_deref(),
            trailing_steps: Vec::new(),
            extra_needs: Vec::new(),
        },
    )
}
