use super::activation::activated_condition;
use super::step::{
    helper_preamble, script_step, Step, AGENT_OUTPUT_ARTIFACT, SAFE_OUTPUTS_DIR,
    UPLOAD_ARTIFACT_ACTION,
};
use super::{job_name, JobRole, JobSpec, MAIN_JOB};
use crate::concurrency::{build_job_level_group_key, ConcurrencyGroup};
use crate::config::{CompilerOptions, WorkflowSpec, DEFAULT_TIMEOUT_MINUTES};
use crate::engine::{AgenticEngine, ResolvedTools, AGENT_LOG_PATH, MCP_CONFIG_PATH, PROMPT_PATH};
use crate::permissions::{contents_read, PermissionSet, PermissionsDeclaration};
use crate::safe_outputs::SafeOutputsConfig;
use crate::toolsets::inference::{expand_toolset_names, infer_from_toolsets};

pub const COLLECT_OUTPUT_STEP: &str = "collect_output";
const SAFE_OUTPUTS_FILE: &str = "/tmp/gh-aw/safeoutputs/outputs.jsonl";
const SAFE_OUTPUTS_CONFIG_FILE: &str = "/tmp/gh-aw/safeoutputs/config.json";

/// An explicit declaration is kept exactly as written. Without one, the job
/// only gets `contents: read`, and only in dev mode where it checks out the
/// repository to reach the local setup action.
pub fn main_job_permissions(spec: &WorkflowSpec, options: &CompilerOptions) -> PermissionsDeclaration {
    match &spec.permissions {
        Some(declaration) => declaration.clone(),
        None if options.action_mode.requires_checkout() => contents_read().into(),
        None => PermissionSet::new().into(),
    }
}

/// GitHub toolsets the agent may use under `permissions`.
pub fn resolve_tools(
    spec: &WorkflowSpec,
    permissions: &PermissionsDeclaration,
    safe_outputs: &SafeOutputsConfig,
) -> ResolvedTools {
    let github = spec.tools.github.clone().unwrap_or_default();
    let requested = if github.toolsets.is_empty() {
        vec!["default".to_string()]
    } else {
        github.toolsets
    };
    let names = expand_toolset_names(&requested);
    let effective = permissions.effective();
    ResolvedTools {
        github_toolsets: infer_from_toolsets(Some(&effective), &names, github.read_only),
        read_only: github.read_only,
        safe_outputs_enabled: !safe_outputs.is_empty(),
    }
}

fn heredoc_step(name: &str, path: &str, content: &str) -> Step {
    let dir = path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or(".");
    Step::run(
        name,
        format!("mkdir -p {dir}\ncat > {path} << 'GH_AW_EOF'\n{content}\nGH_AW_EOF"),
    )
}

pub fn build_main_job(
    spec: &WorkflowSpec,
    options: &CompilerOptions,
    engine: &dyn AgenticEngine,
    safe_outputs: &SafeOutputsConfig,
    upstream: Option<&JobSpec>,
) -> JobSpec {
    let mut job = JobSpec::new(job_name(MAIN_JOB), JobRole::Main, spec.runs_on());
    if let Some(upstream) = upstream {
        job.needs = vec![upstream.name.clone()];
        if upstream.role == JobRole::PreActivation {
            job.condition = Some(activated_condition(upstream.name.as_str()));
        }
    }
    job.permissions = main_job_permissions(spec, options);
    job.concurrency = build_job_level_group_key(spec).map(|group| ConcurrencyGroup {
        group,
        cancel_in_progress: false,
    });
    job.timeout_minutes = Some(spec.timeout_minutes.unwrap_or(DEFAULT_TIMEOUT_MINUTES));

    let tools = resolve_tools(spec, &job.permissions, safe_outputs);
    tracing::debug!(
        workflow = %spec.id,
        engine = engine.id(),
        toolsets = ?tools.github_toolsets,
        "resolved agent tools"
    );

    let mut steps = helper_preamble(options);
    steps.push(heredoc_step("Create prompt", PROMPT_PATH, &spec.prompt));
    if !safe_outputs.is_empty() {
        job.env
            .insert("GH_AW_SAFE_OUTPUTS".to_string(), SAFE_OUTPUTS_FILE.to_string());
        job.env.insert(
            "GH_AW_SAFE_OUTPUTS_CONFIG".to_string(),
            SAFE_OUTPUTS_CONFIG_FILE.to_string(),
        );
        steps.push(heredoc_step(
            "Write safe outputs config",
            SAFE_OUTPUTS_CONFIG_FILE,
            &safe_outputs.tool_config_json(),
        ));
    }
    steps.push(heredoc_step(
        "Setup MCPs",
        MCP_CONFIG_PATH,
        &engine.render_mcp_config(&tools),
    ));
    steps.extend(engine.installation_steps(spec));
    steps.extend(engine.execution_steps(spec, AGENT_LOG_PATH));

    if !safe_outputs.is_empty() {
        steps.push(
            script_step("Collect agent output", COLLECT_OUTPUT_STEP, "collect_ndjson_output")
                .with_env("GH_AW_ALLOWED_SAFE_OUTPUTS", safe_outputs.output_types().join(",")),
        );
        steps.push(
            Step::uses("Upload agent output", UPLOAD_ARTIFACT_ACTION)
                .with_condition("always()")
                .with_input("name", AGENT_OUTPUT_ARTIFACT)
                .with_input("path", format!("{SAFE_OUTPUTS_DIR}/{AGENT_OUTPUT_ARTIFACT}"))
                .with_input("if-no-files-found", "warn"),
        );
        for key in ["output", "output_types"] {
            job.outputs.insert(
                key.to_string(),
                format!("${{{{ steps.{COLLECT_OUTPUT_STEP}.outputs.{key} }}}}"),
            );
        }
    }
    steps.push(
        Step::uses("Upload agent logs", UPLOAD_ARTIFACT_ACTION)
            .with_condition("always()")
            .with_input("name", "agent-stdio.log")
            .with_input("path", AGENT_LOG_PATH)
            .with_input("if-no-files-found", "warn"),
    );
    job.steps = steps;
    job
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineRegistry;

    fn parse_spec(yaml: &str) -> WorkflowSpec {
        WorkflowSpec::from_yaml_str(yaml).expect("spec")
    }

    #[test]
    fn implicit_permissions_depend_on_action_mode() {
        let spec = parse_spec("id: docs\non: push\n");
        assert_eq!(
            main_job_permissions(&spec, &CompilerOptions::dev()).render(),
            "permissions:\n  contents: read"
        );
        assert_eq!(
            main_job_permissions(&spec, &CompilerOptions::release("v1")).render(),
            "permissions: {}"
        );
    }

    #[test]
    fn explicit_declarations_are_preserved() {
        for (yaml, rendered) in [
            ("permissions: read-all\n", "permissions: read-all"),
            ("permissions: {}\n", "permissions: {}"),
            ("permissions:\n  issues: write\n", "permissions:\n  issues: write"),
        ] {
            let spec = parse_spec(&format!("id: docs\non: push\n{yaml}"));
            assert_eq!(
                main_job_permissions(&spec, &CompilerOptions::dev()).render(),
                rendered
            );
        }
    }

    #[test]
    fn toolsets_follow_granted_permissions() {
        let spec = parse_spec("id: docs\non: push\npermissions:\n  contents: read\n  issues: read\n");
        let permissions = main_job_permissions(&spec, &CompilerOptions::dev());
        let tools = resolve_tools(&spec, &permissions, &SafeOutputsConfig::default());
        assert_eq!(tools.github_toolsets, vec!["context", "repos", "issues"]);
        assert!(tools.read_only);
    }

    #[test]
    fn outputs_are_wired_only_with_safe_outputs() {
        let registry = EngineRegistry::builtin();
        let engine = registry.resolve("copilot").expect("engine");
        let spec = parse_spec("id: docs\non: push\nsafe-outputs:\n  create-issue: {}\n");
        let safe_outputs =
            SafeOutputsConfig::from_spec(&spec, &CompilerOptions::dev()).expect("safe outputs");
        let job = build_main_job(&spec, &CompilerOptions::dev(), engine, &safe_outputs, None);
        assert_eq!(
            job.outputs.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["output", "output_types"]
        );
        assert_eq!(job.timeout_minutes, Some(DEFAULT_TIMEOUT_MINUTES));
        assert!(job
            .steps
            .iter()
            .any(|step| step.id.as_deref() == Some(COLLECT_OUTPUT_STEP)));

        let spec = parse_spec("id: docs\non: push\n");
        let job = build_main_job(
            &spec,
            &CompilerOptions::dev(),
            engine,
            &SafeOutputsConfig::default(),
            None,
        );
        assert!(job.outputs.is_empty());
    }
}
