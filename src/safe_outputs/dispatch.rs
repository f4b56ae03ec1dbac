use super::common::{
    assemble_job, declaration_map, parse_max, parse_string, parse_string_list, warn_unknown_keys,
    MaxPolicy, PrefixedEnv, SafeOutputContext, SafeOutputJobParts,
};
use crate::config::{
    compiled_workflow_path, plain_workflow_paths, workflow_id_from_path, workflow_source_path,
    CompileError, CompilerOptions, WorkflowSpec, LOCK_FILE_SUFFIX,
};
use crate::jobs::JobSpec;
use crate::permissions::{PermissionScope, PermissionSet};
use serde_yaml::Mapping;
use std::collections::BTreeMap;
use std::path::Path;

pub const DISPATCH_WORKFLOW_KEY: &str = "dispatch-workflow";
pub const DISPATCH_WORKFLOW_JOB: &str = "dispatch_workflow";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchWorkflowConfig {
    pub max: u32,
    pub workflows: Vec<String>,
    /// Workflow id to the file name that `workflow_dispatch` is sent to.
    pub workflow_files: BTreeMap<String, String>,
    pub github_token: Option<String>,
}

/// Parses and validates the declaration. Targets are checked against
/// `options.workflows_dir` when one is configured.
pub fn parse_dispatch_workflow(
    raw: &Mapping,
    spec: &WorkflowSpec,
    options: &CompilerOptions,
) -> Result<Option<DispatchWorkflowConfig>, CompileError> {
    let kind = DISPATCH_WORKFLOW_KEY;
    let Some(map) = declaration_map(raw, kind, Some("workflows")) else {
        return Ok(None);
    };
    warn_unknown_keys(kind, &map, &["workflows"]);

    let mut workflows = Vec::new();
    for target in parse_string_list(kind, &map, "workflows") {
        let id = workflow_id_from_path(Path::new(&target)).map_err(|err| {
            CompileError::invalid_field("safe-outputs.dispatch-workflow.workflows", err.to_string())
        })?;
        let id = id.to_string();
        if !workflows.contains(&id) {
            workflows.push(id);
        }
    }
    if workflows.is_empty() {
        return Err(CompileError::invalid_field(
            "safe-outputs.dispatch-workflow.workflows",
            "at least one workflow must be listed",
        ));
    }

    let mut workflow_files = BTreeMap::new();
    for target in &workflows {
        if spec.id.as_str() == target {
            return Err(CompileError::SelfDispatch {
                workflow: target.clone(),
            });
        }
        let file = match &options.workflows_dir {
            Some(dir) => resolve_dispatch_target(dir, target)?,
            None => {
                tracing::debug!(target = %target, "no workflows directory; dispatch target not checked");
                format!("{target}{LOCK_FILE_SUFFIX}")
            }
        };
        workflow_files.insert(target.clone(), file);
    }

    Ok(Some(DispatchWorkflowConfig {
        max: MaxPolicy::Default(1).resolve(kind, parse_max(kind, &map)),
        workflows,
        workflow_files,
        github_token: parse_string(kind, &map, "github-token"),
    }))
}

/// A markdown workflow dispatches through its lock file, so the lock file
/// must exist. Plain `.yml`/`.yaml` workflows are used as they are.
pub fn resolve_dispatch_target(dir: &Path, target: &str) -> Result<String, CompileError> {
    let source = workflow_source_path(dir, target);
    if source.is_file() {
        let compiled = compiled_workflow_path(dir, target);
        if !compiled.is_file() {
            return Err(CompileError::DispatchTargetNotCompiled {
                target: target.to_string(),
                source_path: source.display().to_string(),
            });
        }
        return Ok(file_name(&compiled));
    }
    if let Some(plain) = plain_workflow_paths(dir, target)
        .into_iter()
        .find(|path| path.is_file())
    {
        return Ok(file_name(&plain));
    }
    Err(CompileError::DispatchTargetMissing {
        target: target.to_string(),
        dir: dir.display().to_string(),
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn build_dispatch_workflow(
    ctx: &SafeOutputContext<'_>,
    config: &DispatchWorkflowConfig,
) -> JobSpec {
    let mut env = PrefixedEnv::new("GH_AW_DISPATCH_WORKFLOW");
    env.set("MAX", config.max.to_string())
        .set_list("ALLOWED", &config.workflows)
        .set(
            "FILES",
            serde_json::to_string(&config.workflow_files).unwrap_or_default(),
        );

    assemble_job(
        ctx,
        SafeOutputJobParts {
            job_name: DISPATCH_WORKFLOW_JOB,
            step_name: "Dispatch Workflow",
            script: "dispatch_workflow",
            permissions: PermissionSet::new().write(PermissionScope::Actions),
            env: env.into_vars(),
            output_keys: &["dispatched_workflows"],
            extra_condition: None,
            github_token: config.github_token.as_deref(),
            trailing_steps: Vec::new(),
            extra_needs: Vec::new(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn targets_resolve_by_extension() {
        let temp = tempdir().expect("temp dir");
        let dir = temp.path();
        fs::write(dir.join("deploy.md"), "---\non: push\n---\n").expect("write source");
        fs::write(dir.join("deploy.lock.yml"), "name: deploy\n").expect("write lock");
        fs::write(dir.join("release.yaml"), "name: release\n").expect("write plain");
        fs::write(dir.join("draft.md"), "---\non: push\n---\n").expect("write draft");

        assert_eq!(
            resolve_dispatch_target(dir, "deploy").expect("compiled"),
            "deploy.lock.yml"
        );
        assert_eq!(
            resolve_dispatch_target(dir, "release").expect("plain"),
            "release.yaml"
        );
        assert!(matches!(
            resolve_dispatch_target(dir, "draft"),
            Err(CompileError::DispatchTargetNotCompiled { .. })
        ));
        let err = resolve_dispatch_target(dir, "ghost").expect_err("missing");
        assert!(err
            .to_string()
            .contains("check for the correct name and extension"));
    }
}
