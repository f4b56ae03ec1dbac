//! Concurrency groups for the compiled workflow and its agent job.

use crate::config::{TriggerCategory, WorkflowSpec};
use serde::Serialize;

pub const GROUP_NAMESPACE: &str = "gh-aw";
pub const WORKFLOW_EXPRESSION: &str = "${{ github.workflow }}";
pub const THREAD_NUMBER_EXPRESSION: &str =
    "${{ github.event.issue.number || github.event.pull_request.number }}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConcurrencyGroup {
    pub group: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cancel_in_progress: bool,
}

/// Command runs serialize per issue or pull request; everything else
/// serializes globally per workflow.
pub fn build_group_key(_spec: &WorkflowSpec, is_command_trigger: bool) -> Vec<String> {
    let mut parts = vec![
        GROUP_NAMESPACE.to_string(),
        WORKFLOW_EXPRESSION.to_string(),
    ];
    if is_command_trigger {
        parts.push(THREAD_NUMBER_EXPRESSION.to_string());
    }
    parts
}

/// A user's in-flight command is never cancelled by a newer event.
pub fn should_cancel_in_progress(spec: &WorkflowSpec, is_command_trigger: bool) -> bool {
    !is_command_trigger && spec.on.has_category(TriggerCategory::PullRequest)
}

pub fn workflow_concurrency(spec: &WorkflowSpec) -> ConcurrencyGroup {
    let is_command = spec.is_command_trigger();
    let default_cancel = should_cancel_in_progress(spec, is_command);
    if let Some(custom) = &spec.concurrency {
        return ConcurrencyGroup {
            group: custom.group.clone(),
            cancel_in_progress: custom.cancel_in_progress.unwrap_or(default_cancel),
        };
    }
    ConcurrencyGroup {
        group: build_group_key(spec, is_command).join("-"),
        cancel_in_progress: default_cancel,
    }
}

/// `None` for special triggers, which the workflow-level group already
/// sequences, and when no engine identity is available.
pub fn build_job_level_group_key(spec: &WorkflowSpec) -> Option<String> {
    if spec.is_command_trigger() || spec.on.is_special() {
        return None;
    }
    let engine = spec.engine.as_ref()?.id.as_str();
    Some(format!("{GROUP_NAMESPACE}-{engine}-{WORKFLOW_EXPRESSION}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(yaml: &str) -> WorkflowSpec {
        WorkflowSpec::from_yaml_str(yaml).expect("spec")
    }

    #[test]
    fn custom_group_keeps_computed_cancel_default() {
        let spec = spec("id: wf\non: pull_request\nconcurrency: my-group\n");
        let group = workflow_concurrency(&spec);
        assert_eq!(group.group, "my-group");
        assert!(group.cancel_in_progress);
    }

    #[test]
    fn generic_trigger_without_engine_has_no_job_group() {
        assert_eq!(
            build_job_level_group_key(&spec("id: wf\non: workflow_dispatch\n")),
            None
        );
    }
}
