pub mod error;
pub mod load;
pub mod options;
pub mod paths;
pub mod triggers;
pub mod workflow_file;

pub use error::{CompileError, ConfigError};
pub use load::load_workflow_spec;
pub use options::{ActionMode, CompilerOptions, DEFAULT_ACTION_REPOSITORY};
pub use paths::{
    compiled_workflow_path, lock_file_path, plain_workflow_paths, workflow_source_path,
    LOCK_FILE_SUFFIX,
};
pub use triggers::{CommandTrigger, TriggerCategory, TriggerConfig};
pub use workflow_file::{
    split_frontmatter, workflow_id_from_path, ConcurrencyConfig, EngineConfig, GithubToolConfig,
    ToolsConfig, WorkflowSpec, DEFAULT_ENGINE, DEFAULT_ROLES, DEFAULT_RUNS_ON,
    DEFAULT_TIMEOUT_MINUTES,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{PermissionLevel, PermissionScope, PermissionsDeclaration};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn workflow_spec_parses_frontmatter_fields() {
        let spec = WorkflowSpec::from_yaml_str(
            r#"
id: triage
name: Issue Triage
tracker-id: triage-2024
on:
  issues:
    types: [opened]
permissions:
  contents: read
  issues: read
engine:
  id: claude
  model: sonnet
roles: [admin]
tools:
  github:
    toolsets: [default, actions]
    read-only: false
safe-outputs:
  close-issue:
    max: 2
"#,
        )
        .expect("parse spec");

        assert_eq!(spec.id, "triage");
        assert_eq!(spec.name, "Issue Triage");
        assert_eq!(spec.engine_id(), "claude");
        assert_eq!(spec.required_roles(), Some(vec!["admin".to_string()]));
        let github = spec.tools.github.as_ref().expect("github tool");
        assert_eq!(github.toolsets, vec!["default", "actions"]);
        assert!(!github.read_only);
        match spec.permissions.as_ref().expect("permissions") {
            PermissionsDeclaration::Explicit(set) => {
                assert_eq!(set.level(PermissionScope::Issues), PermissionLevel::Read);
            }
            other => panic!("unexpected permissions: {other:?}"),
        }
        assert!(spec
            .safe_outputs
            .as_ref()
            .expect("safe outputs")
            .contains_key("close-issue"));
    }

    #[test]
    fn defaults_apply_when_optional_fields_are_absent() {
        let spec = WorkflowSpec::from_yaml_str("id: nightly\non: workflow_dispatch\n")
            .expect("parse spec");
        assert_eq!(spec.name, "nightly");
        assert_eq!(spec.engine_id(), DEFAULT_ENGINE);
        assert_eq!(spec.runs_on(), DEFAULT_RUNS_ON);
        assert!(spec.permissions.is_none());
        assert_eq!(
            spec.required_roles(),
            Some(DEFAULT_ROLES.iter().map(|r| r.to_string()).collect())
        );
    }

    #[test]
    fn roles_all_disables_the_membership_check() {
        let spec = WorkflowSpec::from_yaml_str("id: open\non: issues\nroles: all\n")
            .expect("parse spec");
        assert_eq!(spec.required_roles(), None);
    }

    #[test]
    fn validation_rejects_zero_timeout_and_short_tracker_id() {
        let err = WorkflowSpec::from_yaml_str("id: a\non: push\ntimeout-minutes: 0\n")
            .expect_err("zero timeout");
        assert!(err.to_string().contains("timeout-minutes"));
        let err = WorkflowSpec::from_yaml_str("id: a\non: push\ntracker-id: abc\n")
            .expect_err("short tracker id");
        assert!(err.to_string().contains("tracker-id"));
    }

    #[test]
    fn markdown_file_uses_stem_as_id_and_body_as_prompt() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("weekly-report.md");
        fs::write(
            &path,
            "---\non:\n  schedule:\n    - cron: '0 9 * * 1'\n---\n\n# Weekly report\n\nSummarize activity.\n",
        )
        .expect("write workflow");

        let spec = load_workflow_spec(&path).expect("load spec");
        assert_eq!(spec.id, "weekly-report");
        assert!(spec.prompt.starts_with("# Weekly report"));
    }

    #[test]
    fn markdown_without_frontmatter_is_reported() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("broken.md");
        fs::write(&path, "# no frontmatter\n").expect("write workflow");
        match load_workflow_spec(&path) {
            Err(ConfigError::MissingFrontmatter { path: reported }) => {
                assert!(reported.ends_with("broken.md"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
