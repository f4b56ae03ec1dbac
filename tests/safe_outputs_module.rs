use awc::config::{CompileError, CompilerOptions, WorkflowSpec};
use awc::jobs::MAIN_JOB;
use awc::permissions::{PermissionLevel, PermissionScope};
use awc::safe_outputs::{entity_operation, SafeOutputsConfig, ENTITY_OPERATIONS};
use std::fs;
use tempfile::tempdir;

fn spec_with(safe_outputs: &str) -> WorkflowSpec {
    let yaml = format!("id: triage\nname: Issue Triage\non: issues\nsafe-outputs:\n{safe_outputs}");
    WorkflowSpec::from_yaml_str(&yaml).expect("spec")
}

fn parse(spec: &WorkflowSpec, options: &CompilerOptions) -> Result<SafeOutputsConfig, CompileError> {
    SafeOutputsConfig::from_spec(spec, options)
}

fn max_of(config: &SafeOutputsConfig, output_type: &str) -> u32 {
    config.get(output_type).expect("declared").max()
}

#[test]
fn dispatch_and_assign_default_to_one_and_accept_explicit_max() {
    let options = CompilerOptions::dev();
    let config = parse(
        &spec_with("  dispatch-workflow: [nightly]\n  assign-to-agent: {}\n"),
        &options,
    )
    .expect("safe outputs");
    assert_eq!(max_of(&config, "dispatch_workflow"), 1);
    assert_eq!(max_of(&config, "assign_to_agent"), 1);

    let config = parse(
        &spec_with(
            "  dispatch-workflow:\n    workflows: [nightly]\n    max: 5\n  assign-to-agent:\n    max: 5\n",
        ),
        &options,
    )
    .expect("safe outputs");
    assert_eq!(max_of(&config, "dispatch_workflow"), 5);
    assert_eq!(max_of(&config, "assign_to_agent"), 5);
}

#[test]
fn review_submission_is_clamped_to_one() {
    let config = parse(
        &spec_with("  submit-pull-request-review:\n    max: 5\n"),
        &CompilerOptions::dev(),
    )
    .expect("fixed-limit clamp is not an error");
    assert_eq!(max_of(&config, "submit_pull_request_review"), 1);
}

#[test]
fn self_dispatch_is_rejected() {
    let err = parse(
        &spec_with("  dispatch-workflow: [triage.md]\n"),
        &CompilerOptions::dev(),
    )
    .expect_err("self reference");
    assert!(matches!(err, CompileError::SelfDispatch { .. }));
    assert!(err.to_string().contains("cannot dispatch itself"));
}

#[test]
fn dispatch_targets_are_checked_against_the_workflows_directory() {
    let temp = tempdir().expect("tempdir");
    fs::write(temp.path().join("deploy.md"), "---\non: push\n---\n").expect("write source");
    fs::write(temp.path().join("deploy.lock.yml"), "name: deploy\n").expect("write lock");
    fs::write(temp.path().join("cleanup.yml"), "name: cleanup\n").expect("write plain");
    fs::write(temp.path().join("draft.md"), "---\non: push\n---\n").expect("write draft");
    let options = CompilerOptions::dev().with_workflows_dir(temp.path());

    let spec = spec_with("  dispatch-workflow: [deploy, cleanup.yml]\n");
    let config = parse(&spec, &options).expect("safe outputs");
    let jobs = config.build_jobs(&spec, &options, MAIN_JOB);
    let dispatch = jobs
        .iter()
        .find(|job| job.name == "dispatch_workflow")
        .expect("dispatch job");
    let files = dispatch
        .env
        .get("GH_AW_DISPATCH_WORKFLOW_FILES")
        .expect("files env");
    assert!(files.contains("deploy.lock.yml"));
    assert!(files.contains("cleanup.yml"));

    let err = parse(&spec_with("  dispatch-workflow: [draft]\n"), &options)
        .expect_err("uncompiled target");
    assert!(matches!(err, CompileError::DispatchTargetNotCompiled { .. }));

    let err = parse(&spec_with("  dispatch-workflow: [ghost]\n"), &options)
        .expect_err("missing target");
    assert!(err
        .to_string()
        .contains("check for the correct name and extension"));
}

#[test]
fn wildcard_target_repo_is_rejected() {
    let err = parse(
        &spec_with("  close-issue:\n    target-repo: \"*\"\n"),
        &CompilerOptions::dev(),
    )
    .expect_err("wildcard repo");
    assert!(matches!(err, CompileError::WildcardTargetRepo { .. }));
}

#[test]
fn entity_operation_jobs_use_only_their_own_permissions() {
    let spec = WorkflowSpec::from_yaml_str(
        "id: triage\nname: Issue Triage\ntracker-id: triage-2024\non: issues\npermissions: write-all\nsafe-outputs:\n  close-issue: {}\n  update-discussion:\n    title:\n",
    )
    .expect("spec");
    let options = CompilerOptions::release("v1.0.0");
    let config = parse(&spec, &options).expect("safe outputs");
    let jobs = config.build_jobs(&spec, &options, MAIN_JOB);

    let close = jobs
        .iter()
        .find(|job| job.name == "close_issue")
        .expect("close job");
    assert_eq!(
        close.rendered_permissions(),
        "permissions:\n  contents: read\n  issues: write"
    );
    assert!(close.needs_job(MAIN_JOB));
    let condition = close.condition.as_deref().expect("gate");
    assert!(condition.contains("contains(needs.agent.outputs.output_types, 'close_issue')"));
    assert_eq!(close.env.get("GH_AW_WORKFLOW_NAME").map(String::as_str), Some("Issue Triage"));
    assert_eq!(close.env.get("GH_AW_TRACKER_ID").map(String::as_str), Some("triage-2024"));
    assert_eq!(close.env.get("GH_AW_CLOSE_ISSUE_MAX").map(String::as_str), Some("1"));
    assert!(close.outputs.keys().all(|key| close.outputs[key].contains("steps.close_issue")));

    let update = jobs
        .iter()
        .find(|job| job.name == "update_discussion")
        .expect("update job");
    let effective = update.permissions.effective();
    assert_eq!(
        effective.level(PermissionScope::Discussions),
        PermissionLevel::Write
    );
    assert_eq!(effective.level(PermissionScope::Issues), PermissionLevel::None);
    assert_eq!(
        update
            .env
            .get("GH_AW_UPDATE_DISCUSSION_ALLOW_TITLE")
            .map(String::as_str),
        Some("true")
    );
}

#[test]
fn definition_table_covers_close_and_update_for_every_entity() {
    for key in [
        "close-issue",
        "close-pull-request",
        "close-discussion",
        "update-issue",
        "update-pull-request",
        "update-discussion",
    ] {
        let definition = entity_operation(key).expect("definition");
        assert_eq!(definition.config_key, key);
    }
    assert_eq!(ENTITY_OPERATIONS.len(), 6);
    assert!(entity_operation("close-gist").is_none());
}

#[test]
fn undeclared_outputs_produce_no_jobs() {
    let spec = WorkflowSpec::from_yaml_str("id: quiet\non: push\n").expect("spec");
    let config = parse(&spec, &CompilerOptions::dev()).expect("safe outputs");
    assert!(config.is_empty());
    assert!(config
        .build_jobs(&spec, &CompilerOptions::dev(), MAIN_JOB)
        .is_empty());

    let disabled = spec_with("  create-issue: false\n");
    let config = parse(&disabled, &CompilerOptions::dev()).expect("safe outputs");
    assert!(config.is_empty(), "{:?}", config.output_types());
}
