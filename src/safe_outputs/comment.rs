use super::common::{
    assemble_job, declaration_map, parse_bool, parse_max, parse_string, parse_string_list,
    parse_target, parse_target_repo, targets_triggering_entity, warn_unknown_keys, MaxPolicy,
    PrefixedEnv, SafeOutputContext, SafeOutputJobParts,
};
use super::create::{CREATE_DISCUSSION_JOB, CREATE_ISSUE_JOB};
use crate::config::CompileError;
use crate::jobs::conditions::job_output;
use crate::jobs::{Condition, JobSpec};
use crate::permissions::{PermissionScope, PermissionSet};
use serde_yaml::Mapping;
use std::collections::BTreeMap;

pub const ADD_COMMENT_KEY: &str = "add-comment";
pub const ADD_COMMENT_JOB: &str = "add_comment";
pub const ADD_LABELS_KEY: &str = "add-labels";
pub const ADD_LABELS_JOB: &str = "add_labels";
pub const SUBMIT_REVIEW_KEY: &str = "submit-pull-request-review";
pub const SUBMIT_REVIEW_JOB: &str = "submit_pull_request_review";

const ISSUE_OR_PR_NUMBER: [&str; 2] = ["github.event.issue.number", "github.event.pull_request.number"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddCommentConfig {
    pub max: u32,
    pub target: Option<String>,
    pub target_repo: Option<String>,
    pub discussion: bool,
    pub github_token: Option<String>,
}

pub fn parse_add_comment(raw: &Mapping) -> Result<Option<AddCommentConfig>, CompileError> {
    let kind = ADD_COMMENT_KEY;
    let Some(map) = declaration_map(raw, kind, None) else {
        return Ok(None);
    };
    warn_unknown_keys(kind, &map, &["target", "target-repo", "discussion"]);
    Ok(Some(AddCommentConfig {
        max: MaxPolicy::Default(1).resolve(kind, parse_max(kind, &map)),
        target: parse_target(kind, &map),
        target_repo: parse_target_repo(kind, &map)?,
        discussion: parse_bool(kind, &map, "discussion"),
        github_token: parse_string(kind, &map, "github-token"),
    }))
}

/// Comments may land on entities created earlier in the same run, so the job
/// waits for the create jobs and receives their outputs.
pub fn build_add_comment(ctx: &SafeOutputContext<'_>, config: &AddCommentConfig) -> JobSpec {
    let mut prefixed = PrefixedEnv::new("GH_AW_ADD_COMMENT");
    prefixed
        .set("MAX", config.max.to_string())
        .set_opt("TARGET", config.target.as_deref())
        .set_opt("TARGET_REPO", config.target_repo.as_deref())
        .set_flag("DISCUSSION", config.discussion);
    let mut env: BTreeMap<String, String> = prefixed.into_vars();

    let mut extra_needs = Vec::new();
    if ctx.is_declared(CREATE_ISSUE_JOB) {
        extra_needs.push(CREATE_ISSUE_JOB);
        env.insert(
            "GH_AW_CREATED_ISSUE_NUMBER".to_string(),
            format!("${{{{ {} }}}}", job_output(CREATE_ISSUE_JOB, "issue_number")),
        );
    }
    if ctx.is_declared(CREATE_DISCUSSION_JOB) {
        extra_needs.push(CREATE_DISCUSSION_JOB);
        env.insert(
            "GH_AW_CREATED_DISCUSSION_NUMBER".to_string(),
            format!(
                "${{{{ {} }}}}",
                job_output(CREATE_DISCUSSION_JOB, "discussion_number")
            ),
        );
    }

    let mut permissions = PermissionSet::new()
        .read(PermissionScope::Contents)
        .write(PermissionScope::Issues)
        .write(PermissionScope::PullRequests);
    if config.discussion {
        permissions.set(
            PermissionScope::Discussions,
            crate::permissions::PermissionLevel::Write,
        );
    }

    let extra_condition = targets_triggering_entity(config.target.as_deref()).then(|| {
        let mut paths = ISSUE_OR_PR_NUMBER.to_vec();
        if config.discussion {
            paths.push("github.event.discussion.number");
        }
        Condition::any_of(paths)
    });

    assemble_job(
        ctx,
        SafeOutputJobParts {
            job_name: ADD_COMMENT_JOB,
            step_name: "Add Comment",
            script: "add_comment",
            permissions,
            env,
            output_keys: &["comment_id", "comment_url"],
            extra_condition,
            github_token: config.github_token.as_deref(),
            trailing_steps: Vec::new(),
            extra_needs,
        },
    )
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddLabelsConfig {
    pub max: u32,
    /// Empty means any label may be applied.
    pub allowed: Vec<String>,
    pub target: Option<String>,
    pub target_repo: Option<String>,
    pub github_token: Option<String>,
}

pub fn parse_add_labels(raw: &Mapping) -> Result<Option<AddLabelsConfig>, CompileError> {
    let kind = ADD_LABELS_KEY;
    let Some(map) = declaration_map(raw, kind, Some("allowed")) else {
        return Ok(None);
    };
    warn_unknown_keys(kind, &map, &["allowed", "target", "target-repo"]);
    Ok(Some(AddLabelsConfig {
        max: MaxPolicy::Default(3).resolve(kind, parse_max(kind, &map)),
        allowed: parse_string_list(kind, &map, "allowed"),
        target: parse_target(kind, &map),
        target_repo: parse_target_repo(kind, &map)?,
        github_token: parse_string(kind, &map, "github-token"),
    }))
}

pub fn build_add_labels(ctx: &SafeOutputContext<'_>, config: &AddLabelsConfig) -> JobSpec {
    let mut env = PrefixedEnv::new("GH_AW_LABELS");
    env.set("MAX", config.max.to_string())
        .set_list("ALLOWED", &config.allowed)
        .set_opt("TARGET", config.target.as_deref())
        .set_opt("TARGET_REPO", config.target_repo.as_deref());

    assemble_job(
        ctx,
        SafeOutputJobParts {
            job_name: ADD_LABELS_JOB,
            step_name: "Add Labels",
            script: "add_labels",
            permissions: PermissionSet::new()
                .read(PermissionScope::Contents)
                .write(PermissionScope::Issues)
                .write(PermissionScope::PullRequests),
            env: env.into_vars(),
            output_keys: &["labels_added"],
            extra_condition: targets_triggering_entity(config.target.as_deref())
                .then(|| Condition::any_of(ISSUE_OR_PR_NUMBER)),
            github_token: config.github_token.as_deref(),
            trailing_steps: Vec::new(),
            extra_needs: Vec::new(),
        },
    )
}

/// Review submission is fixed-limit: one review per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitReviewConfig {
    pub max: u32,
    pub target: Option<String>,
    pub footer: bool,
    pub github_token: Option<String>,
}

pub fn parse_submit_review(raw: &Mapping) -> Result<Option<SubmitReviewConfig>, CompileError> {
    let kind = SUBMIT_REVIEW_KEY;
    let Some(map) = declaration_map(raw, kind, None) else {
        return Ok(None);
    };
    warn_unknown_keys(kind, &map, &["target", "footer"]);
    Ok(Some(SubmitReviewConfig {
        max: MaxPolicy::Fixed(1).resolve(kind, parse_max(kind, &map)),
        target: parse_target(kind, &map),
        footer: map.get("footer").is_none() || parse_bool(kind, &map, "footer"),
        github_token: parse_string(kind, &map, "github-token"),
    }))
}

pub fn build_submit_review(ctx: &SafeOutputContext<'_>, config: &SubmitReviewConfig) -> JobSpec {
    let mut env = PrefixedEnv::new("GH_AW_PR_REVIEW");
    env.set("MAX", config.max.to_string())
        .set_opt("TARGET", config.target.as_deref());
    if !config.footer {
        env.set("FOOTER", "false");
    }

    assemble_job(
        ctx,
        SafeOutputJobParts {
            job_name: SUBMIT_REVIEW_JOB,
            step_name: "Submit Pull Request Review",
            script: "submit_pr_review",
            permissions: PermissionSet::new()
                .read(PermissionScope::Contents)
                .write(PermissionScope::PullRequests),
            env: env.into_vars(),
            output_keys: &["review_id", "review_url"],
            extra_condition: targets_triggering_entity(config.target.as_deref())
                .then(|| Condition::any_of(["github.event.pull_request.number"])),
            github_token: config.github_token.as_deref(),
            trailing_steps: Vec::new(),
            extra_needs: Vec::new(),
        },
    )
}
