use super::common::{
    assemble_job, declaration_map, parse_max, parse_string, parse_string_list, parse_target_repo,
    warn_unknown_keys, MaxPolicy, PrefixedEnv, SafeOutputContext, SafeOutputJobParts,
};
use crate::config::CompileError;
use crate::jobs::JobSpec;
use crate::permissions::{PermissionScope, PermissionSet};
use serde_yaml::Mapping;

pub const CREATE_ISSUE_KEY: &str = "create-issue";
pub const CREATE_ISSUE_JOB: &str = "create_issue";
pub const CREATE_DISCUSSION_KEY: &str = "create-discussion";
pub const CREATE_DISCUSSION_JOB: &str = "create_discussion";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateIssueConfig {
    pub max: u32,
    pub title_prefix: Option<String>,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    pub target_repo: Option<String>,
    pub github_token: Option<String>,
}

pub fn parse_create_issue(raw: &Mapping) -> Result<Option<CreateIssueConfig>, CompileError> {
    let kind = CREATE_ISSUE_KEY;
    let Some(map) = declaration_map(raw, kind, None) else {
        return Ok(None);
    };
    warn_unknown_keys(kind, &map, &["title-prefix", "labels", "assignees", "target-repo"]);
    Ok(Some(CreateIssueConfig {
        max: MaxPolicy::Default(1).resolve(kind, parse_max(kind, &map)),
        title_prefix: parse_string(kind, &map, "title-prefix"),
        labels: parse_string_list(kind, &map, "labels"),
        assignees: parse_string_list(kind, &map, "assignees"),
        target_repo: parse_target_repo(kind, &map)?,
        github_token: parse_string(kind, &map, "github-token"),
    }))
}

pub fn build_create_issue(ctx: &SafeOutputContext<'_>, config: &CreateIssueConfig) -> JobSpec {
    let mut env = PrefixedEnv::new("GH_AW_CREATE_ISSUE");
    env.set("MAX", config.max.to_string())
        .set_opt("TITLE_PREFIX", config.title_prefix.as_deref())
        .set_list("LABELS", &config.labels)
        .set_list("ASSIGNEES", &config.assignees)
        .set_opt("TARGET_REPO", config.target_repo.as_deref());

    assemble_job(
        ctx,
        SafeOutputJobParts {
            job_name: CREATE_ISSUE_JOB,
            step_name: "Create Issue",
            script: "create_issue",
            permissions: PermissionSet::new()
                .read(PermissionScope::Contents)
                .write(PermissionScope::Issues),
            env: env.into_vars(),
            output_keys: &["issue_number", "issue_url"],
            extra_condition: None,
            github_token: config.github_token.as_deref(),
            trailing_steps: Vec::new(),
            extra_needs: Vec::new(),
        },
    )
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateDiscussionConfig {
    pub max: u32,
    pub title_prefix: Option<String>,
    pub category: Option<String>,
    pub target_repo: Option<String>,
    pub github_token: Option<String>,
}

pub fn parse_create_discussion(
    raw: &Mapping,
) -> Result<Option<CreateDiscussionConfig>, CompileError> {
    let kind = CREATE_DISCUSSION_KEY;
    let Some(map) = declaration_map(raw, kind, None) else {
        return Ok(None);
    };
    warn_unknown_keys(kind, &map, &["title-prefix", "category", "target-repo"]);
    Ok(Some(CreateDiscussionConfig {
        max: MaxPolicy::Default(1).resolve(kind, parse_max(kind, &map)),
        title_prefix: parse_string(kind, &map, "title-prefix"),
        category: parse_string(kind, &map, "category"),
        target_repo: parse_target_repo(kind, &map)?,
        github_token: parse_string(kind, &map, "github-token"),
    }))
}

pub fn build_create_discussion(
    ctx: &SafeOutputContext<'_>,
    config: &CreateDiscussionConfig,
) -> JobSpec {
    let mut env = PrefixedEnv::new("GH_AW_CREATE_DISCUSSION");
    env.set("MAX", config.max.to_string())
        .set_opt("TITLE_PREFIX", config.title_prefix.as_deref())
        .set_opt("CATEGORY", config.category.as_deref())
        .set_opt("TARGET_REPO", config.target_repo.as_deref());

    assemble_job(
        ctx,
        SafeOutputJobParts {
            job_name: CREATE_DISCUSSION_JOB,
            step_name: "Create Discussion",
            script: "create_discussion",
            permissions: PermissionSet::new()
                .read(PermissionScope::Contents)
                .write(PermissionScope::Discussions),
            env: env.into_vars(),
            output_keys: &["discussion_number", "discussion_url"],
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

    #[test]
    fn create_issue_reads_prefix_and_labels() {
        let raw: Mapping = serde_yaml::from_str(
            "create-issue:\n  title-prefix: '[bot] '\n  labels: [automation, triage]\n  max: 3\n",
        )
        .expect("mapping");
        let config = parse_create_issue(&raw).expect("parse").expect("declared");
        assert_eq!(config.max, 3);
        assert_eq!(config.title_prefix.as_deref(), Some("[bot]"));
        assert_eq!(config.labels, vec!["automation", "triage"]);
    }

    #[test]
    fn create_discussion_defaults_to_one() {
        let raw: Mapping = serde_yaml::from_str("create-discussion:\n").expect("mapping");
        let config = parse_create_discussion(&raw).expect("parse").expect("declared");
        assert_eq!(config.max, 1);
        assert_eq!(config.category, None);
    }
}
