//! Static registry of GitHub tool-server toolsets and the permissions each one
//! needs in read-only and read-write mode.

pub mod inference;

pub use inference::{expand_toolset_names, infer_from_defaults, infer_from_toolsets};

use crate::permissions::PermissionScope;
use PermissionScope::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolsetDefinition {
    pub name: &'static str,
    pub tools: &'static [&'static str],
    pub read_scopes: &'static [PermissionScope],
    pub write_scopes: &'static [PermissionScope],
}

pub const DEFAULT_TOOLSETS: [&str; 4] = ["context", "repos", "issues", "pull_requests"];

pub const TOOLSET_DEFINITIONS: &[ToolsetDefinition] = &[
    ToolsetDefinition {
        name: "context",
        tools: &["get_me", "get_team_members", "get_teams"],
        read_scopes: &[],
        write_scopes: &[],
    },
    ToolsetDefinition {
        name: "repos",
        tools: &[
            "get_file_contents",
            "list_branches",
            "list_commits",
            "get_commit",
            "list_releases",
            "search_code",
            "create_branch",
            "create_or_update_file",
            "push_files",
        ],
        read_scopes: &[Contents],
        write_scopes: &[Contents],
    },
    ToolsetDefinition {
        name: "issues",
        tools: &[
            "issue_read",
            "list_issues",
            "search_issues",
            "add_issue_comment",
            "issue_write",
            "sub_issue_write",
        ],
        read_scopes: &[Issues],
        write_scopes: &[Issues],
    },
    ToolsetDefinition {
        name: "pull_requests",
        tools: &[
            "pull_request_read",
            "list_pull_requests",
            "search_pull_requests",
            "create_pull_request",
            "update_pull_request",
            "merge_pull_request",
            "pull_request_review_write",
        ],
        read_scopes: &[PullRequests],
        write_scopes: &[PullRequests],
    },
    ToolsetDefinition {
        name: "actions",
        tools: &[
            "list_workflows",
            "list_workflow_runs",
            "get_workflow_run",
            "get_job_logs",
            "run_workflow",
            "rerun_workflow_run",
        ],
        read_scopes: &[Actions],
        write_scopes: &[Actions],
    },
    ToolsetDefinition {
        name: "code_security",
        tools: &["list_code_scanning_alerts", "get_code_scanning_alert"],
        read_scopes: &[SecurityEvents],
        write_scopes: &[SecurityEvents],
    },
    ToolsetDefinition {
        name: "dependabot",
        tools: &["list_dependabot_alerts", "get_dependabot_alert"],
        read_scopes: &[SecurityEvents],
        write_scopes: &[SecurityEvents],
    },
    ToolsetDefinition {
        name: "discussions",
        tools: &[
            "list_discussions",
            "get_discussion",
            "get_discussion_comments",
            "list_discussion_categories",
        ],
        read_scopes: &[Discussions],
        write_scopes: &[Discussions],
    },
    ToolsetDefinition {
        name: "experiments",
        tools: &[],
        read_scopes: &[],
        write_scopes: &[],
    },
    ToolsetDefinition {
        name: "gists",
        tools: &["list_gists", "get_gist", "create_gist", "update_gist"],
        read_scopes: &[],
        write_scopes: &[],
    },
    ToolsetDefinition {
        name: "labels",
        tools: &["get_label", "list_label", "label_write"],
        read_scopes: &[Issues],
        write_scopes: &[Issues],
    },
    ToolsetDefinition {
        name: "notifications",
        tools: &["list_notifications", "get_notification_details"],
        read_scopes: &[],
        write_scopes: &[],
    },
    ToolsetDefinition {
        name: "orgs",
        tools: &["search_orgs"],
        read_scopes: &[],
        write_scopes: &[],
    },
    ToolsetDefinition {
        name: "projects",
        tools: &["list_projects", "get_project", "list_project_items"],
        read_scopes: &[RepositoryProjects],
        write_scopes: &[RepositoryProjects],
    },
    ToolsetDefinition {
        name: "secret_protection",
        tools: &["list_secret_scanning_alerts", "get_secret_scanning_alert"],
        read_scopes: &[SecurityEvents],
        write_scopes: &[SecurityEvents],
    },
    ToolsetDefinition {
        name: "security_advisories",
        tools: &[
            "list_global_security_advisories",
            "get_global_security_advisory",
            "list_repository_security_advisories",
        ],
        read_scopes: &[SecurityEvents],
        write_scopes: &[SecurityEvents],
    },
    ToolsetDefinition {
        name: "stargazers",
        tools: &["list_starred_repositories"],
        read_scopes: &[],
        write_scopes: &[],
    },
    ToolsetDefinition {
        name: "users",
        tools: &["search_users"],
        read_scopes: &[],
        write_scopes: &[],
    },
];

/// Unknown names yield `None` so older or newer registries never fail a compile.
pub fn toolset_permissions(name: &str) -> Option<&'static ToolsetDefinition> {
    TOOLSET_DEFINITIONS
        .iter()
        .find(|definition| definition.name == name)
}

impl ToolsetDefinition {
    pub fn required_scopes(&self, read_only: bool) -> &'static [PermissionScope] {
        if read_only {
            self.read_scopes
        } else {
            self.write_scopes
        }
    }
}
