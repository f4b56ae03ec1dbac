//! `missing-tool` and `missing-data` let the agent report what it could not
//! do. Both collect reports and can optionally open a tracking issue.

use super::common::{
    assemble_job, declaration_map, parse_bool, parse_max, parse_string, parse_string_list,
    warn_unknown_keys, MaxPolicy, PrefixedEnv, SafeOutputContext, SafeOutputJobParts,
};
use crate::jobs::JobSpec;
use crate::permissions::{PermissionScope, PermissionSet};
use serde_yaml::Mapping;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportingKind {
    MissingTool,
    MissingData,
}

impl ReportingKind {
    pub fn config_key(self) -> &'static str {
        match self {
            Self::MissingTool => "missing-tool",
            Self::MissingData => "missing-data",
        }
    }

    pub fn job_name(self) -> &'static str {
        match self {
            Self::MissingTool => "missing_tool",
            Self::MissingData => "missing_data",
        }
    }

    fn env_prefix(self) -> &'static str {
        match self {
            Self::MissingTool => "GH_AW_MISSING_TOOL",
            Self::MissingData => "GH_AW_MISSING_DATA",
        }
    }

    fn step_name(self) -> &'static str {
        match self {
            Self::MissingTool => "Record Missing Tool",
            Self::MissingData => "Record Missing Data",
        }
    }

    fn default_title_prefix(self) -> &'static str {
        match self {
            Self::MissingTool => "[missing tool]",
            Self::MissingData => "[missing data]",
        }
    }

    fn output_keys(self) -> &'static [&'static str] {
        match self {
            Self::MissingTool => &["tools_reported", "total_count"],
            Self::MissingData => &["data_reported", "total_count"],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportingConfig {
    /// Zero means unlimited reports.
    pub max: u32,
    pub create_issue: bool,
    pub title_prefix: Option<String>,
    pub labels: Vec<String>,
    pub github_token: Option<String>,
}

pub fn parse_reporting(raw: &Mapping, kind: ReportingKind) -> Option<ReportingConfig> {
    let key = kind.config_key();
    let map = declaration_map(raw, key, None)?;
    warn_unknown_keys(key, &map, &["create-issue", "title-prefix", "labels"]);
    Some(ReportingConfig {
        max: MaxPolicy::Default(0).resolve(key, parse_max(key, &map)),
        create_issue: parse_bool(key, &map, "create-issue"),
        title_prefix: parse_string(key, &map, "title-prefix"),
        labels: parse_string_list(key, &map, "labels"),
        github_token: parse_string(key, &map, "github-token"),
    })
}

pub fn build_reporting(
    ctx: &SafeOutputContext<'_>,
    kind: ReportingKind,
    config: &ReportingConfig,
) -> JobSpec {
    let mut env = PrefixedEnv::new(kind.env_prefix());
    env.set("MAX", config.max.to_string());
    let mut permissions = PermissionSet::new().read(PermissionScope::Contents);
    if config.create_issue {
        env.set("CREATE_ISSUE", "true")
            .set(
                "TITLE_PREFIX",
                config
                    .title_prefix
                    .as_deref()
                    .unwrap_or(kind.default_title_prefix()),
            )
            .set_list("LABELS", &config.labels);
        permissions = permissions.write(PermissionScope::Issues);
    }

    assemble_job(
        ctx,
        SafeOutputJobParts {
            job_name: kind.job_name(),
            step_name: kind.step_name(),
            script: kind.job_name(),
            permissions,
            env: env.into_vars(),
            output_keys: kind.output_keys(),
            extra_condition: None,
            github_token: config.github_token.as_deref(),
            trailing_steps: Vec::new(),
            extra_needs: Vec::new(),
        },
    )
}
