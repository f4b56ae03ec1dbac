use super::common::{
    assemble_job, declaration_map, parse_max, parse_string, warn_unknown_keys, MaxPolicy,
    PrefixedEnv, SafeOutputContext, SafeOutputJobParts,
};
use crate::jobs::step::UPLOAD_ARTIFACT_ACTION;
use crate::jobs::{JobSpec, Step};
use crate::permissions::{PermissionScope, PermissionSet};
use serde_yaml::Mapping;

pub const CODE_SCANNING_KEY: &str = "create-code-scanning-alert";
pub const CODE_SCANNING_JOB: &str = "create_code_scanning_alert";
pub const UPLOAD_SARIF_ACTION: &str = "github/codeql-action/upload-sarif@v3";
pub const DEFAULT_DRIVER: &str = "GitHub Agentic Workflows Security Scanner";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeScanningAlertConfig {
    /// Zero means unlimited findings.
    pub max: u32,
    pub driver: Option<String>,
    pub github_token: Option<String>,
}

pub fn parse_code_scanning_alert(raw: &Mapping) -> Option<CodeScanningAlertConfig> {
    let kind = CODE_SCANNING_KEY;
    let map = declaration_map(raw, kind, None)?;
    warn_unknown_keys(kind, &map, &["driver"]);
    Some(CodeScanningAlertConfig {
        max: MaxPolicy::Default(0).resolve(kind, parse_max(kind, &map)),
        driver: parse_string(kind, &map, "driver"),
        github_token: parse_string(kind, &map, "github-token"),
    })
}

pub fn build_code_scanning_alert(
    ctx: &SafeOutputContext<'_>,
    config: &CodeScanningAlertConfig,
) -> JobSpec {
    let mut env = PrefixedEnv::new("GH_AW_SECURITY_REPORT");
    env.set("MAX", config.max.to_string())
        .set("DRIVER", config.driver.as_deref().unwrap_or(DEFAULT_DRIVER));
    let mut env = env.into_vars();
    env.insert("GH_AW_WORKFLOW_FILENAME".to_string(), ctx.spec.id.to_string());

    let sarif_present = format!(
        "always() && steps.{CODE_SCANNING_JOB}.outputs.sarif_file"
    );
    let trailing_steps = vec![
        Step::uses("Upload SARIF artifact", UPLOAD_ARTIFACT_ACTION)
            .with_condition(sarif_present.clone())
            .with_input("name", "code-scanning-alert.sarif")
            .with_input(
                "path",
                format!("${{{{ steps.{CODE_SCANNING_JOB}.outputs.sarif_file }}}}"),
            ),
        Step::uses("Upload SARIF to GitHub Security", UPLOAD_SARIF_ACTION)
            .with_condition(sarif_present)
            .with_input(
                "sarif_file",
                format!("${{{{ steps.{CODE_SCANNING_JOB}.outputs.sarif_file }}}}"),
            )
            .with_input("category", format!("gh-aw-{}", ctx.spec.id)),
    ];

    assemble_job(
        ctx,
        SafeOutputJobParts {
            job_name: CODE_SCANNING_JOB,
            step_name: "Create Code Scanning Alert",
            script: "create_code_scanning_alert",
            permissions: PermissionSet::new()
                .read(PermissionScope::Contents)
                .write(PermissionScope::SecurityEvents),
            env,
            output_keys: &["sarif_file", "findings_count"],
            extra_condition: None,
            github_token: config.github_token.as_deref(),
            trailing_steps,
            extra_needs: Vec::new(),
        },
    )
}
