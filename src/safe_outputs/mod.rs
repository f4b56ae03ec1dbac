//! Safe outputs: structured actions the agent requests through its output
//! file and that separate, minimally privileged jobs carry out.

pub mod assign_to_agent;
pub mod code_scanning;
pub mod comment;
pub mod common;
pub mod create;
pub mod dispatch;
pub mod entity_ops;
pub mod reporting;

pub use assign_to_agent::AssignToAgentConfig;
pub use code_scanning::CodeScanningAlertConfig;
pub use comment::{AddCommentConfig, AddLabelsConfig, SubmitReviewConfig};
pub use common::{MaxPolicy, SafeOutputContext};
pub use create::{CreateDiscussionConfig, CreateIssueConfig};
pub use dispatch::DispatchWorkflowConfig;
pub use entity_ops::{
    entity_operation, EntityOperationConfig, EntityOperationDefinition, ENTITY_OPERATIONS,
};
pub use reporting::{ReportingConfig, ReportingKind};

use crate::config::{CompileError, CompilerOptions, WorkflowSpec};
use crate::jobs::JobSpec;
use serde_json::json;
use serde_yaml::{Mapping, Value};

const GLOBAL_KEYS: [&str; 2] = ["staged", "github-token"];

/// Every declarable key in emission order. Jobs that read another safe
/// output's results come after it.
pub const SAFE_OUTPUT_KEYS: [&str; 16] = [
    "create-issue",
    "create-discussion",
    "add-comment",
    "add-labels",
    "submit-pull-request-review",
    "close-issue",
    "close-pull-request",
    "close-discussion",
    "update-issue",
    "update-pull-request",
    "update-discussion",
    "create-code-scanning-alert",
    "dispatch-workflow",
    "assign-to-agent",
    "missing-tool",
    "missing-data",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafeOutputDeclaration {
    CreateIssue(CreateIssueConfig),
    CreateDiscussion(CreateDiscussionConfig),
    AddComment(AddCommentConfig),
    AddLabels(AddLabelsConfig),
    SubmitPullRequestReview(SubmitReviewConfig),
    EntityOperation(&'static EntityOperationDefinition, EntityOperationConfig),
    CreateCodeScanningAlert(CodeScanningAlertConfig),
    DispatchWorkflow(DispatchWorkflowConfig),
    AssignToAgent(AssignToAgentConfig),
    Reporting(ReportingKind, ReportingConfig),
}

impl SafeOutputDeclaration {
    pub fn config_key(&self) -> &'static str {
        match self {
            Self::CreateIssue(_) => create::CREATE_ISSUE_KEY,
            Self::CreateDiscussion(_) => create::CREATE_DISCUSSION_KEY,
            Self::AddComment(_) => comment::ADD_COMMENT_KEY,
            Self::AddLabels(_) => comment::ADD_LABELS_KEY,
            Self::SubmitPullRequestReview(_) => comment::SUBMIT_REVIEW_KEY,
            Self::EntityOperation(definition, _) => definition.config_key,
            Self::CreateCodeScanningAlert(_) => code_scanning::CODE_SCANNING_KEY,
            Self::DispatchWorkflow(_) => dispatch::DISPATCH_WORKFLOW_KEY,
            Self::AssignToAgent(_) => assign_to_agent::ASSIGN_TO_AGENT_KEY,
            Self::Reporting(kind, _) => kind.config_key(),
        }
    }

    /// Tag the agent puts on output items of this kind; also the job name.
    pub fn output_type(&self) -> &'static str {
        match self {
            Self::CreateIssue(_) => create::CREATE_ISSUE_JOB,
            Self::CreateDiscussion(_) => create::CREATE_DISCUSSION_JOB,
            Self::AddComment(_) => comment::ADD_COMMENT_JOB,
            Self::AddLabels(_) => comment::ADD_LABELS_JOB,
            Self::SubmitPullRequestReview(_) => comment::SUBMIT_REVIEW_JOB,
            Self::EntityOperation(definition, _) => definition.job_name,
            Self::CreateCodeScanningAlert(_) => code_scanning::CODE_SCANNING_JOB,
            Self::DispatchWorkflow(_) => dispatch::DISPATCH_WORKFLOW_JOB,
            Self::AssignToAgent(_) => assign_to_agent::ASSIGN_TO_AGENT_JOB,
            Self::Reporting(kind, _) => kind.job_name(),
        }
    }

    pub fn max(&self) -> u32 {
        match self {
            Self::CreateIssue(config) => config.max,
            Self::CreateDiscussion(config) => config.max,
            Self::AddComment(config) => config.max,
            Self::AddLabels(config) => config.max,
            Self::SubmitPullRequestReview(config) => config.max,
            Self::EntityOperation(_, config) => config.max,
            Self::CreateCodeScanningAlert(config) => config.max,
            Self::DispatchWorkflow(config) => config.max,
            Self::AssignToAgent(config) => config.max,
            Self::Reporting(_, config) => config.max,
        }
    }

    pub fn build_job(&self, ctx: &SafeOutputContext<'_>) -> JobSpec {
        match self {
            Self::CreateIssue(config) => create::build_create_issue(ctx, config),
            Self::CreateDiscussion(config) => create::build_create_discussion(ctx, config),
            Self::AddComment(config) => comment::build_add_comment(ctx, config),
            Self::AddLabels(config) => comment::build_add_labels(ctx, config),
            Self::SubmitPullRequestReview(config) => comment::build_submit_review(ctx, config),
            Self::EntityOperation(definition, config) => {
                entity_ops::build_job(ctx, definition, config)
            }
            Self::CreateCodeScanningAlert(config) => {
                code_scanning::build_code_scanning_alert(ctx, config)
            }
            Self::DispatchWorkflow(config) => dispatch::build_dispatch_workflow(ctx, config),
            Self::AssignToAgent(config) => assign_to_agent::build_assign_to_agent(ctx, config),
            Self::Reporting(kind, config) => reporting::build_reporting(ctx, *kind, config),
        }
    }

    /// Per-kind entry of the configuration document handed to the agent's
    /// safe-output tool server.
    fn tool_config(&self) -> serde_json::Value {
        let mut entry = json!({ "max": self.max() });
        match self {
            Self::AddLabels(config) if !config.allowed.is_empty() => {
                entry["allowed"] = json!(config.allowed);
            }
            Self::DispatchWorkflow(config) => {
                entry["workflows"] = json!(config.workflows);
            }
            Self::CreateDiscussion(config) => {
                if let Some(category) = &config.category {
                    entry["category"] = json!(category);
                }
            }
            _ => {}
        }
        entry
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafeOutputsConfig {
    pub declarations: Vec<SafeOutputDeclaration>,
    pub staged: bool,
    pub github_token: Option<String>,
}

impl SafeOutputsConfig {
    pub fn from_spec(spec: &WorkflowSpec, options: &CompilerOptions) -> Result<Self, CompileError> {
        match &spec.safe_outputs {
            Some(raw) => Self::parse(raw, spec, options),
            None => Ok(Self::default()),
        }
    }

    pub fn parse(
        raw: &Mapping,
        spec: &WorkflowSpec,
        options: &CompilerOptions,
    ) -> Result<Self, CompileError> {
        for key in raw.keys() {
            let name = key.as_str().unwrap_or("<non-string>");
            if !SAFE_OUTPUT_KEYS.contains(&name) && !GLOBAL_KEYS.contains(&name) {
                tracing::warn!(key = name, "unknown safe output ignored");
            }
        }

        let mut declarations = Vec::new();
        if let Some(config) = create::parse_create_issue(raw)? {
            declarations.push(SafeOutputDeclaration::CreateIssue(config));
        }
        if let Some(config) = create::parse_create_discussion(raw)? {
            declarations.push(SafeOutputDeclaration::CreateDiscussion(config));
        }
        if let Some(config) = comment::parse_add_comment(raw)? {
            declarations.push(SafeOutputDeclaration::AddComment(config));
        }
        if let Some(config) = comment::parse_add_labels(raw)? {
            declarations.push(SafeOutputDeclaration::AddLabels(config));
        }
        if let Some(config) = comment::parse_submit_review(raw)? {
            declarations.push(SafeOutputDeclaration::SubmitPullRequestReview(config));
        }
        for definition in &ENTITY_OPERATIONS {
            if let Some(config) = entity_ops::parse_config(raw, definition)? {
                declarations.push(SafeOutputDeclaration::EntityOperation(definition, config));
            }
        }
        if let Some(config) = code_scanning::parse_code_scanning_alert(raw) {
            declarations.push(SafeOutputDeclaration::CreateCodeScanningAlert(config));
        }
        if let Some(config) = dispatch::parse_dispatch_workflow(raw, spec, options)? {
            declarations.push(SafeOutputDeclaration::DispatchWorkflow(config));
        }
        if let Some(config) = assign_to_agent::parse_assign_to_agent(raw)? {
            declarations.push(SafeOutputDeclaration::AssignToAgent(config));
        }

        // Only enabled outputs count; `create-issue: false` declares nothing.
        let declares_anything = !declarations.is_empty();
        match reporting::parse_reporting(raw, ReportingKind::MissingTool) {
            Some(config) => {
                declarations.push(SafeOutputDeclaration::Reporting(ReportingKind::MissingTool, config))
            }
            // Enabled with defaults alongside any other safe output unless
            // explicitly switched off.
            None if declares_anything && !raw.contains_key("missing-tool") => {
                declarations.push(SafeOutputDeclaration::Reporting(
                    ReportingKind::MissingTool,
                    ReportingConfig::default(),
                ))
            }
            None => {}
        }
        if let Some(config) = reporting::parse_reporting(raw, ReportingKind::MissingData) {
            declarations.push(SafeOutputDeclaration::Reporting(ReportingKind::MissingData, config));
        }

        let staged = match raw.get("staged") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(other) => {
                tracing::warn!(value = ?other, "`safe-outputs.staged` must be a boolean; ignored");
                false
            }
        };
        let github_token = raw
            .get("github-token")
            .and_then(Value::as_str)
            .map(str::to_string);

        tracing::debug!(
            workflow = %spec.id,
            count = declarations.len(),
            staged,
            "parsed safe outputs"
        );
        Ok(Self {
            declarations,
            staged,
            github_token,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn output_types(&self) -> Vec<&'static str> {
        self.declarations
            .iter()
            .map(SafeOutputDeclaration::output_type)
            .collect()
    }

    pub fn get(&self, output_type: &str) -> Option<&SafeOutputDeclaration> {
        self.declarations
            .iter()
            .find(|declaration| declaration.output_type() == output_type)
    }

    /// Configuration document for the agent's safe-output tool server.
    pub fn tool_config_json(&self) -> String {
        let mut entries = serde_json::Map::new();
        for declaration in &self.declarations {
            entries.insert(
                declaration.output_type().to_string(),
                declaration.tool_config(),
            );
        }
        serde_json::Value::Object(entries).to_string()
    }

    /// One job per declaration, each gated on the main job's tagged output.
    pub fn build_jobs(
        &self,
        spec: &WorkflowSpec,
        options: &CompilerOptions,
        main_job: &str,
    ) -> Vec<JobSpec> {
        let declared = self.output_types();
        let ctx = SafeOutputContext {
            spec,
            options,
            main_job,
            staged: self.staged,
            github_token: self.github_token.as_deref(),
            declared: &declared,
        };
        self.declarations
            .iter()
            .map(|declaration| declaration.build_job(&ctx))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_with(safe_outputs: &str) -> WorkflowSpec {
        let yaml = format!("id: triage\non: issues\nsafe-outputs:\n{safe_outputs}");
        WorkflowSpec::from_yaml_str(&yaml).expect("spec")
    }

    fn parse(spec: &WorkflowSpec) -> SafeOutputsConfig {
        SafeOutputsConfig::from_spec(spec, &CompilerOptions::dev()).expect("safe outputs")
    }

    #[test]
    fn declarations_follow_emission_order_and_add_missing_tool() {
        let spec = spec_with("  close-issue: {}\n  add-labels: [bug]\n  create-issue:\n");
        let config = parse(&spec);
        assert_eq!(
            config.output_types(),
            vec!["create_issue", "add_labels", "close_issue", "missing_tool"]
        );
    }

    #[test]
    fn missing_tool_can_be_switched_off() {
        let spec = spec_with("  close-issue: {}\n  missing-tool: false\n");
        assert_eq!(parse(&spec).output_types(), vec!["close_issue"]);
    }

    #[test]
    fn disabled_outputs_do_not_enable_missing_tool() {
        let spec = spec_with("  create-issue: false\n  add-labels: false\n");
        let config = parse(&spec);
        assert!(config.is_empty(), "{:?}", config.output_types());
        assert!(config
            .build_jobs(&spec, &CompilerOptions::dev(), "agent")
            .is_empty());
    }

    #[test]
    fn staged_mode_marks_every_job() {
        let spec = spec_with("  staged: true\n  create-issue: {}\n");
        let config = parse(&spec);
        let jobs = config.build_jobs(&spec, &CompilerOptions::dev(), "agent");
        assert_eq!(jobs.len(), 2);
        for job in jobs {
            assert_eq!(
                job.env.get("GH_AW_SAFE_OUTPUTS_STAGED").map(String::as_str),
                Some("true")
            );
        }
    }

    #[test]
    fn tool_config_lists_each_kind_with_its_max() {
        let spec = spec_with("  add-labels:\n    allowed: [bug]\n    max: 2\n");
        let parsed: serde_json::Value =
            serde_json::from_str(&parse(&spec).tool_config_json()).expect("json");
        assert_eq!(parsed["add_labels"]["max"], 2);
        assert_eq!(parsed["add_labels"]["allowed"][0], "bug");
        assert_eq!(parsed["missing_tool"]["max"], 0);
    }
}
