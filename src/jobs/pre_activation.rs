use super::conditions::Condition;
use super::step::{helper_preamble, script_step, with_checkout_grant, Step};
use super::stop_time::resolve_stop_time;
use super::{job_name, JobRole, JobSpec, PRE_ACTIVATION_JOB};
use crate::config::{CompileError, CompilerOptions, TriggerCategory, WorkflowSpec};
use crate::permissions::{PermissionLevel, PermissionScope, PermissionSet};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

pub const VALID_REACTIONS: [&str; 8] = [
    "+1", "-1", "laugh", "confused", "heart", "hooray", "rocket", "eyes",
];
pub const NO_REACTION: &str = "none";
pub const ACTIVATED_OUTPUT: &str = "activated";

const MEMBERSHIP_STEP: &str = "check_membership";
const STOP_TIME_STEP: &str = "check_stop_time";
const REACTION_STEP: &str = "react";

/// Custom steps and outputs from the `pre-activation:` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreActivationCustomization {
    pub steps: Vec<Step>,
    pub outputs: BTreeMap<String, String>,
}

impl PreActivationCustomization {
    pub fn from_value(value: Option<&Value>) -> Result<Self, CompileError> {
        let Some(value) = value else {
            return Ok(Self::default());
        };
        let map = match value {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(map) => map,
            _ => {
                return Err(CompileError::invalid_field(
                    "pre-activation",
                    "expected a mapping with `steps` and/or `outputs`",
                ))
            }
        };
        for key in map.keys() {
            let name = key.as_str().unwrap_or("<non-string>");
            if name != "steps" && name != "outputs" {
                tracing::warn!(key = name, "unknown pre-activation option ignored");
            }
        }
        Ok(Self {
            steps: parse_steps(map)?,
            outputs: parse_outputs(map)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty() && self.outputs.is_empty()
    }
}

fn parse_steps(map: &Mapping) -> Result<Vec<Step>, CompileError> {
    let field = "pre-activation.steps";
    match map.get("steps") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                if !item.is_mapping() {
                    return Err(CompileError::invalid_field(
                        field,
                        format!("step {index} must be a mapping"),
                    ));
                }
                serde_yaml::from_value::<Step>(item.clone()).map_err(|err| {
                    CompileError::invalid_field(field, format!("step {index}: {err}"))
                })
            })
            .collect(),
        Some(_) => Err(CompileError::invalid_field(field, "expected a list of steps")),
    }
}

fn parse_outputs(map: &Mapping) -> Result<BTreeMap<String, String>, CompileError> {
    let field = "pre-activation.outputs";
    match map.get("outputs") {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Mapping(entries)) => {
            let mut outputs = BTreeMap::new();
            for (key, value) in entries {
                let (Some(name), Some(expression)) = (key.as_str(), value.as_str()) else {
                    return Err(CompileError::invalid_field(
                        field,
                        "outputs must map names to expression strings",
                    ));
                };
                if name == ACTIVATED_OUTPUT {
                    return Err(CompileError::invalid_field(
                        field,
                        format!("`{ACTIVATED_OUTPUT}` is reserved"),
                    ));
                }
                outputs.insert(name.to_string(), expression.to_string());
            }
            Ok(outputs)
        }
        Some(_) => Err(CompileError::invalid_field(
            field,
            "expected a mapping of output names to expressions",
        )),
    }
}

/// `None` when no reaction is configured or it is `none`.
pub fn validate_reaction(reaction: Option<&str>) -> Result<Option<&str>, CompileError> {
    match reaction.map(str::trim) {
        None | Some("") | Some(NO_REACTION) => Ok(None),
        Some(reaction) if VALID_REACTIONS.contains(&reaction) => Ok(Some(reaction)),
        Some(reaction) => Err(CompileError::InvalidReaction {
            reaction: reaction.to_string(),
            allowed: VALID_REACTIONS.join(", "),
        }),
    }
}

/// Scopes a reaction needs write access to, by the entities the workflow's
/// triggers deliver.
pub fn reaction_permissions(spec: &WorkflowSpec) -> PermissionSet {
    let mut permissions = PermissionSet::new();
    for category in spec.on.categories() {
        let scopes: &[PermissionScope] = match category {
            TriggerCategory::Issue => &[PermissionScope::Issues],
            TriggerCategory::PullRequest => &[PermissionScope::PullRequests],
            TriggerCategory::Discussion => &[PermissionScope::Discussions],
            TriggerCategory::Command => &[PermissionScope::Issues, PermissionScope::PullRequests],
            _ => &[],
        };
        for scope in scopes {
            permissions.set(*scope, PermissionLevel::Write);
        }
    }
    permissions
}

/// Roles the membership check enforces, or `None` when no check is needed.
pub fn membership_roles(spec: &WorkflowSpec) -> Option<Vec<String>> {
    let externally_triggerable = spec
        .on
        .categories()
        .into_iter()
        .any(TriggerCategory::is_externally_triggerable);
    if !externally_triggerable {
        return None;
    }
    spec.required_roles()
}

/// Returns `None` when nothing needs to run before activation.
pub fn build_pre_activation_job(
    spec: &WorkflowSpec,
    options: &CompilerOptions,
) -> Result<Option<JobSpec>, CompileError> {
    let custom = PreActivationCustomization::from_value(spec.pre_activation.as_ref())?;
    let roles = membership_roles(spec);
    let stop_time = spec
        .stop_after
        .as_deref()
        .map(|raw| resolve_stop_time(raw, options.reference_time))
        .transpose()?;
    let mut reaction = validate_reaction(spec.reaction.as_deref())?;
    let reaction_scopes = reaction_permissions(spec);
    if reaction.is_some() && reaction_scopes.is_empty() {
        tracing::warn!(
            workflow = %spec.id,
            "reaction configured but no trigger delivers an issue, pull request or discussion; skipped"
        );
        reaction = None;
    }

    if roles.is_none() && stop_time.is_none() && reaction.is_none() && custom.is_empty() {
        return Ok(None);
    }

    let mut job = JobSpec::new(job_name(PRE_ACTIVATION_JOB), JobRole::PreActivation, spec.runs_on());
    let mut steps = custom.steps;
    let mut checks = Vec::new();
    let mut permissions = PermissionSet::new();
    let scripted = roles.is_some() || stop_time.is_some() || reaction.is_some();
    if scripted {
        steps.extend(helper_preamble(options));
    }

    if let Some(roles) = &roles {
        steps.push(
            script_step("Check team membership for workflow", MEMBERSHIP_STEP, MEMBERSHIP_STEP)
                .with_env("GH_AW_REQUIRED_ROLES", roles.join(",")),
        );
        checks.push(format!(
            "steps.{MEMBERSHIP_STEP}.outputs.is_team_member == 'true'"
        ));
    }
    if let Some(stop_time) = &stop_time {
        steps.push(
            script_step("Check stop-time limit", STOP_TIME_STEP, STOP_TIME_STEP)
                .with_env("GH_AW_STOP_TIME", stop_time.as_str())
                .with_env("GH_AW_WORKFLOW_NAME", spec.name.as_str()),
        );
        checks.push(format!(
            "steps.{STOP_TIME_STEP}.outputs.stop_time_ok == 'true'"
        ));
    }
    if let Some(reaction) = reaction {
        steps.push(
            script_step("Add reaction to the triggering item", REACTION_STEP, "add_reaction")
                .with_env("GH_AW_REACTION", reaction),
        );
        permissions.merge_from(&reaction_scopes);
        job.outputs.insert(
            "reaction_id".to_string(),
            format!("${{{{ steps.{REACTION_STEP}.outputs.reaction-id }}}}"),
        );
    }

    let activated = if checks.is_empty() {
        "true".to_string()
    } else {
        Condition::And(checks.into_iter().map(Condition::Expr).collect()).render()
    };
    job.outputs
        .insert(ACTIVATED_OUTPUT.to_string(), format!("${{{{ {activated} }}}}"));
    job.outputs.extend(custom.outputs);

    job.permissions = if scripted {
        with_checkout_grant(permissions, options).into()
    } else {
        permissions.into()
    };
    job.steps = steps;
    tracing::debug!(
        workflow = %spec.id,
        steps = job.steps.len(),
        "built pre-activation job"
    );
    Ok(Some(job))
}
