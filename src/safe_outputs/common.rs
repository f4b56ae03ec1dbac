use crate::config::{CompileError, CompilerOptions, WorkflowSpec};
use crate::jobs::conditions::{safe_output_gate, Condition};
use crate::jobs::step::{
    download_agent_output_step, helper_preamble, script_step, with_checkout_grant,
    AGENT_OUTPUT_ARTIFACT, SAFE_OUTPUTS_DIR,
};
use crate::jobs::{job_name, JobRole, JobSpec, Step};
use crate::permissions::PermissionSet;
use crate::shared::serde_ext::yaml_string_list;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

pub const SAFE_OUTPUT_JOB_TIMEOUT_MINUTES: u32 = 10;
pub const COMMON_KEYS: [&str; 2] = ["max", "github-token"];
pub const TRIGGERING_TARGET: &str = "triggering";

/// How a kind derives its effective `max`. Zero means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxPolicy {
    Default(u32),
    /// The effective max is always this value, whatever the user configured.
    Fixed(u32),
}

impl MaxPolicy {
    pub fn resolve(self, kind: &str, configured: Option<u32>) -> u32 {
        match (self, configured) {
            (Self::Fixed(limit), Some(value)) if value != limit => {
                tracing::debug!(kind, configured = value, limit, "fixed-limit max applied");
                limit
            }
            (Self::Fixed(limit), _) => limit,
            (Self::Default(_), Some(value)) => value,
            (Self::Default(default), None) => default,
        }
    }
}

/// Extracts the configuration mapping for `key`. `false` disables the kind,
/// `null`/`true` enable it with defaults. A bare list is accepted for kinds
/// that name a `list_field` shorthand.
pub fn declaration_map(raw: &Mapping, key: &str, list_field: Option<&str>) -> Option<Mapping> {
    let value = raw.get(key)?;
    match value {
        Value::Bool(false) => None,
        Value::Null | Value::Bool(true) => Some(Mapping::new()),
        Value::Mapping(map) => Some(map.clone()),
        Value::Sequence(_) if list_field.is_some() => {
            let mut map = Mapping::new();
            map.insert(Value::String(list_field.unwrap_or_default().to_string()), value.clone());
            Some(map)
        }
        other => {
            tracing::warn!(kind = key, value = ?other, "unsupported safe output value; using defaults");
            Some(Mapping::new())
        }
    }
}

pub fn warn_unknown_keys(kind: &str, map: &Mapping, known: &[&str]) {
    for key in map.keys() {
        let name = key.as_str().unwrap_or("<non-string>");
        if !COMMON_KEYS.contains(&name) && !known.contains(&name) {
            tracing::warn!(kind, key = name, "unknown safe output option ignored");
        }
    }
}

pub fn parse_max(kind: &str, map: &Mapping) -> Option<u32> {
    let value = map.get("max")?;
    let parsed = match value {
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(raw) => raw.trim().parse::<u32>().ok(),
        _ => None,
    };
    if parsed.is_none() {
        tracing::warn!(kind, value = ?value, "malformed `max` ignored; using default");
    }
    parsed
}

pub fn parse_string(kind: &str, map: &Mapping, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(raw) if !raw.trim().is_empty() => Some(raw.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Null => None,
        other => {
            tracing::warn!(kind, key, value = ?other, "expected a string; option ignored");
            None
        }
    }
}

pub fn parse_string_list(kind: &str, map: &Mapping, key: &str) -> Vec<String> {
    let Some(value) = map.get(key) else {
        return Vec::new();
    };
    match yaml_string_list(value) {
        Ok(items) => items.into_iter().filter(|item| !item.is_empty()).collect(),
        Err(err) => {
            tracing::warn!(kind, key, "{err}; option ignored");
            Vec::new()
        }
    }
}

pub fn parse_bool(kind: &str, map: &Mapping, key: &str) -> bool {
    match map.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(other) => {
            tracing::warn!(kind, key, value = ?other, "expected a boolean; option ignored");
            false
        }
    }
}

/// Options a kind may enable by presence alone (`title:` under update-issue).
pub fn parse_presence_flag(map: &Mapping, key: &str) -> bool {
    !matches!(map.get(key), None | Some(Value::Bool(false)))
}

/// Wildcard repositories would let one declaration act on any repository.
pub fn parse_target_repo(kind: &str, map: &Mapping) -> Result<Option<String>, CompileError> {
    let repo = parse_string(kind, map, "target-repo");
    if repo.as_deref() == Some("*") {
        return Err(CompileError::WildcardTargetRepo {
            key: kind.to_string(),
        });
    }
    Ok(repo)
}

pub fn parse_target(kind: &str, map: &Mapping) -> Option<String> {
    parse_string(kind, map, "target")
}

pub fn targets_triggering_entity(target: Option<&str>) -> bool {
    matches!(target, None | Some(TRIGGERING_TARGET))
}

/// Everything a safe-output builder needs from the surrounding compilation.
#[derive(Debug, Clone, Copy)]
pub struct SafeOutputContext<'a> {
    pub spec: &'a WorkflowSpec,
    pub options: &'a CompilerOptions,
    pub main_job: &'a str,
    pub staged: bool,
    pub github_token: Option<&'a str>,
    /// Job names of every declared safe output, in emission order.
    pub declared: &'a [&'static str],
}

impl SafeOutputContext<'_> {
    pub fn is_declared(&self, job_name: &str) -> bool {
        self.declared.contains(&job_name)
    }

    pub fn common_env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("GH_AW_WORKFLOW_NAME".to_string(), self.spec.name.clone());
        env.insert(
            "GH_AW_AGENT_OUTPUT".to_string(),
            format!("{SAFE_OUTPUTS_DIR}/{AGENT_OUTPUT_ARTIFACT}"),
        );
        if let Some(source) = &self.spec.source {
            env.insert("GH_AW_WORKFLOW_SOURCE".to_string(), source.clone());
        }
        if let Some(tracker_id) = &self.spec.tracker_id {
            env.insert("GH_AW_TRACKER_ID".to_string(), tracker_id.clone());
        }
        if self.staged {
            env.insert("GH_AW_SAFE_OUTPUTS_STAGED".to_string(), "true".to_string());
        }
        env
    }
}

/// Kind-specific environment under a fixed prefix: `<PREFIX>_<SUFFIX>`.
#[derive(Debug, Clone)]
pub struct PrefixedEnv {
    prefix: &'static str,
    vars: BTreeMap<String, String>,
}

impl PrefixedEnv {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            vars: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, suffix: &str, value: impl Into<String>) -> &mut Self {
        self.vars
            .insert(format!("{}_{suffix}", self.prefix), value.into());
        self
    }

    pub fn set_opt(&mut self, suffix: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.set(suffix, value);
        }
        self
    }

    pub fn set_list(&mut self, suffix: &str, values: &[String]) -> &mut Self {
        if !values.is_empty() {
            self.set(suffix, values.join(","));
        }
        self
    }

    pub fn set_flag(&mut self, suffix: &str, enabled: bool) -> &mut Self {
        if enabled {
            self.set(suffix, "true");
        }
        self
    }

    pub fn into_vars(self) -> BTreeMap<String, String> {
        self.vars
    }
}

/// Shape shared by every safe-output job.
#[derive(Debug, Clone)]
pub struct SafeOutputJobParts<'a> {
    pub job_name: &'a str,
    pub step_name: &'a str,
    pub script: &'a str,
    pub permissions: PermissionSet,
    pub env: BTreeMap<String, String>,
    pub output_keys: &'a [&'a str],
    pub extra_condition: Option<Condition>,
    pub github_token: Option<&'a str>,
    pub trailing_steps: Vec<Step>,
    /// Earlier safe-output jobs whose outputs this job reads.
    pub extra_needs: Vec<&'a str>,
}

pub fn assemble_job(ctx: &SafeOutputContext<'_>, parts: SafeOutputJobParts<'_>) -> JobSpec {
    let mut job = JobSpec::new(job_name(parts.job_name), JobRole::SafeOutput, ctx.spec.runs_on());
    job.needs = vec![job_name(ctx.main_job)];
    job.needs
        .extend(parts.extra_needs.iter().map(|need| job_name(need)));
    job.permissions = with_checkout_grant(parts.permissions, ctx.options).into();
    job.timeout_minutes = Some(SAFE_OUTPUT_JOB_TIMEOUT_MINUTES);

    let mut condition = safe_output_gate(ctx.main_job, parts.job_name);
    if let Some(extra) = parts.extra_condition {
        condition = condition.and(extra);
    }
    job.condition = Some(condition.render());

    let mut env = ctx.common_env();
    env.extend(parts.env);
    job.env = env;

    let mut steps = helper_preamble(ctx.options);
    steps.push(download_agent_output_step());
    let mut script = script_step(parts.step_name, parts.job_name, parts.script);
    if let Some(token) = parts.github_token.or(ctx.github_token) {
        script = script.with_input("github-token", token);
    }
    steps.push(script);
    steps.extend(parts.trailing_steps);
    job.steps = steps;

    job.outputs = parts
        .output_keys
        .iter()
        .map(|key| {
            (
                key.to_string(),
                format!("${{{{ steps.{}.outputs.{key} }}}}", parts.job_name),
            )
        })
        .collect();
    job
}
