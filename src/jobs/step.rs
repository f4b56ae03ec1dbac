use crate::config::CompilerOptions;
use crate::permissions::{PermissionLevel, PermissionScope, PermissionSet};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

pub const CHECKOUT_ACTION: &str = "actions/checkout@v5";
pub const GITHUB_SCRIPT_ACTION: &str = "actions/github-script@v8";
pub const UPLOAD_ARTIFACT_ACTION: &str = "actions/upload-artifact@v4";
pub const DOWNLOAD_ARTIFACT_ACTION: &str = "actions/download-artifact@v5";
pub const SCRIPTS_DIR: &str = "/tmp/gh-aw/actions";
pub const SAFE_OUTPUTS_DIR: &str = "/tmp/gh-aw/safeoutputs";
pub const AGENT_OUTPUT_ARTIFACT: &str = "agent_output.json";

/// One entry of a job's `steps:` list. Opaque to the graph builder; user
/// supplied steps deserialize into the same shape and unknown keys are errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Step {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, rename = "if", skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub with: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_on_error: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<u32>,
}

impl Step {
    pub fn uses(name: &str, action: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            uses: Some(action.to_string()),
            ..Self::default()
        }
    }

    pub fn run(name: &str, script: impl Into<String>) -> Self {
        Self {
            name: Some(name.to_string()),
            run: Some(script.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_input(mut self, key: &str, value: impl Into<String>) -> Self {
        self.with.insert(key.to_string(), Value::String(value.into()));
        self
    }

    pub fn with_bool_input(mut self, key: &str, value: bool) -> Self {
        self.with.insert(key.to_string(), Value::Bool(value));
        self
    }

    pub fn with_env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env.insert(key.to_string(), Value::String(value.into()));
        self
    }

    pub fn with_env_map(mut self, env: &BTreeMap<String, String>) -> Self {
        for (key, value) in env {
            self.env.insert(key.clone(), Value::String(value.clone()));
        }
        self
    }
}

/// Runs `<script>.cjs` from the staged helper directory through github-script.
pub fn script_step(name: &str, id: &str, script: &str) -> Step {
    let body = format!(
        "const {{ setupGlobals }} = require('{SCRIPTS_DIR}/setup_globals.cjs');\nsetupGlobals(core, github, context, exec, io);\nconst {{ main }} = require('{SCRIPTS_DIR}/{script}.cjs');\nawait main();"
    );
    Step::uses(name, GITHUB_SCRIPT_ACTION)
        .with_id(id)
        .with_input("script", body)
}

/// Steps that stage helper scripts. Dev mode needs a sparse checkout of the
/// repository first because the setup action is referenced by local path.
pub fn helper_preamble(options: &CompilerOptions) -> Vec<Step> {
    let mut steps = Vec::new();
    if options.action_mode.requires_checkout() {
        steps.push(
            Step::uses("Checkout actions folder", CHECKOUT_ACTION)
                .with_input("sparse-checkout", "actions")
                .with_bool_input("persist-credentials", false),
        );
    }
    steps.push(
        Step::uses("Setup scripts", &options.setup_action_ref())
            .with_input("destination", SCRIPTS_DIR),
    );
    steps
}

/// Adds `contents: read` when the preamble checks out the repository.
pub fn with_checkout_grant(permissions: PermissionSet, options: &CompilerOptions) -> PermissionSet {
    if !options.action_mode.requires_checkout() {
        return permissions;
    }
    let mut permissions = permissions;
    if permissions.level(PermissionScope::Contents) < PermissionLevel::Read {
        permissions.set(PermissionScope::Contents, PermissionLevel::Read);
    }
    permissions
}

pub fn download_agent_output_step() -> Step {
    Step::uses("Download agent output artifact", DOWNLOAD_ARTIFACT_ACTION)
        .with_input("name", AGENT_OUTPUT_ARTIFACT)
        .with_input("path", format!("{SAFE_OUTPUTS_DIR}/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_steps_reject_unknown_keys() {
        let err = serde_yaml::from_str::<Step>("name: x\nrun: echo hi\nrunz: typo\n")
            .expect_err("unknown key");
        assert!(err.to_string().contains("runz"));
        let step: Step = serde_yaml::from_str(
            "uses: actions/cache@v4\nwith:\n  key: abc\n  fail-on-cache-miss: true\n",
        )
        .expect("valid step");
        assert_eq!(step.with.get("fail-on-cache-miss"), Some(&Value::Bool(true)));
    }

    #[test]
    fn release_preamble_skips_checkout() {
        let dev = helper_preamble(&CompilerOptions::dev());
        let release = helper_preamble(&CompilerOptions::release("v1.0.0"));
        assert_eq!(dev.len(), 2);
        assert_eq!(release.len(), 1);
        assert_eq!(
            release[0].uses.as_deref(),
            Some("githubnext/gh-aw/actions/setup@v1.0.0")
        );
    }

    #[test]
    fn checkout_grant_only_applies_in_dev_mode_and_never_downgrades() {
        let write = PermissionSet::new().write(PermissionScope::Contents);
        assert_eq!(
            with_checkout_grant(write.clone(), &CompilerOptions::dev()),
            write
        );
        assert_eq!(
            with_checkout_grant(PermissionSet::new(), &CompilerOptions::dev()),
            crate::permissions::contents_read()
        );
        assert!(with_checkout_grant(PermissionSet::new(), &CompilerOptions::release("v1"))
            .is_empty());
    }
}
