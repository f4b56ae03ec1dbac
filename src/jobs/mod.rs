pub mod activation;
pub mod builder;
pub mod conditions;
pub mod graph;
pub mod main_job;
pub mod pre_activation;
pub mod step;
pub mod stop_time;

pub use builder::{compile_workflow, JobGraphBuilder};
pub use conditions::Condition;
pub use graph::{CompiledWorkflow, JobGraph};
pub use step::Step;

use crate::concurrency::ConcurrencyGroup;
use crate::permissions::PermissionsDeclaration;
use crate::shared::ids::JobName;
use serde::Serialize;
use std::collections::BTreeMap;

pub const PRE_ACTIVATION_JOB: &str = "pre_activation";
pub const ACTIVATION_JOB: &str = "activation";
pub const MAIN_JOB: &str = "agent";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobRole {
    PreActivation,
    Activation,
    Main,
    SafeOutput,
}

/// A fully wired job. Built once by the graph builder and not mutated after.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobSpec {
    #[serde(skip)]
    pub name: JobName,
    #[serde(skip)]
    pub role: JobRole,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<JobName>,
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub runs_on: String,
    pub permissions: PermissionsDeclaration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<ConcurrencyGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<u32>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, String>,
    pub steps: Vec<Step>,
}

impl JobSpec {
    pub fn new(name: JobName, role: JobRole, runs_on: &str) -> Self {
        Self {
            name,
            role,
            needs: Vec::new(),
            condition: None,
            runs_on: runs_on.to_string(),
            permissions: PermissionsDeclaration::default(),
            concurrency: None,
            timeout_minutes: None,
            env: BTreeMap::new(),
            outputs: BTreeMap::new(),
            steps: Vec::new(),
        }
    }

    pub fn needs_job(&self, name: &str) -> bool {
        self.needs.iter().any(|need| need.as_str() == name)
    }

    /// Canonical permission text; identical specs render identically.
    pub fn rendered_permissions(&self) -> String {
        self.permissions.render()
    }
}

/// Job names come from fixed tables, so parsing only fails on a programming
/// error in those tables.
pub(crate) fn job_name(raw: &str) -> JobName {
    JobName::parse(raw).expect("static job name is valid")
}
