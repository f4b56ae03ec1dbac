use super::conditions::job_output;
use super::pre_activation::ACTIVATED_OUTPUT;
use super::step::{helper_preamble, script_step, with_checkout_grant};
use super::{job_name, JobRole, JobSpec, ACTIVATION_JOB};
use crate::config::{CompilerOptions, TriggerCategory, WorkflowSpec};
use crate::permissions::PermissionSet;

const REPOSITORY_CHECK_STEP: &str = "check_workflow_run_repository";
const COMMAND_POSITION_STEP: &str = "check_command_position";

/// `if:` for any job that waits on a pre-activation job.
pub fn activated_condition(pre_activation: &str) -> String {
    format!("{} == 'true'", job_output(pre_activation, ACTIVATED_OUTPUT))
}

/// Returns `None` unless a trigger needs validation beyond pre-activation.
pub fn build_activation_job(
    spec: &WorkflowSpec,
    options: &CompilerOptions,
    pre_activation: Option<&JobSpec>,
) -> Option<JobSpec> {
    let validates_repository = spec.on.has_category(TriggerCategory::WorkflowRun);
    let command = spec.on.command();
    if !validates_repository && command.is_none() {
        return None;
    }

    let mut job = JobSpec::new(job_name(ACTIVATION_JOB), JobRole::Activation, spec.runs_on());
    if let Some(pre_activation) = pre_activation {
        job.needs = vec![pre_activation.name.clone()];
        job.condition = Some(activated_condition(pre_activation.name.as_str()));
    }

    let mut steps = helper_preamble(options);
    if validates_repository {
        steps.push(
            script_step(
                "Validate triggering repository",
                REPOSITORY_CHECK_STEP,
                REPOSITORY_CHECK_STEP,
            )
            .with_condition("github.event_name == 'workflow_run'")
            .with_env("GH_AW_EXPECTED_REPOSITORY", "${{ github.repository }}")
            .with_env(
                "GH_AW_TRIGGERING_REPOSITORY",
                "${{ github.event.workflow_run.repository.full_name }}",
            ),
        );
    }
    if let Some(command) = &command {
        steps.push(
            script_step(
                "Check command position",
                COMMAND_POSITION_STEP,
                COMMAND_POSITION_STEP,
            )
            .with_env("GH_AW_COMMAND", command.name.as_str()),
        );
    }
    job.steps = steps;
    job.permissions = with_checkout_grant(PermissionSet::new(), options).into();
    tracing::debug!(workflow = %spec.id, "built activation job");
    Some(job)
}
