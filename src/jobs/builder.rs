use super::activation::build_activation_job;
use super::graph::{CompiledWorkflow, JobGraph};
use super::main_job::build_main_job;
use super::pre_activation::build_pre_activation_job;
use super::MAIN_JOB;
use crate::concurrency::workflow_concurrency;
use crate::config::{CompileError, CompilerOptions, WorkflowSpec};
use crate::engine::EngineRegistry;
use crate::permissions::PermissionSet;
use crate::safe_outputs::SafeOutputsConfig;

/// Wires pre-activation, activation, the agent job and one job per safe
/// output. Holds only borrowed, immutable inputs, so independent builders
/// can run on separate threads.
pub struct JobGraphBuilder<'a> {
    spec: &'a WorkflowSpec,
    options: &'a CompilerOptions,
    engines: &'a EngineRegistry,
}

impl<'a> JobGraphBuilder<'a> {
    pub fn new(
        spec: &'a WorkflowSpec,
        options: &'a CompilerOptions,
        engines: &'a EngineRegistry,
    ) -> Self {
        Self {
            spec,
            options,
            engines,
        }
    }

    pub fn build(&self) -> Result<JobGraph, CompileError> {
        let spec = self.spec;
        let options = self.options;
        let engine = self.engines.resolve(spec.engine_id())?;
        let safe_outputs = SafeOutputsConfig::from_spec(spec, options)?;

        let pre_activation = build_pre_activation_job(spec, options)?;
        let activation = build_activation_job(spec, options, pre_activation.as_ref());
        let main = build_main_job(
            spec,
            options,
            engine,
            &safe_outputs,
            activation.as_ref().or(pre_activation.as_ref()),
        );
        let safe_output_jobs = safe_outputs.build_jobs(spec, options, MAIN_JOB);

        let mut jobs = Vec::with_capacity(3 + safe_output_jobs.len());
        jobs.extend(pre_activation);
        jobs.extend(activation);
        jobs.push(main);
        jobs.extend(safe_output_jobs);

        let graph = JobGraph::new(jobs)?;
        tracing::debug!(
            workflow = %spec.id,
            mode = options.action_mode.as_str(),
            jobs = ?graph.names(),
            "built job graph"
        );
        Ok(graph)
    }

    /// The full lock-file document. Workflow-level permissions stay empty;
    /// each job declares its own.
    pub fn compile(&self) -> Result<CompiledWorkflow, CompileError> {
        Ok(CompiledWorkflow {
            name: self.spec.name.clone(),
            on: self.spec.on.render_value(),
            permissions: PermissionSet::new().into(),
            concurrency: workflow_concurrency(self.spec),
            jobs: self.build()?,
        })
    }
}

pub fn compile_workflow(
    spec: &WorkflowSpec,
    options: &CompilerOptions,
    engines: &EngineRegistry,
) -> Result<CompiledWorkflow, CompileError> {
    JobGraphBuilder::new(spec, options, engines).compile()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{JobRole, ACTIVATION_JOB, PRE_ACTIVATION_JOB};

    fn parse_spec(yaml: &str) -> WorkflowSpec {
        WorkflowSpec::from_yaml_str(yaml).expect("spec")
    }

    #[test]
    fn main_job_waits_on_the_last_gate() {
        let engines = EngineRegistry::builtin();
        let options = CompilerOptions::dev();

        let spec = parse_spec("id: bot\non:\n  command: fix\n");
        let graph = JobGraphBuilder::new(&spec, &options, &engines)
            .build()
            .expect("graph");
        assert_eq!(graph.names(), vec![PRE_ACTIVATION_JOB, ACTIVATION_JOB, MAIN_JOB]);
        let main = graph.main_job().expect("main job");
        assert!(main.needs_job(ACTIVATION_JOB));
        assert!(main.condition.is_none());

        let spec = parse_spec("id: triage\non: issues\n");
        let graph = JobGraphBuilder::new(&spec, &options, &engines)
            .build()
            .expect("graph");
        let main = graph.main_job().expect("main job");
        assert!(main.needs_job(PRE_ACTIVATION_JOB));
        assert_eq!(
            main.condition.as_deref(),
            Some("needs.pre_activation.outputs.activated == 'true'")
        );
    }

    #[test]
    fn unknown_engine_fails_the_build() {
        let spec = parse_spec("id: docs\non: push\nengine: gemini\n");
        let err = compile_workflow(&spec, &CompilerOptions::dev(), &EngineRegistry::builtin())
            .expect_err("unknown engine");
        assert!(matches!(err, CompileError::UnknownEngine { .. }));
    }

    #[test]
    fn every_safe_output_job_needs_the_agent() {
        let spec = parse_spec(
            "id: docs\non: push\nsafe-outputs:\n  create-issue: {}\n  add-comment:\n    target: '*'\n",
        );
        let graph = JobGraphBuilder::new(&spec, &CompilerOptions::dev(), &EngineRegistry::builtin())
            .build()
            .expect("graph");
        let safe_jobs: Vec<_> = graph
            .jobs()
            .iter()
            .filter(|job| job.role == JobRole::SafeOutput)
            .collect();
        assert_eq!(safe_jobs.len(), 3);
        for job in safe_jobs {
            assert!(job.needs_job(MAIN_JOB), "{} must need the agent", job.name);
        }
        let comment = graph.job("add_comment").expect("add_comment job");
        assert!(comment.needs_job("create_issue"));
    }
}
