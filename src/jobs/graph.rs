use super::{JobRole, JobSpec};
use crate::concurrency::ConcurrencyGroup;
use crate::config::CompileError;
use crate::permissions::PermissionsDeclaration;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::{HashMap, HashSet};

/// Jobs in emission order. Every `needs` entry refers to an earlier job, so
/// the order is also a topological order of the dependency graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobGraph {
    jobs: Vec<JobSpec>,
}

impl JobGraph {
    pub fn new(jobs: Vec<JobSpec>) -> Result<Self, CompileError> {
        let graph = Self { jobs };
        graph.validate()?;
        Ok(graph)
    }

    pub fn jobs(&self) -> &[JobSpec] {
        &self.jobs
    }

    pub fn job(&self, name: &str) -> Option<&JobSpec> {
        self.jobs.iter().find(|job| job.name.as_str() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.jobs.iter().map(|job| job.name.as_str()).collect()
    }

    pub fn main_job(&self) -> Option<&JobSpec> {
        self.jobs.iter().find(|job| job.role == JobRole::Main)
    }

    pub fn validate(&self) -> Result<(), CompileError> {
        let mut seen = HashSet::new();
        for job in &self.jobs {
            for need in &job.needs {
                if need == &job.name {
                    return Err(CompileError::JobGraph(format!(
                        "job `{}` depends on itself",
                        job.name
                    )));
                }
                if !seen.contains(need.as_str()) {
                    return Err(CompileError::JobGraph(format!(
                        "job `{}` needs `{need}`, which is not defined before it",
                        job.name
                    )));
                }
            }
            if !seen.insert(job.name.as_str()) {
                return Err(CompileError::JobGraph(format!(
                    "job `{}` is defined more than once",
                    job.name
                )));
            }
        }

        let mains = self
            .jobs
            .iter()
            .filter(|job| job.role == JobRole::Main)
            .count();
        if mains != 1 {
            return Err(CompileError::JobGraph(format!(
                "expected exactly one main job, found {mains}"
            )));
        }

        for job in self.jobs.iter().filter(|job| job.role == JobRole::SafeOutput) {
            if !self.reaches_main(job) {
                return Err(CompileError::JobGraph(format!(
                    "safe output job `{}` does not depend on the main job",
                    job.name
                )));
            }
        }
        Ok(())
    }

    fn reaches_main(&self, start: &JobSpec) -> bool {
        let by_name: HashMap<&str, &JobSpec> = self
            .jobs
            .iter()
            .map(|job| (job.name.as_str(), job))
            .collect();
        let mut stack: Vec<&str> = start.needs.iter().map(|need| need.as_str()).collect();
        let mut visited = HashSet::new();
        while let Some(name) = stack.pop() {
            if !visited.insert(name) {
                continue;
            }
            let Some(job) = by_name.get(name) else {
                continue;
            };
            if job.role == JobRole::Main {
                return true;
            }
            stack.extend(job.needs.iter().map(|need| need.as_str()));
        }
        false
    }
}

impl Serialize for JobGraph {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.jobs.len()))?;
        for job in &self.jobs {
            map.serialize_entry(job.name.as_str(), job)?;
        }
        map.end()
    }
}

/// The lock file document handed to the YAML serializer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledWorkflow {
    pub name: String,
    pub on: serde_yaml::Value,
    pub permissions: PermissionsDeclaration,
    pub concurrency: ConcurrencyGroup,
    pub jobs: JobGraph,
}

impl CompiledWorkflow {
    pub fn to_yaml(&self) -> Result<String, CompileError> {
        serde_yaml::to_string(self).map_err(|source| CompileError::Render { source })
    }
}
