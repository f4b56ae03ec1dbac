use super::{ConfigError, WorkflowSpec};
use std::path::Path;

pub fn load_workflow_spec(path: &Path) -> Result<WorkflowSpec, ConfigError> {
    let spec = WorkflowSpec::from_path(path)?;
    tracing::debug!(workflow = %spec.id, path = %path.display(), "loaded workflow spec");
    Ok(spec)
}
