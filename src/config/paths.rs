use std::path::{Path, PathBuf};

pub const WORKFLOW_SOURCE_EXTENSION: &str = "md";
pub const LOCK_FILE_SUFFIX: &str = ".lock.yml";
pub const PLAIN_WORKFLOW_EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// `triage.md` compiles to `triage.lock.yml` next to it.
pub fn lock_file_path(workflow_path: &Path) -> PathBuf {
    let stem = workflow_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("workflow");
    workflow_path.with_file_name(format!("{stem}{LOCK_FILE_SUFFIX}"))
}

pub fn workflow_source_path(dir: &Path, workflow_id: &str) -> PathBuf {
    dir.join(format!("{workflow_id}.{WORKFLOW_SOURCE_EXTENSION}"))
}

pub fn compiled_workflow_path(dir: &Path, workflow_id: &str) -> PathBuf {
    dir.join(format!("{workflow_id}{LOCK_FILE_SUFFIX}"))
}

pub fn plain_workflow_paths(dir: &Path, workflow_id: &str) -> Vec<PathBuf> {
    PLAIN_WORKFLOW_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{workflow_id}.{ext}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_file_sits_next_to_source() {
        assert_eq!(
            lock_file_path(Path::new(".github/workflows/triage.md")),
            PathBuf::from(".github/workflows/triage.lock.yml")
        );
    }
}
