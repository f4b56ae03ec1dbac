use chrono::{DateTime, Utc};
use std::path::PathBuf;

pub const DEFAULT_ACTION_REPOSITORY: &str = "githubnext/gh-aw";
pub const DEV_VERSION: &str = "dev";

/// Where generated jobs load their helper scripts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionMode {
    /// Scripts come from a checkout of the repository (`./actions/setup`),
    /// so jobs that run them need `contents: read`.
    Dev,
    /// Scripts come from the published action at a pinned version.
    Release,
}

impl ActionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Release => "release",
        }
    }

    pub fn requires_checkout(self) -> bool {
        matches!(self, Self::Dev)
    }
}

/// Every output-affecting switch lives here and is passed down explicitly, so
/// independent compilations can run in parallel without shared state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    pub action_mode: ActionMode,
    pub version: String,
    pub action_repository: String,
    pub workflows_dir: Option<PathBuf>,
    pub reference_time: Option<DateTime<Utc>>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self::dev()
    }
}

impl CompilerOptions {
    pub fn dev() -> Self {
        Self {
            action_mode: ActionMode::Dev,
            version: DEV_VERSION.to_string(),
            action_repository: DEFAULT_ACTION_REPOSITORY.to_string(),
            workflows_dir: None,
            reference_time: None,
        }
    }

    pub fn release(version: impl Into<String>) -> Self {
        Self {
            action_mode: ActionMode::Release,
            version: version.into(),
            ..Self::dev()
        }
    }

    pub fn with_workflows_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workflows_dir = Some(dir.into());
        self
    }

    pub fn with_reference_time(mut self, at: DateTime<Utc>) -> Self {
        self.reference_time = Some(at);
        self
    }

    /// `uses:` reference for the setup action that stages helper scripts.
    pub fn setup_action_ref(&self) -> String {
        match self.action_mode {
            ActionMode::Dev => "./actions/setup".to_string(),
            ActionMode::Release => {
                format!("{}/actions/setup@{}", self.action_repository, self.version)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_action_ref_follows_action_mode() {
        assert_eq!(CompilerOptions::dev().setup_action_ref(), "./actions/setup");
        assert_eq!(
            CompilerOptions::release("v1.2.0").setup_action_ref(),
            "githubnext/gh-aw/actions/setup@v1.2.0"
        );
    }
}
