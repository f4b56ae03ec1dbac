#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("workflow file {path} has no frontmatter block delimited by `---`")]
    MissingFrontmatter { path: String },
    #[error("workflow validation failed: {0}")]
    Workflow(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid `{field}`: {reason}")]
    InvalidField { field: String, reason: String },
    #[error(
        "safe output `{key}` sets `target-repo: \"*\"`; wildcard target repositories are not allowed, name the repository explicitly"
    )]
    WildcardTargetRepo { key: String },
    #[error("workflow `{workflow}` cannot dispatch itself; self-referencing dispatch-workflow targets are not allowed")]
    SelfDispatch { workflow: String },
    #[error("dispatch-workflow target `{target}` does not exist in {dir}; check for the correct name and extension")]
    DispatchTargetMissing { target: String, dir: String },
    #[error("dispatch-workflow target `{target}` has not been compiled; compile {source_path} before referencing it")]
    DispatchTargetNotCompiled { target: String, source_path: String },
    #[error("unknown engine `{engine}`; available engines: {available}")]
    UnknownEngine { engine: String, available: String },
    #[error("invalid reaction `{reaction}`; expected one of: {allowed}")]
    InvalidReaction { reaction: String, allowed: String },
    #[error("invalid stop-after `{value}`: {reason}")]
    InvalidStopTime { value: String, reason: String },
    #[error("job graph validation failed: {0}")]
    JobGraph(String),
    #[error("failed to render compiled workflow: {source}")]
    Render {
        #[source]
        source: serde_yaml::Error,
    },
}

impl CompileError {
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
