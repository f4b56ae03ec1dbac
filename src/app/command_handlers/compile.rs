use crate::config::{load_workflow_spec, lock_file_path, CompilerOptions, ConfigError};
use crate::engine::EngineRegistry;
use crate::jobs::compile_workflow;
use crate::shared::fs_atomic::atomic_write_file;
use chrono::Utc;
use std::path::{Path, PathBuf};

pub const STDOUT_OUTPUT: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileArgs {
    pub source: PathBuf,
    pub release: Option<String>,
    pub workflows_dir: Option<PathBuf>,
    pub output: Option<String>,
}

pub fn parse_compile_args(args: &[String]) -> Result<CompileArgs, String> {
    const USAGE: &str =
        "usage: compile <file> [--release <version>] [--workflows-dir <dir>] [--output <path>]";

    let mut source = None;
    let mut release = None;
    let mut workflows_dir = None;
    let mut output = None;
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "--release" => {
                index += 1;
                let raw = args
                    .get(index)
                    .ok_or_else(|| "--release requires a version".to_string())?;
                release = Some(raw.clone());
            }
            "--workflows-dir" => {
                index += 1;
                let raw = args
                    .get(index)
                    .ok_or_else(|| "--workflows-dir requires a directory".to_string())?;
                workflows_dir = Some(PathBuf::from(raw));
            }
            "--output" => {
                index += 1;
                let raw = args
                    .get(index)
                    .ok_or_else(|| "--output requires a path".to_string())?;
                output = Some(raw.clone());
            }
            other if other.starts_with("--") => {
                return Err(format!("unknown compile flag `{other}`"));
            }
            other => {
                if source.is_some() {
                    return Err(format!("unexpected argument `{other}`\n{USAGE}"));
                }
                source = Some(PathBuf::from(other));
            }
        }
        index += 1;
    }

    Ok(CompileArgs {
        source: source.ok_or_else(|| USAGE.to_string())?,
        release,
        workflows_dir,
        output,
    })
}

/// Generated-file banner, followed by the workflow description as comments.
fn lock_file_header(source: &Path, description: Option<&str>) -> String {
    let name = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut header = format!("# Code generated by awc from {name}. DO NOT EDIT.\n");
    if let Some(description) = description.map(str::trim).filter(|text| !text.is_empty()) {
        header.push_str("#\n");
        for line in description.lines() {
            header.push_str(format!("# {line}").trim_end());
            header.push('\n');
        }
    }
    header.push('\n');
    header
}

pub fn cmd_compile(args: &[String]) -> Result<String, String> {
    let parsed = parse_compile_args(args)?;
    let spec = load_workflow_spec(&parsed.source).map_err(|err| err.to_string())?;

    let workflows_dir = parsed.workflows_dir.clone().unwrap_or_else(|| {
        parsed
            .source
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf()
    });
    let options = match &parsed.release {
        Some(version) => CompilerOptions::release(version.clone()),
        None => CompilerOptions::dev(),
    }
    .with_workflows_dir(workflows_dir)
    .with_reference_time(Utc::now());

    let compiled = compile_workflow(&spec, &options, &EngineRegistry::builtin())
        .map_err(|err| err.to_string())?;
    let rendered = format!(
        "{}{}",
        lock_file_header(&parsed.source, spec.description.as_deref()),
        compiled.to_yaml().map_err(|err| err.to_string())?
    );

    if parsed.output.as_deref() == Some(STDOUT_OUTPUT) {
        return Ok(rendered.trim_end().to_string());
    }
    let output = parsed
        .output
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| lock_file_path(&parsed.source));
    atomic_write_file(&output, rendered.as_bytes()).map_err(|source| {
        ConfigError::Write {
            path: output.display().to_string(),
            source,
        }
        .to_string()
    })?;
    tracing::info!(
        workflow = %spec.id,
        mode = options.action_mode.as_str(),
        output = %output.display(),
        "compiled workflow"
    );
    Ok(format!(
        "workflow compiled\nsource={}\noutput={}\njobs={}",
        parsed.source.display(),
        output.display(),
        compiled.jobs.jobs().len()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn flags_may_come_in_any_order() {
        let parsed = parse_compile_args(&args(&[
            "--release",
            "v1.4.0",
            ".github/workflows/triage.md",
            "--output",
            "-",
        ]))
        .expect("parse");
        assert_eq!(parsed.source, PathBuf::from(".github/workflows/triage.md"));
        assert_eq!(parsed.release.as_deref(), Some("v1.4.0"));
        assert_eq!(parsed.output.as_deref(), Some(STDOUT_OUTPUT));
        assert_eq!(parsed.workflows_dir, None);
    }

    #[test]
    fn header_carries_the_workflow_description() {
        let source = Path::new(".github/workflows/triage.md");
        assert_eq!(
            lock_file_header(source, None),
            "# Code generated by awc from triage.md. DO NOT EDIT.\n\n"
        );
        assert_eq!(
            lock_file_header(source, Some("Labels new issues.\n\nRuns on open.\n")),
            "# Code generated by awc from triage.md. DO NOT EDIT.\n#\n# Labels new issues.\n#\n# Runs on open.\n\n"
        );
        assert_eq!(
            lock_file_header(source, Some("   ")),
            lock_file_header(source, None)
        );
    }

    #[test]
    fn missing_values_and_sources_are_reported() {
        assert!(parse_compile_args(&args(&["a.md", "--release"]))
            .expect_err("missing version")
            .contains("--release requires"));
        assert!(parse_compile_args(&args(&[]))
            .expect_err("missing source")
            .starts_with("usage: compile"));
        assert!(parse_compile_args(&args(&["a.md", "--force"]))
            .expect_err("unknown flag")
            .contains("--force"));
    }
}
