use super::{ConfigError, TriggerConfig};
use crate::permissions::PermissionsDeclaration;
use crate::shared::ids::{EngineId, WorkflowId};
use crate::shared::serde_ext::string_or_seq;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;

pub const DEFAULT_ENGINE: &str = "copilot";
pub const DEFAULT_RUNS_ON: &str = "ubuntu-latest";
pub const DEFAULT_TIMEOUT_MINUTES: u32 = 20;
pub const DEFAULT_ROLES: [&str; 3] = ["admin", "maintainer", "write"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub id: EngineId,
    pub version: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct EngineConfigRaw {
    id: EngineId,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

impl<'de> Deserialize<'de> for EngineConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_yaml::Value::deserialize(deserializer)?;
        match value {
            serde_yaml::Value::String(raw) => Ok(Self {
                id: EngineId::parse(raw.trim()).map_err(D::Error::custom)?,
                version: None,
                model: None,
            }),
            serde_yaml::Value::Mapping(_) => {
                let raw: EngineConfigRaw =
                    serde_yaml::from_value(value).map_err(D::Error::custom)?;
                Ok(Self {
                    id: raw.id,
                    version: raw.version,
                    model: raw.model,
                })
            }
            _ => Err(D::Error::custom(
                "engine must be an engine id or a mapping with `id`",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrencyConfig {
    pub group: String,
    pub cancel_in_progress: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ConcurrencyConfigRaw {
    group: String,
    #[serde(default)]
    cancel_in_progress: Option<bool>,
}

impl<'de> Deserialize<'de> for ConcurrencyConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_yaml::Value::deserialize(deserializer)?;
        let (group, cancel_in_progress) = match value {
            serde_yaml::Value::String(group) => (group, None),
            serde_yaml::Value::Mapping(_) => {
                let raw: ConcurrencyConfigRaw =
                    serde_yaml::from_value(value).map_err(D::Error::custom)?;
                (raw.group, raw.cancel_in_progress)
            }
            _ => {
                return Err(D::Error::custom(
                    "concurrency must be a group string or a mapping with `group`",
                ))
            }
        };
        if group.trim().is_empty() {
            return Err(D::Error::custom("concurrency group must be non-empty"));
        }
        Ok(Self {
            group: group.trim().to_string(),
            cancel_in_progress,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GithubToolConfig {
    #[serde(default, deserialize_with = "string_or_seq")]
    pub toolsets: Vec<String>,
    #[serde(default = "default_read_only")]
    pub read_only: bool,
}

fn default_read_only() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub github: Option<GithubToolConfig>,
}

/// The compiler's input: the frontmatter of one workflow plus its prompt body.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSpec {
    pub id: WorkflowId,
    pub name: String,
    pub description: Option<String>,
    pub source: Option<String>,
    pub tracker_id: Option<String>,
    pub on: TriggerConfig,
    pub permissions: Option<PermissionsDeclaration>,
    pub engine: Option<EngineConfig>,
    pub runs_on: Option<String>,
    pub timeout_minutes: Option<u32>,
    pub concurrency: Option<ConcurrencyConfig>,
    pub stop_after: Option<String>,
    pub reaction: Option<String>,
    pub roles: Option<Vec<String>>,
    pub pre_activation: Option<serde_yaml::Value>,
    pub tools: ToolsConfig,
    pub safe_outputs: Option<serde_yaml::Mapping>,
    pub prompt: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct WorkflowSpecRaw {
    #[serde(default)]
    id: Option<WorkflowId>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    tracker_id: Option<String>,
    on: TriggerConfig,
    #[serde(default)]
    permissions: Option<PermissionsDeclaration>,
    #[serde(default)]
    engine: Option<EngineConfig>,
    #[serde(default)]
    runs_on: Option<String>,
    #[serde(default)]
    timeout_minutes: Option<u32>,
    #[serde(default)]
    concurrency: Option<ConcurrencyConfig>,
    #[serde(default)]
    stop_after: Option<String>,
    #[serde(default)]
    reaction: Option<String>,
    #[serde(default)]
    roles: Option<serde_yaml::Value>,
    #[serde(default)]
    pre_activation: Option<serde_yaml::Value>,
    #[serde(default)]
    tools: ToolsConfig,
    #[serde(default)]
    safe_outputs: Option<serde_yaml::Mapping>,
    #[serde(default)]
    prompt: Option<String>,
}

fn parse_roles(value: serde_yaml::Value) -> Result<Vec<String>, ConfigError> {
    let roles = crate::shared::serde_ext::yaml_string_list(&value)
        .map_err(|err| ConfigError::Workflow(format!("`roles`: {err}")))?;
    Ok(roles.into_iter().filter(|role| !role.is_empty()).collect())
}

impl WorkflowSpec {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let stem = workflow_id_from_path(path)?;
        let is_markdown = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
        if is_markdown {
            let (frontmatter, body) =
                split_frontmatter(&raw).ok_or_else(|| ConfigError::MissingFrontmatter {
                    path: path.display().to_string(),
                })?;
            let mut spec = Self::from_yaml_str_with_id(frontmatter, &path.display().to_string(), stem)?;
            if spec.prompt.is_empty() {
                spec.prompt = body.trim().to_string();
            }
            return Ok(spec);
        }
        Self::from_yaml_str_with_id(&raw, &path.display().to_string(), stem)
    }

    /// Parses a standalone document; `id` must then be present in it.
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let parsed: WorkflowSpecRaw =
            serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
                path: "<inline>".to_string(),
                source,
            })?;
        let id = parsed.id.clone().ok_or_else(|| {
            ConfigError::Workflow("`id` is required when no workflow file path is known".to_string())
        })?;
        Self::from_raw(parsed, id)
    }

    fn from_yaml_str_with_id(raw: &str, path: &str, id: WorkflowId) -> Result<Self, ConfigError> {
        let parsed: WorkflowSpecRaw =
            serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
                path: path.to_string(),
                source,
            })?;
        let id = parsed.id.clone().unwrap_or(id);
        Self::from_raw(parsed, id)
    }

    fn from_raw(raw: WorkflowSpecRaw, id: WorkflowId) -> Result<Self, ConfigError> {
        let roles = raw.roles.map(parse_roles).transpose()?;
        let spec = Self {
            name: raw
                .name
                .map(|name| name.trim().to_string())
                .unwrap_or_else(|| id.to_string()),
            id,
            description: raw.description,
            source: raw.source,
            tracker_id: raw.tracker_id,
            on: raw.on,
            permissions: raw.permissions,
            engine: raw.engine,
            runs_on: raw.runs_on,
            timeout_minutes: raw.timeout_minutes,
            concurrency: raw.concurrency,
            stop_after: raw.stop_after,
            reaction: raw.reaction,
            roles,
            pre_activation: raw.pre_activation,
            tools: raw.tools,
            safe_outputs: raw.safe_outputs,
            prompt: raw.prompt.unwrap_or_default(),
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Workflow("`name` must be non-empty".to_string()));
        }
        if self.timeout_minutes == Some(0) {
            return Err(ConfigError::Workflow(
                "`timeout-minutes` must be >= 1".to_string(),
            ));
        }
        if let Some(runs_on) = &self.runs_on {
            if runs_on.trim().is_empty() {
                return Err(ConfigError::Workflow(
                    "`runs-on` must be non-empty when set".to_string(),
                ));
            }
        }
        if let Some(tracker_id) = &self.tracker_id {
            if tracker_id.len() < 8
                || !tracker_id
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
            {
                return Err(ConfigError::Workflow(format!(
                    "`tracker-id` `{tracker_id}` must be at least 8 characters of ASCII letters, digits, '-' or '_'"
                )));
            }
        }
        Ok(())
    }

    pub fn engine_id(&self) -> &str {
        self.engine
            .as_ref()
            .map(|engine| engine.id.as_str())
            .unwrap_or(DEFAULT_ENGINE)
    }

    pub fn runs_on(&self) -> &str {
        self.runs_on.as_deref().unwrap_or(DEFAULT_RUNS_ON)
    }

    /// Configured roles, `None` when the check is disabled with `all`.
    pub fn required_roles(&self) -> Option<Vec<String>> {
        match &self.roles {
            Some(roles) if roles.iter().any(|role| role == "all") => None,
            Some(roles) if !roles.is_empty() => Some(roles.clone()),
            _ => Some(DEFAULT_ROLES.iter().map(|role| role.to_string()).collect()),
        }
    }

    pub fn is_command_trigger(&self) -> bool {
        self.on.is_command_trigger()
    }
}

pub fn workflow_id_from_path(path: &Path) -> Result<WorkflowId, ConfigError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let stem = file_name
        .strip_suffix(".lock.yml")
        .or_else(|| file_name.rsplit_once('.').map(|(stem, _)| stem))
        .unwrap_or(file_name);
    WorkflowId::parse(stem).map_err(|err| {
        ConfigError::Workflow(format!(
            "workflow file {} does not yield a valid id: {err}",
            path.display()
        ))
    })
}

/// Splits `---` delimited frontmatter from the markdown body.
pub fn split_frontmatter(raw: &str) -> Option<(&str, &str)> {
    let rest = raw
        .strip_prefix("---\n")
        .or_else(|| raw.strip_prefix("---\r\n"))?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}
