use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;

const COMMAND_KEYS: [&str; 2] = ["command", "slash_command"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TriggerCategory {
    Issue,
    PullRequest,
    Discussion,
    Push,
    Command,
    WorkflowRun,
    Generic,
}

impl TriggerCategory {
    pub fn classify(event: &str) -> Self {
        match event {
            "issues" | "issue_comment" => Self::Issue,
            "pull_request"
            | "pull_request_target"
            | "pull_request_review"
            | "pull_request_review_comment" => Self::PullRequest,
            "discussion" | "discussion_comment" => Self::Discussion,
            "push" => Self::Push,
            "workflow_run" => Self::WorkflowRun,
            event if COMMAND_KEYS.contains(&event) => Self::Command,
            _ => Self::Generic,
        }
    }

    /// Categories whose runs are already sequenced by the workflow-level group.
    pub fn is_special(self) -> bool {
        matches!(
            self,
            Self::Issue | Self::PullRequest | Self::Discussion | Self::Push | Self::Command
        )
    }

    /// Events any repository visitor can cause, which need a role check.
    pub fn is_externally_triggerable(self) -> bool {
        matches!(
            self,
            Self::Issue | Self::PullRequest | Self::Discussion | Self::Command
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTrigger {
    pub name: String,
}

/// The `on:` section. Kept as raw YAML so it can be emitted back unchanged,
/// with typed views for classification.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerConfig {
    events: Mapping,
}

impl TriggerConfig {
    pub fn parse_value(value: &Value) -> Result<Self, String> {
        let mut events = Mapping::new();
        match value {
            Value::String(event) => {
                events.insert(Value::String(event.trim().to_string()), Value::Null);
            }
            Value::Sequence(items) => {
                for item in items {
                    let event = item
                        .as_str()
                        .ok_or_else(|| "trigger list entries must be event names".to_string())?;
                    events.insert(Value::String(event.trim().to_string()), Value::Null);
                }
            }
            Value::Mapping(map) => {
                for (key, config) in map {
                    if key.as_str().is_none() {
                        return Err("trigger event names must be strings".to_string());
                    }
                    events.insert(key.clone(), config.clone());
                }
            }
            _ => {
                return Err("`on` must be an event name, a list of events or a mapping".to_string())
            }
        }
        if events.is_empty() {
            return Err("`on` must declare at least one trigger".to_string());
        }
        let config = Self { events };
        if let Some(command) = config.command() {
            if command.name.trim().is_empty() {
                return Err("command trigger requires a non-empty name".to_string());
            }
        }
        Ok(config)
    }

    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.events.keys().filter_map(Value::as_str)
    }

    pub fn has_event(&self, event: &str) -> bool {
        self.event_names().any(|name| name == event)
    }

    pub fn categories(&self) -> BTreeSet<TriggerCategory> {
        self.event_names().map(TriggerCategory::classify).collect()
    }

    pub fn has_category(&self, category: TriggerCategory) -> bool {
        self.event_names()
            .any(|event| TriggerCategory::classify(event) == category)
    }

    pub fn command(&self) -> Option<CommandTrigger> {
        COMMAND_KEYS.iter().find_map(|key| {
            let config = self.events.get(*key)?;
            let name = match config {
                Value::String(name) => name.trim().to_string(),
                Value::Mapping(map) => map
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
                _ => String::new(),
            };
            Some(CommandTrigger {
                name: name.trim_start_matches('/').to_string(),
            })
        })
    }

    pub fn is_command_trigger(&self) -> bool {
        self.command().is_some()
    }

    pub fn is_special(&self) -> bool {
        self.categories().into_iter().any(TriggerCategory::is_special)
    }

    /// The `on:` block as it should appear in the compiled workflow: command
    /// triggers become the comment and thread events they listen on.
    pub fn render_value(&self) -> Value {
        let mut rendered = Mapping::new();
        for (key, config) in &self.events {
            let Some(event) = key.as_str() else {
                continue;
            };
            if COMMAND_KEYS.contains(&event) {
                for (expanded, types) in [
                    ("issues", &["opened", "edited", "reopened"][..]),
                    ("issue_comment", &["created", "edited"][..]),
                    ("pull_request_review_comment", &["created", "edited"][..]),
                ] {
                    if self.has_event(expanded) {
                        continue;
                    }
                    let mut entry = Mapping::new();
                    entry.insert(
                        Value::String("types".to_string()),
                        Value::Sequence(
                            types
                                .iter()
                                .map(|kind| Value::String(kind.to_string()))
                                .collect(),
                        ),
                    );
                    rendered.insert(Value::String(expanded.to_string()), Value::Mapping(entry));
                }
                continue;
            }
            rendered.insert(key.clone(), config.clone());
        }
        Value::Mapping(rendered)
    }
}

impl<'de> Deserialize<'de> for TriggerConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::parse_value(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> TriggerConfig {
        let value: Value = serde_yaml::from_str(yaml).expect("yaml");
        TriggerConfig::parse_value(&value).expect("triggers")
    }

    #[test]
    fn command_trigger_accepts_string_and_mapping_forms() {
        assert_eq!(
            parse("command: /triage").command(),
            Some(CommandTrigger {
                name: "triage".to_string()
            })
        );
        assert_eq!(
            parse("slash_command:\n  name: fix").command().map(|c| c.name),
            Some("fix".to_string())
        );
        assert!(parse("push").command().is_none());
    }

    #[test]
    fn categories_cover_list_and_scalar_forms() {
        let triggers = parse("[push, workflow_dispatch]");
        assert!(triggers.has_category(TriggerCategory::Push));
        assert!(triggers.has_category(TriggerCategory::Generic));
        assert!(triggers.is_special());
        assert!(!parse("schedule:\n  - cron: '0 9 * * 1'").is_special());
    }

    #[test]
    fn command_renders_as_comment_events() {
        let rendered = parse("command: triage\nworkflow_dispatch: {}").render_value();
        let map = rendered.as_mapping().expect("mapping");
        assert!(map.contains_key("issue_comment"));
        assert!(map.contains_key("workflow_dispatch"));
        assert!(!map.contains_key("command"));
    }

    #[test]
    fn empty_or_malformed_triggers_are_rejected() {
        let value: Value = serde_yaml::from_str("{}").expect("yaml");
        assert!(TriggerConfig::parse_value(&value).is_err());
        let value: Value = serde_yaml::from_str("42").expect("yaml");
        assert!(TriggerConfig::parse_value(&value).is_err());
    }
}
