//! Close and update operations share one parse/build pair. Everything that
//! differs between issues, pull requests and discussions lives in the
//! [`ENTITY_OPERATIONS`] table.

use super::common::{
    assemble_job, parse_max, parse_presence_flag, parse_string, parse_string_list, parse_target,
    parse_target_repo, targets_triggering_entity, warn_unknown_keys, MaxPolicy, PrefixedEnv,
    SafeOutputContext, SafeOutputJobParts,
};
use crate::config::CompileError;
use crate::jobs::{Condition, JobSpec};
use crate::permissions::{PermissionScope, PermissionSet};
use serde_yaml::Mapping;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Issue,
    PullRequest,
    Discussion,
}

impl EntityKind {
    /// Contents stays readable; only the entity's own scope is writable.
    pub fn permissions(self) -> PermissionSet {
        let scope = match self {
            Self::Issue => PermissionScope::Issues,
            Self::PullRequest => PermissionScope::PullRequests,
            Self::Discussion => PermissionScope::Discussions,
        };
        PermissionSet::new()
            .read(PermissionScope::Contents)
            .write(scope)
    }

    /// Event payload path holding the triggering entity's number.
    pub fn event_number_path(self) -> &'static str {
        match self {
            Self::Issue => "github.event.issue.number",
            Self::PullRequest => "github.event.pull_request.number",
            Self::Discussion => "github.event.discussion.number",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityAction {
    Close,
    Update,
}

pub struct EntityOperationDefinition {
    pub entity: EntityKind,
    pub action: EntityAction,
    pub config_key: &'static str,
    pub env_prefix: &'static str,
    pub job_name: &'static str,
    pub step_name: &'static str,
    pub script: &'static str,
    pub max_policy: MaxPolicy,
    pub output_keys: &'static [&'static str],
    /// Optional sub-keys this operation understands beyond the common ones.
    pub extension_keys: &'static [&'static str],
}

impl std::fmt::Debug for EntityOperationDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityOperationDefinition")
            .field("entity", &self.entity)
            .field("action", &self.action)
            .field("config_key", &self.config_key)
            .field("job_name", &self.job_name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for EntityOperationDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.config_key == other.config_key
    }
}

impl Eq for EntityOperationDefinition {}

const CLOSE_FILTER_KEYS: [&str; 2] = ["required-labels", "required-title-prefix"];

pub static ENTITY_OPERATIONS: [EntityOperationDefinition; 6] = [
    EntityOperationDefinition {
        entity: EntityKind::Issue,
        action: EntityAction::Close,
        config_key: "close-issue",
        env_prefix: "GH_AW_CLOSE_ISSUE",
        job_name: "close_issue",
        step_name: "Close Issue",
        script: "close_issue",
        max_policy: MaxPolicy::Default(1),
        output_keys: &["issue_number", "issue_url", "comment_url"],
        extension_keys: &CLOSE_FILTER_KEYS,
    },
    EntityOperationDefinition {
        entity: EntityKind::PullRequest,
        action: EntityAction::Close,
        config_key: "close-pull-request",
        env_prefix: "GH_AW_CLOSE_PR",
        job_name: "close_pull_request",
        step_name: "Close Pull Request",
        script: "close_pull_request",
        max_policy: MaxPolicy::Default(1),
        output_keys: &["pull_request_number", "pull_request_url", "comment_url"],
        extension_keys: &CLOSE_FILTER_KEYS,
    },
    EntityOperationDefinition {
        entity: EntityKind::Discussion,
        action: EntityAction::Close,
        config_key: "close-discussion",
        env_prefix: "GH_AW_CLOSE_DISCUSSION",
        job_name: "close_discussion",
        step_name: "Close Discussion",
        script: "close_discussion",
        max_policy: MaxPolicy::Default(1),
        output_keys: &["discussion_number", "discussion_url", "comment_url"],
        extension_keys: &["required-labels", "required-title-prefix", "required-category"],
    },
    EntityOperationDefinition {
        entity: EntityKind::Issue,
        action: EntityAction::Update,
        config_key: "update-issue",
        env_prefix: "GH_AW_UPDATE_ISSUE",
        job_name: "update_issue",
        step_name: "Update Issue",
        script: "update_issue",
        max_policy: MaxPolicy::Default(1),
        output_keys: &["issue_number", "issue_url"],
        extension_keys: &["title", "body", "status", "labels"],
    },
    EntityOperationDefinition {
        entity: EntityKind::PullRequest,
        action: EntityAction::Update,
        config_key: "update-pull-request",
        env_prefix: "GH_AW_UPDATE_PR",
        job_name: "update_pull_request",
        step_name: "Update Pull Request",
        script: "update_pull_request",
        max_policy: MaxPolicy::Default(1),
        output_keys: &["pull_request_number", "pull_request_url"],
        extension_keys: &["title", "body"],
    },
    EntityOperationDefinition {
        entity: EntityKind::Discussion,
        action: EntityAction::Update,
        config_key: "update-discussion",
        env_prefix: "GH_AW_UPDATE_DISCUSSION",
        job_name: "update_discussion",
        step_name: "Update Discussion",
        script: "update_discussion",
        max_policy: MaxPolicy::Default(1),
        output_keys: &["discussion_number", "discussion_url"],
        extension_keys: &["title", "body", "labels"],
    },
];

pub fn entity_operation(config_key: &str) -> Option<&'static EntityOperationDefinition> {
    ENTITY_OPERATIONS
        .iter()
        .find(|definition| definition.config_key == config_key)
}

/// Filters an entity must pass before the operation applies to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityFilters {
    pub required_labels: Vec<String>,
    pub required_title_prefix: Option<String>,
    pub required_category: Option<String>,
}

/// Fields an update operation may change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdatableFields {
    pub title: bool,
    pub body: bool,
    pub status: bool,
    pub labels: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityOperationConfig {
    pub max: u32,
    pub target: Option<String>,
    pub target_repo: Option<String>,
    pub github_token: Option<String>,
    pub filters: EntityFilters,
    pub updates: UpdatableFields,
}

impl EntityOperationConfig {
    pub fn targets_triggering_entity(&self) -> bool {
        targets_triggering_entity(self.target.as_deref())
    }
}

/// `raw` is the whole `safe-outputs` mapping. Returns `Ok(None)` when the
/// operation is not declared.
pub fn parse_config(
    raw: &Mapping,
    definition: &EntityOperationDefinition,
) -> Result<Option<EntityOperationConfig>, CompileError> {
    let kind = definition.config_key;
    let Some(map) = super::common::declaration_map(raw, kind, None) else {
        return Ok(None);
    };
    let mut known = vec!["target", "target-repo"];
    known.extend(definition.extension_keys.iter().copied());
    warn_unknown_keys(kind, &map, &known);

    let allows = |key: &str| definition.extension_keys.contains(&key);
    let filters = EntityFilters {
        required_labels: if allows("required-labels") {
            parse_string_list(kind, &map, "required-labels")
        } else {
            Vec::new()
        },
        required_title_prefix: allows("required-title-prefix")
            .then(|| parse_string(kind, &map, "required-title-prefix"))
            .flatten(),
        required_category: allows("required-category")
            .then(|| parse_string(kind, &map, "required-category"))
            .flatten(),
    };
    let updates = match definition.action {
        EntityAction::Close => UpdatableFields::default(),
        EntityAction::Update => UpdatableFields {
            title: allows("title") && parse_presence_flag(&map, "title"),
            body: allows("body") && parse_presence_flag(&map, "body"),
            status: allows("status") && parse_presence_flag(&map, "status"),
            labels: allows("labels") && parse_presence_flag(&map, "labels"),
        },
    };

    Ok(Some(EntityOperationConfig {
        max: definition.max_policy.resolve(kind, parse_max(kind, &map)),
        target: parse_target(kind, &map),
        target_repo: parse_target_repo(kind, &map)?,
        github_token: parse_string(kind, &map, "github-token"),
        filters,
        updates,
    }))
}

pub fn build_job(
    ctx: &SafeOutputContext<'_>,
    definition: &EntityOperationDefinition,
    config: &EntityOperationConfig,
) -> JobSpec {
    let mut env = PrefixedEnv::new(definition.env_prefix);
    env.set("MAX", config.max.to_string())
        .set_opt("TARGET", config.target.as_deref())
        .set_opt("TARGET_REPO", config.target_repo.as_deref())
        .set_list("REQUIRED_LABELS", &config.filters.required_labels)
        .set_opt(
            "REQUIRED_TITLE_PREFIX",
            config.filters.required_title_prefix.as_deref(),
        )
        .set_opt("REQUIRED_CATEGORY", config.filters.required_category.as_deref())
        .set_flag("ALLOW_TITLE", config.updates.title)
        .set_flag("ALLOW_BODY", config.updates.body)
        .set_flag("ALLOW_STATUS", config.updates.status)
        .set_flag("ALLOW_LABELS", config.updates.labels);

    // Acting on the triggering entity needs an event that carries one.
    let extra_condition = config
        .targets_triggering_entity()
        .then(|| Condition::any_of([definition.entity.event_number_path()]));

    assemble_job(
        ctx,
        SafeOutputJobParts {
            job_name: definition.job_name,
            step_name: definition.step_name,
            script: definition.script,
            permissions: definition.entity.permissions(),
            env: env.into_vars(),
            output_keys: definition.output_keys,
            extra_condition,
            github_token: config.github_token.as_deref(),
            trailing_steps: Vec::new(),
            extra_needs: Vec::new(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).expect("mapping")
    }

    fn definition(key: &str) -> &'static EntityOperationDefinition {
        entity_operation(key).expect("known operation")
    }

    #[test]
    fn absent_key_is_not_declared() {
        let parsed = parse_config(&raw("close-issue: {}"), definition("close-discussion"))
            .expect("parse");
        assert_eq!(parsed, None);
    }

    #[test]
    fn kind_specific_filters_are_zero_unless_the_kind_supports_them() {
        let parsed = parse_config(
            &raw("close-issue:\n  required-category: Ideas\n  required-labels: [stale]\n"),
            definition("close-issue"),
        )
        .expect("parse")
        .expect("declared");
        assert_eq!(parsed.filters.required_category, None);
        assert_eq!(parsed.filters.required_labels, vec!["stale"]);

        let parsed = parse_config(
            &raw("close-discussion:\n  required-category: Ideas\n"),
            definition("close-discussion"),
        )
        .expect("parse")
        .expect("declared");
        assert_eq!(parsed.filters.required_category.as_deref(), Some("Ideas"));
    }

    #[test]
    fn update_fields_are_enabled_by_presence() {
        let parsed = parse_config(
            &raw("update-issue:\n  title:\n  status:\n  body: false\n"),
            definition("update-issue"),
        )
        .expect("parse")
        .expect("declared");
        assert_eq!(
            parsed.updates,
            UpdatableFields {
                title: true,
                body: false,
                status: true,
                labels: false,
            }
        );
    }

    #[test]
    fn every_definition_grants_contents_read_and_one_entity_write() {
        for definition in &ENTITY_OPERATIONS {
            let permissions = definition.entity.permissions();
            assert_eq!(permissions.len(), 2, "{}", definition.config_key);
            assert_eq!(
                permissions.level(PermissionScope::Contents),
                crate::permissions::PermissionLevel::Read
            );
            assert!(definition.env_prefix.starts_with("GH_AW_"));
        }
    }

    #[test]
    fn table_keys_agree_with_entity_and_action() {
        for definition in &ENTITY_OPERATIONS {
            let action = match definition.action {
                EntityAction::Close => "close",
                EntityAction::Update => "update",
            };
            let entity = match definition.entity {
                EntityKind::Issue => "issue",
                EntityKind::PullRequest => "pull-request",
                EntityKind::Discussion => "discussion",
            };
            assert_eq!(definition.config_key, format!("{action}-{entity}"));
            assert_eq!(definition.job_name, definition.config_key.replace('-', "_"));
        }
    }

    #[test]
    fn close_operations_never_enable_update_fields() {
        let parsed = parse_config(
            &raw("close-issue:\n  title:\n  body:\n"),
            definition("close-issue"),
        )
        .expect("parse")
        .expect("declared");
        assert_eq!(parsed.updates, UpdatableFields::default());
    }

    #[test]
    fn triggering_target_gates_on_the_entity_event() {
        let definition = definition("close-pull-request");
        assert_eq!(
            definition.entity.event_number_path(),
            "github.event.pull_request.number"
        );
        assert_eq!(
            definition.entity.permissions().level(PermissionScope::PullRequests),
            crate::permissions::PermissionLevel::Write
        );
    }
}
