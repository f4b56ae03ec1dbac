use super::{toolset_permissions, ToolsetDefinition, DEFAULT_TOOLSETS, TOOLSET_DEFINITIONS};
use crate::permissions::{PermissionLevel, PermissionSet};
use std::collections::HashSet;

fn required_level(read_only: bool) -> PermissionLevel {
    if read_only {
        PermissionLevel::Read
    } else {
        PermissionLevel::Write
    }
}

fn is_compatible(
    definition: &ToolsetDefinition,
    permissions: Option<&PermissionSet>,
    read_only: bool,
) -> bool {
    let needed = required_level(read_only);
    definition.required_scopes(read_only).iter().all(|scope| {
        permissions
            .map(|set| set.level(*scope))
            .unwrap_or_default()
            .satisfies(needed)
    })
}

/// Keeps the toolsets the granted permissions can actually serve, in input order.
///
/// Missing permissions behave as every scope at `none`. Unknown names are
/// logged and dropped.
pub fn infer_from_toolsets<S: AsRef<str>>(
    permissions: Option<&PermissionSet>,
    toolsets: &[S],
    read_only: bool,
) -> Vec<String> {
    let mut compatible = Vec::new();
    for name in toolsets {
        let name = name.as_ref();
        let Some(definition) = toolset_permissions(name) else {
            tracing::warn!(toolset = name, "unknown toolset ignored during inference");
            continue;
        };
        if is_compatible(definition, permissions, read_only) {
            compatible.push(name.to_string());
        } else {
            tracing::debug!(
                toolset = name,
                read_only,
                "toolset excluded: required permissions not granted"
            );
        }
    }
    compatible
}

pub fn infer_from_defaults(permissions: Option<&PermissionSet>, read_only: bool) -> Vec<String> {
    infer_from_toolsets(permissions, &DEFAULT_TOOLSETS, read_only)
}

/// Resolves the `default` and `all` keywords and drops duplicates, keeping the
/// first occurrence of each name.
pub fn expand_toolset_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut expanded = Vec::new();
    for raw in names {
        let batch: Vec<&str> = match raw.as_ref().trim() {
            "" => Vec::new(),
            "default" => DEFAULT_TOOLSETS.to_vec(),
            "all" => TOOLSET_DEFINITIONS
                .iter()
                .map(|definition| definition.name)
                .collect(),
            other => vec![other],
        };
        for name in batch {
            if seen.insert(name.to_string()) {
                expanded.push(name.to_string());
            }
        }
    }
    expanded
}
