//! Scope/level permission lattice used for every compiled job.
//!
//! Levels are ordered `none < read < write`; a scope missing from a set is
//! equivalent to `none`. Sets are backed by a `BTreeMap` keyed on the scope
//! enum, whose declaration order matches the lexical order of the rendered
//! scope names, so rendering is canonical without an explicit sort.

pub mod declaration;

pub use declaration::PermissionsDeclaration;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PermissionScope {
    Actions,
    Attestations,
    Checks,
    Contents,
    Deployments,
    Discussions,
    IdToken,
    Issues,
    Metadata,
    Models,
    Packages,
    Pages,
    PullRequests,
    RepositoryProjects,
    SecurityEvents,
    Statuses,
}

impl PermissionScope {
    pub const ALL: [PermissionScope; 16] = [
        Self::Actions,
        Self::Attestations,
        Self::Checks,
        Self::Contents,
        Self::Deployments,
        Self::Discussions,
        Self::IdToken,
        Self::Issues,
        Self::Metadata,
        Self::Models,
        Self::Packages,
        Self::Pages,
        Self::PullRequests,
        Self::RepositoryProjects,
        Self::SecurityEvents,
        Self::Statuses,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Actions => "actions",
            Self::Attestations => "attestations",
            Self::Checks => "checks",
            Self::Contents => "contents",
            Self::Deployments => "deployments",
            Self::Discussions => "discussions",
            Self::IdToken => "id-token",
            Self::Issues => "issues",
            Self::Metadata => "metadata",
            Self::Models => "models",
            Self::Packages => "packages",
            Self::Pages => "pages",
            Self::PullRequests => "pull-requests",
            Self::RepositoryProjects => "repository-projects",
            Self::SecurityEvents => "security-events",
            Self::Statuses => "statuses",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|scope| scope.as_str() == normalized)
            .ok_or_else(|| format!("unknown permission scope `{}`", raw.trim()))
    }

    /// `id-token` can only be granted for writing.
    pub fn supports_read(self) -> bool {
        !matches!(self, Self::IdToken)
    }
}

impl std::fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PermissionLevel {
    #[default]
    None,
    Read,
    Write,
}

impl PermissionLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Read => "read",
            Self::Write => "write",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            _ => Err("permission level must be one of: none, read, write".to_string()),
        }
    }

    /// Write satisfies a read requirement; read never satisfies write.
    pub fn satisfies(self, required: PermissionLevel) -> bool {
        self >= required
    }
}

impl std::fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    levels: BTreeMap<PermissionScope, PermissionLevel>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every scope at the same level. Scopes that cannot hold `level` are skipped.
    pub fn uniform(level: PermissionLevel) -> Self {
        let mut set = Self::new();
        for scope in PermissionScope::ALL {
            if level == PermissionLevel::Read && !scope.supports_read() {
                continue;
            }
            set.set(scope, level);
        }
        set
    }

    /// Overwrites any previous level for `scope`.
    pub fn set(&mut self, scope: PermissionScope, level: PermissionLevel) -> &mut Self {
        self.levels.insert(scope, level);
        self
    }

    pub fn with(mut self, scope: PermissionScope, level: PermissionLevel) -> Self {
        self.set(scope, level);
        self
    }

    pub fn read(self, scope: PermissionScope) -> Self {
        self.with(scope, PermissionLevel::Read)
    }

    pub fn write(self, scope: PermissionScope) -> Self {
        self.with(scope, PermissionLevel::Write)
    }

    pub fn get(&self, scope: PermissionScope) -> Option<PermissionLevel> {
        self.levels.get(&scope).copied()
    }

    /// Effective level: absent scopes are `none`.
    pub fn level(&self, scope: PermissionScope) -> PermissionLevel {
        self.get(scope).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PermissionScope, PermissionLevel)> + '_ {
        self.levels.iter().map(|(scope, level)| (*scope, *level))
    }

    /// Raises each scope to the higher of the two levels.
    pub fn merge_from(&mut self, other: &PermissionSet) {
        for (scope, level) in other.iter() {
            let entry = self.levels.entry(scope).or_insert(level);
            if level > *entry {
                *entry = level;
            }
        }
    }

    pub fn render(&self) -> String {
        if self.levels.is_empty() {
            return "permissions: {}".to_string();
        }
        let mut out = String::from("permissions:");
        for (scope, level) in self.iter() {
            out.push_str("\n  ");
            out.push_str(scope.as_str());
            out.push_str(": ");
            out.push_str(level.as_str());
        }
        out
    }
}

/// Least upper bound of two sets; commutative and associative.
pub fn merge(a: &PermissionSet, b: &PermissionSet) -> PermissionSet {
    let mut merged = a.clone();
    merged.merge_from(b);
    merged
}

impl FromIterator<(PermissionScope, PermissionLevel)> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = (PermissionScope, PermissionLevel)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (scope, level) in iter {
            set.set(scope, level);
        }
        set
    }
}

impl Serialize for PermissionSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.levels.len()))?;
        for (scope, level) in self.iter() {
            map.serialize_entry(scope.as_str(), level.as_str())?;
        }
        map.end()
    }
}

pub fn contents_read() -> PermissionSet {
    PermissionSet::new().read(PermissionScope::Contents)
}
