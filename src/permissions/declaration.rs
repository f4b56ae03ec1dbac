use super::{PermissionLevel, PermissionScope, PermissionSet};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A permission block as written by the user, or as computed for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionsDeclaration {
    ReadAll,
    WriteAll,
    Explicit(PermissionSet),
}

impl Default for PermissionsDeclaration {
    fn default() -> Self {
        Self::Explicit(PermissionSet::new())
    }
}

impl PermissionsDeclaration {
    pub fn parse_value(value: &serde_yaml::Value) -> Result<Self, String> {
        match value {
            serde_yaml::Value::Null => Ok(Self::default()),
            serde_yaml::Value::String(raw) => match raw.trim() {
                "read-all" => Ok(Self::ReadAll),
                "write-all" => Ok(Self::WriteAll),
                other => Err(format!(
                    "permissions shorthand must be `read-all` or `write-all`, got `{other}`"
                )),
            },
            serde_yaml::Value::Mapping(map) => {
                let mut set = PermissionSet::new();
                if let Some(all) = map.get("all") {
                    let level = all
                        .as_str()
                        .ok_or_else(|| "permissions `all` must be a string level".to_string())
                        .and_then(PermissionLevel::parse)?;
                    if level == PermissionLevel::Write {
                        return Err(
                            "permissions `all: write` is not allowed; use `write-all` explicitly"
                                .to_string(),
                        );
                    }
                    // Workflow files have no `all` key, so the default is
                    // expanded into every scope it covers.
                    set = PermissionSet::uniform(level);
                }
                for (key, level) in map {
                    let key = key
                        .as_str()
                        .ok_or_else(|| "permission scopes must be strings".to_string())?;
                    if key == "all" {
                        continue;
                    }
                    let scope = PermissionScope::parse(key)?;
                    let level = level
                        .as_str()
                        .ok_or_else(|| format!("permission `{key}` must be a string level"))
                        .and_then(PermissionLevel::parse)?;
                    if level == PermissionLevel::Read && !scope.supports_read() {
                        return Err(format!("permission `{key}` cannot be granted `read`"));
                    }
                    set.set(scope, level);
                }
                Ok(Self::Explicit(set))
            }
            _ => Err("permissions must be a shorthand string or a scope mapping".to_string()),
        }
    }

    /// Expanded scope levels, used wherever a concrete check is needed.
    pub fn effective(&self) -> PermissionSet {
        match self {
            Self::ReadAll => PermissionSet::uniform(PermissionLevel::Read),
            Self::WriteAll => PermissionSet::uniform(PermissionLevel::Write),
            Self::Explicit(set) => set.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Explicit(set) if set.is_empty())
    }

    pub fn render(&self) -> String {
        match self {
            Self::ReadAll => "permissions: read-all".to_string(),
            Self::WriteAll => "permissions: write-all".to_string(),
            Self::Explicit(set) => set.render(),
        }
    }
}

impl From<PermissionSet> for PermissionsDeclaration {
    fn from(value: PermissionSet) -> Self {
        Self::Explicit(value)
    }
}

impl Serialize for PermissionsDeclaration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::ReadAll => serializer.serialize_str("read-all"),
            Self::WriteAll => serializer.serialize_str("write-all"),
            Self::Explicit(set) => set.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for PermissionsDeclaration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_yaml::Value::deserialize(deserializer)?;
        Self::parse_value(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<PermissionsDeclaration, String> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml).expect("yaml");
        PermissionsDeclaration::parse_value(&value)
    }

    #[test]
    fn shorthands_render_verbatim() {
        assert_eq!(
            parse("read-all").expect("read-all").render(),
            "permissions: read-all"
        );
        assert_eq!(
            parse("write-all").expect("write-all").render(),
            "permissions: write-all"
        );
        assert!(parse("everything").is_err());
    }

    #[test]
    fn all_default_is_overridden_by_explicit_scopes() {
        let declaration = parse("all: read\nissues: write\nchecks: none").expect("parse");
        let effective = declaration.effective();
        assert_eq!(effective.level(PermissionScope::Contents), PermissionLevel::Read);
        assert_eq!(effective.level(PermissionScope::Issues), PermissionLevel::Write);
        assert_eq!(effective.get(PermissionScope::Checks), Some(PermissionLevel::None));
        assert_eq!(effective.get(PermissionScope::IdToken), None);
    }

    #[test]
    fn all_default_renders_as_expanded_scopes() {
        let rendered = parse("all: read\nissues: write\nchecks: none")
            .expect("parse")
            .render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 16, "{rendered}");
        assert_eq!(lines[0], "permissions:");
        assert_eq!(lines[1], "  actions: read");
        assert!(lines.contains(&"  checks: none"));
        assert!(lines.contains(&"  issues: write"));
        assert!(!rendered.contains("all:"));
        assert!(!rendered.contains("id-token"));
    }

    #[test]
    fn empty_mapping_is_an_explicit_empty_declaration() {
        let declaration = parse("{}").expect("parse");
        assert!(declaration.is_empty());
        assert_eq!(declaration.render(), "permissions: {}");
    }

    #[test]
    fn invalid_levels_and_scopes_are_rejected() {
        assert!(parse("contents: admin").is_err());
        assert!(parse("wiki: read").is_err());
        assert!(parse("id-token: read").is_err());
        assert!(parse("all: write").is_err());
    }

    #[test]
    fn read_all_excludes_write_only_scopes() {
        let effective = PermissionsDeclaration::ReadAll.effective();
        assert_eq!(effective.get(PermissionScope::IdToken), None);
        assert_eq!(effective.level(PermissionScope::Metadata), PermissionLevel::Read);
    }
}
