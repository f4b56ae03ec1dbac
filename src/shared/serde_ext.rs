use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

/// Accepts either a single string or a sequence of strings.
pub fn string_or_seq<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    yaml_string_list(&value).map_err(D::Error::custom)
}

pub fn yaml_string_list(value: &serde_yaml::Value) -> Result<Vec<String>, String> {
    match value {
        serde_yaml::Value::Null => Ok(Vec::new()),
        serde_yaml::Value::String(raw) => Ok(vec![raw.trim().to_string()]),
        serde_yaml::Value::Sequence(items) => items
            .iter()
            .map(|item| match item {
                serde_yaml::Value::String(raw) => Ok(raw.trim().to_string()),
                serde_yaml::Value::Number(number) => Ok(number.to_string()),
                _ => Err("expected a sequence of strings".to_string()),
            })
            .collect(),
        _ => Err("expected a string or a sequence of strings".to_string()),
    }
}
