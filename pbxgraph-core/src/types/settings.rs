use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A build setting value: either a single string or a list of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    String(String),
    Array(Vec<String>),
}

impl SettingValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) => Some(s),
            SettingValue::Array(_) => None,
        }
    }

    /// Parse a caller-supplied value. A value written as a JSON string array
    /// (`["a", "b"]`) becomes an array setting, anything else stays a string.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('[') {
            if let Ok(items) = serde_json::from_str::<Vec<String>>(trimmed) {
                return SettingValue::Array(items);
            }
        }
        SettingValue::String(raw.to_string())
    }
}

impl std::fmt::Display for SettingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingValue::String(s) => write!(f, "{}", s),
            SettingValue::Array(items) => write!(f, "({})", items.join(", ")),
        }
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::String(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::String(value)
    }
}

/// Ordered key/value build settings of one configuration
pub type BuildSettings = BTreeMap<String, SettingValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_array_value() {
        assert_eq!(
            SettingValue::parse(r#"["$(inherited)", "-ObjC"]"#),
            SettingValue::Array(vec!["$(inherited)".into(), "-ObjC".into()])
        );
        assert_eq!(SettingValue::parse("YES"), SettingValue::from("YES"));
        // Not a valid string array, kept verbatim
        assert_eq!(SettingValue::parse("[oops"), SettingValue::from("[oops"));
    }

    #[test]
    fn test_untagged_serialization() {
        let mut settings = BuildSettings::new();
        settings.insert("PRODUCT_NAME".into(), "App".into());
        settings.insert(
            "OTHER_LDFLAGS".into(),
            SettingValue::Array(vec!["-ObjC".into()]),
        );
        let json = serde_json::to_string(&settings).unwrap();
        assert_eq!(json, r#"{"OTHER_LDFLAGS":["-ObjC"],"PRODUCT_NAME":"App"}"#);
        let back: BuildSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
