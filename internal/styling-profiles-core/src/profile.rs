use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Style variable name to value.
pub type Styles = BTreeMap<String, ScalarValue>;

/// Machine name of a styling profile: non-empty, `[a-z0-9_.]+`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProfileId(String);

fn is_machine_name_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_' | '.')
}

impl ProfileId {
    pub fn parse(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(Error::validation("id", "machine name must not be empty"));
        }
        if !value.chars().all(is_machine_name_char) {
            return Err(Error::validation(
                "id",
                format!(
                    "machine name `{value}` must contain only lowercase letters, numbers, underscores and dots"
                ),
            ));
        }
        // `.` and `..` would escape the staging directory.
        if value.chars().all(|c| c == '.') {
            return Err(Error::validation(
                "id",
                format!("machine name `{value}` is reserved"),
            ));
        }
        Ok(Self(value.to_owned()))
    }

    /// Derives a machine name from a human readable label.
    pub fn from_label(label: &str) -> Result<Self> {
        let mut out = String::with_capacity(label.len());
        let mut in_gap = false;
        for c in label.chars().flat_map(char::to_lowercase) {
            if is_machine_name_char(c) {
                out.push(c);
                in_gap = false;
            } else if !in_gap {
                out.push('_');
                in_gap = true;
            }
        }
        Self::parse(out.trim_matches('_'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProfileId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ProfileId> for String {
    fn from(id: ProfileId) -> Self {
        id.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ScalarValue {
    /// Falsy in the sense theme settings use it: `""`, `"0"`, `0`, `0.0`, `false`.
    pub fn is_empty(&self) -> bool {
        match self {
            ScalarValue::Bool(b) => !b,
            ScalarValue::Integer(i) => *i == 0,
            ScalarValue::Float(f) => *f == 0.0,
            ScalarValue::String(s) => s.is_empty() || s == "0",
        }
    }

    pub fn from_toml(value: &toml::Value) -> Option<Self> {
        match value {
            toml::Value::String(s) => Some(ScalarValue::String(s.clone())),
            toml::Value::Integer(i) => Some(ScalarValue::Integer(*i)),
            toml::Value::Float(f) => Some(ScalarValue::Float(*f)),
            toml::Value::Boolean(b) => Some(ScalarValue::Bool(*b)),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(b) => write!(f, "{b}"),
            ScalarValue::Integer(i) => write!(f, "{i}"),
            ScalarValue::Float(x) => write!(f, "{x}"),
            ScalarValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::String(s.to_owned())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::String(s)
    }
}

impl From<i64> for ScalarValue {
    fn from(i: i64) -> Self {
        ScalarValue::Integer(i)
    }
}

impl From<f64> for ScalarValue {
    fn from(x: f64) -> Self {
        ScalarValue::Float(x)
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Bool(b)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StylingProfile {
    pub id: ProfileId,
    pub label: String,
    #[serde(default)]
    pub styles: Styles,
}

impl StylingProfile {
    pub fn new(id: ProfileId, label: &str, styles: Styles) -> Self {
        Self {
            id,
            label: label.trim().to_owned(),
            styles,
        }
    }
}
