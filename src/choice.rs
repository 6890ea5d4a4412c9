//!
//! Choices returned by the location endpoints and the entries rendered from them.
//!
use serde::{Deserialize, Deserializer};

/// Label of the entry that stands for "no selection"
pub const PLACEHOLDER_LABEL: &str = "---------";

/// Identifier of a [`Choice`]. The endpoints return numeric primary keys, but
/// any JSON number or string is accepted.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ChoiceId {
    /// Numeric id
    Number(i64),
    /// Numeric id above `i64::MAX`
    Unsigned(u64),
    /// Numeric id written with a fraction, e.g. `12.0`
    Float(f64),
    /// String id, e.g. a slug or UUID
    Text(String),
}

impl std::fmt::Display for ChoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Unsigned(n) => write!(f, "{}", n),
            Self::Float(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ChoiceId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for ChoiceId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// One selectable site, area or rack
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Choice {
    /// Primary key
    pub id: ChoiceId,
    /// Display name, empty when missing or `null`
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Choice {
    /// Create a choice with a numeric id
    #[must_use]
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id: ChoiceId::Number(id),
            name: name.to_string(),
        }
    }
}

/// Body of a location endpoint response
#[derive(Debug, Default, Deserialize)]
pub struct ChoiceList {
    /// Missing `results` decodes as an empty list
    #[serde(default)]
    pub results: Vec<Choice>,
}

/// A rendered `<option>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Submitted value, empty for the placeholder
    pub value: String,
    /// Visible text
    pub label: String,
}

impl Entry {
    /// The "no selection" entry
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            value: String::new(),
            label: PLACEHOLDER_LABEL.to_string(),
        }
    }

    /// `true` for the placeholder entry
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.value.is_empty()
    }
}

impl From<&Choice> for Entry {
    fn from(choice: &Choice) -> Self {
        Self {
            value: choice.id.to_string(),
            label: choice.name.clone(),
        }
    }
}
