//!
//! In-memory model of a `<select>` element.
//!
use std::collections::BTreeMap;

use crate::choice::{Choice, Entry};

/// Data attribute holding the value to restore after a reload
pub const CURRENT_VALUE: &str = "currentValue";

/// A select widget: its entries, value, disabled flag and data attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Select {
    id: String,
    value: String,
    disabled: bool,
    entries: Vec<Entry>,
    dataset: BTreeMap<String, String>,
}

impl Select {
    /// Create an enabled select showing only the placeholder
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            value: String::new(),
            disabled: false,
            entries: vec![Entry::placeholder()],
            dataset: BTreeMap::new(),
        }
    }

    /// Set the initial value, as rendered by the server
    #[must_use]
    pub fn with_value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    /// Set a data attribute, e.g. `areasUrl`
    #[must_use]
    pub fn with_data(mut self, key: &str, value: &str) -> Self {
        self.dataset.insert(key.to_string(), value.to_string());
        self
    }

    /// Element id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Selected value, empty when the placeholder is selected
    pub fn value(&self) -> &str {
        &self.value
    }

    pub(crate) fn set_value(&mut self, value: &str) {
        self.value = value.to_string();
    }

    /// `true` when the widget does not accept input
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub(crate) fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// Rendered entries, placeholder first
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Entry matching the selected value
    pub fn selected(&self) -> Option<&Entry> {
        self.entries.iter().find(|e| e.value == self.value)
    }

    /// Read a data attribute
    pub fn data(&self, key: &str) -> Option<&str> {
        self.dataset.get(key).map(String::as_str)
    }

    pub(crate) fn set_data(&mut self, key: &str, value: &str) {
        self.dataset.insert(key.to_string(), value.to_string());
    }

    /// Value to restore once the entries are refetched
    pub fn current_value(&self) -> &str {
        self.data(CURRENT_VALUE).unwrap_or_default()
    }

    /// Drop everything but the placeholder and select it
    pub(crate) fn reset(&mut self) {
        self.value.clear();
        self.entries.clear();
        self.entries.push(Entry::placeholder());
    }

    /// Replace the entries with the placeholder followed by `choices` and select
    /// the one whose id equals `selected`. Returns the selected value, if any.
    pub fn populate(&mut self, choices: &[Choice], selected: Option<&str>) -> Option<String> {
        self.entries.clear();
        self.entries.push(Entry::placeholder());
        self.entries.extend(choices.iter().map(Entry::from));

        let hit = selected
            .filter(|s| !s.is_empty())
            .and_then(|s| self.entries.iter().find(|e| e.value == s))
            .map(|e| e.value.clone());

        self.value = hit.clone().unwrap_or_default();
        hit
    }
}
