//! Parsed-option registry with short/long aliasing.
//!
//! A short and a long identifier may name the *same* option record: setting
//! the value through either identifier mutates one shared record, and both
//! identifiers always observe the same value, value type and description.
//! Shared mutability is expressed as an indexed arena (`Vec<OptionRecord>`)
//! plus a name→index map rather than shared pointers.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::warn;

/// One logical command-line option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptionRecord {
    pub short_name: String,
    pub long_name: String,
    pub value_type: String,
    pub description: String,
    pub value: Option<String>,
}

impl OptionRecord {
    /// The option's value interpreted as a flag; unset options are false.
    #[must_use]
    pub fn to_bool(&self) -> bool {
        self.value.as_deref() == Some("true")
    }
}

/// Arena index of an option record.
pub type OptionId = usize;

/// Registry of options, indexed by both short and long identifiers.
#[derive(Debug, Default)]
pub struct Options {
    records: Vec<OptionRecord>,
    by_name: HashMap<String, OptionId>,
}

impl Options {
    #[must_use]
    pub fn new() -> Self {
        Options::default()
    }

    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<OptionId> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OptionRecord> {
        self.by_name.get(name).map(|&id| &self.records[id])
    }

    #[must_use]
    pub fn record(&self, id: OptionId) -> &OptionRecord {
        &self.records[id]
    }

    #[must_use]
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|record| record.value.as_deref())
    }

    /// Whether the option exists and its value is the string `"true"`.
    #[must_use]
    pub fn is_true(&self, name: &str) -> bool {
        self.get(name).is_some_and(OptionRecord::to_bool)
    }

    fn slot(&mut self, name: &str) -> OptionId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = self.records.len();
        self.records.push(OptionRecord::default());
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Set a short option's value. A repeated set logs a warning and the
    /// last write wins; through aliasing the long identifier observes the
    /// same value.
    pub fn set_short(&mut self, name: &str, value: String) {
        if self.exists(name) {
            warn!("option -{name} is set twice; \"{value}\" is used");
        }
        let id = self.slot(name);
        let record = &mut self.records[id];
        record.short_name = name.to_string();
        record.value = Some(value);
    }

    /// Set a long option's value; same overwrite semantics as `set_short`.
    pub fn set_long(&mut self, name: &str, value: String) {
        if self.exists(name) {
            warn!("option --{name} is set twice; \"{value}\" is used");
        }
        let id = self.slot(name);
        let record = &mut self.records[id];
        record.long_name = name.to_string();
        record.value = Some(value);
    }

    /// Merge a documentation entry into the registry.
    ///
    /// Reuses an already-parsed record when either identifier is known (so a
    /// value set by number/letter only at parse time is kept), registers the
    /// record under both identifiers, and returns its id. When the short and
    /// long identifiers already point at *different* records the long one is
    /// kept as authoritative and a warning is logged.
    pub fn add_documented(
        &mut self,
        short_name: &str,
        long_name: &str,
        value_type: &str,
        description: &str,
    ) -> OptionId {
        let long_id = self.by_name.get(long_name).copied();
        let short_id = if short_name.is_empty() {
            None
        } else {
            self.by_name.get(short_name).copied()
        };

        if let (Some(long), Some(short)) = (long_id, short_id) {
            if long != short {
                warn!("option -{short_name}, --{long_name} is defined twice; the long entry is used");
            }
        }

        let id = match (long_id, short_id) {
            (Some(id), _) | (None, Some(id)) => id,
            (None, None) => {
                let id = self.records.len();
                self.records.push(OptionRecord::default());
                id
            }
        };

        let record = &mut self.records[id];
        record.short_name = short_name.to_string();
        record.long_name = long_name.to_string();
        record.value_type = value_type.to_string();
        record.description = description.to_string();

        self.by_name.insert(long_name.to_string(), id);
        if !short_name.is_empty() {
            self.by_name.insert(short_name.to_string(), id);
        }

        id
    }

    /// Flatten every valued option into an identifier→value map, emitting an
    /// entry for both the short and the long identifier so a consumer can
    /// look a flag up by either name.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        for record in &self.records {
            let Some(value) = &record.value else {
                continue;
            };
            if !record.long_name.is_empty() {
                map.insert(record.long_name.clone(), value.clone());
            }
            if !record.short_name.is_empty() {
                map.insert(record.short_name.clone(), value.clone());
            }
        }
        map
    }

    /// All records in arena order (documentation dumps).
    #[must_use]
    pub fn records(&self) -> &[OptionRecord] {
        &self.records
    }
}
