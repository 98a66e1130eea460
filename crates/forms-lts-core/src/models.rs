//! Core data models for Forms LTS.
//!
//! A [`Record`] is one form submission as held by either the primary store
//! or the long term storage (LTS) archive. The same shape is used on both
//! sides; only the archive tracks a [`revision`](ArchiveEntry::revision) of
//! its own.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Submission id, assigned by the primary store and never changed.
pub type RecordId = i64;

/// Unix timestamp in seconds.
pub type Timestamp = i64;

/// A single form element value together with its element type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Element machine id, e.g. `"email"` or `"date_of_birth"`.
    pub id: String,
    /// Form element type, e.g. `"textfield"` or `"tel"`.
    #[serde(rename = "type")]
    pub element_type: String,
    /// Submitted value. Composite elements carry objects, multi-value
    /// elements carry arrays.
    pub value: Value,
}

impl Element {
    pub fn new(id: impl Into<String>, element_type: impl Into<String>, value: Value) -> Self {
        Self {
            id: id.into(),
            element_type: element_type.into(),
            value,
        }
    }

    /// True for `null`, `""`, `[]` and `{}`.
    pub fn is_empty(&self) -> bool {
        is_empty_value(&self.value)
    }
}

pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// One form submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    /// Id of the form this submission belongs to.
    pub form_id: String,
    pub created: Timestamp,
    /// Last modification time in the primary store.
    pub changed: Timestamp,
    /// Drafts are never copied.
    pub draft: bool,
    /// Elements in form order. Ids are unique within a record.
    pub elements: Vec<Element>,
    /// Newline-delimited, append-only notes.
    pub notes: String,
}

impl Record {
    pub fn new(id: RecordId, form_id: impl Into<String>, changed: Timestamp) -> Self {
        Self {
            id,
            form_id: form_id.into(),
            created: changed,
            changed,
            draft: false,
            elements: Vec::new(),
            notes: String::new(),
        }
    }

    /// Builder-style element insert. Replaces an element with the same id.
    pub fn with_element(
        mut self,
        id: impl Into<String>,
        element_type: impl Into<String>,
        value: Value,
    ) -> Self {
        let element = Element::new(id, element_type, value);
        match self.elements.iter_mut().find(|e| e.id == element.id) {
            Some(existing) => *existing = element,
            None => self.elements.push(element),
        }
        self
    }

    pub fn with_draft(mut self, draft: bool) -> Self {
        self.draft = draft;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn element_value(&self, id: &str) -> Option<&Value> {
        self.element(id).map(|e| &e.value)
    }

    /// Sets the value of an existing element. Returns false if the record
    /// has no element with this id.
    pub fn set_element_value(&mut self, id: &str, value: Value) -> bool {
        match self.elements.iter_mut().find(|e| e.id == id) {
            Some(element) => {
                element.value = value;
                true
            }
            None => false,
        }
    }

    /// Appends a line to the notes. Existing notes are kept as they are.
    pub fn append_note(&mut self, note: &str) {
        if note.is_empty() {
            return;
        }
        if self.notes.is_empty() {
            self.notes = note.to_string();
        } else {
            self.notes.push('\n');
            self.notes.push_str(note);
        }
    }
}

/// What [`RedactionEngine::redact`](crate::redact::RedactionEngine::redact)
/// did to a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RedactionResult {
    /// Elements whose non-empty value was cleared.
    pub fully_redacted: Vec<String>,
    /// Elements scrubbed in place, with their substitution counts.
    pub partially_redacted: Vec<(String, usize)>,
}

impl RedactionResult {
    pub fn is_empty(&self) -> bool {
        self.fully_redacted.is_empty() && self.partially_redacted.is_empty()
    }

    /// All touched element ids, fully redacted ones first.
    pub fn element_ids(&self) -> Vec<&str> {
        self.fully_redacted
            .iter()
            .map(String::as_str)
            .chain(self.partially_redacted.iter().map(|(id, _)| id.as_str()))
            .collect()
    }
}

/// Summary row of a record held in the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    pub id: RecordId,
    pub form_id: String,
    /// Change time copied over from the primary store.
    pub changed: Timestamp,
    /// 1 after the first copy, incremented by every later copy.
    pub revision: i64,
    /// When the record was first archived.
    pub archived_at: Timestamp,
    /// When the archive copy was last written.
    pub updated_at: Timestamp,
}

/// Render a unix timestamp as ISO 8601 (UTC), falling back to the raw number.
pub fn format_ts_iso(ts: Timestamp) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_values() {
        assert!(is_empty_value(&Value::Null));
        assert!(is_empty_value(&json!("")));
        assert!(is_empty_value(&json!([])));
        assert!(is_empty_value(&json!({})));
        assert!(!is_empty_value(&json!("0")));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!(false)));
    }

    #[test]
    fn append_note_keeps_existing() {
        let mut record = Record::new(1, "contact", 10);
        record.append_note("first");
        assert_eq!(record.notes, "first");
        record.append_note("second");
        assert_eq!(record.notes, "first\nsecond");
        record.append_note("");
        assert_eq!(record.notes, "first\nsecond");
    }

    #[test]
    fn with_element_replaces_duplicate_id() {
        let record = Record::new(1, "contact", 10)
            .with_element("name", "textfield", json!("A"))
            .with_element("name", "textfield", json!("B"));
        assert_eq!(record.elements.len(), 1);
        assert_eq!(record.element_value("name"), Some(&json!("B")));
    }

    #[test]
    fn set_element_value_unknown_id() {
        let mut record = Record::new(1, "contact", 10);
        assert!(!record.set_element_value("missing", json!("x")));
    }

    #[test]
    fn format_ts() {
        assert_eq!(format_ts_iso(0), "1970-01-01T00:00:00Z");
    }
}
