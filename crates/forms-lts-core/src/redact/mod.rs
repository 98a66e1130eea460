//! Personally Identifiable Information (PII) redaction.
//!
//! Produces a scrubbed copy of a [`Record`] for the archive:
//!
//! - Elements classified [`Redaction::Full`] lose their value entirely.
//! - Elements classified [`Redaction::Partial`] keep their text with
//!   postcodes, emails and numbers replaced by placeholders
//!   (see [`TextScrubber`]).
//!
//! A note listing the redacted elements is appended to the record.

pub mod classify;
pub mod scrub;

pub use classify::{FieldClassifier, Redaction};
pub use scrub::TextScrubber;

use serde_json::Value;

use crate::models::{Record, RedactionResult};

pub const REDACTED_NOTE_PREFIX: &str = "Redacted elements: ";
pub const PARTLY_REDACTED_NOTE_PREFIX: &str = "Partly redacted elements: ";

/// Applies the fixed redaction policy to records.
pub struct RedactionEngine;

impl RedactionEngine {
    /// Redacts a copy of `record`. The input is left untouched.
    pub fn redact(record: &Record) -> (Record, RedactionResult) {
        let mut redacted = record.clone();
        let result = Self::redact_in_place(&mut redacted);
        (redacted, result)
    }

    /// Redacts `record` itself. Use on a fetched copy destined for the
    /// archive, never on the primary store's instance.
    pub fn redact_in_place(record: &mut Record) -> RedactionResult {
        let mut result = RedactionResult::default();

        for element in record.elements.iter_mut() {
            match FieldClassifier::classify(&element.element_type, &element.id) {
                Redaction::Full => {
                    if !element.is_empty() {
                        element.value = Value::Null;
                        result.fully_redacted.push(element.id.clone());
                    }
                }
                Redaction::Partial => {
                    let (scrubbed, count) = scrub_value(&element.value);
                    if count > 0 {
                        element.value = scrubbed;
                        result.partially_redacted.push((element.id.clone(), count));
                    }
                }
                Redaction::None => {}
            }
        }

        if let Some(note) = redaction_note(REDACTED_NOTE_PREFIX, &result.fully_redacted) {
            record.append_note(&note);
        }
        let partly: Vec<String> = result
            .partially_redacted
            .iter()
            .map(|(id, _)| id.clone())
            .collect();
        if let Some(note) = redaction_note(PARTLY_REDACTED_NOTE_PREFIX, &partly) {
            record.append_note(&note);
        }

        result
    }
}

/// Scrubs a string, or each string of an array. Other values are returned
/// as they are with a zero count.
fn scrub_value(value: &Value) -> (Value, usize) {
    match value {
        Value::String(text) => {
            let (scrubbed, count) = TextScrubber::scrub(text);
            (Value::String(scrubbed), count)
        }
        Value::Array(items) => {
            let mut total = 0;
            let scrubbed = items
                .iter()
                .map(|item| {
                    let (v, count) = scrub_value(item);
                    total += count;
                    v
                })
                .collect();
            (Value::Array(scrubbed), total)
        }
        other => (other.clone(), 0),
    }
}

fn redaction_note(prefix: &str, element_ids: &[String]) -> Option<String> {
    if element_ids.is_empty() {
        return None;
    }
    Some(format!("{}{}.", prefix, element_ids.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use serde_json::json;

    fn contact_record() -> Record {
        Record::new(7, "contact", 1_700_000_000)
            .with_element("name", "textfield", json!("Foo Bar"))
            .with_element("email", "email", json!("foo@example.net"))
            .with_element("subject", "textfield", json!("Bins"))
            .with_element(
                "message",
                "textarea",
                json!("Please collect from BN1 1AB, reply to foo@example.net thanks"),
            )
            .with_element("work_number", "tel", json!(""))
            .with_element("location", "address", json!({"address": "1 Road", "postcode": "BN1 1AB"}))
            .with_element("cars", "number", json!(2))
            .with_notes("Called back on Monday.")
    }

    #[test]
    fn test_full_and_partial_redaction() {
        let record = contact_record();
        let (redacted, result) = RedactionEngine::redact(&record);

        assert_eq!(result.fully_redacted, vec!["name", "email", "location", "cars"]);
        assert_eq!(result.partially_redacted, vec![("message".to_string(), 2)]);

        assert_eq!(redacted.element_value("name"), Some(&Value::Null));
        assert_eq!(redacted.element_value("email"), Some(&Value::Null));
        assert_eq!(redacted.element_value("subject"), Some(&json!("Bins")));
        assert_eq!(
            redacted.element_value("message"),
            Some(&json!(
                "Please collect from REDACTED_POSTCODE, reply to REDACTED_EMAIL thanks"
            ))
        );
        assert_eq!(
            redacted.notes,
            "Called back on Monday.\nRedacted elements: name, email, location, cars.\nPartly redacted elements: message."
        );
    }

    #[test]
    fn test_source_untouched() {
        let record = contact_record();
        let before = record.clone();
        let _ = RedactionEngine::redact(&record);
        assert_eq!(record, before);
    }

    #[test]
    fn test_empty_values_not_reported() {
        let record = contact_record();
        let (redacted, result) = RedactionEngine::redact(&record);
        assert!(!result.fully_redacted.contains(&"work_number".to_string()));
        assert_eq!(redacted.element_value("work_number"), Some(&json!("")));
    }

    #[test]
    fn test_every_full_type_cleared() {
        for element_type in classify::PII_ELEMENT_TYPES {
            let record = Record::new(1, "f", 1)
                .with_element("field", *element_type, json!("x"))
                .with_element("blank", *element_type, Value::Null);
            let (redacted, result) = RedactionEngine::redact(&record);
            assert_eq!(result.fully_redacted, vec!["field"], "type {}", element_type);
            assert!(redacted.element("field").unwrap().is_empty());
        }
    }

    #[test]
    fn test_no_note_without_redaction() {
        let record = Record::new(1, "f", 1)
            .with_element("subject", "textfield", json!("Parking"))
            .with_element("message", "textarea", json!("No personal data here."));
        let (redacted, result) = RedactionEngine::redact(&record);
        assert!(result.is_empty());
        assert_eq!(redacted.notes, "");
        assert_eq!(redacted, record);
    }

    #[test]
    fn test_partial_on_multi_value_textarea() {
        let record = Record::new(1, "f", 1).with_element(
            "comments",
            "textarea",
            json!(["call 0123", "nothing", "a@b.com"]),
        );
        let (redacted, result) = RedactionEngine::redact(&record);
        assert_eq!(result.partially_redacted, vec![("comments".to_string(), 2)]);
        assert_eq!(
            redacted.element_value("comments"),
            Some(&json!(["call REDACTED_NUMBER", "nothing", "REDACTED_EMAIL"]))
        );
    }
}
