//! Element classification for PII redaction.
//!
//! The policy is fixed at compile time:
//!
//! | Class | Element types |
//! |-------|---------------|
//! | [`Full`](Redaction::Full) | address, email, date of birth, UK address, number, telephone, name, contact |
//! | [`Full`](Redaction::Full) if the id looks like PII | single-line text, processed text, radios, checkboxes, date |
//! | [`Partial`](Redaction::Partial) | textarea |
//! | [`None`](Redaction::None) | everything else |

use regex::Regex;
use std::sync::LazyLock;

/// Element types carrying PII for certain.
pub const PII_ELEMENT_TYPES: &[&str] = &[
    "address",
    "email",
    "localgov_forms_dob",
    "localgov_webform_uk_address",
    "number",
    "tel",
    "webform_name",
    "webform_address",
    "webform_contact",
    "webform_telephone",
];

/// Element types that may carry PII, depending on what the element is for.
pub const POTENTIAL_PII_ELEMENT_TYPES: &[&str] = &[
    "localgov_forms_date",
    "checkboxes",
    "processed_text",
    "radios",
    "textfield",
];

/// Element types where PII is mixed with other text.
pub const PARTIAL_PII_ELEMENT_TYPES: &[&str] = &["textarea"];

/// Element id fragments hinting at PII.
pub const GUESSED_PII_ID_PATTERN: &str = r"(?i-u)name|mail|phone|contact_number|date_of_birth|dob_|nino|address|postcode|post_code|personal_|title|passport|serial_number|reg_number|pcn_|driver_|gender|sex|ethnicity";

static GUESSED_PII_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(GUESSED_PII_ID_PATTERN).unwrap());

/// How an element is to be redacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redaction {
    /// Clear the whole value.
    Full,
    /// Scrub PII out of the text, keep the rest.
    Partial,
    /// Leave alone.
    None,
}

/// Maps an element type and id onto a [`Redaction`].
pub struct FieldClassifier;

impl FieldClassifier {
    pub fn classify(element_type: &str, element_id: &str) -> Redaction {
        if PII_ELEMENT_TYPES.contains(&element_type) {
            Redaction::Full
        } else if POTENTIAL_PII_ELEMENT_TYPES.contains(&element_type) {
            if GUESSED_PII_ID.is_match(element_id) {
                Redaction::Full
            } else {
                Redaction::None
            }
        } else if PARTIAL_PII_ELEMENT_TYPES.contains(&element_type) {
            Redaction::Partial
        } else {
            Redaction::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certain_pii_types() {
        for t in PII_ELEMENT_TYPES {
            assert_eq!(FieldClassifier::classify(t, "anything"), Redaction::Full);
        }
        assert_eq!(FieldClassifier::classify("tel", "work_number"), Redaction::Full);
        assert_eq!(FieldClassifier::classify("number", "cars"), Redaction::Full);
    }

    #[test]
    fn potential_pii_needs_id_match() {
        assert_eq!(FieldClassifier::classify("textfield", "nino"), Redaction::Full);
        assert_eq!(FieldClassifier::classify("textfield", "name"), Redaction::Full);
        assert_eq!(FieldClassifier::classify("textfield", "Last_Name"), Redaction::Full);
        assert_eq!(FieldClassifier::classify("radios", "gender"), Redaction::Full);
        assert_eq!(FieldClassifier::classify("checkboxes", "ethnicity"), Redaction::Full);
        assert_eq!(
            FieldClassifier::classify("localgov_forms_date", "date_of_birth"),
            Redaction::Full
        );
        assert_eq!(
            FieldClassifier::classify("textfield", "favourite_colour"),
            Redaction::None
        );
        assert_eq!(FieldClassifier::classify("textfield", "subject"), Redaction::None);
    }

    #[test]
    fn textarea_is_partial() {
        assert_eq!(FieldClassifier::classify("textarea", "message"), Redaction::Partial);
        // The id pattern only applies to potential PII types.
        assert_eq!(FieldClassifier::classify("textarea", "name"), Redaction::Partial);
    }

    #[test]
    fn unknown_types_untouched() {
        assert_eq!(FieldClassifier::classify("select", "name"), Redaction::None);
        assert_eq!(FieldClassifier::classify("managed_file", "passport"), Redaction::None);
    }

    #[test]
    fn id_pattern_is_ascii_only() {
        // U+017F LONG S folds to 's' under Unicode case folding.
        assert_eq!(FieldClassifier::classify("radios", "\u{17F}ex"), Redaction::None);
        assert_eq!(FieldClassifier::classify("radios", "SEX"), Redaction::Full);
    }
}
