//! In-text PII scrubbing.
//!
//! Replaces UK postcodes, email addresses and digit runs inside free text
//! with fixed placeholders. Passes run in a fixed order so that digits
//! inside a postcode or an email address are consumed before the number
//! pass and never counted twice.
//!
//! Email matching covers common formats only: `foo@example.net` is fully
//! replaced but `foo\@bar@example` is only partly.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Catches *most* UK postcodes.
pub const UK_SIMPLE_POSTCODE_REGEX: &str = r"(?i-u)[A-Z]{1,2}[0-9][A-Z0-9]? ?[0-9][A-Z]{2}";

/// Catches *most* simple email addresses.
pub const SIMPLE_EMAIL_REGEX: &str = r"(?i-u)[a-zA-Z0-9_+.-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+";

pub const NUMBER_REGEX: &str = r"[0-9]+";

pub const REDACTED_POSTCODE_LABEL: &str = "REDACTED_POSTCODE";
pub const REDACTED_EMAIL_LABEL: &str = "REDACTED_EMAIL";
pub const REDACTED_NUMBER_LABEL: &str = "REDACTED_NUMBER";

static POSTCODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(UK_SIMPLE_POSTCODE_REGEX).unwrap());
static EMAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(SIMPLE_EMAIL_REGEX).unwrap());
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(NUMBER_REGEX).unwrap());

/// Scrubs postcodes, emails and numbers from text.
pub struct TextScrubber;

impl TextScrubber {
    /// Returns the scrubbed text and the total number of substitutions.
    pub fn scrub(text: &str) -> (String, usize) {
        let (text, postcodes) = Self::redact_postcodes(text);
        let (text, emails) = Self::redact_emails(&text);
        let (text, numbers) = Self::redact_numbers(&text);
        (text, postcodes + emails + numbers)
    }

    pub fn redact_postcodes(text: &str) -> (String, usize) {
        replace_counted(&POSTCODE, text, REDACTED_POSTCODE_LABEL)
    }

    /// Repeats until no match is left: a placeholder followed by another
    /// `@domain` forms a new match.
    pub fn redact_emails(text: &str) -> (String, usize) {
        let (mut result, mut total) = replace_counted(&EMAIL, text, REDACTED_EMAIL_LABEL);
        loop {
            let (next, count) = replace_counted(&EMAIL, &result, REDACTED_EMAIL_LABEL);
            if count == 0 {
                return (result, total);
            }
            result = next;
            total += count;
        }
    }

    pub fn redact_numbers(text: &str) -> (String, usize) {
        replace_counted(&NUMBER, text, REDACTED_NUMBER_LABEL)
    }
}

fn replace_counted(pattern: &Regex, text: &str, label: &str) -> (String, usize) {
    let count = pattern.find_iter(text).count();
    if count == 0 {
        return (text.to_string(), 0);
    }
    let replaced: Cow<'_, str> = pattern.replace_all(text, label);
    (replaced.into_owned(), count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redaction_count() {
        let text = "My email address is foo+bar@example.net.\n  Also reachable at qux@example.net.  My address is 7 Example road, CR8 2XX.\n  I was born on 2001-01-01.\n  I have 5 cats.";
        let (redacted, count) = TextScrubber::scrub(text);
        assert_eq!(count, 8);
        assert!(redacted.contains("REDACTED_POSTCODE"));
        assert!(redacted.contains("I have REDACTED_NUMBER cats."));
        assert!(!redacted.contains("example.net"));
    }

    #[test]
    fn test_nothing_to_redact() {
        let text = "preg_replace() performs a regex search and replace.";
        let (redacted, count) = TextScrubber::scrub(text);
        assert_eq!(count, 0);
        assert_eq!(redacted, text);
    }

    #[test]
    fn test_email_and_date() {
        let (redacted, count) = TextScrubber::scrub("My email is a@b.com, born 2001-01-01");
        assert_eq!(TextScrubber::redact_postcodes("My email is a@b.com, born 2001-01-01").1, 0);
        assert_eq!(TextScrubber::redact_emails("My email is a@b.com, born 2001-01-01").1, 1);
        assert_eq!(count, 4);
        assert_eq!(
            redacted,
            "My email is REDACTED_EMAIL, born REDACTED_NUMBER-REDACTED_NUMBER-REDACTED_NUMBER"
        );
    }

    #[test]
    fn test_postcode_digits_not_counted_as_numbers() {
        let (redacted, count) = TextScrubber::scrub("Send it to bn1 1ab please");
        assert_eq!(count, 1);
        assert_eq!(redacted, "Send it to REDACTED_POSTCODE please");
    }

    #[test]
    fn test_postcode_without_space() {
        let (_, count) = TextScrubber::redact_postcodes("SW1A1AA");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_postcode_letters_are_ascii_only() {
        // U+212A KELVIN SIGN folds to 'k' under Unicode case folding.
        let (redacted, count) = TextScrubber::redact_postcodes("\u{212A}T1 1AB");
        assert_eq!(count, 1);
        assert_eq!(redacted, "\u{212A}REDACTED_POSTCODE");
    }

    #[test]
    fn test_chained_at_signs() {
        let (redacted, count) = TextScrubber::redact_emails("a@b.com@c.org");
        assert_eq!(count, 2);
        assert_eq!(redacted, "REDACTED_EMAIL");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "My email is a@b.com, born 2001-01-01",
            "Flat 3, 12 High St, BN2 9QA. Call 01273 000000 or x.y+z@mail.example.org",
            "a@b.com@c.org and 42",
            "nothing here",
            "",
        ];
        for sample in samples {
            let (once, _) = TextScrubber::scrub(sample);
            let (twice, count) = TextScrubber::scrub(&once);
            assert_eq!(count, 0, "second pass over {:?} redacted again", once);
            assert_eq!(twice, once);
        }
    }
}
