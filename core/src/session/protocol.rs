//! Horizons telnet vocabulary
//!
//! Prompt patterns are matched loosely, the commands sent back must be
//! exactly these: the service is stateful and order-sensitive.

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::error::{FailureKind, ParseField};

pub const PAGING_OFF: &str = "PAGE";
pub const AFFIRMATIVE: &str = "yes";
pub const NEGATIVE: &str = "no";
pub const SELECT_SPK: &str = "s";
/// Answer to "SPK text transfer format?", i.e. binary
pub const BINARY_FORMAT: &str = "NO";
pub const QUIT: &str = "quit";

/// Index of "No matches found" in the `MatchOrNone` pattern list
pub const NO_MATCHES_INDEX: usize = 1;

lazy_static! {
    pub static ref HORIZONS_PROMPT: Regex = Regex::new(r"Horizons>").unwrap();
    pub static ref PAGING_OFF_ACK: Regex = Regex::new(r"PAGING toggled OFF").unwrap();
    pub static ref CONTINUE_PROMPT: Regex = Regex::new(r"Continue").unwrap();
    pub static ref SPK_SELECTOR: Regex = Regex::new(r"\[S\]PK").unwrap();
    pub static ref NO_MATCHES: Regex = Regex::new(r"No matches found").unwrap();
    pub static ref EMAIL_PROMPT: Regex = Regex::new(r"Enter your Internet e-mail address").unwrap();
    pub static ref EMAIL_CONFIRM: Regex = Regex::new(r"Confirm e-mail address").unwrap();
    pub static ref FORMAT_PROMPT: Regex = Regex::new(r"SPK text transfer format").unwrap();
    pub static ref START_PROMPT: Regex = Regex::new(r"SPK object START").unwrap();
    pub static ref STOP_PROMPT: Regex = Regex::new(r"SPK object STOP").unwrap();
    pub static ref MORE_OBJECTS_PROMPT: Regex = Regex::new(r"Add more objects to file").unwrap();
    pub static ref LOCATOR_LINE: Regex = Regex::new(r"(?:ftp|https?)://[^\s]+[ \t]*\r?\n").unwrap();

    static ref OBJECT_ID: regex::Regex =
        regex::Regex::new(r"object ID:[ \t]*(?P<objid>[0-9]*)").unwrap();
}

/// Extraction failure: which value, and why
pub type ExtractError = (FailureKind, String);

/// Object ID printed right before the e-mail prompt; the last labelled value wins.
pub fn parse_object_id(text: &str) -> Result<String, ExtractError> {
    let parse_error = FailureKind::ParseError(ParseField::ObjectId);

    let caps = OBJECT_ID
        .captures_iter(text)
        .last()
        .ok_or_else(|| (parse_error, "no \"object ID:\" label in server output".to_string()))?;

    let digits = caps.name("objid").map(|m| m.as_str()).unwrap_or_default();
    if digits.is_empty() {
        return Err((parse_error, "\"object ID:\" label is not followed by digits".to_string()));
    }

    Ok(digits.to_string())
}

/// Locator URL from the matched line, stripped of framing whitespace
pub fn parse_locator(matched: &str) -> Result<String, ExtractError> {
    let locator = matched.trim();
    match reqwest::Url::parse(locator) {
        Ok(url) if matches!(url.scheme(), "ftp" | "http" | "https") && url.has_host() => {
            Ok(locator.to_string())
        }
        Ok(url) => Err((
            FailureKind::ParseError(ParseField::Locator),
            format!("unexpected locator {}", url),
        )),
        Err(e) => Err((
            FailureKind::ParseError(ParseField::Locator),
            format!("malformed locator {:?}: {}", locator, e),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_id() {
        let before =
            "\r\n Unnumbered object: \"2000 SG344\"\r\n Assigned SPK object ID:  3054374\r\n\r\n ";
        assert_eq!(parse_object_id(before).unwrap(), "3054374");
    }

    #[test]
    fn test_parse_object_id_takes_last_label() {
        let before = "object ID: 111\r\nobject ID: 222\r\n";
        assert_eq!(parse_object_id(before).unwrap(), "222");
    }

    #[test]
    fn test_parse_object_id_failures() {
        let (kind, detail) = parse_object_id("nothing useful here").unwrap_err();
        assert_eq!(kind, FailureKind::ParseError(ParseField::ObjectId));
        assert!(detail.contains("no \"object ID:\" label"));

        let (kind, detail) = parse_object_id("SPK object ID: n/a").unwrap_err();
        assert_eq!(kind, FailureKind::ParseError(ParseField::ObjectId));
        assert!(detail.contains("not followed by digits"));
    }

    #[test]
    fn test_parse_locator_trims_framing() {
        let locator = parse_locator("ftp://ssd.jpl.nasa.gov/pub/ssd/wld24862.15\r\n").unwrap();
        assert_eq!(locator, "ftp://ssd.jpl.nasa.gov/pub/ssd/wld24862.15");
    }

    #[test]
    fn test_locator_pattern_needs_line_break() {
        assert!(!LOCATOR_LINE.is_match(b"Full path   :  ftp://ssd.jpl.nasa.gov/pub/ssd/wld2"));
        let text = b"Full path   :  ftp://ssd.jpl.nasa.gov/pub/ssd/wld24862.15\r\n";
        let m = LOCATOR_LINE.find(text).unwrap();
        assert_eq!(m.as_bytes(), b"ftp://ssd.jpl.nasa.gov/pub/ssd/wld24862.15\r\n");
    }

    #[test]
    fn test_parse_locator_rejects_garbage() {
        let (kind, _) = parse_locator("ftp://\r\n").unwrap_err();
        assert_eq!(kind, FailureKind::ParseError(ParseField::Locator));
    }
}
