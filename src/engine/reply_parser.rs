// Tolerant parser for the oracle's three-line reply grammar

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Threat type reported when the oracle names none
pub const DEFAULT_THREAT_TYPE: &str = "SQL Injection Attempt";

/// Payload reported when the oracle names none
pub const DEFAULT_PAYLOAD: &str = "Not identified";

static DETECTED_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)DETECTED:\s*(true|false)").unwrap());
static THREAT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)THREAT:\s*(.+)").unwrap());
static PAYLOAD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)PAYLOAD:\s*(.+)").unwrap());

/// Structured view of an oracle reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedReply {
    pub detected: bool,
    pub threat_type: String,
    pub payload: String,
}

/// Parse free-form oracle output.
///
/// Each field is located independently anywhere in the text, first match
/// wins. A missing `DETECTED` line means not detected; a missing, empty or
/// `none` threat/payload falls back to its default. Never fails.
pub fn parse_reply(output: &str) -> ParsedReply {
    let detected = DETECTED_PATTERN
        .captures(output)
        .map(|caps| caps[1].eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    ParsedReply {
        detected,
        threat_type: extract_field(&THREAT_PATTERN, output).unwrap_or_else(|| DEFAULT_THREAT_TYPE.to_string()),
        payload: extract_field(&PAYLOAD_PATTERN, output).unwrap_or_else(|| DEFAULT_PAYLOAD.to_string()),
    }
}

fn extract_field(pattern: &Regex, output: &str) -> Option<String> {
    let caps = pattern.captures(output)?;
    let value = caps[1].trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(value.to_string())
    }
}
