// Fixed prompt contract for the classification oracle

/// Model identifier used when none is configured
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Detection instructions plus the required reply grammar.
///
/// The reply grammar must stay in sync with `engine::reply_parser`.
pub const SQLI_INSTRUCTIONS: &str = r#"Detect SQL injection in the input. Analyze for:
- SQL keywords (SELECT, UNION, DROP, INSERT, UPDATE, DELETE)
- Comments (--, /*, #)
- Quote manipulation (' or ")
- Boolean injection (OR 1=1, AND 1=1)
- Time-based (SLEEP, WAITFOR)

Reply exactly:
DETECTED: true/false
THREAT: [type or "none"]
PAYLOAD: [payload or "none"]"#;

/// Per-request input block
pub fn build_input(url: &str, body: &str) -> String {
    format!("URL: {}\nBody: {}", url, body)
}
