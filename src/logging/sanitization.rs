use regex::Regex;
use std::sync::OnceLock;

/// Patterns for removing sensitive data from logged query text
pub struct SanitizationPatterns {
    email: Regex,
    api_key: Regex,
    bearer_token: Regex,
    secret_argument: Regex,
    secret_field: Regex,
    ipv4_address: Regex,
}

static PATTERNS: OnceLock<SanitizationPatterns> = OnceLock::new();

pub fn get_patterns() -> &'static SanitizationPatterns {
    PATTERNS.get_or_init(|| SanitizationPatterns {
        // Email addresses - keep domain visible
        email: Regex::new(r"\b([a-zA-Z0-9._%+-]+)@([a-zA-Z0-9.-]+\.[a-zA-Z]{2,})\b").unwrap(),

        api_key: Regex::new(r"\b(sk_|pk_|api_|key_)[a-zA-Z0-9_]{15,}\b").unwrap(),

        bearer_token: Regex::new(r"Bearer\s+[a-zA-Z0-9\-_\.]+").unwrap(),

        // Quoted GraphQL arguments such as `login(password: "hunter2")`
        secret_argument: Regex::new(
            r#"(?i)\b(password|passwd|pwd|token|secret|apiKey|api_key)\s*:\s*"(?:[^"\\]|\\.)*""#,
        )
        .unwrap(),

        // `password=...` style fields outside GraphQL syntax
        secret_field: Regex::new(r"(?i)\b(password|passwd|pwd)\s*=\s*\S+").unwrap(),

        // IPv4 addresses - show subnet only
        ipv4_address: Regex::new(r"\b(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})\b").unwrap(),
    })
}

/// Redact credentials and personal data before text reaches a log line or
/// a recorded event.
///
/// - Email addresses become `***@domain`
/// - API keys and bearer tokens become `[REDACTED]`
/// - Quoted secret arguments keep their name: `password: "[REDACTED]"`
/// - IPv4 addresses keep the first two octets
pub fn sanitize_log_message(message: &str) -> String {
    let patterns = get_patterns();

    let result = patterns.email.replace_all(message, "***@$2");
    let result = patterns.api_key.replace_all(&result, "[REDACTED]");
    let result = patterns.bearer_token.replace_all(&result, "Bearer [REDACTED]");
    let result = patterns
        .secret_argument
        .replace_all(&result, r#"$1: "[REDACTED]""#);
    let result = patterns.secret_field.replace_all(&result, "$1=[REDACTED]");
    let result = patterns.ipv4_address.replace_all(&result, "$1.$2.x.x");

    result.into_owned()
}
