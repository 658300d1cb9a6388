// SPDX-License-Identifier: MIT

//! Credential redaction for conversation memory (spec.md §3 "Conversation
//! entry", §8 invariant 13). A fixed set of literal patterns, not a
//! learned or configurable detector.

use regex::Regex;
use std::sync::LazyLock;

const REDACTED: &str = "[REDACTED]";

static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // key = value / key: value secrets (api_key, token, password, secret, ...)
        Regex::new(r#"(?i)\b(api[_-]?key|token|secret|password|passwd)\b\s*[:=]\s*\S+"#).unwrap(),
        // Bearer / Basic auth headers.
        Regex::new(r#"(?i)\b(bearer|basic)\s+[A-Za-z0-9._~+/=-]{8,}"#).unwrap(),
        // sk-ant / sk-live style vendor secret prefixes.
        Regex::new(r#"\bsk-[A-Za-z0-9_-]{10,}\b"#).unwrap(),
        // AWS access key ids.
        Regex::new(r#"\bAKIA[0-9A-Z]{16}\b"#).unwrap(),
        // GitHub personal access tokens.
        Regex::new(r#"\bgh[pousr]_[A-Za-z0-9]{20,}\b"#).unwrap(),
        // URL userinfo (user:pass@host).
        Regex::new(r#"://[^/\s:@]+:[^/\s:@]+@"#).unwrap(),
        // JWTs.
        Regex::new(r#"\beyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\b"#).unwrap(),
    ]
});

/// Replace every credential-looking substring with `[REDACTED]`.
pub fn redact(text: &str) -> String {
    let mut out = text.to_string();
    for pattern in PATTERNS.iter() {
        out = pattern.replace_all(&out, REDACTED).into_owned();
    }
    out
}

#[cfg(test)]
#[path = "redact_tests.rs"]
mod tests;
