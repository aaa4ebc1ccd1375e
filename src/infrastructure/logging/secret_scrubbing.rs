use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};

// Anthropic API keys: sk-ant-api03-...
static API_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sk-ant-[a-zA-Z0-9_-]{8,}").expect("valid api key regex"));

static BEARER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+[a-zA-Z0-9._-]+").expect("valid bearer regex"));

static KEY_VALUE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(["']?(?:x-api-key|api_key|apikey|token|secret|password)["']?\s*[:=]\s*)["']?[^"'\s,}]+["']?"#,
    )
    .expect("valid key/value regex")
});

/// Redacts credentials from text before it is logged or shown to a caller.
#[derive(Clone, Copy, Default)]
pub struct SecretScrubber;

impl SecretScrubber {
    pub const fn new() -> Self {
        Self
    }

    /// Scrub a message of sensitive data
    pub fn scrub(&self, message: &str) -> String {
        let scrubbed = API_KEY_PATTERN.replace_all(message, "[API_KEY_REDACTED]");
        let scrubbed = BEARER_PATTERN.replace_all(&scrubbed, "Bearer [TOKEN_REDACTED]");
        KEY_VALUE_PATTERN
            .replace_all(&scrubbed, |caps: &Captures<'_>| format!("{}[REDACTED]", &caps[1]))
            .into_owned()
    }
}

impl fmt::Debug for SecretScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretScrubber").finish()
    }
}
