//! Best-effort repair and parsing of model JSON output.
//!
//! Models asked for "only a JSON object" still wrap it in code fences, leave
//! trailing commas, forget to quote keys, or double-escape quotes. The
//! cleaning pipeline fixes those with plain text rewrites. The rewrites are
//! blunt: key quoting also fires on `word:` inside string values (URLs,
//! times), and unescaping breaks strings that legitimately contain `\"`.

use std::sync::LazyLock;

use quarry_core::error::RecoveryError;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

static JSON_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```json\s*").expect("json fence regex"));

static LEADING_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*```[A-Za-z0-9_+-]*\s*").expect("leading fence regex"));

static CLOSING_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```\s*$").expect("closing fence regex"));

static TRAILING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*$").expect("trailing comma regex"));

static COMMA_BEFORE_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("comma before close regex"));

static BARE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z0-9_]+):").expect("bare key regex"));

/// Apply the cleaning rewrites to raw model output, in order:
///
/// 1. drop ```` ```json ```` fences anywhere, a leading bare fence, and a
///    closing fence at the end
/// 2. trim surrounding whitespace
/// 3. drop a trailing comma at the end and commas directly before `}` or `]`
/// 4. quote bare keys: `word:` becomes `"word":`
/// 5. turn `\"` into `"`, then `\\` into `\`
pub fn clean_json_text(raw: &str) -> String {
    let text = JSON_FENCE_RE.replace_all(raw, "");
    let text = LEADING_FENCE_RE.replace(&text, "");
    let text = CLOSING_FENCE_RE.replace(&text, "");
    let text = text.trim();

    let text = TRAILING_COMMA_RE.replace(text, "");
    let text = COMMA_BEFORE_CLOSE_RE.replace_all(&text, "$1");

    let text = BARE_KEY_RE.replace_all(&text, "\"$1\":");

    text.replace("\\\"", "\"").replace("\\\\", "\\")
}

/// Clean `raw` and parse it as `T`.
///
/// On failure the error carries both the raw and the cleaned text.
pub fn recover<T: DeserializeOwned>(raw: &str) -> Result<T, RecoveryError> {
    let cleaned = clean_json_text(raw);
    debug!(cleaned = %cleaned, "Parsing cleaned model output");

    serde_json::from_str(&cleaned).map_err(|e| {
        warn!(raw = %raw, cleaned = %cleaned, error = %e, "Failed to parse model output as JSON");
        RecoveryError::Parse {
            raw: raw.to_string(),
            cleaned,
            reason: e.to_string(),
        }
    })
}
