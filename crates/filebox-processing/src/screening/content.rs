//! Text content heuristic.

use regex::Regex;
use std::sync::LazyLock;

use filebox_core::constants::TEXT_SCAN_MAX_BYTES;

static SUSPICIOUS_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("script tag", r"(?is)<script[^>]*>.*?</script>"),
        ("javascript uri", r"(?i)javascript:"),
        ("event handler", r"(?i)on\w+\s*="),
        ("eval call", r"(?i)eval\s*\("),
        ("base64", r"(?i)base64"),
    ]
    .into_iter()
    .filter_map(|(name, pattern)| match Regex::new(pattern) {
        Ok(re) => Some((name, re)),
        Err(e) => {
            tracing::error!(pattern = %pattern, error = %e, "Invalid content pattern");
            None
        }
    })
    .collect()
});

/// Whether a file of this declared type and size is subject to the text scan.
pub fn is_scannable_text(content_type: &str, size: u64) -> bool {
    if size > TEXT_SCAN_MAX_BYTES {
        return false;
    }
    let content_type = content_type.to_lowercase();
    content_type.starts_with("text/")
        || content_type.contains("json")
        || content_type.contains("markdown")
}

/// Name of the first dangerous pattern found in `text`, if any.
pub fn find_suspicious_pattern(text: &str) -> Option<&'static str> {
    SUSPICIOUS_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(name, _)| *name)
}
