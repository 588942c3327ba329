//! Display masking for API key values.
//!
//! `mask_key("sk_live_1234567890abcd", 4)` -> `"sk_live_********abcd"`.
//! The recognized prefix and the trailing characters stay visible;
//! everything in between collapses to at most eight asterisks.

/// Key prefixes that are preserved verbatim in the masked output.
const KNOWN_PREFIXES: [&str; 6] = [
    "sk_live_", "sk_test_", "pk_live_", "pk_test_", "rk_live_", "rk_test_",
];

/// Maximum number of mask characters, regardless of key length.
const MASK_CAP: usize = 8;

/// Create a masked version of an API key for display.
///
/// Keys shorter than `show_chars` return a fixed eight-asterisk
/// placeholder.  The input is never mutated or logged.
pub fn mask_key(api_key: &str, show_chars: usize) -> String {
    let total = api_key.chars().count();
    if api_key.is_empty() || total <= show_chars {
        return "*".repeat(MASK_CAP);
    }

    let (prefix, rest) = KNOWN_PREFIXES
        .iter()
        .find_map(|p| api_key.strip_prefix(p).map(|rest| (*p, rest)))
        .unwrap_or(("", api_key));

    let rest_len = rest.chars().count();
    if rest_len <= show_chars {
        return format!("{prefix}{}", "*".repeat(MASK_CAP));
    }

    let masked = "*".repeat(MASK_CAP.min(rest_len - show_chars));
    let visible: String = rest.chars().skip(rest_len - show_chars).collect();

    format!("{prefix}{masked}{visible}")
}
