//! Per-service API key format validation.
//!
//! Rules live in a small dispatch table keyed by `ServiceType` so new
//! services only need a table entry, not new control flow.  Services
//! without a rule fall through to the universal bounds checks.

use crate::store::models::ServiceType;

/// Universal length bounds applied to every key.
const MIN_KEY_LEN: usize = 10;
const MAX_KEY_LEN: usize = 200;

/// Format heuristics for one service.
struct FormatRule {
    label: &'static str,
    prefixes: &'static [&'static str],
    min_len: usize,
}

fn rule_for(service_type: ServiceType) -> Option<FormatRule> {
    match service_type {
        ServiceType::Stripe => Some(FormatRule {
            label: "Stripe",
            prefixes: &["sk_live_", "sk_test_"],
            min_len: 20,
        }),
        ServiceType::Openai => Some(FormatRule {
            label: "OpenAI",
            prefixes: &["sk-"],
            min_len: 20,
        }),
        ServiceType::Airtable => Some(FormatRule {
            label: "Airtable",
            prefixes: &["key"],
            min_len: 15,
        }),
        _ => None,
    }
}

/// Validate an API key's format for a specific service.
///
/// Returns `(true, "")` on success, or `(false, reason)` with a
/// human-readable reason on failure.
pub fn validate_format(api_key: &str, service_type: ServiceType) -> (bool, String) {
    let key = api_key.trim();
    if key.is_empty() {
        return (false, "API key cannot be empty".to_string());
    }

    if let Some(rule) = rule_for(service_type) {
        if !rule.prefixes.iter().any(|p| key.starts_with(p)) {
            let expected = rule
                .prefixes
                .iter()
                .map(|p| format!("'{p}'"))
                .collect::<Vec<_>>()
                .join(" or ");
            return (
                false,
                format!("{} API keys must start with {expected}", rule.label),
            );
        }
        if key.len() < rule.min_len {
            return (
                false,
                format!("{} API key appears to be too short", rule.label),
            );
        }
    }

    if key.len() < MIN_KEY_LEN {
        return (false, "API key appears to be too short".to_string());
    }
    if key.len() > MAX_KEY_LEN {
        return (false, "API key appears to be too long".to_string());
    }
    if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return (
            false,
            "API key contains invalid whitespace or control characters".to_string(),
        );
    }

    (true, String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stripe_key_requires_known_prefix() {
        let (ok, reason) = validate_format("pk_live_1234567890abcdef", ServiceType::Stripe);
        assert!(!ok);
        assert!(reason.contains("sk_live_"));

        let (ok, reason) = validate_format("sk_test_1234567890abcdef", ServiceType::Stripe);
        assert!(ok, "unexpected reason: {reason}");
        assert!(reason.is_empty());
    }

    #[test]
    fn stripe_key_too_short() {
        let (ok, reason) = validate_format("sk_live_abc", ServiceType::Stripe);
        assert!(!ok);
        assert!(reason.contains("too short"));
    }

    #[test]
    fn openai_key_requires_sk_dash() {
        let (ok, _) = validate_format("sk-abcdefghijklmnopqrst", ServiceType::Openai);
        assert!(ok);

        let (ok, reason) = validate_format("pk-abcdefghijklmnopqrst", ServiceType::Openai);
        assert!(!ok);
        assert!(reason.contains("sk-"));
    }

    #[test]
    fn airtable_key_requires_key_prefix() {
        let (ok, _) = validate_format("keyABCDEF1234567", ServiceType::Airtable);
        assert!(ok);

        let (ok, _) = validate_format("tokABCDEF1234567", ServiceType::Airtable);
        assert!(!ok);
    }

    #[test]
    fn unknown_service_gets_universal_checks_only() {
        let (ok, _) = validate_format("any-token-value-here", ServiceType::Other);
        assert!(ok);

        let (ok, reason) = validate_format("short", ServiceType::Other);
        assert!(!ok);
        assert!(reason.contains("too short"));
    }

    #[test]
    fn universal_bounds_apply() {
        let long = "x".repeat(201);
        let (ok, reason) = validate_format(&long, ServiceType::Twilio);
        assert!(!ok);
        assert!(reason.contains("too long"));

        let (ok, reason) = validate_format("abc\tdef-ghij-klmno", ServiceType::Aws);
        assert!(!ok);
        assert!(reason.contains("whitespace"));
    }

    #[test]
    fn empty_key_is_rejected() {
        let (ok, reason) = validate_format("   ", ServiceType::Other);
        assert!(!ok);
        assert!(reason.contains("empty"));
    }
}
