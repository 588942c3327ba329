//! Key test collaborator — lightweight connectivity/format checks.
//!
//! The vault hands a decrypted credential and its service type to a
//! `KeyTester` and records the outcome in the audit log.  Implementations
//! must never panic and must convert network failures (timeouts,
//! connection errors) into negative outcomes rather than errors.

use serde_json::{json, Map, Value};

use crate::cipher::validate::validate_format;
use crate::store::models::ServiceType;

#[cfg(feature = "live-test")]
pub mod http;
#[cfg(feature = "live-test")]
pub use http::HttpTester;

/// Result of one key test.
#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub success: bool,
    pub message: String,
    /// Diagnostic detail (status codes, flags); never contains the key.
    pub details: Map<String, Value>,
}

impl TestOutcome {
    pub fn passed(message: impl Into<String>, details: Map<String, Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details,
        }
    }

    pub fn failed(message: impl Into<String>, details: Map<String, Value>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details,
        }
    }
}

/// Connectivity/format check for a decrypted credential.
pub trait KeyTester: Send + Sync {
    fn test(&self, api_key: &str, service_type: ServiceType) -> TestOutcome;
}

/// Format-only tester: validates the key's shape without any network
/// traffic.  Sets `validation_only: true` in the outcome details so
/// callers can tell it apart from a live connectivity check.
pub struct FormatTester;

impl KeyTester for FormatTester {
    fn test(&self, api_key: &str, service_type: ServiceType) -> TestOutcome {
        let (ok, reason) = validate_format(api_key, service_type);

        let mut details = Map::new();
        details.insert("validation_only".to_string(), Value::Bool(true));
        details.insert("service_type".to_string(), json!(service_type.as_str()));

        if ok {
            TestOutcome::passed(
                format!("Format check passed for {service_type} key"),
                details,
            )
        } else {
            details.insert("error".to_string(), json!("format_invalid"));
            TestOutcome::failed(reason, details)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_tester_accepts_valid_stripe_key() {
        let outcome = FormatTester.test("sk_test_1234567890abcdef", ServiceType::Stripe);
        assert!(outcome.success);
        assert_eq!(outcome.details["validation_only"], Value::Bool(true));
        assert_eq!(outcome.details["service_type"], json!("stripe"));
    }

    #[test]
    fn format_tester_rejects_bad_prefix() {
        let outcome = FormatTester.test("bad_prefix_1234567890", ServiceType::Stripe);
        assert!(!outcome.success);
        assert!(outcome.message.contains("sk_live_"));
        assert_eq!(outcome.details["error"], json!("format_invalid"));
    }

    #[test]
    fn format_tester_never_echoes_the_key() {
        let key = "sk_test_supersecret12345";
        let outcome = FormatTester.test(key, ServiceType::Stripe);
        assert!(!outcome.message.contains(key));
        assert!(!serde_json::to_string(&Value::Object(outcome.details))
            .unwrap()
            .contains("supersecret"));
    }
}
