//! Live connectivity checks over HTTPS.
//!
//! Behind the `live-test` feature flag.  Each supported service gets a
//! single lightweight authenticated GET; services without a live check
//! fall back to format-only validation.  All network failures come back
//! as negative outcomes — the vault treats a timeout the same as an
//! invalid key, never as a crash.

use std::time::Duration;

use serde_json::{json, Map, Value};

use crate::store::models::ServiceType;

use super::{FormatTester, KeyTester, TestOutcome};

/// Network timeout for a single check.
const TIMEOUT_SECS: u64 = 10;

/// Tester that performs one authenticated request per service.
pub struct HttpTester {
    agent: ureq::Agent,
}

impl Default for HttpTester {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTester {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build();
        Self { agent }
    }

    /// Endpoint probed for a service, or `None` when only format
    /// validation is available.
    fn endpoint(service_type: ServiceType) -> Option<&'static str> {
        match service_type {
            ServiceType::Stripe => Some("https://api.stripe.com/v1/balance"),
            ServiceType::Openai => Some("https://api.openai.com/v1/models"),
            ServiceType::Airtable => Some("https://api.airtable.com/v0/meta/whoami"),
            _ => None,
        }
    }

    fn probe(&self, url: &str, api_key: &str, service_type: ServiceType) -> TestOutcome {
        let mut details = Map::new();
        details.insert("service_type".to_string(), json!(service_type.as_str()));

        let response = self
            .agent
            .get(url)
            .set("Authorization", &format!("Bearer {api_key}"))
            .call();

        match response {
            Ok(resp) => {
                details.insert("status_code".to_string(), json!(resp.status()));
                TestOutcome::passed(
                    format!("Connection successful for {service_type}"),
                    details,
                )
            }
            Err(ureq::Error::Status(401, _)) => {
                details.insert("status_code".to_string(), json!(401));
                details.insert("error".to_string(), json!("authentication_failed"));
                TestOutcome::failed("Invalid API key - Authentication failed", details)
            }
            Err(ureq::Error::Status(code, _)) => {
                details.insert("status_code".to_string(), json!(code));
                details.insert("error".to_string(), json!("api_error"));
                TestOutcome::failed(format!("API error (Status: {code})"), details)
            }
            Err(ureq::Error::Transport(t)) => {
                details.insert("error".to_string(), json!("connection_error"));
                TestOutcome::failed(
                    format!("Connection failed - {}", t.kind()),
                    details,
                )
            }
        }
    }
}

impl KeyTester for HttpTester {
    fn test(&self, api_key: &str, service_type: ServiceType) -> TestOutcome {
        match Self::endpoint(service_type) {
            Some(url) => self.probe(url, api_key, service_type),
            // No live check implemented: format validation only.
            None => FormatTester.test(api_key, service_type),
        }
    }
}
