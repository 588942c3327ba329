//! Row types for the key and audit tables.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::VaultError;

/// The closed set of services a key can belong to.
///
/// Drives format validation and connectivity-test dispatch.  Stored in
/// SQLite as its snake_case wire form (e.g. `google_cloud`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Stripe,
    Openai,
    Airtable,
    Twilio,
    Sendgrid,
    Aws,
    GoogleCloud,
    Azure,
    Other,
}

impl ServiceType {
    /// All variants, in display order.
    pub const ALL: [ServiceType; 9] = [
        ServiceType::Stripe,
        ServiceType::Openai,
        ServiceType::Airtable,
        ServiceType::Twilio,
        ServiceType::Sendgrid,
        ServiceType::Aws,
        ServiceType::GoogleCloud,
        ServiceType::Azure,
        ServiceType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Stripe => "stripe",
            ServiceType::Openai => "openai",
            ServiceType::Airtable => "airtable",
            ServiceType::Twilio => "twilio",
            ServiceType::Sendgrid => "sendgrid",
            ServiceType::Aws => "aws",
            ServiceType::GoogleCloud => "google_cloud",
            ServiceType::Azure => "azure",
            ServiceType::Other => "other",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stripe" => Ok(ServiceType::Stripe),
            "openai" => Ok(ServiceType::Openai),
            "airtable" => Ok(ServiceType::Airtable),
            "twilio" => Ok(ServiceType::Twilio),
            "sendgrid" => Ok(ServiceType::Sendgrid),
            "aws" => Ok(ServiceType::Aws),
            "google_cloud" => Ok(ServiceType::GoogleCloud),
            "azure" => Ok(ServiceType::Azure),
            "other" => Ok(ServiceType::Other),
            other => Err(VaultError::UnknownServiceType(other.to_string())),
        }
    }
}

/// Vault operations recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Store,
    Retrieve,
    RetrieveCached,
    Update,
    Delete,
    Test,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Store => "store_key",
            Operation::Retrieve => "retrieve_key",
            Operation::RetrieveCached => "retrieve_key_cached",
            Operation::Update => "update_key",
            Operation::Delete => "delete_key",
            Operation::Test => "test_key",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted key row, ciphertext included.
///
/// Never leaves the store/vault layer — callers see `KeyInfo` instead.
#[derive(Debug, Clone)]
pub struct KeyRecord {
    pub id: i64,
    pub key_name: String,
    pub encrypted_value: String,
    pub service_type: ServiceType,
    pub added_by_user: i64,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub is_active: bool,
    pub description: Option<String>,
}

/// Listing row: metadata plus a masked value, no ciphertext.
#[derive(Debug, Clone, Serialize)]
pub struct KeyInfo {
    pub id: i64,
    pub key_name: String,
    pub masked_value: String,
    pub service_type: ServiceType,
    pub added_by_user: i64,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub is_active: bool,
    pub description: Option<String>,
}

/// A single audit log entry.  Append-only; never mutated or deleted.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub operation: String,
    pub key_name: Option<String>,
    pub user_id: i64,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub error_message: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Optional caller context recorded alongside audit entries.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_type_wire_roundtrip() {
        for st in ServiceType::ALL {
            assert_eq!(st.as_str().parse::<ServiceType>().unwrap(), st);
        }
    }

    #[test]
    fn service_type_parse_is_case_insensitive() {
        assert_eq!("Stripe".parse::<ServiceType>().unwrap(), ServiceType::Stripe);
        assert_eq!(
            "GOOGLE_CLOUD".parse::<ServiceType>().unwrap(),
            ServiceType::GoogleCloud
        );
    }

    #[test]
    fn service_type_rejects_unknown() {
        assert!("gitlab".parse::<ServiceType>().is_err());
    }

    #[test]
    fn operation_wire_strings() {
        assert_eq!(Operation::Store.as_str(), "store_key");
        assert_eq!(Operation::RetrieveCached.as_str(), "retrieve_key_cached");
        assert_eq!(Operation::Test.as_str(), "test_key");
    }
}
