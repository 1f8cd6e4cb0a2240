//! Core Data Model
//!
//! Value types produced by one license-server query. The data flows through
//! these models in the following sequence:
//!
//! 1. **Scan**: the vendor decoders accumulate [`LicensePool`] and
//!    [`Checkout`] records while walking the utility output line by line
//! 2. **Reconciliation**: per-pool used counts are decided once the scan is
//!    complete
//! 3. **Output**: everything is folded into one [`QueryResult`] per server
//!
//! All public types serialize with the external camelCase field names that
//! downstream consumers (storage, HTTP handlers) expect. Nothing here is
//! shared between queries; every invocation builds its result from scratch.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Health of the license service as reported by the vendor utility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Up,
    #[default]
    Down,
    Warning,
}

/// Supported license manager families.
///
/// SPM, SESI, RVL, Tweak and Pixar utilities exist in the wild but have no
/// decoder yet; `FromStr` names them so the CLI can say so instead of
/// guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    FlexLm,
    Rlm,
}

impl FromStr for ServerType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flexlm" => Ok(ServerType::FlexLm),
            "rlm" => Ok(ServerType::Rlm),
            "spm" | "sesi" | "rvl" | "tweak" | "pixar" => {
                anyhow::bail!("server type '{}' is recognized but not implemented", s)
            }
            other => anyhow::bail!("unknown server type '{}'", other),
        }
    }
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerType::FlexLm => write!(f, "flexlm"),
            ServerType::Rlm => write!(f, "rlm"),
        }
    }
}

/// Status of one license server at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatus {
    pub hostname: String,
    pub service: ServiceState,
    /// Reporting master host, when the utility names one (FlexLM triads).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master: Option<String>,
    /// Daemon version string, e.g. "v11.16.2".
    pub version: String,
    /// Human-readable diagnostic; empty while the service is up.
    pub message: String,
    #[serde(rename = "lastChecked")]
    pub last_checked: DateTime<Utc>,
}

impl ServerStatus {
    /// Fresh status for a host; starts Down until a server-up line proves
    /// otherwise.
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            service: ServiceState::Down,
            master: None,
            version: String::new(),
            message: String::new(),
            last_checked: Utc::now(),
        }
    }
}

/// One license allotment, uniquely identified by (name, version, expiration).
///
/// Multiple license-file lines sharing that identity are merged by summing
/// `total_licenses`; pools differing in any key component stay distinct even
/// when the feature name matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicensePool {
    #[serde(rename = "serverHostname")]
    pub server_hostname: String,
    pub name: String,
    pub version: String,
    #[serde(rename = "vendorDaemon")]
    pub vendor_daemon: String,
    #[serde(rename = "totalLicenses")]
    pub total_licenses: u32,
    /// Decided by the reconciliation pass, never while scanning.
    #[serde(rename = "usedLicenses")]
    pub used_licenses: u32,
    #[serde(rename = "expirationDate")]
    pub expiration_date: NaiveDate,
    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
}

/// One user currently holding one license unit of a feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkout {
    #[serde(rename = "serverHostname")]
    pub server_hostname: String,
    #[serde(rename = "featureName")]
    pub feature_name: String,
    pub username: String,
    pub host: String,
    /// Server-local wall time; the year is inferred as the current year when
    /// the utility omits it.
    #[serde(rename = "checkedOutAt")]
    pub checked_out_at: DateTime<Local>,
    /// Client software version from the checkout line. Frequently differs
    /// from the license version of the pool actually consumed.
    pub version: String,
    /// Not reported by FlexLM or RLM today.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Everything one query produced. The sole output contract of the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub status: ServerStatus,
    pub pools: Vec<LicensePool>,
    pub checkouts: Vec<Checkout>,
    /// Set only on process-invocation failure (binary missing, spawn error,
    /// timeout). Callers must check this before trusting pools/checkouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResult {
    pub fn new(hostname: &str) -> Self {
        Self {
            status: ServerStatus::new(hostname),
            pools: Vec::new(),
            checkouts: Vec::new(),
            error: None,
        }
    }

    /// Terminal result for a query whose vendor utility could not be run at
    /// all. The status stays Down with the failure as its message.
    pub fn failed(hostname: &str, err: &str) -> Self {
        let mut result = Self::new(hostname);
        result.status.message = err.to_string();
        result.error = Some(err.to_string());
        result
    }

    pub fn total_used(&self) -> u32 {
        self.pools
            .iter()
            .fold(0u32, |used, p| used.saturating_add(p.used_licenses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_type_round_trip() {
        assert_eq!("flexlm".parse::<ServerType>().unwrap(), ServerType::FlexLm);
        assert_eq!("RLM".parse::<ServerType>().unwrap(), ServerType::Rlm);
    }

    #[test]
    fn test_server_type_extension_points_named() {
        for name in ["spm", "sesi", "rvl", "tweak", "pixar"] {
            let err = name.parse::<ServerType>().unwrap_err().to_string();
            assert!(err.contains("not implemented"), "unexpected error: {err}");
        }
        let err = "keygen".parse::<ServerType>().unwrap_err().to_string();
        assert!(err.contains("unknown server type"));
    }

    #[test]
    fn test_new_status_starts_down() {
        let status = ServerStatus::new("27000@licserv");
        assert_eq!(status.service, ServiceState::Down);
        assert!(status.message.is_empty());
    }

    #[test]
    fn test_failed_result_carries_error() {
        let result = QueryResult::failed("27000@licserv", "lmutil: no such file");
        assert_eq!(result.error.as_deref(), Some("lmutil: no such file"));
        assert_eq!(result.status.service, ServiceState::Down);
        assert!(result.pools.is_empty());
    }
}
