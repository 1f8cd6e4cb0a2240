//! Pool Registry
//!
//! Accumulates license pools during a scan, keyed by the identity triple
//! (feature name, license version, expiration date). Lines carrying the same
//! identity are one pool: a site whose license files grant 5 + 5 seats of the
//! same feature/version/expiration holds a single pool of 10. Pools that
//! differ in any component of the triple stay separate, which is what keeps
//! a renewed license (new expiration) from being folded into the old one.
//!
//! The registry records capacity only. Used counts are decided afterwards by
//! the reconciliation pass, never while scanning.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};

use crate::expiration::ExpirationParser;
use crate::models::{LicensePool, ServerType};

/// Sentinel capacity for uncounted (node-locked) features, which have no
/// seat limit the server enforces.
pub const UNCOUNTED_TOTAL: u32 = 9999;

/// Identity of one pool within a single server scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub feature: String,
    pub version: String,
    pub expiration: NaiveDate,
}

#[derive(Debug)]
pub struct PoolRegistry {
    server_hostname: String,
    pools: HashMap<PoolKey, LicensePool>,
}

impl PoolRegistry {
    pub fn new(server_hostname: &str) -> Self {
        Self {
            server_hostname: server_hostname.to_string(),
            pools: HashMap::new(),
        }
    }

    /// Record one pool-definition line. Repeated identities accumulate their
    /// seat counts, saturating at `u32::MAX`; later lines may also fill in a
    /// vendor daemon the first line lacked.
    pub fn add_definition(
        &mut self,
        feature: &str,
        version: &str,
        total: u32,
        vendor: &str,
        expiration: NaiveDate,
    ) {
        let key = PoolKey {
            feature: feature.to_string(),
            version: version.to_string(),
            expiration,
        };
        let server_hostname = self.server_hostname.clone();
        let pool = self.pools.entry(key).or_insert_with(|| LicensePool {
            server_hostname,
            name: feature.to_string(),
            version: version.to_string(),
            vendor_daemon: vendor.to_string(),
            total_licenses: 0,
            used_licenses: 0,
            expiration_date: expiration,
            last_updated: Utc::now(),
        });
        pool.total_licenses = pool.total_licenses.saturating_add(total);
        if pool.vendor_daemon.is_empty() {
            pool.vendor_daemon = vendor.to_string();
        }
    }

    /// Record an uncounted node-locked feature as a pseudo-pool with the
    /// sentinel capacity. Idempotent: the sentinel is a marker, not a seat
    /// count, so repeated headers do not stack.
    pub fn add_uncounted(&mut self, feature: &str, server_type: ServerType) {
        let expiration = ExpirationParser::permanent(server_type);
        let key = PoolKey {
            feature: feature.to_string(),
            version: String::new(),
            expiration,
        };
        let server_hostname = self.server_hostname.clone();
        self.pools.entry(key).or_insert_with(|| LicensePool {
            server_hostname,
            name: feature.to_string(),
            version: String::new(),
            vendor_daemon: String::new(),
            total_licenses: UNCOUNTED_TOTAL,
            used_licenses: 0,
            expiration_date: expiration,
            last_updated: Utc::now(),
        });
    }

    /// Fill in the version, vendor, and expiration an uncounted pseudo-pool
    /// is missing. Uncounted features have no catalog row, so the quoted
    /// metadata line under their usage header is the only place the daemon
    /// prints these fields. Catalog-backed pools are never touched, and the
    /// entry keeps its empty-version key so repeated headers still collapse
    /// into the same pool.
    pub fn describe_uncounted(
        &mut self,
        feature: &str,
        version: &str,
        vendor: &str,
        expiration: Option<NaiveDate>,
    ) {
        let uncounted = self
            .pools
            .iter_mut()
            .find(|(key, _)| key.feature == feature && key.version.is_empty());
        if let Some((_, pool)) = uncounted {
            pool.version = version.to_string();
            if pool.vendor_daemon.is_empty() {
                pool.vendor_daemon = vendor.to_string();
            }
            if let Some(expiration) = expiration {
                pool.expiration_date = expiration;
            }
        }
    }

    /// Consume the registry into pools ordered by (name, version,
    /// expiration), so repeated scans of the same server compare equal.
    pub fn finalize(self) -> Vec<LicensePool> {
        let mut pools: Vec<LicensePool> = self.pools.into_values().collect();
        pools.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.version.cmp(&b.version))
                .then_with(|| a.expiration_date.cmp(&b.expiration_date))
        });
        pools
    }
}
