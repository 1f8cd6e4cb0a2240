//! Checkout Ledger
//!
//! Collects per-user checkout records during a scan and tracks, per feature,
//! the aggregate "in use" count the vendor reported on its usage header. The
//! aggregate is kept separately from the individual records because the two
//! can legitimately disagree: group checkouts print one line for several
//! seats, and some utilities print the header with no user lines at all.
//! Reconciliation decides which source wins per pool.

use std::collections::HashMap;

use chrono::Local;
use tracing::debug;

use crate::classify::RawCheckout;
use crate::expiration::parse_checkout_time;
use crate::models::{Checkout, LicensePool};

#[derive(Debug)]
pub struct CheckoutLedger {
    server_hostname: String,
    checkouts: Vec<Checkout>,
    aggregates: HashMap<String, u32>,
}

impl CheckoutLedger {
    pub fn new(server_hostname: &str) -> Self {
        Self {
            server_hostname: server_hostname.to_string(),
            checkouts: Vec::new(),
            aggregates: HashMap::new(),
        }
    }

    /// Append one checkout under the given feature. Each source line is one
    /// record even when it represents several seats. An unparseable start
    /// time degrades to "now" rather than dropping the record; the checkout
    /// itself still has to count.
    pub fn record(&mut self, feature: &str, raw: RawCheckout) {
        let checked_out_at = match parse_checkout_time(&raw.start) {
            Some(at) => at,
            None => {
                debug!(
                    feature = feature,
                    start = %raw.start,
                    "unparseable checkout start time, keeping record with current time"
                );
                Local::now()
            }
        };
        self.checkouts.push(Checkout {
            server_hostname: self.server_hostname.clone(),
            feature_name: feature.to_string(),
            username: raw.user,
            host: raw.host,
            checked_out_at,
            version: raw.version,
            display: None,
        });
    }

    /// Add a usage-header (or RLM pool-row) "in use" figure to the feature's
    /// aggregate. Additive, so RLM features spread over several pool rows
    /// sum up to one figure per feature, saturating at `u32::MAX`.
    pub fn add_header_usage(&mut self, feature: &str, in_use: u32) {
        let aggregate = self.aggregates.entry(feature.to_string()).or_insert(0);
        *aggregate = aggregate.saturating_add(in_use);
    }

    /// Aggregate "in use" reported for a feature; zero when no header line
    /// ever mentioned it.
    pub fn aggregate_for(&self, feature: &str) -> u32 {
        self.aggregates.get(feature).copied().unwrap_or(0)
    }

    pub fn checkouts(&self) -> &[Checkout] {
        &self.checkouts
    }

    pub fn into_checkouts(self) -> Vec<Checkout> {
        self.checkouts
    }
}

/// Resolve the pool a checkout consumed, as an index into `pools`.
///
/// Exact match on (feature, client version == pool version) wins; when the
/// client runs a different release than the license it pulled, fall back to
/// the first pool sharing the feature name. Version equality is a tiebreak,
/// never a requirement, so a version-drifted checkout is still counted.
pub fn match_pool(checkout: &Checkout, pools: &[LicensePool]) -> Option<usize> {
    pools
        .iter()
        .position(|p| p.name == checkout.feature_name && p.version == checkout.version)
        .or_else(|| pools.iter().position(|p| p.name == checkout.feature_name))
}
