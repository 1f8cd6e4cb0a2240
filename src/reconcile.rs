//! Reconciliation Pass
//!
//! Runs once per scan, after the line stream is exhausted, and decides every
//! pool's used count from what the ledger collected. Three tiers, checked in
//! order per pool:
//!
//! 1. Checkouts matched this pool: the matched count wins.
//! 2. No matches known and the feature has a single pool: the header's
//!    aggregate "in use" is taken directly.
//! 3. No matches known and the feature spans several pools: the aggregate is
//!    split proportionally by each pool's share of the feature's seats,
//!    floor integer division. The vendor tools expose no per-pool usage in
//!    this situation, so an estimate beats an undefined value. Pools arrive
//!    sorted from the registry and are visited in that order, keeping
//!    repeated runs reproducible.

use std::collections::HashMap;

use crate::ledger::{match_pool, CheckoutLedger};
use crate::models::LicensePool;

pub fn reconcile(pools: &mut [LicensePool], ledger: &CheckoutLedger) {
    let mut matched = vec![0u32; pools.len()];
    for checkout in ledger.checkouts() {
        if let Some(idx) = match_pool(checkout, pools) {
            matched[idx] += 1;
        }
    }

    // Per-feature pool count and seat sum, for the proportional branch.
    let mut by_feature: HashMap<String, (u32, u64)> = HashMap::new();
    for pool in pools.iter() {
        let entry = by_feature.entry(pool.name.clone()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += u64::from(pool.total_licenses);
    }

    for (idx, pool) in pools.iter_mut().enumerate() {
        if matched[idx] > 0 {
            pool.used_licenses = matched[idx];
            continue;
        }
        let aggregate = ledger.aggregate_for(&pool.name);
        let (siblings, feature_seats) = by_feature[&pool.name];
        pool.used_licenses = if siblings == 1 {
            aggregate
        } else if feature_seats > 0 {
            (u64::from(aggregate) * u64::from(pool.total_licenses) / feature_seats) as u32
        } else {
            0
        };
    }
}
