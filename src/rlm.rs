//! RLM decoder
//!
//! Scans `rlmutil rlmstat -a` output. RLM structures its report as an ISV
//! server table followed by per-ISV sections, each carrying feature banners
//! (`arnold v2018.02, pool: 4`), pool rows (`count: ..., inuse: ..., exp: ...`)
//! and usage lines. The decoder tracks the current ISV and the current
//! feature banner; pool rows attach to both.
//!
//! Unlike FlexLM, nothing here is terminal. An ISV that is not running turns
//! the status to a warning and scanning continues, because the remaining
//! daemons still report usable pools.

use tracing::{debug, warn};

use crate::classify::{classify_rlm, RlmLine};
use crate::config::get_config;
use crate::expiration::ExpirationParser;
use crate::ledger::CheckoutLedger;
use crate::models::{QueryResult, ServerType, ServiceState};
use crate::pools::PoolRegistry;
use crate::reconcile::reconcile;
use crate::runner::CommandRunner;

#[derive(Default)]
struct ScanContext {
    /// ISV section the scan is inside; becomes the vendor daemon of pools
    /// found there.
    isv: Option<String>,
    /// Feature banner the next pool rows belong to: (feature, version).
    feature: Option<(String, String)>,
}

/// Run `rlmutil rlmstat` against a server and parse the output. Invocation
/// failures become a failed result rather than an error.
pub async fn query(runner: &dyn CommandRunner, hostname: &str) -> QueryResult {
    let query_config = &get_config().query;
    let args = vec![
        "rlmstat".to_string(),
        "-a".to_string(),
        "-c".to_string(),
        hostname.to_string(),
    ];
    match runner.capture(&query_config.rlmutil_path, &args).await {
        Ok(raw) => parse(hostname, &raw),
        Err(err) => {
            let message = format!("{err:#}");
            warn!(hostname = hostname, error = %message, "rlmstat invocation failed");
            QueryResult::failed(hostname, &message)
        }
    }
}

/// Parse one utility run. Pure, like its FlexLM counterpart.
pub fn parse(hostname: &str, raw: &str) -> QueryResult {
    let mut result = QueryResult::new(hostname);
    let mut registry = PoolRegistry::new(hostname);
    let mut ledger = CheckoutLedger::new(hostname);
    let mut scan = ScanContext::default();

    for raw_line in raw.lines() {
        match classify_rlm(raw_line) {
            RlmLine::ServerUp { .. } => {
                result.status.service = ServiceState::Up;
            }
            RlmLine::Version { version } => {
                result.status.version = version;
            }
            RlmLine::IsvBanner { name } => {
                scan.isv = Some(name);
            }
            RlmLine::IsvStatus { name, running } => {
                if !running {
                    // Warning, not terminal: other ISVs keep reporting.
                    warn!(hostname = hostname, isv = %name, "ISV server is not running");
                    result.status.service = ServiceState::Warning;
                    result.status.message = format!("ISV server {name} is not running");
                }
            }
            RlmLine::FeatureHeader { feature, version } => {
                scan.feature = Some((feature, version));
            }
            RlmLine::PoolDetail {
                count,
                in_use,
                expiry,
            } => match &scan.feature {
                Some((feature, version)) => {
                    let expiration = ExpirationParser::parse(&expiry, ServerType::Rlm);
                    let vendor = scan.isv.as_deref().unwrap_or("");
                    registry.add_definition(feature, version, count, vendor, expiration);
                    ledger.add_header_usage(feature, in_use);
                }
                None => debug!("pool row outside any feature banner, skipped"),
            },
            RlmLine::Checkout { feature, checkout } => {
                ledger.record(&feature, checkout);
            }
            RlmLine::ConnectionError { message } => {
                warn!(hostname = hostname, message = %message, "rlmstat could not reach the server");
                result.status.service = ServiceState::Down;
                result.status.message = message;
            }
            RlmLine::Other => {}
        }
    }

    let mut pools = registry.finalize();
    reconcile(&mut pools, &ledger);
    result.pools = pools;
    result.checkouts = ledger.into_checkouts();
    result
}
