//! FlexLM decoder
//!
//! Drives the classifier over `lmutil lmstat -i -a` output and accumulates
//! into the pool registry and checkout ledger. The decoder owns all
//! look-behind state: which feature the scan is currently inside, and a
//! usage header held tentatively until the next non-blank line confirms it.
//!
//! FlexLM's error vocabulary is terminal. A connection, read or status error
//! voids the whole scan: the result carries only the error status, and any
//! catalog rows read before the line are thrown away. A vendor-down line
//! also stops the scan but keeps what came before it, reconciled as usual.

use tracing::{debug, warn};

use crate::classify::{classify_flexlm, FlexLmLine, StatusErrorKind};
use crate::config::get_config;
use crate::expiration::ExpirationParser;
use crate::ledger::CheckoutLedger;
use crate::models::{QueryResult, ServerType, ServiceState};
use crate::pools::PoolRegistry;
use crate::reconcile::reconcile;
use crate::runner::CommandRunner;

/// Feature header held until the following non-blank line, which either
/// retracts it ("No such feature exists.") or commits it.
enum PendingHeader {
    Counted { feature: String, in_use: u32 },
    Uncounted { feature: String },
}

impl PendingHeader {
    fn feature(&self) -> &str {
        match self {
            PendingHeader::Counted { feature, .. } | PendingHeader::Uncounted { feature } => {
                feature
            }
        }
    }
}

#[derive(Default)]
struct ScanContext {
    /// Feature that subsequent checkout lines belong to.
    feature: Option<String>,
    pending: Option<PendingHeader>,
}

/// Run `lmutil lmstat` against a server and parse the output. Invocation
/// failures (missing binary, timeout) become a failed result, never an
/// error: one dead server must not take down a fleet check.
pub async fn query(runner: &dyn CommandRunner, hostname: &str) -> QueryResult {
    let query_config = &get_config().query;
    let args = vec![
        "lmstat".to_string(),
        "-i".to_string(),
        "-a".to_string(),
        "-c".to_string(),
        hostname.to_string(),
    ];
    match runner.capture(&query_config.lmutil_path, &args).await {
        Ok(raw) => parse(hostname, &raw),
        Err(err) => {
            let message = format!("{err:#}");
            warn!(hostname = hostname, error = %message, "lmstat invocation failed");
            QueryResult::failed(hostname, &message)
        }
    }
}

/// Parse one utility run. Pure: feed it captured text and it never touches
/// a process.
pub fn parse(hostname: &str, raw: &str) -> QueryResult {
    let mut result = QueryResult::new(hostname);
    let mut registry = PoolRegistry::new(hostname);
    let mut ledger = CheckoutLedger::new(hostname);
    let mut scan = ScanContext::default();

    for raw_line in raw.lines() {
        // Blank lines neither commit nor retract a pending header.
        if raw_line.trim().is_empty() {
            continue;
        }
        let line = classify_flexlm(raw_line);

        if let Some(pending) = scan.pending.take() {
            if line == FlexLmLine::NoSuchFeature {
                debug!(
                    feature = pending.feature(),
                    "usage header retracted, feature does not exist"
                );
                continue;
            }
            commit_header(pending, &mut scan, &mut registry, &mut ledger);
        }

        match line {
            FlexLmLine::ServerUp {
                host,
                master,
                version,
            } => {
                result.status.service = ServiceState::Up;
                result.status.version = version;
                if master {
                    result.status.master = Some(host);
                }
            }
            FlexLmLine::StatusError { kind, message } => {
                warn!(hostname = hostname, kind = ?kind, message = %message, "lmstat reported an error");
                result.status.service = match kind {
                    StatusErrorKind::VendorDown => ServiceState::Warning,
                    _ => ServiceState::Down,
                };
                result.status.message = message;
                // Terminal: nothing past this line is scanned. The
                // connection-level errors also void whatever was read
                // before them; a vendor daemon down on a live server
                // keeps the catalog scanned so far.
                if kind != StatusErrorKind::VendorDown {
                    registry = PoolRegistry::new(hostname);
                    ledger = CheckoutLedger::new(hostname);
                }
                break;
            }
            FlexLmLine::UsageHeader {
                feature, in_use, ..
            } => {
                scan.pending = Some(PendingHeader::Counted { feature, in_use });
            }
            FlexLmLine::UncountedFeature { feature } => {
                scan.pending = Some(PendingHeader::Uncounted { feature });
            }
            FlexLmLine::InlineFeature {
                feature,
                version,
                vendor,
                expiry,
            } => {
                // The quoted line is the only identity source for uncounted
                // features, which never appear in the -i catalog.
                let expiration = expiry.map(|e| ExpirationParser::parse(&e, ServerType::FlexLm));
                registry.describe_uncounted(&feature, &version, &vendor, expiration);
                scan.feature = Some(feature);
            }
            FlexLmLine::PoolDefinition {
                feature,
                version,
                total,
                vendor,
                expiry,
            } => {
                let expiration = ExpirationParser::parse(&expiry, ServerType::FlexLm);
                registry.add_definition(&feature, &version, total, &vendor, expiration);
            }
            FlexLmLine::Checkout(checkout) => match &scan.feature {
                Some(feature) => ledger.record(feature, checkout),
                None => debug!(
                    user = %checkout.user,
                    "checkout line outside any feature context, skipped"
                ),
            },
            FlexLmLine::NoSuchFeature | FlexLmLine::Other => {}
        }
    }
    // A header still pending at end of stream was never retracted.
    if let Some(pending) = scan.pending.take() {
        commit_header(pending, &mut scan, &mut registry, &mut ledger);
    }

    let mut pools = registry.finalize();
    reconcile(&mut pools, &ledger);
    result.pools = pools;
    result.checkouts = ledger.into_checkouts();
    result
}

fn commit_header(
    pending: PendingHeader,
    scan: &mut ScanContext,
    registry: &mut PoolRegistry,
    ledger: &mut CheckoutLedger,
) {
    match pending {
        PendingHeader::Counted { feature, in_use } => {
            ledger.add_header_usage(&feature, in_use);
            scan.feature = Some(feature);
        }
        PendingHeader::Uncounted { feature } => {
            registry.add_uncounted(&feature, ServerType::FlexLm);
            scan.feature = Some(feature);
        }
    }
}
