//! Fleet check
//!
//! One-shot concurrent sweep over a set of license servers. Each server gets
//! the decoder matching its type; a dead server produces a failed result and
//! the sweep keeps going, so one unreachable host never hides the rest of
//! the fleet.

use futures::stream::{self, StreamExt};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::config::get_config;
use crate::models::{QueryResult, ServerType};
use crate::runner::CommandRunner;
use crate::{flexlm, rlm};

/// One server to check: where it lives and which decoder understands it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSpec {
    /// Utility connection string, e.g. "27000@licserv".
    pub hostname: String,
    pub server_type: ServerType,
}

impl ServerSpec {
    pub fn new(hostname: &str, server_type: ServerType) -> Self {
        Self {
            hostname: hostname.to_string(),
            server_type,
        }
    }
}

/// Query a single server with the decoder matching its type.
pub async fn check_server(
    runner: &dyn CommandRunner,
    server_type: ServerType,
    hostname: &str,
) -> QueryResult {
    match server_type {
        ServerType::FlexLm => flexlm::query(runner, hostname).await,
        ServerType::Rlm => rlm::query(runner, hostname).await,
    }
}

/// Check a whole fleet with at most `monitor.max_concurrent_queries` servers
/// in flight at once. Results come back in input order.
pub async fn check_fleet(runner: &dyn CommandRunner, servers: &[ServerSpec]) -> Vec<QueryResult> {
    let concurrency = get_config().monitor.max_concurrent_queries;
    let check_id = Uuid::new_v4();
    info!(
        check_id = %check_id,
        servers = servers.len(),
        concurrency = concurrency,
        "starting fleet check"
    );

    let mut results: Vec<(usize, QueryResult)> = stream::iter(servers.iter().enumerate())
        .map(|(idx, spec)| {
            let span = info_span!(
                "server_check",
                check_id = %check_id,
                hostname = %spec.hostname,
                server_type = %spec.server_type,
            );
            async move {
                let result = check_server(runner, spec.server_type, &spec.hostname).await;
                (idx, result)
            }
            .instrument(span)
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    results.sort_by_key(|(idx, _)| *idx);
    results.into_iter().map(|(_, result)| result).collect()
}
