//! License Monitor Library
//!
//! A Rust library for monitoring FlexLM and RLM license servers by running the
//! vendor status utilities (`lmutil lmstat`, `rlmutil rlmstat`) and parsing
//! their human-oriented output into normalized snapshots of server health,
//! license pools and active checkouts.
//!
//! ## Core Features
//!
//! - **Resilient parsing**: vendor output is classified line by line; lines
//!   that match nothing are skipped, so format drift degrades results instead
//!   of failing them
//! - **Usage reconciliation**: per-pool usage comes from matched checkout
//!   lines where possible, falling back to header aggregates and proportional
//!   estimates when the output is incomplete
//! - **Expiration normalization**: the half dozen date shapes the utilities
//!   emit (including permanent markers and FlexLM's zero-year convention) all
//!   land on a concrete `NaiveDate`
//! - **Concurrent fleet checks**: many servers are queried at once with a
//!   configurable concurrency cap, results returned in input order
//! - **Flexible output formats**: colored terminal report or JSON
//!
//! ## Architecture Overview
//!
//! - [`models`] - Core data structures for server status, pools, checkouts
//!   and query results
//! - [`classify`] - Line classifiers that map raw utility output onto typed
//!   line kinds
//! - [`pools`] - Pool registry that merges definition rows into per-pool
//!   capacity records
//! - [`ledger`] - Checkout ledger recording individual checkouts and header
//!   usage aggregates
//! - [`reconcile`] - Reconciliation pass computing per-pool usage counts
//! - [`expiration`] - Expiration date normalization across vendor formats
//! - [`flexlm`] / [`rlm`] - Vendor decoders driving the scan for each family
//! - [`runner`] - Command execution with timeouts behind a mockable trait
//! - [`monitor`] - Single-server and fleet check entry points
//! - [`config`] - Configuration management with environment variable support
//! - [`logging`] - Structured logging with JSON and pretty-print formats
//! - [`display`] - Terminal and JSON report rendering
//!
//! ## Main Entry Point
//!
//! Fleet checks go through [`check_fleet`]; the decoders can also be driven
//! directly against captured output:
//!
//! ```rust
//! use licmon::flexlm;
//! use licmon::ServiceState;
//!
//! let raw = "lmgrd.acme.com: license server UP (MASTER) v11.16.2\n";
//! let result = flexlm::parse("27000@lmgrd.acme.com", raw);
//! assert_eq!(result.status.service, ServiceState::Up);
//! assert_eq!(result.status.version, "v11.16.2");
//! ```
//!
//! ## Key Types
//!
//! - [`QueryResult`] - One server's snapshot: status, pools, checkouts
//! - [`LicensePool`] - A capacity record keyed by feature, version, expiration
//! - [`Checkout`] - A single user's license checkout
//! - [`ServerSpec`] - Which server to check and which decoder understands it

pub mod classify;
pub mod config;
pub mod display;
pub mod expiration;
pub mod flexlm;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod pools;
pub mod reconcile;
pub mod rlm;
pub mod runner;

pub use models::*;
pub use monitor::{check_fleet, check_server, ServerSpec};
pub use runner::{CommandRunner, SystemRunner};
