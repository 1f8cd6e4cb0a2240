//! Vendor utility invocation.
//!
//! Decoders are pure line scanners; everything that touches a process goes
//! through the [`CommandRunner`] seam, so decoder and monitor tests can
//! script utility output instead of spawning binaries.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::get_config;

/// Runs one vendor status utility to completion and captures its text.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn capture(&self, program: &str, args: &[String]) -> Result<String>;
}

/// Production runner: spawns the utility and returns combined stdout and
/// stderr. Vendor tools split diagnostics across both streams depending on
/// version, and a down server still exits non-zero with parseable text, so
/// the exit status is not an error here.
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(get_config().query.timeout_secs),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn capture(&self, program: &str, args: &[String]) -> Result<String> {
        debug!(program = program, args = ?args, "running vendor utility");

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(program).args(args).kill_on_drop(true).output(),
        )
        .await
        .with_context(|| {
            format!(
                "{} did not finish within {}s",
                program,
                self.timeout.as_secs()
            )
        })?
        .with_context(|| format!("failed to run {}", program))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.stderr.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&String::from_utf8_lossy(&output.stderr));
        }
        Ok(text)
    }
}
