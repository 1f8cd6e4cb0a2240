//! Output Formatting and Display Management
//!
//! Renders query results either as human-readable colored terminal output or
//! as structured JSON for programmatic consumption. The JSON form is the
//! serialized result set wrapped in a `servers` object; the terminal form
//! shows one block per server with its pools and active checkouts, coloring
//! expirations that are past or within 30 days.

use crate::models::{QueryResult, ServiceState};
use chrono::{Local, NaiveDate};
use colored::{ColoredString, Colorize};

pub struct DisplayManager;

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayManager {
    pub fn new() -> Self {
        Self
    }

    pub fn display_results(&self, results: &[QueryResult], json_output: bool) {
        if json_output {
            let output = serde_json::json!({"servers": results});
            match serde_json::to_string_pretty(&output) {
                Ok(json_str) => println!("{}", json_str),
                Err(e) => {
                    eprintln!("Error serializing results to JSON: {}", e);
                    return;
                }
            }
            return;
        }

        println!("\n{}", "=".repeat(80).bright_cyan());
        println!("{}", "License Server Status Report".bright_white().bold());
        println!("{}", "=".repeat(80).bright_cyan());

        let up = results
            .iter()
            .filter(|r| r.status.service == ServiceState::Up)
            .count();
        let in_use = results
            .iter()
            .fold(0u32, |used, r| used.saturating_add(r.total_used()));

        println!(
            "\n{} {} servers • {} up • {} licenses in use\n",
            "📊".bright_yellow(),
            results.len().to_string().bright_white().bold(),
            up.to_string().bright_green().bold(),
            in_use.to_string().bright_white().bold()
        );

        for result in results {
            self.display_server(result);
        }
    }

    fn display_server(&self, result: &QueryResult) {
        let status = &result.status;
        let tag = match status.service {
            ServiceState::Up => "UP".bright_green().bold(),
            ServiceState::Warning => "WARNING".bright_yellow().bold(),
            ServiceState::Down => "DOWN".bright_red().bold(),
        };
        println!("🖥  {} — {}", status.hostname.bright_white().bold(), tag);

        if !status.version.is_empty() {
            println!("   daemon: {}", status.version.bright_white());
        }
        if let Some(master) = &status.master {
            println!("   master: {}", master.bright_white());
        }
        if !status.message.is_empty() {
            let message = match status.service {
                ServiceState::Warning => status.message.bright_yellow(),
                _ => status.message.bright_red(),
            };
            println!("   {}", message);
        }

        for pool in &result.pools {
            let label = if pool.version.is_empty() {
                pool.name.clone()
            } else {
                format!("{} {}", pool.name, pool.version)
            };
            let vendor = if pool.vendor_daemon.is_empty() {
                String::new()
            } else {
                format!(" ({})", pool.vendor_daemon)
            };
            println!(
                "   {}: {} in use, expires {}{}",
                label.bright_cyan(),
                format!("{}/{}", pool.used_licenses, pool.total_licenses).bright_green(),
                format_expiration(pool.expiration_date),
                vendor
            );
        }

        if !result.checkouts.is_empty() {
            println!(
                "   {} active checkouts:",
                result.checkouts.len().to_string().bright_white().bold()
            );
            for checkout in &result.checkouts {
                println!(
                    "      {}@{} — {} since {}",
                    checkout.username.bright_white(),
                    checkout.host,
                    checkout.feature_name.bright_cyan(),
                    checkout
                        .checked_out_at
                        .format("%m/%d %H:%M")
                        .to_string()
                        .bright_yellow()
                );
            }
        }

        println!();
    }
}

/// Expirations already past render red, within 30 days yellow.
fn format_expiration(date: NaiveDate) -> ColoredString {
    let today = Local::now().date_naive();
    let days_left = (date - today).num_days();
    let text = date.format("%Y-%m-%d").to_string();
    if days_left < 0 {
        text.bright_red().bold()
    } else if days_left <= 30 {
        text.bright_yellow()
    } else {
        text.normal()
    }
}
