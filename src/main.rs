use clap::{Parser, Subcommand};
use std::process;
use std::time::Duration;

use licmon::display::DisplayManager;
use licmon::logging::init_logging;
use licmon::models::ServerType;
use licmon::monitor::{check_fleet, ServerSpec};
use licmon::runner::SystemRunner;

#[derive(Parser)]
#[command(name = "licmon")]
#[command(about = "License server monitoring via FlexLM and RLM status utilities")]
#[command(version = "1.0.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query license servers and report status, pools and checkouts
    Check {
        /// Server to query as port@host (repeatable)
        #[arg(long = "server", required = true)]
        servers: Vec<String>,
        /// License manager type (flexlm or rlm); give once to apply to
        /// every server, or once per --server for a mixed fleet
        #[arg(long = "server-type", default_value = "flexlm")]
        server_types: Vec<String>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
        /// Per-server query timeout in seconds (overrides config)
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Guard must outlive main so file-mode logs flush on exit.
    let _guard = init_logging();

    let cli = Cli::parse();
    match cli.command {
        Commands::Check {
            servers,
            server_types,
            json,
            timeout,
        } => {
            let types = match pair_server_types(&servers, &server_types) {
                Ok(types) => types,
                Err(e) => return handle_error(e, json),
            };
            if timeout == Some(0) {
                eprintln!("❌ Timeout must be greater than zero");
                process::exit(1);
            }

            let specs: Vec<ServerSpec> = servers
                .iter()
                .zip(types)
                .map(|(server, kind)| ServerSpec::new(server, kind))
                .collect();

            let runner = match timeout {
                Some(secs) => SystemRunner::with_timeout(Duration::from_secs(secs)),
                None => SystemRunner::new(),
            };

            // A down server is a reported state, not a command failure.
            let results = check_fleet(&runner, &specs).await;
            DisplayManager::new().display_results(&results, json);
            Ok(())
        }
    }
}

/// Resolve one ServerType per server. A single --server-type covers the
/// whole fleet; otherwise the values pair with --server in order.
fn pair_server_types(
    servers: &[String],
    server_types: &[String],
) -> Result<Vec<ServerType>, anyhow::Error> {
    let parsed: Vec<ServerType> = server_types
        .iter()
        .map(|raw| raw.parse())
        .collect::<Result<_, _>>()?;
    if parsed.len() == 1 {
        return Ok(vec![parsed[0]; servers.len()]);
    }
    if parsed.len() != servers.len() {
        anyhow::bail!(
            "got {} --server-type values for {} servers; give one for all or one per server",
            parsed.len(),
            servers.len()
        );
    }
    Ok(parsed)
}

fn handle_error(e: anyhow::Error, json: bool) -> Result<(), anyhow::Error> {
    if json {
        println!("{{\"error\": \"{}\"}}", e);
    } else {
        eprintln!("❌ Error: {}", e);
    }
    process::exit(1);
}
