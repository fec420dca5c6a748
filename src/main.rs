use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "snapsolve-server",
    version,
    about = "Backend for capturing multiple-choice problems with OCR"
)]
struct Cli {
    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings", global = true)]
    read_settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Listen address (overrides [server].addr)
        #[arg(short = 'a', long = "addr")]
        addr: Option<String>,

        /// JSON file backing the store (overrides [server].data_path)
        #[arg(short = 'd', long = "data")]
        data: Option<String>,
    },
    /// Segment a saved Clova OCR response and print the parsed problem
    Parse {
        /// Response JSON file; stdin when omitted
        input: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let mut settings = snapsolve_server::settings::load_settings(cli.read_settings.as_deref())?;
    snapsolve_server::logging::init(&settings.log_level, cli.verbose)?;

    match cli.command {
        Commands::Serve { addr, data } => {
            if let Some(addr) = addr {
                settings.server_addr = addr;
            }
            if let Some(data) = data {
                settings.data_path = Some(data);
            }
            snapsolve_server::server::run_server(settings).await
        }
        Commands::Parse { input } => {
            let raw = match input {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                None => {
                    let mut buffer = String::new();
                    io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };
            let parsed = snapsolve_server::parse_clova_json(&raw)?;
            println!("{}", serde_json::to_string_pretty(&parsed)?);
            Ok(())
        }
    }
}
