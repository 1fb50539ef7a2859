use clap::{Parser, Subcommand};
use serde_json::Value;
use std::time::Duration;

use tipjar_gateway::rpc::{ChainId, RpcSelector, SelectorOptions};

#[derive(Parser)]
#[command(name = "tipjar-cli")]
#[command(about = "Probe RPC endpoints and query a running tipjar gateway", long_about = None)]
struct Cli {
    /// Gateway base URL for the remote commands
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe RPC URLs locally and print which ones serve the chain
    Probe {
        #[arg(long)]
        chain_id: u64,

        /// Per-probe timeout in milliseconds
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,

        #[arg(required = true)]
        rpc_urls: Vec<String>,
    },
    /// List chains configured on the gateway
    Chains,
    /// Ask the gateway to probe a chain's configured URLs
    Rpc { chain_id: u64 },
    /// Faucet gas balance, or the balance of ADDRESS when given
    Balance {
        #[arg(long)]
        chain_id: Option<u64>,

        #[arg(requires = "chain_id")]
        address: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Probe {
            chain_id,
            timeout_ms,
            rpc_urls,
        } => {
            let selector = RpcSelector::new(SelectorOptions {
                request_timeout: Duration::from_millis(timeout_ms),
                ..SelectorOptions::default()
            });
            let reports = selector.probe_rpc_urls(ChainId(chain_id), &rpc_urls).await;
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        Commands::Chains => {
            get(&format!("{}/api/chains", cli.url)).await?;
        }
        Commands::Rpc { chain_id } => {
            get(&format!("{}/api/chains/{}/rpc", cli.url, chain_id)).await?;
        }
        Commands::Balance { chain_id, address } => {
            let path = match (address, chain_id) {
                (Some(address), Some(chain_id)) => {
                    format!("/api/chains/{}/balance/{}", chain_id, address)
                }
                (Some(_), None) => return Err("--chain-id is required with an address".into()),
                (None, Some(chain_id)) => format!("/api/faucet/balance?chain_id={}", chain_id),
                (None, None) => "/api/faucet/balance".to_string(),
            };
            get(&format!("{}{}", cli.url, path)).await?;
        }
    }

    Ok(())
}

async fn get(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let res = reqwest::Client::new().get(url).send().await?;
    let status = res.status();
    let json: Value = res.json().await?;
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
