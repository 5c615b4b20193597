//! dotconnect - inspect endpoint failover and balances from the terminal.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::eyre;
use dotconnect_chain::{
    BalanceCache, BuiltinNetworks, ClientHandle, FailoverClient, NetworkConfigProvider,
    SubxtConnector, resolve_endpoints,
};
use dotconnect_core::config::{load_config_from, save_config_to};
use dotconnect_core::{AdapterConfig, Network, NetworkDescriptor, load_config, save_config, short_address};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Connect to Polkadot Asset Hub networks through prioritized endpoint failover.
#[derive(Parser, Debug)]
#[command(name = "dotconnect")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Custom RPC endpoint, tried before the built-in ones (repeatable)
    #[arg(long = "endpoint", global = true)]
    endpoints: Vec<String>,

    /// Seconds allowed for one endpoint connection attempt
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Configuration file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the endpoints of a network in failover order
    Endpoints {
        /// Network to resolve (polkadot, kusama, westend, paseo)
        #[arg(short, long)]
        network: Option<Network>,
    },
    /// Connect through failover and print the endpoint used and the latest block
    Probe {
        #[arg(short, long)]
        network: Option<Network>,
    },
    /// Print the transferable balance of an account
    Balance {
        #[arg(short, long)]
        network: Option<Network>,

        /// SS58 account address
        #[arg(short, long)]
        address: String,
    },
    /// Print the effective configuration
    Config {
        /// Also write it back, keeping the command line overrides
        #[arg(long)]
        save: bool,
    },
}

impl Command {
    fn network(&self) -> Option<Network> {
        match self {
            Command::Endpoints { network }
            | Command::Probe { network }
            | Command::Balance { network, .. } => *network,
            Command::Config { .. } => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    color_eyre::install()?;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("dotconnect=info".parse()?)
        .add_directive("dotconnect_chain=info".parse()?)
        .add_directive("dotconnect_session=info".parse()?);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config().unwrap_or_else(|e| {
            tracing::warn!("Using default configuration: {}", e);
            AdapterConfig::default()
        }),
    };
    for url in &args.endpoints {
        config.add_custom_endpoint(url.clone());
    }
    if let Some(timeout) = args.timeout {
        config.attempt_timeout_secs = timeout;
    }

    let networks = BuiltinNetworks::new(config.default_network)
        .with_custom_endpoints(config.custom_endpoints.clone());
    let network = args.command.network().unwrap_or(config.default_network);
    let descriptor = networks
        .network(&network.id())
        .ok_or_else(|| eyre!("Network {} is not configured", network))?;

    match args.command {
        Command::Endpoints { .. } => print_endpoints(&descriptor),
        Command::Probe { .. } => probe(&config, &descriptor).await,
        Command::Balance { address, .. } => balance(&config, &descriptor, &address).await,
        Command::Config { save } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if save {
                match &args.config {
                    Some(path) => save_config_to(&config, path)?,
                    None => save_config(&config)?,
                }
                tracing::info!("Configuration saved");
            }
            Ok(())
        }
    }
}

fn print_endpoints(network: &NetworkDescriptor) -> Result<()> {
    let endpoints = resolve_endpoints(network);
    if endpoints.is_empty() {
        return Err(eyre!("{} declares no WebSocket endpoints", network.name));
    }

    println!("{} ({})", network.name, network.id);
    for (i, url) in endpoints.iter().enumerate() {
        println!("{:>3}. {}", i + 1, url);
    }
    Ok(())
}

async fn probe(config: &AdapterConfig, network: &NetworkDescriptor) -> Result<()> {
    let client = FailoverClient::with_timeout(SubxtConnector, config.attempt_timeout());
    let handle = client.acquire(network).await?;
    let (number, hash) = handle.get_latest_block().await?;

    println!("Network:  {}", network.name);
    println!("Endpoint: {}", handle.endpoint());
    println!("Genesis:  0x{}", hex::encode(handle.genesis_hash()));
    println!("Block:    #{} (0x{})", number, hex::encode(hash));

    client.shutdown();
    Ok(())
}

async fn balance(config: &AdapterConfig, network: &NetworkDescriptor, address: &str) -> Result<()> {
    let client = Arc::new(FailoverClient::with_timeout(
        SubxtConnector,
        config.attempt_timeout(),
    ));
    let balances = BalanceCache::with_ttl(Arc::clone(&client), config.balance_ttl());

    let balance = balances.read(network, address).await;
    println!("{}: {}", short_address(address), balance);

    client.shutdown();
    Ok(())
}
