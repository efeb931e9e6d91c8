//! PeaceChain 命令行入口
//! 只读查询：网络统计、连接状态、地址交易历史

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use peacechain::{config::Config, domain::ChainId, infrastructure::logging, PeaceChainClient};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "peacechain")]
struct Cli {
    /// TOML 配置文件路径（缺省读取 CONFIG_PATH，再回退到环境变量）
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate stats from both chains
    Stats,
    /// Connect to both chains and report their status
    Status,
    /// Scan recent account-chain blocks for an address
    History {
        /// Account-chain address (0x...)
        address: String,
        /// Number of blocks to scan back from the head
        #[arg(short, long)]
        window: Option<u64>,
    },
}

fn load_config(path: Option<String>) -> Result<Config> {
    let path = path.or_else(|| std::env::var("CONFIG_PATH").ok());
    let config = Config::from_env_and_file(path.as_deref())?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    if let Err(e) = logging::init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting PeaceChain client");

    let client = PeaceChainClient::new(config);

    match cli.command {
        Commands::Stats => {
            report_connections(&client).await;
            let stats = client.get_network_stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Status => {
            report_connections(&client).await;
            let mut statuses = Vec::new();
            for chain in ChainId::ALL {
                statuses.push(client.status(chain).await);
            }
            println!("{}", serde_json::to_string_pretty(&statuses)?);
        }
        Commands::History { address, window } => {
            client
                .connect(ChainId::AccountChain)
                .await
                .context("Account chain connection failed")?;

            let history = match window {
                Some(window) => client.get_transaction_history_window(&address, window).await?,
                None => client.get_transaction_history(&address).await?,
            };
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
    }

    Ok(())
}

async fn report_connections(client: &PeaceChainClient) {
    let (account, extrinsic) = client.connect_all().await;
    for result in [account, extrinsic] {
        match result {
            Ok(handle) => tracing::info!(
                chain = %handle.chain_id,
                endpoint = %handle.endpoint,
                signer = ?handle.signing_address,
                "Connected"
            ),
            Err(e) => tracing::warn!(code = e.code(), error = %e, "Connection failed"),
        }
    }
}
