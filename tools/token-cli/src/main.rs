use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sol_token::to_human_units;
use token_ops::{
    Cluster, Commitment, KeypairSigner, LedgerClient, RpcLedgerClient, TokenOperationOrchestrator,
    TokenOpsConfig, DEFAULT_HISTORY_LIMIT,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LAMPORTS_PER_SOL_DECIMALS: u8 = 9;

#[derive(Parser)]
#[command(name = "token-cli", version, about = "Create, mint and send SPL tokens")]
struct Cli {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    cluster: Option<Cluster>,

    /// RPC endpoint; overrides the cluster default.
    #[arg(long)]
    url: Option<String>,

    #[arg(long)]
    commitment: Option<Commitment>,

    /// Solana CLI keypair file. Defaults to ~/.config/solana/id.json.
    #[arg(long)]
    keypair: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new mint; the wallet is mint and freeze authority.
    Create {
        #[arg(long, default_value_t = 9)]
        decimals: u8,

        /// Authority address. Defaults to the wallet.
        #[arg(long)]
        authority: Option<String>,
    },
    /// Mint tokens to an owner's associated token account.
    Mint {
        mint: String,
        amount: String,

        /// Recipient wallet. Defaults to the wallet.
        #[arg(long)]
        to: Option<String>,
    },
    /// Send tokens from the wallet.
    Send {
        mint: String,
        recipient: String,
        amount: String,
    },
    /// Show SOL and token balances.
    Balance { owner: Option<String> },
    /// Show recent transactions.
    History {
        owner: Option<String>,

        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli).await
}

fn load_config(cli: &Cli) -> Result<TokenOpsConfig> {
    let mut config = match &cli.config {
        Some(path) => TokenOpsConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => TokenOpsConfig::default(),
    };

    if let Some(cluster) = cli.cluster {
        config.cluster = cluster;
        config.rpc_url = None;
    }
    if let Some(url) = &cli.url {
        config.rpc_url = Some(url.clone());
    }
    if let Some(commitment) = cli.commitment {
        config.commitment = commitment;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn keypair_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(path) = &cli.keypair {
        return Ok(path.clone());
    }
    let home = std::env::var_os("HOME").context("HOME is not set; pass --keypair")?;
    Ok(PathBuf::from(home).join(".config/solana/id.json"))
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    debug!(url = config.rpc_url(), commitment = %config.commitment, "config_loaded");

    let ledger: Arc<dyn LedgerClient> =
        Arc::new(RpcLedgerClient::from_config(&config).context("building rpc client")?);
    let path = keypair_path(&cli)?;
    let signer = KeypairSigner::from_file(&path, ledger.clone())
        .with_context(|| format!("loading keypair {}", path.display()))?;
    let orchestrator = TokenOperationOrchestrator::new(ledger, Arc::new(signer), &config);
    let wallet = orchestrator.wallet().to_string();

    match cli.command {
        Commands::Create {
            decimals,
            authority,
        } => {
            let authority = authority.unwrap_or_else(|| wallet.clone());
            let created = orchestrator.create_token(decimals, &authority).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&created)?);
            } else {
                println!("mint:      {}", created.mint);
                println!("signature: {}", created.signature);
                println!(
                    "explorer:  {}",
                    config.cluster.explorer_address_url(&created.mint.to_string())
                );
            }
        }
        Commands::Mint { mint, amount, to } => {
            let to = to.unwrap_or_else(|| wallet.clone());
            let signature = orchestrator.mint_tokens(&mint, &to, &amount).await?;
            print_signature(&config, cli.json, signature.as_str())?;
        }
        Commands::Send {
            mint,
            recipient,
            amount,
        } => {
            let signature = orchestrator.send_tokens(&mint, &recipient, &amount).await?;
            print_signature(&config, cli.json, signature.as_str())?;
        }
        Commands::Balance { owner } => {
            let owner = owner.unwrap_or(wallet);
            let lamports = orchestrator.wallet_balance(&owner).await?;
            let tokens = orchestrator.token_balances(&owner).await?;
            if cli.json {
                let value = serde_json::json!({ "lamports": lamports, "tokens": tokens });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{} SOL", to_human_units(lamports, LAMPORTS_PER_SOL_DECIMALS));
                for token in &tokens {
                    println!(
                        "{}  {}",
                        token.mint,
                        to_human_units(token.amount, token.decimals)
                    );
                }
            }
        }
        Commands::History { owner, limit } => {
            let owner = owner.unwrap_or(wallet);
            let history = orchestrator.recent_history(&owner, limit).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else {
                for entry in &history {
                    let status = if entry.failed { "failed" } else { "ok" };
                    let time = entry
                        .block_time
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| "-".into());
                    println!("{time:>12}  {status:<6}  {}", entry.signature);
                }
            }
        }
    }

    Ok(())
}

fn print_signature(config: &TokenOpsConfig, json: bool, signature: &str) -> Result<()> {
    if json {
        println!("{}", serde_json::json!({ "signature": signature }));
    } else {
        println!("signature: {signature}");
        println!("explorer:  {}", config.cluster.explorer_tx_url(signature));
    }
    Ok(())
}
