use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use katana_cli::config::Config;
use katana_cli::query::commands::{cmd_balance, cmd_info, cmd_portfolio, cmd_tokens, cmd_yields};
use katana_cli::query::formatters::OutputFormat;
use katana_cli::tokens::TokenCatalog;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "katana")]
#[command(about = "DeFi operations on Katana L2", long_about = None)]
struct Cli {
    /// Output format: table, json or csv
    #[arg(short, long, global = true, default_value = "table")]
    format: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show token balances
    Balance {
        /// Wallet address (defaults to KATANA_WALLET)
        #[arg(long)]
        wallet: Option<String>,

        /// Show only this token
        #[arg(long)]
        token: Option<String>,
    },
    /// List yield opportunities
    Yields {
        /// Minimum APY filter, in percent
        #[arg(long)]
        min_apy: Option<f64>,
    },
    /// Full position overview
    Portfolio {
        /// Wallet address (defaults to KATANA_WALLET)
        #[arg(long)]
        wallet: Option<String>,
    },
    /// Network identity and connectivity
    Info,
    /// Configured tokens, checked against their contracts
    Tokens,
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
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let format = OutputFormat::from(cli.format.as_str());
    let config = Config::from_env()?;
    let catalog = TokenCatalog::katana();
    info!(
        "RPC URLs: {} endpoint(s) configured",
        config.rpc_urls.len()
    );

    let result = match command {
        Commands::Balance { wallet, token } => {
            cmd_balance(&config, &catalog, wallet, token, &format).await
        }
        Commands::Yields { min_apy } => cmd_yields(min_apy, &format),
        Commands::Portfolio { wallet } => cmd_portfolio(&config, &catalog, wallet, &format).await,
        Commands::Info => cmd_info(&config, &format).await,
        Commands::Tokens => cmd_tokens(&config, &catalog, &format).await,
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
