use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{ConfigCommand, ShoppingSubcommand};
use config::Config;
use recipe_cart_core::{CancellationToken, HttpShoppingListService, ShoppingListEngine};

#[derive(Parser)]
#[command(name = "cart")]
#[command(version)]
#[command(about = "A consolidated shopping list for your recipe plans", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Shopping(ShoppingSubcommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recipe_cart=warn,recipe_cart_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Save config path for init command
    let cli_config_path = cli.config.clone();

    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Shopping(cmd)) => {
            let service = HttpShoppingListService::with_timeout(
                config.api_url.value.clone(),
                config.api_token.value.clone(),
                config.timeout(),
            )?;
            let mut engine = ShoppingListEngine::new(service);

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupted, cancelling");
                    on_interrupt.cancel();
                }
            });

            cmd.run(&mut engine, &cancel).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config, cli_config_path)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
