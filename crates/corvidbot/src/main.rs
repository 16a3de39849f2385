//! corvidbot - gateway bot runner
//!
//! This binary connects a small demo bot to the platform gateway, keeps
//! the session alive, and answers slash commands.

use clap::{Parser, Subcommand};
use corvid_proto::{
    option_type, ApplicationCommand, CommandOption, Interaction, InteractionResponse,
};
use corvidbot::{Bot, BotConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "corvidbot")]
#[command(about = "Gateway bot runner")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot
    Run {
        /// Path to config file
        #[arg(short, long, default_value = "corvidbot.toml")]
        config: PathBuf,
    },

    /// Synchronize declared commands and exit
    Sync {
        /// Path to config file
        #[arg(short, long, default_value = "corvidbot.toml")]
        config: PathBuf,
    },

    /// Generate a sample config file
    InitConfig {
        /// Path to write config
        #[arg(short, long, default_value = "corvidbot.toml")]
        output: PathBuf,
    },

    /// Show the configured identity and endpoints
    Info {
        /// Path to config file
        #[arg(short, long, default_value = "corvidbot.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("corvidbot=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            run_bot(config).await?;
        }

        Commands::Sync { config } => {
            sync_only(config).await?;
        }

        Commands::InitConfig { output } => {
            init_config(output)?;
        }

        Commands::Info { config } => {
            show_info(config)?;
        }
    }

    Ok(())
}

/// Demo bot wiring: a ping command and an echo command.
fn demo_bot(config: BotConfig) -> Bot {
    Bot::new(config)
        .command(
            ApplicationCommand::new("ping", "Check that the bot is alive"),
            |_interaction: Interaction| async {
                Ok(InteractionResponse::channel_message("Pong!"))
            },
        )
        .command(
            ApplicationCommand::new("echo", "Repeat the given text").option(
                CommandOption::new(option_type::STRING, "text", "What to repeat").required(),
            ),
            |interaction: Interaction| async move {
                let text = interaction
                    .option_value("text")
                    .and_then(|value| value.as_str())
                    .unwrap_or("(nothing)")
                    .to_string();
                Ok(InteractionResponse::channel_message(text))
            },
        )
}

async fn run_bot(config_path: PathBuf) -> anyhow::Result<()> {
    info!(config = %config_path.display(), "starting corvidbot");

    let config = BotConfig::from_file(&config_path)?;
    info!(
        gateway = %config.gateway_url,
        application_id = %config.application_id,
        "loaded config"
    );

    demo_bot(config).run().await?;

    Ok(())
}

async fn sync_only(config_path: PathBuf) -> anyhow::Result<()> {
    let config = BotConfig::from_file(&config_path)?;

    let report = demo_bot(config).sync().await?;

    if report.is_noop() {
        println!(
            "Commands already in sync ({} unchanged)",
            report.unchanged.len()
        );
        return Ok(());
    }

    for name in &report.created {
        println!("created: /{name}");
    }
    for name in &report.updated {
        println!("updated: /{name}");
    }
    for name in &report.deleted {
        println!("deleted: /{name}");
    }

    println!();
    println!(
        "{} created, {} updated, {} deleted, {} unchanged",
        report.created.len(),
        report.updated.len(),
        report.deleted.len(),
        report.unchanged.len()
    );

    Ok(())
}

fn init_config(output: PathBuf) -> anyhow::Result<()> {
    std::fs::write(&output, BotConfig::sample_toml())?;

    println!("Config written to {}", output.display());
    println!();
    println!("Edit the file to add your bot token, then run:");
    println!("  corvidbot run --config {}", output.display());

    Ok(())
}

fn show_info(config_path: PathBuf) -> anyhow::Result<()> {
    let config = BotConfig::from_file(&config_path)?;

    println!("corvidbot {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("  Config: {}", config_path.display());
    println!("  Application ID: {}", config.application_id);
    println!("  Gateway: {}", config.gateway_url);
    println!("  API base: {}", config.api_base);
    println!("  Intents: {}", config.intents);
    println!("  Shard: {} of {}", config.shard.index, config.shard.count);
    println!();
    println!(
        "  Heartbeat: up to {} missed acks",
        config.heartbeat.max_missed_acks
    );
    println!(
        "  Reconnect: {}s base delay, {}s cap, {} attempts",
        config.reconnect.base_delay_secs,
        config.reconnect.max_delay_secs,
        config.reconnect.max_attempts
    );

    Ok(())
}
