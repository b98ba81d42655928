//! CLI entry point for chat-relay

mod chat;
mod client;
mod commands;
mod terminal;

use anyhow::Result;
use chat_relay_core::config::{Config, ConfigLoader};
use chat_relay_core::logging::init_logging;
use chat_relay_gateway::{run_server, AppState};
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::chat::run_chat;
use crate::client::ApiClient;

#[derive(Parser)]
#[command(name = "chat-relay")]
#[command(about = "Chat with a hosted LLM through a thin completion gateway")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config.json to the config directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Run the completion gateway
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
        /// Directory served as the single-page app
        #[arg(long)]
        static_dir: Option<String>,
    },
    /// Start an interactive chat
    Chat {
        /// Gateway API base URL
        #[arg(short, long)]
        gateway_url: Option<String>,
        /// Directory holding saved chats
        #[arg(short, long)]
        data_dir: Option<String>,
    },
    /// Send one message and print the reply
    Ask {
        /// Message to send
        #[arg(short, long)]
        message: String,
        /// Gateway API base URL
        #[arg(short, long)]
        gateway_url: Option<String>,
    },
    /// Check that the gateway is up
    Health {
        /// Gateway API base URL
        #[arg(short, long)]
        gateway_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };
    if let Commands::Init { force } = cli.command {
        return run_init(&config_loader, force);
    }
    let mut config = config_loader.load()?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            static_dir,
        } => {
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(static_dir) = static_dir {
                config.gateway.static_dir = static_dir;
            }
            let _guard = init_logging(&config.logging, true);
            info!("Starting gateway");
            run_serve(&config).await?;
        }
        Commands::Chat {
            gateway_url,
            data_dir,
        } => {
            if let Some(url) = gateway_url {
                config.client.gateway_url = url;
            }
            if let Some(dir) = data_dir {
                config.client.data_dir = dir;
            }
            let _guard = init_logging(&config.logging, false);
            info!("Starting interactive chat");
            run_chat(&config).await?;
        }
        Commands::Ask {
            message,
            gateway_url,
        } => {
            let _guard = init_logging(&config.logging, false);
            let url = gateway_url.unwrap_or_else(|| config.client.gateway_url.clone());
            run_ask(&url, &message).await?;
        }
        Commands::Init { .. } => {}
        Commands::Health { gateway_url } => {
            let _guard = init_logging(&config.logging, false);
            let url = gateway_url.unwrap_or_else(|| config.client.gateway_url.clone());
            run_health(&url).await?;
        }
    }

    Ok(())
}

fn run_init(loader: &ConfigLoader, force: bool) -> Result<()> {
    let path = loader.config_path();
    if path.exists() && !force {
        println!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        );
        return Ok(());
    }
    loader.save(&Config::default())?;
    println!("{} Wrote {}", style("✓").green().bold(), path.display());
    println!(
        "Set GROQ_API_KEY or edit provider.api_key in {} before running `serve`.",
        loader.config_dir().display()
    );
    Ok(())
}

/// Run the gateway until Ctrl+C
async fn run_serve(config: &Config) -> Result<()> {
    let state = AppState::from_config(&config.provider);

    println!("{}", style("Starting chat-relay gateway...").bold().cyan());
    println!("Model: {}", config.provider.model);
    println!("Static files: {}", config.gateway.static_dir);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let gateway = config.gateway.clone();
    let mut server = tokio::spawn(async move { run_server(state, &gateway, shutdown_rx).await });

    println!(
        "{}",
        style(format!(
            "Gateway is running on http://{}:{}. Press Ctrl+C to stop.",
            config.gateway.host, config.gateway.port
        ))
        .green()
    );

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            println!("\n{}", style("Shutting down...").yellow());
            let _ = shutdown_tx.send(());
        }
        finished = &mut server => {
            // The server stopped on its own, typically a bind failure.
            return finished?;
        }
    }

    server.await??;
    println!("{}", style("Gateway stopped.").green());
    Ok(())
}

/// One-shot message through the gateway
async fn run_ask(gateway_url: &str, message: &str) -> Result<()> {
    let client = ApiClient::new(gateway_url);
    println!("{}", style("Processing...").cyan());
    let reply = client.chat(message).await;
    println!("\n{}", style("Response:").bold());
    println!("{}", reply);
    Ok(())
}

async fn run_health(gateway_url: &str) -> Result<()> {
    let client = ApiClient::new(gateway_url);
    match client.health().await {
        Ok(health) => {
            println!(
                "{} {} ({})",
                style("✓").green().bold(),
                health.message,
                health.status
            );
            Ok(())
        }
        Err(e) => {
            error!("Health check failed: {}", e);
            println!("{} Gateway at {} is not reachable", style("✗").red(), client.base_url());
            Err(e)
        }
    }
}

