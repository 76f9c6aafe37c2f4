#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::needless_pass_by_value,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ivr_router::config::Config;
use ivr_router::dialogue::create_dialogue_manager;
use ivr_router::gateway;
use ivr_router::ConfigCommands;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Session used by CLI turns when none is given.
const CLI_SESSION_ID: &str = "cli-session";

/// `ivr-router` - intent routing and dialogue state for a banking assistant.
#[derive(Parser, Debug)]
#[command(name = "ivr-router")]
#[command(version)]
#[command(about = "Intent routing and multi-turn dialogue for a banking assistant.", long_about = None)]
struct Cli {
    /// Directory holding config.toml (overrides IVR_CONFIG_DIR)
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway
    #[command(long_about = "\
Start the HTTP gateway.

Serves POST /predict_intent plus session, health and metrics routes. \
Bind address defaults to the values in your config file \
(gateway.host / gateway.port).

Examples:
  ivr-router serve                  # use config defaults
  ivr-router serve -p 8080          # listen on port 8080
  ivr-router serve --host 0.0.0.0   # bind to all interfaces")]
    Serve {
        /// Port to listen on; defaults to config gateway.port
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to; defaults to config gateway.host
        #[arg(long)]
        host: Option<String>,
    },

    /// Chat with the router interactively
    #[command(long_about = "\
Chat with the router interactively.

Reads one utterance per line from stdin and prints the reply. \
Ends on EOF or when the conversation reaches the exit intent.

Examples:
  ivr-router chat
  ivr-router chat --session alice")]
    Chat {
        /// Session to converse in
        #[arg(short, long, default_value = CLI_SESSION_ID)]
        session: String,
    },

    /// Run a single turn and print the result as JSON
    #[command(long_about = "\
Run a single turn and print the result as JSON.

Examples:
  ivr-router turn \"what is my balance\"
  ivr-router turn \"transfer money\" --session alice")]
    Turn {
        /// The user utterance
        query: String,

        /// Session the turn belongs to
        #[arg(short, long, default_value = CLI_SESSION_ID)]
        session: String,
    },

    /// Show resolved configuration summary
    Status,

    /// Manage configuration
    #[command(long_about = "\
Manage router configuration.

Examples:
  ivr-router config show
  ivr-router config path")]
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(config_dir) = &cli.config_dir {
        if config_dir.trim().is_empty() {
            bail!("--config-dir cannot be empty");
        }
        std::env::set_var("IVR_CONFIG_DIR", config_dir);
    }

    // Initialize logging - respects RUST_LOG env var, defaults to INFO.
    // Logs go to stderr so chat and turn output stay clean on stdout.
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let mut config = Config::load_or_init().await?;

    match cli.command {
        Commands::Serve { port, host } => {
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(host) = host {
                config.gateway.host = host;
            }
            config.validate()?;
            info!(
                "Starting ivr-router gateway on {}:{}",
                config.gateway.host, config.gateway.port
            );
            let manager = Arc::new(create_dialogue_manager(&config)?);
            gateway::run_gateway(manager, &config.gateway).await
        }

        Commands::Chat { session } => {
            let manager = create_dialogue_manager(&config)?;
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let mut stdout = std::io::stdout();

            println!("Type your request (Ctrl-D to quit).");
            loop {
                print!("You: ");
                stdout.flush()?;
                let Some(line) = lines.next_line().await? else {
                    println!();
                    break;
                };
                let result = manager.process_turn(&session, &line).await;
                println!("Bot: {}", result.response);
                if result.intent == "exit" {
                    break;
                }
            }
            Ok(())
        }

        Commands::Turn { query, session } => {
            let manager = create_dialogue_manager(&config)?;
            let result = manager.process_turn(&session, &query).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }

        Commands::Status => {
            println!("ivr-router status");
            println!();
            println!("Version:     {}", env!("CARGO_PKG_VERSION"));
            println!("Config:      {}", config.config_path.display());
            println!();
            println!(
                "Classifier:  {}",
                config
                    .classifier
                    .endpoint
                    .as_deref()
                    .unwrap_or("keyword (offline)")
            );
            println!("Context:     {:?}", config.context.backend);
            println!("Tools:       {}", config.tools.base_url);
            println!(
                "Gateway:     {}:{}",
                config.gateway.host, config.gateway.port
            );
            println!();
            println!("Dialogue:");
            println!(
                "  Routing threshold:  {}",
                config.dialogue.routing_threshold
            );
            println!(
                "  Switch threshold:   {}",
                config.dialogue.switch_threshold
            );
            println!(
                "  Max transfer:       {}{}",
                config.dialogue.currency_symbol, config.dialogue.max_transfer_amount
            );
            Ok(())
        }

        Commands::Config { config_command } => match config_command {
            ConfigCommands::Show => {
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
            ConfigCommands::Path => {
                println!("{}", config.config_path.display());
                Ok(())
            }
        },
    }
}
