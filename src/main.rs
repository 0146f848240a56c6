//! Forwarder Dashboard CLI
//!
//! Headless front end for the forwarder admin dashboard:
//! - Watch the real-time status channel
//! - Show the current status
//! - Manage the theme preference
//! - Generate a config file

use clap::{Parser, Subcommand};
use forwarder_dash::api::{ApiClient, LogNavigator};
use forwarder_dash::config::{generate_default_config, Config, LoggingConfig};
use forwarder_dash::format::format_number;
use forwarder_dash::notify::NotificationCenter;
use forwarder_dash::realtime::{StatusSnapshot, WsTransport};
use forwarder_dash::session::{DashboardSession, PageController, STATUS_PATH};
use forwarder_dash::theme::{ThemeManager, ThemeStore};
use forwarder_dash::widgets::HeadlessBackend;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "forwarder-dash")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Headless client for the forwarder admin dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: searched in the user config dir and ./)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL, overrides the config file
    #[arg(long, global = true)]
    pub api_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Follow the real-time channel until Ctrl-C
    Watch {
        /// WebSocket endpoint (default: from config)
        #[arg(long)]
        ws_url: Option<String>,
    },

    /// Fetch and print the current status
    Status,

    /// Show or switch the dashboard theme
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ThemeAction {
    /// Print the stored theme
    Show,
    /// Switch between dark and light
    Toggle,
}

/// Logs every status update it sees
struct ConsolePage;

impl PageController for ConsolePage {
    fn name(&self) -> &str {
        "dashboard"
    }

    fn on_status_update(&self, status: &StatusSnapshot) {
        tracing::info!(
            notifications = status.notification_count(),
            fields = status.fields.len(),
            "Status update"
        );
    }

    fn auto_refresh(&self) -> bool {
        true
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }

    init_logging(&config.logging)?;

    match cli.command {
        Commands::Watch { ws_url } => {
            let url = ws_url.unwrap_or_else(|| config.realtime.url.clone());
            let transport = Arc::new(
                WsTransport::new(url)?.with_connect_timeout(config.realtime.connect_timeout()),
            );

            let session = DashboardSession::new(
                config,
                transport,
                HeadlessBackend::new(),
                Arc::new(ConsolePage),
            )?;
            session.start();

            tokio::signal::ctrl_c().await?;
            tracing::info!("Shutting down...");
            session.shutdown();
        }

        Commands::Status => {
            let notifications = NotificationCenter::with_tracing(Duration::ZERO);
            let api = ApiClient::new(config.api.clone(), notifications, Arc::new(LogNavigator))?;
            let status: StatusSnapshot = api.get_json(STATUS_PATH).await?;

            println!("Forwarder dashboard v{}", env!("CARGO_PKG_VERSION"));
            println!();
            println!(
                "Pending notifications: {}",
                format_number(status.notification_count())
            );

            let mut keys: Vec<_> = status.fields.keys().collect();
            keys.sort();
            for key in keys {
                println!("  {}: {}", key, status.fields[key.as_str()]);
            }

            println!();
            println!("Checked: {}", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"));
        }

        Commands::Theme { action } => {
            let notifications = NotificationCenter::with_tracing(Duration::ZERO);
            let themes = ThemeManager::new(ThemeStore::new(&config.theme.state_file), notifications);
            let current = themes.init();

            match action {
                ThemeAction::Show => println!("{}", current),
                ThemeAction::Toggle => {
                    let next = themes.toggle()?;
                    println!("{} -> {}", current, next);
                }
            }
        }

        Commands::Config { output } => {
            let config = generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("forwarder_dash={}", config.level)));

    let writer = match &config.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            BoxMakeWriter::new(std::sync::Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let layer = tracing_subscriber::fmt::layer().with_writer(writer);
    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry.with(layer.json()).init();
    } else {
        registry.with(layer).init();
    }

    Ok(())
}
