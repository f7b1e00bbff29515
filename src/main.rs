use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use folio::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display portfolio valuation and P&L
    Summary,
    /// Display the reconstructed net-worth series
    History {
        /// Days to look back
        #[arg(short, long)]
        days: Option<u32>,
        /// Bucket granularity: day, week or month
        #[arg(short, long, default_value = "day")]
        granularity: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(Commands::Summary) => {
            folio::run_command(folio::AppCommand::Summary, cli.config_path.as_deref()).await
        }
        Some(Commands::History { days, granularity }) => {
            let granularity = granularity.parse()?;
            let days = match days {
                Some(days) => days,
                None => default_history_days(cli.config_path.as_deref())?,
            };
            folio::run_command(
                folio::AppCommand::History { days, granularity },
                cli.config_path.as_deref(),
            )
            .await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn default_history_days(config_path: Option<&str>) -> Result<u32> {
    let config = match config_path {
        Some(path) => folio::core::config::AppConfig::load_from_path(path)?,
        None => folio::core::config::AppConfig::load()?,
    };
    Ok(config.history_days)
}

fn setup() -> Result<()> {
    use anyhow::Context;

    let path = folio::core::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
currency: "USD"

providers:
  yahoo:
    base_url: "https://query1.finance.yahoo.com"

# quote_delay_ms: 250
# history_days: 30
# data_path: "/path/to/data"
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
