use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use regtoken_core::{LogFormat, LoggingConfig, RegtokenConfig};
use regtoken_tokens::{TokenRegistry, create_store};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "regtoken",
    version,
    about = "A token based Matrix registration service"
)]
struct Cli {
    /// Configuration file to use (default: $REGTOKEN_CONFIG, then ./config.yaml)
    #[arg(long = "config-path", global = true)]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new registration token.
    Generate {
        /// Times the token can be used (0 = unlimited)
        #[arg(short = 'm', long)]
        maximum: Option<u32>,

        /// Expiration: one of 'never', 'day', 'week', 'month' or ISO-8601 date (YYYY-MM-DD)
        #[arg(short = 'e', long)]
        expires: Option<String>,
    },

    /// View token status, list tokens or disable a token.
    Status(StatusArgs),

    /// Start the API server.
    Serve,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct StatusArgs {
    /// Show the status of a token
    #[arg(short = 's', long = "status", value_name = "NAME")]
    status: Option<String>,

    /// List all tokens
    #[arg(short = 'l', long = "list")]
    list: bool,

    /// Disable a token
    #[arg(short = 'd', long = "disable", value_name = "NAME")]
    disable: Option<String>,
}

impl From<StatusArgs> for commands::status::StatusAction {
    fn from(args: StatusArgs) -> Self {
        match (args.disable, args.status) {
            (Some(name), _) => Self::Disable(name),
            (None, Some(name)) => Self::Show(name),
            (None, None) => Self::List,
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    // RUST_LOG wins over the configured level
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn open_registry(config: &RegtokenConfig) -> anyhow::Result<Arc<TokenRegistry>> {
    let store = create_store(&config.storage).await.with_context(|| {
        format!(
            "Failed to open token storage at {}",
            config.storage.path.display()
        )
    })?;
    let registry = TokenRegistry::hydrate(store)
        .await
        .context("Failed to load tokens from storage")?;
    Ok(Arc::new(registry))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = RegtokenConfig::load(cli.config_path.as_deref())
        .context("Failed to load configuration")?;
    init_tracing(&config.logging);

    let registry = open_registry(&config).await?;

    match cli.cmd {
        Command::Generate { maximum, expires } => {
            commands::generate::run(&registry, &config, maximum, expires.as_deref()).await?
        }
        Command::Status(args) => commands::status::run(&registry, args.into()).await?,
        Command::Serve => commands::serve::run(registry, config).await?,
    }

    Ok(())
}
