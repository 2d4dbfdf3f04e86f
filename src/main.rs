use std::{path::PathBuf, sync::Arc};

use balance_sentinel::{
    config::{AccountLoader, AppConfig},
    delivery::create_sink,
    models::Account,
    persistence::SqliteStateRepository,
    providers::{BalanceSource, HttpBalanceSource},
    supervisor::Supervisor,
};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the balance monitoring service.
    Run(ConfigArgs),
    /// Loads and validates the configuration, then exits.
    CheckConfig(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    /// Directory holding app.yaml and accounts.yaml.
    #[arg(long, default_value = "configs")]
    config_dir: String,

    /// Accounts file, overriding the one in the configuration directory.
    #[arg(long)]
    accounts: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_supervisor(args).await?,
        Commands::CheckConfig(args) => check_config(args)?,
    }

    Ok(())
}

fn load_config(args: &ConfigArgs) -> Result<(AppConfig, Vec<Account>), Box<dyn std::error::Error>> {
    tracing::debug!(config_dir = %args.config_dir, "Loading application configuration...");
    let mut config = AppConfig::new(Some(&args.config_dir))?;
    if let Some(accounts) = &args.accounts {
        config.accounts_config_path = accounts.clone();
    }

    let accounts = AccountLoader::new(
        config.accounts_config_path.clone(),
        config.default_threshold,
        config.default_repeat_interval_secs,
    )
    .load()?;

    Ok((config, accounts))
}

fn check_config(args: ConfigArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (config, accounts) = load_config(&args)?;
    create_sink(&config.delivery)?;

    println!("Configuration OK");
    println!("  database: {}", config.database_url);
    match &config.balance_source {
        Some(source) => println!("  balance source: {}", source.url),
        None => println!("  balance source: none"),
    }
    println!("  accounts ({}):", accounts.len());
    for account in &accounts {
        println!(
            "    {} ({}) threshold={} repeat={}s",
            account.display_name, account.id, account.threshold, account.repeat_interval_secs
        );
    }
    Ok(())
}

async fn run_supervisor(args: ConfigArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (config, accounts) = load_config(&args)?;
    tracing::debug!(database_url = %config.database_url, accounts = accounts.len(), "Configuration loaded.");

    tracing::debug!("Initializing state repository...");
    let repository = Arc::new(SqliteStateRepository::new(&config.database_url).await?);
    repository.run_migrations().await?;
    tracing::info!("Database migrations completed.");

    let sink = create_sink(&config.delivery)?;

    let mut builder =
        Supervisor::builder().accounts(accounts).repository(repository).sink(sink);
    if let Some(source_config) = &config.balance_source {
        let source: Arc<dyn BalanceSource> = Arc::new(HttpBalanceSource::new(
            source_config.url.as_str(),
            &source_config.retry_policy,
        )?);
        builder = builder.balance_source(source);
    }

    let supervisor = builder.config(config).build().await?;
    supervisor.run().await?;

    Ok(())
}
