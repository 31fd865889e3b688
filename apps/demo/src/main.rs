mod commands;

use clap::{Parser, Subcommand};
use loadkit_core::{init_logging, AppConfig, AppConfigTrait};
use loadkit_orm::{LoadingConfig, LoadingStrategy, LoadingStrategyRunner};

use commands::Selection;

#[derive(Parser)]
#[command(name = "loadkit-demo")]
#[command(about = "Watch lazy, eager and explicit loading fetch the course catalogue")]
struct Cli {
    /// JSON dataset for the in-memory database (overrides DATASET_PATH)
    #[arg(long, global = true)]
    dataset: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch records with one strategy and print them
    Fetch {
        #[command(flatten)]
        selection: Selection,

        /// lazy, eager or explicit (defaults to LOADING_STRATEGY)
        #[arg(long)]
        strategy: Option<LoadingStrategy>,
    },

    /// Run the same request under every strategy and count round trips
    Compare {
        #[command(flatten)]
        selection: Selection,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut app = AppConfig::from_env()?;
    if let Some(dataset) = cli.dataset {
        app.dataset_path = Some(dataset);
    }
    app.validate()?;

    let loading = LoadingConfig::from_env()?;
    loading.validate()?;

    init_logging(&app.logging).map_err(|e| anyhow::anyhow!("failed to initialise logging: {}", e))?;

    let runner = LoadingStrategyRunner::from_config(&app, loading).await?;

    match cli.command {
        Commands::Fetch { selection, strategy } => {
            let request = commands::build_request(&selection)?;
            let strategy = strategy.unwrap_or(runner.config().default_strategy);
            commands::fetch(&runner, &request, strategy).await?;
        }
        Commands::Compare { selection } => {
            let request = commands::build_request(&selection)?;
            commands::compare(&runner, &request).await?;
        }
    }

    Ok(())
}
