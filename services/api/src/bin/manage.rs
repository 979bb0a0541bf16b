//! services/api/src/bin/manage.rs
//!
//! Maintenance commands: session cleanup, analytics export, resource seeding,
//! and model training.

use api_lib::{
    adapters::DbAdapter,
    commands::{
        cleanup_old_sessions, export_analytics, setup_initial_data, train_models, CleanupOptions,
        ExportFormat, TrainOptions,
    },
    config::Config,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "manage")]
#[command(about = "Moodigo maintenance commands", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Delete anonymous sessions idle for longer than the cutoff
    CleanupOldSessions {
        /// Delete sessions older than this many days
        #[arg(long, default_value = "30")]
        days: i64,

        /// Show what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Export anonymized analytics
    ExportAnalytics {
        /// csv or json
        #[arg(short, long, default_value = "csv")]
        format: ExportFormat,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of days to include
        #[arg(long, default_value = "30")]
        days: i64,
    },

    /// Seed crisis, counseling, app and article resources
    SetupInitialData {
        /// Rewrite resources that already exist
        #[arg(long)]
        force: bool,
    },

    /// Train the survey and text models
    TrainModels {
        /// Survey dataset CSV
        #[arg(long)]
        survey_data: Option<PathBuf>,

        /// Labelled statements CSV
        #[arg(long)]
        nlp_data: Option<PathBuf>,

        /// Retrain even if both model files exist
        #[arg(long)]
        retrain: bool,
    },
}

async fn connect(config: &Config) -> Result<DbAdapter, sqlx::Error> {
    let db = DbAdapter::connect(&config.database_url, 1).await?;
    db.run_migrations().await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut out = std::io::stdout().lock();

    match cli.command {
        Command::CleanupOldSessions { days, dry_run, yes } => {
            let db = connect(&config).await?;
            let options = CleanupOptions {
                days,
                dry_run,
                assume_yes: yes,
            };
            let mut input = std::io::stdin().lock();
            let result = cleanup_old_sessions(&db, options, &mut input, &mut out).await?;
            info!("cleanup-old-sessions finished: {:?}", result);
        }
        Command::ExportAnalytics {
            format,
            output,
            days,
        } => {
            let db = connect(&config).await?;
            export_analytics(&db, format, days, output.as_deref(), &mut out).await?;
        }
        Command::SetupInitialData { force } => {
            let db = connect(&config).await?;
            setup_initial_data(&db, force, &mut out).await?;
        }
        Command::TrainModels {
            survey_data,
            nlp_data,
            retrain,
        } => {
            let options = TrainOptions {
                survey_data,
                nlp_data,
                retrain,
                survey_model_path: config.survey_model_path.clone(),
                text_model_path: config.text_model_path.clone(),
            };
            let result = train_models(&options, &mut out)?;
            info!("train-models finished: {:?}", result);
        }
    }

    Ok(())
}
