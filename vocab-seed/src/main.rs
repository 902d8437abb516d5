//! vocab-seed - Vocabulary seeding service
//!
//! Runs seeding jobs, maintenance passes and the validator, either from the
//! command line or behind the HTTP trigger API (`serve`).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vocab_common::config::{resolve_root_folder, TomlConfig};
use vocab_common::db::init_database;
use vocab_common::{Language, Level, TableRegistry};

use vocab_seed::db::{settings, SeedLock};
use vocab_seed::models::{GenerationJobOptions, UnitFailurePolicy, ValidationOptions};
use vocab_seed::services::{dedup_language, remove_orphans, OpenAiCompatibleClient, Seeder, Validator, WordGenerator};
use vocab_seed::{config, AppState};

/// Command-line arguments for vocab-seed
#[derive(Parser, Debug)]
#[command(name = "vocab-seed")]
#[command(about = "Vocabulary seeding, translation and maintenance service")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, global = true, env = "VOCAB_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database
    #[arg(short, long, global = true, env = "VOCAB_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP trigger API
    Serve {
        /// Port to listen on (overrides TOML)
        #[arg(short, long, env = "VOCAB_PORT")]
        port: Option<u16>,
    },

    /// Run one seeding job in the foreground
    Seed(SeedArgs),

    /// Remove case-insensitive duplicate words
    Dedup { language: Language },

    /// Remove words without any translation link
    Orphans { language: Language },

    /// Check and correct stored words
    Validate(ValidateArgs),

    /// Inspect or clear the seed lease
    Lock {
        #[command(subcommand)]
        action: LockCommand,
    },

    /// Store the generation API key in the database
    SetApiKey { key: String },

    /// Store the generation model in the database
    SetModel { model: String },

    /// Print a random trigger secret
    GenSecret,
}

#[derive(Subcommand, Debug)]
enum LockCommand {
    /// Show the current holder
    Status,
    /// Clear the lease regardless of holder
    Release,
}

#[derive(ClapArgs, Debug)]
struct SeedArgs {
    /// Language to generate words in
    #[arg(short, long)]
    language: Language,

    /// Language to translate into
    #[arg(short, long)]
    translation_language: Language,

    /// Total number of words
    #[arg(long)]
    total: usize,

    /// Words per generation request
    #[arg(long, default_value_t = 10)]
    batch_size: usize,

    /// Pause between units in milliseconds
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Fixed CEFR level
    #[arg(long)]
    level: Option<Level>,

    /// Fixed word type
    #[arg(long)]
    word_type: Option<String>,

    /// Random word type per batch
    #[arg(long)]
    random_word_type: bool,

    /// Theme for topic mode
    #[arg(long)]
    topic: Option<String>,

    /// Use letter combinations instead of quantity batches
    #[arg(long)]
    alphabetical: bool,

    /// Log every inserted word at info level
    #[arg(long)]
    log_verbose: bool,

    /// skip, abort or retry(n)
    #[arg(long, default_value = "skip")]
    on_unit_failure: UnitFailurePolicy,

    /// Seed for the shuffle and random picks
    #[arg(long)]
    rng_seed: Option<u64>,
}

#[derive(ClapArgs, Debug)]
struct ValidateArgs {
    language: Language,

    #[arg(long)]
    word_type: String,

    #[arg(long, default_value_t = 20)]
    batch_size: usize,

    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Log intended changes without writing
    #[arg(long)]
    dry_run: bool,
}

impl SeedArgs {
    fn options(&self) -> GenerationJobOptions {
        GenerationJobOptions {
            language: self.language,
            translation_language: self.translation_language,
            total: self.total,
            batch_size: self.batch_size,
            delay_ms: self.delay_ms,
            level: self.level,
            word_type: self.word_type.clone(),
            random_word_type: self.random_word_type,
            topic: self.topic.clone(),
            alphabetical: self.alphabetical,
            log_verbose: self.log_verbose,
            on_unit_failure: self.on_unit_failure,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = TomlConfig::load(args.config.as_deref()).context("Failed to load config")?;

    // Initialize tracing
    let default_filter = format!("vocab_seed={0},vocab_common={0},tower_http=info", toml_config.logging.level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Command::GenSecret = args.command {
        println!("{}", vocab_common::auth::generate_secret());
        return Ok(());
    }

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    let db_path = toml_config.database_path(&root_folder);
    info!("Database: {}", db_path.display());

    let registry = TableRegistry::all_pairs();
    let db = init_database(&db_path, &registry)
        .await
        .context("Failed to open database")?;
    let lock = SeedLock::new(db.clone()).with_ttl(config::lease_ttl(&toml_config));

    match args.command {
        Command::Serve { port } => {
            let generator = build_generator(&db, &toml_config).await?;
            let trigger_secret = config::resolve_trigger_secret(&toml_config);
            if trigger_secret.is_none() {
                warn!("No trigger secret configured; trigger endpoints accept any request");
            }

            let state = AppState::new(db, registry, generator)
                .with_trigger_secret(trigger_secret)
                .with_lease_ttl(config::lease_ttl(&toml_config));
            let app = vocab_seed::build_router(state);

            let port = port.unwrap_or_else(|| toml_config.port());
            let addr = SocketAddr::from(([127, 0, 0, 1], port));
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .context("Failed to bind to address")?;
            info!("Listening on http://{}", addr);
            info!("Health check: http://{}/health", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("Server error")?;
            info!("Server shutdown complete");
        }

        Command::Seed(seed_args) => {
            let options = seed_args.options();
            let generator = build_generator(&db, &toml_config).await?;
            let mut seeder = Seeder::new(db.clone(), registry, generator);
            if let Some(seed) = seed_args.rng_seed {
                seeder = seeder.with_rng_seed(seed);
            }

            let report = lock
                .run_exclusive(|_lease| async move { seeder.run(&options).await })
                .await??;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Dedup { language } => {
            let (db, registry) = (&db, &registry);
            let removed = lock
                .run_exclusive(|_lease| async move { dedup_language(db, registry, language).await })
                .await??;
            println!("Removed {} duplicate {} words", removed, language);
        }

        Command::Orphans { language } => {
            let (db, registry) = (&db, &registry);
            let removed = lock
                .run_exclusive(|_lease| async move { remove_orphans(db, registry, language).await })
                .await??;
            println!("Removed {} untranslated {} words", removed, language);
        }

        Command::Validate(validate_args) => {
            let options = ValidationOptions {
                language: validate_args.language,
                word_type: validate_args.word_type,
                batch_size: validate_args.batch_size,
                delay_ms: validate_args.delay_ms,
                dry_run: validate_args.dry_run,
            };
            let validator = Validator::new(db.clone(), build_generator(&db, &toml_config).await?);

            let report = lock
                .run_exclusive(|_lease| async move { validator.run(&options).await })
                .await??;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Lock { action } => match action {
            LockCommand::Status => {
                info!(lock = lock.name(), "Reading lease");
                let status = lock.status().await?;
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
            LockCommand::Release => {
                if lock.force_release().await? {
                    println!("Lease released");
                } else {
                    println!("Lease was not held");
                }
            }
        },

        Command::SetApiKey { key } => {
            if !config::is_valid_key(&key) {
                anyhow::bail!("API key must not be empty");
            }
            settings::set_generation_api_key(&db, key).await?;
            println!("Generation API key stored in database");
        }

        Command::SetModel { model } => {
            if model.trim().is_empty() {
                anyhow::bail!("Model must not be empty");
            }
            settings::set_generation_model(&db, model.trim().to_string()).await?;
            println!("Generation model stored in database");
        }

        Command::GenSecret => {}
    }

    Ok(())
}

async fn build_generator(db: &sqlx::SqlitePool, toml_config: &TomlConfig) -> Result<WordGenerator> {
    let settings = config::resolve_generation_settings(db, toml_config).await?;
    info!(model = %settings.model, api_base = %settings.api_base, "Generation service configured");
    let client = OpenAiCompatibleClient::new(settings).context("Failed to build generation client")?;
    Ok(WordGenerator::new(Arc::new(client)))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        },
    }
}
