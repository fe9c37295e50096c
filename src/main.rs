//! Hunters CLI - serve the hunter REST API and manage its stores

use clap::{Parser, Subcommand};
use hunters::config::{self, HunterConfig};
use hunters::storage::{DocumentRepository, HunterRepository, RelationalRepository};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "hunters")]
#[command(version)]
#[command(about = "Hunter REST API backed by a document store and a relational mirror")]
#[command(long_about = r#"
Serves CRUD endpoints for hunters. Every request goes to the document store;
the relational store is schema-synchronized at startup and kept as a mirror.

Configuration comes from hunters.toml (or --config) and HUNTERS_* environment
variables; a .env file is loaded first.

Example usage:
  hunters init
  HUNTERS_DOCUMENT_URI=sqlite://data/documents.db \
  HUNTERS_RELATIONAL_URL=sqlite://data/relational.db hunters serve
  hunters list --relational
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect both stores, sync the relational schema and serve HTTP
    Serve {
        /// Port to listen on (overrides configuration)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Synchronize the relational schema and exit
    Sync,

    /// Check that both stores are reachable
    Check,

    /// Print stored hunters
    List {
        /// Read the relational mirror instead of the document store
        #[arg(short, long)]
        relational: bool,
    },

    /// Write a configuration template
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine; values may come from the real environment
    let _ = dotenvy::dotenv();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let mut settings = HunterConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                settings.port = port;
            }
            let addr = settings.socket_addr()?;

            let (context, _report) = hunters::bootstrap::connect(&settings).await;
            hunters::server::start_server(addr, context).await?;
        }

        Commands::Sync => {
            let repo =
                RelationalRepository::connect(settings.relational_url.as_deref(), settings.store_timeout())
                    .await?;
            let outcome = repo.sync().await?;
            println!("✅ Table '{}' {}", hunters::storage::schema::TABLE, outcome);
        }

        Commands::Check => {
            println!("🔌 Checking store connectivity...");
            let (context, report) = hunters::bootstrap::connect(&settings).await;

            match (&report.document, context.documents()) {
                (Ok(()), Ok(repo)) => {
                    println!("✅ Document store reachable ({} hunters)", repo.count().await?)
                }
                (Err(e), _) => println!("❌ Document store: {}", e),
                (_, Err(e)) => println!("❌ Document store: {}", e),
            }
            match (&report.relational, context.relational()) {
                (Ok(outcome), Ok(repo)) => println!(
                    "✅ Relational store reachable (schema {}, {} rows)",
                    outcome,
                    repo.count().await?
                ),
                (Err(e), _) => println!("❌ Relational store: {}", e),
                (_, Err(e)) => println!("❌ Relational store: {}", e),
            }

            if report.document.is_err() || report.relational.is_err() {
                anyhow::bail!("one or more stores are unavailable");
            }
        }

        Commands::List { relational } => {
            if relational {
                let repo = RelationalRepository::connect(
                    settings.relational_url.as_deref(),
                    settings.store_timeout(),
                )
                .await?;
                repo.sync().await?;
                print_hunters(&repo).await?;
            } else {
                let repo =
                    DocumentRepository::connect(settings.document_uri.as_deref(), settings.store_timeout())
                        .await?;
                print_hunters(&repo).await?;
            }
        }

        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            let template = HunterConfig {
                document_uri: Some("sqlite://data/documents.db".to_string()),
                relational_url: Some("sqlite://data/relational.db".to_string()),
                ..HunterConfig::default()
            };
            config::write_config(&path, &template, force)?;
            println!("📝 Wrote {}", path.display());
        }
    }

    Ok(())
}

async fn print_hunters<R: HunterRepository>(repo: &R) -> anyhow::Result<()> {
    let stored = repo.list_all().await?;
    if stored.is_empty() {
        println!("∅ No hunters in the {} store.", repo.store_name());
    } else {
        println!("{}", hunters::ui::hunters_table(&stored));
        println!("{} hunter(s) in the {} store", stored.len(), repo.store_name());
    }
    Ok(())
}
