mod commands;

use clap::{Parser, Subcommand};
use jukebox_catalog::models::Category;
use jukebox_config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_ENV: &str = "JUKEBOX_LOG";

#[derive(Parser, Debug)]
#[command(name = "jukebox")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long, env = "JUKEBOX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage a client's raw media entries.
    #[command(subcommand)]
    Entries(EntriesCommands),
    /// Print the sorted media view of one category.
    Media {
        #[arg(long)]
        client: String,
        #[arg(long, default_value_t = Category::Audiobook)]
        category: Category,
        /// Only show media by this artist.
        #[arg(long)]
        artist: Option<String>,
    },
    /// Print the artist view of one category.
    Artists {
        #[arg(long)]
        client: String,
        #[arg(long, default_value_t = Category::Audiobook)]
        category: Category,
    },
    /// Search the catalog, one page at a time.
    Search {
        query: String,
        #[arg(long, default_value_t = Category::Audiobook)]
        category: Category,
        /// Zero-based page number.
        #[arg(short, long, default_value_t = 0)]
        page: usize,
    },
    /// Resolve and cache every stale category.
    Preload {
        #[arg(long)]
        client: String,
    },
}

#[derive(Subcommand, Debug)]
enum EntriesCommands {
    #[command(alias = "ls")]
    List {
        #[arg(long)]
        client: String,
    },
    Add {
        #[arg(long)]
        client: String,
        /// The raw entry as JSON, e.g. `{"type":"spotify","query":"Bibi"}`.
        #[arg(long)]
        json: String,
    },
    #[command(alias = "rm")]
    Delete {
        #[arg(long)]
        client: String,
        /// Zero-based position in the list.
        index: usize,
    },
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is reserved for JSON output.
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let config = Config::load(cli.config.as_deref()).map_err(commands::report)?;
    tracing::debug!(data_dir = %config.library.data_dir.display(), "Configuration loaded");

    // Failures are reported once, by miette, when they leave `main`.
    match cli.command {
        Commands::Entries(command) => match command {
            EntriesCommands::List { client } => commands::entries_list(&config, &client).await,
            EntriesCommands::Add { client, json } => commands::entries_add(&config, &client, &json).await,
            EntriesCommands::Delete { client, index } => commands::entries_delete(&config, &client, index).await,
        },
        Commands::Media { client, category, artist } => {
            commands::media(&config, &client, category, artist.as_deref()).await
        },
        Commands::Artists { client, category } => commands::artists(&config, &client, category).await,
        Commands::Search { query, category, page } => commands::search(&config, &query, category, page).await,
        Commands::Preload { client } => commands::preload(&config, &client).await,
    }
}
