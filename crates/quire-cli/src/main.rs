//! `quire`: operator commands for a Quire catalog database.
//!
//! Reads `quire.toml` (or the path given with `--config`), opens the SQLite
//! store it names, and runs one command. Results are printed as JSON.
//!
//! # Usage
//!
//! ```text
//! quire init
//! quire list --status ongoing --sort title --order asc
//! quire show 6f1c2a9e-0d3b-4a5e-9c1f-2b8d7e4a6c10
//! quire publish-due
//! ```
//!
//! `publish-due` is meant to be run from cron or a systemd timer.

mod config;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use quire_core::{
  content::SeriesStatus,
  identity::NoIdentities,
  pagination::{SeriesFilter, SeriesQuery, SortField, SortOrder},
  parse_id,
  query::CatalogQuery,
  store::CatalogStore,
};
use quire_store_sqlite::SqliteStore;
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::CliConfig;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Quire catalog operator tool")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "quire.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create the database, or bring its schema up to date.
  Init,

  /// List series, one page at a time.
  List {
    #[arg(long)]
    status:    Option<SeriesStatus>,
    /// Substring match on title and summary text (ASCII case-insensitive).
    #[arg(long)]
    search:    Option<String>,
    /// Only series tagged with this genre id. Repeat for any-of.
    #[arg(long = "genre", value_parser = parse_uuid)]
    genres:    Vec<Uuid>,
    #[arg(long, default_value = "created_at", value_parser = parse_sort)]
    sort:      SortField,
    #[arg(long, default_value = "desc", value_parser = parse_order)]
    order:     SortOrder,
    #[arg(long, default_value_t = 1)]
    page:      u32,
    #[arg(long)]
    page_size: Option<u32>,
  },

  /// Show a series with its associations and live counts.
  Show { id: String },

  AddGenre { name: String },

  AddCreator { name: String },

  AddCharacter {
    name:        String,
    #[arg(long)]
    description: Option<String>,
  },

  /// Publish every scheduled chapter whose time has come.
  PublishDue,
}

fn parse_uuid(raw: &str) -> Result<Uuid, String> {
  parse_id(raw).map_err(|e| e.to_string())
}

fn parse_sort(raw: &str) -> Result<SortField, String> {
  SortField::parse(raw).ok_or_else(|| format!("cannot sort by {raw:?}"))
}

fn parse_order(raw: &str) -> Result<SortOrder, String> {
  match raw {
    "asc" => Ok(SortOrder::Asc),
    "desc" => Ok(SortOrder::Desc),
    other => Err(format!("unknown sort order {other:?}")),
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let cfg = CliConfig::load(&cli.config)?;

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  match cli.command {
    Command::Init => {
      tracing::info!(path = ?cfg.store_path, "schema is up to date");
    }

    Command::List {
      status,
      search,
      genres,
      sort,
      order,
      page,
      page_size,
    } => {
      let query = SeriesQuery {
        page: Some(page),
        page_size: Some(page_size.unwrap_or(cfg.default_page_size)),
        sort,
        order,
        filter: SeriesFilter {
          status,
          search,
          genre_ids: genres,
          ..Default::default()
        },
      };
      let page = store
        .reader(NoIdentities)
        .list_series(&query)
        .await
        .context("listing series")?;
      print_json(&page)?;
    }

    Command::Show { id } => {
      let id = parse_id(&id)?;
      let detail = store
        .reader(NoIdentities)
        .get_full_detail(id)
        .await
        .with_context(|| format!("loading series {id}"))?;
      print_json(&detail)?;
    }

    Command::AddGenre { name } => {
      print_json(&store.add_genre(name).await.context("adding genre")?)?;
    }

    Command::AddCreator { name } => {
      print_json(&store.add_creator(name).await.context("adding creator")?)?;
    }

    Command::AddCharacter { name, description } => {
      let character = store
        .add_character(name, description)
        .await
        .context("adding character")?;
      print_json(&character)?;
    }

    Command::PublishDue => {
      let published = store
        .publish_due_chapters(chrono::Utc::now())
        .await
        .context("publishing scheduled chapters")?;
      tracing::info!(count = published.len(), "published due chapters");
      print_json(&published)?;
    }
  }

  Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
