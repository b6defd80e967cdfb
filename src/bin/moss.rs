//! Moss CLI: digital garden entries and links, plus an MCP server.
//!
//! Usage:
//!   moss mcp [--db path] [--config path]
//!   moss entry <subcommand> [--db path] [--json]
//!   moss link <subcommand> [--db path] [--json]

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use moss::{
    CallContext, ConfigLayer, ConfigLoader, DomainError, Entry, Link, MossApi, MossConfig,
    OpenStore, SqliteStore,
};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "moss",
    version,
    about = "Digital garden: owned entries with growth stages and links between them"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Path to a YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log filter, e.g. `info` or `moss=debug`
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP (Model Context Protocol) server on stdio
    Mcp,
    /// Manage entries
    Entry {
        #[command(subcommand)]
        action: EntryAction,
    },
    /// Manage links between entries
    Link {
        #[command(subcommand)]
        action: LinkAction,
    },
}

#[derive(Subcommand)]
enum EntryAction {
    /// Create a new entry
    Create {
        /// Owner of the new entry
        #[arg(long)]
        owner: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        /// seed, sprout, bloom or evergreen
        #[arg(long, default_value = "seed")]
        stage: String,
    },
    /// Show one entry
    Get {
        id: String,
        /// Requesting user
        #[arg(long = "as")]
        requester: String,
    },
    /// Replace an entry's title, content and stage
    Update {
        id: String,
        /// Owner of the entry
        #[arg(long)]
        owner: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        stage: String,
    },
    /// Delete an entry and its links
    Delete {
        id: String,
        /// Requesting user
        #[arg(long = "as")]
        requester: String,
    },
    /// List an owner's entries
    List {
        #[arg(long)]
        owner: String,
        /// Only entries updated at or after this RFC 3339 timestamp
        #[arg(long)]
        since: Option<DateTime<Utc>>,
    },
}

#[derive(Subcommand)]
enum LinkAction {
    /// Link source entry to target entry
    Create {
        source: String,
        target: String,
        #[arg(long)]
        owner: String,
    },
    /// Remove the link from source to target
    Delete {
        source: String,
        target: String,
        /// Requesting user
        #[arg(long = "as")]
        requester: String,
    },
    /// List links leaving an entry (or arriving with --incoming)
    List {
        entry: String,
        #[arg(long)]
        incoming: bool,
    },
    /// Count links leaving an entry (or arriving with --incoming)
    Count {
        entry: String,
        #[arg(long)]
        incoming: bool,
    },
}

fn load_config(cli: &Cli) -> Result<MossConfig, String> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_file(path),
        None => ConfigLoader::new(),
    };
    let overrides = ConfigLayer {
        db_path: cli.db.clone(),
        log_level: cli.log_level.clone(),
        call_timeout_ms: None,
    };
    loader.load(overrides).map_err(|e| e.to_string())
}

fn open_api(config: &MossConfig) -> Result<MossApi, String> {
    let store = SqliteStore::open(&config.db_path)
        .map_err(|e| format!("Failed to open database: {}", e))?;
    Ok(MossApi::new(Arc::new(store)))
}

fn fail(e: DomainError) -> i32 {
    eprintln!("Error: {}", e);
    1
}

fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn print_entry(entry: &Entry, json: bool) -> i32 {
    if json {
        return print_json(entry);
    }
    println!("{}  [{}]  {}", entry.id, entry.growth_stage, entry.title);
    println!("owner:   {}", entry.owner);
    println!("created: {}", entry.created_at.to_rfc3339());
    println!("updated: {}", entry.updated_at.to_rfc3339());
    println!();
    println!("{}", entry.content);
    0
}

fn print_entries(entries: &[Entry], json: bool) -> i32 {
    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No entries.");
        return 0;
    }
    println!("{:<36}  {:<9}  {:<20}  {}", "ID", "STAGE", "UPDATED", "TITLE");
    println!("{}", "-".repeat(80));
    for entry in entries {
        println!(
            "{:<36}  {:<9}  {:<20}  {}",
            entry.id,
            entry.growth_stage,
            entry.updated_at.format("%Y-%m-%d %H:%M:%S"),
            entry.title
        );
    }
    0
}

fn print_links(links: &[Link], json: bool) -> i32 {
    if json {
        return print_json(&links);
    }
    if links.is_empty() {
        println!("No links.");
        return 0;
    }
    println!("{:<36}  {:<36}  {}", "SOURCE", "TARGET", "CREATED");
    println!("{}", "-".repeat(96));
    for link in links {
        println!(
            "{:<36}  {:<36}  {}",
            link.source_id,
            link.target_id,
            link.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    0
}

/// Open the store and run one garden command to completion.
fn run_garden<F, Fut>(config: &MossConfig, command: F) -> i32
where
    F: FnOnce(MossApi, CallContext) -> Fut,
    Fut: Future<Output = i32>,
{
    let api = match open_api(config) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            return 1;
        }
    };
    rt.block_on(command(api, config.call_context()))
}

async fn cmd_entry(api: &MossApi, ctx: &CallContext, action: EntryAction, json: bool) -> i32 {
    match action {
        EntryAction::Create { owner, title, content, stage } => {
            match api.create_entry(ctx, &owner, &title, &content, &stage).await {
                Ok(entry) => print_entry(&entry, json),
                Err(e) => fail(e),
            }
        }
        EntryAction::Get { id, requester } => match api.get_entry_with_links(ctx, &id, &requester).await {
            Ok(view) if json => print_json(&view),
            Ok(view) => {
                let code = print_entry(&view.entry, false);
                println!();
                println!("links out: {}", view.link_count);
                code
            }
            Err(e) => fail(e),
        },
        EntryAction::Update { id, owner, title, content, stage } => {
            match api.update_entry(ctx, &id, &owner, &title, &content, &stage).await {
                Ok(entry) => print_entry(&entry, json),
                Err(e) => fail(e),
            }
        }
        EntryAction::Delete { id, requester } => match api.delete_entry(ctx, &id, &requester).await {
            Ok(()) => {
                println!("Deleted entry {}", id);
                0
            }
            Err(e) => fail(e),
        },
        EntryAction::List { owner, since } => {
            let result = match since {
                Some(since) => api.list_entries_since(ctx, &owner, since).await,
                None => api.list_entries(ctx, &owner).await,
            };
            match result {
                Ok(entries) => print_entries(&entries, json),
                Err(e) => fail(e),
            }
        }
    }
}

async fn cmd_link(api: &MossApi, ctx: &CallContext, action: LinkAction, json: bool) -> i32 {
    match action {
        LinkAction::Create { source, target, owner } => {
            match api.create_link(ctx, &source, &target, &owner).await {
                Ok(link) if json => print_json(&link),
                Ok(link) => {
                    println!("Linked {} -> {}", link.source_id, link.target_id);
                    0
                }
                Err(e) => fail(e),
            }
        }
        LinkAction::Delete { source, target, requester } => {
            match api.delete_link(ctx, &source, &target, &requester).await {
                Ok(()) => {
                    println!("Unlinked {} -> {}", source, target);
                    0
                }
                Err(e) => fail(e),
            }
        }
        LinkAction::List { entry, incoming } => {
            let result = if incoming {
                api.list_links_by_target(ctx, &entry).await
            } else {
                api.list_links_by_source(ctx, &entry).await
            };
            match result {
                Ok(links) => print_links(&links, json),
                Err(e) => fail(e),
            }
        }
        LinkAction::Count { entry, incoming } => {
            let result = if incoming {
                api.count_links_by_target(ctx, &entry).await
            } else {
                api.count_links_by_source(ctx, &entry).await
            };
            match result {
                Ok(count) if json => print_json(&serde_json::json!({ "entry": entry, "count": count })),
                Ok(count) => {
                    println!("{}", count);
                    0
                }
                Err(e) => fail(e),
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = moss::logging::init(&config.log_level) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let json = cli.json;
    let code = match cli.command {
        Commands::Mcp => moss::mcp::run_mcp_server(config),
        Commands::Entry { action } => {
            run_garden(&config, |api, ctx| async move { cmd_entry(&api, &ctx, action, json).await })
        }
        Commands::Link { action } => {
            run_garden(&config, |api, ctx| async move { cmd_link(&api, &ctx, action, json).await })
        }
    };
    std::process::exit(code);
}
