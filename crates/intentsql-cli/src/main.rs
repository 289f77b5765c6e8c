use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use intentsql_core::{CollectedQuery, Config, GeneratedQuery, SchemaInfo};
use intentsql_engine::{Categorization, ChangeCategorizer, ChangeKind};
use intentsql_incremental::{queries, IntentSqlDatabase, QueryCache};

mod discover;

const DEFAULT_CONFIG: &str = "intentsql.toml";

/// IntentSQL - static analysis of natural-language query sites
#[derive(Parser)]
#[command(name = "intentsql")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: intentsql.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default intentsql.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Reconstruct tables and columns from the schema sources
    Schema {
        /// Write the schema model as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List query sites found in the configured sources
    Collect {
        /// Write collected queries as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decide which query sites need generation
    Plan {
        /// Previously generated queries (JSON array or object keyed by id)
        #[arg(short, long)]
        previous: Option<PathBuf>,

        /// Write the plan as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect or maintain the generated-query cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show entry count and size on disk
    Stats,
    /// Remove expired and unreadable entries
    Evict,
    /// Remove every entry
    Clear,
}

/// Prior generation output, in either of the accepted layouts
#[derive(Deserialize)]
#[serde(untagged)]
enum PreviousOutput {
    List(Vec<GeneratedQuery>),
    ById(HashMap<String, GeneratedQuery>),
}

impl PreviousOutput {
    fn into_map(self) -> HashMap<String, GeneratedQuery> {
        match self {
            PreviousOutput::List(list) => list.into_iter().map(|q| (q.id.clone(), q)).collect(),
            PreviousOutput::ById(map) => map,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Plan<'a> {
    #[serde(flatten)]
    categorization: &'a Categorization,
    /// Ids among changed and new that the cache can already answer
    cached: Vec<&'a str>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    if let Commands::Init { force } = &cli.command {
        return init_command(cli.config.as_deref().unwrap_or(Path::new(DEFAULT_CONFIG)), *force);
    }

    let config = load_config(cli.config.as_deref(), cli.verbose)?;

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Schema { output } => schema_command(&config, output.as_deref(), cli.verbose),
        Commands::Collect { output } => collect_command(&config, output.as_deref(), cli.verbose),
        Commands::Plan { previous, output } => {
            plan_command(&config, previous.as_deref(), output.as_deref(), cli.verbose)
        }
        Commands::Cache { action } => cache_command(&config, action),
    }
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    let config = if let Some(path) = path {
        Config::from_file(path).with_context(|| format!("Failed to load {}", path.display()))?
    } else if Path::new(DEFAULT_CONFIG).exists() {
        Config::from_file(Path::new(DEFAULT_CONFIG))?
    } else {
        if verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    Ok(config)
}

/// Init command - write the default configuration
fn init_command(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    Config::default().save_to_file(path)?;
    println!("{} {}", "Wrote".green(), path.display());
    Ok(())
}

/// Salsa inputs for the given files; unreadable files are skipped
fn load_inputs(db: &IntentSqlDatabase, config: &Config, files: &[PathBuf]) -> Vec<queries::SourceInput> {
    files
        .iter()
        .filter_map(|path| match std::fs::read_to_string(path) {
            Ok(contents) => {
                let display = discover::relative_to(path, &config.project_root);
                Some(queries::SourceInput::new(db, display, contents))
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable source");
                None
            }
        })
        .collect()
}

fn analyze_schema(db: &IntentSqlDatabase, config: &Config, config_input: queries::ConfigInput) -> SchemaInfo {
    let roots: Vec<PathBuf> = config.schema.paths.iter().map(|p| config.resolve(p)).collect();
    let files = discover::source_files(&roots, &config.queries);
    let inputs = load_inputs(db, config, &files);

    queries::analyze_schema_files(db, &inputs, config_input)
}

fn collect_queries(db: &IntentSqlDatabase, config: &Config, config_input: queries::ConfigInput) -> Vec<CollectedQuery> {
    let roots: Vec<PathBuf> = config.queries.include.iter().map(|p| config.resolve(p)).collect();
    let files = discover::source_files(&roots, &config.queries);
    let inputs = load_inputs(db, config, &files);

    queries::collect_all_queries(db, &inputs, config_input)
}

fn write_json<T: Serialize>(value: &T, output: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(output, json).with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(())
}

/// Schema command - print or save the reconstructed tables
fn schema_command(config: &Config, output: Option<&Path>, verbose: bool) -> Result<()> {
    let db = IntentSqlDatabase::default();
    let config_input = queries::ConfigInput::new(&db, config.clone());

    if verbose {
        eprintln!("{}", "Analyzing schema sources...".cyan());
    }

    let schema = analyze_schema(&db, config, config_input);

    if let Some(output) = output {
        write_json(&schema, output)?;
        eprintln!("{} {}", "Schema saved to:".green(), output.display());
    }

    if schema.is_empty() {
        println!("{}", "No tables found".yellow());
        return Ok(());
    }

    for table in &schema.tables {
        let key = table
            .primary_key
            .as_ref()
            .map(|cols| format!(" (primary key: {})", cols.join(", ")))
            .unwrap_or_default();
        println!("{}{}", table.name.bold(), key.dimmed());

        for column in &table.columns {
            let mut details = vec![column.column_type.clone()];
            if !column.nullable {
                details.push("not null".to_string());
            }
            if let Some(constraints) = &column.constraints {
                details.extend(constraints.iter().map(|c| c.to_lowercase()));
            }
            if let Some(default) = &column.default_value {
                details.push(format!("default {}", default));
            }
            if let Some(reference) = &column.references {
                details.push(format!("-> {}.{}", reference.table, reference.column));
            }

            println!("  {} {}", column.physical_name().green(), details.join(", ").dimmed());
        }
    }

    Ok(())
}

/// Collect command - print or save query sites
fn collect_command(config: &Config, output: Option<&Path>, verbose: bool) -> Result<()> {
    let db = IntentSqlDatabase::default();
    let config_input = queries::ConfigInput::new(&db, config.clone());

    if verbose {
        eprintln!("{}", "Collecting query sites...".cyan());
    }

    let collected = collect_queries(&db, config, config_input);

    if let Some(output) = output {
        write_json(&collected, output)?;
        eprintln!("{} {}", "Queries saved to:".green(), output.display());
    }

    for query in &collected {
        let returns = query.return_type.as_deref().unwrap_or("unknown");
        println!("{} {}", query.location.to_string().dimmed(), query.intent.bold());
        let short_id = query.id.get(..12).unwrap_or(&query.id);
        println!("    {} {}  {} {}", "id".dimmed(), short_id, "returns".dimmed(), returns);
    }

    println!();
    println!("Found {} query sites", collected.len().to_string().bold());
    Ok(())
}

/// Plan command - categorize current sites against prior output
fn plan_command(config: &Config, previous: Option<&Path>, output: Option<&Path>, verbose: bool) -> Result<()> {
    let db = IntentSqlDatabase::default();
    let config_input = queries::ConfigInput::new(&db, config.clone());

    let existing = match previous {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let previous: PreviousOutput = serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            previous.into_map()
        }
        None => HashMap::new(),
    };

    if verbose {
        eprintln!("{} {} prior queries", "Loaded".cyan(), existing.len());
    }

    let collected = collect_queries(&db, config, config_input);
    let categorization = ChangeCategorizer::categorize(&collected, &existing);

    let cache = QueryCache::from_config(config);
    let cached: Vec<&str> = categorization
        .needs_generation()
        .filter(|q| cache.has(&q.id, &q.intent, q.params.as_ref()))
        .map(|q| q.id.as_str())
        .collect();

    if let Some(output) = output {
        let plan = Plan {
            categorization: &categorization,
            cached: cached.clone(),
        };
        write_json(&plan, output)?;
        eprintln!("{} {}", "Plan saved to:".green(), output.display());
    }

    print_plan(&categorization, &cached);
    Ok(())
}

fn print_plan(categorization: &Categorization, cached: &[&str]) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Generation Plan".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    for query in categorization.needs_generation() {
        let kind = categorization.kind_of(&query.id).unwrap_or(ChangeKind::New);
        let label = match kind {
            ChangeKind::Changed => kind.to_string().yellow(),
            _ => kind.to_string().cyan(),
        };
        let hit = if cached.contains(&query.id.as_str()) { " (cached)".dimmed() } else { "".normal() };
        println!("  {:<9} {}{}", label, query.intent, hit);
    }

    for id in &categorization.removed {
        println!("  {:<9} {}", "removed".red(), id);
    }

    println!();
    println!(
        "{} unchanged, {} changed, {} new, {} removed",
        categorization.valid.len().to_string().green(),
        categorization.changed.len().to_string().yellow(),
        categorization.invalid.len().to_string().cyan(),
        categorization.removed.len().to_string().red(),
    );

    if !categorization.has_changes() {
        println!("{}", "✓ Everything is up to date".green());
    }
}

/// Cache command - stats, eviction and clearing
fn cache_command(config: &Config, action: CacheAction) -> Result<()> {
    let cache = QueryCache::from_config(config);

    if !cache.is_enabled() {
        println!("{}", "Cache is disabled".yellow());
        return Ok(());
    }

    match action {
        CacheAction::Stats => {
            let stats = cache.stats();
            println!("{} {}", "Directory:".bold(), cache.dir().display());
            println!("{} {}", "Entries:".bold(), stats.count);
            println!("{} {} bytes", "Size:".bold(), stats.total_bytes);
            println!("{} {}h", "TTL:".bold(), cache.ttl().as_secs() / 3600);
        }
        CacheAction::Evict => {
            let removed = cache.evict_expired();
            println!("{} {} entries", "Evicted".green(), removed);
        }
        CacheAction::Clear => {
            cache.clear();
            println!("{}", "Cache cleared".green());
        }
    }

    Ok(())
}
