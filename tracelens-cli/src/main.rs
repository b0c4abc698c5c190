use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::json;

use tracelens_core::analysis::{Analysis, SOURCE_KEY};
use tracelens_core::config::Config;
use tracelens_core::memory::{Document, SearchResult, StoreInfo};
use tracelens_core::retrieval::TEXT_KEY;

mod client;

use client::Client;

const VALID_SECTIONS: &[&str] = &["server", "index", "embedding", "generation", "analysis"];

#[derive(Parser)]
#[command(name = "tracelens-cli", about = "Client for the tracelens stack trace service")]
struct Cli {
    /// Base URL of the tracelens server
    #[arg(long, default_value = "http://127.0.0.1:8000", global = true)]
    server: String,

    /// Path to the config file (used by `config` subcommands)
    #[arg(long, default_value = "tracelens.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index one document
    Index {
        /// Document text
        text: String,
        /// Value for the `source` metadata field
        #[arg(long)]
        source: Option<String>,
    },
    /// Index every document in a JSON Lines file
    IndexFile {
        /// File with one `{"text": ..., "metadata": {...}}` object per line
        path: PathBuf,
    },
    /// Find stored documents similar to a text
    Search {
        text: String,
        /// Number of results
        #[arg(short, default_value_t = 5)]
        k: i64,
    },
    /// Analyze a stack trace read from a file, or from stdin with `-`
    Analyze {
        path: String,
        /// Do not ground the analysis in similar stored errors
        #[arg(long)]
        no_retrieval: bool,
    },
    /// Show store size and dimension
    Info,
    /// Remove every stored document
    Clear,
    /// Check that the server is up
    Health,
    /// Inspect the local configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective config as TOML
    Show {
        /// Optional section name to display
        section: Option<String>,
    },
    /// Validate the config file
    Validate,
}

// ── Wire types ──────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct IndexItem {
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Document>,
}

#[derive(Deserialize)]
struct IndexResponse {
    id: usize,
}

#[derive(Deserialize)]
struct IndexBatchResponse {
    count: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct MessageResponse {
    message: String,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let result = run(cli).await;

    match result {
        Ok(output) => print!("{output}"),
        Err(msg) => {
            eprintln!("Error: {msg}");
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<String, String> {
    let server = cli.server;
    let connect = || Client::new(&server);
    match cli.command {
        Command::Config { action } => match action {
            ConfigAction::Show { section } => show_config(&cli.config, section.as_deref()),
            ConfigAction::Validate => validate_config(&cli.config),
        },
        Command::Index { text, source } => {
            let metadata = source.map(|s| {
                let mut doc = Document::new();
                doc.insert(SOURCE_KEY.to_string(), json!(s));
                doc
            });
            let response: IndexResponse =
                connect()?.post("/index", &IndexItem { text, metadata }).await?;
            Ok(format!("Indexed document {}\n", response.id))
        }
        Command::IndexFile { path } => {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
            let items = parse_jsonl(&contents)?;
            let response: IndexBatchResponse =
                connect()?.post("/index/batch", &json!({ "items": items })).await?;
            Ok(format!("Indexed {} documents\n", response.count))
        }
        Command::Search { text, k } => {
            let response: SearchResponse =
                connect()?.post("/search", &json!({ "text": text, "k": k })).await?;
            Ok(format_results(&response.results))
        }
        Command::Analyze { path, no_retrieval } => {
            let stack_trace = read_input(&path)?;
            let analysis: Analysis = connect()?
                .post(
                    "/analyze",
                    &json!({ "stack_trace": stack_trace, "use_retrieval": !no_retrieval }),
                )
                .await?;
            Ok(format_analysis(&analysis))
        }
        Command::Info => {
            let info: StoreInfo = connect()?.get("/store/info").await?;
            Ok(format!("size:      {}\ndimension: {}\n", info.size, info.dimension))
        }
        Command::Clear => {
            let response: MessageResponse = connect()?.post("/store/clear", &json!({})).await?;
            Ok(format!("{}\n", response.message))
        }
        Command::Health => {
            let health: HealthResponse = connect()?.get("/health").await?;
            Ok(format!("{} (version {})\n", health.status, health.version))
        }
    }
}

/// Parse JSON Lines into index items. Blank lines are skipped.
fn parse_jsonl(contents: &str) -> Result<Vec<IndexItem>, String> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<IndexItem>(line).map_err(|e| format!("line {}: {e}", i + 1))
        })
        .collect()
}

fn read_input(path: &str) -> Result<String, String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("failed to read stdin: {e}"))?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("failed to read {path}: {e}"))
    }
}

fn metadata_str<'a>(metadata: &'a Document, key: &str) -> &'a str {
    metadata.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

fn format_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No similar documents.\n".to_string();
    }
    let mut out = String::new();
    for (rank, result) in results.iter().enumerate() {
        let source = match metadata_str(&result.metadata, SOURCE_KEY) {
            "" => String::new(),
            s => format!(" [{s}]"),
        };
        out.push_str(&format!(
            "{}. #{} score={:.3}{source} {}\n",
            rank + 1,
            result.id,
            result.score,
            metadata_str(&result.metadata, TEXT_KEY)
        ));
    }
    out
}

fn format_analysis(analysis: &Analysis) -> String {
    let mut out = format!("{}\n", analysis.analysis.trim_end());
    if analysis.context_used {
        out.push_str("\nSimilar errors:\n");
        out.push_str(&format_results(&analysis.similar_errors));
    }
    out
}

fn read_config_file(config_path: &Path) -> Result<String, String> {
    if !config_path.exists() {
        return Err(format!(
            "Config file not found: {}. Use --config to specify the path.",
            config_path.display()
        ));
    }
    std::fs::read_to_string(config_path).map_err(|e| format!("Config error: {e}"))
}

fn show_config(config_path: &Path, section: Option<&str>) -> Result<String, String> {
    let contents = read_config_file(config_path)?;
    let config = Config::parse(&contents)?;
    let full = config.to_toml_string()?;

    let Some(name) = section else {
        return Ok(full);
    };
    if !VALID_SECTIONS.contains(&name) {
        return Err(format!(
            "Unknown section '{name}'. Valid sections: {}",
            VALID_SECTIONS.join(", ")
        ));
    }
    let table: toml::Table = toml::from_str(&full).map_err(|e| format!("Config error: {e}"))?;
    let mut wrapper = toml::Table::new();
    wrapper.insert(
        name.to_string(),
        table
            .get(name)
            .cloned()
            .unwrap_or_else(|| toml::Value::Table(toml::Table::new())),
    );
    toml::to_string_pretty(&wrapper).map_err(|e| format!("Config error: {e}"))
}

fn validate_config(config_path: &Path) -> Result<String, String> {
    let contents = read_config_file(config_path)?;
    Config::parse(&contents)?;
    Ok("Configuration is valid.\n".to_string())
}
