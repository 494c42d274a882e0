//! CLI entry point for the recommendation engine.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use lex_transform::{EngineConfig, ExecutionResult, RecommendationEngine, split_recommendations};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Apply free-text cleaning recommendations to a CSV dataset",
    long_about = "Matches each recommendation line against a fixed set of transform rules \
                  and applies the matches to the dataset in order.\n\n\
                  EXAMPLES:\n  \
                  # Apply recommendations and write the result\n  \
                  lex-transform -i data.csv -r recommendations.txt -o cleaned.csv\n\n  \
                  # Preview which rules would fire\n  \
                  lex-transform -i data.csv -r recommendations.txt --dry-run\n\n  \
                  # Machine-readable result\n  \
                  lex-transform -i data.csv -r recommendations.txt --json"
)]
struct Args {
    /// Path to the CSV file to transform
    #[arg(short, long)]
    input: String,

    /// Text file with one recommendation per line
    ///
    /// Numbering, bullets and markdown emphasis are stripped.
    #[arg(short, long)]
    recommendations: String,

    /// Where to write the transformed CSV
    #[arg(short, long)]
    output: Option<String>,

    /// Print the execution result as JSON on stdout
    ///
    /// Disables all logs so stdout only carries the JSON document.
    #[arg(long)]
    json: bool,

    /// Show how each recommendation would be handled without applying it
    #[arg(long)]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Only show warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// IQR multiplier used by `flag outliers`
    #[arg(long, default_value = "1.5")]
    outlier_iqr_multiplier: f64,
}

/// Initialize the tracing subscriber.
///
/// Logging stays off with `--json` so stdout only holds the JSON document.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let text = std::fs::read_to_string(&args.recommendations)
        .with_context(|| format!("Failed to read recommendations from {}", args.recommendations))?;
    let recommendations = split_recommendations(&text);
    info!("Loaded {} recommendations", recommendations.len());

    info!("Loading dataset from: {}", args.input);
    let data = load_csv_with_fallbacks(&args.input)?;
    info!("Dataset loaded successfully: {:?}", data.shape());

    let config = EngineConfig::builder()
        .outlier_iqr_multiplier(args.outlier_iqr_multiplier)
        .build()?;
    let engine = RecommendationEngine::builder().config(config).build()?;

    if args.dry_run {
        return run_dry_run(&engine, &args, &data, &recommendations);
    }

    let (mut output, result) = match engine.apply(&data, &recommendations) {
        Ok(applied) => applied,
        Err(e) => {
            error!("Batch aborted: {}", e);
            return Err(anyhow!("Batch aborted: {}", e));
        }
    };

    if let Some(ref path) = args.output {
        write_csv(&mut output, path)?;
        info!("Dataset saved: {}", path);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_summary(&result, &args);
    Ok(())
}

/// Print the classification of every recommendation.
///
/// Uses `println!` because this listing is the output of `--dry-run`, not a
/// log line.
fn run_dry_run(
    engine: &RecommendationEngine,
    args: &Args,
    data: &DataFrame,
    recommendations: &[String],
) -> Result<()> {
    let classified = engine.classify(data, recommendations);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&classified)?);
        return Ok(());
    }

    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - {} rows x {} columns", data.height(), data.width());
    println!("{}\n", "=".repeat(80));

    for (i, entry) in classified.iter().enumerate() {
        match (&entry.rule, &entry.kind) {
            (Some(rule), Some(kind)) => {
                let status = entry
                    .validation_error
                    .as_deref()
                    .map_or_else(|| "ok".to_string(), |e| format!("invalid: {}", e));
                println!(
                    "{:>3}. [{} / {}] {} ({})",
                    i + 1,
                    rule,
                    kind,
                    entry.recommendation,
                    status
                );
                if !entry.params.is_empty() {
                    println!("       params: {}", entry.params.join(", "));
                }
            }
            _ => println!("{:>3}. [skipped] {}", i + 1, entry.recommendation),
        }
    }

    println!("\n{}", "=".repeat(80));
    println!("Validation runs against the input dataset; renames and new columns");
    println!("from earlier recommendations are not visible here.");
    println!("{}", "=".repeat(80));

    Ok(())
}

fn print_summary(result: &ExecutionResult, args: &Args) {
    println!();
    println!("{}", "=".repeat(80));
    println!("TRANSFORM COMPLETE");
    println!("{}", "=".repeat(80));
    println!();
    println!(
        "Input:  {} ({} rows x {} columns)",
        args.input, result.rows_before, result.columns_before
    );
    match args.output {
        Some(ref path) => println!(
            "Output: {} ({} rows x {} columns)",
            path, result.rows_after, result.columns_after
        ),
        None => println!(
            "Output: not written ({} rows x {} columns)",
            result.rows_after, result.columns_after
        ),
    }
    println!("Duration: {}ms", result.duration_ms);
    println!();

    println!("Applied ({}):", result.applied.len());
    for text in &result.applied {
        println!("  + {}", text);
    }
    println!("Skipped ({}):", result.skipped.len());
    for text in &result.skipped {
        println!("  ~ {}", text);
    }
    println!("Errors ({}):", result.errors.len());
    for failed in &result.errors {
        println!("  ! {}", failed);
    }
    println!();
}

fn write_csv(df: &mut DataFrame, path: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path).with_context(|| format!("Failed to create {}", path))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)?;
    Ok(())
}

/// Load a CSV, retrying with looser settings when the first attempt fails.
fn load_csv_with_fallbacks(path: &str) -> Result<DataFrame> {
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Standard loading failed: {}", e);
        }
    }

    let content = std::fs::read_to_string(path)?;
    let cleaned = clean_csv_content(&content);
    CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .into_reader_with_file_handle(std::io::Cursor::new(cleaned))
        .finish()
        .map_err(|e| anyhow!("Failed to read {}: {}", path, e))
}

/// Collapse doubled quotes and drop blank lines.
fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
