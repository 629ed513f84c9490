use clap::{Parser, Subcommand};
use colored::Colorize;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use querycraft_core::{
    apply_edits, validate_transformation_kinds, Config, QueryEdit, QueryModel, QueryModelUpdate,
    QueryRecord, TransformationStep,
};

/// QueryCraft - inspect and edit query records
#[derive(Parser)]
#[command(name = "querycraft")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: querycraft.toml)
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
    /// Show a summary of a query record
    Show {
        /// Path to the query record (JSON)
        record: PathBuf,
    },

    /// Apply an edit script to a query record
    Edit {
        /// Path to the query record (JSON)
        record: PathBuf,

        /// Path to the edit script (JSON array of edits)
        #[arg(short, long)]
        script: PathBuf,

        /// Write the resulting record here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Strictly check transformation types in a query record
    Validate {
        /// Path to the query record (JSON)
        record: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    // Load config if specified
    let config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else if Path::new("querycraft.toml").exists() {
        Config::from_file(Path::new("querycraft.toml"))?
    } else {
        tracing::debug!("no config file found, using defaults");
        Config::default()
    };

    tracing::debug!(strict = config.transformations.strict, "configuration loaded");

    match cli.command {
        Commands::Show { record } => show_command(&config, &record),
        Commands::Edit { record, script, output } => {
            edit_command(&config, &record, &script, output.as_deref())
        }
        Commands::Validate { record } => validate_command(&record),
    }
}

/// Load a record, applying strict validation when configured
fn load_record(config: &Config, path: &Path) -> Result<QueryRecord> {
    tracing::info!(path = %path.display(), "loading query record");

    let json = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let record = QueryRecord::from_json(&json)?;

    if config.transformations.strict {
        if let Some(transformations) = &record.transformations {
            validate_transformation_kinds(transformations)?;
        }
    }

    Ok(record)
}

/// Show command - print a summary of the query
fn show_command(config: &Config, path: &Path) -> Result<()> {
    let model = QueryModel::from_record(&load_record(config, path)?);
    print_model_summary(&model);
    Ok(())
}

/// Edit command - apply an edit script and print each diff
fn edit_command(
    config: &Config,
    path: &Path,
    script_path: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let model = QueryModel::from_record(&load_record(config, path)?);

    let script = std::fs::read_to_string(script_path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", script_path.display(), e))?;
    let edits = QueryEdit::script_from_json(&script)?;

    if config.transformations.strict {
        for (i, edit) in edits.iter().enumerate() {
            edit.validate()
                .map_err(|e| anyhow::anyhow!("Edit #{} rejected: {}", i + 1, e))?;
        }
    }

    tracing::info!(edits = edits.len(), "applying edit script");
    let (model, updates) = apply_edits(&model, &edits);

    if config.output.show_diffs {
        for update in &updates {
            print_update(update)?;
        }
    }

    let record = model.to_record();
    let json = if config.output.pretty {
        record.to_json_pretty()?
    } else {
        record.to_json()?
    };

    match output {
        Some(output) => {
            std::fs::write(output, json)?;
            eprintln!("{} {}", "Record saved to:".green(), output.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Validate command - strict transformation type check
fn validate_command(path: &Path) -> Result<()> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let record = QueryRecord::from_json(&json)?;

    let transformations = record.transformations.unwrap_or_default();
    match validate_transformation_kinds(&transformations) {
        Ok(()) => {
            println!(
                "{} {} transformation(s) recognised",
                "✓".green(),
                transformations.len()
            );
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            std::process::exit(1);
        }
    }
}

fn print_update(update: &QueryModelUpdate) -> Result<()> {
    let diff = serde_json::to_string(&update.diff)?;
    eprintln!("{} {}", format!("{}:", update.kind).cyan(), diff);
    Ok(())
}

fn print_model_summary(model: &QueryModel) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Query Summary".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    let id = model.id().map(|id| id.to_string()).unwrap_or_else(|| "(unsaved)".to_string());
    let base_table = model
        .base_table()
        .map(|t| t.to_string())
        .unwrap_or_else(|| "(none)".to_string());

    println!("{} {}", "Id:".bold(), id);
    println!("{} {}", "Name:".bold(), model.name().unwrap_or("(untitled)"));
    println!("{} {}", "Base table:".bold(), base_table);
    println!();

    println!("{} {}", "Columns:".bold(), model.initial_columns().len());
    for (i, column) in model.initial_columns().iter().enumerate() {
        if column.display_name.is_some() {
            println!("  {}. {} ({})", i + 1, column.label().green(), column.alias);
        } else {
            println!("  {}. {}", i + 1, column.alias.green());
        }
    }
    println!();

    println!("{} {}", "Transformations:".bold(), model.transformation_models().len());
    for (i, step) in model.transformation_models().iter().enumerate() {
        match step.as_ref() {
            TransformationStep::Filter(_) => {
                println!("  {}. {}", i + 1, "filter".yellow());
            }
            TransformationStep::Summarization(summarization) => {
                let outputs = summarization.output_aliases();
                if outputs.is_empty() {
                    println!("  {}. {}", i + 1, "summarization".yellow());
                } else {
                    println!("  {}. {} -> {}", i + 1, "summarization".yellow(), outputs.join(", "));
                }
            }
        }
    }
    println!();
}
