//! strudel: inspect and tidy the ambient pattern file from the terminal
//!
//! - `show`: the current pattern, with analysis unless `--no-metadata`
//! - `info`: analysis only
//! - `suggest`: tuning ideas for a mood
//! - `validate`: check a candidate file (dialect text or JSON)
//! - `format`: normalize the file through parse, validate and render

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::{Value, json};
use strudel_core::{Error, Mood, Pattern, PatternStore, analyze, dialect, suggest, validate};

mod report;

/// Inspect the ambient pattern file
#[derive(Parser)]
#[command(name = "strudel")]
#[command(about = "Inspect, validate and format the ambient pattern file")]
#[command(version)]
struct Cli {
    /// Path to the pattern file
    #[arg(short, long, global = true, env = "STRUDEL_PATTERN_FILE", default_value = "patterns.js")]
    file: PathBuf,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current pattern
    Show {
        /// Skip the analysis section
        #[arg(long)]
        no_metadata: bool,
    },

    /// Show the pattern analysis
    Info,

    /// Suggest changes toward a mood (darker, brighter, spacious, dense, minimal)
    Suggest { mood: Mood },

    /// Check a candidate pattern file without touching the live one
    Validate { candidate: PathBuf },

    /// Rewrite the pattern in canonical layout
    Format {
        /// Description comment for the rewritten file
        #[arg(short, long)]
        description: Option<String>,

        /// Write the result back instead of printing it
        #[arg(long)]
        write: bool,
    },
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

/// Candidate text is JSON when it decodes as a JSON object, dialect otherwise.
fn decode_candidate(text: &str) -> Result<Pattern, Error> {
    match serde_json::from_str::<Value>(text) {
        Ok(record @ Value::Object(_)) => Ok(validate(&record)?),
        _ => {
            let record = dialect::parse(text)?;
            Ok(validate(&record)?)
        }
    }
}

async fn cmd_show(store: &PatternStore, metadata: bool, format: OutputFormat) -> Result<()> {
    let raw = store.read().await?;
    let pattern = validate(&dialect::parse(&raw)?)?;
    let analysis = metadata.then(|| analyze(&pattern));
    let last_edited = dialect::last_edited(&raw);

    match format {
        OutputFormat::Text => print!(
            "{}",
            report::pattern_report(&pattern, analysis.as_ref(), last_edited.as_deref())
        ),
        OutputFormat::Json => {
            let mut out = json!({ "pattern": pattern });
            if let Some(analysis) = analysis {
                out["metadata"] = serde_json::to_value(analysis)?;
            }
            if let Some(stamp) = last_edited {
                out["last_edited"] = json!(stamp);
            }
            print_json(&out)?;
        }
    }
    Ok(())
}

async fn cmd_info(store: &PatternStore, format: OutputFormat) -> Result<()> {
    let analysis = analyze(&store.load().await?);
    match format {
        OutputFormat::Text => print!("{}", report::info_report(&analysis)),
        OutputFormat::Json => print_json(&analysis)?,
    }
    Ok(())
}

async fn cmd_suggest(store: &PatternStore, mood: Mood, format: OutputFormat) -> Result<()> {
    let suggestions = suggest(&store.load().await?, mood);
    match format {
        OutputFormat::Text => print!("{}", report::suggestions_report(&suggestions)),
        OutputFormat::Json => print_json(&suggestions)?,
    }
    Ok(())
}

async fn cmd_validate(candidate: &Path, format: OutputFormat) -> Result<bool> {
    let text = tokio::fs::read_to_string(candidate)
        .await
        .with_context(|| format!("Failed to read {}", candidate.display()))?;
    let result = decode_candidate(&text);

    match format {
        OutputFormat::Text => print!(
            "{}",
            report::validation_report(&candidate.display().to_string(), &result)
        ),
        OutputFormat::Json => {
            let out = match &result {
                Ok(_) => json!({ "valid": true }),
                Err(err) => json!({ "valid": false, "error": err.to_string(), "kind": err.kind() }),
            };
            print_json(&out)?;
        }
    }
    Ok(result.is_ok())
}

async fn cmd_format(
    store: &PatternStore,
    description: Option<String>,
    write: bool,
    format: OutputFormat,
) -> Result<()> {
    let raw = store.read().await?;
    let pattern = validate(&dialect::parse(&raw)?)?;
    let description = description
        .or_else(|| dialect::description(&raw))
        .unwrap_or_else(|| "Formatted pattern".to_string());
    let text = dialect::render(&pattern, &description);

    if write {
        store.write(&text).await?;
    }

    match (format, write) {
        (OutputFormat::Text, true) => println!(
            "{} Rewrote {} (previous version in {})",
            "✓".green(),
            store.path().display(),
            store.backup_path().display()
        ),
        (OutputFormat::Text, false) => print!("{}", text),
        (OutputFormat::Json, _) => print_json(&json!({ "written": write, "text": text }))?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let store = PatternStore::new(cli.file);

    match cli.command {
        Commands::Show { no_metadata } => cmd_show(&store, !no_metadata, cli.format).await?,
        Commands::Info => cmd_info(&store, cli.format).await?,
        Commands::Suggest { mood } => cmd_suggest(&store, mood, cli.format).await?,
        Commands::Validate { candidate } => {
            if !cmd_validate(&candidate, cli.format).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Format { description, write } => {
            cmd_format(&store, description, write, cli.format).await?
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["strudel", "--format", "json", "suggest", "spacious"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Suggest { mood: Mood::Spacious }));

        let cli = Cli::try_parse_from(["strudel", "show", "--no-metadata", "-f", "p.js"]).unwrap();
        assert_eq!(cli.file, PathBuf::from("p.js"));
        assert!(matches!(cli.command, Commands::Show { no_metadata: true }));

        assert!(Cli::try_parse_from(["strudel", "suggest", "happy"]).is_err());
    }

    #[test]
    fn test_decode_candidate_json_and_dialect() {
        let json = r#"{"bpm": 40, "chords": {"progression": [["C3"]], "interval": "4m", "duration": "4m", "filter": 500},
            "melody": {"notes": ["G4"], "interval": "2m", "duration": "1m", "waveform": "sine", "delay": 0.3}}"#;
        assert_eq!(decode_candidate(json).unwrap().bpm, 40);

        let text = "({bpm: 40, chords:{progression:[['C3']],interval:'4m',duration:'4m',filter:500}, melody:{notes:['G4'],interval:'2m',duration:'1m',waveform:'sine',delay:0.3}})";
        assert_eq!(decode_candidate(text).unwrap().bpm, 40);

        assert!(decode_candidate("[1, 2]").is_err());
    }

    #[tokio::test]
    async fn test_format_write_normalizes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.js");
        let messy = "// Hand edited\n({bpm: 40, chords:{progression:[['C3']],interval:'4m',duration:'4m',filter:500,}, melody:{notes:['G4'],interval:'2m',duration:'1m',waveform:'sine',delay:0.3,},})";
        std::fs::write(&path, messy).unwrap();

        let store = PatternStore::new(&path);
        cmd_format(&store, None, true, OutputFormat::Json).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with(dialect::HEADER));
        assert_eq!(dialect::description(&raw).as_deref(), Some("Hand edited"));
        assert!(raw.contains("        progression: [\n            ['C3'],\n        ],"));
        assert_eq!(std::fs::read_to_string(store.backup_path()).unwrap(), messy);
    }
}
