//! `run`/`check` subcommands: the scriptable conformance-style entry points
//! for driving the engine from a shell or a test harness.

use crate::dataset;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fukurow_sparql::{evaluate_query, EngineConfig, ExecutionResult};
use fukurow_store::QuadStore;
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fukurow-cli", about = "Fukurow SPARQL engine test harness")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Loads a dataset (if given), runs a query against it, and prints the result.
    Run {
        /// Path to a query file, or `-` to read from stdin.
        #[arg(long)]
        query: PathBuf,
        /// Path to a `subject predicate object .`-per-line dataset.
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Parses a query without executing it, reporting the first error found.
    Check {
        /// Path to a query file, or `-` to read from stdin.
        #[arg(long)]
        query: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Outcome of running one [`Command`]: whether it succeeded and the text
/// already printed to stdout/stderr, kept around mainly for tests.
pub struct CommandOutcome {
    pub success: bool,
}

pub fn execute(command: Command) -> Result<CommandOutcome> {
    match command {
        Command::Run { query, data, format } => run(&query, data.as_deref(), format),
        Command::Check { query } => check(&query),
    }
}

fn read_source(path: &std::path::Path) -> Result<String> {
    if path == std::path::Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).context("reading query from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading query file {}", path.display()))
    }
}

fn run(query_path: &std::path::Path, data_path: Option<&std::path::Path>, format: OutputFormat) -> Result<CommandOutcome> {
    let query_text = read_source(query_path)?;

    let store = QuadStore::new();
    if let Some(data_path) = data_path {
        let data_text = std::fs::read_to_string(data_path).with_context(|| format!("reading data file {}", data_path.display()))?;
        let quads = dataset::parse(&data_text).with_context(|| format!("parsing data file {}", data_path.display()))?;
        for (s, p, o) in quads {
            store.add_current(fukurow_core::model::Quad::new(s, p, o))?;
        }
    }

    let cfg = EngineConfig::default();
    let result = evaluate_query(&store, &query_text, &cfg).with_context(|| "evaluating query")?;

    match format {
        OutputFormat::Text => print_text(&result),
        OutputFormat::Json => print_json(&result)?,
    }
    Ok(CommandOutcome { success: true })
}

fn check(query_path: &std::path::Path) -> Result<CommandOutcome> {
    let query_text = read_source(query_path)?;
    match fukurow_sparql::parser::parse(&query_text) {
        Ok(_) => {
            println!("OK");
            Ok(CommandOutcome { success: true })
        }
        Err(e) => {
            eprintln!("{e}");
            Ok(CommandOutcome { success: false })
        }
    }
}

fn print_text(result: &ExecutionResult) {
    match result {
        ExecutionResult::Ask(answer) => println!("{}", if *answer { "true" } else { "false" }),
        ExecutionResult::Construct(quads) => {
            for quad in quads {
                println!(
                    "{} {} {} .",
                    quad.subject.display_string(),
                    quad.predicate.display_string(),
                    quad.object.display_string()
                );
            }
        }
        ExecutionResult::Select { vars, rows } => {
            if vars.is_empty() {
                println!("{} row(s)", rows.len());
                return;
            }
            let header: Vec<&str> = vars.iter().map(|(_, name)| name.as_str()).collect();
            println!("{}", header.join("\t"));
            for row in rows {
                let cells: Vec<String> = vars
                    .iter()
                    .map(|(id, _)| row.get(*id).map(|t| t.display_string()).unwrap_or_default())
                    .collect();
                println!("{}", cells.join("\t"));
            }
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum JsonResult {
    Ask { answer: bool },
    Construct { quads: Vec<String> },
    Select { vars: Vec<String>, rows: Vec<Vec<Option<String>>> },
}

fn print_json(result: &ExecutionResult) -> Result<()> {
    let payload = match result {
        ExecutionResult::Ask(answer) => JsonResult::Ask { answer: *answer },
        ExecutionResult::Construct(quads) => JsonResult::Construct {
            quads: quads
                .iter()
                .map(|q| format!("{} {} {} .", q.subject.display_string(), q.predicate.display_string(), q.object.display_string()))
                .collect(),
        },
        ExecutionResult::Select { vars, rows } => JsonResult::Select {
            vars: vars.iter().map(|(_, name)| name.clone()).collect(),
            rows: rows
                .iter()
                .map(|row| vars.iter().map(|(id, _)| row.get(*id).map(|t| t.display_string())).collect())
                .collect(),
        },
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_parses_as_a_clap_cli() {
        let cli = Cli::try_parse_from(["fukurow-cli", "run", "--query", "q.rq"]).unwrap();
        match cli.command {
            Command::Run { query, data, format } => {
                assert_eq!(query, PathBuf::from("q.rq"));
                assert!(data.is_none());
                assert_eq!(format, OutputFormat::Text);
            }
            _ => panic!("expected Run"),
        }
    }

    #[test]
    fn check_parses_as_a_clap_cli() {
        let cli = Cli::try_parse_from(["fukurow-cli", "check", "--query", "-"]).unwrap();
        match cli.command {
            Command::Check { query } => assert_eq!(query, PathBuf::from("-")),
            _ => panic!("expected Check"),
        }
    }

    #[test]
    fn check_reports_success_for_a_well_formed_query() {
        let dir = std::env::temp_dir().join(format!("fukurow-cli-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ok.rq");
        std::fs::write(&path, "SELECT ?s WHERE { ?s <http://ex/p> ?o }").unwrap();

        let outcome = check(&path).unwrap();
        assert!(outcome.success);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn check_reports_failure_for_a_malformed_query() {
        let dir = std::env::temp_dir().join(format!("fukurow-cli-test-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.rq");
        std::fs::write(&path, "SELECT ?s WHERE {").unwrap();

        let outcome = check(&path).unwrap();
        assert!(!outcome.success);

        std::fs::remove_file(&path).ok();
    }
}
