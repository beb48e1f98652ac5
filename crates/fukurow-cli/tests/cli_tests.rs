//! End-to-end tests for the `run`/`check` subcommands.

use clap::Parser;
use fukurow_cli::commands::{self, Cli, Command, OutputFormat};

fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("fukurow-cli-tests-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn parses_run_with_all_options() {
    let args = vec!["fukurow-cli", "run", "--query", "q.rq", "--data", "d.nt", "--format", "json"];
    let cli = Cli::try_parse_from(args).unwrap();
    match cli.command {
        Command::Run { query, data, format } => {
            assert_eq!(query, std::path::PathBuf::from("q.rq"));
            assert_eq!(data, Some(std::path::PathBuf::from("d.nt")));
            assert_eq!(format, OutputFormat::Json);
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn parses_check() {
    let args = vec!["fukurow-cli", "check", "--query", "q.rq"];
    let cli = Cli::try_parse_from(args).unwrap();
    match cli.command {
        Command::Check { query } => assert_eq!(query, std::path::PathBuf::from("q.rq")),
        _ => panic!("expected Check"),
    }
}

#[test]
fn run_rejects_unknown_command() {
    let args = vec!["fukurow-cli", "bogus"];
    assert!(Cli::try_parse_from(args).is_err());
}

#[test]
fn run_executes_a_select_against_a_loaded_dataset() {
    let data_path = write_temp("dataset.nt", "<http://ex/alice> <http://ex/age> \"30\"^^<http://www.w3.org/2001/XMLSchema#integer> .\n");
    let query_path = write_temp("query.rq", "SELECT ?age WHERE { <http://ex/alice> <http://ex/age> ?age }");

    let outcome = commands::execute(Command::Run { query: query_path, data: Some(data_path), format: OutputFormat::Text }).unwrap();
    assert!(outcome.success);
}

#[test]
fn check_fails_on_an_unbalanced_where_clause() {
    let query_path = write_temp("bad.rq", "SELECT ?s WHERE { ?s ?p ?o");
    let outcome = commands::execute(Command::Check { query: query_path }).unwrap();
    assert!(!outcome.success);
}

#[test]
fn check_succeeds_on_a_well_formed_ask_query() {
    let query_path = write_temp("ask.rq", "ASK { ?s ?p ?o }");
    let outcome = commands::execute(Command::Check { query: query_path }).unwrap();
    assert!(outcome.success);
}
