//! A tiny REPL for running queries against an in-memory store without
//! reloading a dataset for every query.

use anyhow::Result;
use fukurow_sparql::{evaluate_query, EngineConfig, ExecutionResult};
use fukurow_store::QuadStore;
use std::io::{self, Write};

/// Starts an interactive session: `load <path>` populates the store from a
/// dataset file, anything else is evaluated as a SPARQL query against it.
pub fn run() -> Result<()> {
    println!("fukurow interactive mode");
    println!("commands: load <path>, quit; anything else is run as a query");

    let store = QuadStore::new();
    let cfg = EngineConfig::default();

    loop {
        print!("fukurow> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "quit" | "exit" => break,
            "help" => {
                println!("load <path>   load a dataset file into the store");
                println!("<query>       evaluate a SPARQL query against the current store");
                println!("quit          exit");
            }
            _ if input.starts_with("load ") => {
                let path = input["load ".len()..].trim();
                match std::fs::read_to_string(path).map_err(anyhow::Error::from).and_then(|text| {
                    crate::dataset::parse(&text).map_err(anyhow::Error::from)
                }) {
                    Ok(quads) => {
                        let count = quads.len();
                        for (s, p, o) in quads {
                            if let Err(e) = store.add_current(fukurow_core::model::Quad::new(s, p, o)) {
                                eprintln!("error: {e}");
                            }
                        }
                        println!("loaded {count} quad(s)");
                    }
                    Err(e) => eprintln!("error: {e}"),
                }
            }
            query => match evaluate_query(&store, query, &cfg) {
                Ok(ExecutionResult::Ask(answer)) => println!("{answer}"),
                Ok(ExecutionResult::Select { vars, rows }) => {
                    println!("{} row(s)", rows.len());
                    for row in &rows {
                        let cells: Vec<String> =
                            vars.iter().map(|(id, _)| row.get(*id).map(|t| t.display_string()).unwrap_or_default()).collect();
                        println!("{}", cells.join("\t"));
                    }
                }
                Ok(ExecutionResult::Construct(quads)) => {
                    for quad in quads {
                        println!("{} {} {} .", quad.subject.display_string(), quad.predicate.display_string(), quad.object.display_string());
                    }
                }
                Err(e) => eprintln!("error: {e}"),
            },
        }
    }

    println!("goodbye");
    Ok(())
}
