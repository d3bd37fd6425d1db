// src/cli/mod.rs
//
// Command-line interface module

mod args;
mod commands;
mod output;

use std::sync::Arc;

use anyhow::Result;
use colorful::Colorful;

pub use args::{ClassifyArgs, Cli, Command, ConsensusArgs, SubmitArgs};
pub use commands::{collect_audio_files, run_consensus, ConsensusResult, FileResult};
pub use output::print_json;

use crate::config::{Catalogue, EngineConfig};

/// Resolve the engine configuration: explicit file, else discovery
pub fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::discover()?,
    };
    Ok(config)
}

/// Run the CLI
pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let catalogue = Arc::new(Catalogue::standard());

    match &cli.command {
        Command::Classify(args) => {
            let (results, consensus) =
                commands::classify(args, &config, catalogue, !cli.json)?;
            if results.is_empty() {
                println!("{}", "No audio files found!".red());
                return Ok(());
            }
            if cli.json {
                print_json(&serde_json::json!({ "files": results, "consensus": consensus }))?;
            } else {
                for result in &results {
                    println!("{}", output::format_file_result(result, cli.verbose));
                }
                if !consensus.is_empty() {
                    println!("Consensus:");
                    for result in &consensus {
                        print!("{}", output::format_consensus(result));
                    }
                }
                if results.len() > 1 {
                    print!("{}", output::format_summary(&results));
                }
            }
        }
        Command::Triangulate(args) => {
            let outcome = commands::triangulate(&args.store, args.report, &config)?;
            if cli.json {
                print_json(&outcome)?;
            } else {
                print!("{}", output::format_triangulation(&outcome));
            }
        }
        Command::Validate(args) => {
            let outcome = commands::validate(&args.store, args.report, &config)?;
            if cli.json {
                print_json(&outcome)?;
            } else {
                print!("{}", output::format_validation(&outcome));
            }
        }
        Command::Submit(args) => {
            let result = commands::submit(args, &config, &catalogue)?;
            if cli.json {
                print_json(&result)?;
            } else {
                print!("{}", output::format_consensus(&result));
            }
        }
        Command::Profiles => {
            if cli.json {
                print_json(catalogue.as_ref())?;
            } else {
                print!("{}", output::format_profiles(&catalogue));
            }
        }
    }
    Ok(())
}
