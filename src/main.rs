use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use immunoseq_clonality::cli::Args;
use immunoseq_clonality::cli::Commands;
use immunoseq_clonality::helper::config;
use immunoseq_clonality::pipelines::compare;

fn main() -> ExitCode {
    let args = Args::parse();

    match args.command {
        Commands::Run {
            input,
            metadata,
            config,
        } => match compare::run(Path::new(&input), &metadata, &config) {
            Ok(report) => {
                println!(
                    "Analysis complete: {} metric(s) processed, {} warning(s) logged.",
                    report.metric_outcomes().len(),
                    report.warnings().len()
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Setup failure: {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Generate { output } => match config::write_default_config(Path::new(&output)) {
            Ok(()) => {
                println!("Wrote default configuration to {}", output);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Could not write {}: {}", output, e);
                ExitCode::FAILURE
            }
        },
    }
}
