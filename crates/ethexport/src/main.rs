//! ethexport command-line entry point.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use ethexport::TaskGraph;
use ethexport::steps::STEPS;
use ethexport_core::{Settings, init_tracing};

#[derive(Parser)]
#[command(name = "ethexport", about = "Daily date-partitioned Ethereum export pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the task graph resolved from the current environment toggles.
    Plan,
    /// Validate the environment configuration and exit.
    Check,
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Check => {
            println!("Configuration OK");
            println!("  output bucket: {}", settings.output_bucket);
            println!("  provider: {}", settings.provider_uri);
            println!("  archival provider: {}", settings.provider_uri_archival);
            println!(
                "  workers: {}, batch size: {}",
                settings.max_workers, settings.batch_size
            );
            if !settings.notification_emails.is_empty() {
                println!("  notify: {}", settings.notification_emails.join(", "));
            }
            ExitCode::SUCCESS
        }
        Command::Plan => {
            let graph = TaskGraph::build(&settings.toggles);
            println!("Task graph ({} steps):", graph.nodes().len());
            for node in &STEPS {
                if !graph.nodes().contains(&node.id) {
                    println!("  {} (disabled)", node.id);
                    continue;
                }
                let producers: Vec<String> = graph
                    .predecessors(node.id)
                    .map(|step| step.to_string())
                    .collect();
                if producers.is_empty() {
                    println!("  {}", node.id);
                } else {
                    println!("  {} <- {}", node.id, producers.join(", "));
                }
            }
            ExitCode::SUCCESS
        }
    }
}
