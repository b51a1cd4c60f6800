use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::Result;
use queryexport::{
    EventBus, ExportConfig, ExportListener, ExportOutcome, Exporter, StatsSink, read_events, replay,
};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "queryexport")]
#[command(about = "QueryExport CLI - Mirror saved queries and datasets to .sql files")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to a YAML config file (default: ~/.config/queryexport/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch a JSONL log of lifecycle events through the export listener
    Replay {
        /// Event log, one {"model","phase","record"} object per line
        events: PathBuf,
    },

    /// Print the resolved configuration
    Config,
}

fn main() -> Result<()> {
    // Setup tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = ExportConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Replay { events } => {
            let sink = Arc::new(StatsSink::new());
            let listener = ExportListener::with_exporter(Exporter::with_sink(config, sink.clone()));

            let mut bus = EventBus::with_default_models();
            listener.initialize(&mut bus)?;

            let events = read_events(&events)?;
            for outcome in replay(&bus, &events) {
                print_outcome(&outcome);
            }

            let stats = sink.stats();
            println!(
                "{} written, {} removed, {} already absent, {} skipped, {} failed",
                stats.written.to_string().green(),
                stats.removed.to_string().green(),
                stats.already_absent,
                stats.skipped.to_string().yellow(),
                stats.failed.to_string().red(),
            );

            if stats.failed > 0 {
                process::exit(1);
            }
        }
        Commands::Config => {
            print!("{}", config.to_yaml()?);
        }
    }

    Ok(())
}

fn print_outcome(outcome: &ExportOutcome) {
    let line = outcome.to_string();
    match outcome {
        ExportOutcome::Written { .. } | ExportOutcome::Removed { .. } => {
            println!("{}", line.green())
        }
        ExportOutcome::AlreadyAbsent { .. } => println!("{}", line.dimmed()),
        ExportOutcome::Skipped { .. } => println!("{}", line.yellow()),
        ExportOutcome::Failed { .. } => println!("{}", line.red()),
    }
}
