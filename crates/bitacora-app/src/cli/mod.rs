use std::path::PathBuf;

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};

/// Top-level CLI entry point.
#[derive(Debug, Parser)]
#[command(
    name = "bitacora",
    version,
    about = "Fleet service-history analyzer: extract maintenance events and reconcile device state"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(global = true, short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn print_help() {
        let mut cmd = Cli::command();
        let _ = cmd.print_help();
        println!();
    }
}

/// Supported subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full pipeline: extract events from a service-history CSV and
    /// reconcile per-device state.
    Analyze(AnalyzeArgs),
    /// Replay a previously exported event table into a fresh state table,
    /// without calling the generation service.
    Reconcile(ReconcileArgs),
}

/// Analyze a service-history table.
#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Service-history CSV to analyze.
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,
    /// Header of the device-identifier column.
    #[arg(long, default_value = "IMEI")]
    pub device_col: String,
    /// Header of the free-text description column.
    #[arg(long, default_value = "DESCRIPTION")]
    pub desc_col: String,
    /// Header of the event-timestamp column.
    #[arg(long, default_value = "FECHA")]
    pub date_col: String,
    /// Header of the client-name column.
    #[arg(long, default_value = "CLIENTE")]
    pub client_col: String,
    /// Rows per generation-service call (overrides configuration).
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Generation model identifier (overrides configuration).
    #[arg(long)]
    pub model: Option<String>,
    /// Where to write the flattened event table.
    #[arg(long, default_value = "events.csv", value_name = "CSV")]
    pub events_out: PathBuf,
    /// Where to write the per-device state table.
    #[arg(long, default_value = "state.csv", value_name = "CSV")]
    pub state_out: PathBuf,
}

/// Recompute device state from an exported event table.
#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// Event table produced by a previous `analyze` run.
    #[arg(long, value_name = "CSV")]
    pub events: PathBuf,
    /// Where to write the per-device state table.
    #[arg(long, default_value = "state.csv", value_name = "CSV")]
    pub state_out: PathBuf,
}
