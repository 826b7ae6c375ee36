use std::{num::NonZeroUsize, process, sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing_subscriber::{filter::LevelFilter, fmt};

use bitacora_app::cli::{AnalyzeArgs, Cli, Commands, ReconcileArgs};
use bitacora_app::config;
use bitacora_app::error::AppError;
use bitacora_app::export::{read_events, write_events, write_states};
use bitacora_app::ingest::{load_service_rows, ColumnSpec};
use bitacora_app::pipeline::reconcile::reconcile;
use bitacora_app::services::{
    BatchOrchestrator, ExtractionClient, GeminiClient, GenerationClient, RetryPolicy,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(determine_log_level(&cli));

    if let Err(err) = run(cli).await {
        eprintln!("{err}");
        process::exit(1);
    }
}

fn init_tracing(level: LevelFilter) {
    let subscriber = fmt().with_max_level(level).with_target(false).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("tracing subscriber already set; skipping re-initialization");
    }
}

fn determine_log_level(cli: &Cli) -> LevelFilter {
    match cli.verbose {
        0 => LevelFilter::OFF,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let verbosity = cli.verbose;
    match cli.command {
        Some(Commands::Analyze(args)) => run_analyze(args, verbosity).await,
        Some(Commands::Reconcile(args)) => run_reconcile(args),
        None => {
            Cli::print_help();
            Ok(())
        }
    }
}

async fn run_analyze(args: AnalyzeArgs, verbosity: u8) -> Result<(), AppError> {
    let cfg = config::load()?;
    let model = args.model.unwrap_or(cfg.generation.model);
    let batch_size = args.batch_size.unwrap_or(cfg.run.batch_size);
    let batch_size = NonZeroUsize::new(batch_size).ok_or(AppError::InvalidBatchSize(batch_size))?;

    // The only fatal condition: no usable credentials for the generation
    // service. Checked here, before any batch work.
    let gemini = GeminiClient::from_env(model.as_str(), cfg.generation.requests_per_second)?;
    let client: Arc<dyn GenerationClient> = Arc::new(gemini);

    let retry = RetryPolicy {
        max_retries: cfg.run.max_retries,
        base_delay: Duration::from_secs(cfg.run.retry_base_delay_secs),
    };
    let extractor = ExtractionClient::new(client, retry);

    let columns = ColumnSpec {
        device: args.device_col,
        description: args.desc_col,
        timestamp: args.date_col,
        client: args.client_col,
    };
    let rows = load_service_rows(&args.input, &columns)?;
    if rows.is_empty() {
        println!("no rows to process in {}", args.input.display());
        return Ok(());
    }

    tracing::info!(
        event = "analyze_start",
        input = %args.input.display(),
        rows = rows.len(),
        batch_size = batch_size.get(),
        model = %model,
        "starting analysis"
    );

    let mut orchestrator = BatchOrchestrator::new(extractor, batch_size);
    if verbosity == 0 {
        orchestrator = orchestrator.with_progress(make_progress_bar());
    }

    let report = orchestrator.run(&rows).await;

    write_events(&args.events_out, &report.events)?;
    let states = reconcile(&report.events);
    write_states(&args.state_out, &states)?;

    println!("{}", report.summary());
    println!(
        "wrote {} event(s) to {} and {} device state(s) to {}",
        report.events.len(),
        args.events_out.display(),
        states.len(),
        args.state_out.display()
    );

    Ok(())
}

fn run_reconcile(args: ReconcileArgs) -> Result<(), AppError> {
    let events = read_events(&args.events)?;
    let states = reconcile(&events);
    write_states(&args.state_out, &states)?;

    println!(
        "reconciled {} event(s) into {} device state(s) at {}",
        events.len(),
        states.len(),
        args.state_out.display()
    );
    Ok(())
}

fn make_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} [{elapsed_precise}] {pos}/{len} rows ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_draw_target(ProgressDrawTarget::stderr_with_hz(12));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
