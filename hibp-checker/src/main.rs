use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use hibp_checker::{
    CheckOptions, Checker, ConsoleProgress, DEFAULT_WORKERS, Error, LoadOptions, ResultSink,
};
use hibp_range_client::{DEFAULT_BASE_URL, HIBP_API_URL_ENV, HashMode, HttpRangeClient};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hibp-checker", version)]
#[command(about = "Check NTLM password hashes against Have I Been Pwned")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check account:hash pairs from a file against the Pwned Passwords API.
    ///
    /// Accounts ending with '$' (computer accounts) are skipped. Results are
    /// streamed to the output file as they are found, so partial results are
    /// kept if the run is interrupted.
    Check(CheckArgs),
}

#[derive(clap::Args, Debug)]
struct CheckArgs {
    /// Input file containing account:hash pairs
    #[arg(short, long)]
    input: PathBuf,

    /// Output file for exposed accounts (streamed)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Delimiter between account and hash
    #[arg(short, long, default_value = ":")]
    delimiter: String,

    /// Skip the first line (header row)
    #[arg(short, long)]
    skip_header: bool,

    /// Number of concurrent workers for API queries
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Limit number of accounts to check (0 = no limit)
    #[arg(short, long, default_value_t = 0)]
    limit: usize,

    /// Hash type contained in the input
    #[arg(long, value_enum, default_value_t = Mode::Ntlm)]
    mode: Mode,

    /// Range API base URL
    #[arg(long, env = HIBP_API_URL_ENV, default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Extra attempts per prefix after a failed query
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Disable progress bar
    #[arg(long)]
    no_progress: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Ntlm,
    Sha1,
}

impl From<Mode> for HashMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Ntlm => HashMode::Ntlm,
            Mode::Sha1 => HashMode::Sha1,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Check(args) => check(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn check(args: CheckArgs) -> Result<(), Error> {
    let mode = HashMode::from(args.mode);

    // Open output early so results can be streamed
    let sink = match &args.output {
        Some(path) => {
            let sink = ResultSink::create(path)?;
            println!("Streaming results to: {}", path.display());
            sink
        }
        None => ResultSink::disabled(),
    };
    let sink = Arc::new(sink);

    let client = HttpRangeClient::builder()
        .base_url(&args.api_url)
        .mode(mode)
        .timeout(Duration::from_secs(args.timeout))
        .retries(args.retries)
        .pool_max_idle_per_host(args.workers.max(1))
        .build()?;

    let progress: Arc<ConsoleProgress> = if args.no_progress {
        Arc::new(ConsoleProgress::hidden())
    } else {
        Arc::new(ConsoleProgress::new())
    };

    let cancel = CancellationToken::new();
    tokio::spawn(watch_interrupts(cancel.clone(), Arc::clone(&sink)));

    let options = CheckOptions {
        load: LoadOptions {
            delimiter: args.delimiter,
            skip_header: args.skip_header,
            limit: Some(args.limit),
        },
        workers: args.workers,
        expected_hash_len: Some(mode.digest_len()),
    };

    let report = Checker::new(client)
        .with_progress(progress)
        .with_cancellation(cancel)
        .check_file(&args.input, &options, Arc::clone(&sink))
        .await?;

    if report.pool.failed > 0 {
        tracing::warn!(failed = report.pool.failed, "some prefixes could not be queried");
    }
    if report.pool.skipped > 0 {
        tracing::warn!(skipped = report.pool.skipped, "run was interrupted before all prefixes were queried");
    }

    println!("\nTotal exposed accounts: {}", report.exposed);
    Ok(())
}

/// First Ctrl-C cancels the run, a second one exits right away.
async fn watch_interrupts(cancel: CancellationToken, sink: Arc<ResultSink>) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    tracing::warn!("interrupted, stopping queries (press Ctrl-C again to exit now)");
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    if let Err(e) = sink.flush() {
        tracing::warn!(error = %e, "failed to flush results");
    }
    eprintln!("Interrupted, {} exposed accounts written", sink.written());
    std::process::exit(130);
}
