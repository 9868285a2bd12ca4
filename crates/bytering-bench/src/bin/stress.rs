//! Stress run for bytering and the lock-based baseline queues.
//!
//! ```text
//! cargo run --release -p bytering-bench --bin bytering-stress -- --queue all
//! ```

use bytering_bench::{run_stress, HarnessError, Profiler, QueueKind, StressConfig, FULL_CONFIG};
use clap::{ArgAction, Parser, ValueEnum};
use std::io::{self, Write};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "bytering-stress",
    version,
    about = "Moves a verified byte stream through each queue and reports cycles per call"
)]
struct Cli {
    /// Queue to drive
    #[arg(short = 'q', long = "queue", value_enum, default_value_t = QueueArg::All)]
    queue: QueueArg,

    /// Bytes to move through each queue
    #[arg(short = 'b', long = "bytes", default_value_t = FULL_CONFIG.bytes_to_produce)]
    bytes: u64,

    /// Queue storage size in bytes
    #[arg(short = 's', long = "queue-size", default_value_t = FULL_CONFIG.queue_size)]
    queue_size: usize,

    /// Largest chunk moved by one push or pop
    #[arg(short = 'm', long = "max-op", default_value_t = FULL_CONFIG.max_bytes_per_op)]
    max_bytes_per_op: usize,

    /// Upper bound of the random sleep before each call, in µs (0 disables)
    #[arg(long = "max-sleep-us", default_value_t = FULL_CONFIG.max_sleep_us)]
    max_sleep_us: u64,

    /// Fixed RNG seed for reproducible chunk sizes and sleeps
    #[arg(long = "seed")]
    seed: Option<u64>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbosity: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum QueueArg {
    LockFree,
    LockFreeDiv,
    Byte,
    Vector,
    Region,
    All,
}

impl QueueArg {
    fn kinds(self) -> Vec<QueueKind> {
        match self {
            QueueArg::LockFree => vec![QueueKind::LockFree],
            QueueArg::LockFreeDiv => vec![QueueKind::LockFreeDiv],
            QueueArg::Byte => vec![QueueKind::Byte],
            QueueArg::Vector => vec![QueueKind::Vector],
            QueueArg::Region => vec![QueueKind::Region],
            QueueArg::All => QueueKind::ALL.to_vec(),
        }
    }
}

impl Cli {
    fn config(&self) -> StressConfig {
        let config = StressConfig::new(
            self.bytes,
            self.queue_size,
            self.max_bytes_per_op,
            self.max_sleep_us,
        );
        match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }
}

fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .try_init();
}

fn run(cli: &Cli) -> Result<Profiler, HarnessError> {
    let config = cli.config();
    let mut profiler = Profiler::new();
    for queue in cli.queue.kinds() {
        let report = run_stress(&config, queue)?;
        println!(
            "{}: {} bytes in {:.3?} ({:.1} MiB/s)",
            report.queue,
            report.bytes,
            report.elapsed,
            report.mib_per_sec()
        );
        profiler.merge(&report.profiler);
    }
    Ok(profiler)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbosity);

    match run(&cli) {
        Ok(profiler) => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            if profiler.report(&mut out).and_then(|()| out.flush()).is_err() {
                process::exit(2);
            }
        }
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(1);
        }
    }
}
