use std::time::Duration;

use clap::{Parser, ValueEnum};
use crossterm::style::Color;
use rand::RngExt;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use multispin::frames;
use multispin::terminal::Stream;
use multispin::{Config, Logger, Verbosity};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Output {
    /// Detect from the stream
    Auto,
    /// Force cursor-positioned animation
    Tty,
    /// Force appended plain lines
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FrameSet {
    Dots,
    Line,
    Arrow,
}

#[derive(Parser)]
#[command(
    name = "multispin",
    version,
    about = "Many tasks, one terminal: concurrent spinner demo."
)]
struct Cli {
    /// Concurrent workers
    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// Spinners each worker runs, one after another
    #[arg(short, long, default_value_t = 3)]
    spinners: usize,

    /// Shortest simulated task, in milliseconds
    #[arg(long, default_value_t = 400)]
    min_ms: u64,

    /// Longest simulated task, in milliseconds
    #[arg(long, default_value_t = 2500)]
    max_ms: u64,

    /// Percentage of tasks that fail
    #[arg(long, default_value_t = 15)]
    fail_rate: u32,

    #[arg(long, value_enum, default_value_t = Output::Auto)]
    output: Output,

    #[arg(long, value_enum, default_value_t = FrameSet::Dots)]
    frames: FrameSet,

    /// Render to stdout instead of stderr
    #[arg(long, default_value_t = false)]
    stdout: bool,

    /// Diagnostics on stderr (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env();
    match cli.verbose {
        0 => {}
        1 => config.verbosity = Verbosity::Basic,
        _ => config.verbosity = Verbosity::Verbose,
    }
    match cli.output {
        Output::Auto => {}
        Output::Tty => config.terminal = Some(true),
        Output::Plain => config.terminal = Some(false),
    }
    if cli.stdout {
        config.stream = Stream::Stdout;
    }

    init_tracing(config.verbosity);

    if cli.min_ms > cli.max_ms {
        anyhow::bail!("--min-ms ({}) exceeds --max-ms ({})", cli.min_ms, cli.max_ms);
    }

    let frame_set = match cli.frames {
        FrameSet::Dots => frames::DOTS,
        FrameSet::Line => frames::LINE,
        FrameSet::Arrow => frames::ARROW,
    };

    let logger = Logger::new(config);
    logger
        .println(format!(
            "running {} worker(s) x {} task(s)",
            cli.workers, cli.spinners
        ))
        .await;

    let plan = Plan {
        tasks: cli.spinners,
        min_ms: cli.min_ms,
        max_ms: cli.max_ms,
        fail_rate: cli.fail_rate,
        frames: frame_set,
    };
    let workers = (0..cli.workers).map(|worker| run_worker(logger.indented(), worker, plan));
    futures::future::join_all(workers).await;

    logger.println("all workers finished").await;
    logger.shutdown().await;
    Ok(())
}

/// What every worker does.
#[derive(Debug, Clone, Copy)]
struct Plan {
    tasks: usize,
    min_ms: u64,
    max_ms: u64,
    fail_rate: u32,
    frames: &'static [&'static str],
}

async fn run_worker(logger: Logger, worker: usize, plan: Plan) {
    for task in 0..plan.tasks {
        let label = format!("worker {worker} task {task}");
        let spinner = logger
            .create_spinner(
                label.clone(),
                plan.frames,
                Color::Cyan,
                Duration::from_millis(80),
            )
            .await;

        let (delay, fails) = {
            let mut rng = rand::rng();
            (
                rng.random_range(plan.min_ms..=plan.max_ms),
                rng.random_range(0..100) < plan.fail_rate,
            )
        };

        tokio::time::sleep(Duration::from_millis(delay / 2)).await;
        spinner.set_message(format!("{label} (halfway)")).await;
        tokio::time::sleep(Duration::from_millis(delay - delay / 2)).await;

        if fails {
            spinner.error(format!("{label} failed after {delay}ms")).await;
        } else {
            spinner.success(format!("{label} done in {delay}ms")).await;
        }
    }
}

fn init_tracing(verbosity: Verbosity) {
    let default_filter = match verbosity {
        Verbosity::Off => "warn",
        Verbosity::Basic => "multispin=debug",
        Verbosity::Verbose => "multispin=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();
}
