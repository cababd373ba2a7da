//! Binary entrypoint for the tpcache CLI.
//!
//! Commands:
//! - `init` - write a starter `tpcache.toml`
//! - `check` - load and validate the config, print the effective timeout
//! - `demo [--accept] [--timeout-ticks <n>]` - run one request through the
//!   Tokio scheduler and report how it ended
//!
//! See the library crate docs for module-level details: `tpcache::`.
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::sync::mpsc;

use tpcache::config::Config;
use tpcache::metrics;
use tpcache::teleport::{PlayerId, TeleportService, TokioScheduler};

#[derive(Parser)]
#[command(name = "tpcache")]
#[command(about = "Pending teleport request cache with timed expiration")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "tpcache.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Validate the configuration file
    Check,
    /// Run a single request between two random players
    Demo {
        /// Accept the request halfway through its timeout instead of letting it expire
        #[arg(short, long)]
        accept: bool,
        /// Override the configured timeout (in ticks)
        #[arg(long)]
        timeout_ticks: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_logging(&None, cli.verbose);
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Check => {
            let config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            println!(
                "{}: requests expire after {} ticks ({:?})",
                cli.config,
                config.teleport.request_timeout_ticks,
                config.teleport.request_timeout()
            );
        }
        Commands::Demo {
            accept,
            timeout_ticks,
        } => {
            let mut config = match Config::load(&cli.config).await {
                Ok(cfg) => cfg,
                Err(e) => {
                    eprintln!("{e}; using defaults");
                    Config::default()
                }
            };
            if let Some(ticks) = timeout_ticks {
                config.teleport.request_timeout_ticks = ticks;
            }
            init_logging(&Some(config.clone()), cli.verbose);
            run_demo(&config, accept).await?;
        }
    }

    Ok(())
}

async fn run_demo(config: &Config, accept: bool) -> Result<()> {
    let scheduler =
        TokioScheduler::try_current().ok_or_else(|| anyhow!("demo requires a Tokio runtime"))?;
    let (expired_tx, mut expired_rx) = mpsc::unbounded_channel();
    let service = TeleportService::new(
        scheduler,
        &config.teleport,
        move |requester: PlayerId, target: PlayerId| {
            let _ = expired_tx.send((requester, target));
        },
    )?;

    let (requester, target) = (PlayerId::random(), PlayerId::random());
    let timeout = service.timeout();
    service.request(requester, target)?;
    info!(
        "{} asked to teleport to {} (expires in {:?})",
        requester, target, timeout
    );

    if accept {
        tokio::time::sleep(timeout / 2).await;
        let mover = service.accept(target)?;
        info!("{} will be teleported to {}", mover, target);
    } else {
        match tokio::time::timeout(timeout + Duration::from_secs(1), expired_rx.recv()).await {
            Ok(Some((from, to))) => info!("Request from {} to {} expired", from, to),
            Ok(None) => warn!("Expiry channel closed before the request expired"),
            Err(_) => warn!("Request did not expire within {:?}", timeout),
        }
    }

    service.shutdown();
    println!("{}", serde_json::to_string(&metrics::snapshot())?);
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity wins over the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|cfg| cfg.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Mirror to the console only when someone is watching
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
