//! Get command - download one or more files.

use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use fastdl::config::{ConfigFile, DownloadConfig, NotifyConfig, Transport};
use fastdl::download::DownloadEngine;
use fastdl::notify::Notifier;
use fastdl::DownloadError;
use tracing::{info, warn};

use super::common::{file_name_from_url, TransportArg};
use crate::error::{CliError, EXIT_PAUSED};
use crate::progress::ProgressDisplay;

/// Arguments for the get command.
#[derive(Debug, Args)]
pub struct GetArgs {
    /// URLs to download, in order
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Destination for each URL (defaults to the URL's file name)
    #[arg(short, long = "output", value_name = "PATH")]
    pub output: Vec<PathBuf>,

    /// Worker threads per file
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Chunk size in MiB (0 derives it from the file size)
    #[arg(short, long)]
    pub chunk_size_mb: Option<u64>,

    /// Remote notification endpoint (host:port, or a URL for websocket)
    #[arg(long, value_name = "ENDPOINT")]
    pub notify: Option<String>,

    /// Transport for --notify
    #[arg(long, value_enum, requires = "notify")]
    pub transport: Option<TransportArg>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// Minimum milliseconds between progress updates (0 reports every read)
    #[arg(long)]
    pub report_interval_ms: Option<u64>,

    /// TCP connect timeout in seconds
    #[arg(long)]
    pub connect_timeout: Option<u64>,

    /// Limit on each request including its body, in seconds (0 disables)
    #[arg(long)]
    pub request_timeout: Option<u64>,
}

/// What a Ctrl-C does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// Ask the engine to pause and let workers stop.
    Pause,
    /// A pause was already requested; leave without waiting for workers.
    Exit,
}

fn on_interrupt(pause_requested: &AtomicBool) -> Interrupt {
    if pause_requested.swap(true, Ordering::SeqCst) {
        Interrupt::Exit
    } else {
        Interrupt::Pause
    }
}

/// Run the get command.
pub fn run(args: GetArgs, file: &ConfigFile) -> Result<(), CliError> {
    let config = build_config(args, file)?;
    let file_count = config.file_count();

    let display = ProgressDisplay::new();
    let notifier = Notifier::new().with_sink(ProgressDisplay::sink(&display));
    let engine = Arc::new(DownloadEngine::new(config, notifier)?);

    let handler_engine = Arc::clone(&engine);
    let pause_requested = AtomicBool::new(false);
    ctrlc::set_handler(move || match on_interrupt(&pause_requested) {
        Interrupt::Pause => {
            if handler_engine.pause() {
                info!("pause requested, press Ctrl-C again to exit immediately");
            }
        }
        Interrupt::Exit => {
            eprintln!("Interrupted; partial files were left in place.");
            process::exit(EXIT_PAUSED);
        }
    })
    .map_err(|e| CliError::Config(format!("failed to set signal handler: {}", e)))?;

    info!(files = file_count, threads = engine.config().threads, "starting download");

    match engine.start() {
        Ok(()) => {
            println!("Downloaded {} file(s)", file_count);
            Ok(())
        }
        Err(DownloadError::Cancelled) => {
            display.abandon();
            warn!(status = %engine.status(), "download paused");
            eprintln!("Download paused; partial files were left in place.");
            Err(CliError::Paused)
        }
        Err(e) => {
            display.abandon();
            Err(e.into())
        }
    }
}

/// Resolve settings: built-in defaults, then the config file, then flags.
fn build_config(args: GetArgs, file: &ConfigFile) -> Result<DownloadConfig, CliError> {
    let save_paths = if args.output.is_empty() {
        args.urls
            .iter()
            .map(|url| file_name_from_url(url))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        args.output
    };

    let mut config = file.apply(DownloadConfig::new(args.urls, save_paths));

    if let Some(threads) = args.threads {
        if threads == 0 {
            return Err(CliError::Config("--threads must be at least 1".into()));
        }
        config = config.with_threads(threads);
    }
    if let Some(mb) = args.chunk_size_mb {
        config = config.with_chunk_size_mb(mb);
    }
    if let Some(secs) = args.connect_timeout {
        config = config.with_connect_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = args.request_timeout {
        config = config.with_request_timeout((secs > 0).then(|| Duration::from_secs(secs)));
    }
    if let Some(ms) = args.report_interval_ms {
        config = config.with_report_interval((ms > 0).then(|| Duration::from_millis(ms)));
    }
    if args.insecure {
        config = config.with_accept_invalid_certs(true);
    }
    if let Some(endpoint) = args.notify {
        let transport = args
            .transport
            .map(Transport::from)
            .or_else(|| config.notify.as_ref().map(|n| n.transport))
            .unwrap_or(Transport::Socket);
        config = config.with_notify(Some(NotifyConfig::new(endpoint, transport)));
    }

    config.validate()?;
    Ok(config)
}
