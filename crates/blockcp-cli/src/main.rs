//! blockcp - parallel direct-I/O block copy for raw volumes and disks
//!
//! Streams the full byte range of a source device (a snapshot, a raw
//! partition, or a file) onto a destination device, keeping one direct-I/O
//! read/write chain in flight per worker thread.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use blockcp_device::SysDiskInfo;
use blockcp_engine::Controller;
use blockcp_types::{CopyConfig, DiskInfo};
use clap::Parser;
use console::style;
use indicatif::HumanBytes;
use tracing::info;

mod progress;

use progress::CopyProgressBar;

const FALLBACK_SECTOR_SIZE: u32 = 4096;

/// Parallel block-level copy for raw volumes and disks
#[derive(Parser)]
#[command(
    name = "blockcp",
    version = env!("CARGO_PKG_VERSION"),
    about = "Parallel direct-I/O block copy for raw volumes and disks",
    long_about = "blockcp streams the entire byte range of a source device or file to a\n\
                  destination device using direct (unbuffered) I/O, with one outstanding\n\
                  read/write chain per worker thread.\n\n\
                  Examples:\n\
                    blockcp /dev/mapper/snap /dev/sdb --usedefault\n\
                    blockcp /dev/sda2 /dev/sdb2 10 4"
)]
struct Cli {
    /// Source device, snapshot, or file path
    source: PathBuf,

    /// Destination device or volume path
    destination: PathBuf,

    /// Worker thread count (1-64); required unless --usedefault is given
    threads: Option<usize>,

    /// Block size in MiB; required unless --usedefault is given
    block_size_mb: Option<usize>,

    /// Use the built-in worker count and block size
    #[arg(long)]
    usedefault: bool,

    /// Skip the destination-overwrite confirmation
    #[arg(short, long)]
    yes: bool,

    /// Open source and destination without direct I/O (regular-file copies)
    #[arg(long)]
    buffered: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - errors only, no progress bar
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging(cli.debug, cli.quiet, cli.verbose);

    let mut config = build_config(&cli)?;
    config.validate()?;

    if !cli.quiet {
        println!(
            "Copying {} -> {} with {} workers, {} blocks",
            style(cli.source.display()).bold(),
            style(cli.destination.display()).bold(),
            config.workers,
            HumanBytes(config.block_size as u64),
        );
    }

    if !cli.yes {
        println!(
            "{} every byte of {} will be overwritten.",
            style("warning:").yellow().bold(),
            cli.destination.display()
        );
        if !confirm("Proceed with the copy?")? {
            println!("Aborted, destination untouched.");
            return Ok(());
        }
    }

    resolve_sector_fallback(&cli, &mut config)?;

    let controller = Controller::new(config)?;
    let mut bar = CopyProgressBar::new(cli.quiet);
    let stats = controller
        .copy(
            &cli.source,
            &cli.destination,
            &SysDiskInfo::new(),
            |progress| bar.update(&progress),
        )
        .context("copy failed")?;
    bar.finish();

    info!(
        bytes_read = stats.bytes_read,
        bytes_written = stats.bytes_written,
        "copy finished"
    );
    if !cli.quiet {
        println!(
            "{} {} read, {} written in {:.1?} ({}/s)",
            style("done:").green().bold(),
            HumanBytes(stats.bytes_read),
            HumanBytes(stats.bytes_written),
            stats.duration,
            HumanBytes(stats.transfer_rate() as u64),
        );
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<CopyConfig> {
    if cli.usedefault {
        if cli.threads.is_some() || cli.block_size_mb.is_some() {
            bail!("--usedefault cannot be combined with explicit THREADS and BLOCK_SIZE_MB");
        }
        let mut config = CopyConfig::default();
        config.direct_io = !cli.buffered;
        return Ok(config);
    }
    match (cli.threads, cli.block_size_mb) {
        (Some(threads), Some(block_size_mb)) => {
            let mut config = CopyConfig::new(threads, block_size_mb);
            config.direct_io = !cli.buffered;
            Ok(config)
        }
        _ => bail!("provide either --usedefault or both THREADS and BLOCK_SIZE_MB"),
    }
}

/// Probe the destination sector size ahead of the copy so the fallback can be
/// confirmed interactively, the way size facts were confirmed on the original
/// console tool.
fn resolve_sector_fallback(cli: &Cli, config: &mut CopyConfig) -> Result<()> {
    let Ok(handle) = File::open(&cli.destination) else {
        // The controller will report the open failure with context.
        return Ok(());
    };
    let sector = SysDiskInfo::new()
        .sector_size(&handle, &cli.destination)
        .unwrap_or(0);
    drop(handle);
    if sector != 0 {
        return Ok(());
    }

    println!(
        "{} destination sector size could not be determined.",
        style("warning:").yellow().bold()
    );
    if !confirm(&format!(
        "Assume {} bytes and continue? A wrong sector size can corrupt the destination.",
        FALLBACK_SECTOR_SIZE
    ))? {
        bail!("destination sector size unknown");
    }
    info!(
        assumed = FALLBACK_SECTOR_SIZE,
        "proceeding with assumed sector size"
    );
    config.assume_sector_size = Some(FALLBACK_SECTOR_SIZE);
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed to read confirmation")?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes" | "Yes" | "YES"))
}

fn init_logging(debug: bool, quiet: bool, verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("blockcp={level},blockcp_cli={level}")));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
