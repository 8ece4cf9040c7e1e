//! bsarc CLI - Command-line tool for Bethesda BA2 archives.
//!
//! This is the main entry point for the bsarc command-line application.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use bsarc::prelude::*;

/// bsarc - Bethesda BA2 archive tool
#[derive(Parser)]
#[command(name = "bsarc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List contents of a BA2 archive
    List {
        /// Path to the BA2 file
        #[arg(short, long, env = "BSARC_ARCHIVE")]
        archive: PathBuf,

        /// Filter pattern (glob-style)
        #[arg(short, long)]
        filter: Option<String>,

        /// Show detailed information
        #[arg(short, long)]
        detailed: bool,
    },

    /// Describe a single entry
    Info {
        /// Path to the BA2 file
        #[arg(short, long, env = "BSARC_ARCHIVE")]
        archive: PathBuf,

        /// Entry path within the archive
        path: String,
    },

    /// Extract files from a BA2 archive
    Extract {
        /// Path to the BA2 file
        #[arg(short, long, env = "BSARC_ARCHIVE")]
        archive: PathBuf,

        /// Output directory
        #[arg(short, long, env = "BSARC_OUTPUT")]
        output: PathBuf,

        /// Filter pattern (glob-style)
        #[arg(short, long)]
        filter: Option<String>,

        /// Write every file directly into the output directory
        #[arg(long)]
        flat: bool,

        /// Keep files that already exist
        #[arg(long)]
        skip_existing: bool,

        /// Worker threads (0 = one per core)
        #[arg(short, long, default_value_t = 0)]
        jobs: usize,

        /// Give extracted files the archive's modification time
        #[arg(long)]
        match_time: bool,

        /// Write the extraction report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List {
            archive,
            filter,
            detailed,
        } => {
            cmd_list(&archive, filter.as_deref(), detailed)?;
        }
        Commands::Info { archive, path } => {
            cmd_info(&archive, &path)?;
        }
        Commands::Extract {
            archive,
            output,
            filter,
            flat,
            skip_existing,
            jobs,
            match_time,
            report,
        } => {
            let options = ExtractOptions {
                preserve_folder: !flat,
                overwrite: if skip_existing {
                    Overwrite::Skip
                } else {
                    Overwrite::Replace
                },
                workers: jobs,
            };
            cmd_extract(
                &archive,
                &output,
                filter.as_deref(),
                options,
                match_time,
                report.as_deref(),
            )?;
        }
    }

    Ok(())
}

fn open_archive(path: &Path, match_time: bool) -> Result<Archive> {
    let config = ArchiveConfig {
        match_last_write_time: match_time,
    };
    Archive::open_with(path, config)
        .with_context(|| format!("Failed to open BA2 archive {}", path.display()))
}

fn parse_filter(filter: Option<&str>) -> Result<Option<EntryFilter>> {
    filter
        .map(EntryFilter::new)
        .transpose()
        .context("Invalid filter pattern")
}

fn cmd_list(path: &Path, filter: Option<&str>, detailed: bool) -> Result<()> {
    let archive = open_archive(path, false)?;
    let filter = parse_filter(filter)?;

    let mut count = 0;
    for entry in archive.iter() {
        if filter.as_ref().is_some_and(|f| !f.matches(entry)) {
            continue;
        }

        if detailed {
            println!(
                "{:>12} {:>12} {}{} {}",
                entry.size(),
                entry.real_size(),
                if entry.is_compressed() { "C" } else { " " },
                if archive.is_shadowed(entry.index()) { "D" } else { " " },
                entry.full_path()
            );
        } else {
            println!("{}", entry.full_path());
        }
        count += 1;
    }

    println!(
        "\nTotal: {} entries ({} v{}{})",
        count,
        archive.variant(),
        archive.version(),
        if archive.has_name_table() {
            ""
        } else {
            ", no name table"
        }
    );

    Ok(())
}

fn cmd_info(path: &Path, entry_path: &str) -> Result<()> {
    let archive = open_archive(path, false)?;
    let entry = archive
        .find(entry_path)
        .with_context(|| format!("No entry named {}", entry_path))?;

    println!("{}", entry.summary());
    if archive.is_shadowed(entry.index()) {
        println!("Shadowed by an earlier entry with the same hashes");
    }

    Ok(())
}

fn cmd_extract(
    path: &Path,
    output: &Path,
    filter: Option<&str>,
    options: ExtractOptions,
    match_time: bool,
    report_path: Option<&Path>,
) -> Result<()> {
    println!("Opening BA2 archive: {}", path.display());

    let start = Instant::now();
    let archive = open_archive(path, match_time)?;
    let filter = parse_filter(filter)?;
    tracing::debug!(?options, match_time, "extraction settings");

    println!("Loaded {} entries in {:?}", archive.entry_count(), start.elapsed());

    let selected: Vec<&Entry> = archive
        .iter()
        .filter(|e| filter.as_ref().map_or(true, |f| f.matches(e)))
        .collect();

    println!("Extracting {} entries...", selected.len());

    let pb = ProgressBar::new(selected.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let report = Extractor::new(options)
        .with_progress(|_, _, _| pb.inc(1))
        .run(selected, output)
        .context("Extraction failed")?;

    pb.finish_with_message("Done");
    println!(
        "Extraction completed in {:?}: {} written, {} skipped, {} failed ({} bytes)",
        start.elapsed(),
        report.succeeded,
        report.skipped,
        report.failures.len(),
        report.bytes_written
    );

    for failure in &report.failures {
        eprintln!("  [{}] {}: {}", failure.kind, failure.path, failure.detail);
    }

    if let Some(report_path) = report_path {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        fs::write(report_path, json).context("Failed to write report")?;
    }

    if !report.failures.is_empty() {
        anyhow::bail!("{} entries could not be extracted", report.failures.len());
    }

    Ok(())
}
