use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{debug, warn};
use warcgraph_core::report::{self, ReportFormat};
use warcgraph_core::{JobKind, JobOptions, OutputFormat, discover_shards, run_job};
use warcgraph_scanner::{ResolvedUrl, canonicalize, derive_id};

/// Install the fmt subscriber; `--verbose` lowers the level to DEBUG.
pub fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    // A second init (e.g. from tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Expand `~` and environment variables in a user-supplied path.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
    }
}

pub fn parse_output_format(raw: &str) -> Result<OutputFormat> {
    OutputFormat::from_str(raw).ok_or_else(|| anyhow!("unknown output format '{}'", raw))
}

pub fn parse_report_format(raw: &str) -> Result<ReportFormat> {
    ReportFormat::from_str(raw).ok_or_else(|| anyhow!("unknown report format '{}'", raw))
}

fn input_paths(args: &ArgMatches) -> Vec<PathBuf> {
    args.get_many::<String>("INPUT")
        .map(|values| values.map(|raw| expand_path(raw)).collect())
        .unwrap_or_default()
}

/// Build job options from the arguments of a `vertices` or `edges` command.
pub fn job_options_from_args(args: &ArgMatches, quiet: bool) -> Result<JobOptions> {
    let defaults = JobOptions::default();

    let output = args
        .get_one::<String>("output")
        .map(|raw| expand_path(raw))
        .unwrap_or(defaults.output);
    let format = match args.get_one::<String>("format") {
        Some(raw) => parse_output_format(raw)?,
        None => defaults.format,
    };
    let warc_types = args
        .get_many::<String>("warc-type")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let options = JobOptions {
        inputs: input_paths(args),
        output,
        workers: args.get_one::<usize>("workers").copied().unwrap_or(defaults.workers),
        partitions: args
            .get_one::<usize>("partitions")
            .copied()
            .unwrap_or(defaults.partitions),
        max_attempts: args
            .get_one::<usize>("max-attempts")
            .copied()
            .unwrap_or(defaults.max_attempts),
        format,
        warc_types,
        overwrite: args.get_flag("force"),
        show_progress: !quiet && !args.get_flag("no-progress"),
    };
    options.validate()?;
    Ok(options)
}

/// A watch channel flipped to `true` on the first Ctrl-C.
fn shutdown_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing shards in flight");
            let _ = tx.send(true);
        }
    });
    rx
}

pub async fn handle_job(kind: JobKind, args: &ArgMatches, quiet: bool) -> Result<()> {
    let options = job_options_from_args(args, quiet)?;
    let report_format = match args.get_one::<String>("report") {
        Some(raw) => parse_report_format(raw)?,
        None => ReportFormat::Text,
    };
    debug!("{:?}", options);

    if !quiet {
        println!(
            "{} Building {} from {} input(s) with {} workers",
            "→".bright_cyan().bold(),
            kind.as_str().bright_white(),
            options.inputs.len(),
            options.workers
        );
    }

    let summary = run_job(kind, options, Some(shutdown_on_ctrl_c()))
        .await
        .with_context(|| format!("{} job failed", kind.as_str()))?;

    let rendered = report::generate_report(&summary, report_format)?;
    match args.get_one::<String>("report-file") {
        Some(path) => {
            let path = expand_path(path);
            report::save_report(&rendered, &path)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            if !quiet {
                println!(
                    "{} Report saved to {}",
                    "✓".green().bold(),
                    path.display().to_string().bright_white()
                );
            }
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

/// `<canonical URL>\t<node id>` for one URL.
pub fn canon_line(url: &str, base: Option<&str>) -> Result<String> {
    let base = base.map(ResolvedUrl::parse).transpose()?;
    let canonical = canonicalize(url, base.as_ref())?;
    let id = derive_id(&canonical);
    Ok(format!("{}\t{}", canonical, id))
}

pub fn handle_canon(args: &ArgMatches) -> Result<()> {
    let url = args
        .get_one::<String>("URL")
        .ok_or_else(|| anyhow!("a URL is required"))?;
    let base = args.get_one::<String>("base").map(String::as_str);

    println!("{}", canon_line(url, base)?);
    Ok(())
}

pub fn handle_inputs(args: &ArgMatches, quiet: bool) -> Result<()> {
    let inputs = input_paths(args);
    let files = discover_shards(&inputs)?;
    if files.is_empty() {
        bail!("no WARC files found in the given inputs");
    }

    let mut total_bytes = 0u64;
    for file in &files {
        let size = fs::metadata(file).map(|m| m.len()).unwrap_or(0);
        total_bytes += size;
        println!("{}\t{}", size, file.display());
    }

    if !quiet {
        println!(
            "{} {} shard(s), {} bytes",
            "✓".green().bold(),
            files.len(),
            total_bytes
        );
    }
    Ok(())
}
