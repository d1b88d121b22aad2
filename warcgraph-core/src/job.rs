use crate::counters::{CounterSnapshot, Counters};
use crate::data::Database;
use crate::edge::EdgeJob;
use crate::engine::{Executor, JobOutput, LocalExecutor, ProgressCallback, Shard};
use crate::error::{JobError, Result};
use crate::output::{self, TableRow};
use crate::vertex::VertexJob;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;
use tracing::info;
use warcgraph_scanner::{CaptureRecord, IdDeriver, LinkExtractor, warc};

/// Which table a job builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Vertices,
    Edges,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Vertices => "vertices",
            JobKind::Edges => "edges",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Directory of `part-r-NNNNN` files, one `key<TAB>value` row per line.
    Tsv,
    /// SQLite database file.
    Sqlite,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "tsv" | "text" => Some(OutputFormat::Tsv),
            "sqlite" | "db" => Some(OutputFormat::Sqlite),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Tsv => "tsv",
            OutputFormat::Sqlite => "sqlite",
        }
    }
}

/// Options for configuring a vertex or edge job
#[derive(Debug, Clone)]
pub struct JobOptions {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub workers: usize,
    pub partitions: usize,
    pub max_attempts: usize,
    pub format: OutputFormat,
    /// Only records whose `WARC-Type` is listed are processed; empty means all.
    pub warc_types: Vec<String>,
    pub overwrite: bool,
    pub show_progress: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output: PathBuf::from("out"),
            workers: 4,
            partitions: 16,
            max_attempts: 3,
            format: OutputFormat::Tsv,
            warc_types: Vec::new(),
            overwrite: false,
            show_progress: false,
        }
    }
}

impl JobOptions {
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(JobError::Config("at least one input is required".to_string()));
        }
        if self.workers == 0 {
            return Err(JobError::Config("workers must be at least 1".to_string()));
        }
        if self.partitions == 0 {
            return Err(JobError::Config("partitions must be at least 1".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(JobError::Config("max attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// What a finished job reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub run_id: String,
    pub kind: JobKind,
    pub inputs: Vec<String>,
    pub output: String,
    pub format: OutputFormat,
    pub shards: usize,
    pub retries: usize,
    pub rows: usize,
    pub counters: CounterSnapshot,
    pub started_at: String,
    pub finished_at: String,
}

/// One archive file as a unit of work.
pub struct WarcShard {
    path: PathBuf,
    warc_types: Arc<Vec<String>>,
}

impl WarcShard {
    pub fn new(path: PathBuf, warc_types: Arc<Vec<String>>) -> Self {
        Self { path, warc_types }
    }

    fn wanted(&self, record: &CaptureRecord) -> bool {
        if self.warc_types.is_empty() {
            return true;
        }
        record
            .record_type()
            .map(|kind| self.warc_types.iter().any(|w| w.eq_ignore_ascii_case(kind)))
            .unwrap_or(false)
    }
}

impl Shard for WarcShard {
    type Record = CaptureRecord;

    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn records(&self) -> Result<Box<dyn Iterator<Item = Result<CaptureRecord>> + '_>> {
        let reader = warc::open(&self.path)?;
        Ok(Box::new(
            reader
                .map(|record| record.map_err(JobError::from))
                .filter(move |record| match record {
                    Ok(record) => self.wanted(record),
                    Err(_) => true,
                }),
        ))
    }
}

/// Lists the shard files a job over `inputs` would process.
pub fn discover_shards(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    Ok(warc::find_warc_files(inputs)?)
}

/// Check the hashing and parsing capabilities up front so a broken
/// environment fails the job before any input is read.
pub fn check_environment() -> Result<()> {
    IdDeriver::new()?;
    LinkExtractor::new()?;
    Ok(())
}

fn prepare_output(options: &JobOptions) -> Result<()> {
    let output = &options.output;
    if !output.exists() {
        return Ok(());
    }
    if !options.overwrite {
        return Err(JobError::Config(format!(
            "output {} already exists (use --force to replace it)",
            output.display()
        )));
    }
    if output.is_dir() {
        std::fs::remove_dir_all(output)?;
    } else if options.format == OutputFormat::Sqlite {
        Database::drop(output)?;
    } else {
        std::fs::remove_file(output)?;
    }
    Ok(())
}

/// Run a vertex or edge job end to end: discover shards, map and group them,
/// then write the table.
pub async fn run_job(
    kind: JobKind,
    options: JobOptions,
    shutdown: Option<watch::Receiver<bool>>,
) -> Result<JobSummary> {
    options.validate()?;
    check_environment()?;
    prepare_output(&options)?;

    let files = discover_shards(&options.inputs)?;
    if files.is_empty() {
        return Err(JobError::Config("no WARC files found in the given inputs".to_string()));
    }
    info!(
        "Building {} from {} files with {} workers",
        kind.as_str(),
        files.len(),
        options.workers
    );

    let warc_types = Arc::new(options.warc_types.clone());
    let shards: Vec<WarcShard> = files
        .iter()
        .map(|path| WarcShard::new(path.clone(), warc_types.clone()))
        .collect();

    // Set up single progress bar for overall job progress (only if enabled)
    let progress_bar = if options.show_progress {
        let pb = ProgressBar::new(shards.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .map_err(|e| JobError::Config(e.to_string()))?,
        );
        Some(Arc::new(pb))
    } else {
        None
    };

    let started = Arc::new(AtomicUsize::new(0));
    let mut executor = LocalExecutor::new(options.workers, options.partitions)
        .with_max_attempts(options.max_attempts);
    if let Some(ref pb) = progress_bar {
        let pb = pb.clone();
        let started = started.clone();
        let callback: ProgressCallback = Arc::new(move |worker_id: usize, shard: String| {
            let count = started.fetch_add(1, Ordering::Relaxed) + 1;
            pb.set_position(count.saturating_sub(1) as u64);
            pb.set_message(format!("worker {}: {}", worker_id, file_label(&shard)));
        });
        executor = executor.with_progress_callback(callback);
    }
    if let Some(shutdown) = shutdown {
        executor = executor.with_shutdown(shutdown);
    }

    let counters = Arc::new(Counters::new());
    let started_at = chrono::Utc::now();

    let written = match kind {
        JobKind::Vertices => {
            let result = executor
                .execute(Arc::new(VertexJob), shards, counters.clone())
                .await;
            persist(kind, &options, &files, &counters, started_at, result)
        }
        JobKind::Edges => {
            let result = executor
                .execute(Arc::new(EdgeJob), shards, counters.clone())
                .await;
            persist(kind, &options, &files, &counters, started_at, result)
        }
    };

    if let Some(ref pb) = progress_bar {
        match &written {
            Ok(_) => pb.finish_with_message(format!("{} complete", kind.as_str())),
            Err(_) => pb.abandon_with_message(format!("{} failed", kind.as_str())),
        }
    }

    let (run_id, shards, retries, rows) = written?;
    let summary = JobSummary {
        run_id,
        kind,
        inputs: options
            .inputs
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
        output: options.output.display().to_string(),
        format: options.format,
        shards,
        retries,
        rows,
        counters: counters.snapshot(),
        started_at: started_at.to_rfc3339(),
        finished_at: chrono::Utc::now().to_rfc3339(),
    };

    info!(
        "{} job {} wrote {} rows to {}",
        kind.as_str(),
        summary.run_id,
        summary.rows,
        summary.output
    );
    Ok(summary)
}

/// Writes the reduced rows; returns run id, shard count, retries and rows.
fn persist<R: TableRow>(
    kind: JobKind,
    options: &JobOptions,
    files: &[PathBuf],
    counters: &Counters,
    started_at: chrono::DateTime<chrono::Utc>,
    result: Result<JobOutput<R>>,
) -> Result<(String, usize, usize, usize)> {
    match options.format {
        OutputFormat::Tsv => {
            let output = result?;
            let rows = output::write_partitions(&options.output, &output.partitions)?;
            Ok((
                uuid::Uuid::new_v4().to_string(),
                output.shards,
                output.retries,
                rows,
            ))
        }
        OutputFormat::Sqlite => {
            let db = Database::new(&options.output)?;
            let inputs: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
            let run_id = db.create_run(
                kind.as_str(),
                &serde_json::to_string(&inputs)?,
                started_at.timestamp(),
            )?;

            let output = match result {
                Ok(output) => output,
                Err(e) => {
                    db.fail_run(&run_id)?;
                    return Err(e);
                }
            };

            let rows = db.insert_rows(&run_id, kind, output.partitions.iter().flatten())?;
            db.complete_run(&run_id, &serde_json::to_string(&counters.snapshot())?)?;
            Ok((run_id, output.shards, output.retries, rows))
        }
    }
}

fn file_label(shard: &str) -> &str {
    Path::new(shard)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(shard)
}
