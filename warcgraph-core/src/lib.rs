pub mod counters;
pub mod data;
pub mod edge;
pub mod engine;
pub mod error;
pub mod job;
pub mod output;
pub mod report;
pub mod vertex;

use colored::Colorize;

pub use counters::{Counter, CounterSet, CounterSnapshot, Counters};
pub use edge::{EdgeJob, EdgeRecord, EdgeWorker, map_edges};
pub use engine::{
    Executor, Job, JobOutput, LocalExecutor, MemoryShard, ProgressCallback, SequentialExecutor,
    Shard,
};
pub use error::{JobError, Result};
pub use job::{
    JobKind, JobOptions, JobSummary, OutputFormat, WarcShard, check_environment, discover_shards,
    run_job,
};
pub use vertex::{VertexJob, VertexRecord, map_vertex};

pub fn print_banner() {
    let banner = r#"
  __      ____ _ _ __ ___ __ _ _ __ __ _ _ __ | |__
  \ \ /\ / / _` | '__/ __/ _` | '__/ _` | '_ \| '_ \
   \ V  V / (_| | | | (_| (_| | | | (_| | |_) | | | |
    \_/\_/ \__,_|_|  \___\__, |_|  \__,_| .__/|_| |_|
                         |___/          |_|
"#;
    eprintln!("{}", banner.bright_cyan());
    eprintln!(
        "  {} {}\n",
        "link graphs from web archives".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
