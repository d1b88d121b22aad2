pub mod commands;
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    canon_line, expand_path, handle_canon, handle_inputs, handle_job, init_tracing,
    job_options_from_args, parse_output_format, parse_report_format,
};

pub use warcgraph_core::{JobKind, JobOptions, OutputFormat};
