use clap::{arg, command};

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

/// Arguments shared by the `vertices` and `edges` jobs.
fn job_command(name: &'static str, about: &'static str, default_output: &'static str) -> clap::Command {
    clap::Command::new(name)
        .about(about)
        .arg(
            arg!(<INPUT> ...)
                .help("WARC files or directories to scan for *.warc and *.warc.gz")
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            arg!(-o --"output" <PATH>)
                .required(false)
                .help("Output directory (tsv) or database file (sqlite)")
                .default_value(default_output),
        )
        .arg(
            arg!(-w --"workers" <NUM_WORKERS>)
                .required(false)
                .help("The number of shards mapped concurrently")
                .value_parser(clap::value_parser!(usize))
                .default_value("4"),
        )
        .arg(
            arg!(-p --"partitions" <NUM>)
                .required(false)
                .help("The number of output partitions (part files)")
                .value_parser(clap::value_parser!(usize))
                .default_value("16"),
        )
        .arg(
            arg!(--"max-attempts" <NUM>)
                .required(false)
                .help("How many times a failing shard is tried before the job fails")
                .value_parser(clap::value_parser!(usize))
                .default_value("3"),
        )
        .arg(
            arg!(--"format" <FORMAT>)
                .required(false)
                .help("Output format: tsv, sqlite")
                .value_parser(["tsv", "sqlite"])
                .default_value("tsv"),
        )
        .arg(
            arg!(--"warc-type" <TYPE>)
                .required(false)
                .help("Only process records of this WARC-Type (repeatable; default: all)")
                .action(clap::ArgAction::Append),
        )
        .arg(
            arg!(--"report" <FORMAT>)
                .required(false)
                .help("Summary format: text, json")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
        .arg(
            arg!(--"report-file" <PATH>)
                .required(false)
                .help("Save the summary to a file instead of printing it"),
        )
        .arg(
            arg!(-f --"force")
                .required(false)
                .help("Replace the output if it already exists")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(--"no-progress")
                .required(false)
                .help("Do not draw a progress bar")
                .action(clap::ArgAction::SetTrue),
        )
}

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("warcgraph")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("warcgraph")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(arg!(-v --"verbose" "Log at debug level").required(false))
        .subcommand_required(false)
        .subcommand(job_command(
            "vertices",
            "Build the vertex table: one (id, canonical URL) row per distinct page",
            "vertices",
        ))
        .subcommand(job_command(
            "edges",
            "Build the edge table: one (source id, dest id) row per outbound link",
            "edges",
        ))
        .subcommand(
            command!("canon")
                .about("Print the canonical form of a URL and its node id")
                .arg(arg!(<URL>).help("The URL to canonicalize"))
                .arg(
                    arg!(-b --"base" <URL>)
                        .required(false)
                        .help("Resolve URL relative to this page"),
                ),
        )
        .subcommand(
            command!("inputs")
                .about("List the WARC files a job over the given inputs would read")
                .arg(
                    arg!(<INPUT> ...)
                        .help("WARC files or directories")
                        .value_parser(clap::value_parser!(String)),
                ),
        )
}
