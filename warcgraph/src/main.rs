use warcgraph::commands::command_argument_builder;
use warcgraph::handlers::{handle_canon, handle_inputs, handle_job, init_tracing};
use warcgraph_core::{JobKind, print_banner};

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let verbose = chosen_command.get_flag("verbose");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    init_tracing(verbose);

    let result = match chosen_command.subcommand() {
        Some(("vertices", primary_command)) => {
            handle_job(JobKind::Vertices, primary_command, quiet).await
        }
        Some(("edges", primary_command)) => handle_job(JobKind::Edges, primary_command, quiet).await,
        Some(("canon", primary_command)) => handle_canon(primary_command),
        Some(("inputs", primary_command)) => handle_inputs(primary_command, quiet),
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = result {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}
