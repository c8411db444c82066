use clap::Parser;
use plotline::cli::{self, args::PlotlineArgs};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = PlotlineArgs::parse();

    // Logs go to stderr; stdout carries the transcript.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    if let Err(e) = cli::run(args) {
        eprintln!("{:?}", miette::Report::new(e));
        std::process::exit(1);
    }
}
