use clap::Parser;
use krxrank::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
