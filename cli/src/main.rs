use std::process::ExitCode;

use aos_cli::Cli;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    aos_cli::run(Cli::parse()).await
}
