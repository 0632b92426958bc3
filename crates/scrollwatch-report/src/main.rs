mod bootstrap_helpers;
mod report_run;

use anyhow::Result;
use clap::Parser;
use scrollwatch_cli::Cli;

use crate::bootstrap_helpers::init_tracing;
use crate::report_run::{render_outcome, run_once};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    let outcome = run_once(&cli, chrono::Utc::now()).await?;
    if let Some(output) = render_outcome(&outcome) {
        println!("{output}");
    }
    Ok(())
}
