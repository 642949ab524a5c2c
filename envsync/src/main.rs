use clap::Parser;
use std::process::ExitCode;

use envsync::tracing_support::{init_subscriber, TracingConfig};
use envsync::Cli;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_subscriber(TracingConfig::from_verbosity(cli.verbose, cli.log_format));

    let ok = envsync::run(&cli, &mut std::io::stdout().lock())?;
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
