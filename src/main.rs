use clap::Parser;
use mirrorsync::commands::sync;
use mirrorsync::config::Cli;
use mirrorsync::executor::{ConfirmationSource, LinePrompt, TrustAll};
use mirrorsync::ui::ProgressReporter;
use mirrorsync::Config;
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Some operations failed, or prompting stopped early
const EXIT_INCOMPLETE: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    // Convert CLI args to Config - this validates immediately
    let config = Config::try_from(cli)?;
    tracing::debug!(?config, "configuration validated");

    let reporter = Arc::new(ProgressReporter::new());
    let stdin = io::stdin();
    let mut confirm: Box<dyn ConfirmationSource> = if config.assume_trust {
        Box::new(TrustAll)
    } else {
        Box::new(LinePrompt::new(stdin.lock(), console::Term::stderr()))
    };

    let report = sync::run(&config, confirm.as_mut(), reporter)?;
    if report.is_incomplete() {
        Ok(ExitCode::from(EXIT_INCOMPLETE))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Install the stderr subscriber; `RUST_LOG` overrides the default level
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
