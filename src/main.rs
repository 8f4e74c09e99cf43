//! nql-rs command-line entry point.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use nql_rs::cli::{Cli, execute};

/// Installs the tracing subscriber.
///
/// `RUST_LOG` wins; otherwise `warn`, or `debug` for this crate with
/// `--verbose`. Logs go to stderr so stdout stays clean for results and
/// the MCP stdio transport.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> io::Result<()> {
    let default_filter = if verbose { "warn,nql_rs=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => builder.with_writer(io::stderr).init(),
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.log_file.as_deref()) {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("Error: failed to open log file: {e}");
        }
        return ExitCode::FAILURE;
    }

    match execute(&cli) {
        Ok(output) => {
            if !output.is_empty() {
                let mut stdout = io::stdout().lock();
                let _ = write!(stdout, "{output}");
                if !output.ends_with('\n') {
                    let _ = writeln!(stdout);
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}
