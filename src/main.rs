//! xprintidle - print the user's idle time.
//!
//! Connects to the X server, asks the screen saver extension once for the
//! milliseconds since the last input event, prints the answer to stdout,
//! and exits.

use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use xprintidle::format;
use xprintidle::idle::xlib::XlibScreenSaver;
use xprintidle::idle::{self, Connection, IdleError};

/// Query the X server for the user's idle time
#[derive(Parser, Debug)]
#[command(name = "xprintidle")]
#[command(about, long_about = None)]
struct Args {
    /// Output the time in a human readable format
    #[arg(short = 'H', long)]
    human_readable: bool,

    /// Print the program version
    #[arg(short = 'v', long)]
    version: bool,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // clap routes help text to stdout and usage errors to stderr.
            // Requested help exits 1, a malformed command line exits 2.
            let code = if err.kind() == ErrorKind::DisplayHelp {
                ExitCode::FAILURE
            } else {
                ExitCode::from(2)
            };
            let _ = err.print();
            return code;
        }
    };

    if args.version {
        println!("xprintidle {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    init_logging();

    match run(args.human_readable) {
        Ok(line) => {
            println!("{line}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Connect, query once, and render the result for printing.
fn run(human_readable: bool) -> Result<String, IdleError> {
    let api = XlibScreenSaver::load()?;
    let conn = Connection::open(&api)?;
    let idle_millis = idle::query_idle_millis(&conn)?;
    debug!(idle_millis, "queried idle time");

    if human_readable {
        Ok(format::human_time(idle_millis))
    } else {
        Ok(idle_millis.to_string())
    }
}

/// Quiet by default; `RUST_LOG` opts into diagnostics, kept on stderr so
/// stdout stays machine readable.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
