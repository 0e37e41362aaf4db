//! Server entrypoint.
//!
//! Delegates to [`prepperd::run`], which loads configuration, installs
//! telemetry, binds the listener and serves until a termination signal.

use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match prepperd::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let mut stderr = io::stderr().lock();
            let _ = writeln!(stderr, "prepperd: {error}");
            ExitCode::FAILURE
        }
    }
}
