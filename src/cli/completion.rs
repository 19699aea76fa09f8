//! Shell completion generation for mongoport

use std::io::{self, Write};

use clap::CommandFactory;
use clap_complete::{Shell, generate};

use crate::cli::CliArgs;
use crate::error::Result;

/// Binary name completions are registered for.
const BIN_NAME: &str = "mongoport";

/// Completion script for `shell`
pub fn completion_script(shell: Shell) -> String {
    let mut cmd = CliArgs::command();
    let mut buffer = Vec::new();
    generate(shell, &mut cmd, BIN_NAME, &mut buffer);
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Write the completion script for `shell` to stdout
pub fn generate_completion(shell: Shell) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(completion_script(shell).as_bytes())?;
    stdout.flush()?;
    Ok(())
}
