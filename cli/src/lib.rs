//! carryon packs an executable (and optionally a prerequisite installer)
//! into a self-extracting launcher built from the `carryonrt` stub.

pub mod commands;
pub mod error_fmt;
pub mod flag;

use flag::Command;

/// # Errors
/// Returns the command's error
pub fn run(command: &Command) -> anyhow::Result<()> {
    match command {
        Command::Pack(args) => commands::pack::execute(args),
        Command::Stamp(args) => commands::stamp::execute(args),
        Command::Inspect(args) => commands::inspect::execute(args),
    }
}
