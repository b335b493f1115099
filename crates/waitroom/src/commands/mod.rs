//! Command dispatch: bridges CLI args -> core sessions -> output formatting.

pub mod capacity;
pub mod config_cmd;
pub mod join;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Join(args) => join::handle(args, global).await,
        Command::Capacity(args) => capacity::handle(args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
