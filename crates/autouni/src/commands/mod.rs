//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod auth;
pub mod buildings;
pub mod config_cmd;
pub mod devices;
pub mod energy;
pub mod notifications;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;

/// Dispatch a backend-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    resolved: Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => auth::login(args, &resolved, global).await,
        Command::Logout => auth::logout(&resolved, global).await,
        Command::Whoami => auth::whoami(&resolved, global).await,
        Command::Devices(args) => devices::handle(args, resolved, global).await,
        Command::Buildings(args) => buildings::handle(args, &resolved, global).await,
        Command::Energy(args) => energy::handle(args, &resolved, global).await,
        Command::Notifications(args) => notifications::handle(args, &resolved, global).await,
        Command::Watch(args) => watch::handle(args, resolved, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions run without a backend".into(),
        )),
    }
}
