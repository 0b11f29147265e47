//! Notifications command

use anyhow::{Context, Result};
use atrium_core::storage::{read_string_list, StateStorage, StorageScope};
use atrium_extensions::auto_update::DISMISSED_NOTIFICATIONS_KEY;

use crate::cli::NotificationCommands;
use crate::context::StateContext;
use crate::output;

pub async fn run(cmd: NotificationCommands, ctx: &StateContext) -> Result<()> {
    match cmd {
        NotificationCommands::List => list(&ctx.storage),
        NotificationCommands::Reset => reset(&ctx.storage),
    }
}

fn dismissed(storage: &dyn StateStorage) -> Result<Vec<String>> {
    read_string_list(storage, DISMISSED_NOTIFICATIONS_KEY, StorageScope::Profile)
        .context("Failed to read dismissed notifications")
}

fn list(storage: &dyn StateStorage) -> Result<()> {
    let keys = dismissed(storage)?;
    if keys.is_empty() {
        output::info("No dismissed notifications");
        return Ok(());
    }

    output::header("Dismissed notifications");
    for key in keys {
        println!("  {}", key.replace(',', ", "));
    }
    Ok(())
}

fn reset(storage: &dyn StateStorage) -> Result<()> {
    let count = dismissed(storage)?.len();
    storage.remove(DISMISSED_NOTIFICATIONS_KEY, StorageScope::Profile)?;

    if count == 0 {
        output::info("No dismissed notifications to reset");
    } else {
        output::success(&format!("Reset {} dismissed notification(s)", count));
    }
    Ok(())
}
