//! Auto-update command
//!
//! Edits the persisted allow/deny lists the workbench consults before
//! updating an extension. Targets containing a dot are extension
//! identifiers (`publisher.name`); anything else is a publisher.

use anyhow::{anyhow, Context, Result};
use atrium_core::config::AutoUpdateMode;
use atrium_core::storage::StateStorage;
use atrium_extensions::{should_auto_update, AutoUpdateLists, UpdateCandidate};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::{AutoUpdateCommands, AutoUpdateListArgs, AutoUpdateStatusArgs};
use crate::context::StateContext;
use crate::output;

pub async fn run(cmd: AutoUpdateCommands, ctx: &StateContext) -> Result<()> {
    let mode = ctx.settings.auto_update;
    match cmd {
        AutoUpdateCommands::Status(args) => status(args, ctx),
        AutoUpdateCommands::Allow(args) => {
            let target = Target::parse(&args.target)?;
            toggle(&ctx.storage, &target, true, mode)?;
            output::success(&format!("Auto-update enabled for {}", target));
            Ok(())
        }
        AutoUpdateCommands::Deny(args) => {
            let target = Target::parse(&args.target)?;
            toggle(&ctx.storage, &target, false, mode)?;
            output::success(&format!("Auto-update disabled for {}", target));
            Ok(())
        }
        AutoUpdateCommands::List(args) => list(args, &ctx.storage),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Extension { id: String, publisher: String },
    Publisher(String),
}

impl Target {
    fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        match raw.split_once('.') {
            Some((publisher, name)) => {
                if publisher.is_empty() || name.is_empty() {
                    return Err(anyhow!(
                        "Invalid extension identifier '{}' (expected publisher.name)",
                        raw
                    ));
                }
                Ok(Self::Extension {
                    id: raw.to_lowercase(),
                    publisher: publisher.to_lowercase(),
                })
            }
            None if raw.is_empty() => Err(anyhow!("Target must not be empty")),
            None => Ok(Self::Publisher(raw.to_lowercase())),
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Extension { id, .. } => write!(f, "extension {}", id),
            Self::Publisher(publisher) => write!(f, "publisher {}", publisher),
        }
    }
}

fn toggle(
    storage: &dyn StateStorage,
    target: &Target,
    enable: bool,
    mode: AutoUpdateMode,
) -> Result<()> {
    let mut lists = AutoUpdateLists::load(storage).context("Failed to read auto-update lists")?;
    match target {
        Target::Extension { id, publisher } => lists.set_extension(id, publisher, enable, mode),
        Target::Publisher(publisher) => lists.set_publisher(publisher, enable)?,
    }
    lists
        .save(storage)
        .context("Failed to write auto-update lists")?;
    Ok(())
}

/// One persisted list entry
#[derive(Debug, Tabled, Serialize, PartialEq, Eq)]
struct EntryRow {
    entry: String,
    kind: &'static str,
    list: &'static str,
}

fn rows(lists: &AutoUpdateLists) -> Vec<EntryRow> {
    let allowed = lists.allowed.iter().map(|entry| {
        let (entry, kind) = match entry.strip_prefix('-') {
            Some(id) => (id.to_string(), "excluded extension"),
            None if entry.contains('.') => (entry.clone(), "extension"),
            None => (entry.clone(), "publisher"),
        };
        EntryRow {
            entry,
            kind,
            list: "allowed",
        }
    });
    let denied = lists.denied.iter().map(|entry| EntryRow {
        entry: entry.clone(),
        kind: "extension",
        list: "denied",
    });
    allowed.chain(denied).collect()
}

fn list(args: AutoUpdateListArgs, storage: &dyn StateStorage) -> Result<()> {
    let lists = AutoUpdateLists::load(storage).context("Failed to read auto-update lists")?;
    let rows = rows(&lists);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        output::info("No auto-update overrides");
        return Ok(());
    }

    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);
    Ok(())
}

fn status(args: AutoUpdateStatusArgs, ctx: &StateContext) -> Result<()> {
    let mode = ctx.settings.auto_update;
    let lists =
        AutoUpdateLists::load(&ctx.storage).context("Failed to read auto-update lists")?;

    let Some(extension) = args.extension else {
        output::header("Auto-update");
        output::kv("Mode", &mode.to_string());
        output::kv(
            "Check for updates",
            if ctx.settings.auto_check_updates { "yes" } else { "no" },
        );
        output::kv("Allowed entries", &lists.allowed.len().to_string());
        output::kv("Denied entries", &lists.denied.len().to_string());
        return Ok(());
    };

    let Target::Extension { id, publisher } = Target::parse(&extension)? else {
        return Err(anyhow!(
            "Expected an extension identifier (publisher.name), found '{}'",
            extension
        ));
    };
    let candidate = UpdateCandidate {
        id: id.clone(),
        publisher,
        pinned: args.pinned,
        enabled: !args.disabled,
        disallow_install: false,
    };

    if should_auto_update(&candidate, mode, &lists) {
        output::success(&format!("{} is auto-updated (mode: {})", id, mode));
    } else {
        output::warning(&format!("{} is not auto-updated (mode: {})", id, mode));
    }
    Ok(())
}
