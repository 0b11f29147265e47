//! Config command

use anyhow::Result;

use crate::cli::{ConfigCommands, ConfigShowArgs};
use crate::context::StateContext;
use crate::output;

pub async fn run(cmd: ConfigCommands, ctx: &StateContext) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => show(args, ctx),
    }
}

fn show(args: ConfigShowArgs, ctx: &StateContext) -> Result<()> {
    if args.json {
        let json = serde_json::to_string_pretty(&ctx.settings)?;
        println!("{}", json);
        return Ok(());
    }

    output::header("Settings");
    output::kv("Config file", ctx.loader.settings_path().as_str());
    output::kv("State directory", ctx.storage.dir().as_str());
    println!();
    print!("{}", serde_yaml_ng::to_string(&ctx.settings)?);

    Ok(())
}
