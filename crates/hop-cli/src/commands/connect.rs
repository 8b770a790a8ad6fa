//! Connect and exec command implementations

use anyhow::Result;

use hop_core::{Composer, Invocation};
use hop_runner::process::{self, StdinMode};

use crate::context::AppContext;
use crate::output::print_info;

/// Resolve `alias` and build the invocation reaching it
fn compose<F>(ctx: &AppContext, alias: &str, group: Option<&str>, build: F) -> Result<Invocation>
where
    F: FnOnce(&Composer<'_>) -> Invocation,
{
    let (node, group) = ctx.topology.resolve(group, alias)?;
    group.relay.validate()?;
    node.validate()?;

    tracing::debug!("Resolved {} via group '{}'", node, group.name);
    Ok(build(&Composer::new(&group.relay, node)))
}

/// Open an interactive login shell on a node
pub fn connect_command(
    ctx: &AppContext,
    alias: &str,
    group: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let invocation = compose(ctx, alias, group, |c| c.interactive_for_stdin())?;
    if dry_run {
        println!("{invocation}");
        return Ok(());
    }

    print_info(&format!("Connecting to '{}'...", alias));
    process::run(&invocation, StdinMode::Inherit)?;
    Ok(())
}

/// Run one command on a node; its exit status becomes ours
pub fn exec_command(
    ctx: &AppContext,
    alias: &str,
    command: &[String],
    group: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let command = command.join(" ");
    if command.trim().is_empty() {
        anyhow::bail!("No command given");
    }

    let invocation = compose(ctx, alias, group, |c| c.exec(&command))?;
    if dry_run {
        println!("{invocation}");
        return Ok(());
    }

    process::run(&invocation, StdinMode::Null)?;
    Ok(())
}
