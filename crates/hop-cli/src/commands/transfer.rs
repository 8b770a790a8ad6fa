//! File copy command (`cp` / `scp`)

use anyhow::Result;

use hop_runner::transfer::{Direction, TransferSpec};

use crate::context::AppContext;
use crate::output::{print_info, print_success};

/// Copy between this machine and a node; exactly one side is `alias:path`
pub fn cp_command(
    ctx: &AppContext,
    source: &str,
    destination: &str,
    group: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let spec = TransferSpec::parse(source, destination)?;
    let (node, group) = ctx.topology.resolve(group, &spec.alias)?;
    group.relay.validate()?;
    node.validate()?;

    if let Direction::Upload { local, .. } = &spec.direction {
        if !local.exists() {
            anyhow::bail!("Local path {:?} does not exist", local);
        }
    }

    let pipeline = spec.pipeline(&group.relay, node);
    if dry_run {
        println!("{} | {}", pipeline.producer(), pipeline.consumer());
        return Ok(());
    }

    print_info(&format!("Copying {} -> {}...", source, destination));
    pipeline.run()?;

    print_success("Copy complete");
    Ok(())
}
