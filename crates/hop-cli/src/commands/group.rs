//! Relay group commands

use std::io::{BufRead, Write};

use anyhow::Result;

use hop_core::reconcile::Prompter;
use hop_core::{Relay, RelayGroup};

use crate::context::AppContext;
use crate::output::{format_groups, print_info, print_success};
use crate::prompt::LinePrompter;

/// Values given on the command line for `group add`
#[derive(Debug, Default, Clone)]
pub struct GroupAddArgs {
    pub name: Option<String>,
    pub host: Option<String>,
    pub user: Option<String>,
    pub identity_file: Option<String>,
    pub port: Option<u16>,
}

/// List configured groups
pub fn group_list(ctx: &AppContext) -> Result<()> {
    println!("{}", format_groups(&ctx.topology.groups));
    Ok(())
}

/// Add a relay group, prompting for whatever the flags left out
pub fn group_add<R: BufRead, W: Write>(
    ctx: &mut AppContext,
    args: GroupAddArgs,
    prompter: &mut LinePrompter<R, W>,
) -> Result<()> {
    // Only go fully interactive when a required value is missing
    let interactive = args.name.is_none() || args.host.is_none();

    let name = match args.name {
        Some(name) => name,
        None => prompter.required("Group name")?,
    };
    let host = match args.host {
        Some(host) => host,
        None => prompter.required("Relay host (IP or FQDN)")?,
    };
    let user = match args.user {
        Some(user) => user,
        None if interactive => prompter.input("Relay user", &whoami::username())?,
        None => whoami::username(),
    };
    let identity_file = match args.identity_file {
        Some(path) => Some(path),
        None if interactive => prompter.optional("Path to relay identity file (e.g. ~/.ssh/id_rsa)")?,
        None => None,
    };

    let mut relay = Relay::new(host, user);
    if let Some(path) = identity_file {
        relay = relay.with_identity_file(path);
    }
    if let Some(port) = args.port {
        relay = relay.with_port(port);
    }
    relay.validate()?;

    let group = RelayGroup::new(name.clone(), relay);
    let target = group.relay.target();
    ctx.topology.add_group(group)?;
    ctx.save()?;

    print_success(&format!("Group '{}' added (relay {})", name, target));
    Ok(())
}

/// Remove a relay group and all of its nodes.
///
/// A group that still has nodes is only removed after confirmation, unless
/// `force` is set.
pub fn group_remove<R: BufRead, W: Write>(
    ctx: &mut AppContext,
    name: Option<String>,
    force: bool,
    prompter: &mut LinePrompter<R, W>,
) -> Result<()> {
    let name = match name {
        Some(name) => name,
        None if ctx.topology.is_empty() => {
            print_info("No relay groups to remove.");
            return Ok(());
        }
        None => {
            let names: Vec<String> = ctx.topology.groups.iter().map(|g| g.name.clone()).collect();
            let idx = prompter.select("Select group to remove", &names)?;
            names[idx].clone()
        }
    };

    let node_count = ctx.topology.find_group(&name)?.nodes.len();
    if node_count > 0
        && !force
        && !prompter.confirm(&format!(
            "Group '{}' has {} node(s) that will be removed too. Continue?",
            name, node_count
        ))?
    {
        print_info("Aborted");
        return Ok(());
    }

    ctx.topology.remove_group(&name)?;
    ctx.save()?;

    print_success(&format!("Group '{}' removed", name));
    Ok(())
}
