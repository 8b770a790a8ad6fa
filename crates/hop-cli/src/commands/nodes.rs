//! Node commands

use std::io::{BufRead, Write};

use anyhow::Result;

use hop_core::reconcile::{Prompter, DEFAULT_LOGIN};
use hop_core::Node;

use crate::context::AppContext;
use crate::output::{format_nodes, print_info, print_success};
use crate::prompt::LinePrompter;

/// Values given on the command line for `nodes add`
#[derive(Debug, Default, Clone)]
pub struct NodeAddArgs {
    pub alias: Option<String>,
    pub address: Option<String>,
    pub user: Option<String>,
}

/// List the nodes of one group
pub fn nodes_list(ctx: &AppContext, group: &str) -> Result<()> {
    let group = ctx.topology.find_group(group)?;
    println!("{}", format_nodes(group));
    Ok(())
}

/// Add a node to a group, prompting for whatever the flags left out
pub fn nodes_add<R: BufRead, W: Write>(
    ctx: &mut AppContext,
    group: &str,
    args: NodeAddArgs,
    prompter: &mut LinePrompter<R, W>,
) -> Result<()> {
    // Fail on an unknown group before asking anything
    ctx.topology.find_group(group)?;

    let interactive = args.alias.is_none() || args.address.is_none();

    let alias = match args.alias {
        Some(alias) => alias,
        None => prompter.required("Node alias")?,
    };
    let address = match args.address {
        Some(address) => address,
        None => prompter.required("Node address (as seen from the relay)")?,
    };
    let user = match args.user {
        Some(user) => user,
        None if interactive => prompter.input("Node user", DEFAULT_LOGIN)?,
        None => DEFAULT_LOGIN.to_string(),
    };

    Node::new(&alias, &address, &user).validate()?;
    let node = ctx.topology.add_node(group, &alias, &address, &user)?.clone();
    ctx.save()?;

    print_success(&format!("Node {} added to group '{}'", node, group));
    Ok(())
}

/// Remove a node from a group
pub fn nodes_remove<R: BufRead, W: Write>(
    ctx: &mut AppContext,
    group: &str,
    alias: Option<String>,
    prompter: &mut LinePrompter<R, W>,
) -> Result<()> {
    let existing = ctx.topology.find_group(group)?;

    let alias = match alias {
        Some(alias) => alias,
        None if existing.nodes.is_empty() => {
            print_info(&format!("No nodes to remove in group '{}'.", group));
            return Ok(());
        }
        None => {
            let aliases: Vec<String> = existing.nodes.iter().map(|n| n.alias.clone()).collect();
            let idx = prompter.select("Select node to remove", &aliases)?;
            aliases[idx].clone()
        }
    };

    let removed = ctx.topology.remove_node(group, &alias)?;
    ctx.save()?;

    print_success(&format!("Node {} removed from group '{}'", removed, group));
    Ok(())
}
