//! Discover command implementation

use anyhow::Result;

use hop_core::reconcile::{reconcile, Prompter};
use hop_runner::{DiscoverOptions, TunnelOptions};

use crate::context::AppContext;
use crate::output::{format_hosts, print_info, print_success, print_warning};

/// Flags of `nodes discover`
#[derive(Debug, Clone)]
pub struct DiscoverArgs {
    pub group: String,
    pub range: String,
    pub port: u16,
    pub workers: usize,
    pub default_user: Option<String>,
    pub proxy_port: u16,
    pub direct: bool,
}

/// Scan a range behind a group's relay and offer to enroll what answers
pub async fn discover_command<P: Prompter + ?Sized>(
    ctx: &mut AppContext,
    args: DiscoverArgs,
    prompter: &mut P,
) -> Result<()> {
    let group = ctx.topology.find_group(&args.group)?;
    group.relay.validate()?;

    let options = DiscoverOptions {
        range: args.range.clone(),
        port: args.port,
        workers: args.workers,
        tunnel: TunnelOptions {
            local_port: args.proxy_port,
            ..TunnelOptions::default()
        },
        direct: args.direct,
    };

    if args.direct {
        print_info(&format!("Scanning {} for port {}...", args.range, args.port));
    } else {
        print_info(&format!(
            "Scanning {} for port {} through {}...",
            args.range,
            args.port,
            group.relay.target()
        ));
    }

    let new_hosts = hop_runner::discover(group, &options).await?;
    if new_hosts.is_empty() {
        print_info("No new hosts found.");
        return Ok(());
    }

    println!("Found {} new host(s):", new_hosts.len());
    println!("{}", format_hosts(&new_hosts));

    let group = ctx.topology.find_group_mut(&args.group)?;
    let outcome = reconcile(group, &new_hosts, args.default_user.as_deref(), prompter)?;
    for address in &outcome.skipped {
        print_warning(&format!("Skipped {}: no free alias was given", address));
    }
    if outcome.added.is_empty() {
        return Ok(());
    }

    ctx.save()?;
    print_success(&format!(
        "Added {} node(s) to group '{}'",
        outcome.added.len(),
        args.group
    ));
    Ok(())
}
