//! Output formatting utilities for the CLI
//!
//! Tables for relay groups and nodes, discovery results, and colored status
//! messages.

use std::net::IpAddr;

use tabled::{settings::Style, Table, Tabled};

use hop_core::{Node, RelayGroup};

/// Format relay groups as an ASCII table
///
/// Returns a hint instead of a table when nothing is configured.
pub fn format_groups(groups: &[RelayGroup]) -> String {
    if groups.is_empty() {
        return "No relay groups configured. Use 'hopgate group add' to create one.".to_string();
    }

    #[derive(Tabled)]
    struct GroupRow {
        #[tabled(rename = "GROUP")]
        name: String,
        #[tabled(rename = "RELAY")]
        relay: String,
        #[tabled(rename = "PORT")]
        port: String,
        #[tabled(rename = "IDENTITY")]
        identity: String,
        #[tabled(rename = "NODES")]
        nodes: usize,
    }

    let rows: Vec<GroupRow> = groups
        .iter()
        .map(|g| GroupRow {
            name: g.name.clone(),
            relay: g.relay.target(),
            port: g
                .relay
                .port
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
            identity: g
                .relay
                .identity_file
                .as_deref()
                .map(|p| truncate(p, 40))
                .unwrap_or_else(|| "-".to_string()),
            nodes: g.nodes.len(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format the nodes of one group as an ASCII table
pub fn format_nodes(group: &RelayGroup) -> String {
    if group.nodes.is_empty() {
        return format!("No nodes configured for group '{}'.", group.name);
    }

    #[derive(Tabled)]
    struct NodeRow {
        #[tabled(rename = "ALIAS")]
        alias: String,
        #[tabled(rename = "ADDRESS")]
        address: String,
        #[tabled(rename = "USER")]
        user: String,
    }

    let rows: Vec<NodeRow> = group
        .nodes
        .iter()
        .map(|n: &Node| NodeRow {
            alias: n.alias.clone(),
            address: n.address.clone(),
            user: n.user.clone(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// One address per line, as reported by discovery
pub fn format_hosts(hosts: &[IpAddr]) -> String {
    hosts
        .iter()
        .map(|h| format!("  {h}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncate a string with ellipsis if too long
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix
///
/// Goes to stderr.
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow with a warning symbol prefix
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan with an info symbol prefix
///
/// Goes to stderr so that stdout stays clean for command output.
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}
