//! CLI command implementations

mod config;
mod connect;
mod discover;
mod group;
mod nodes;
mod transfer;

pub use config::{config_path, config_show};
pub use connect::{connect_command, exec_command};
pub use discover::{discover_command, DiscoverArgs};
pub use group::{group_add, group_list, group_remove, GroupAddArgs};
pub use nodes::{nodes_add, nodes_list, nodes_remove, NodeAddArgs};
pub use transfer::cp_command;
