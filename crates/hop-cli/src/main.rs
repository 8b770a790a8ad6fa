//! hopgate CLI
//!
//! Reach nodes that sit behind relay (bastion) hosts:
//! - Manage relay groups and their nodes
//! - Interactive shells and one-shot commands through a double ssh hop
//! - File copy over a tar stream
//! - Discovery of new nodes through a SOCKS tunnel on the relay

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hop_runner::discover::DEFAULT_SCAN_PORT;
use hop_runner::scan::DEFAULT_WORKERS;
use hop_runner::tunnel::DEFAULT_PROXY_PORT;
use hopgate::commands::{self, DiscoverArgs, GroupAddArgs, NodeAddArgs};
use hopgate::context::AppContext;
use hopgate::output::print_error;
use hopgate::prompt::LinePrompter;

#[derive(Parser)]
#[command(name = "hopgate")]
#[command(author, version, about = "SSH gateway for nodes behind bastion hosts")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "HOPGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage relay groups (bastion hosts)
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },

    /// Manage nodes within a relay group
    Nodes {
        #[command(subcommand)]
        action: NodesAction,
    },

    /// Open an interactive shell on a node
    Connect {
        /// Node alias
        alias: String,
        /// Only look for the alias in this group
        #[arg(short, long)]
        group: Option<String>,
        /// Print the ssh command instead of running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Run a command on a node
    Exec {
        /// Node alias
        alias: String,
        /// Command to run; its words are joined with spaces
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
        /// Only look for the alias in this group
        #[arg(short, long)]
        group: Option<String>,
        /// Print the ssh command instead of running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Copy files to or from a node (alias:path marks the remote side)
    /// Alias: scp
    #[command(alias = "scp")]
    Cp {
        /// Source: local path or alias:path
        source: String,
        /// Destination: local path or alias:path
        destination: String,
        /// Accepted for scp compatibility; copies are always recursive
        #[arg(short = 'r', hide = true)]
        recursive: bool,
        /// Only look for the alias in this group
        #[arg(short, long)]
        group: Option<String>,
        /// Print the process pipeline instead of running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum GroupAction {
    /// List relay groups
    List,
    /// Add a relay group (prompts for missing values)
    Add {
        /// Group name
        #[arg(short, long)]
        name: Option<String>,
        /// Relay host (IP or FQDN)
        #[arg(long)]
        host: Option<String>,
        /// Login on the relay
        #[arg(short, long)]
        user: Option<String>,
        /// Private key for the relay
        #[arg(short, long)]
        identity_file: Option<String>,
        /// ssh port of the relay
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Remove a relay group and its nodes
    Remove {
        /// Group name (prompts with a list if omitted)
        name: Option<String>,
        /// Don't ask for confirmation
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum NodesAction {
    /// List the nodes of a group
    List {
        #[arg(short, long)]
        group: String,
    },
    /// Add a node to a group (prompts for missing values)
    Add {
        #[arg(short, long)]
        group: String,
        /// Alias used to address the node
        #[arg(short, long)]
        alias: Option<String>,
        /// Address of the node as seen from the relay
        #[arg(long)]
        address: Option<String>,
        /// Login on the node
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Remove a node from a group
    Remove {
        #[arg(short, long)]
        group: String,
        /// Node alias (prompts with a list if omitted)
        alias: Option<String>,
    },
    /// Scan an address range behind the relay and enroll new nodes
    Discover {
        #[arg(short, long)]
        group: String,
        /// CIDR range to scan, e.g. 10.0.0.0/24
        #[arg(short, long)]
        range: String,
        /// Port to probe
        #[arg(long, default_value_t = DEFAULT_SCAN_PORT)]
        port: u16,
        /// Concurrent probes
        #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,
        /// Login for every new node (skips the prompt)
        #[arg(long)]
        default_user: Option<String>,
        /// Local port for the SOCKS tunnel
        #[arg(long, default_value_t = DEFAULT_PROXY_PORT)]
        proxy_port: u16,
        /// Probe from this machine instead of through the relay
        #[arg(long)]
        direct: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if hopgate::is_remote_exit(&e) {
                tracing::debug!("{}", e);
            } else {
                print_error(&format!("{:#}", e));
            }
            ExitCode::from(hopgate::exit_code(&e))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Doesn't need (or create) the file
    if let Commands::Config {
        action: ConfigAction::Path,
    } = &cli.command
    {
        return commands::config_path(cli.config.as_ref());
    }

    let mut ctx = AppContext::load(cli.config)?;
    let mut prompter = LinePrompter::stdio();

    match cli.command {
        Commands::Group { action } => match action {
            GroupAction::List => commands::group_list(&ctx)?,
            GroupAction::Add {
                name,
                host,
                user,
                identity_file,
                port,
            } => {
                let args = GroupAddArgs {
                    name,
                    host,
                    user,
                    identity_file,
                    port,
                };
                commands::group_add(&mut ctx, args, &mut prompter)?;
            }
            GroupAction::Remove { name, force } => {
                commands::group_remove(&mut ctx, name, force, &mut prompter)?;
            }
        },

        Commands::Nodes { action } => match action {
            NodesAction::List { group } => commands::nodes_list(&ctx, &group)?,
            NodesAction::Add {
                group,
                alias,
                address,
                user,
            } => {
                let args = NodeAddArgs {
                    alias,
                    address,
                    user,
                };
                commands::nodes_add(&mut ctx, &group, args, &mut prompter)?;
            }
            NodesAction::Remove { group, alias } => {
                commands::nodes_remove(&mut ctx, &group, alias, &mut prompter)?;
            }
            NodesAction::Discover {
                group,
                range,
                port,
                workers,
                default_user,
                proxy_port,
                direct,
            } => {
                let args = DiscoverArgs {
                    group,
                    range,
                    port,
                    workers,
                    default_user,
                    proxy_port,
                    direct,
                };
                commands::discover_command(&mut ctx, args, &mut prompter).await?;
            }
        },

        Commands::Connect {
            alias,
            group,
            dry_run,
        } => {
            commands::connect_command(&ctx, &alias, group.as_deref(), dry_run)?;
        }

        Commands::Exec {
            alias,
            command,
            group,
            dry_run,
        } => {
            commands::exec_command(&ctx, &alias, &command, group.as_deref(), dry_run)?;
        }

        Commands::Cp {
            source,
            destination,
            recursive: _,
            group,
            dry_run,
        } => {
            commands::cp_command(&ctx, &source, &destination, group.as_deref(), dry_run)?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_show(&ctx)?,
            ConfigAction::Path => println!("{}", ctx.store.path().display()),
        },
    }

    Ok(())
}
