//! Command-line front end for the playground plugin installer tracker.

pub mod config;
pub mod console;
pub mod logging;
pub mod plugin_cmd;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use playground_kube_client::KubeConfigMapClient;
use playground_tracker::InstallerTracker;

use crate::config::{ConfigLoader, PlaygroundConfig};
use crate::console::Console;
use crate::plugin_cmd::PluginCli;

#[derive(Debug, Parser)]
#[command(name = "playground", version, about = "Manage plugins in a playground cluster")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Path to the kubeconfig file.
    #[arg(long = "kubeconfig", global = true, value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use instead of the current one.
    #[arg(long = "context", global = true, value_name = "NAME")]
    pub context: Option<String>,

    /// Configuration file (defaults to $PLAYGROUND_HOME/config.toml).
    #[arg(long = "config", global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase diagnostic output (-v debug, -vv trace).
    #[arg(long = "verbose", short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output.
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Track which installer manages each plugin.
    Plugin(PluginCli),
}

impl GlobalArgs {
    /// Load layered configuration, then apply command-line overrides.
    pub fn resolve_config(&self) -> anyhow::Result<PlaygroundConfig> {
        let loader = match &self.config {
            Some(path) => ConfigLoader::new().with_file(path),
            None => ConfigLoader::new(),
        };
        let mut config = loader.load().context("failed to load configuration")?;

        if let Some(path) = &self.kubeconfig {
            config.kubeconfig = Some(path.clone());
        }
        if let Some(context) = &self.context {
            config.context = Some(context.clone());
        }
        Ok(config)
    }
}

pub async fn run(cli: Cli, console: &Console) -> anyhow::Result<()> {
    let config = cli.global.resolve_config()?;
    tracing::debug!(?config, "Resolved configuration");

    let client = KubeConfigMapClient::from_kubeconfig(
        config.kubeconfig.as_deref(),
        config.context.as_deref(),
    )
    .context("could not connect to the cluster")?;
    let tracker = InstallerTracker::with_config(client, config.tracker.to_tracker_config());

    match &cli.command {
        Command::Plugin(plugin) => plugin.run(&tracker, console).await,
    }
}
