// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

pub mod packages;
pub mod start;
pub mod stop;
pub mod validate;

use {packages::PackagesArgs, start::StartArgs};

use clap::{Args, Parser, Subcommand};

use crate::{config::BringupConfig, topology::DiskMap};

/// An error that has already been reported to the user, normally on stderr. Callers only pass it
/// up; the binary turns it into a non-zero exit status.
///
/// Build one with `handle_err()`, which runs the reporting code and converts the error.
#[derive(Debug, PartialEq)]
pub struct HandledError {}

pub type HandledResult<T> = std::result::Result<T, HandledError>;

pub trait Handle<T, F> {
    fn handle_err(self, handler: F) -> HandledResult<T>;
}

impl<T, E, F: FnOnce(E)> Handle<T, F> for std::result::Result<T, E> {
    /// Handle an error by running the provided `handler` code, giving it the error.
    ///
    /// Then, return a `HandledResult`, so that transitive callers of this function know that they
    /// do not need to do anything further to handle the error.
    fn handle_err(self, handler: F) -> HandledResult<T> {
        self.map_err(|e| {
            handler(e);
            HandledError {}
        })
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file to read. Defaults to $MAPRDOCK_CONFIG, then `maprdock.toml` if it exists.
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a cluster and bring it to a ready state.
    Start(StartArgs),
    /// Remove the containers of a cluster.
    Stop(ClusterArgs),
    /// Check a config and print the planned cluster.
    Validate(ClusterArgs),
    /// Print the packages an install would download.
    Packages(PackagesArgs),
}

/// Flags that describe the cluster itself. Each one given overrides the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct ClusterArgs {
    /// The primary node's hostname.
    #[arg(long, num_args = 1..)]
    pub primary_node: Vec<String>,

    /// Secondary node hostnames.
    #[arg(long, num_args = 1..)]
    pub secondary_nodes: Vec<String>,

    /// Map of node hostname to its disks, e.g. "{node-1: [/dev/xvdb], node-2: [/dev/xvdc]}".
    #[arg(long)]
    pub node_disks: Option<String>,

    #[arg(long)]
    pub network: Option<String>,

    #[arg(long)]
    pub mapr_version: Option<String>,

    #[arg(long)]
    pub mep_version: Option<String>,

    #[arg(long)]
    pub registry: Option<String>,

    #[arg(long)]
    pub namespace: Option<String>,

    /// Bring the cluster up with native security.
    #[arg(long)]
    pub secure: bool,

    /// Host directory the security artifacts are shared through.
    #[arg(long)]
    pub secure_config_directory: Option<String>,
}

impl ClusterArgs {
    pub fn apply(&self, config: &mut BringupConfig) -> crate::Result<()> {
        if !self.primary_node.is_empty() {
            config.primary_node = self.primary_node.clone();
        }
        if !self.secondary_nodes.is_empty() {
            config.secondary_nodes = self.secondary_nodes.clone();
        }
        if let Some(node_disks) = &self.node_disks {
            config.node_disks = DiskMap::from_yaml(node_disks)?;
        }
        override_with(&mut config.network, &self.network);
        override_with(&mut config.mapr_version, &self.mapr_version);
        if self.mep_version.is_some() {
            config.mep_version = self.mep_version.clone();
        }
        override_with(&mut config.registry, &self.registry);
        override_with(&mut config.namespace, &self.namespace);
        config.secure |= self.secure;
        override_with(
            &mut config.secure_config_directory,
            &self.secure_config_directory,
        );
        Ok(())
    }
}

fn override_with(field: &mut String, value: &Option<String>) {
    if let Some(value) = value {
        *field = value.clone();
    }
}

/// Read the config file named on the command line or by the environment. The default path is
/// allowed to not exist, in which case every setting starts at its default.
pub fn load_config(cli: &Cli) -> crate::Result<BringupConfig> {
    match &cli.config {
        Some(path) => BringupConfig::from_file(path),
        None => {
            let path = crate::default_config_path();
            if std::path::Path::new(&path).exists() {
                BringupConfig::from_file(&path)
            } else {
                Ok(BringupConfig::default())
            }
        }
    }
}

/// Load the config and apply the cluster flags on top of it.
fn cluster_config(cli: &Cli, args: &ClusterArgs) -> HandledResult<BringupConfig> {
    let mut config = load_config(cli).handle_err(|e| eprintln!("{e}"))?;
    args.apply(&mut config).handle_err(|e| eprintln!("{e}"))?;
    Ok(config)
}

pub fn main(cli: &Cli) -> HandledResult<()> {
    match &cli.command {
        Commands::Start(args) => start::start(cli, args),
        Commands::Stop(args) => stop::stop(cli, args),
        Commands::Validate(args) => validate::validate(cli, args),
        Commands::Packages(args) => packages::packages(args),
    }
}
