// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use clap::Args;

use crate::{
    bringup::{Bringup, BringupOutcome},
    commands::{cluster_config, ClusterArgs, Cli, Handle, HandledResult},
    config::BringupConfig,
    configure::AccountTiming,
    docker::Docker,
    Context,
};

#[derive(Args, Debug, Clone, Default)]
pub struct StartArgs {
    #[command(flatten)]
    pub cluster: ClusterArgs,

    /// CIDR for the cluster network, if it has to be created.
    #[arg(long)]
    pub subnet: Option<String>,

    /// Pull images even when they are available locally.
    #[arg(long)]
    pub always_pull: bool,

    /// Pull the images and stop.
    #[arg(long)]
    pub only_pull: bool,

    /// Publish the control system on host port 8443 instead of an ephemeral port.
    #[arg(long)]
    pub predictable: bool,

    #[arg(long)]
    pub license_url: Option<String>,

    /// `user:password` for the license URL.
    #[arg(long)]
    pub license_credentials: Option<String>,

    #[arg(long)]
    pub dont_register_gateway: bool,

    /// StreamSets Data Collector version to install on the primary.
    #[arg(long)]
    pub sdc_version: Option<String>,

    #[arg(long)]
    pub sdc_repo: Option<String>,

    #[arg(long)]
    pub dont_install_additional: bool,

    /// Value for configure.sh -defaultdb.
    #[arg(long)]
    pub default_db: Option<String>,

    /// Run filesystem and stream setup through `sudo -u <user>`.
    #[arg(long)]
    pub run_as: Option<String>,

    #[arg(long)]
    pub service_user: Option<String>,

    /// When to create and lock the service account on every node.
    #[arg(long, value_enum)]
    pub service_account: Option<AccountTiming>,

    /// Stop Warden and ZooKeeper on every node before configuring.
    #[arg(long)]
    pub stop_services_before_configure: bool,
}

impl StartArgs {
    pub fn apply(&self, config: &mut BringupConfig) {
        if self.subnet.is_some() {
            config.subnet = self.subnet.clone();
        }
        config.always_pull |= self.always_pull;
        config.only_pull |= self.only_pull;
        config.predictable |= self.predictable;
        if self.license_url.is_some() {
            config.license_url = self.license_url.clone();
        }
        if self.license_credentials.is_some() {
            config.license_credentials = self.license_credentials.clone();
        }
        config.dont_register_gateway |= self.dont_register_gateway;
        if self.sdc_version.is_some() {
            config.sdc_version = self.sdc_version.clone();
        }
        if let Some(repo) = &self.sdc_repo {
            config.sdc_repo = repo.clone();
        }
        config.dont_install_additional |= self.dont_install_additional;
        if self.default_db.is_some() {
            config.default_db = self.default_db.clone();
        }
        if self.run_as.is_some() {
            config.run_as = self.run_as.clone();
        }
        if let Some(user) = &self.service_user {
            config.service_user = user.clone();
        }
        if let Some(timing) = self.service_account {
            config.service_account = timing;
        }
        config.stop_services_before_configure |= self.stop_services_before_configure;
    }
}

pub fn start(cli: &Cli, args: &StartArgs) -> HandledResult<()> {
    let mut config = cluster_config(cli, &args.cluster)?;
    args.apply(&mut config);

    let ctx = Context::new(cli.verbose);
    let docker = Docker::new(&config.network, config.subnet.as_deref());

    let outcome = Bringup::new(&ctx, &config, &docker, &docker, &docker)
        .run()
        .handle_err(|e| eprintln!("Error bringing up the cluster: {e}"))?;

    match outcome {
        BringupOutcome::Pulled => ctx.info("Images are pulled."),
        BringupOutcome::Running(report) => {
            let host = nix::unistd::gethostname()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "localhost".to_string());
            if report.installed {
                ctx.info(
                    "StreamSets Data Collector is installed. Install additional stage libraries \
                     using rpm ...",
                );
            }
            ctx.info(&format!(
                "MapR Control System server is now accessible at https://{host}:{}",
                report.control_system_host_port
            ));
        }
    }
    Ok(())
}
