// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! The bring-up pipeline: every step from a validated config to a running, ready cluster.
//!
//! Steps run strictly in order and the first error ends the run. Nothing is rolled back; a
//! failed bring-up is cleaned up with `stop`.

use std::{net::SocketAddr, time::Duration};

use crate::{
    config::BringupConfig,
    configure::ClusterConfigurator,
    error::Result,
    install::Installer,
    orchestrator::{AddressResolver, ContainerOrchestrator},
    packages,
    post_config::{self, Target},
    remote::RemoteExecutor,
    security::SecurityProvisioner,
    topology::ClusterTopology,
    wait::port_open,
    Context,
};

#[derive(Debug, Clone, PartialEq)]
pub struct BringupReport {
    pub primary_fqdn: String,
    /// The host port the MapR Control System is published on.
    pub control_system_host_port: u16,
    /// How long the control system took to start accepting connections.
    pub startup: Duration,
    /// Whether the optional packages were installed.
    pub installed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BringupOutcome {
    /// Only the images were pulled.
    Pulled,
    Running(BringupReport),
}

pub struct Bringup<'a> {
    ctx: &'a Context,
    config: &'a BringupConfig,
    orchestrator: &'a dyn ContainerOrchestrator,
    executor: &'a dyn RemoteExecutor,
    resolver: &'a dyn AddressResolver,
}

impl<'a> Bringup<'a> {
    pub fn new(
        ctx: &'a Context,
        config: &'a BringupConfig,
        orchestrator: &'a dyn ContainerOrchestrator,
        executor: &'a dyn RemoteExecutor,
        resolver: &'a dyn AddressResolver,
    ) -> Self {
        Bringup {
            ctx,
            config,
            orchestrator,
            executor,
            resolver,
        }
    }

    pub fn run(&self) -> Result<BringupOutcome> {
        let config = self.config;
        let topology = self.config.topology()?;
        let mapr = config.mapr_version()?;
        let mep = config.mep_version()?;
        self.ctx.detail(&topology.summary());

        self.pull_images(&topology)?;
        if config.only_pull {
            return Ok(BringupOutcome::Pulled);
        }

        self.ctx.info(&format!(
            "Starting {} containers on network {} ...",
            topology.len(),
            topology.network()
        ));
        self.orchestrator.create_cluster(&topology)?;

        let primary = topology.primary();
        let primary_fqdn = self.resolver.fqdn(primary.hostname());

        let configure_options = config.configure_options();
        ClusterConfigurator::new(self.ctx, self.executor, &configure_options).configure(
            &topology,
            &SecurityProvisioner::new(config.security_mode()),
            &primary_fqdn,
        )?;

        self.ctx
            .info("Waiting for MapR Control System server to come online ...");
        let addr = SocketAddr::new(
            self.resolver.ip_address(primary.hostname())?,
            config.readiness.control_system_port,
        );
        let startup = config
            .readiness
            .control_system()
            .wait_until("MapR Control System server to come online", || {
                port_open(addr)
            })?;
        self.ctx.info(&format!(
            "Detected MapR Control System server after {:.2} seconds.",
            startup.as_secs_f64()
        ));
        let control_system_host_port = self
            .resolver
            .host_port(primary.hostname(), config.readiness.control_system_port)?;

        let target = Target {
            hostname: primary.hostname(),
            fqdn: &primary_fqdn,
        };
        let post_config_options = config.post_config_options();
        post_config::run_all(
            self.ctx,
            self.executor,
            target,
            &post_config_options.plan(&mapr),
            post_config_options.run_as.as_deref(),
        )?;

        let installed = match config.install_version() {
            Some(sdc) => {
                self.ctx.info(&format!(
                    "Installing StreamSets Data Collector version {sdc} ..."
                ));
                let packages = packages::resolve_from(
                    &config.sdc_repo,
                    sdc,
                    &config.mapr_version,
                    config.mep_version.as_deref(),
                )?;
                Installer::new(self.ctx, self.executor, primary.hostname()).install(
                    &packages,
                    &mapr,
                    mep.as_ref(),
                )?;
                true
            }
            None => false,
        };

        Ok(BringupOutcome::Running(BringupReport {
            primary_fqdn,
            control_system_host_port,
            startup,
            installed,
        }))
    }

    fn pull_images(&self, topology: &ClusterTopology) -> Result<()> {
        let mut images: Vec<&str> = Vec::new();
        for node in topology.nodes() {
            if !images.contains(&node.image()) {
                images.push(node.image());
            }
        }

        for image in images {
            self.ctx.detail(&format!("Making sure image {image} is available ..."));
            self.orchestrator.pull_image_if_needed(
                image,
                self.config.always_pull || self.config.only_pull,
            )?;
        }
        Ok(())
    }

    /// Remove every container a bring-up with this config would have created.
    pub fn stop(&self) -> Result<()> {
        let topology = self.config.topology()?;
        self.ctx.info(&format!(
            "Removing {} containers from network {} ...",
            topology.len(),
            topology.network()
        ));
        self.orchestrator.stop_cluster(&topology)
    }
}
