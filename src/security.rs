// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! Secure and insecure bootstrap sequences.
//!
//! In secure mode the primary generates the cluster's security bundle and publishes it to a
//! directory shared by every container; each secondary then copies the bundle into its own
//! config directory before joining. The primary is the only writer and always finishes before
//! any secondary reads, which the sequence of blocking calls guarantees.

use crate::{
    configure::{ConfigureCommand, ConfigureSecurity},
    error::Result,
    remote::{run_steps, shell::quote, RemoteExecutor, RemoteStep, ShellChain},
    topology::{ClusterTopology, NodeSpec, SECURE_CONFIG_CONTAINER_DIR},
    Context,
};

pub const MAPR_CONFIG_DIR: &str = "/opt/mapr/conf";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SecurityMode {
    Insecure,
    Secure,
}

impl SecurityMode {
    pub fn from_flag(secure: bool) -> Self {
        if secure {
            SecurityMode::Secure
        } else {
            SecurityMode::Insecure
        }
    }
}

/// The artifacts `configure.sh -genkeys` leaves in the config directory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecurityBundle {
    pub server_ticket: &'static str,
    pub keystore: &'static str,
    pub truststore: &'static str,
}

pub const SECURITY_BUNDLE: SecurityBundle = SecurityBundle {
    server_ticket: "maprserverticket",
    keystore: "ssl_keystore",
    truststore: "ssl_truststore",
};

impl SecurityBundle {
    pub fn files(&self) -> [&'static str; 3] {
        [self.server_ticket, self.keystore, self.truststore]
    }

    /// `cp -f` every artifact from `from_dir` into `to_dir`.
    pub fn copy_command(&self, from_dir: &str, to_dir: &str) -> String {
        let sources: Vec<String> = self
            .files()
            .iter()
            .map(|file| quote(&format!("{from_dir}/{file}")).into_owned())
            .collect();
        format!("cp -f {} {}", sources.join(" "), quote(to_dir))
    }
}

#[derive(Debug)]
pub struct SecurityProvisioner {
    mode: SecurityMode,
    shared_dir: String,
}

impl SecurityProvisioner {
    pub fn new(mode: SecurityMode) -> Self {
        SecurityProvisioner {
            mode,
            shared_dir: SECURE_CONFIG_CONTAINER_DIR.to_string(),
        }
    }

    pub fn mode(&self) -> SecurityMode {
        self.mode
    }

    /// The configure steps for every node, in the order they must run.
    pub fn plan(
        &self,
        topology: &ClusterTopology,
        control_host: &str,
        default_db: Option<&str>,
    ) -> Vec<RemoteStep> {
        let configure = |node: &NodeSpec| {
            ConfigureCommand::for_node(node, control_host, self.mode)
                .with_default_db(default_db)
                .render()
        };

        match self.mode {
            SecurityMode::Insecure => topology
                .nodes()
                .map(|node| {
                    RemoteStep::new(
                        node.hostname(),
                        format!("Configuring {} ...", node.hostname()),
                        ShellChain::single(configure(node)),
                    )
                })
                .collect(),
            SecurityMode::Secure => {
                let primary = topology.primary();
                debug_assert_eq!(
                    ConfigureSecurity::for_role(self.mode, primary.role()),
                    ConfigureSecurity::GenerateKeys
                );

                let mut steps = vec![RemoteStep::new(
                    primary.hostname(),
                    format!(
                        "Configuring native security on primary {} ...",
                        primary.hostname()
                    ),
                    ShellChain::atomic()
                        .then(configure(primary))
                        .then(format!(
                            "chmod 600 {MAPR_CONFIG_DIR}/{}",
                            SECURITY_BUNDLE.keystore
                        ))
                        .then(SECURITY_BUNDLE.copy_command(MAPR_CONFIG_DIR, &self.shared_dir)),
                )];

                steps.extend(topology.secondaries().map(|node| {
                    RemoteStep::new(
                        node.hostname(),
                        format!("Configuring native security on {} ...", node.hostname()),
                        ShellChain::atomic()
                            .then(SECURITY_BUNDLE.copy_command(&self.shared_dir, MAPR_CONFIG_DIR))
                            .then(configure(node)),
                    )
                }));

                steps
            }
        }
    }

    pub fn provision(
        &self,
        ctx: &Context,
        executor: &dyn RemoteExecutor,
        topology: &ClusterTopology,
        control_host: &str,
        default_db: Option<&str>,
    ) -> Result<()> {
        match self.mode {
            SecurityMode::Insecure => ctx.info("Configuring the cluster ..."),
            SecurityMode::Secure => ctx.info("Configuring native security for the cluster ..."),
        }
        run_steps(ctx, executor, &self.plan(topology, control_host, default_db))
    }
}
