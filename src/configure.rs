// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    remote::{shell::quote, RemoteExecutor, ShellChain},
    security::{SecurityMode, SecurityProvisioner},
    topology::{ClusterTopology, NodeSpec, Role},
    wait::Checkpoint,
    Context,
};

pub const CONFIGURE_SCRIPT: &str = "/opt/mapr/server/configure.sh";

/// Every node's configure step reads the host id this writes.
pub const HOSTID_COMMAND: &str = "/opt/mapr/server/mruuidgen > /opt/mapr/hostid";

const WARDEN_STATUS_COMMAND: &str = "service mapr-warden status";

/// The security flags a node's configure step is run with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigureSecurity {
    Insecure,
    /// `-secure -genkeys`: generates the cluster's security bundle. Primary only.
    GenerateKeys,
    /// `-secure`: joins using a security bundle copied from the primary.
    JoinSecure,
}

impl ConfigureSecurity {
    pub fn for_role(mode: SecurityMode, role: Role) -> Self {
        match (mode, role) {
            (SecurityMode::Insecure, _) => ConfigureSecurity::Insecure,
            (SecurityMode::Secure, Role::Primary) => ConfigureSecurity::GenerateKeys,
            (SecurityMode::Secure, Role::Secondary) => ConfigureSecurity::JoinSecure,
        }
    }
}

/// One invocation of `configure.sh` for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigureCommand {
    control_host: String,
    disks: Vec<String>,
    security: ConfigureSecurity,
    default_db: Option<String>,
}

impl ConfigureCommand {
    /// Configure `node` against the control services on `control_host`, with the security
    /// flags its role calls for under `mode`.
    pub fn for_node(node: &NodeSpec, control_host: &str, mode: SecurityMode) -> Self {
        ConfigureCommand {
            control_host: control_host.to_string(),
            disks: node.disks().to_vec(),
            security: ConfigureSecurity::for_role(mode, node.role()),
            default_db: None,
        }
    }

    pub fn with_default_db(mut self, default_db: Option<&str>) -> Self {
        self.default_db = default_db.map(|db| db.to_string());
        self
    }

    pub fn security(&self) -> ConfigureSecurity {
        self.security
    }

    pub fn render(&self) -> String {
        let mut command = CONFIGURE_SCRIPT.to_string();
        match self.security {
            ConfigureSecurity::Insecure => {}
            ConfigureSecurity::GenerateKeys => command.push_str(" -secure -genkeys"),
            ConfigureSecurity::JoinSecure => command.push_str(" -secure"),
        }
        command.push_str(&format!(
            " -C {0} -Z {0} -RM {0} -HS {0} -u mapr -g mapr -D {1}",
            quote(&self.control_host),
            quote(&self.disks.join(","))
        ));
        if let Some(db) = &self.default_db {
            command.push_str(&format!(" -defaultdb {}", quote(db)));
        }
        command
    }
}

impl fmt::Display for ConfigureCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// When the local service account is created and locked, relative to configure.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AccountTiming {
    #[default]
    Skip,
    BeforeConfigure,
    AfterConfigure,
}

/// Create `user` on a node if it does not exist yet, then lock its password.
pub fn service_account_chain(user: &str) -> ShellChain {
    let user = quote(user);
    ShellChain::atomic()
        .then(format!("(id -u {user} > /dev/null 2>&1 || useradd -m {user})"))
        .then(format!("passwd -l {user}"))
}

#[derive(Debug, Clone)]
pub struct ConfigureOptions {
    /// Passed as `-defaultdb` to every node's configure step.
    pub default_db: Option<String>,
    /// Stop Warden and ZooKeeper everywhere before reconfiguring.
    pub stop_services: bool,
    pub service_status: Checkpoint,
    pub service_user: String,
    pub account_timing: AccountTiming,
}

impl Default for ConfigureOptions {
    fn default() -> Self {
        ConfigureOptions {
            default_db: None,
            stop_services: false,
            service_status: Checkpoint::SERVICE_STATUS,
            service_user: "sdc".to_string(),
            account_timing: AccountTiming::Skip,
        }
    }
}

/// Drives the configure phase of a bring-up: host ids on every node, then the per-node
/// configure steps in the order the security mode requires.
pub struct ClusterConfigurator<'a> {
    ctx: &'a Context,
    executor: &'a dyn RemoteExecutor,
    options: &'a ConfigureOptions,
}

impl<'a> ClusterConfigurator<'a> {
    pub fn new(
        ctx: &'a Context,
        executor: &'a dyn RemoteExecutor,
        options: &'a ConfigureOptions,
    ) -> Self {
        ClusterConfigurator {
            ctx,
            executor,
            options,
        }
    }

    pub fn configure(
        &self,
        topology: &ClusterTopology,
        provisioner: &SecurityProvisioner,
        control_host: &str,
    ) -> Result<()> {
        if self.options.stop_services {
            self.stop_services(topology)?;
        }

        if self.options.account_timing == AccountTiming::BeforeConfigure {
            self.create_service_account(topology)?;
        }

        self.ctx.info("Generating new UUIDs ...");
        self.executor
            .run_on_all(&topology.hostnames(), HOSTID_COMMAND)?;

        provisioner.provision(
            self.ctx,
            self.executor,
            topology,
            control_host,
            self.options.default_db.as_deref(),
        )?;

        if self.options.account_timing == AccountTiming::AfterConfigure {
            self.create_service_account(topology)?;
        }

        Ok(())
    }

    fn create_service_account(&self, topology: &ClusterTopology) -> Result<()> {
        let user = &self.options.service_user;
        self.ctx
            .info(&format!("Creating and locking the {user} account on every node ..."));
        self.executor
            .run_on_all(&topology.hostnames(), &service_account_chain(user).render())
    }

    /// Stop the node-local services on every node, then wait on each until Warden reports it is
    /// no longer running.
    fn stop_services(&self, topology: &ClusterTopology) -> Result<()> {
        let stop = ShellChain::sequential()
            .then("service mapr-warden stop")
            .then("if [ -e /etc/init.d/mapr-zookeeper ]; then service mapr-zookeeper stop; fi");

        for hostname in topology.hostnames() {
            self.ctx
                .info(&format!("Stopping Warden and ZooKeeper on {hostname} ..."));
            self.executor.run_chain(hostname, &stop)?;
        }

        for hostname in topology.hostnames() {
            let elapsed = self.options.service_status.wait_until(
                &format!("Warden to stop on {hostname}"),
                || Ok(!self.executor.execute(hostname, WARDEN_STATUS_COMMAND)?.success()),
            )?;
            self.ctx.detail(&format!(
                "Warden on {hostname} stopped after {:.2} seconds.",
                elapsed.as_secs_f64()
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        remote::CommandOutput,
        test_env::RecordingExecutor,
        topology::{DiskMap, TopologyPlanner},
        Buffer,
    };

    fn topology() -> ClusterTopology {
        let mut disks = DiskMap::new();
        disks.insert("n1", &["/dev/sdb", "/dev/sdc"]);
        disks.insert("n2", &["/dev/sdd"]);
        TopologyPlanner::default()
            .build(&["n1".to_string()], &["n2".to_string()], &disks)
            .unwrap()
    }

    #[test]
    fn render_configure_commands() {
        let topology = topology();
        let primary = topology.primary();
        let secondary = topology.get("n2").unwrap();

        assert_eq!(
            ConfigureCommand::for_node(primary, "n1.cluster", SecurityMode::Insecure).render(),
            "/opt/mapr/server/configure.sh -C n1.cluster -Z n1.cluster -RM n1.cluster \
             -HS n1.cluster -u mapr -g mapr -D /dev/sdb,/dev/sdc"
        );
        assert_eq!(
            ConfigureCommand::for_node(primary, "n1.cluster", SecurityMode::Secure).render(),
            "/opt/mapr/server/configure.sh -secure -genkeys -C n1.cluster -Z n1.cluster \
             -RM n1.cluster -HS n1.cluster -u mapr -g mapr -D /dev/sdb,/dev/sdc"
        );
        assert_eq!(
            ConfigureCommand::for_node(secondary, "n1.cluster", SecurityMode::Secure)
                .with_default_db(Some("maprdb"))
                .render(),
            "/opt/mapr/server/configure.sh -secure -C n1.cluster -Z n1.cluster -RM n1.cluster \
             -HS n1.cluster -u mapr -g mapr -D /dev/sdd -defaultdb maprdb"
        );
    }

    #[test]
    fn configure_values_are_quoted() {
        let mut disks = DiskMap::new();
        disks.insert("n1", &["/dev/disk/by-id/ata-Samsung SSD"]);
        let topology = TopologyPlanner::default()
            .build(&["n1".to_string()], &[], &disks)
            .unwrap();

        let command =
            ConfigureCommand::for_node(topology.primary(), "n1.cluster", SecurityMode::Insecure)
                .with_default_db(Some("db;reboot"))
                .render();
        assert!(command.ends_with("-D '/dev/disk/by-id/ata-Samsung SSD' -defaultdb 'db;reboot'"));

        assert_eq!(
            service_account_chain("svc user").render(),
            "(id -u 'svc user' > /dev/null 2>&1 || useradd -m 'svc user') && passwd -l 'svc user'"
        );
    }

    #[test]
    fn host_ids_before_configure() {
        let ctx = Context::buffered(Buffer::new());
        let executor = RecordingExecutor::new();
        let options = ConfigureOptions::default();

        ClusterConfigurator::new(&ctx, &executor, &options)
            .configure(
                &topology(),
                &SecurityProvisioner::new(SecurityMode::Insecure),
                "n1.cluster",
            )
            .unwrap();

        let commands: Vec<String> = executor.commands().into_iter().map(|(_, c)| c).collect();
        assert_eq!(commands[0], HOSTID_COMMAND);
        assert_eq!(commands[1], HOSTID_COMMAND);
        assert!(commands[2..].iter().all(|c| c.starts_with(CONFIGURE_SCRIPT)));
        assert_eq!(commands.len(), 4);
    }

    #[test]
    fn stop_services_waits_for_warden() {
        let ctx = Context::buffered(Buffer::new());
        let executor = RecordingExecutor::new();
        executor.respond(
            WARDEN_STATUS_COMMAND,
            CommandOutput {
                exit_code: 3,
                ..Default::default()
            },
        );
        let options = ConfigureOptions {
            stop_services: true,
            ..Default::default()
        };

        ClusterConfigurator::new(&ctx, &executor, &options)
            .configure(
                &topology(),
                &SecurityProvisioner::new(SecurityMode::Insecure),
                "n1.cluster",
            )
            .unwrap();

        let n1 = executor.commands_on("n1");
        assert!(n1[0].starts_with("service mapr-warden stop"));
        assert_eq!(n1[1], WARDEN_STATUS_COMMAND);
        assert_eq!(n1[2], HOSTID_COMMAND);
    }

    #[test]
    fn service_account_timing() {
        let ctx = Context::buffered(Buffer::new());

        for (timing, position) in [
            (AccountTiming::BeforeConfigure, Some(0)),
            (AccountTiming::AfterConfigure, Some(2)),
            (AccountTiming::Skip, None),
        ] {
            let executor = RecordingExecutor::new();
            let options = ConfigureOptions {
                account_timing: timing,
                ..Default::default()
            };
            ClusterConfigurator::new(&ctx, &executor, &options)
                .configure(
                    &topology(),
                    &SecurityProvisioner::new(SecurityMode::Insecure),
                    "n1.cluster",
                )
                .unwrap();

            let n2 = executor.commands_on("n2");
            let found = n2.iter().position(|c| c.contains("passwd -l sdc"));
            assert_eq!(found, position, "{timing:?}: {n2:?}");
        }
    }

    #[test]
    fn warden_never_stops() {
        let ctx = Context::buffered(Buffer::new());
        let executor = RecordingExecutor::new();
        let options = ConfigureOptions {
            stop_services: true,
            service_status: Checkpoint {
                interval: Duration::from_millis(5),
                timeout: Duration::from_millis(20),
            },
            ..Default::default()
        };

        let result = ClusterConfigurator::new(&ctx, &executor, &options).configure(
            &topology(),
            &SecurityProvisioner::new(SecurityMode::Insecure),
            "n1.cluster",
        );

        assert!(matches!(
            result,
            Err(crate::Error::ReadinessTimeout { ref what, .. }) if what == "Warden to stop on n1"
        ));
        assert_eq!(executor.count(CONFIGURE_SCRIPT), 0);
    }
}
