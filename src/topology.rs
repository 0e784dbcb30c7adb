// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    path::PathBuf,
};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, TopologyError};

/// Port of the MapR Control System web server inside the primary container.
pub const MCS_SERVER_PORT: u16 = 8443;

/// Where the secure-mode artifacts are shared between nodes, inside every container.
pub const SECURE_CONFIG_CONTAINER_DIR: &str = "/etc/clusterdock/secure";

/// A secure cluster needs the user ticket to run commands on the primary after startup.
const SECURE_TICKETFILE_ENV: (&str, &str) =
    ("MAPR_TICKETFILE_LOCATION", "/opt/mapr/conf/mapruserticket");

/// A validated mapping of hostname to the disk devices that node's fileserver gets.
///
/// In a config file this is a plain TOML table; on the command line it is a YAML flow mapping
/// such as `{node-1: [/dev/xvdb], node-2: [/dev/xvdc]}`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct DiskMap(BTreeMap<String, Vec<String>>);

impl DiskMap {
    pub fn new() -> Self {
        DiskMap(BTreeMap::new())
    }

    pub fn from_yaml(input: &str) -> Result<Self> {
        serde_yaml::from_str::<DiskMap>(input).map_err(|e| {
            Error::ConfigurationInvariant(format!("could not parse node disks '{input}': {e}"))
        })
    }

    pub fn insert(&mut self, hostname: &str, disks: &[&str]) {
        self.0.insert(
            hostname.to_string(),
            disks.iter().map(|d| d.to_string()).collect(),
        );
    }

    pub fn get(&self, hostname: &str) -> Option<&[String]> {
        self.0.get(hostname).map(|d| d.as_slice())
    }

    pub fn hostnames(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Primary,
    Secondary,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Role::Primary => "primary",
                Role::Secondary => "secondary",
            }
        )
    }
}

/// The host side of a volume mount.
#[derive(Debug, Clone, PartialEq)]
pub enum MountSource {
    HostPath(PathBuf),
    /// A fresh, empty host directory created by the orchestrator when the container is created.
    ScratchDir,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mount {
    pub source: MountSource,
    pub target: String,
}

impl Mount {
    fn host_path(host: impl Into<PathBuf>, target: &str) -> Self {
        Mount {
            source: MountSource::HostPath(host.into()),
            target: target.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortBinding {
    pub container: u16,
    /// `None` lets the orchestrator choose an ephemeral host port.
    pub host: Option<u16>,
}

/// One planned container. Immutable once planned.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    hostname: String,
    role: Role,
    image: String,
    disks: Vec<String>,
    network: String,
    environment: Vec<(String, String)>,
    volumes: Vec<Mount>,
    ports: Vec<PortBinding>,
}

impl NodeSpec {
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn disks(&self) -> &[String] {
        &self.disks
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn environment(&self) -> &[(String, String)] {
        &self.environment
    }

    pub fn volumes(&self) -> &[Mount] {
        &self.volumes
    }

    pub fn ports(&self) -> &[PortBinding] {
        &self.ports
    }

    pub fn is_primary(&self) -> bool {
        self.role == Role::Primary
    }
}

/// The planned cluster: the primary first, then the secondaries in the order they were declared.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterTopology {
    nodes: Vec<NodeSpec>,
    network: String,
}

impl ClusterTopology {
    pub fn nodes(&self) -> impl Iterator<Item = &NodeSpec> {
        self.nodes.iter()
    }

    pub fn primary(&self) -> &NodeSpec {
        &self.nodes[0]
    }

    pub fn secondaries(&self) -> impl Iterator<Item = &NodeSpec> {
        self.nodes.iter().skip(1)
    }

    pub fn hostnames(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.hostname()).collect()
    }

    pub fn get(&self, hostname: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.hostname == hostname)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    /// A human-readable summary, one line per node.
    pub fn summary(&self) -> String {
        let mut out = format!("network: {}\n", self.network);
        for node in self.nodes.iter() {
            out.push_str(&format!(
                "{} ({}): image={} disks={}\n",
                node.hostname,
                node.role,
                node.image,
                node.disks.join(",")
            ));
        }
        out
    }
}

/// Everything about the planned containers that does not come from the hostname lists and disk
/// mapping.
#[derive(Debug, Clone)]
pub struct TopologyPlanner {
    pub network: String,
    pub primary_image: String,
    pub secondary_image: String,
    /// Host directory shared by every node in secure mode. `None` means insecure.
    pub secure_config_host_dir: Option<PathBuf>,
    /// Whether the MapR version runs on CentOS 7 and needs the cgroup and `/run` mounts.
    pub centos7: bool,
    /// The port the control system listens on in the primary container.
    pub control_system_port: u16,
    /// Publish the control system port on the same host port instead of an ephemeral one.
    pub predictable_ports: bool,
}

impl Default for TopologyPlanner {
    fn default() -> Self {
        TopologyPlanner {
            network: String::new(),
            primary_image: String::new(),
            secondary_image: String::new(),
            secure_config_host_dir: None,
            centos7: false,
            control_system_port: MCS_SERVER_PORT,
            predictable_ports: false,
        }
    }
}

impl TopologyPlanner {
    /// Validate the declared hosts against `disks` and plan every node.
    ///
    /// MapR-FS needs each fileserver node to have a disk allocated for it, and discovering a
    /// missing one halfway through a bootstrap means starting over, so this fails before
    /// anything is created.
    pub fn build(
        &self,
        primary_hostnames: &[String],
        secondary_hostnames: &[String],
        disks: &DiskMap,
    ) -> Result<ClusterTopology> {
        let primary = match primary_hostnames {
            [] => return Err(TopologyError::NoPrimary.into()),
            [primary] => primary,
            many => return Err(TopologyError::MultiplePrimaries(many.to_vec()).into()),
        };

        let mut hostnames: Vec<&str> = vec![primary.as_str()];
        for secondary in secondary_hostnames.iter() {
            if !hostnames.contains(&secondary.as_str()) {
                hostnames.push(secondary.as_str());
            }
        }

        let declared: BTreeSet<&str> = hostnames.iter().copied().collect();
        let mapped: BTreeSet<&str> = disks.hostnames().collect();
        if declared != mapped {
            return Err(TopologyError::DiskMismatch {
                missing: declared.difference(&mapped).map(|h| h.to_string()).collect(),
                extra: mapped.difference(&declared).map(|h| h.to_string()).collect(),
            }
            .into());
        }

        let nodes = hostnames
            .iter()
            .enumerate()
            .map(|(i, hostname)| {
                let role = if i == 0 {
                    Role::Primary
                } else {
                    Role::Secondary
                };
                self.plan_node(hostname, role, disks)
            })
            .collect::<Result<Vec<NodeSpec>>>()?;

        Ok(ClusterTopology {
            nodes,
            network: self.network.clone(),
        })
    }

    fn plan_node(&self, hostname: &str, role: Role, disks: &DiskMap) -> Result<NodeSpec> {
        let node_disks = disks.get(hostname).unwrap_or_default();
        if node_disks.is_empty() {
            return Err(TopologyError::NoDisks(hostname.to_string()).into());
        }

        let mut environment = Vec::new();
        let mut volumes = Vec::new();
        let mut ports = Vec::new();

        if let Some(secure_dir) = &self.secure_config_host_dir {
            volumes.push(Mount::host_path(secure_dir, SECURE_CONFIG_CONTAINER_DIR));
            if role == Role::Primary {
                let (key, value) = SECURE_TICKETFILE_ENV;
                environment.push((key.to_string(), value.to_string()));
            }
        }

        if self.centos7 {
            volumes.push(Mount::host_path("/sys/fs/cgroup", "/sys/fs/cgroup"));
            volumes.push(Mount {
                source: MountSource::ScratchDir,
                target: "/run".to_string(),
            });
        }

        if role == Role::Primary {
            ports.push(PortBinding {
                container: self.control_system_port,
                host: self.predictable_ports.then_some(self.control_system_port),
            });
        }

        Ok(NodeSpec {
            hostname: hostname.to_string(),
            role,
            image: match role {
                Role::Primary => self.primary_image.clone(),
                Role::Secondary => self.secondary_image.clone(),
            },
            disks: node_disks.to_vec(),
            network: self.network.clone(),
            environment,
            volumes,
            ports,
        })
    }
}
