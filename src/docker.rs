// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! The `docker` CLI as container orchestrator, command transport and address resolver.
//!
//! Every container is named, and resolvable on its network, as `<hostname>.<network>`.

use std::{
    io,
    net::IpAddr,
    path::PathBuf,
    process::{Command, Output},
};

use crate::{
    error::{Error, Result},
    orchestrator::{AddressResolver, ContainerOrchestrator},
    remote::{CommandOutput, RemoteExecutor},
    topology::{ClusterTopology, MountSource, NodeSpec},
};

#[derive(Debug, Clone)]
pub struct Docker {
    network: String,
    subnet: Option<String>,
}

impl Docker {
    pub fn new(network: &str, subnet: Option<&str>) -> Self {
        Docker {
            network: network.to_string(),
            subnet: subnet.map(|s| s.to_string()),
        }
    }

    pub fn container_name(&self, hostname: &str) -> String {
        format!("{hostname}.{}", self.network)
    }

    fn docker(&self, args: &[&str]) -> io::Result<Output> {
        log::debug!("docker {}", args.join(" "));
        Command::new("docker").args(args).output()
    }

    /// Run a docker subcommand that must succeed, returning its stdout.
    fn docker_checked(&self, action: &str, args: &[&str]) -> Result<String> {
        let output = self.docker(args).map_err(|e| Error::Container {
            action: action.to_string(),
            detail: format!("could not run docker: {e}"),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::debug!("docker {} failed: {}", args.join(" "), stderr.trim());
            return Err(Error::Container {
                action: action.to_string(),
                detail: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn image_available_locally(&self, image: &str) -> Result<bool> {
        let output = self
            .docker(&["image", "inspect", image])
            .map_err(|e| Error::Container {
                action: format!("inspect image {image}"),
                detail: format!("could not run docker: {e}"),
            })?;
        Ok(output.status.success())
    }

    fn ensure_network(&self) -> Result<()> {
        let exists = self
            .docker(&["network", "inspect", &self.network])
            .map(|output| output.status.success())
            .unwrap_or(false);
        if exists {
            log::debug!("network {} already exists", self.network);
            return Ok(());
        }

        let mut args = vec!["network", "create"];
        if let Some(subnet) = &self.subnet {
            args.extend(["--subnet", subnet.as_str()]);
        }
        args.push(&self.network);
        self.docker_checked(&format!("create network {}", self.network), &args)?;
        Ok(())
    }

    /// The `docker run` arguments for one node.
    fn run_args(&self, node: &NodeSpec) -> Result<Vec<String>> {
        let name = self.container_name(node.hostname());
        let mut args: Vec<String> = vec![
            "run".into(),
            "-d".into(),
            "--privileged".into(),
            "--name".into(),
            name.clone(),
            "--hostname".into(),
            name,
            "--network".into(),
            node.network().to_string(),
        ];

        for (key, value) in node.environment().iter() {
            args.push("-e".into());
            args.push(format!("{key}={value}"));
        }

        for mount in node.volumes().iter() {
            let source = match &mount.source {
                MountSource::HostPath(path) => path.clone(),
                MountSource::ScratchDir => scratch_dir()?,
            };
            args.push("-v".into());
            args.push(format!("{}:{}", source.display(), mount.target));
        }

        for port in node.ports().iter() {
            args.push("-p".into());
            args.push(match port.host {
                Some(host) => format!("{host}:{}", port.container),
                None => port.container.to_string(),
            });
        }

        for disk in node.disks().iter() {
            args.push("--device".into());
            args.push(format!("{disk}:{disk}"));
        }

        args.push(node.image().to_string());
        Ok(args)
    }
}

/// A host directory that outlives this process, for mounts like `/run` that need a fresh,
/// writable directory per container.
fn scratch_dir() -> Result<PathBuf> {
    let dir = tempfile::Builder::new()
        .prefix("maprdock-")
        .tempdir()
        .map_err(|e| Error::Container {
            action: "create scratch directory".to_string(),
            detail: e.to_string(),
        })?;
    Ok(dir.into_path())
}

impl ContainerOrchestrator for Docker {
    fn pull_image_if_needed(&self, image: &str, always: bool) -> Result<()> {
        if !always && self.image_available_locally(image)? {
            log::debug!("image {image} is available locally");
            return Ok(());
        }
        self.docker_checked(&format!("pull image {image}"), &["pull", image])?;
        Ok(())
    }

    fn create_cluster(&self, topology: &ClusterTopology) -> Result<()> {
        self.ensure_network()?;
        for node in topology.nodes() {
            let args = self.run_args(node)?;
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            self.docker_checked(&format!("start container for {}", node.hostname()), &args)?;
        }
        Ok(())
    }

    fn stop_cluster(&self, topology: &ClusterTopology) -> Result<()> {
        for node in topology.nodes() {
            let name = self.container_name(node.hostname());
            self.docker_checked(&format!("remove container {name}"), &["rm", "-f", &name])?;
        }
        Ok(())
    }
}

impl RemoteExecutor for Docker {
    fn execute(&self, hostname: &str, command: &str) -> Result<CommandOutput> {
        let name = self.container_name(hostname);
        let transport = |source: io::Error| Error::Transport {
            hostname: hostname.to_string(),
            command: command.to_string(),
            source,
        };

        // The command may carry credentials; callers report it in masked form.
        log::debug!("docker exec {name}");
        let output = Command::new("docker")
            .args(["exec", &name, "bash", "-c", command])
            .output()
            .map_err(transport)?;

        let exit_code = output.status.code().ok_or_else(|| {
            transport(io::Error::new(
                io::ErrorKind::Interrupted,
                "docker exec was terminated by a signal",
            ))
        })?;

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl AddressResolver for Docker {
    fn fqdn(&self, hostname: &str) -> String {
        self.container_name(hostname)
    }

    fn ip_address(&self, hostname: &str) -> Result<IpAddr> {
        let name = self.container_name(hostname);
        let format = format!(
            "{{{{(index .NetworkSettings.Networks \"{}\").IPAddress}}}}",
            self.network
        );
        let stdout = self.docker_checked(
            &format!("inspect {name}"),
            &["inspect", "--format", &format, &name],
        )?;
        stdout.trim().parse().map_err(|_| Error::Container {
            action: format!("inspect {name}"),
            detail: format!("'{}' is not an IP address", stdout.trim()),
        })
    }

    fn host_port(&self, hostname: &str, container_port: u16) -> Result<u16> {
        let name = self.container_name(hostname);
        let port = format!("{container_port}/tcp");
        let action = format!("look up host port for {name}:{container_port}");
        let stdout = self.docker_checked(&action, &["port", &name, &port])?;
        parse_host_port(&stdout).ok_or_else(|| Error::Container {
            action,
            detail: format!("unexpected output: {}", stdout.trim()),
        })
    }
}

/// Parse the output of `docker port`, e.g. `0.0.0.0:32768` followed by `[::]:32768`.
fn parse_host_port(output: &str) -> Option<u16> {
    output
        .lines()
        .next()
        .and_then(|line| line.trim().rsplit(':').next())
        .and_then(|port| port.parse().ok())
}
