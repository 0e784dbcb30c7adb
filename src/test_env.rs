// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::{
    cell::RefCell,
    io,
    net::{IpAddr, Ipv4Addr, TcpListener},
};

use crate::{
    error::{Error, Result},
    orchestrator::{AddressResolver, ContainerOrchestrator},
    remote::{CommandOutput, RemoteExecutor},
    topology::ClusterTopology,
};

/// Given a relative `path` in the test directory, prepend the full path to the test directory.
pub fn test_path(path: &str) -> String {
    std::env::var("CARGO_MANIFEST_DIR").unwrap() + "/tests/" + path
}

trait IgnoreEexist {
    fn ignore_eexist(self) -> Self;
}

impl IgnoreEexist for io::Result<()> {
    fn ignore_eexist(self) -> Self {
        match self {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// A TestEnvironment gives a test a private working directory for config files it writes, and a
/// local listener that stands in for the control system port.
pub struct TestEnvironment {
    private_dir_path: String,
    control_system: Option<TcpListener>,
}

impl TestEnvironment {
    pub fn new(test_id: &str) -> Self {
        let private_dir_path = test_path(&format!("test_output/{test_id}"));
        // Start from an empty directory so that files from a previous run don't leak in:
        match std::fs::remove_dir_all(&private_dir_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => panic!("Could not clean up test directory: {e}"),
        };

        std::fs::create_dir(test_path("test_output"))
            .ignore_eexist()
            .unwrap();
        std::fs::create_dir(&private_dir_path).unwrap();

        Self {
            private_dir_path,
            control_system: None,
        }
    }

    /// Write `contents` to `name` in the private directory and return its full path.
    pub fn write_file(&self, name: &str, contents: &str) -> String {
        let path = format!("{}/{name}", self.private_dir_path);
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Start listening on an ephemeral local port and return it. The port accepts connections
    /// for as long as the TestEnvironment lives.
    pub fn start_control_system(&mut self) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        self.control_system = Some(listener);
        port
    }

    /// A port on which nothing is listening.
    pub fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }
}

/// A RemoteExecutor that records every command it is given and replies from a script instead
/// of running anything.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    commands: RefCell<Vec<(String, String)>>,
    failures: RefCell<Vec<(String, String, i32)>>,
    responses: RefCell<Vec<(String, CommandOutput)>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands on `hostname` that contain `needle` exit with `exit_code`. A hostname of `*`
    /// matches every host.
    pub fn fail_on(&self, hostname: &str, needle: &str, exit_code: i32) {
        self.failures
            .borrow_mut()
            .push((hostname.to_string(), needle.to_string(), exit_code));
    }

    /// Commands that contain `needle` reply with `output`.
    pub fn respond(&self, needle: &str, output: CommandOutput) {
        self.responses
            .borrow_mut()
            .push((needle.to_string(), output));
    }

    /// Every (hostname, command) pair, in the order they were executed.
    pub fn commands(&self) -> Vec<(String, String)> {
        self.commands.borrow().clone()
    }

    pub fn commands_on(&self, hostname: &str) -> Vec<String> {
        self.commands
            .borrow()
            .iter()
            .filter(|(h, _)| h == hostname)
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// How many commands contained `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.commands
            .borrow()
            .iter()
            .filter(|(_, c)| c.contains(needle))
            .count()
    }
}

impl RemoteExecutor for RecordingExecutor {
    fn execute(&self, hostname: &str, command: &str) -> Result<CommandOutput> {
        self.commands
            .borrow_mut()
            .push((hostname.to_string(), command.to_string()));

        for (host, needle, exit_code) in self.failures.borrow().iter() {
            if (host == "*" || host == hostname) && command.contains(needle.as_str()) {
                return Ok(CommandOutput {
                    exit_code: *exit_code,
                    stdout: String::new(),
                    stderr: format!("simulated failure of '{needle}'"),
                });
            }
        }

        for (needle, output) in self.responses.borrow().iter() {
            if command.contains(needle.as_str()) {
                return Ok(output.clone());
            }
        }

        Ok(CommandOutput::default())
    }
}

/// A ContainerOrchestrator that only remembers what it was asked to do.
#[derive(Debug, Default)]
pub struct FakeOrchestrator {
    pub pulled: RefCell<Vec<String>>,
    pub created: RefCell<Vec<String>>,
    pub stopped: RefCell<Vec<String>>,
    pub fail_create: bool,
}

impl FakeOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContainerOrchestrator for FakeOrchestrator {
    fn pull_image_if_needed(&self, image: &str, _always: bool) -> Result<()> {
        self.pulled.borrow_mut().push(image.to_string());
        Ok(())
    }

    fn create_cluster(&self, topology: &ClusterTopology) -> Result<()> {
        if self.fail_create {
            return Err(Error::Container {
                action: "create cluster".to_string(),
                detail: "simulated failure".to_string(),
            });
        }
        self.created
            .borrow_mut()
            .extend(topology.nodes().map(|n| n.hostname().to_string()));
        Ok(())
    }

    fn stop_cluster(&self, topology: &ClusterTopology) -> Result<()> {
        self.stopped
            .borrow_mut()
            .extend(topology.nodes().map(|n| n.hostname().to_string()));
        Ok(())
    }
}

/// Resolves every node to localhost, under the `cluster` domain.
#[derive(Debug)]
pub struct FakeResolver {
    pub host_port: u16,
    /// Every container port a host port was looked up for.
    pub looked_up: RefCell<Vec<u16>>,
}

impl FakeResolver {
    pub fn new(host_port: u16) -> Self {
        FakeResolver {
            host_port,
            looked_up: RefCell::new(Vec::new()),
        }
    }
}

impl AddressResolver for FakeResolver {
    fn fqdn(&self, hostname: &str) -> String {
        format!("{hostname}.cluster")
    }

    fn ip_address(&self, _hostname: &str) -> Result<IpAddr> {
        Ok(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }

    fn host_port(&self, _hostname: &str, container_port: u16) -> Result<u16> {
        self.looked_up.borrow_mut().push(container_port);
        Ok(self.host_port)
    }
}
