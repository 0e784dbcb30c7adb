// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! The container side of a bring-up: images, containers, and how nodes are addressed.

use std::net::IpAddr;

use crate::{error::Result, topology::ClusterTopology};

pub trait ContainerOrchestrator {
    /// Make `image` available locally, pulling it when it is missing or `always` is set.
    fn pull_image_if_needed(&self, image: &str, always: bool) -> Result<()>;

    /// Create and start one container per planned node, wired to the topology's network.
    fn create_cluster(&self, topology: &ClusterTopology) -> Result<()>;

    fn stop_cluster(&self, topology: &ClusterTopology) -> Result<()>;
}

pub trait AddressResolver {
    /// The fully-qualified name other nodes use to reach `hostname`.
    fn fqdn(&self, hostname: &str) -> String;

    /// The address the control host can reach `hostname` on.
    fn ip_address(&self, hostname: &str) -> Result<IpAddr>;

    /// The host port bound to `container_port` of `hostname`.
    fn host_port(&self, hostname: &str, container_port: u16) -> Result<u16>;
}
