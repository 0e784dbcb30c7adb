// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use crate::{
    bringup::Bringup,
    commands::{cluster_config, ClusterArgs, Cli, Handle, HandledResult},
    docker::Docker,
    Context,
};

pub fn stop(cli: &Cli, args: &ClusterArgs) -> HandledResult<()> {
    let config = cluster_config(cli, args)?;
    let ctx = Context::new(cli.verbose);
    let docker = Docker::new(&config.network, config.subnet.as_deref());

    Bringup::new(&ctx, &config, &docker, &docker, &docker)
        .stop()
        .handle_err(|e| eprintln!("Error stopping the cluster: {e}"))
}
