// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use crate::commands::{cluster_config, ClusterArgs, Cli, Handle, HandledResult};

pub fn validate(cli: &Cli, args: &ClusterArgs) -> HandledResult<()> {
    let config = cluster_config(cli, args)?;

    let topology = config
        .topology()
        .handle_err(|e| eprintln!("Invalid configuration: {e}"))?;

    print!("{}", topology.summary());
    println!("security: {:?}", config.security_mode());

    Ok(())
}
