// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use clap::Args;

use crate::{
    commands::{Handle, HandledResult},
    packages::{resolve_from, DEFAULT_SDC_REPO},
};

#[derive(Args, Debug)]
pub struct PackagesArgs {
    #[arg(long)]
    pub sdc_version: String,

    #[arg(long)]
    pub mapr_version: String,

    #[arg(long)]
    pub mep_version: Option<String>,

    #[arg(long, default_value = DEFAULT_SDC_REPO)]
    pub sdc_repo: String,
}

pub fn packages(args: &PackagesArgs) -> HandledResult<()> {
    let set = resolve_from(
        &args.sdc_repo,
        &args.sdc_version,
        &args.mapr_version,
        args.mep_version.as_deref(),
    )
    .handle_err(|e| eprintln!("Could not resolve packages: {e}"))?;

    println!("base url: {} (el7: {})", set.base_url, set.el7);
    for package in set.packages.iter() {
        println!("{}", package.download_command());
    }

    Ok(())
}
