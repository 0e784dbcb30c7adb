// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use clap::Parser;

use maprdock_lib::commands::{self, Cli};

/// The maprdock binary brings MapR clusters up and down in containers.
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("MAPRDOCK_LOG", "warn"))
        .init();

    let args = Cli::parse();

    if commands::main(&args).is_err() {
        std::process::exit(1);
    }
}
