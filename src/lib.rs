// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::{
    io::{self, Write},
    sync::{Arc, Mutex},
};

pub mod bringup;
pub mod commands;
pub mod config;
pub mod configure;
pub mod context;
pub mod docker;
pub mod error;
pub mod install;
pub mod orchestrator;
pub mod packages;
pub mod post_config;
pub mod remote;
pub mod security;
pub mod test_env;
pub mod topology;
pub mod version;
pub mod wait;

pub use context::Context;
pub use error::{Error, Result};

pub fn default_config_path() -> String {
    match std::env::var("MAPRDOCK_CONFIG") {
        Ok(conf) => conf,
        Err(_) => "maprdock.toml".to_string(),
    }
}

pub fn default_network() -> String {
    match std::env::var("MAPRDOCK_NETWORK") {
        Ok(net) => net,
        Err(_) => "cluster".to_string(),
    }
}

pub fn default_registry() -> String {
    match std::env::var("MAPRDOCK_REGISTRY") {
        Ok(registry) => registry,
        Err(_) => "docker.io".to_string(),
    }
}

/// Where progress lines from a bring-up are written. Tests use a `Buffer` so that they can check
/// what was reported.
#[derive(Debug)]
pub enum LogStream {
    Stdout,
    Buffer(Buffer),
}

impl LogStream {
    pub fn new_stdout() -> Self {
        LogStream::Stdout
    }

    pub fn writeln(&self, line: &str) -> io::Result<()> {
        match self {
            LogStream::Stdout => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(line.as_bytes())?;
                stdout.write_all(b"\n")
            }
            LogStream::Buffer(buffer) => buffer.push(line),
        }
    }
}

/// An in-memory, cloneable sink of lines.
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, line: &str) -> io::Result<()> {
        self.lines
            .lock()
            .map_err(|_| io::Error::other("output buffer is poisoned"))?
            .push(line.to_string());
        Ok(())
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().unwrap().iter().any(|l| l.contains(needle))
    }
}
