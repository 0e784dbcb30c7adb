// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::{fmt, io, time::Duration};

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure that can abort a bring-up. None of these are retried: the only retry policy in
/// the system is the bounded polling in `wait`.
#[derive(Debug)]
pub enum Error {
    /// The declared hostnames and the disk mapping do not describe the same set of nodes.
    Topology(TopologyError),

    /// A version string could not be parsed.
    VersionFormat { input: String, reason: String },

    /// A combination of options that can never work, e.g. a license URL without credentials.
    ConfigurationInvariant(String),

    /// A command ran on a node and exited non-zero.
    RemoteCommand {
        hostname: String,
        command: String,
        exit_code: i32,
        output: String,
    },

    /// The executor could not run the command at all.
    Transport {
        hostname: String,
        command: String,
        source: io::Error,
    },

    /// A polling deadline elapsed.
    ReadinessTimeout {
        what: String,
        elapsed: Duration,
        timeout: Duration,
    },

    /// The container orchestrator or address resolver failed.
    Container { action: String, detail: String },
}

#[derive(Debug, PartialEq)]
pub enum TopologyError {
    NoPrimary,
    MultiplePrimaries(Vec<String>),
    /// `missing` are hostnames with no disk entry, `extra` are disk entries for unknown hosts.
    DiskMismatch {
        missing: Vec<String>,
        extra: Vec<String>,
    },
    NoDisks(String),
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyError::NoPrimary => write!(f, "no primary node was given"),
            TopologyError::MultiplePrimaries(hosts) => {
                write!(f, "exactly one primary node is supported, got {}", hosts.join(", "))
            }
            TopologyError::DiskMismatch { missing, extra } => {
                write!(f, "not all nodes are accounted for in the node disks mapping")?;
                if !missing.is_empty() {
                    write!(f, "; no disks for: {}", missing.join(", "))?;
                }
                if !extra.is_empty() {
                    write!(f, "; disks given for unknown nodes: {}", extra.join(", "))?;
                }
                Ok(())
            }
            TopologyError::NoDisks(host) => write!(f, "node '{host}' has an empty disk list"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Topology(e) => write!(f, "invalid topology: {e}"),
            Error::VersionFormat { input, reason } => {
                write!(f, "invalid version '{input}': {reason}")
            }
            Error::ConfigurationInvariant(msg) => write!(f, "invalid configuration: {msg}"),
            Error::RemoteCommand {
                hostname,
                command,
                exit_code,
                output,
            } => {
                write!(f, "command on '{hostname}' exited with {exit_code}: {command}")?;
                if !output.is_empty() {
                    write!(f, "\n{}", output.trim_end())?;
                }
                Ok(())
            }
            Error::Transport {
                hostname,
                command,
                source,
            } => write!(f, "could not run command on '{hostname}' ({command}): {source}"),
            Error::ReadinessTimeout {
                what,
                elapsed,
                timeout,
            } => write!(
                f,
                "timed out after {:.1} seconds (timeout {} seconds) waiting for {what}",
                elapsed.as_secs_f64(),
                timeout.as_secs_f64()
            ),
            Error::Container { action, detail } => write!(f, "could not {action}: {detail}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<TopologyError> for Error {
    fn from(e: TopologyError) -> Self {
        Error::Topology(e)
    }
}
