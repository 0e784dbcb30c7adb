// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! Running commands on cluster nodes.
//!
//! The transport itself lives behind `RemoteExecutor`; the rest of the crate only builds
//! `ShellChain`s and hands them over, one blocking call at a time.

pub mod shell;

pub use shell::ShellChain;

use crate::{
    error::{Error, Result},
    Context,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Whatever the command printed that is most useful in an error message.
    fn diagnostic(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

pub trait RemoteExecutor {
    /// Run `command` on `hostname` and report how it exited. An `Err` means the command could
    /// not be run at all; a non-zero exit is reported in the `CommandOutput`.
    fn execute(&self, hostname: &str, command: &str) -> Result<CommandOutput>;

    /// Like `execute`, but a non-zero exit is an error.
    fn run(&self, hostname: &str, command: &str) -> Result<CommandOutput> {
        let output = self.execute(hostname, command)?;
        if output.success() {
            Ok(output)
        } else {
            Err(Error::RemoteCommand {
                hostname: hostname.to_string(),
                command: command.to_string(),
                exit_code: output.exit_code,
                output: output.diagnostic().to_string(),
            })
        }
    }

    /// Like `run`, for a chain. Errors carry the chain as displayed, with its secrets masked.
    fn run_chain(&self, hostname: &str, chain: &ShellChain) -> Result<CommandOutput> {
        self.run(hostname, &chain.render()).map_err(|e| match e {
            Error::RemoteCommand {
                hostname,
                exit_code,
                output,
                ..
            } => Error::RemoteCommand {
                hostname,
                command: chain.redacted(),
                exit_code,
                output: chain.mask(&output),
            },
            Error::Transport {
                hostname, source, ..
            } => Error::Transport {
                hostname,
                command: chain.redacted(),
                source,
            },
            e => e,
        })
    }

    /// Run `command` on every host in turn, stopping at the first failure.
    fn run_on_all(&self, hostnames: &[&str], command: &str) -> Result<()> {
        for hostname in hostnames.iter() {
            self.run(hostname, command)?;
        }
        Ok(())
    }
}

/// A command chain bound to the node it must run on.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteStep {
    pub hostname: String,
    pub description: String,
    pub chain: ShellChain,
}

impl RemoteStep {
    pub fn new(hostname: &str, description: impl Into<String>, chain: ShellChain) -> Self {
        RemoteStep {
            hostname: hostname.to_string(),
            description: description.into(),
            chain,
        }
    }

    pub fn command(&self) -> String {
        self.chain.render()
    }
}

/// Execute `steps` in order. The first failing step aborts the rest.
pub fn run_steps(ctx: &Context, executor: &dyn RemoteExecutor, steps: &[RemoteStep]) -> Result<()> {
    for step in steps.iter() {
        ctx.info(&step.description);
        ctx.detail(&format!("[{}] {}", step.hostname, step.chain));
        executor.run_chain(&step.hostname, &step.chain)?;
    }
    Ok(())
}
