// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! Bounded polling. This is the only place in a bring-up that retries anything.

use std::{
    io,
    net::{SocketAddr, TcpStream},
    time::{Duration, Instant},
};

use crate::error::{Error, Result};

/// How a wait ended. Both variants carry the time elapsed since the wait began.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Readiness {
    Ready(Duration),
    TimedOut(Duration),
}

impl Readiness {
    /// Turn a timeout into an error describing `what` was being waited for.
    pub fn into_result(self, what: &str, timeout: Duration) -> Result<Duration> {
        match self {
            Readiness::Ready(elapsed) => Ok(elapsed),
            Readiness::TimedOut(elapsed) => Err(Error::ReadinessTimeout {
                what: what.to_string(),
                elapsed,
                timeout,
            }),
        }
    }
}

/// Evaluate `condition` every `interval` until it returns true or `timeout` has elapsed.
///
/// An error from `condition` is not "not ready yet": it ends the wait immediately and is
/// returned to the caller.
pub fn wait_for<F, E>(
    mut condition: F,
    interval: Duration,
    timeout: Duration,
) -> std::result::Result<Readiness, E>
where
    F: FnMut() -> std::result::Result<bool, E>,
{
    let start = Instant::now();
    loop {
        if condition()? {
            return Ok(Readiness::Ready(start.elapsed()));
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Ok(Readiness::TimedOut(elapsed));
        }

        std::thread::sleep(interval);
    }
}

/// The polling parameters for one place in the bring-up that waits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Checkpoint {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Checkpoint {
    /// The MapR Control System port on the primary.
    pub const CONTROL_SYSTEM: Checkpoint = Checkpoint {
        interval: Duration::from_secs(3),
        timeout: Duration::from_secs(180),
    };

    /// A per-node service status check.
    pub const SERVICE_STATUS: Checkpoint = Checkpoint {
        interval: Duration::from_secs(1),
        timeout: Duration::from_secs(30),
    };

    /// Wait for `condition`, failing with `ReadinessTimeout` naming `what` if it never holds.
    pub fn wait_until<F>(&self, what: &str, condition: F) -> Result<Duration>
    where
        F: FnMut() -> Result<bool>,
    {
        wait_for(condition, self.interval, self.timeout)?.into_result(what, self.timeout)
    }
}

/// Is something accepting TCP connections on `addr`?
///
/// Refused, reset, and timed-out connections mean "not yet". Only an address that can never be
/// connected to is an error.
pub fn port_open(addr: SocketAddr) -> Result<bool> {
    match TcpStream::connect_timeout(&addr, Duration::from_secs(1)) {
        Ok(_) => Ok(true),
        Err(e)
            if matches!(
                e.kind(),
                io::ErrorKind::InvalidInput | io::ErrorKind::PermissionDenied
            ) =>
        {
            Err(Error::Transport {
                hostname: addr.ip().to_string(),
                command: format!("connect to port {}", addr.port()),
                source: e,
            })
        }
        Err(_) => Ok(false),
    }
}
