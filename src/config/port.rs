//! Free-port selection for runs that do not pin a `port`.
//!
//! A random candidate is drawn from [`DEFAULT_PORT_RANGE`] and probed with a TCP
//! connect. While the probe succeeds (something is listening), the candidate is
//! bumped by one. The upper bound of the range only limits the random draw; the
//! scan may walk past it and stops at `u16::MAX`.

use crate::error::{ConfigError, Result};
use rand::Rng;
use serde::Serialize;
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::ops::RangeInclusive;
use tracing::warn;

/// Range the initial candidate is drawn from.
pub const DEFAULT_PORT_RANGE: RangeInclusive<u16> = 25000..=55000;

/// Checks whether a port is already taken.
pub trait PortProbe {
    fn in_use(&self, port: u16) -> bool;
}

impl<F> PortProbe for F
where
    F: Fn(u16) -> bool,
{
    fn in_use(&self, port: u16) -> bool {
        self(port)
    }
}

/// Probe that attempts one TCP connection per call.
///
/// The socket is dropped before `in_use` returns, whatever the outcome.
#[derive(Debug, Clone, Copy)]
pub struct TcpProbe {
    pub host: IpAddr,
}

impl TcpProbe {
    pub fn new(host: IpAddr) -> Self {
        Self { host }
    }
}

impl PortProbe for TcpProbe {
    fn in_use(&self, port: u16) -> bool {
        is_port_in_use(self.host, port)
    }
}

/// Return true if a TCP connect to `host:port` succeeds.
pub fn is_port_in_use(host: IpAddr, port: u16) -> bool {
    TcpStream::connect(SocketAddr::new(host, port)).is_ok()
}

/// Outcome of a port allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortAllocation {
    /// The free port that was selected
    pub port: u16,
    /// The first candidate probed
    pub start: u16,
    /// Number of occupied ports skipped
    pub collisions: u32,
}

/// Selects a free port by linear scan from a random start.
pub struct PortAllocator<P> {
    probe: P,
    range: RangeInclusive<u16>,
}

impl<P: PortProbe> PortAllocator<P> {
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            range: DEFAULT_PORT_RANGE,
        }
    }

    pub fn with_range(mut self, range: RangeInclusive<u16>) -> Self {
        self.range = range;
        self
    }

    /// Draw a random start from the range and scan upward from it.
    pub fn allocate(&self) -> Result<PortAllocation> {
        let start = rand::thread_rng().gen_range(self.range.clone());
        self.allocate_from(start)
    }

    /// Scan upward from `start` until the probe reports a free port.
    ///
    /// Each collision is logged as a warning naming the next candidate.
    pub fn allocate_from(&self, start: u16) -> Result<PortAllocation> {
        let mut port = start;
        let mut collisions = 0u32;
        while self.probe.in_use(port) {
            let next = port
                .checked_add(1)
                .ok_or(ConfigError::NoFreePort { start })?;
            warn!("Port {} is already in use, switching to port {}", port, next);
            port = next;
            collisions += 1;
        }
        Ok(PortAllocation {
            port,
            start,
            collisions,
        })
    }
}
