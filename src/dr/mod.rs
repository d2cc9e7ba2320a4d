//! Directed-route paths.
//!
//! A directed route addresses a port by the sequence of output ports taken
//! from the management node, and is the only way to reach a port before it
//! has a routable LID. Every physical port keeps a small set of alternate
//! routes so that a broken intermediate hop does not cut it off.

mod set;

use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

pub use self::set::*;
use crate::types::PortNum;

/// Size of a directed-route path array. A path holds at most
/// `MAX_HOPS - 1` hops, since element 0 is reserved.
pub const MAX_HOPS: usize = 64;

/// Number of alternate paths kept per physical port.
pub const MAX_BINDING_PORTS: usize = 8;

/// Directed-route path error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrPathError {
    /// The hop sequence does not fit in a directed-route path.
    #[error("too many hops: {len} (at most {})", MAX_HOPS - 1)]
    TooManyHops { len: usize },

    /// The path slot index is beyond the number of slots.
    #[error("path index {0} out of range")]
    IndexOutOfRange(usize),

    /// The path slot holds no path.
    #[error("no path at index {0}")]
    Unset(usize),

    /// A hop of the path leads through a port that is missing, unhealthy or
    /// unlinked. Hops are numbered from 1.
    #[error("hop {hop} is not usable")]
    HopInvalid { hop: usize },

    /// No bound path leads to the port any more.
    #[error("all directed-route paths exhausted")]
    PathExhausted,

    /// The text is not a comma-separated port list starting with 0.
    #[error("malformed path string {0:?}")]
    Malformed(String),
}

/// A directed-route path.
///
/// `path[0]` is always 0 and `path[1..=hop_count]` are the output ports,
/// exactly as the path is embedded in an SMP's `initial_path`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrPath {
    /// Index of the local port this path leaves through.
    bind: u8,

    hop_count: u8,
    path: [PortNum; MAX_HOPS],
}

impl DrPath {
    /// Create a path through `hops`, bound to local port index `bind`.
    pub fn new(bind: u8, hops: &[PortNum]) -> Result<Self, DrPathError> {
        if hops.len() >= MAX_HOPS {
            return Err(DrPathError::TooManyHops { len: hops.len() });
        }
        let mut path = [0; MAX_HOPS];
        path[1..=hops.len()].copy_from_slice(hops);
        Ok(Self {
            bind,
            hop_count: hops.len() as u8,
            path,
        })
    }

    /// The empty path, addressing the local node itself.
    #[inline]
    pub fn local(bind: u8) -> Self {
        Self {
            bind,
            hop_count: 0,
            path: [0; MAX_HOPS],
        }
    }

    /// Decode the path embedded in an SMP.
    pub fn from_initial_path(raw: &[u8; MAX_HOPS], hop_count: u8) -> Result<Self, DrPathError> {
        let len = hop_count as usize;
        if len >= MAX_HOPS {
            return Err(DrPathError::TooManyHops { len });
        }
        Self::new(0, &raw[1..=len])
    }

    /// Create the path one hop further, leaving through `port`.
    pub fn extend(&self, port: PortNum) -> Result<Self, DrPathError> {
        let len = self.hop_count as usize + 1;
        if len >= MAX_HOPS {
            return Err(DrPathError::TooManyHops { len });
        }
        let mut next = *self;
        next.path[len] = port;
        next.hop_count = len as u8;
        Ok(next)
    }

    /// Get the local port index this path is bound to.
    #[inline]
    pub fn bind(&self) -> u8 {
        self.bind
    }

    /// Get the number of hops.
    #[inline]
    pub fn hop_count(&self) -> u8 {
        self.hop_count
    }

    /// Get the output ports, first hop first.
    #[inline]
    pub fn hops(&self) -> &[PortNum] {
        &self.path[1..=self.hop_count as usize]
    }

    /// Get the path array in its SMP `initial_path` form.
    #[inline]
    pub fn as_initial_path(&self) -> [u8; MAX_HOPS] {
        self.path
    }
}

impl Default for DrPath {
    fn default() -> Self {
        Self::local(0)
    }
}

impl fmt::Debug for DrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DrPath({}, bind {})", self, self.bind)
    }
}

impl Display for DrPath {
    /// Format as `0,1,3`: the reserved leading 0 followed by every hop.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0")?;
        for hop in self.hops() {
            write!(f, ",{}", hop)?;
        }
        Ok(())
    }
}

impl FromStr for DrPath {
    type Err = DrPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let re = PATTERN
            .get_or_init(|| Regex::new(r"^0(,[0-9]{1,3})*$").expect("invalid regex pattern"));

        let s = s.trim();
        if !re.is_match(s) {
            return Err(DrPathError::Malformed(s.to_owned()));
        }
        let hops = s
            .split(',')
            .skip(1)
            .map(|h| h.parse::<PortNum>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| DrPathError::Malformed(s.to_owned()))?;
        Self::new(0, &hops)
    }
}
