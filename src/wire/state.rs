use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Logical port state, `PortInfo:PortState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PortState {
    /// No state change. Only valid in a Set; a Get never reports it, so an
    /// update carrying it is ignored by the port model.
    NoChange = 0,

    /// Logical link is down. The physical link of the port isn't up.
    Down = 1,

    /// Logical link is Initializing.
    /// The physical link is up, but the SM hasn't yet configured the logical link.
    Init = 2,

    /// Logical link is Armed.
    /// RX packets and TX SM packets, but other TX packets will be dropped.
    Armed = 3,

    /// Logical link is Active.
    Active = 4,

    /// Logical link is Active Deferred.
    /// Return to [`PortState::Active`] if the error recovers within a timeout,
    /// or [`PortState::Down`] otherwise.
    ActiveDefer = 5,
}

impl PortState {
    /// Decode a 4-bit wire code. Reserved codes yield `None`.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::NoChange,
            1 => Self::Down,
            2 => Self::Init,
            3 => Self::Armed,
            4 => Self::Active,
            5 => Self::ActiveDefer,
            _ => return None,
        })
    }

    /// Determine whether the logical link carries data.
    pub const fn is_up(self) -> bool {
        matches!(self, Self::Armed | Self::Active | Self::ActiveDefer)
    }
}

/// Physical port state, `PortInfo:PortPhysicalState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PhysState {
    NoChange = 0,
    Sleep = 1,
    Polling = 2,
    Disabled = 3,
    PortConfigurationTraining = 4,
    LinkUp = 5,
    LinkErrorRecovery = 6,
    PhyTest = 7,
}

impl PhysState {
    /// Decode a 4-bit wire code. Reserved codes yield `None`.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::NoChange,
            1 => Self::Sleep,
            2 => Self::Polling,
            3 => Self::Disabled,
            4 => Self::PortConfigurationTraining,
            5 => Self::LinkUp,
            6 => Self::LinkErrorRecovery,
            7 => Self::PhyTest,
            _ => return None,
        })
    }
}

/// Port MTU size, as carried in `MTUCap` and `NeighborMTU`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Mtu {
    /// 256 bytes.
    Mtu256 = 1,

    /// 512 bytes.
    Mtu512 = 2,

    /// 1024 bytes.
    Mtu1024 = 3,

    /// 2048 bytes.
    Mtu2048 = 4,

    /// 4096 bytes.
    Mtu4096 = 5,
}

impl Mtu {
    /// Decode a 4-bit wire code. Reserved codes yield `None`.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            1 => Self::Mtu256,
            2 => Self::Mtu512,
            3 => Self::Mtu1024,
            4 => Self::Mtu2048,
            5 => Self::Mtu4096,
            _ => return None,
        })
    }

    /// Size in bytes.
    pub const fn bytes(self) -> usize {
        128 << (self as u8)
    }
}

impl Display for Mtu {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}B", self.bytes())
    }
}

/// Number of data VLs, as carried in `VLCap` and `OperationalVLs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OpVls {
    /// VL0.
    Vl0 = 1,

    /// VL0-1.
    Vl0To1 = 2,

    /// VL0-3.
    Vl0To3 = 3,

    /// VL0-7.
    Vl0To7 = 4,

    /// VL0-14.
    Vl0To14 = 5,
}

impl OpVls {
    /// Decode a 4-bit wire code. Reserved codes yield `None`.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            1 => Self::Vl0,
            2 => Self::Vl0To1,
            3 => Self::Vl0To3,
            4 => Self::Vl0To7,
            5 => Self::Vl0To14,
            _ => return None,
        })
    }

    /// Number of data VLs.
    pub const fn count(self) -> u8 {
        match self {
            Self::Vl0To14 => 15,
            other => 1 << (other as u8 - 1),
        }
    }
}

/// Node type, `NodeInfo:NodeType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeType {
    /// Channel adapter (HCA or TCA).
    Ca = 1,

    /// Switch.
    Switch = 2,

    /// Router.
    Router = 3,
}

impl NodeType {
    /// Decode a wire code. Reserved codes yield `None`.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            1 => Self::Ca,
            2 => Self::Switch,
            3 => Self::Router,
            _ => return None,
        })
    }
}
