//! The ibfabric prelude.
//!
//! The purpose of this module is to alleviate imports of the commonly-used
//! port model types.

pub use crate::config::{ConfigError, FabricConfig};
pub use crate::dr::{DrPath, DrPathError, DrPathSet, Reachability};
pub use crate::rate::{LinkCaps, LinkSpeed, Rate, SpeedGeneration};
pub use crate::topo::{
    Fabric, LogicalPort, MadTimeout, MadTransport, Node, PhysPortId, PhysicalPort, SnapshotCell,
    TopologyError, TopologyView,
};
pub use crate::types::*;
pub use crate::wire::{
    MlnxExtPortInfo, Mtu, NodeInfo, NodeType, OpVls, PhysState, PortInfo, PortState, Smp,
    WireError,
};
