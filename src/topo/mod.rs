//! The port/link object model.
//!
//! A [`Fabric`] owns every node, physical port and logical port it has
//! discovered. Physical ports live in an arena and refer to each other by
//! [`PhysPortId`]; logical ports and nodes are keyed by GUID. Nothing holds
//! an owning reference to anything else, so removing a node never leaves a
//! dangling pointer behind, only ids that no longer resolve.
//!
//! The model has a single writer: the sweep driver owns `&mut Fabric`.
//! Concurrent readers work on immutable snapshots published through a
//! [`SnapshotCell`] at the end of each sweep.

mod cc;
mod fabric;
mod link;
mod node;
mod physp;
mod port;
mod route;
mod snapshot;
mod summary;
mod vport;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::cc::*;
pub use self::fabric::*;
pub use self::node::*;
pub use self::physp::*;
pub use self::port::*;
pub use self::route::*;
pub use self::snapshot::*;
pub use self::summary::*;
pub use self::vport::*;
use crate::dr::DrPathError;
use crate::types::{Guid, PortNum};
use crate::wire::WireError;

/// Handle of a physical port in a [`Fabric`].
///
/// Ids are never reused within the lifetime of a fabric, so an id kept past
/// the removal of its port resolves to [`TopologyError::PortNotFound`]
/// instead of to some other port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PhysPortId(u32);

impl PhysPortId {
    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PhysPortId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "physp#{}", self.0)
    }
}

/// Topology error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// The physical port does not exist (or was removed).
    #[error("{0} not found")]
    PortNotFound(PhysPortId),

    /// No logical port has this GUID.
    #[error("logical port {0} not found")]
    LogicalPortNotFound(Guid),

    /// No node has this GUID.
    #[error("node {0} not found")]
    NodeNotFound(Guid),

    /// The port number is beyond the node's port count.
    #[error("node {node} has no port {port}")]
    BadPortNum { node: Guid, port: PortNum },

    /// A physical port with this number already exists on the node.
    #[error("node {node} already has port {port}")]
    DuplicatePort { node: Guid, port: PortNum },

    /// One of the two ports is already linked to a third port.
    #[error("link already exists on {a} or {b}")]
    LinkAlreadyExists { a: PhysPortId, b: PhysPortId },

    /// The port has no link partner (or not the one named).
    #[error("{0} is not linked")]
    NotLinked(PhysPortId),

    /// The vport index is beyond the advertised top index, or the vport is
    /// absent.
    #[error("unknown vport index {0}")]
    UnknownVportIndex(u16),

    /// The attribute modifier does not fit a vport index.
    #[error("vport index {0:#x} out of range")]
    VportIndexOutOfRange(u32),

    /// The physical port belongs to a different node than the logical port.
    #[error("{port} is not on node {node}")]
    PortOnOtherNode { port: PhysPortId, node: Guid },

    /// The physical port already belongs to another logical port.
    #[error("{port} already belongs to logical port {owner}")]
    PortAlreadyOwned { port: PhysPortId, owner: Guid },

    /// The logical port has fewer physical ports than the index.
    #[error("no physical port at index {index}")]
    NoPhysicalPort { index: usize },

    /// Directed routes need the local (SM) node, which has not been set.
    #[error("local node is not set")]
    NoLocalNode,

    /// Attribute decoding error.
    #[error("attribute codec error")]
    Wire(#[from] WireError),

    /// Directed-route path error.
    #[error("directed-route path error")]
    DrPath(#[from] DrPathError),
}

/// Read-only health query against the live topology.
pub trait TopologyView {
    /// Determine whether the port with this GUID exists and is healthy.
    fn is_port_healthy(&self, guid: Guid) -> bool;
}
