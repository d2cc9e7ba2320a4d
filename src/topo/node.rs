use super::PhysPortId;
use crate::types::{Guid, PortNum};
use crate::wire::{NodeInfo, NodeType};

/// A node (switch, channel adapter or router) and its physical ports.
#[derive(Debug, Clone)]
pub struct Node {
    info: NodeInfo,
    description: String,

    /// Physical ports indexed by port number. Port 0 is only populated on
    /// switches.
    physps: Vec<Option<PhysPortId>>,
    discovery_count: u32,
}

impl Node {
    pub fn new(info: NodeInfo) -> Self {
        Self {
            info,
            description: String::new(),
            physps: vec![None; info.num_ports() as usize + 1],
            discovery_count: 1,
        }
    }

    #[inline]
    pub fn guid(&self) -> Guid {
        self.info.node_guid()
    }

    #[inline]
    pub fn info(&self) -> &NodeInfo {
        &self.info
    }

    /// Store a fresh `NodeInfo`. The port table grows if the node now
    /// reports more ports.
    pub fn set_info(&mut self, info: NodeInfo) {
        let len = info.num_ports() as usize + 1;
        if len > self.physps.len() {
            self.physps.resize(len, None);
        }
        self.info = info;
    }

    #[inline]
    pub fn node_type(&self) -> Option<NodeType> {
        self.info.node_type()
    }

    #[inline]
    pub fn is_switch(&self) -> bool {
        self.node_type() == Some(NodeType::Switch)
    }

    #[inline]
    pub fn num_ports(&self) -> u8 {
        self.info.num_ports()
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, desc: impl Into<String>) {
        self.description = desc.into();
    }

    /// Get the physical port with number `port`.
    #[inline]
    pub fn physp(&self, port: PortNum) -> Option<PhysPortId> {
        self.physps.get(port as usize).copied().flatten()
    }

    /// Iterate over the external ports, by ascending port number.
    pub fn external_physps(&self) -> impl Iterator<Item = (PortNum, PhysPortId)> + '_ {
        self.physps
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(num, id)| id.map(|id| (num as PortNum, id)))
    }

    /// Iterate over every physical port, port 0 included.
    pub fn physps(&self) -> impl Iterator<Item = PhysPortId> + '_ {
        self.physps.iter().flatten().copied()
    }

    #[inline]
    pub fn discovery_count(&self) -> u32 {
        self.discovery_count
    }

    pub(crate) fn mark_discovered(&mut self) {
        self.discovery_count += 1;
    }

    /// Determine whether `port` is a valid port number for this node.
    pub(crate) fn has_port_num(&self, port: PortNum) -> bool {
        (port as usize) < self.physps.len() && (port != 0 || self.is_switch())
    }

    pub(crate) fn attach(&mut self, port: PortNum, id: PhysPortId) {
        if let Some(slot) = self.physps.get_mut(port as usize) {
            *slot = Some(id);
        }
    }
}
