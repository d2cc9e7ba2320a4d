use std::fmt;

use super::NodeType;
use crate::types::{Guid, PortNum};

/// The IBA `NodeInfo` attribute (SMP attribute 0x0011), 40 bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct NodeInfo {
    base_version: u8,
    class_version: u8,
    node_type: u8,
    num_ports: u8,
    sys_guid: [u8; 8],
    node_guid: [u8; 8],
    port_guid: [u8; 8],
    partition_cap: [u8; 2],
    device_id: [u8; 2],
    revision: [u8; 4],
    port_num_vendor_id: [u8; 4],
}

impl_wire_layout!(NodeInfo, 40, "NodeInfo");

impl NodeInfo {
    wire_fields! {
        base_version, set_base_version: u8;
        class_version, set_class_version: u8;
        /// Number of physical ports (port 0 of a switch not included).
        num_ports, set_num_ports: u8;
        partition_cap, set_partition_cap: u16;
        device_id, set_device_id: u16;
        revision, set_revision: u32;
    }

    wire_bits! {
        /// Number of the port that received this SMP.
        local_port_num, set_local_port_num: port_num_vendor_id as u32 [0xFF00_0000, 24];
        /// IEEE OUI of the vendor.
        vendor_id, set_vendor_id: port_num_vendor_id as u32 [0x00FF_FFFF, 0];
    }

    /// Raw node type code, see [`NodeType`].
    #[inline]
    pub fn node_type_raw(&self) -> u8 {
        self.node_type
    }

    #[inline]
    pub fn set_node_type_raw(&mut self, raw: u8) {
        self.node_type = raw;
    }

    /// Decoded node type.
    #[inline]
    pub fn node_type(&self) -> Option<NodeType> {
        NodeType::from_raw(self.node_type)
    }

    #[inline]
    pub fn sys_guid(&self) -> Guid {
        Guid::from_be_bytes(self.sys_guid)
    }

    #[inline]
    pub fn set_sys_guid(&mut self, guid: Guid) {
        self.sys_guid = guid.to_be_bytes();
    }

    #[inline]
    pub fn node_guid(&self) -> Guid {
        Guid::from_be_bytes(self.node_guid)
    }

    #[inline]
    pub fn set_node_guid(&mut self, guid: Guid) {
        self.node_guid = guid.to_be_bytes();
    }

    /// GUID of the port that received this SMP. Switches report the same
    /// GUID for every port.
    #[inline]
    pub fn port_guid(&self) -> Guid {
        Guid::from_be_bytes(self.port_guid)
    }

    #[inline]
    pub fn set_port_guid(&mut self, guid: Guid) {
        self.port_guid = guid.to_be_bytes();
    }

    /// Number of the port that received this SMP, as a [`PortNum`].
    #[inline]
    pub fn local_port(&self) -> PortNum {
        self.local_port_num() as PortNum
    }
}

impl fmt::Debug for NodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeInfo")
            .field("node_type", &self.node_type())
            .field("num_ports", &self.num_ports())
            .field("node_guid", &self.node_guid())
            .field("port_guid", &self.port_guid())
            .field("local_port_num", &self.local_port_num())
            .finish_non_exhaustive()
    }
}
