use std::fmt;

use crate::types::{Guid, Lid};

/// Vendor `VirtualizationInfo` attribute (SMP attribute 0xFFB0), 64 bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct VirtualizationInfo {
    vport_cap: [u8; 2],
    reserved0: [u8; 2],
    vport_index_top: [u8; 2],
    reserved1: u8,
    virtualization_enable: u8,
    reserved2: [u8; 56],
}

impl_wire_layout!(VirtualizationInfo, 64, "VirtualizationInfo");

impl VirtualizationInfo {
    wire_fields! {
        /// Number of vports the port can host.
        vport_cap, set_vport_cap: u16;
        /// Highest vport index in use.
        vport_index_top, set_vport_index_top: u16;
    }

    wire_bits! {
        virtualization_enable, set_virtualization_enable: virtualization_enable as u8 [0x01, 0];
    }

    /// Determine whether virtualization is enabled on the port.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.virtualization_enable() != 0
    }
}

impl fmt::Debug for VirtualizationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualizationInfo")
            .field("vport_cap", &self.vport_cap())
            .field("vport_index_top", &self.vport_index_top())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Vendor `VPortInfo` attribute (SMP attribute 0xFFB2), 64 bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct VPortInfo {
    vport_state: u8,
    lid_required: u8,
    lid_by_vport_index: [u8; 2],
    reserved0: [u8; 4],
    port_guid: [u8; 8],
    vport_lid: [u8; 2],
    reserved1: [u8; 46],
}

impl_wire_layout!(VPortInfo, 64, "VPortInfo");

impl VPortInfo {
    wire_fields! {
        /// Index of the vport whose LID this vport shares, when it does not
        /// require its own.
        lid_by_vport_index, set_lid_by_vport_index: u16;
        vport_lid, set_vport_lid: Lid;
    }

    wire_bits! {
        /// Raw port state code, see [`crate::wire::PortState`].
        vport_state, set_vport_state: vport_state as u8 [0x0F, 0];
        lid_required, set_lid_required: lid_required as u8 [0x01, 0];
    }

    #[inline]
    pub fn port_guid(&self) -> Guid {
        Guid::from_be_bytes(self.port_guid)
    }

    #[inline]
    pub fn set_port_guid(&mut self, guid: Guid) {
        self.port_guid = guid.to_be_bytes();
    }

    /// Determine whether the vport needs a LID of its own.
    #[inline]
    pub fn is_lid_required(&self) -> bool {
        self.lid_required() != 0
    }
}

impl fmt::Debug for VPortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VPortInfo")
            .field("vport_state", &self.vport_state())
            .field("lid_required", &self.is_lid_required())
            .field("port_guid", &self.port_guid())
            .field("vport_lid", &self.vport_lid())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use memoffset::offset_of;

    use super::*;
    use crate::wire::test_util::{bit_field, check_bit_fields};

    #[test]
    fn layout() {
        assert_eq!(offset_of!(VirtualizationInfo, vport_index_top), 4);
        assert_eq!(offset_of!(VirtualizationInfo, virtualization_enable), 7);
        assert_eq!(offset_of!(VPortInfo, lid_by_vport_index), 2);
        assert_eq!(offset_of!(VPortInfo, port_guid), 8);
        assert_eq!(offset_of!(VPortInfo, vport_lid), 16);
    }

    #[test]
    fn virt_info_fields() {
        let mut raw = [0u8; 64];
        raw[0..2].copy_from_slice(&[0x01, 0x00]);
        raw[4..6].copy_from_slice(&[0x00, 0x81]);
        raw[7] = 0xFF;
        let vi = VirtualizationInfo::from_slice(&raw).unwrap();
        assert_eq!(vi.vport_cap(), 256);
        assert_eq!(vi.vport_index_top(), 129);
        assert!(vi.is_enabled());
    }

    #[test]
    fn vport_info_fields() {
        let mut vpi = VPortInfo::new();
        vpi.set_vport_state(0x14);
        vpi.set_lid_required(1);
        vpi.set_port_guid(Guid(0xdead_beef));
        vpi.set_vport_lid(0x20);
        let raw = vpi.as_bytes();
        assert_eq!(raw[0], 0x04);
        assert_eq!(raw[1], 0x01);
        assert_eq!(&raw[16..18], &[0x00, 0x20]);
        assert_eq!(VPortInfo::from_bytes(raw).port_guid(), Guid(0xdead_beef));
    }

    #[test]
    fn bit_fields_isolated() {
        let fields = [bit_field!(VirtualizationInfo: virtualization_enable, set_virtualization_enable as u8, 0x1, 7, [0x01])];
        check_bit_fields(VirtualizationInfo::from_bytes, VirtualizationInfo::as_bytes, &fields);

        let fields = [
            bit_field!(VPortInfo: vport_state, set_vport_state as u8, 0xF, 0, [0x0F]),
            bit_field!(VPortInfo: lid_required, set_lid_required as u8, 0x1, 1, [0x01]),
        ];
        check_bit_fields(VPortInfo::from_bytes, VPortInfo::as_bytes, &fields);
    }
}
