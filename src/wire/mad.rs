use std::fmt;

use crate::dr::{DrPath, MAX_HOPS};
use crate::types::{AttrId, Lid};

/// Management attribute identifiers interpreted by the port model.
pub mod attr {
    use crate::types::AttrId;

    pub const CLASS_PORT_INFO: AttrId = 0x0001;
    pub const NODE_DESC: AttrId = 0x0010;
    pub const NODE_INFO: AttrId = 0x0011;
    pub const SWITCH_INFO: AttrId = 0x0012;
    pub const PORT_INFO: AttrId = 0x0015;

    /// Vendor extended port information.
    pub const MLNX_EXT_PORT_INFO: AttrId = 0xFF90;

    /// Vendor virtualization attributes.
    pub const VIRTUALIZATION_INFO: AttrId = 0xFFB0;
    pub const VPORT_STATE: AttrId = 0xFFB1;
    pub const VPORT_INFO: AttrId = 0xFFB2;
}

/// MAD base version.
pub const MAD_BASE_VERSION: u8 = 0x01;

/// Management class of LID-routed SMPs.
pub const MCLASS_SUBN_LID_ROUTED: u8 = 0x01;

/// Management class of directed-route SMPs.
pub const MCLASS_SUBN_DIR: u8 = 0x81;

/// Management class of congestion control MADs.
pub const MCLASS_CC: u8 = 0x21;

/// MAD method codes.
pub mod method {
    pub const GET: u8 = 0x01;
    pub const SET: u8 = 0x02;
    pub const GET_RESP: u8 = 0x81;
    pub const TRAP: u8 = 0x05;
}

/// The permissive LID, used as DR SLID/DLID when the whole route is
/// directed.
pub const LID_PERMISSIVE: Lid = 0xFFFF;

/// Size of the attribute data carried in an SMP.
pub const SMP_DATA_SIZE: usize = 64;

/// The common MAD header, 24 bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct MadHeader {
    base_version: u8,
    mgmt_class: u8,
    class_version: u8,
    method: u8,
    status: [u8; 2],
    class_specific: [u8; 2],
    trans_id: [u8; 8],
    attr_id: [u8; 2],
    reserved: [u8; 2],
    attr_mod: [u8; 4],
}

impl_wire_layout!(MadHeader, 24, "MadHeader");

impl MadHeader {
    wire_fields! {
        base_version, set_base_version: u8;
        mgmt_class, set_mgmt_class: u8;
        class_version, set_class_version: u8;
        method, set_method: u8;
        status, set_status: u16;
        class_specific, set_class_specific: u16;
        trans_id, set_trans_id: u64;
        attr_id, set_attr_id: AttrId;
        attr_mod, set_attr_mod: u32;
    }
}

impl fmt::Debug for MadHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MadHeader")
            .field("mgmt_class", &format_args!("{:#04x}", self.mgmt_class()))
            .field("method", &format_args!("{:#04x}", self.method()))
            .field("status", &self.status())
            .field("trans_id", &self.trans_id())
            .field("attr_id", &format_args!("{:#06x}", self.attr_id()))
            .field("attr_mod", &self.attr_mod())
            .finish()
    }
}

/// A directed-route SMP, 256 bytes.
///
/// The route is carried in `initial_path`; responders fill `return_path`
/// on the way back.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct Smp {
    base_version: u8,
    mgmt_class: u8,
    class_version: u8,
    method: u8,
    status: [u8; 2],
    hop_ptr: u8,
    hop_count: u8,
    trans_id: [u8; 8],
    attr_id: [u8; 2],
    reserved0: [u8; 2],
    attr_mod: [u8; 4],
    m_key: [u8; 8],
    dr_slid: [u8; 2],
    dr_dlid: [u8; 2],
    reserved1: [u8; 28],
    data: [u8; SMP_DATA_SIZE],
    initial_path: [u8; MAX_HOPS],
    return_path: [u8; MAX_HOPS],
}

impl_wire_layout!(Smp, 256, "Smp");

impl Smp {
    wire_fields! {
        base_version, set_base_version: u8;
        mgmt_class, set_mgmt_class: u8;
        class_version, set_class_version: u8;
        method, set_method: u8;
        hop_ptr, set_hop_ptr: u8;
        hop_count, set_hop_count: u8;
        trans_id, set_trans_id: u64;
        attr_id, set_attr_id: AttrId;
        attr_mod, set_attr_mod: u32;
        m_key, set_m_key: u64;
        dr_slid, set_dr_slid: Lid;
        dr_dlid, set_dr_dlid: Lid;
    }

    wire_bits! {
        /// Direction bit: set on the return trip.
        direction, set_direction: status as u16 [0x8000, 15];
        /// MAD status without the direction bit.
        smp_status, set_smp_status: status as u16 [0x7FFF, 0];
    }

    /// Build a directed-route Get for `attr_id` along `path`, with
    /// permissive DR SLID/DLID.
    pub fn new_dr_get(path: &DrPath, attr_id: AttrId, attr_mod: u32, trans_id: u64) -> Self {
        let mut smp = Self::new();
        smp.set_base_version(MAD_BASE_VERSION);
        smp.set_mgmt_class(MCLASS_SUBN_DIR);
        smp.set_class_version(1);
        smp.set_method(method::GET);
        smp.set_hop_ptr(0);
        smp.set_hop_count(path.hop_count());
        smp.set_trans_id(trans_id);
        smp.set_attr_id(attr_id);
        smp.set_attr_mod(attr_mod);
        smp.set_dr_slid(LID_PERMISSIVE);
        smp.set_dr_dlid(LID_PERMISSIVE);
        smp.initial_path = path.as_initial_path();
        smp
    }

    #[inline]
    pub fn data(&self) -> &[u8; SMP_DATA_SIZE] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8; SMP_DATA_SIZE] {
        &mut self.data
    }

    #[inline]
    pub fn initial_path(&self) -> &[u8; MAX_HOPS] {
        &self.initial_path
    }

    #[inline]
    pub fn return_path(&self) -> &[u8; MAX_HOPS] {
        &self.return_path
    }

    #[inline]
    pub fn return_path_mut(&mut self) -> &mut [u8; MAX_HOPS] {
        &mut self.return_path
    }

    /// Determine whether this SMP is travelling back to the requester.
    #[inline]
    pub fn is_response(&self) -> bool {
        self.direction() != 0
    }
}

impl fmt::Debug for Smp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hops = (self.hop_count() as usize).min(MAX_HOPS - 1);
        f.debug_struct("Smp")
            .field("method", &format_args!("{:#04x}", self.method()))
            .field("direction", &self.direction())
            .field("status", &self.smp_status())
            .field("hop_ptr", &self.hop_ptr())
            .field("hop_count", &self.hop_count())
            .field("attr_id", &format_args!("{:#06x}", self.attr_id()))
            .field("attr_mod", &self.attr_mod())
            .field("initial_path", &&self.initial_path[..=hops])
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use memoffset::offset_of;

    use super::*;
    use crate::wire::test_util::{assert_only_region_changed, bit_field, check_bit_fields};

    #[test]
    fn layout() {
        assert_eq!(offset_of!(MadHeader, status), 4);
        assert_eq!(offset_of!(MadHeader, trans_id), 8);
        assert_eq!(offset_of!(MadHeader, attr_id), 16);
        assert_eq!(offset_of!(MadHeader, attr_mod), 20);

        assert_eq!(offset_of!(Smp, hop_ptr), 6);
        assert_eq!(offset_of!(Smp, hop_count), 7);
        assert_eq!(offset_of!(Smp, m_key), 24);
        assert_eq!(offset_of!(Smp, dr_slid), 32);
        assert_eq!(offset_of!(Smp, data), 64);
        assert_eq!(offset_of!(Smp, initial_path), 128);
        assert_eq!(offset_of!(Smp, return_path), 192);
    }

    #[test]
    fn smp_header_matches_mad_header() {
        let path = DrPath::new(0, &[1, 3]).unwrap();
        let smp = Smp::new_dr_get(&path, attr::PORT_INFO, 3, 0x1122_3344_5566_7788);
        let raw = smp.as_bytes();

        let hdr = MadHeader::from_slice(&raw).unwrap();
        assert_eq!(hdr.mgmt_class(), MCLASS_SUBN_DIR);
        assert_eq!(hdr.method(), method::GET);
        assert_eq!(hdr.attr_id(), attr::PORT_INFO);
        assert_eq!(hdr.attr_mod(), 3);
        assert_eq!(hdr.trans_id(), 0x1122_3344_5566_7788);
    }

    #[test]
    fn dr_get_embeds_route() {
        let path = DrPath::new(0, &[1, 3, 7]).unwrap();
        let smp = Smp::new_dr_get(&path, attr::NODE_INFO, 0, 1);
        assert_eq!(smp.hop_count(), 3);
        assert_eq!(smp.hop_ptr(), 0);
        assert_eq!(&smp.initial_path()[..4], &[0, 1, 3, 7]);
        assert!(smp.initial_path()[4..].iter().all(|&b| b == 0));
        assert_eq!(smp.dr_slid(), LID_PERMISSIVE);
        assert_eq!(smp.dr_dlid(), LID_PERMISSIVE);
        assert!(!smp.is_response());
    }

    #[test]
    fn direction_bit_isolated() {
        let mut smp = Smp::from_bytes([0xA5; 256]);
        let before = smp.as_bytes();
        smp.set_direction(0);
        let mut region = [0u8; 256];
        region[4] = 0x80;
        assert_only_region_changed(&before, &smp.as_bytes(), &region);
        assert_eq!(smp.smp_status(), 0x25A5);
    }

    #[test]
    fn status_bits_isolated() {
        let fields = [
            bit_field!(Smp: direction, set_direction as u16, 0x1, 4, [0x80]),
            bit_field!(Smp: smp_status, set_smp_status as u16, 0x7FFF, 4, [0x7F, 0xFF]),
        ];
        check_bit_fields(Smp::from_bytes, Smp::as_bytes, &fields);
    }

    #[test]
    fn short_smp_rejected() {
        assert!(Smp::from_slice(&[0u8; 255]).is_err());
    }
}
