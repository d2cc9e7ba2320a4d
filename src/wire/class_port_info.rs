use std::fmt;

use crate::types::Lid;

/// The IBA `ClassPortInfo` attribute (attribute 0x0001), 72 bytes.
///
/// Every management class reports one; the port model keeps the congestion
/// control class copy of it in its side tables.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ClassPortInfo {
    base_version: u8,
    class_version: u8,
    capability_mask: [u8; 2],
    cap_mask2_resp_time: [u8; 4],
    redir_gid: [u8; 16],
    redir_tc_sl_fl: [u8; 4],
    redir_lid: [u8; 2],
    redir_pkey: [u8; 2],
    redir_qp: [u8; 4],
    redir_qkey: [u8; 4],
    trap_gid: [u8; 16],
    trap_tc_sl_fl: [u8; 4],
    trap_lid: [u8; 2],
    trap_pkey: [u8; 2],
    trap_hop_qp: [u8; 4],
    trap_qkey: [u8; 4],
}

impl_wire_layout!(ClassPortInfo, 72, "ClassPortInfo");

impl ClassPortInfo {
    wire_fields! {
        base_version, set_base_version: u8;
        class_version, set_class_version: u8;
        /// Class-specific capability mask.
        capability_mask, set_capability_mask: u16;
        redir_lid, set_redir_lid: Lid;
        redir_pkey, set_redir_pkey: u16;
        redir_qkey, set_redir_qkey: u32;
        trap_lid, set_trap_lid: Lid;
        trap_pkey, set_trap_pkey: u16;
        trap_qkey, set_trap_qkey: u32;
    }

    wire_bits! {
        /// 27-bit capability mask 2.
        capability_mask2, set_capability_mask2: cap_mask2_resp_time as u32 [0xFFFF_FFE0, 5];
        /// Response time value (log2 of 4.096us units).
        resp_time_value, set_resp_time_value: cap_mask2_resp_time as u32 [0x0000_001F, 0];
        redir_tc, set_redir_tc: redir_tc_sl_fl as u32 [0xFF00_0000, 24];
        redir_sl, set_redir_sl: redir_tc_sl_fl as u32 [0x00F0_0000, 20];
        redir_fl, set_redir_fl: redir_tc_sl_fl as u32 [0x000F_FFFF, 0];
        redir_qp, set_redir_qp: redir_qp as u32 [0x00FF_FFFF, 0];
        trap_tc, set_trap_tc: trap_tc_sl_fl as u32 [0xFF00_0000, 24];
        trap_sl, set_trap_sl: trap_tc_sl_fl as u32 [0x00F0_0000, 20];
        trap_fl, set_trap_fl: trap_tc_sl_fl as u32 [0x000F_FFFF, 0];
        trap_hop_limit, set_trap_hop_limit: trap_hop_qp as u32 [0xFF00_0000, 24];
        trap_qp, set_trap_qp: trap_hop_qp as u32 [0x00FF_FFFF, 0];
    }

    #[inline]
    pub fn redir_gid(&self) -> [u8; 16] {
        self.redir_gid
    }

    #[inline]
    pub fn set_redir_gid(&mut self, gid: [u8; 16]) {
        self.redir_gid = gid;
    }

    #[inline]
    pub fn trap_gid(&self) -> [u8; 16] {
        self.trap_gid
    }

    #[inline]
    pub fn set_trap_gid(&mut self, gid: [u8; 16]) {
        self.trap_gid = gid;
    }
}

impl fmt::Debug for ClassPortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassPortInfo")
            .field("class_version", &self.class_version())
            .field("capability_mask", &format_args!("{:#06x}", self.capability_mask()))
            .field("resp_time_value", &self.resp_time_value())
            .field("trap_lid", &self.trap_lid())
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
        assert_eq!(offset_of!(ClassPortInfo, cap_mask2_resp_time), 4);
        assert_eq!(offset_of!(ClassPortInfo, redir_gid), 8);
        assert_eq!(offset_of!(ClassPortInfo, redir_lid), 28);
        assert_eq!(offset_of!(ClassPortInfo, trap_gid), 40);
        assert_eq!(offset_of!(ClassPortInfo, trap_lid), 60);
        assert_eq!(offset_of!(ClassPortInfo, trap_hop_qp), 64);
        assert_eq!(offset_of!(ClassPortInfo, trap_qkey), 68);
    }

    #[test]
    fn resp_time_and_cap2_share_a_word() {
        let mut cpi = ClassPortInfo::from_bytes([0xFF; 72]);
        let before = cpi.as_bytes();
        cpi.set_resp_time_value(0x12);
        let mut region = [0u8; 72];
        region[7] = 0x1F;
        assert_only_region_changed(&before, &cpi.as_bytes(), &region);
        assert_eq!(cpi.resp_time_value(), 0x12);
        assert_eq!(cpi.capability_mask2(), 0x07FF_FFFF);
    }

    #[test]
    fn bit_fields_isolated() {
        let fields = [
            bit_field!(ClassPortInfo: capability_mask2, set_capability_mask2 as u32, 0x07FF_FFFF, 4, [0xFF, 0xFF, 0xFF, 0xE0]),
            bit_field!(ClassPortInfo: resp_time_value, set_resp_time_value as u32, 0x1F, 7, [0x1F]),
            bit_field!(ClassPortInfo: redir_tc, set_redir_tc as u32, 0xFF, 24, [0xFF]),
            bit_field!(ClassPortInfo: redir_sl, set_redir_sl as u32, 0xF, 25, [0xF0]),
            bit_field!(ClassPortInfo: redir_fl, set_redir_fl as u32, 0x000F_FFFF, 25, [0x0F, 0xFF, 0xFF]),
            bit_field!(ClassPortInfo: redir_qp, set_redir_qp as u32, 0x00FF_FFFF, 33, [0xFF, 0xFF, 0xFF]),
            bit_field!(ClassPortInfo: trap_tc, set_trap_tc as u32, 0xFF, 56, [0xFF]),
            bit_field!(ClassPortInfo: trap_sl, set_trap_sl as u32, 0xF, 57, [0xF0]),
            bit_field!(ClassPortInfo: trap_fl, set_trap_fl as u32, 0x000F_FFFF, 57, [0x0F, 0xFF, 0xFF]),
            bit_field!(ClassPortInfo: trap_hop_limit, set_trap_hop_limit as u32, 0xFF, 64, [0xFF]),
            bit_field!(ClassPortInfo: trap_qp, set_trap_qp as u32, 0x00FF_FFFF, 65, [0xFF, 0xFF, 0xFF]),
        ];
        check_bit_fields(ClassPortInfo::from_bytes, ClassPortInfo::as_bytes, &fields);
    }

    #[test]
    fn trap_addressing() {
        let mut cpi = ClassPortInfo::new();
        cpi.set_trap_lid(0x0042);
        cpi.set_trap_sl(3);
        cpi.set_trap_fl(0xABCDE);
        cpi.set_trap_hop_limit(0xFF);
        cpi.set_trap_qp(1);
        let raw = cpi.as_bytes();
        assert_eq!(&raw[56..60], &[0x00, 0x3A, 0xBC, 0xDE]);
        assert_eq!(&raw[60..62], &[0x00, 0x42]);
        assert_eq!(&raw[64..68], &[0xFF, 0x00, 0x00, 0x01]);
    }
}
