use std::fmt;

/// `MlnxExtPortInfo:LinkSpeed*` bit for FDR10.
pub const MLNX_SPEED_FDR10: u8 = 0x01;

/// FEC modes reported in `MlnxExtPortInfo:FECModeActive`.
pub mod fec {
    pub const NO_FEC: u8 = 0x0;
    pub const FIRECODE: u8 = 0x1;
    pub const RS_FEC: u8 = 0x2;
    pub const LL_RS_FEC: u8 = 0x3;
    pub const RS_FEC_544_514: u8 = 0x4;
    pub const PLR_RS_FEC_544_514: u8 = 0x7;
}

/// Vendor extended port information (SMP attribute 0xFF90), 64 bytes.
///
/// Carries the FDR10 speed bit, FEC mode bits and the special-port marker.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct MlnxExtPortInfo {
    reserved0: [u8; 3],
    state_change_enable: u8,
    reserved1: [u8; 3],
    link_speed_supported: u8,
    reserved2: [u8; 3],
    link_speed_enabled: u8,
    reserved3: [u8; 3],
    link_speed_active: u8,
    active_rs_fec_parity: [u8; 2],
    active_rs_fec_data: [u8; 2],
    capability_mask: [u8; 2],
    reserved4: u8,
    fec_mode_active: u8,
    fec_mode_supported: [u8; 2],
    fec_mode_enabled: [u8; 2],
    special_port: u8,
    special_port_type: u8,
    reserved5: [u8; 34],
}

impl_wire_layout!(MlnxExtPortInfo, 64, "MlnxExtPortInfo");

impl MlnxExtPortInfo {
    wire_fields! {
        state_change_enable, set_state_change_enable: u8;
        /// Vendor speeds supported (bit 0 FDR10).
        link_speed_supported, set_link_speed_supported: u8;
        /// Vendor speeds enabled (bit 0 FDR10).
        link_speed_enabled, set_link_speed_enabled: u8;
        /// Vendor speed active (bit 0 FDR10).
        link_speed_active, set_link_speed_active: u8;
        active_rs_fec_parity, set_active_rs_fec_parity: u16;
        active_rs_fec_data, set_active_rs_fec_data: u16;
        capability_mask, set_capability_mask: u16;
        /// Supported FEC modes (bitmask indexed by FEC mode).
        fec_mode_supported, set_fec_mode_supported: u16;
        /// Enabled FEC modes (bitmask indexed by FEC mode).
        fec_mode_enabled, set_fec_mode_enabled: u16;
        special_port_type, set_special_port_type: u8;
    }

    wire_bits! {
        /// Active FEC mode, see [`fec`].
        fec_mode_active, set_fec_mode_active: fec_mode_active as u8 [0x0F, 0];
        /// Whether the port is marked special (e.g. an AN or router port).
        is_special_port, set_is_special_port: special_port as u8 [0x01, 0];
    }

    /// Determine whether FDR10 is the active vendor speed.
    #[inline]
    pub fn is_fdr10_active(&self) -> bool {
        self.link_speed_active() & MLNX_SPEED_FDR10 != 0
    }

    /// Determine whether FDR10 is both supported and enabled.
    #[inline]
    pub fn is_fdr10_enabled(&self) -> bool {
        self.link_speed_supported() & self.link_speed_enabled() & MLNX_SPEED_FDR10 != 0
    }
}

impl fmt::Debug for MlnxExtPortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MlnxExtPortInfo")
            .field("link_speed_active", &self.link_speed_active())
            .field("fec_mode_active", &self.fec_mode_active())
            .field("special_port", &self.is_special_port())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use memoffset::offset_of;

    use super::*;
    use crate::wire::test_util::{bit_field, check_bit_fields};

    #[test]
    fn layout() {
        assert_eq!(offset_of!(MlnxExtPortInfo, state_change_enable), 3);
        assert_eq!(offset_of!(MlnxExtPortInfo, link_speed_supported), 7);
        assert_eq!(offset_of!(MlnxExtPortInfo, link_speed_enabled), 11);
        assert_eq!(offset_of!(MlnxExtPortInfo, link_speed_active), 15);
        assert_eq!(offset_of!(MlnxExtPortInfo, capability_mask), 20);
        assert_eq!(offset_of!(MlnxExtPortInfo, fec_mode_active), 23);
        assert_eq!(offset_of!(MlnxExtPortInfo, special_port), 28);
    }

    #[test]
    fn fdr10_and_fec() {
        let mut epi = MlnxExtPortInfo::new();
        assert!(!epi.is_fdr10_active());
        epi.set_link_speed_supported(MLNX_SPEED_FDR10);
        epi.set_link_speed_enabled(MLNX_SPEED_FDR10);
        epi.set_link_speed_active(MLNX_SPEED_FDR10);
        assert!(epi.is_fdr10_active() && epi.is_fdr10_enabled());

        epi.set_fec_mode_active(fec::RS_FEC_544_514);
        epi.set_fec_mode_supported(1 << fec::RS_FEC | 1 << fec::RS_FEC_544_514);
        let raw = epi.as_bytes();
        assert_eq!(raw[23], 0x04);
        assert_eq!(&raw[24..26], &[0x00, 0x14]);
        assert_eq!(MlnxExtPortInfo::from_bytes(raw), epi);
    }

    #[test]
    fn bit_fields_isolated() {
        let fields = [
            bit_field!(MlnxExtPortInfo: fec_mode_active, set_fec_mode_active as u8, 0xF, 23, [0x0F]),
            bit_field!(MlnxExtPortInfo: is_special_port, set_is_special_port as u8, 0x1, 28, [0x01]),
        ];
        check_bit_fields(MlnxExtPortInfo::from_bytes, MlnxExtPortInfo::as_bytes, &fields);
    }
}
