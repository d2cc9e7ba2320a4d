use std::fmt;

use crate::types::Guid;

/// `PortInfo:CapabilityMask` bits (host order).
pub mod cap {
    pub const IS_SM: u32 = 0x0000_0002;
    pub const IS_NOTICE_SUPPORTED: u32 = 0x0000_0004;
    pub const IS_TRAP_SUPPORTED: u32 = 0x0000_0008;
    pub const IS_AUTOMATIC_MIGRATION_SUPPORTED: u32 = 0x0000_0020;
    pub const IS_SL_MAP_SUPPORTED: u32 = 0x0000_0040;
    pub const IS_MKEY_NVRAM: u32 = 0x0000_0080;
    pub const IS_PKEY_NVRAM: u32 = 0x0000_0100;
    pub const IS_LED_INFO_SUPPORTED: u32 = 0x0000_0200;
    pub const IS_SM_DISABLED: u32 = 0x0000_0400;
    pub const IS_SYSTEM_IMAGE_GUID_SUPPORTED: u32 = 0x0000_0800;
    pub const IS_PKEY_SWITCH_EXT_PORT_TRAP_SUPPORTED: u32 = 0x0000_1000;
    pub const HAS_EXT_SPEEDS: u32 = 0x0000_4000;
    pub const HAS_CAP_MASK2: u32 = 0x0000_8000;
    pub const IS_COMM_MGT_SUPPORTED: u32 = 0x0001_0000;
    pub const IS_SNMP_TUNNELING_SUPPORTED: u32 = 0x0002_0000;
    pub const IS_REINIT_SUPPORTED: u32 = 0x0004_0000;
    pub const IS_DEVICE_MGT_SUPPORTED: u32 = 0x0008_0000;
    pub const IS_VENDOR_CLASS_SUPPORTED: u32 = 0x0010_0000;
    pub const IS_DR_NOTICE_SUPPORTED: u32 = 0x0020_0000;
    pub const IS_CAP_MASK_NOTICE_SUPPORTED: u32 = 0x0040_0000;
    pub const IS_BOOT_MGMT_SUPPORTED: u32 = 0x0080_0000;
    pub const IS_LINK_ROUND_TRIP_LATENCY_SUPPORTED: u32 = 0x0100_0000;
    pub const IS_CLIENT_REREGISTRATION_SUPPORTED: u32 = 0x0200_0000;
    pub const IS_OTHER_LOCAL_CHANGES_NOTICE_SUPPORTED: u32 = 0x0400_0000;
    pub const IS_LINK_SPEED_WIDTH_PAIRS_TABLE_SUPPORTED: u32 = 0x0800_0000;
}

/// `PortInfo:CapabilityMask2` bits (host order).
pub mod cap2 {
    pub const IS_SET_NODE_DESC_SUPPORTED: u16 = 0x0001;
    pub const IS_PORT_INFO_EXT_SUPPORTED: u16 = 0x0002;
    pub const IS_VIRT_SUPPORTED: u16 = 0x0004;
    pub const IS_SWITCH_PORT_STATE_TABLE_SUPPORTED: u16 = 0x0008;
    pub const IS_LINK_WIDTH_2X_SUPPORTED: u16 = 0x0010;
    pub const IS_LINK_SPEED_HDR_SUPPORTED: u16 = 0x0020;
    pub const IS_MKEY_PROTECT_BITS_EXT_SUPPORTED: u16 = 0x0040;
    pub const IS_ENHANCED_TRAP128_SUPPORTED: u16 = 0x0080;
    pub const IS_LINK_SPEED_NDR_SUPPORTED: u16 = 0x0400;
    pub const IS_EXT_SPEEDS_2_SUPPORTED: u16 = 0x0800;
}

/// `LinkSpeedEnabled` value meaning "enable everything in LinkSpeedSupported".
pub const LINK_SPEED_ENABLED_SUPPORTED: u8 = 0x0F;

/// `LinkSpeedExtEnabled` value meaning "enable everything in LinkSpeedExtSupported".
pub const LINK_SPEED_EXT_ENABLED_SUPPORTED: u8 = 0x1E;

/// `LinkSpeedExtEnabled` value meaning "disable extended speeds".
pub const LINK_SPEED_EXT_DISABLED: u8 = 0x1F;

/// `LinkWidthEnabled` value meaning "enable everything in LinkWidthSupported".
pub const LINK_WIDTH_ENABLED_SUPPORTED: u8 = 0xFF;

/// The IBA `PortInfo` attribute (SMP attribute 0x0015), 64 bytes.
///
/// Fields are stored exactly as they travel on the wire. Multi-byte fields
/// are big-endian and several bytes pack more than one field; use the
/// accessor methods rather than poking at bytes.
///
/// Link speed is reported in three generations that live in unrelated
/// places: the legacy nibbles in `state_info1`/`link_speed`, the extended
/// fields in the last two bytes, and the extended-2 fields borrowed from the
/// top byte of `link_rt_latency`. Which one is authoritative depends on the
/// capability bits of the port that owns the node's capabilities; see
/// [`crate::rate::SpeedGeneration::resolve`].
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct PortInfo {
    m_key: [u8; 8],
    subnet_prefix: [u8; 8],
    base_lid: [u8; 2],
    master_sm_base_lid: [u8; 2],
    capability_mask: [u8; 4],
    diag_code: [u8; 2],
    m_key_lease_period: [u8; 2],
    local_port_num: u8,
    link_width_enabled: u8,
    link_width_supported: u8,
    link_width_active: u8,
    state_info1: u8,
    state_info2: u8,
    mkey_lmc: u8,
    link_speed: u8,
    mtu_smsl: u8,
    vl_cap: u8,
    vl_high_limit: u8,
    vl_arb_high_cap: u8,
    vl_arb_low_cap: u8,
    mtu_cap: u8,
    vl_stall_life: u8,
    vl_enforce: u8,
    m_key_violations: [u8; 2],
    p_key_violations: [u8; 2],
    q_key_violations: [u8; 2],
    guid_cap: u8,
    subnet_timeout: u8,
    resp_time_value: u8,
    error_threshold: u8,
    max_credit_hint: [u8; 2],
    link_rt_latency: [u8; 4],
    capability_mask2: [u8; 2],
    link_speed_ext: u8,
    link_speed_ext_enabled: u8,
}

impl_wire_layout!(PortInfo, 64, "PortInfo");

impl PortInfo {
    wire_fields! {
        /// Management key.
        m_key, set_m_key: u64;
        /// Subnet prefix (upper half of the port GID).
        subnet_prefix, set_subnet_prefix: u64;
        /// Base LID of the port.
        base_lid, set_base_lid: u16;
        /// Base LID of the master SM managing this port.
        master_sm_base_lid, set_master_sm_base_lid: u16;
        /// Capability mask, see [`cap`].
        capability_mask, set_capability_mask: u32;
        diag_code, set_diag_code: u16;
        m_key_lease_period, set_m_key_lease_period: u16;
        /// Number of the port that received this SMP.
        local_port_num, set_local_port_num: u8;
        /// Enabled link widths (bitmask of width codes).
        link_width_enabled, set_link_width_enabled: u8;
        /// Supported link widths (bitmask of width codes).
        link_width_supported, set_link_width_supported: u8;
        /// Active link width (a single width code).
        link_width_active, set_link_width_active: u8;
        vl_high_limit, set_vl_high_limit: u8;
        vl_arb_high_cap, set_vl_arb_high_cap: u8;
        vl_arb_low_cap, set_vl_arb_low_cap: u8;
        m_key_violations, set_m_key_violations: u16;
        p_key_violations, set_p_key_violations: u16;
        q_key_violations, set_q_key_violations: u16;
        guid_cap, set_guid_cap: u8;
        max_credit_hint, set_max_credit_hint: u16;
        /// Capability mask 2, see [`cap2`]. Only meaningful when
        /// [`cap::HAS_CAP_MASK2`] is set.
        capability_mask2, set_capability_mask2: u16;
    }

    wire_bits! {
        /// Legacy `LinkSpeedSupported` (bitmask: 1 SDR, 2 DDR, 4 QDR).
        link_speed_supported, set_link_speed_supported: state_info1 as u8 [0xF0, 4];
        /// Logical port state, see [`crate::wire::PortState`].
        port_state, set_port_state: state_info1 as u8 [0x0F, 0];
        /// Physical port state, see [`crate::wire::PhysState`].
        port_phys_state, set_port_phys_state: state_info2 as u8 [0xF0, 4];
        link_down_default_state, set_link_down_default_state: state_info2 as u8 [0x0F, 0];
        m_key_protect_bits, set_m_key_protect_bits: mkey_lmc as u8 [0xC0, 6];
        /// LID mask count.
        lmc, set_lmc: mkey_lmc as u8 [0x07, 0];
        /// Legacy `LinkSpeedActive` (a single speed code).
        link_speed_active, set_link_speed_active: link_speed as u8 [0xF0, 4];
        /// Legacy `LinkSpeedEnabled` (bitmask, 0xF = all supported).
        link_speed_enabled, set_link_speed_enabled: link_speed as u8 [0x0F, 0];
        neighbor_mtu, set_neighbor_mtu: mtu_smsl as u8 [0xF0, 4];
        master_sm_sl, set_master_sm_sl: mtu_smsl as u8 [0x0F, 0];
        vl_cap, set_vl_cap: vl_cap as u8 [0xF0, 4];
        init_type, set_init_type: vl_cap as u8 [0x0F, 0];
        init_type_reply, set_init_type_reply: mtu_cap as u8 [0xF0, 4];
        mtu_cap, set_mtu_cap: mtu_cap as u8 [0x0F, 0];
        vl_stall_count, set_vl_stall_count: vl_stall_life as u8 [0xE0, 5];
        hoq_life, set_hoq_life: vl_stall_life as u8 [0x1F, 0];
        op_vls, set_op_vls: vl_enforce as u8 [0xF0, 4];
        part_enforce_inbound, set_part_enforce_inbound: vl_enforce as u8 [0x08, 3];
        part_enforce_outbound, set_part_enforce_outbound: vl_enforce as u8 [0x04, 2];
        filter_raw_inbound, set_filter_raw_inbound: vl_enforce as u8 [0x02, 1];
        filter_raw_outbound, set_filter_raw_outbound: vl_enforce as u8 [0x01, 0];
        client_reregister, set_client_reregister: subnet_timeout as u8 [0x80, 7];
        mcast_pkey_trap_suppression, set_mcast_pkey_trap_suppression: subnet_timeout as u8 [0x60, 5];
        subnet_timeout, set_subnet_timeout: subnet_timeout as u8 [0x1F, 0];
        resp_time_value, set_resp_time_value: resp_time_value as u8 [0x1F, 0];
        local_phy_errors_threshold, set_local_phy_errors_threshold: error_threshold as u8 [0xF0, 4];
        overrun_errors_threshold, set_overrun_errors_threshold: error_threshold as u8 [0x0F, 0];
        /// Extended-2 `LinkSpeedActive2` (1 XDR), borrowed from the latency word.
        link_speed_ext2_active, set_link_speed_ext2_active: link_rt_latency as u32 [0xE000_0000, 29];
        /// Extended-2 `LinkSpeedSupported2`, borrowed from the latency word.
        link_speed_ext2_supported, set_link_speed_ext2_supported: link_rt_latency as u32 [0x1800_0000, 27];
        /// Extended-2 `LinkSpeedEnabled2`, borrowed from the latency word.
        link_speed_ext2_enabled, set_link_speed_ext2_enabled: link_rt_latency as u32 [0x0700_0000, 24];
        /// Link round-trip latency (24 bits).
        link_rt_latency, set_link_rt_latency: link_rt_latency as u32 [0x00FF_FFFF, 0];
        /// Extended `LinkSpeedExtActive` (1 FDR, 2 EDR, 4 HDR, 8 NDR).
        link_speed_ext_active, set_link_speed_ext_active: link_speed_ext as u8 [0xF0, 4];
        /// Extended `LinkSpeedExtSupported` (bitmask).
        link_speed_ext_supported, set_link_speed_ext_supported: link_speed_ext as u8 [0x0F, 0];
        /// Extended `LinkSpeedExtEnabled` (5-bit bitmask, 0x1E all, 0x1F disabled).
        link_speed_ext_enabled, set_link_speed_ext_enabled: link_speed_ext_enabled as u8 [0x1F, 0];
    }

    /// Subnet prefix as a [`Guid`]-like identifier.
    #[inline]
    pub fn subnet_prefix_guid(&self) -> Guid {
        Guid(self.subnet_prefix())
    }

    /// Determine whether the capability mask has all bits of `bits` set.
    #[inline]
    pub fn has_cap(&self, bits: u32) -> bool {
        self.capability_mask() & bits == bits
    }

    /// Determine whether capability mask 2 is present and has all bits of
    /// `bits` set.
    #[inline]
    pub fn has_cap2(&self, bits: u16) -> bool {
        self.has_cap(cap::HAS_CAP_MASK2) && self.capability_mask2() & bits == bits
    }

    /// Determine whether the extended speed fields are valid on this port.
    #[inline]
    pub fn has_ext_speeds(&self) -> bool {
        self.has_cap(cap::HAS_EXT_SPEEDS)
    }

    /// Determine whether the extended-2 speed fields are valid on this port.
    #[inline]
    pub fn has_ext_speeds2(&self) -> bool {
        self.has_cap2(cap2::IS_EXT_SPEEDS_2_SUPPORTED)
    }

    /// Determine whether the port is an SM.
    #[inline]
    pub fn is_sm(&self) -> bool {
        self.has_cap(cap::IS_SM)
    }

    /// Determine whether the port supports virtualization.
    #[inline]
    pub fn is_virt_supported(&self) -> bool {
        self.has_cap2(cap2::IS_VIRT_SUPPORTED)
    }
}

impl fmt::Debug for PortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortInfo")
            .field("base_lid", &format_args!("{:#06x}", self.base_lid()))
            .field("lmc", &self.lmc())
            .field("capability_mask", &format_args!("{:#010x}", self.capability_mask()))
            .field("port_state", &self.port_state())
            .field("port_phys_state", &self.port_phys_state())
            .field("link_width_active", &self.link_width_active())
            .field("link_speed_active", &self.link_speed_active())
            .field("link_speed_ext_active", &self.link_speed_ext_active())
            .field("link_speed_ext2_active", &self.link_speed_ext2_active())
            .field("mtu_cap", &self.mtu_cap())
            .field("vl_cap", &self.vl_cap())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use memoffset::offset_of;

    use super::*;
    use crate::wire::test_util::{bit_field, check_bit_fields};

    #[test]
    fn layout_matches_iba() {
        assert_eq!(std::mem::size_of::<PortInfo>(), 64);
        assert_eq!(offset_of!(PortInfo, base_lid), 16);
        assert_eq!(offset_of!(PortInfo, capability_mask), 20);
        assert_eq!(offset_of!(PortInfo, local_port_num), 28);
        assert_eq!(offset_of!(PortInfo, state_info1), 32);
        assert_eq!(offset_of!(PortInfo, mkey_lmc), 34);
        assert_eq!(offset_of!(PortInfo, mtu_cap), 41);
        assert_eq!(offset_of!(PortInfo, vl_enforce), 43);
        assert_eq!(offset_of!(PortInfo, subnet_timeout), 51);
        assert_eq!(offset_of!(PortInfo, link_rt_latency), 56);
        assert_eq!(offset_of!(PortInfo, capability_mask2), 60);
        assert_eq!(offset_of!(PortInfo, link_speed_ext), 62);
        assert_eq!(offset_of!(PortInfo, link_speed_ext_enabled), 63);
    }

    #[test]
    fn network_order_fields() {
        let mut pi = PortInfo::new();
        pi.set_base_lid(0x1234);
        pi.set_capability_mask(cap::HAS_CAP_MASK2 | cap::IS_SM);
        let raw = pi.as_bytes();
        assert_eq!(&raw[16..18], &[0x12, 0x34]);
        assert_eq!(&raw[20..24], &[0x00, 0x00, 0x80, 0x02]);
        assert!(pi.is_sm());
    }

    #[test]
    fn packed_nibbles() {
        let mut raw = [0u8; 64];
        raw[32] = 0x34; // supported 3 (SDR|DDR), state 4 (Active)
        raw[34] = 0x82; // protect bits 2, LMC 2
        raw[35] = 0x4F; // active QDR, enabled all-supported
        let pi = PortInfo::from_bytes(raw);
        assert_eq!(pi.link_speed_supported(), 3);
        assert_eq!(pi.port_state(), 4);
        assert_eq!(pi.m_key_protect_bits(), 2);
        assert_eq!(pi.lmc(), 2);
        assert_eq!(pi.link_speed_active(), 4);
        assert_eq!(pi.link_speed_enabled(), LINK_SPEED_ENABLED_SUPPORTED);
    }

    #[test]
    fn ext2_speed_borrows_latency_word() {
        let mut pi = PortInfo::new();
        pi.set_link_rt_latency(0x00AB_CDEF);
        pi.set_link_speed_ext2_active(1);
        pi.set_link_speed_ext2_supported(1);
        pi.set_link_speed_ext2_enabled(1);
        assert_eq!(&pi.as_bytes()[56..60], &[0x29, 0xAB, 0xCD, 0xEF]);
        assert_eq!(pi.link_rt_latency(), 0x00AB_CDEF);
        assert_eq!(pi.link_speed_ext2_active(), 1);

        // Rewriting the latency keeps the borrowed speed bits.
        pi.set_link_rt_latency(0xFFFF_FFFF);
        assert_eq!(pi.link_speed_ext2_active(), 1);
        assert_eq!(pi.link_speed_ext2_enabled(), 1);
        assert_eq!(pi.link_rt_latency(), 0x00FF_FFFF);
    }

    #[test]
    fn setters_only_touch_their_field() {
        let fields = [
            bit_field!(PortInfo: link_speed_supported, set_link_speed_supported as u8, 0xF, 32, [0xF0]),
            bit_field!(PortInfo: port_state, set_port_state as u8, 0xF, 32, [0x0F]),
            bit_field!(PortInfo: port_phys_state, set_port_phys_state as u8, 0xF, 33, [0xF0]),
            bit_field!(PortInfo: link_down_default_state, set_link_down_default_state as u8, 0xF, 33, [0x0F]),
            bit_field!(PortInfo: m_key_protect_bits, set_m_key_protect_bits as u8, 0x3, 34, [0xC0]),
            bit_field!(PortInfo: lmc, set_lmc as u8, 0x7, 34, [0x07]),
            bit_field!(PortInfo: link_speed_active, set_link_speed_active as u8, 0xF, 35, [0xF0]),
            bit_field!(PortInfo: link_speed_enabled, set_link_speed_enabled as u8, 0xF, 35, [0x0F]),
            bit_field!(PortInfo: neighbor_mtu, set_neighbor_mtu as u8, 0xF, 36, [0xF0]),
            bit_field!(PortInfo: master_sm_sl, set_master_sm_sl as u8, 0xF, 36, [0x0F]),
            bit_field!(PortInfo: vl_cap, set_vl_cap as u8, 0xF, 37, [0xF0]),
            bit_field!(PortInfo: init_type, set_init_type as u8, 0xF, 37, [0x0F]),
            bit_field!(PortInfo: init_type_reply, set_init_type_reply as u8, 0xF, 41, [0xF0]),
            bit_field!(PortInfo: mtu_cap, set_mtu_cap as u8, 0xF, 41, [0x0F]),
            bit_field!(PortInfo: vl_stall_count, set_vl_stall_count as u8, 0x7, 42, [0xE0]),
            bit_field!(PortInfo: hoq_life, set_hoq_life as u8, 0x1F, 42, [0x1F]),
            bit_field!(PortInfo: op_vls, set_op_vls as u8, 0xF, 43, [0xF0]),
            bit_field!(PortInfo: part_enforce_inbound, set_part_enforce_inbound as u8, 0x1, 43, [0x08]),
            bit_field!(PortInfo: part_enforce_outbound, set_part_enforce_outbound as u8, 0x1, 43, [0x04]),
            bit_field!(PortInfo: filter_raw_inbound, set_filter_raw_inbound as u8, 0x1, 43, [0x02]),
            bit_field!(PortInfo: filter_raw_outbound, set_filter_raw_outbound as u8, 0x1, 43, [0x01]),
            bit_field!(PortInfo: client_reregister, set_client_reregister as u8, 0x1, 51, [0x80]),
            bit_field!(PortInfo: mcast_pkey_trap_suppression, set_mcast_pkey_trap_suppression as u8, 0x3, 51, [0x60]),
            bit_field!(PortInfo: subnet_timeout, set_subnet_timeout as u8, 0x1F, 51, [0x1F]),
            bit_field!(PortInfo: resp_time_value, set_resp_time_value as u8, 0x1F, 52, [0x1F]),
            bit_field!(PortInfo: local_phy_errors_threshold, set_local_phy_errors_threshold as u8, 0xF, 53, [0xF0]),
            bit_field!(PortInfo: overrun_errors_threshold, set_overrun_errors_threshold as u8, 0xF, 53, [0x0F]),
            bit_field!(PortInfo: link_speed_ext2_active, set_link_speed_ext2_active as u32, 0x7, 56, [0xE0]),
            bit_field!(PortInfo: link_speed_ext2_supported, set_link_speed_ext2_supported as u32, 0x3, 56, [0x18]),
            bit_field!(PortInfo: link_speed_ext2_enabled, set_link_speed_ext2_enabled as u32, 0x7, 56, [0x07]),
            bit_field!(PortInfo: link_rt_latency, set_link_rt_latency as u32, 0x00FF_FFFF, 57, [0xFF, 0xFF, 0xFF]),
            bit_field!(PortInfo: link_speed_ext_active, set_link_speed_ext_active as u8, 0xF, 62, [0xF0]),
            bit_field!(PortInfo: link_speed_ext_supported, set_link_speed_ext_supported as u8, 0xF, 62, [0x0F]),
            bit_field!(PortInfo: link_speed_ext_enabled, set_link_speed_ext_enabled as u8, 0x1F, 63, [0x1F]),
        ];
        check_bit_fields(PortInfo::from_bytes, PortInfo::as_bytes, &fields);
    }

    #[test]
    fn get_then_set_is_identity() {
        let raw: [u8; 64] = std::array::from_fn(|i| (i as u8).wrapping_mul(37).wrapping_add(11));
        let mut pi = PortInfo::from_bytes(raw);
        pi.set_port_state(pi.port_state());
        pi.set_lmc(pi.lmc());
        pi.set_link_rt_latency(pi.link_rt_latency());
        pi.set_link_speed_ext2_supported(pi.link_speed_ext2_supported());
        pi.set_capability_mask2(pi.capability_mask2());
        pi.set_m_key(pi.m_key());
        assert_eq!(pi.as_bytes(), raw);
    }

    #[test]
    fn capability_gating() {
        let mut pi = PortInfo::new();
        pi.set_capability_mask2(cap2::IS_EXT_SPEEDS_2_SUPPORTED);
        // Capability mask 2 is ignored unless advertised.
        assert!(!pi.has_ext_speeds2());
        pi.set_capability_mask(cap::HAS_CAP_MASK2);
        assert!(pi.has_ext_speeds2());
        assert!(!pi.has_ext_speeds());
    }

    #[test]
    fn short_buffer_rejected() {
        let err = PortInfo::from_slice(&[0u8; 63]).unwrap_err();
        assert_eq!(
            err,
            crate::wire::WireError::Truncated { what: "PortInfo", need: 64, got: 63 }
        );
        assert!(PortInfo::from_slice(&[0u8; 80]).is_ok());
    }
}
