use std::ops::{Add, AddAssign, BitAnd, BitAndAssign, BitOr, BitOrAssign, Sub, SubAssign};

use crate::wire::ClassPortInfo;

/// Congestion control MADs that must be (re)sent to a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct CcResend(u16);

impl CcResend {
    pub const EMPTY: Self = Self(0);
    pub const RESEND_ALL: Self = Self(1 << 0);
    pub const CC_ENH_INFO: Self = Self(1 << 1);
    pub const SW_SL_MAPPING: Self = Self(1 << 2);
    pub const CA_NP_PARAMETERS: Self = Self(1 << 3);
    pub const CA_RP_PARAMETERS: Self = Self(1 << 4);
    pub const GET_KEY_INFO: Self = Self(1 << 5);
    pub const CC_KEY_SUPPORT: Self = Self(1 << 6);
    pub const CC_KEY: Self = Self(1 << 7);
    pub const TRAP_LID: Self = Self(1 << 8);
    pub const PPCC_CA_ALGO_CONFIG_GET: Self = Self(1 << 9);
    pub const PPCC_CA_ALGO_CONFIG_SET: Self = Self(1 << 10);
    pub const PPCC_CA_ALGO_CONFIG_PARAMS: Self = Self(1 << 11);
    pub const GET_SW_GENERAL_SETTINGS: Self = Self(1 << 13);
    pub const SET_SW_GENERAL_SETTINGS: Self = Self(1 << 14);

    /// Get the raw bits.
    #[inline]
    pub fn bits(self) -> u16 {
        self.0
    }

    /// Determine whether every bit of `other` is set.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for CcResend {
    /// Everything must be sent to a newly found port.
    fn default() -> Self {
        Self::RESEND_ALL
    }
}

impl Add for CcResend {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl AddAssign for CcResend {
    fn add_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl Sub for CcResend {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 & !rhs.0)
    }
}

impl SubAssign for CcResend {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 &= !rhs.0;
    }
}

impl BitAnd for CcResend {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for CcResend {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl BitOr for CcResend {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self + rhs
    }
}

impl BitOrAssign for CcResend {
    fn bitor_assign(&mut self, rhs: Self) {
        *self += rhs;
    }
}

/// Congestion control side table of a logical port.
///
/// Only the bookkeeping lives here; the congestion control manager decides
/// what to send and fills it in.
#[derive(Debug, Clone, Default)]
pub struct CcPortData {
    /// MADs still to be sent.
    pub resend: CcResend,

    /// Whether the CC parameters for this port have been calculated.
    pub calculated: bool,

    /// Whether the CC key has been configured on the port.
    pub key_configured: bool,

    cpi: Option<ClassPortInfo>,
    timeouts: u32,
    unavailable: bool,
}

impl CcPortData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the CC class `ClassPortInfo` last received from the port.
    #[inline]
    pub fn class_port_info(&self) -> Option<&ClassPortInfo> {
        self.cpi.as_ref()
    }

    #[inline]
    pub fn set_class_port_info(&mut self, cpi: ClassPortInfo) {
        self.cpi = Some(cpi);
    }

    /// Take the pending resend bits, leaving none pending.
    pub fn take_resend(&mut self) -> CcResend {
        std::mem::replace(&mut self.resend, CcResend::EMPTY)
    }

    /// Record a CC MAD timeout. The port is marked unavailable, and skipped
    /// by the CC manager, once `max_timeouts` is reached.
    pub fn record_timeout(&mut self, max_timeouts: u32) -> bool {
        self.timeouts += 1;
        if self.timeouts >= max_timeouts && !self.unavailable {
            log::warn!(
                "ibfabric: congestion control unavailable after {} timeouts",
                self.timeouts
            );
            self.unavailable = true;
        }
        self.unavailable
    }

    /// Record a CC MAD response.
    pub fn record_response(&mut self) {
        self.timeouts = 0;
    }

    #[inline]
    pub fn timeouts(&self) -> u32 {
        self.timeouts
    }

    #[inline]
    pub fn is_unavailable(&self) -> bool {
        self.unavailable
    }

    /// Make the port eligible again and schedule a full resend.
    pub fn reset(&mut self) {
        self.timeouts = 0;
        self.unavailable = false;
        self.calculated = false;
        self.resend = CcResend::RESEND_ALL;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resend_flags() {
        let mut r = CcResend::default();
        assert!(r.contains(CcResend::RESEND_ALL));
        r += CcResend::CC_KEY | CcResend::TRAP_LID;
        assert_eq!(r.bits(), 0x0181);
        r -= CcResend::RESEND_ALL;
        assert!(!r.contains(CcResend::RESEND_ALL));
        assert!(r.contains(CcResend::CC_KEY));
        assert_eq!(r & CcResend::TRAP_LID, CcResend::TRAP_LID);
        assert_eq!((r - CcResend::CC_KEY - CcResend::TRAP_LID), CcResend::EMPTY);
    }

    #[test]
    fn timeouts_mark_unavailable() {
        let mut cc = CcPortData::new();
        assert!(!cc.record_timeout(2));
        assert!(cc.record_timeout(2));
        assert!(cc.is_unavailable());

        assert_eq!(cc.take_resend(), CcResend::RESEND_ALL);
        assert!(cc.resend.is_empty());

        cc.reset();
        assert!(!cc.is_unavailable());
        assert_eq!(cc.timeouts(), 0);
        assert!(cc.resend.contains(CcResend::RESEND_ALL));
    }
}
