//! Type aliases and identifier newtypes shared by the whole fabric model.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// [`u8`]: **Port number**, identifies a port on a switch or an HCA.
/// Port 0 is the switch management port.
pub type PortNum = u8;

/// [`u16`]: **Local identifier (LID)**, the unicast fabric address of a port.
/// Always in host byte order in this crate; the codecs convert.
pub type Lid = u16;

/// [`u16`]: **Management attribute identifier** carried in a MAD header.
pub type AttrId = u16;

/// [`u8`]: **LID mask count**, a logical port occupies `2^lmc` LIDs.
pub type Lmc = u8;

/// First unicast LID.
pub const LID_UCAST_START: Lid = 0x0001;

/// Last unicast LID.
pub const LID_UCAST_END: Lid = 0xBFFF;

/// Largest legal LMC value.
pub const LMC_MAX: Lmc = 7;

/// Determine whether `lid` is a unicast LID.
#[inline]
pub const fn is_unicast_lid(lid: Lid) -> bool {
    lid >= LID_UCAST_START && lid <= LID_UCAST_END
}

/// A 64-bit globally unique identifier of a node or port.
///
/// The value is kept in host byte order; use [`Guid::from_be_bytes`] and
/// [`Guid::to_be_bytes`] at the wire boundary.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Guid(pub u64);

impl Guid {
    /// The all-zero GUID, reported by ports whose identity is not known yet.
    pub const ZERO: Self = Self(0);

    /// Create a GUID from its network-order byte representation.
    #[inline]
    pub const fn from_be_bytes(raw: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(raw))
    }

    /// Get the network-order byte representation of this GUID.
    #[inline]
    pub const fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Determine whether this GUID is assigned (nonzero).
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for Guid {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Guid").field(&format_args!("{}", self)).finish()
    }
}

impl fmt::Display for Guid {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

impl From<u64> for Guid {
    #[inline]
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl From<Guid> for u64 {
    #[inline]
    fn from(guid: Guid) -> Self {
        guid.0
    }
}

impl FromStr for Guid {
    type Err = ParseIntError;

    /// Parse `0x`-prefixed or bare hexadecimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        u64::from_str_radix(digits, 16).map(Self)
    }
}

impl Serialize for Guid {
    #[inline]
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Guid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as Deserialize<'de>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An inclusive range of LIDs occupied by one logical port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LidRange {
    pub min: Lid,
    pub max: Lid,
}

impl LidRange {
    /// Compute the LID range covered by `base` under the given LMC.
    ///
    /// The LMC is clamped to [`LMC_MAX`] and the upper bound saturates at
    /// `0xFFFF`.
    #[inline]
    pub fn new(base: Lid, lmc: Lmc) -> Self {
        let span = 1u32 << lmc.min(LMC_MAX);
        let max = (base as u32 + span - 1).min(u16::MAX as u32) as Lid;
        Self { min: base, max }
    }

    /// Number of LIDs in the range.
    #[inline]
    pub fn len(&self) -> usize {
        (self.max - self.min) as usize + 1
    }

    /// A LID range is never empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Determine whether `lid` lies in this range.
    #[inline]
    pub fn contains(&self, lid: Lid) -> bool {
        self.min <= lid && lid <= self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_wire_order() {
        let guid = Guid::from_be_bytes([0x00, 0x02, 0xc9, 0x03, 0x00, 0xa1, 0xb2, 0xc3]);
        assert_eq!(guid.0, 0x0002_c903_00a1_b2c3);
        assert_eq!(guid.to_be_bytes()[2], 0xc9);
        assert_eq!(guid.to_string(), "0x0002c90300a1b2c3");
    }

    #[test]
    fn guid_parse_and_serde() {
        let guid: Guid = "0x0002c90300a1b2c3".parse().unwrap();
        assert_eq!(guid, Guid(0x0002_c903_00a1_b2c3));
        assert_eq!("ABCD".parse::<Guid>().unwrap(), Guid(0xabcd));
        assert!("0xzz".parse::<Guid>().is_err());

        let json = serde_json::to_string(&guid).unwrap();
        assert_eq!(json, "\"0x0002c90300a1b2c3\"");
        assert_eq!(serde_json::from_str::<Guid>(&json).unwrap(), guid);
    }

    #[test]
    fn lid_range_by_lmc() {
        assert_eq!(LidRange::new(0x10, 0), LidRange { min: 0x10, max: 0x10 });
        let r = LidRange::new(0x10, 2);
        assert_eq!((r.min, r.max, r.len()), (0x10, 0x13, 4));
        assert!(r.contains(0x12) && !r.contains(0x14));
        assert_eq!(LidRange::new(0xFFFE, 7).max, 0xFFFF);
        assert!(is_unicast_lid(0xBFFF) && !is_unicast_lid(0xC000) && !is_unicast_lid(0));
    }
}
