use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::wire::{MlnxExtPortInfo, PortInfo};

/// Link width codes, as carried in `LinkWidth{Enabled,Supported,Active}`.
pub mod width {
    pub const X1: u8 = 0x01;
    pub const X4: u8 = 0x02;
    pub const X8: u8 = 0x04;
    pub const X12: u8 = 0x08;
    pub const X2: u8 = 0x10;

    /// Every defined width.
    pub const ALL: u8 = X1 | X2 | X4 | X8 | X12;

    /// Widths from most to least capable.
    pub const BY_RANK: [u8; 5] = [X12, X8, X4, X2, X1];

    /// Number of lanes of a single width code.
    pub const fn lanes(code: u8) -> Option<u32> {
        Some(match code {
            X1 => 1,
            X2 => 2,
            X4 => 4,
            X8 => 8,
            X12 => 12,
            _ => return None,
        })
    }
}

/// Legacy speed codes (`LinkSpeedSupported/Enabled/Active`).
pub mod legacy {
    pub const SDR: u8 = 0x01;
    pub const DDR: u8 = 0x02;
    pub const QDR: u8 = 0x04;
    pub const ALL: u8 = SDR | DDR | QDR;
}

/// Extended speed codes (`LinkSpeedExt*`).
pub mod ext {
    pub const FDR: u8 = 0x01;
    pub const EDR: u8 = 0x02;
    pub const HDR: u8 = 0x04;
    pub const NDR: u8 = 0x08;
    pub const ALL: u8 = FDR | EDR | HDR | NDR;
}

/// Extended-2 speed codes (`LinkSpeed*2`).
pub mod ext2 {
    pub const XDR: u8 = 0x01;
    pub const ALL: u8 = XDR;
}

/// The speed table generation that is authoritative for a port.
///
/// Ordered by priority: a later generation always wins when it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpeedGeneration {
    /// `LinkSpeedActive` (SDR/DDR/QDR).
    Legacy,

    /// `LinkSpeedExtActive` (FDR/EDR/HDR/NDR).
    Extended,

    /// `LinkSpeedActive2` (XDR).
    Extended2,
}

impl SpeedGeneration {
    /// Resolve which generation's active speed field describes `port`.
    ///
    /// Capabilities are read from `caps`, which is port 0 for a switch and
    /// the port itself otherwise. A generation only applies if the capability
    /// port advertises it *and* the port reports a nonzero active speed in
    /// it, so stale fields of a lower generation never take precedence.
    pub fn resolve(port: &PortInfo, caps: &PortInfo) -> Self {
        if caps.has_ext_speeds2() && port.link_speed_ext2_active() != 0 {
            Self::Extended2
        } else if caps.has_ext_speeds() && port.link_speed_ext_active() != 0 {
            Self::Extended
        } else {
            Self::Legacy
        }
    }

    /// Get the active speed code of `port` in this generation.
    pub fn active_speed(self, port: &PortInfo) -> u8 {
        match self {
            Self::Legacy => port.link_speed_active(),
            Self::Extended => port.link_speed_ext_active(),
            Self::Extended2 => port.link_speed_ext2_active() as u8,
        }
    }

    /// Speed codes defined in this generation.
    pub const fn valid_speeds(self) -> u8 {
        match self {
            Self::Legacy => legacy::ALL,
            Self::Extended => ext::ALL,
            Self::Extended2 => ext2::ALL,
        }
    }

    /// The slowest per-lane speed of this generation.
    pub const fn min_speed(self) -> LinkSpeed {
        match self {
            Self::Legacy => LinkSpeed::Sdr,
            Self::Extended => LinkSpeed::Fdr,
            Self::Extended2 => LinkSpeed::Xdr,
        }
    }
}

/// Per-lane signalling speed, ordered from slowest to fastest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LinkSpeed {
    /// 2.5 Gb/s.
    Sdr,
    /// 5 Gb/s.
    Ddr,
    /// 10 Gb/s.
    Qdr,
    /// 10 Gb/s with 64b/66b encoding (vendor).
    Fdr10,
    /// 14 Gb/s.
    Fdr,
    /// 25 Gb/s.
    Edr,
    /// 50 Gb/s.
    Hdr,
    /// 100 Gb/s.
    Ndr,
    /// 200 Gb/s.
    Xdr,
}

impl LinkSpeed {
    /// Decode a single speed code of `generation`. Masks with more than one
    /// bit and reserved codes yield `None`.
    pub const fn decode(generation: SpeedGeneration, code: u8) -> Option<Self> {
        Some(match (generation, code) {
            (SpeedGeneration::Legacy, legacy::SDR) => Self::Sdr,
            (SpeedGeneration::Legacy, legacy::DDR) => Self::Ddr,
            (SpeedGeneration::Legacy, legacy::QDR) => Self::Qdr,
            (SpeedGeneration::Extended, ext::FDR) => Self::Fdr,
            (SpeedGeneration::Extended, ext::EDR) => Self::Edr,
            (SpeedGeneration::Extended, ext::HDR) => Self::Hdr,
            (SpeedGeneration::Extended, ext::NDR) => Self::Ndr,
            (SpeedGeneration::Extended2, ext2::XDR) => Self::Xdr,
            _ => return None,
        })
    }
}

impl Display for LinkSpeed {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Sdr => "SDR",
            Self::Ddr => "DDR",
            Self::Qdr => "QDR",
            Self::Fdr10 => "FDR10",
            Self::Fdr => "FDR",
            Self::Edr => "EDR",
            Self::Hdr => "HDR",
            Self::Ndr => "NDR",
            Self::Xdr => "XDR",
        };
        f.write_str(s)
    }
}

/// Get the fastest per-lane speed currently active on `port`.
///
/// The vendor FDR10 speed is only considered when `fdr10` is allowed and the
/// port runs on the legacy table, since FDR10 is reported next to a legacy
/// QDR active speed.
pub fn highest_active_speed(
    port: &PortInfo,
    caps: &PortInfo,
    ext_info: Option<&MlnxExtPortInfo>,
    fdr10: bool,
) -> LinkSpeed {
    let generation = SpeedGeneration::resolve(port, caps);
    if generation == SpeedGeneration::Legacy
        && fdr10
        && ext_info.is_some_and(MlnxExtPortInfo::is_fdr10_active)
    {
        return LinkSpeed::Fdr10;
    }
    LinkSpeed::decode(generation, generation.active_speed(port)).unwrap_or(generation.min_speed())
}
