//! Link rate negotiation.
//!
//! Rates use the stable Path Record enumeration. Negotiation is total: every
//! combination of capability masks maps to a valid [`Rate`], and growing
//! either side's capabilities never lowers the result.

mod speed;
mod table;

use std::cmp::Ordering;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

pub use self::speed::*;
pub use self::table::*;

/// Path Record rate code.
///
/// Codes are part of the wire protocol and were assigned in order of
/// introduction, so they are *not* sorted by bandwidth. Comparisons between
/// rates use bandwidth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Rate {
    Gbps2_5 = 2,
    Gbps10 = 3,
    Gbps30 = 4,
    Gbps5 = 5,
    Gbps20 = 6,
    Gbps40 = 7,
    Gbps60 = 8,
    Gbps80 = 9,
    Gbps120 = 10,
    Gbps14 = 11,
    Gbps56 = 12,
    Gbps112 = 13,
    Gbps168 = 14,
    Gbps25 = 15,
    Gbps100 = 16,
    Gbps200 = 17,
    Gbps300 = 18,
    Gbps28 = 19,
    Gbps50 = 20,
    Gbps400 = 21,
    Gbps600 = 22,
    Gbps800 = 23,
    Gbps1200 = 24,
    Gbps1600 = 25,
    Gbps2400 = 26,
}

impl Rate {
    /// The slowest rate, 2.5 Gb/s.
    pub const MIN: Self = Self::Gbps2_5;

    /// The fastest rate, 2400 Gb/s.
    pub const MAX: Self = Self::Gbps2400;

    /// Decode a wire rate code. Codes outside `2..=26` yield `None`.
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            2 => Self::Gbps2_5,
            3 => Self::Gbps10,
            4 => Self::Gbps30,
            5 => Self::Gbps5,
            6 => Self::Gbps20,
            7 => Self::Gbps40,
            8 => Self::Gbps60,
            9 => Self::Gbps80,
            10 => Self::Gbps120,
            11 => Self::Gbps14,
            12 => Self::Gbps56,
            13 => Self::Gbps112,
            14 => Self::Gbps168,
            15 => Self::Gbps25,
            16 => Self::Gbps100,
            17 => Self::Gbps200,
            18 => Self::Gbps300,
            19 => Self::Gbps28,
            20 => Self::Gbps50,
            21 => Self::Gbps400,
            22 => Self::Gbps600,
            23 => Self::Gbps800,
            24 => Self::Gbps1200,
            25 => Self::Gbps1600,
            26 => Self::Gbps2400,
            _ => return None,
        })
    }

    /// Get the wire rate code.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Get the bandwidth in Mb/s.
    pub const fn mbps(self) -> u32 {
        match self {
            Self::Gbps2_5 => 2_500,
            Self::Gbps5 => 5_000,
            Self::Gbps10 => 10_000,
            Self::Gbps14 => 14_000,
            Self::Gbps20 => 20_000,
            Self::Gbps25 => 25_000,
            Self::Gbps28 => 28_000,
            Self::Gbps30 => 30_000,
            Self::Gbps40 => 40_000,
            Self::Gbps50 => 50_000,
            Self::Gbps56 => 56_000,
            Self::Gbps60 => 60_000,
            Self::Gbps80 => 80_000,
            Self::Gbps100 => 100_000,
            Self::Gbps112 => 112_000,
            Self::Gbps120 => 120_000,
            Self::Gbps168 => 168_000,
            Self::Gbps200 => 200_000,
            Self::Gbps300 => 300_000,
            Self::Gbps400 => 400_000,
            Self::Gbps600 => 600_000,
            Self::Gbps800 => 800_000,
            Self::Gbps1200 => 1_200_000,
            Self::Gbps1600 => 1_600_000,
            Self::Gbps2400 => 2_400_000,
        }
    }

    /// Get the bandwidth in Gb/s.
    #[inline]
    pub fn gbps(self) -> f32 {
        self.mbps() as f32 / 1000.0
    }
}

impl Ord for Rate {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.mbps().cmp(&other.mbps())
    }
}

impl PartialOrd for Rate {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Rate {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}Gbps", self.gbps())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Rate::Gbps2_5.code(), 2);
        assert_eq!(Rate::Gbps40.code(), 7);
        assert_eq!(Rate::Gbps300.code(), 18);
        assert_eq!(Rate::Gbps200.code(), 17);
        assert_eq!(Rate::Gbps2400.code(), 26);
        for code in 2..=26 {
            assert_eq!(Rate::from_code(code).map(Rate::code), Some(code));
        }
        assert_eq!(Rate::from_code(1), None);
        assert_eq!(Rate::from_code(27), None);
    }

    #[test]
    fn ordered_by_bandwidth() {
        assert!(Rate::Gbps5 < Rate::Gbps10);
        assert!(Rate::Gbps14 < Rate::Gbps20);
        assert!(Rate::Gbps28 < Rate::Gbps30);
        let mut all = (2..=26).filter_map(Rate::from_code).collect::<Vec<_>>();
        all.sort();
        assert_eq!(all.first(), Some(&Rate::MIN));
        assert_eq!(all.last(), Some(&Rate::MAX));
        assert!(all.windows(2).all(|w| w[0].mbps() < w[1].mbps()));
    }

    #[test]
    fn display() {
        assert_eq!(Rate::Gbps2_5.to_string(), "2.5Gbps");
        assert_eq!(Rate::Gbps200.to_string(), "200.0Gbps");
    }
}
