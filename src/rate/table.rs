use super::speed::*;
use super::Rate;
use crate::wire::*;

/// Column of a width code in [`RATES`].
const fn width_column(code: u8) -> Option<usize> {
    Some(match code {
        width::X1 => 0,
        width::X2 => 1,
        width::X4 => 2,
        width::X8 => 3,
        width::X12 => 4,
        _ => return None,
    })
}

/// Rate of every (per-lane speed, width) pair. Rows follow [`LinkSpeed`],
/// columns are 1x, 2x, 4x, 8x and 12x.
const RATES: [[Rate; 5]; 9] = {
    use Rate::*;
    [
        [Gbps2_5, Gbps5, Gbps10, Gbps20, Gbps30],         // SDR
        [Gbps5, Gbps10, Gbps20, Gbps40, Gbps60],          // DDR
        [Gbps10, Gbps20, Gbps40, Gbps80, Gbps120],        // QDR
        [Gbps10, Gbps20, Gbps40, Gbps80, Gbps120],        // FDR10
        [Gbps14, Gbps28, Gbps56, Gbps112, Gbps168],       // FDR
        [Gbps25, Gbps50, Gbps100, Gbps200, Gbps300],      // EDR
        [Gbps50, Gbps100, Gbps200, Gbps400, Gbps600],     // HDR
        [Gbps100, Gbps200, Gbps400, Gbps800, Gbps1200],   // NDR
        [Gbps200, Gbps400, Gbps800, Gbps1600, Gbps2400],  // XDR
    ]
};

/// Get the rate of a link running `speed` over the width `width_code`.
/// Returns `None` for an undefined width code.
#[inline]
pub fn rate_of(speed: LinkSpeed, width_code: u8) -> Option<Rate> {
    width_column(width_code).map(|col| RATES[speed as usize][col])
}

/// Map a (generation, speed code, width code) triple to a rate.
///
/// Unknown speed or width codes fall back to the generation's slowest rate
/// (2.5, 14 or 200 Gb/s); the result is never absent.
pub fn lookup(generation: SpeedGeneration, speed_code: u8, width_code: u8) -> Rate {
    LinkSpeed::decode(generation, speed_code)
        .and_then(|speed| rate_of(speed, width_code))
        .unwrap_or(RATES[generation.min_speed() as usize][0])
}

/// Rate of the vendor FDR10 speed over `width_code`, or the 1x FDR10 rate
/// for an unknown width.
pub fn fdr10_rate(width_code: u8) -> Rate {
    rate_of(LinkSpeed::Fdr10, width_code).unwrap_or(Rate::Gbps10)
}

/// Pick the fastest speed bit set in both masks.
///
/// Within every generation a higher bit is a faster speed. Returns the
/// lowest code (1) when the masks share nothing.
#[inline]
pub fn highest_common(a: u8, b: u8) -> u8 {
    let common = a & b;
    if common == 0 {
        1
    } else {
        1 << (u8::BITS - 1 - common.leading_zeros())
    }
}

/// Pick the widest width bit set in both masks, or 1x when they share
/// nothing. Width codes are not ordered by bit position (2x is `0x10`).
#[inline]
pub fn highest_common_width(a: u8, b: u8) -> u8 {
    width::BY_RANK
        .into_iter()
        .find(|&w| a & b & w != 0)
        .unwrap_or(width::X1)
}

/// What one side of a link is able to run: per-generation speed masks and
/// the width mask. A zero mask means the generation is unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkCaps {
    pub legacy: u8,
    pub ext: u8,
    pub ext2: u8,
    pub fdr10: bool,
    pub width: u8,
}

impl LinkCaps {
    /// Collect the capabilities of `port`.
    ///
    /// Each mask is the union of the supported and enabled masks, with the
    /// "all supported" / "disabled" sentinels of the enabled fields removed
    /// and bits outside the generation's defined codes dropped. Generation
    /// availability is read from `caps` (port 0 for a switch).
    pub fn from_port_info(
        port: &PortInfo,
        caps: &PortInfo,
        ext_info: Option<&MlnxExtPortInfo>,
        fdr10: bool,
    ) -> Self {
        fn strip(enabled: u8, sentinels: &[u8]) -> u8 {
            if sentinels.contains(&enabled) {
                0
            } else {
                enabled
            }
        }

        let legacy = (port.link_speed_supported()
            | strip(port.link_speed_enabled(), &[LINK_SPEED_ENABLED_SUPPORTED]))
            & legacy::ALL;

        let ext = if caps.has_ext_speeds() {
            (port.link_speed_ext_supported()
                | strip(
                    port.link_speed_ext_enabled(),
                    &[LINK_SPEED_EXT_ENABLED_SUPPORTED, LINK_SPEED_EXT_DISABLED],
                ))
                & ext::ALL
        } else {
            0
        };

        let ext2 = if caps.has_ext_speeds2() {
            ((port.link_speed_ext2_supported() | port.link_speed_ext2_enabled()) as u8) & ext2::ALL
        } else {
            0
        };

        let width = (port.link_width_supported()
            | strip(port.link_width_enabled(), &[LINK_WIDTH_ENABLED_SUPPORTED]))
            & width::ALL;

        Self {
            legacy,
            ext,
            ext2,
            fdr10: fdr10 && ext_info.is_some_and(MlnxExtPortInfo::is_fdr10_enabled),
            width,
        }
    }
}

/// Compute the best rate two link partners can both run.
///
/// Every generation both sides support is evaluated at the common speed
/// and the common width, and the fastest result wins. The legacy table
/// always applies, so the result is at least 2.5 Gb/s.
pub fn compute_rate(local: &LinkCaps, remote: &LinkCaps) -> Rate {
    let w = highest_common_width(local.width, remote.width);
    let mut best = lookup(
        SpeedGeneration::Legacy,
        highest_common(local.legacy, remote.legacy),
        w,
    );

    if local.fdr10 && remote.fdr10 {
        best = best.max(fdr10_rate(w));
    }

    let generations = [
        (SpeedGeneration::Extended, local.ext, remote.ext),
        (SpeedGeneration::Extended2, local.ext2, remote.ext2),
    ];
    for (generation, a, b) in generations {
        if a & b != 0 {
            best = best.max(lookup(generation, highest_common(a, b), w));
        }
    }
    best
}

/// Get the rate the link of `port` is currently running at.
///
/// The speed comes from the generation [`SpeedGeneration::resolve`] picks,
/// the width from `LinkWidthActive`. FDR10 replaces the legacy rate when it
/// is allowed and active.
pub fn active_rate(
    port: &PortInfo,
    caps: &PortInfo,
    ext_info: Option<&MlnxExtPortInfo>,
    fdr10: bool,
) -> Rate {
    let generation = SpeedGeneration::resolve(port, caps);
    let w = port.link_width_active();
    if generation == SpeedGeneration::Legacy
        && fdr10
        && ext_info.is_some_and(MlnxExtPortInfo::is_fdr10_active)
    {
        return fdr10_rate(w);
    }
    lookup(generation, generation.active_speed(port), w)
}
