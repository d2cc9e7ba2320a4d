//! Link-level queries: rates, MTU, operational VLs and LIDs.

use super::{Fabric, PhysPortId, PhysicalPort, TopologyError};
use crate::rate::{self, LinkCaps, Rate};
use crate::types::{Guid, Lid, LidRange, Lmc};
use crate::wire::{Mtu, OpVls, PortInfo};

impl Fabric {
    /// Get the `PortInfo` carrying the capability masks of `a`.
    fn caps_port_info(&self, a: PhysPortId) -> Result<&PortInfo, TopologyError> {
        let caps = self.capabilities_physp(a)?;
        Ok(self.physp(caps)?.port_info())
    }

    /// Get what `a` is able to run.
    pub fn link_caps(&self, a: PhysPortId) -> Result<LinkCaps, TopologyError> {
        let physp = self.physp(a)?;
        Ok(LinkCaps::from_port_info(
            physp.port_info(),
            self.caps_port_info(a)?,
            Some(physp.ext_port_info()),
            self.config.fdr10,
        ))
    }

    /// Get the rate the link of `a` is currently running at.
    pub fn link_rate(&self, a: PhysPortId) -> Result<Rate, TopologyError> {
        let physp = self.physp(a)?;
        Ok(rate::active_rate(
            physp.port_info(),
            self.caps_port_info(a)?,
            Some(physp.ext_port_info()),
            self.config.fdr10,
        ))
    }

    /// Get the best rate `a` and its link partner can both run.
    pub fn max_link_rate(&self, a: PhysPortId) -> Result<Rate, TopologyError> {
        let remote = self.remote(a)?;
        Ok(rate::compute_rate(
            &self.link_caps(a)?,
            &self.link_caps(remote)?,
        ))
    }

    /// Determine whether the link of `a` runs below the rate both sides
    /// are able to run.
    pub fn is_link_throttled(&self, a: PhysPortId) -> Result<bool, TopologyError> {
        let active = self.link_rate(a)?;
        let max = self.max_link_rate(a)?;
        if active < max {
            log::debug!(
                "ibfabric: link of {} throttled: {} of {}",
                self.port_name(a),
                active,
                max
            );
        }
        Ok(active < max)
    }

    #[inline]
    pub fn link_rate_mbps(&self, a: PhysPortId) -> Result<u32, TopologyError> {
        self.link_rate(a).map(Rate::mbps)
    }

    /// Get the healthy link partner of `a`, if any.
    fn usable_remote(&self, a: PhysPortId) -> Result<Option<&PhysicalPort>, TopologyError> {
        let Some(remote) = self.physp(a)?.remote() else {
            return Ok(None);
        };
        let remote = self.physp(remote)?;
        Ok(remote.is_healthy().then_some(remote))
    }

    /// Compute the MTU for the link of `a`: the smaller `MTUCap` of both
    /// sides, bounded by the configured maximum. Without a healthy partner
    /// only the local capability counts.
    pub fn compute_link_mtu(&self, a: PhysPortId) -> Result<Mtu, TopologyError> {
        let local = self.physp(a)?.port_info();
        let mut code = local.mtu_cap().min(self.config.max_mtu);
        if let Some(remote) = self.usable_remote(a)? {
            code = code.min(remote.port_info().mtu_cap());
        }
        let mtu = Mtu::from_raw(code).unwrap_or(Mtu::Mtu256);

        let current = local.neighbor_mtu();
        if current != 0 && (mtu as u8) < current {
            log::warn!(
                "ibfabric: MTU of {} downgraded from {} to {}",
                self.port_name(a),
                Mtu::from_raw(current).map_or_else(|| current.to_string(), |m| m.to_string()),
                mtu
            );
        }
        Ok(mtu)
    }

    /// Compute the operational VLs for the link of `a`: the smaller
    /// `VLCap` of both sides, bounded by the configured maximum.
    pub fn compute_link_op_vls(&self, a: PhysPortId) -> Result<OpVls, TopologyError> {
        let local = self.physp(a)?.port_info();
        let mut code = local.vl_cap().min(self.config.max_op_vls);
        if let Some(remote) = self.usable_remote(a)? {
            code = code.min(remote.port_info().vl_cap());
        }
        let op_vls = OpVls::from_raw(code).unwrap_or(OpVls::Vl0);

        let current = local.op_vls();
        if current != 0 && (op_vls as u8) < current {
            log::warn!(
                "ibfabric: operational VLs of {} downgraded from {} to {}",
                self.port_name(a),
                current,
                op_vls as u8
            );
        }
        Ok(op_vls)
    }

    /// Get the primary physical port of a logical port.
    fn primary_physp(&self, guid: Guid) -> Result<&PhysicalPort, TopologyError> {
        let id = self.logical_port(guid)?.primary()?;
        self.physp(id)
    }

    pub fn port_base_lid(&self, guid: Guid) -> Result<Lid, TopologyError> {
        Ok(self.primary_physp(guid)?.base_lid())
    }

    pub fn port_lmc(&self, guid: Guid) -> Result<Lmc, TopologyError> {
        Ok(self.primary_physp(guid)?.lmc())
    }

    /// Get the LIDs a logical port answers to.
    pub fn port_lid_range(&self, guid: Guid) -> Result<LidRange, TopologyError> {
        let physp = self.primary_physp(guid)?;
        Ok(LidRange::new(physp.base_lid(), physp.lmc()))
    }

    /// Forget the base LID of a logical port.
    pub fn clear_base_lid(&mut self, guid: Guid) -> Result<(), TopologyError> {
        let id = self.logical_port(guid)?.primary()?;
        self.physp_mut(id)?.set_base_lid(0);
        self.logical_port_mut(guid)?.set_lid(0);
        Ok(())
    }

    /// Find the logical port that answers to `lid`.
    pub fn port_by_lid(&self, lid: Lid) -> Option<Guid> {
        if lid == 0 {
            return None;
        }
        self.logical_ports()
            .find(|lp| {
                self.port_lid_range(lp.guid())
                    .is_ok_and(|range| range.contains(lid))
            })
            .map(|lp| lp.guid())
    }

    /// Determine whether a logical port supports virtualization.
    pub fn is_virt_supported(&self, guid: Guid) -> Result<bool, TopologyError> {
        Ok(self.primary_physp(guid)?.port_info().is_virt_supported())
    }
}

#[cfg(test)]
mod tests {
    use super::super::fabric::tests::{sample, Sample};
    use super::*;
    use crate::rate::{ext, legacy, width};
    use crate::wire::{cap, PortState};

    fn set_pi(s: &mut Sample, id: PhysPortId, f: impl FnOnce(&mut PortInfo)) {
        let clock = s.fabric.clock().clone();
        let mut pi = *s.fabric.physp(id).unwrap().port_info();
        pi.set_port_state(PortState::Active as u8);
        f(&mut pi);
        s.fabric
            .physp_mut(id)
            .unwrap()
            .set_port_info(&pi, &clock, false, None);
    }

    fn qdr_4x(pi: &mut PortInfo) {
        pi.set_link_speed_supported(legacy::SDR | legacy::DDR | legacy::QDR);
        pi.set_link_speed_enabled(legacy::SDR | legacy::DDR | legacy::QDR);
        pi.set_link_width_supported(width::X1 | width::X4);
        pi.set_link_width_enabled(width::X1 | width::X4);
    }

    #[test]
    fn rate_of_link() {
        let mut s = sample();
        let (ca, sw) = (s.ca, s.sw_a1);
        set_pi(&mut s, ca, |pi| {
            qdr_4x(pi);
            pi.set_link_speed_active(legacy::DDR);
            pi.set_link_width_active(width::X4);
        });
        set_pi(&mut s, sw, qdr_4x);

        assert_eq!(s.fabric.link_rate(ca).unwrap(), Rate::Gbps20);
        assert_eq!(s.fabric.link_rate_mbps(ca).unwrap(), 20_000);
        assert_eq!(s.fabric.max_link_rate(ca).unwrap(), Rate::Gbps40);
        assert!(s.fabric.is_link_throttled(ca).unwrap());

        set_pi(&mut s, ca, |pi| pi.set_link_speed_active(legacy::QDR));
        assert!(!s.fabric.is_link_throttled(ca).unwrap());

        assert_eq!(
            s.fabric.max_link_rate(s.sw_a0),
            Err(TopologyError::NotLinked(s.sw_a0))
        );
    }

    #[test]
    fn switch_caps_gate_extended_speeds() {
        let mut s = sample();
        let (a2, b1, a0, b0) = (s.sw_a2, s.sw_b1, s.sw_a0, s.sw_b0);
        let edr = |pi: &mut PortInfo| {
            qdr_4x(pi);
            pi.set_link_speed_ext_supported(ext::FDR | ext::EDR);
            pi.set_link_speed_ext_enabled(ext::FDR | ext::EDR);
        };
        set_pi(&mut s, a2, edr);
        set_pi(&mut s, b1, edr);
        assert_eq!(s.fabric.max_link_rate(a2).unwrap(), Rate::Gbps40);

        let ext_caps = |pi: &mut PortInfo| pi.set_capability_mask(cap::HAS_EXT_SPEEDS);
        set_pi(&mut s, a0, ext_caps);
        set_pi(&mut s, b0, ext_caps);
        assert_eq!(s.fabric.max_link_rate(a2).unwrap(), Rate::Gbps100);
    }

    #[test]
    fn mtu_and_vls_take_the_minimum() {
        let mut s = sample();
        let (ca, sw) = (s.ca, s.sw_a1);
        set_pi(&mut s, ca, |pi| {
            pi.set_mtu_cap(5);
            pi.set_vl_cap(4);
        });
        set_pi(&mut s, sw, |pi| {
            pi.set_mtu_cap(4);
            pi.set_vl_cap(5);
        });
        assert_eq!(s.fabric.compute_link_mtu(ca).unwrap(), Mtu::Mtu2048);
        assert_eq!(s.fabric.compute_link_op_vls(ca).unwrap(), OpVls::Vl0To7);
        assert_eq!(s.fabric.compute_link_op_vls(sw).unwrap(), OpVls::Vl0To7);

        // An unhealthy partner does not count.
        s.fabric.set_health(sw, false).unwrap();
        assert_eq!(s.fabric.compute_link_mtu(ca).unwrap(), Mtu::Mtu4096);

        // Configured bounds.
        s.fabric.config.max_mtu = 3;
        s.fabric.config.max_op_vls = 2;
        assert_eq!(s.fabric.compute_link_mtu(ca).unwrap(), Mtu::Mtu1024);
        assert_eq!(s.fabric.compute_link_op_vls(ca).unwrap(), OpVls::Vl0To1);

        // Reserved capability codes fall back to the smallest value.
        set_pi(&mut s, ca, |pi| pi.set_mtu_cap(0));
        assert_eq!(s.fabric.compute_link_mtu(ca).unwrap(), Mtu::Mtu256);
    }

    #[test]
    fn lids() {
        let mut s = sample();
        let ca = s.ca;
        set_pi(&mut s, ca, |pi| {
            pi.set_base_lid(0x20);
            pi.set_lmc(2);
        });
        let guid = Guid(0x11);
        assert_eq!(s.fabric.port_base_lid(guid).unwrap(), 0x20);
        assert_eq!(s.fabric.port_lmc(guid).unwrap(), 2);
        let range = s.fabric.port_lid_range(guid).unwrap();
        assert!(range.contains(0x23));
        assert!(!range.contains(0x24));
        assert_eq!(s.fabric.port_by_lid(0x22), Some(guid));
        assert_eq!(s.fabric.port_by_lid(0), None);

        s.fabric.clear_base_lid(guid).unwrap();
        assert_eq!(s.fabric.port_base_lid(guid).unwrap(), 0);
        assert_eq!(s.fabric.port_by_lid(0x22), None);
        assert!(!s.fabric.is_virt_supported(guid).unwrap());
    }
}
