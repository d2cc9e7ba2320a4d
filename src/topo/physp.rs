use chrono::{DateTime, Utc};
use quanta::{Clock, Instant};

use super::{CcPortData, PhysPortId};
use crate::dr::{DrPath, DrPathSet};
use crate::types::{Guid, Lid, Lmc, PortNum};
use crate::wire::{MlnxExtPortInfo, PhysState, PortInfo, PortState};

/// A physical port: one end of a (potential) link.
///
/// Owns the last `PortInfo` and vendor `MlnxExtPortInfo` read from the
/// device, the directed-route paths leading to it, and the link relation to
/// its peer. The relation is a [`PhysPortId`], not ownership; it is set and
/// cleared by [`Fabric::link`](super::Fabric::link) and
/// [`Fabric::unlink`](super::Fabric::unlink) only.
#[derive(Debug, Clone)]
pub struct PhysicalPort {
    port_guid: Guid,
    port_num: PortNum,
    node: Guid,

    port_info: PortInfo,
    ext_port_info: MlnxExtPortInfo,

    remote: Option<PhysPortId>,
    prev_remote: Option<PhysPortId>,

    healthy: bool,
    dr_paths: DrPathSet,

    state_changed_at: Instant,
    state_changed_wall: DateTime<Utc>,

    port_info_dirty: bool,
    ext_port_info_dirty: bool,

    /// LMC the port is expected to be configured with.
    pub expected_lmc: Lmc,

    /// Congestion control bookkeeping of this port, if managed.
    pub cc: Option<CcPortData>,
}

impl PhysicalPort {
    /// Create a port first reached through `path`. The port is healthy,
    /// unlinked, and holds all-zero attributes until the first update.
    pub fn new(node: Guid, port_num: PortNum, port_guid: Guid, path: DrPath, clock: &Clock) -> Self {
        Self {
            port_guid,
            port_num,
            node,
            port_info: PortInfo::new(),
            ext_port_info: MlnxExtPortInfo::new(),
            remote: None,
            prev_remote: None,
            healthy: true,
            dr_paths: DrPathSet::with_path(path),
            state_changed_at: clock.now(),
            state_changed_wall: Utc::now(),
            port_info_dirty: false,
            ext_port_info_dirty: false,
            expected_lmc: 0,
            cc: None,
        }
    }

    #[inline]
    pub fn port_guid(&self) -> Guid {
        self.port_guid
    }

    #[inline]
    pub fn set_port_guid(&mut self, guid: Guid) {
        self.port_guid = guid;
    }

    #[inline]
    pub fn port_num(&self) -> PortNum {
        self.port_num
    }

    /// Get the GUID of the node this port belongs to.
    #[inline]
    pub fn node(&self) -> Guid {
        self.node
    }

    #[inline]
    pub fn port_info(&self) -> &PortInfo {
        &self.port_info
    }

    #[inline]
    pub fn ext_port_info(&self) -> &MlnxExtPortInfo {
        &self.ext_port_info
    }

    /// Store a `PortInfo` read from the device.
    ///
    /// A report with port state NoChange carries no information and is
    /// ignored. When the port is Down only the state fields are taken, as
    /// the rest of the attribute is not meaningful then. The state timestamp
    /// moves whenever the port state or physical state changes (or when
    /// `force_timestamp` is set), regardless of the other fields. `m_key`,
    /// when given, overrides the key in the stored copy.
    ///
    /// Returns whether the port state or physical state changed.
    pub fn set_port_info(
        &mut self,
        new: &PortInfo,
        clock: &Clock,
        force_timestamp: bool,
        m_key: Option<u64>,
    ) -> bool {
        let new_state = new.port_state();
        if new_state == PortState::NoChange as u8 {
            log::debug!(
                "ibfabric: ignoring PortInfo with no state change on {} port {}",
                self.node,
                self.port_num
            );
            return false;
        }

        let before = self.port_info;
        let state_changed = before.port_state() != new_state
            || before.port_phys_state() != new.port_phys_state();

        if new_state == PortState::Down as u8 {
            self.port_info.set_port_state(new_state);
            self.port_info.set_port_phys_state(new.port_phys_state());
        } else {
            self.port_info = *new;
        }
        if let Some(key) = m_key {
            self.port_info.set_m_key(key);
        }

        if self.port_info != before {
            self.port_info_dirty = true;
        }
        if state_changed || force_timestamp {
            self.touch(clock);
        }
        if state_changed {
            log::debug!(
                "ibfabric: {} port {} state {:?} -> {:?}",
                self.node,
                self.port_num,
                PortState::from_raw(before.port_state()),
                PortState::from_raw(new_state)
            );
        }
        state_changed
    }

    /// Store a vendor `MlnxExtPortInfo` read from the device.
    pub fn set_ext_port_info(&mut self, new: &MlnxExtPortInfo) {
        if self.ext_port_info != *new {
            self.ext_port_info = *new;
            self.ext_port_info_dirty = true;
        }
    }

    /// Take the "PortInfo changed" flag, clearing it.
    pub fn take_port_info_dirty(&mut self) -> bool {
        std::mem::take(&mut self.port_info_dirty)
    }

    /// Take the "MlnxExtPortInfo changed" flag, clearing it.
    pub fn take_ext_port_info_dirty(&mut self) -> bool {
        std::mem::take(&mut self.ext_port_info_dirty)
    }

    #[inline]
    pub fn port_state(&self) -> Option<PortState> {
        PortState::from_raw(self.port_info.port_state())
    }

    #[inline]
    pub fn phys_state(&self) -> Option<PhysState> {
        PhysState::from_raw(self.port_info.port_phys_state())
    }

    #[inline]
    pub fn base_lid(&self) -> Lid {
        self.port_info.base_lid()
    }

    #[inline]
    pub fn set_base_lid(&mut self, lid: Lid) {
        self.port_info.set_base_lid(lid);
    }

    #[inline]
    pub fn lmc(&self) -> Lmc {
        self.port_info.lmc()
    }

    /// Get the link partner.
    #[inline]
    pub fn remote(&self) -> Option<PhysPortId> {
        self.remote
    }

    /// Get the link partner before the last backed-up unlink.
    #[inline]
    pub fn prev_remote(&self) -> Option<PhysPortId> {
        self.prev_remote
    }

    #[inline]
    pub(crate) fn set_remote(&mut self, remote: PhysPortId) {
        self.remote = Some(remote);
    }

    /// Drop the link relation. With `backup`, remember the partner as
    /// [`prev_remote`](Self::prev_remote); otherwise forget any previous
    /// partner too.
    pub(crate) fn clear_remote(&mut self, backup: bool) {
        self.prev_remote = if backup { self.remote } else { None };
        self.remote = None;
    }

    #[inline]
    pub fn is_healthy(&self) -> bool {
        self.healthy
    }

    pub fn set_health(&mut self, healthy: bool) {
        if self.healthy != healthy {
            log::debug!(
                "ibfabric: {} port {} marked {}",
                self.node,
                self.port_num,
                if healthy { "healthy" } else { "unhealthy" }
            );
        }
        self.healthy = healthy;
    }

    #[inline]
    pub fn dr_paths(&self) -> &DrPathSet {
        &self.dr_paths
    }

    #[inline]
    pub fn dr_paths_mut(&mut self) -> &mut DrPathSet {
        &mut self.dr_paths
    }

    /// Get when the port state last changed.
    #[inline]
    pub fn state_changed_at(&self) -> Instant {
        self.state_changed_at
    }

    /// Get when the port state last changed, as wall-clock text.
    pub fn state_timestamp_str(&self) -> String {
        self.state_changed_wall
            .format("%Y-%m-%d %H:%M:%S%.6f")
            .to_string()
    }

    /// Move the state timestamp to now.
    pub(crate) fn touch(&mut self, clock: &Clock) {
        self.state_changed_at = clock.now();
        self.state_changed_wall = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn port_info(state: PortState, phys: PhysState) -> PortInfo {
        let mut pi = PortInfo::new();
        pi.set_port_state(state as u8);
        pi.set_port_phys_state(phys as u8);
        pi.set_base_lid(0x10);
        pi.set_mtu_cap(5);
        pi
    }

    fn physp(clock: &Clock) -> PhysicalPort {
        PhysicalPort::new(Guid(1), 1, Guid(2), DrPath::local(0), clock)
    }

    #[test]
    fn no_change_is_ignored() {
        let (clock, _mock) = Clock::mock();
        let mut p = physp(&clock);
        p.set_port_info(&port_info(PortState::Active, PhysState::LinkUp), &clock, false, None);
        p.take_port_info_dirty();

        let mut pi = port_info(PortState::NoChange, PhysState::Polling);
        pi.set_base_lid(0x99);
        assert!(!p.set_port_info(&pi, &clock, true, None));
        assert_eq!(p.base_lid(), 0x10);
        assert_eq!(p.port_state(), Some(PortState::Active));
        assert!(!p.take_port_info_dirty());
    }

    #[test]
    fn down_copies_only_state() {
        let (clock, _mock) = Clock::mock();
        let mut p = physp(&clock);
        p.set_port_info(&port_info(PortState::Active, PhysState::LinkUp), &clock, false, None);

        let mut pi = port_info(PortState::Down, PhysState::Polling);
        pi.set_base_lid(0x99);
        pi.set_mtu_cap(1);
        assert!(p.set_port_info(&pi, &clock, false, None));
        assert_eq!(p.port_state(), Some(PortState::Down));
        assert_eq!(p.phys_state(), Some(PhysState::Polling));
        assert_eq!(p.base_lid(), 0x10);
        assert_eq!(p.port_info().mtu_cap(), 5);
    }

    #[test]
    fn timestamp_follows_state() {
        let (clock, mock) = Clock::mock();
        let mut p = physp(&clock);
        let t0 = p.state_changed_at();

        mock.increment(Duration::from_secs(1));
        assert!(p.set_port_info(&port_info(PortState::Init, PhysState::LinkUp), &clock, false, None));
        let t1 = p.state_changed_at();
        assert_eq!(t1 - t0, Duration::from_secs(1));

        // Same state, other fields differ: no timestamp change.
        mock.increment(Duration::from_secs(1));
        let mut pi = port_info(PortState::Init, PhysState::LinkUp);
        pi.set_base_lid(0x20);
        assert!(!p.set_port_info(&pi, &clock, false, None));
        assert_eq!(p.state_changed_at(), t1);
        assert_eq!(p.base_lid(), 0x20);

        // Physical state alone is a state change.
        mock.increment(Duration::from_secs(1));
        let pi = port_info(PortState::Init, PhysState::LinkErrorRecovery);
        assert!(p.set_port_info(&pi, &clock, false, None));
        assert_eq!(p.state_changed_at() - t1, Duration::from_secs(2));

        // Forced.
        mock.increment(Duration::from_secs(1));
        assert!(!p.set_port_info(&pi, &clock, true, None));
        assert_eq!(p.state_changed_at() - t1, Duration::from_secs(3));
        assert!(!p.state_timestamp_str().is_empty());
    }

    #[test]
    fn m_key_override() {
        let (clock, _mock) = Clock::mock();
        let mut p = physp(&clock);
        let mut pi = port_info(PortState::Active, PhysState::LinkUp);
        pi.set_m_key(0x1111);
        p.set_port_info(&pi, &clock, false, Some(0xabcd));
        assert_eq!(p.port_info().m_key(), 0xabcd);
    }

    #[test]
    fn ext_port_info_dirty() {
        let (clock, _mock) = Clock::mock();
        let mut p = physp(&clock);
        let mut epi = MlnxExtPortInfo::new();
        p.set_ext_port_info(&epi);
        assert!(!p.take_ext_port_info_dirty());
        epi.set_link_speed_active(1);
        p.set_ext_port_info(&epi);
        assert!(p.take_ext_port_info_dirty());
        assert!(!p.take_ext_port_info_dirty());
        assert!(p.ext_port_info().is_fdr10_active());
    }
}
