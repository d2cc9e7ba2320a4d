//! Directed-route path maintenance and attribute updates.

use std::collections::{HashMap, HashSet, VecDeque};

use quanta::Clock;
use thiserror::Error;

use super::{Fabric, PhysPortId, PhysicalPort, TopologyError};
use crate::dr::{DrPath, DrPathError};
use crate::types::{AttrId, Guid, PortNum};
use crate::wire::{
    attr, MlnxExtPortInfo, NodeInfo, PortInfo, Smp, VPortInfo, VirtualizationInfo, WireError,
};

/// No response arrived for a MAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("MAD timed out")]
pub struct MadTimeout;

/// Delivery of subnet management packets.
///
/// Retransmission timers and the transaction table live behind this trait;
/// the fabric only picks the route and reacts to the outcome.
pub trait MadTransport {
    /// Send `smp` and wait for its response.
    fn send(&mut self, smp: &Smp) -> Result<Smp, MadTimeout>;
}

impl Fabric {
    /// Walk `path` from the local node and return the node it reaches.
    ///
    /// Every hop must leave through a port that exists, is healthy and is
    /// linked to a healthy partner. Only the first hop may leave a node
    /// that is not a switch.
    pub fn validate_dr_path(&self, path: &DrPath) -> Result<Guid, TopologyError> {
        let mut cur = self.local.ok_or(TopologyError::NoLocalNode)?;
        for (i, &port) in path.hops().iter().enumerate() {
            let invalid = move || TopologyError::DrPath(DrPathError::HopInvalid { hop: i + 1 });

            let node = self.node(cur)?;
            if i > 0 && !node.is_switch() {
                return Err(invalid());
            }
            let physp = node
                .physp(port)
                .and_then(|id| self.physp(id).ok())
                .filter(|p| p.is_healthy())
                .ok_or_else(invalid)?;
            let remote = physp
                .remote()
                .and_then(|id| self.physp(id).ok())
                .filter(|p| p.is_healthy())
                .ok_or_else(invalid)?;
            cur = remote.node();
        }
        Ok(cur)
    }

    #[inline]
    pub fn is_dr_path_valid(&self, path: &DrPath) -> bool {
        self.validate_dr_path(path).is_ok()
    }

    /// Make the first valid directed route of `p` active and return its
    /// slot. A route is valid if it can be walked and ends at the node of
    /// `p`. When none is, the port becomes isolated.
    ///
    /// Errors other than an invalid hop, such as a missing local node, are
    /// returned as is and leave the routes of `p` untouched.
    pub fn resolve_dr_path(&mut self, p: PhysPortId) -> Result<usize, TopologyError> {
        self.local.ok_or(TopologyError::NoLocalNode)?;
        let physp = self.physp(p)?;
        let target = physp.node();
        let mut paths = physp.dr_paths().clone();

        let mut fault = None;
        let res = paths.rotate_to_valid(|path| {
            if fault.is_some() {
                return false;
            }
            match self.validate_dr_path(path) {
                Ok(reached) => reached == target,
                Err(TopologyError::DrPath(DrPathError::HopInvalid { .. })) => false,
                Err(e) => {
                    fault = Some(e);
                    false
                }
            }
        });
        if let Some(e) = fault {
            return Err(e);
        }
        *self.physp_mut(p)?.dr_paths_mut() = paths;
        if res.is_err() {
            log::warn!("ibfabric: {} is isolated", self.port_name(p));
        }
        Ok(res?)
    }

    /// Get the directed route to use for `p` now.
    pub fn get_active_path(&mut self, p: PhysPortId) -> Result<DrPath, TopologyError> {
        self.resolve_dr_path(p)?;
        Ok(*self.physp(p)?.dr_paths().active_path()?)
    }

    /// Find the shortest route over healthy links from `from` to `to`, as
    /// output port numbers. Ports are tried in ascending order, and only
    /// switches are passed through.
    fn shortest_route(&self, from: Guid, to: Guid) -> Option<Vec<PortNum>> {
        let mut prev = HashMap::<Guid, (Guid, PortNum)>::new();
        let mut seen = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);

        while let Some(cur) = queue.pop_front() {
            if cur == to {
                let mut hops = Vec::new();
                let mut at = to;
                while let Some(&(before, port)) = prev.get(&at) {
                    hops.push(port);
                    at = before;
                }
                hops.reverse();
                return Some(hops);
            }

            let Some(node) = self.nodes.get(&cur) else {
                continue;
            };
            if cur != from && !node.is_switch() {
                continue;
            }
            for (num, id) in node.external_physps() {
                let Ok(physp) = self.physp(id) else {
                    continue;
                };
                let next = physp
                    .remote()
                    .and_then(|r| self.physp(r).ok())
                    .filter(|r| physp.is_healthy() && r.is_healthy())
                    .map(PhysicalPort::node);
                if let Some(next) = next {
                    if seen.insert(next) {
                        prev.insert(next, (cur, num));
                        queue.push_back(next);
                    }
                }
            }
        }
        None
    }

    /// Replace the active directed route of `p` with the shortest healthy
    /// route from the local node, and return it.
    pub fn replace_dr_path(&mut self, p: PhysPortId) -> Result<DrPath, TopologyError> {
        let target = self.physp(p)?.node();
        let from = self.local.ok_or(TopologyError::NoLocalNode)?;
        let hops = self
            .shortest_route(from, target)
            .ok_or(DrPathError::PathExhausted)?;

        let paths = self.physp_mut(p)?.dr_paths_mut();
        paths.replace_path(&hops)?;
        let path = *paths.active_path()?;
        log::info!(
            "ibfabric: new route {} to {}",
            path,
            self.port_name(p)
        );
        Ok(path)
    }

    /// Record a timeout on the active route of `p`. Returns the slot to use
    /// next.
    pub fn record_dr_timeout(&mut self, p: PhysPortId) -> Result<usize, TopologyError> {
        let max_tries = self.config.dr_path_max_tries;
        Ok(self.physp_mut(p)?.dr_paths_mut().record_timeout(max_tries)?)
    }

    /// Record a response on the active route of `p`.
    pub fn record_dr_success(&mut self, p: PhysPortId) -> Result<(), TopologyError> {
        self.physp_mut(p)?.dr_paths_mut().record_success();
        Ok(())
    }

    fn physp_with_clock(
        &mut self,
        p: PhysPortId,
    ) -> Result<(&mut PhysicalPort, &Clock), TopologyError> {
        let physp = self
            .physps
            .get_mut(p.index())
            .and_then(Option::as_mut)
            .ok_or(TopologyError::PortNotFound(p))?;
        Ok((physp, &self.clock))
    }

    /// Store an attribute read from port `p`.
    ///
    /// `raw` is the attribute payload. Port attributes go to the physical
    /// port, `NodeInfo` to its node, and virtualization attributes to the
    /// logical port it belongs to; for `VPortInfo` the attribute modifier is
    /// the vport index. Returns whether the stored state changed.
    pub fn on_attribute_update(
        &mut self,
        p: PhysPortId,
        attr_id: AttrId,
        attr_mod: u32,
        raw: &[u8],
    ) -> Result<bool, TopologyError> {
        match attr_id {
            attr::PORT_INFO => {
                let pi = PortInfo::from_slice(raw)?;
                let (physp, clock) = self.physp_with_clock(p)?;
                let before = *physp.port_info();
                physp.set_port_info(&pi, clock, false, None);
                let (guid, lid) = (physp.port_guid(), physp.base_lid());
                let changed = *physp.port_info() != before;

                if let Some(lp) = self.ports.get_mut(&guid) {
                    if lp.primary() == Ok(p) {
                        lp.set_lid(lid);
                    }
                }
                Ok(changed)
            }
            attr::MLNX_EXT_PORT_INFO => {
                let epi = MlnxExtPortInfo::from_slice(raw)?;
                let physp = self.physp_mut(p)?;
                let changed = *physp.ext_port_info() != epi;
                physp.set_ext_port_info(&epi);
                Ok(changed)
            }
            attr::NODE_INFO => {
                let ni = NodeInfo::from_slice(raw)?;
                let guid = self.physp(p)?.node();
                if ni.node_guid() != guid {
                    log::warn!(
                        "ibfabric: NodeInfo from {} reports node {}, ignored",
                        self.port_name(p),
                        ni.node_guid()
                    );
                    return Ok(false);
                }
                let node = self.node_mut(guid)?;
                let changed = *node.info() != ni;
                node.set_info(ni);
                Ok(changed)
            }
            attr::VIRTUALIZATION_INFO => {
                let vi = VirtualizationInfo::from_slice(raw)?;
                let guid = self.physp(p)?.port_guid();
                let lp = self.logical_port_mut(guid)?;
                let before = lp.virt().map(|v| *v.info());
                if vi.is_enabled() {
                    lp.set_virt_info(vi);
                    Ok(before != Some(vi))
                } else {
                    lp.delete_virtualization();
                    Ok(before.is_some())
                }
            }
            attr::VPORT_INFO => {
                let vpi = VPortInfo::from_slice(raw)?;
                let index = u16::try_from(attr_mod)
                    .map_err(|_| TopologyError::VportIndexOutOfRange(attr_mod))?;
                let guid = self.physp(p)?.port_guid();
                let lp = self.logical_port_mut(guid)?;
                match lp.vport(index).map(|vp| *vp.info()) {
                    Some(before) => {
                        lp.update_vport(index, vpi)?;
                        Ok(before != vpi)
                    }
                    None => {
                        lp.create_vport(index, vpi)?;
                        Ok(true)
                    }
                }
            }
            _ => Err(WireError::UnknownAttribute(attr_id).into()),
        }
    }

    /// Send a directed-route Get of `attr_id` to `p` and return the
    /// response.
    ///
    /// Each attempt uses the active route. Timeouts are recorded against
    /// it, which moves on to the next route once it has used up its tries.
    /// Fails once no route is left.
    pub fn send_with_fallback<T: MadTransport + ?Sized>(
        &mut self,
        p: PhysPortId,
        transport: &mut T,
        attr_id: AttrId,
        attr_mod: u32,
    ) -> Result<Smp, TopologyError> {
        loop {
            let path = self.get_active_path(p)?;
            let smp = Smp::new_dr_get(&path, attr_id, attr_mod, self.next_trans_id());
            match transport.send(&smp) {
                Ok(resp) => {
                    self.record_dr_success(p)?;
                    return Ok(resp);
                }
                Err(MadTimeout) => {
                    log::debug!(
                        "ibfabric: {:#06x} to {} over {} timed out",
                        attr_id,
                        self.port_name(p),
                        path
                    );
                    self.record_dr_timeout(p)?;
                }
            }
        }
    }

    /// Read `attr_id` from `p` and store it. Returns whether the stored
    /// state changed.
    pub fn query_attribute<T: MadTransport + ?Sized>(
        &mut self,
        p: PhysPortId,
        transport: &mut T,
        attr_id: AttrId,
        attr_mod: u32,
    ) -> Result<bool, TopologyError> {
        let resp = self.send_with_fallback(p, transport, attr_id, attr_mod)?;
        self.on_attribute_update(p, attr_id, attr_mod, resp.data())
    }
}
