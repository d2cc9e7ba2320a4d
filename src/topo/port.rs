use super::{CcPortData, PhysPortId, TopologyError, VPort, VirtData};
use crate::types::{Guid, Lid};
use crate::wire::{VPortInfo, VirtualizationInfo};

/// A logical port: the GUID/LID identity of one or more physical ports.
///
/// An end port has exactly one physical port. A switch has one logical port
/// whose primary physical port is the management port 0, followed by the
/// external ports.
#[derive(Debug, Clone)]
pub struct LogicalPort {
    guid: Guid,
    node: Guid,
    physps: Vec<PhysPortId>,

    /// Cached base LID.
    lid: Lid,
    discovery_count: u32,
    is_new: bool,
    is_reachable: bool,

    virt: Option<VirtData>,
    cc: Option<CcPortData>,
}

impl LogicalPort {
    /// Create a logical port over `physps`, primary first.
    pub fn new(guid: Guid, node: Guid, physps: Vec<PhysPortId>) -> Self {
        Self {
            guid,
            node,
            physps,
            lid: 0,
            discovery_count: 1,
            is_new: true,
            is_reachable: true,
            virt: None,
            cc: None,
        }
    }

    #[inline]
    pub fn guid(&self) -> Guid {
        self.guid
    }

    /// Get the GUID of the owning node.
    #[inline]
    pub fn node(&self) -> Guid {
        self.node
    }

    /// Get the physical port at `index`; index 0 is the primary one.
    pub fn physp(&self, index: usize) -> Result<PhysPortId, TopologyError> {
        self.physps
            .get(index)
            .copied()
            .ok_or(TopologyError::NoPhysicalPort { index })
    }

    /// Get the primary physical port.
    #[inline]
    pub fn primary(&self) -> Result<PhysPortId, TopologyError> {
        self.physp(0)
    }

    #[inline]
    pub fn physps(&self) -> &[PhysPortId] {
        &self.physps
    }

    /// Add a physical port, unless it is already part of this port.
    pub fn add_physp(&mut self, id: PhysPortId) {
        if !self.physps.contains(&id) {
            self.physps.push(id);
        }
    }

    pub(crate) fn remove_physp(&mut self, id: PhysPortId) {
        self.physps.retain(|&p| p != id);
    }

    /// Get the cached base LID.
    #[inline]
    pub fn lid(&self) -> Lid {
        self.lid
    }

    pub(crate) fn set_lid(&mut self, lid: Lid) {
        self.lid = lid;
    }

    #[inline]
    pub fn discovery_count(&self) -> u32 {
        self.discovery_count
    }

    /// Record that the port was found again in a sweep.
    pub(crate) fn mark_discovered(&mut self) {
        self.discovery_count += 1;
        self.is_reachable = true;
    }

    /// Determine whether the port has not been reported to consumers yet.
    #[inline]
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn clear_new(&mut self) {
        self.is_new = false;
    }

    /// Determine whether the port was found in the current sweep.
    #[inline]
    pub fn is_reachable(&self) -> bool {
        self.is_reachable
    }

    pub fn set_reachable(&mut self, reachable: bool) {
        self.is_reachable = reachable;
    }

    #[inline]
    pub fn virt(&self) -> Option<&VirtData> {
        self.virt.as_ref()
    }

    #[inline]
    pub fn virt_mut(&mut self) -> Option<&mut VirtData> {
        self.virt.as_mut()
    }

    /// Store a `VirtualizationInfo`, creating the vport table on first use.
    pub fn set_virt_info(&mut self, info: VirtualizationInfo) -> &mut VirtData {
        match self.virt {
            Some(ref mut virt) => {
                virt.set_virt_info(info);
                virt
            }
            None => self.virt.insert(VirtData::new(info)),
        }
    }

    fn virt_for(&mut self, index: u16) -> Result<&mut VirtData, TopologyError> {
        self.virt
            .as_mut()
            .ok_or(TopologyError::UnknownVportIndex(index))
    }

    /// Create the vport at `index`. Fails when the port is not virtualized or
    /// the index is beyond the top index.
    pub fn create_vport(&mut self, index: u16, info: VPortInfo) -> Result<&VPort, TopologyError> {
        self.virt_for(index)?.create_vport(index, info)
    }

    /// Store a fresh `VPortInfo` for an existing vport.
    pub fn update_vport(&mut self, index: u16, info: VPortInfo) -> Result<&VPort, TopologyError> {
        self.virt_for(index)?.update_vport(index, info)
    }

    pub fn delete_vport(&mut self, index: u16) -> Option<VPort> {
        self.virt.as_mut()?.delete_vport(index)
    }

    pub fn vport(&self, index: u16) -> Option<&VPort> {
        self.virt.as_ref()?.vport(index)
    }

    pub fn vport_by_lid(&self, lid: Lid) -> Option<&VPort> {
        self.virt.as_ref()?.vport_by_lid(lid)
    }

    /// Drop all virtualization state.
    pub fn delete_virtualization(&mut self) {
        if let Some(virt) = self.virt.take() {
            log::debug!(
                "ibfabric: dropping {} vports of {}",
                virt.num_vports(),
                self.guid
            );
        }
    }

    #[inline]
    pub fn cc(&self) -> Option<&CcPortData> {
        self.cc.as_ref()
    }

    #[inline]
    pub fn cc_mut(&mut self) -> Option<&mut CcPortData> {
        self.cc.as_mut()
    }

    /// Get the congestion control table, creating it on first use.
    pub fn enable_cc(&mut self) -> &mut CcPortData {
        self.cc.get_or_insert_with(CcPortData::new)
    }

    pub fn disable_cc(&mut self) {
        self.cc = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topo::CcResend;

    #[test]
    fn physp_index() {
        let mut lp = LogicalPort::new(Guid(1), Guid(2), vec![PhysPortId::new(3)]);
        assert_eq!(lp.primary(), Ok(PhysPortId::new(3)));
        assert_eq!(lp.physp(1), Err(TopologyError::NoPhysicalPort { index: 1 }));
        lp.add_physp(PhysPortId::new(4));
        lp.add_physp(PhysPortId::new(4));
        assert_eq!(lp.physps().len(), 2);

        let empty = LogicalPort::new(Guid(1), Guid(2), Vec::new());
        assert_eq!(empty.primary(), Err(TopologyError::NoPhysicalPort { index: 0 }));
    }

    #[test]
    fn virtualization_lifecycle() {
        let mut lp = LogicalPort::new(Guid(1), Guid(2), vec![PhysPortId::new(0)]);
        let mut vpi = VPortInfo::new();
        vpi.set_lid_required(1);
        vpi.set_vport_lid(0x40);
        assert_eq!(
            lp.create_vport(0, vpi).unwrap_err(),
            TopologyError::UnknownVportIndex(0)
        );

        let mut vi = VirtualizationInfo::new();
        vi.set_vport_index_top(2);
        lp.set_virt_info(vi);
        lp.create_vport(2, vpi).unwrap();
        assert_eq!(lp.vport_by_lid(0x40).map(VPort::index), Some(2));

        lp.delete_virtualization();
        assert!(lp.virt().is_none());
        assert!(lp.vport(2).is_none());
    }

    #[test]
    fn cc_side_table() {
        let mut lp = LogicalPort::new(Guid(1), Guid(2), vec![PhysPortId::new(0)]);
        assert!(lp.cc().is_none());
        lp.enable_cc().resend -= CcResend::RESEND_ALL;
        assert!(lp.cc().is_some_and(|cc| cc.resend.is_empty()));
        lp.disable_cc();
        assert!(lp.cc_mut().is_none());
    }
}
