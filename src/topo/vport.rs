use super::TopologyError;
use crate::types::{Guid, Lid};
use crate::wire::{PortState, VPortInfo, VirtualizationInfo};

/// Number of vport slots allocated at a time.
pub const VPORTS_BLOCK_SIZE: usize = 128;

/// A virtual port multiplexed over a logical port.
#[derive(Debug, Clone)]
pub struct VPort {
    index: u16,
    info: VPortInfo,

    /// Whether `VPortInfo` should be queried again.
    pub query_info: bool,

    /// Whether the vport has not been reported to consumers yet.
    pub report_new: bool,
}

impl VPort {
    fn new(index: u16, info: VPortInfo) -> Self {
        Self {
            index,
            info,
            query_info: false,
            report_new: true,
        }
    }

    /// Get the index of this vport within its logical port.
    #[inline]
    pub fn index(&self) -> u16 {
        self.index
    }

    #[inline]
    pub fn info(&self) -> &VPortInfo {
        &self.info
    }

    #[inline]
    pub fn guid(&self) -> Guid {
        self.info.port_guid()
    }

    #[inline]
    pub fn lid(&self) -> Lid {
        self.info.vport_lid()
    }

    #[inline]
    pub fn state(&self) -> Option<PortState> {
        PortState::from_raw(self.info.vport_state())
    }
}

/// Virtualization side table of a logical port.
///
/// Vports are indexed by their vport index. The table grows in blocks of
/// [`VPORTS_BLOCK_SIZE`] to cover the advertised top index and never
/// shrinks; only dropping the whole table clears it.
#[derive(Debug, Clone)]
pub struct VirtData {
    info: VirtualizationInfo,
    vports: Vec<Option<VPort>>,

    /// Open virtualization MAD transactions, used to track timeouts.
    transactions: u16,

    /// Whether virtualization data of this port is being discovered for
    /// the first time.
    pub first_discovery: bool,
}

impl VirtData {
    /// Create the table for a port reporting `info`.
    pub fn new(info: VirtualizationInfo) -> Self {
        let mut data = Self {
            info: VirtualizationInfo::new(),
            vports: Vec::new(),
            transactions: 0,
            first_discovery: true,
        };
        data.set_virt_info(info);
        data
    }

    #[inline]
    pub fn info(&self) -> &VirtualizationInfo {
        &self.info
    }

    /// Get the number of vport slots currently allocated.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.vports.len()
    }

    /// Get the number of allocated blocks.
    #[inline]
    pub fn allocated_blocks(&self) -> usize {
        self.vports.len() / VPORTS_BLOCK_SIZE
    }

    /// Store a new `VirtualizationInfo`, growing the table to cover its
    /// top index.
    pub fn set_virt_info(&mut self, info: VirtualizationInfo) {
        self.info = info;
        let needed = info.vport_index_top() as usize + 1;
        let blocks = needed.div_ceil(VPORTS_BLOCK_SIZE);
        if blocks * VPORTS_BLOCK_SIZE > self.vports.len() {
            log::debug!(
                "ibfabric: growing vport table from {} to {} blocks",
                self.allocated_blocks(),
                blocks
            );
            self.vports.resize(blocks * VPORTS_BLOCK_SIZE, None);
        }
    }

    fn check_index(&self, index: u16) -> Result<usize, TopologyError> {
        if index > self.info.vport_index_top() || index as usize >= self.vports.len() {
            return Err(TopologyError::UnknownVportIndex(index));
        }
        Ok(index as usize)
    }

    /// Create, or overwrite, the vport at `index`.
    pub fn create_vport(&mut self, index: u16, info: VPortInfo) -> Result<&VPort, TopologyError> {
        let i = self.check_index(index)?;
        let vport: &VPort = self.vports[i].insert(VPort::new(index, info));
        Ok(vport)
    }

    /// Store a new `VPortInfo` for an existing vport.
    pub fn update_vport(&mut self, index: u16, info: VPortInfo) -> Result<&VPort, TopologyError> {
        let i = self.check_index(index)?;
        let vport = self.vports[i]
            .as_mut()
            .ok_or(TopologyError::UnknownVportIndex(index))?;
        vport.info = info;
        vport.query_info = false;
        Ok(&*vport)
    }

    /// Remove the vport at `index`, returning it.
    pub fn delete_vport(&mut self, index: u16) -> Option<VPort> {
        self.vports.get_mut(index as usize).and_then(Option::take)
    }

    #[inline]
    pub fn vport(&self, index: u16) -> Option<&VPort> {
        self.vports.get(index as usize).and_then(Option::as_ref)
    }

    /// Find the vport that owns `lid`. Vports that share their LID with
    /// another vport are not returned.
    pub fn vport_by_lid(&self, lid: Lid) -> Option<&VPort> {
        self.iter()
            .find(|vp| vp.info.is_lid_required() && vp.lid() == lid)
    }

    /// Iterate over the present vports in index order.
    pub fn iter(&self) -> impl Iterator<Item = &VPort> {
        self.vports.iter().flatten()
    }

    /// Get the number of present vports.
    pub fn num_vports(&self) -> usize {
        self.iter().count()
    }

    pub fn begin_transaction(&mut self) {
        self.transactions = self.transactions.saturating_add(1);
    }

    pub fn end_transaction(&mut self) {
        self.transactions = self.transactions.saturating_sub(1);
    }

    #[inline]
    pub fn transactions(&self) -> u16 {
        self.transactions
    }
}
