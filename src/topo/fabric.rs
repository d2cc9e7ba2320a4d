use std::collections::hash_map::Entry;
use std::collections::HashMap;

use quanta::Clock;

use super::{LogicalPort, Node, PhysPortId, PhysicalPort, TopologyError, TopologyView};
use crate::config::FabricConfig;
use crate::dr::DrPath;
use crate::types::{Guid, PortNum};
use crate::wire::NodeInfo;

/// The discovered subnet: every node, physical port and logical port.
///
/// Physical ports live in an arena indexed by [`PhysPortId`]; a removed
/// port leaves an empty slot behind and its id is never handed out again.
#[derive(Debug, Clone)]
pub struct Fabric {
    pub(super) config: FabricConfig,
    pub(super) clock: Clock,
    epoch: u64,

    /// The node the management traffic originates from.
    pub(super) local: Option<Guid>,
    pub(super) next_trans_id: u64,

    pub(super) nodes: HashMap<Guid, Node>,
    pub(super) physps: Vec<Option<PhysicalPort>>,
    pub(super) ports: HashMap<Guid, LogicalPort>,
}

impl Fabric {
    /// Create an empty fabric.
    pub fn new(config: FabricConfig) -> Self {
        Self::with_clock(config, Clock::new())
    }

    /// Create an empty fabric that takes its timestamps from `clock`.
    pub fn with_clock(config: FabricConfig, clock: Clock) -> Self {
        Self {
            config,
            clock,
            epoch: 0,
            local: None,
            next_trans_id: 1,
            nodes: HashMap::new(),
            physps: Vec::new(),
            ports: HashMap::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &FabricConfig {
        &self.config
    }

    #[inline]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Get the number of sweeps started so far.
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Start a sweep. Every logical port is unreachable until it is added
    /// again by discovery.
    pub fn begin_sweep(&mut self) -> u64 {
        self.epoch += 1;
        for lp in self.ports.values_mut() {
            lp.set_reachable(false);
        }
        log::debug!("ibfabric: sweep {} started", self.epoch);
        self.epoch
    }

    /// Finish a sweep, dropping the logical ports that were not found again.
    /// Returns their GUIDs.
    pub fn end_sweep(&mut self) -> Vec<Guid> {
        let mut gone = self
            .ports
            .values()
            .filter(|lp| !lp.is_reachable())
            .map(LogicalPort::guid)
            .collect::<Vec<_>>();
        gone.sort();

        for guid in &gone {
            self.ports.remove(guid);
        }
        if !gone.is_empty() {
            log::info!(
                "ibfabric: sweep {} lost {} logical ports",
                self.epoch,
                gone.len()
            );
        }
        gone
    }

    /// Get the node management traffic originates from.
    #[inline]
    pub fn local_node(&self) -> Option<Guid> {
        self.local
    }

    /// Set the node management traffic originates from. Directed routes
    /// are walked from here.
    pub fn set_local_node(&mut self, guid: Guid) -> Result<(), TopologyError> {
        if !self.nodes.contains_key(&guid) {
            return Err(TopologyError::NodeNotFound(guid));
        }
        self.local = Some(guid);
        Ok(())
    }

    /// Add the node described by `info`, or refresh it if already known.
    pub fn add_node(&mut self, info: NodeInfo) -> Guid {
        let guid = info.node_guid();
        match self.nodes.entry(guid) {
            Entry::Occupied(e) => {
                let node = e.into_mut();
                node.set_info(info);
                node.mark_discovered();
            }
            Entry::Vacant(e) => {
                log::debug!(
                    "ibfabric: new {:?} node {} with {} ports",
                    info.node_type(),
                    guid,
                    info.num_ports()
                );
                e.insert(Node::new(info));
            }
        }
        guid
    }

    pub fn node(&self, guid: Guid) -> Result<&Node, TopologyError> {
        self.nodes.get(&guid).ok_or(TopologyError::NodeNotFound(guid))
    }

    pub fn node_mut(&mut self, guid: Guid) -> Result<&mut Node, TopologyError> {
        self.nodes
            .get_mut(&guid)
            .ok_or(TopologyError::NodeNotFound(guid))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Remove a node together with its physical and logical ports. Links
    /// to its neighbors are dropped without backup.
    pub fn remove_node(&mut self, guid: Guid) -> Result<Node, TopologyError> {
        let node = self
            .nodes
            .remove(&guid)
            .ok_or(TopologyError::NodeNotFound(guid))?;

        for id in node.physps() {
            if let Some(remote) = self.physp(id).ok().and_then(PhysicalPort::remote) {
                self.unlink(id, remote, false)?;
            }
            if let Some(slot) = self.physps.get_mut(id.index()) {
                *slot = None;
            }
        }
        self.ports.retain(|_, lp| lp.node() != guid);
        if self.local == Some(guid) {
            self.local = None;
        }

        log::info!("ibfabric: removed node {}", guid);
        Ok(node)
    }

    /// Add physical port `port_num` of a node, first reached through `path`.
    pub fn add_physp(
        &mut self,
        node_guid: Guid,
        port_num: PortNum,
        port_guid: Guid,
        path: DrPath,
    ) -> Result<PhysPortId, TopologyError> {
        let node = self
            .nodes
            .get_mut(&node_guid)
            .ok_or(TopologyError::NodeNotFound(node_guid))?;
        if !node.has_port_num(port_num) {
            return Err(TopologyError::BadPortNum {
                node: node_guid,
                port: port_num,
            });
        }
        if node.physp(port_num).is_some() {
            return Err(TopologyError::DuplicatePort {
                node: node_guid,
                port: port_num,
            });
        }

        let id = PhysPortId::new(self.physps.len());
        let mut physp = PhysicalPort::new(node_guid, port_num, port_guid, path, &self.clock);
        physp.expected_lmc = if node.is_switch() { 0 } else { self.config.lmc };
        self.physps.push(Some(physp));
        node.attach(port_num, id);
        Ok(id)
    }

    pub fn physp(&self, id: PhysPortId) -> Result<&PhysicalPort, TopologyError> {
        self.physps
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(TopologyError::PortNotFound(id))
    }

    pub fn physp_mut(&mut self, id: PhysPortId) -> Result<&mut PhysicalPort, TopologyError> {
        self.physps
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(TopologyError::PortNotFound(id))
    }

    /// Find physical port `port_num` of a node.
    pub fn find_physp(&self, node_guid: Guid, port_num: PortNum) -> Option<PhysPortId> {
        self.nodes.get(&node_guid)?.physp(port_num)
    }

    /// Iterate over every physical port, in the order they were added.
    pub fn physps(&self) -> impl Iterator<Item = (PhysPortId, &PhysicalPort)> {
        self.physps
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_ref().map(|p| (PhysPortId::new(i), p)))
    }

    /// Add a logical port over `physps` (primary first), or refresh it if
    /// already known. A refreshed port is reachable again and keeps its
    /// "new" state.
    pub fn add_logical_port(
        &mut self,
        guid: Guid,
        node: Guid,
        physps: Vec<PhysPortId>,
    ) -> Result<&mut LogicalPort, TopologyError> {
        if !self.nodes.contains_key(&node) {
            return Err(TopologyError::NodeNotFound(node));
        }
        for &id in &physps {
            if self.physp(id)?.node() != node {
                return Err(TopologyError::PortOnOtherNode { port: id, node });
            }
            let owner = self
                .ports
                .values()
                .find(|lp| lp.guid() != guid && lp.physps().contains(&id));
            if let Some(owner) = owner {
                return Err(TopologyError::PortAlreadyOwned {
                    port: id,
                    owner: owner.guid(),
                });
            }
        }
        let lid = match physps.first() {
            Some(&id) => self.physp(id)?.base_lid(),
            None => 0,
        };

        let lp = match self.ports.entry(guid) {
            Entry::Occupied(e) => {
                let lp = e.into_mut();
                lp.mark_discovered();
                for id in physps {
                    lp.add_physp(id);
                }
                lp
            }
            Entry::Vacant(e) => {
                log::debug!("ibfabric: new logical port {} on node {}", guid, node);
                e.insert(LogicalPort::new(guid, node, physps))
            }
        };
        lp.set_lid(lid);
        Ok(lp)
    }

    pub fn logical_port(&self, guid: Guid) -> Result<&LogicalPort, TopologyError> {
        self.ports
            .get(&guid)
            .ok_or(TopologyError::LogicalPortNotFound(guid))
    }

    pub fn logical_port_mut(&mut self, guid: Guid) -> Result<&mut LogicalPort, TopologyError> {
        self.ports
            .get_mut(&guid)
            .ok_or(TopologyError::LogicalPortNotFound(guid))
    }

    pub fn logical_ports(&self) -> impl Iterator<Item = &LogicalPort> {
        self.ports.values()
    }

    /// Remove a logical port. Its physical ports stay in place.
    pub fn remove_logical_port(&mut self, guid: Guid) -> Result<LogicalPort, TopologyError> {
        self.ports
            .remove(&guid)
            .ok_or(TopologyError::LogicalPortNotFound(guid))
    }

    /// Detach a physical port from a logical port.
    pub fn detach_physp(&mut self, guid: Guid, id: PhysPortId) -> Result<(), TopologyError> {
        self.logical_port_mut(guid)?.remove_physp(id);
        Ok(())
    }

    /// Name a port for log messages.
    pub(super) fn port_name(&self, id: PhysPortId) -> String {
        match self.physp(id) {
            Ok(p) => format!("{} port {}", p.node(), p.port_num()),
            Err(_) => id.to_string(),
        }
    }

    /// Link two physical ports to each other.
    ///
    /// Linking a pair that is already linked to each other does nothing.
    /// Fails if either port is linked to some other port.
    pub fn link(&mut self, a: PhysPortId, b: PhysPortId) -> Result<(), TopologyError> {
        let ra = self.physp(a)?.remote();
        let rb = self.physp(b)?.remote();
        if ra == Some(b) && rb == Some(a) {
            return Ok(());
        }
        if ra.is_some() || rb.is_some() {
            return Err(TopologyError::LinkAlreadyExists { a, b });
        }

        self.physp_mut(a)?.set_remote(b);
        self.physp_mut(b)?.set_remote(a);
        log::info!(
            "ibfabric: linked {} <-> {}",
            self.port_name(a),
            self.port_name(b)
        );
        Ok(())
    }

    /// Unlink two physical ports linked to each other.
    ///
    /// With `backup`, each side remembers the other as its previous
    /// partner. Without, previous partners are forgotten too and both
    /// state timestamps move to now.
    pub fn unlink(&mut self, a: PhysPortId, b: PhysPortId, backup: bool) -> Result<(), TopologyError> {
        if self.physp(a)?.remote() != Some(b) || self.physp(b)?.remote() != Some(a) {
            return Err(TopologyError::NotLinked(a));
        }

        for id in [a, b] {
            let physp = self
                .physps
                .get_mut(id.index())
                .and_then(Option::as_mut)
                .ok_or(TopologyError::PortNotFound(id))?;
            physp.clear_remote(backup);
            if !backup {
                physp.touch(&self.clock);
            }
        }
        log::info!(
            "ibfabric: unlinked {} <-> {}",
            self.port_name(a),
            self.port_name(b)
        );
        Ok(())
    }

    /// Determine whether `a` and `b` are linked to each other.
    pub fn link_exists(&self, a: PhysPortId, b: PhysPortId) -> bool {
        let remote = |id| self.physp(id).ok().and_then(PhysicalPort::remote);
        remote(a) == Some(b) && remote(b) == Some(a)
    }

    /// Determine whether `a` is linked to anything.
    pub fn has_any_link(&self, a: PhysPortId) -> bool {
        self.physp(a).is_ok_and(|p| p.remote().is_some())
    }

    /// Get the link partner of `a`.
    pub fn remote(&self, a: PhysPortId) -> Result<PhysPortId, TopologyError> {
        self.physp(a)?.remote().ok_or(TopologyError::NotLinked(a))
    }

    pub fn set_health(&mut self, a: PhysPortId, healthy: bool) -> Result<(), TopologyError> {
        self.physp_mut(a)?.set_health(healthy);
        Ok(())
    }

    /// Determine whether `a` and its link partner (if any) are both healthy.
    pub fn is_link_healthy(&self, a: PhysPortId) -> Result<bool, TopologyError> {
        let physp = self.physp(a)?;
        if !physp.is_healthy() {
            return Ok(false);
        }
        match physp.remote() {
            Some(remote) => Ok(self.physp(remote)?.is_healthy()),
            None => Ok(true),
        }
    }

    /// Get the port whose `PortInfo` carries the capability masks of `a`:
    /// port 0 on a switch, `a` itself otherwise.
    pub fn capabilities_physp(&self, a: PhysPortId) -> Result<PhysPortId, TopologyError> {
        let node = self.node(self.physp(a)?.node())?;
        if node.is_switch() {
            Ok(node.physp(0).unwrap_or(a))
        } else {
            Ok(a)
        }
    }

    /// Allocate a transaction id for an outgoing MAD.
    pub(super) fn next_trans_id(&mut self) -> u64 {
        let id = self.next_trans_id;
        self.next_trans_id = self.next_trans_id.wrapping_add(1);
        id
    }
}

impl TopologyView for Fabric {
    fn is_port_healthy(&self, guid: Guid) -> bool {
        if let Some(lp) = self.ports.get(&guid) {
            return lp
                .primary()
                .and_then(|id| self.physp(id))
                .is_ok_and(PhysicalPort::is_healthy);
        }
        self.physps()
            .find(|(_, p)| p.port_guid() == guid)
            .is_some_and(|(_, p)| p.is_healthy())
    }
}
