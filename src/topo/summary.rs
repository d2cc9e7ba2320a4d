use serde::{Deserialize, Serialize};

use super::{Fabric, PhysPortId};
use crate::dr::Reachability;
use crate::rate::Rate;
use crate::types::{Guid, Lid, Lmc, PortNum};
use crate::wire::{PhysState, PortState};

/// Diagnostic view of one physical port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSummary {
    pub id: PhysPortId,
    pub node: Guid,
    pub port_num: PortNum,
    pub port_guid: Guid,
    pub state: Option<PortState>,
    pub phys_state: Option<PhysState>,
    pub lid: Lid,
    pub lmc: Lmc,

    /// Active rate; only known for linked ports.
    pub rate: Option<Rate>,
    pub remote_node: Option<Guid>,
    pub remote_port: Option<PortNum>,
    pub healthy: bool,
    pub reachability: Reachability,

    /// Wall-clock time of the last port state change.
    pub state_changed: String,
}

impl Fabric {
    /// Summarize every physical port, in the order they were added.
    pub fn summaries(&self) -> Vec<PortSummary> {
        self.physps()
            .map(|(id, p)| {
                let remote = p.remote().and_then(|r| self.physp(r).ok());
                PortSummary {
                    id,
                    node: p.node(),
                    port_num: p.port_num(),
                    port_guid: p.port_guid(),
                    state: p.port_state(),
                    phys_state: p.phys_state(),
                    lid: p.base_lid(),
                    lmc: p.lmc(),
                    rate: remote.and_then(|_| self.link_rate(id).ok()),
                    remote_node: remote.map(|r| r.node()),
                    remote_port: remote.map(|r| r.port_num()),
                    healthy: p.is_healthy(),
                    reachability: p.dr_paths().state(),
                    state_changed: p.state_timestamp_str(),
                }
            })
            .collect()
    }

    /// Dump [`summaries`](Self::summaries) as JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.summaries())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::super::fabric::tests::sample;
    use super::*;

    #[test]
    fn summary_of_sample() {
        let s = sample();
        let all = s.fabric.summaries();
        assert_eq!(all.len(), 6);

        let ca = all.iter().find(|p| p.id == s.ca).unwrap();
        assert_eq!(ca.remote_node, Some(Guid(0x20)));
        assert_eq!(ca.remote_port, Some(1));
        assert_eq!(ca.rate, Some(Rate::Gbps2_5));
        assert_eq!(ca.reachability, Reachability::Reachable(0));

        let a0 = all.iter().find(|p| p.id == s.sw_a0).unwrap();
        assert_eq!(a0.remote_node, None);
        assert_eq!(a0.rate, None);
    }

    #[test]
    fn json_dump_reads_back() -> Result<()> {
        let s = sample();
        let json = s.fabric.to_json()?;
        assert!(json.contains("\"0x0000000000000020\""));

        let back = serde_json::from_str::<Vec<PortSummary>>(&json)?;
        assert_eq!(back, s.fabric.summaries());
        Ok(())
    }
}
