//! An InfiniBand port/link model: the part of a subnet manager that knows
//! what every port is, what it is linked to, how fast the link can go, and
//! how to reach it before it has a LID.
//!
//! `ibfabric` consists of four layers:
//!
//! - [`wire`]: fixed-layout codecs for the management attributes that
//!   describe ports and nodes ([`wire::PortInfo`], [`wire::NodeInfo`], the
//!   vendor [`wire::MlnxExtPortInfo`], ...), plus the directed-route SMP.
//! - [`rate`]: link rate negotiation across the legacy, extended and
//!   extended-2 speed generations.
//! - [`dr`]: directed-route paths and per-port sets of alternate paths with
//!   retry bookkeeping.
//! - [`topo`]: the object model. A [`topo::Fabric`] owns every node,
//!   physical port and logical port, links physical ports to each other, and
//!   keeps their directed routes valid.
//!
//! The library does no I/O of its own. MADs are delivered through the
//! [`topo::MadTransport`] trait, and configuration is read with
//! [`FabricConfig::load_toml`].
//!
//! # Example
//!
//! ```rust
//! use ibfabric::prelude::*;
//! use anyhow::Result;
//!
//! fn main() -> Result<()> {
//!     let mut fabric = Fabric::new(FabricConfig::default());
//!
//!     let mut info = NodeInfo::new();
//!     info.set_node_type_raw(NodeType::Ca as u8);
//!     info.set_num_ports(1);
//!     info.set_node_guid(Guid(0x0002c90300001230));
//!     let node = fabric.add_node(info);
//!     fabric.set_local_node(node)?;
//!
//!     let port = fabric.add_physp(node, 1, Guid(0x0002c90300001231), DrPath::local(0))?;
//!     assert_eq!(fabric.get_active_path(port)?, DrPath::local(0));
//!     Ok(())
//! }
//! ```
//!
//! ## Warning
//!
//! **The interfaces are unstable and up to change!**

pub mod config;
pub mod dr;
pub mod prelude;
pub mod rate;
pub mod topo;
pub mod types;
pub mod wire;

pub use config::{ConfigError, FabricConfig};
pub use types::*;
