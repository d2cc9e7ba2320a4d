//! Fabric model configuration.

use std::io::prelude::*;
use std::{fs, io};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Lmc, LMC_MAX};
use crate::wire::{Mtu, OpVls};

/// Configuration loading error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read configuration")]
    Io(#[from] io::Error),

    /// The file is not valid TOML or a value has the wrong type.
    #[error("malformed configuration")]
    Parse(#[from] toml::de::Error),

    /// The file has no `[ibfabric]` table.
    #[error("ibfabric configuration not found")]
    MissingTable,

    /// A value is outside its legal range.
    #[error("bad ibfabric configuration: {key} = {value}")]
    Invalid { key: &'static str, value: u64 },
}

/// Tunables of the port/link model.
///
/// ```toml
/// [ibfabric]
/// max_op_vls = 4
/// fdr10 = false
/// dr_path_max_tries = 3
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricConfig {
    /// Upper bound for negotiated `OperationalVLs` (wire code 1..=5).
    pub max_op_vls: u8,

    /// Whether the vendor FDR10 speed counts as a real rate.
    pub fdr10: bool,

    /// Timeouts on one DR path before rotating to the next.
    pub dr_path_max_tries: u32,

    /// Expected LMC of end ports.
    pub lmc: Lmc,

    /// Upper bound for negotiated link MTU (wire code 1..=5).
    pub max_mtu: u8,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            max_op_vls: OpVls::Vl0To14 as u8,
            fdr10: true,
            dr_path_max_tries: 3,
            lmc: 0,
            max_mtu: Mtu::Mtu4096 as u8,
        }
    }
}

impl FabricConfig {
    /// Load the `[ibfabric]` table of a TOML file.
    pub fn load_toml(config_file: &str) -> Result<Self, ConfigError> {
        let mut file = fs::File::open(config_file)?;
        let mut toml_str = String::new();
        file.read_to_string(&mut toml_str)?;
        Self::from_toml_str(&toml_str)
    }

    /// Parse the `[ibfabric]` table of a TOML document.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let toml: toml::Table = toml::from_str(toml_str)?;
        let table = match toml.get("ibfabric") {
            Some(t) => t.clone(),
            None => return Err(ConfigError::MissingTable),
        };
        let config: Self = table.try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if OpVls::from_raw(self.max_op_vls).is_none() {
            return Err(ConfigError::Invalid {
                key: "max_op_vls",
                value: self.max_op_vls as u64,
            });
        }
        if Mtu::from_raw(self.max_mtu).is_none() {
            return Err(ConfigError::Invalid {
                key: "max_mtu",
                value: self.max_mtu as u64,
            });
        }
        if self.lmc > LMC_MAX {
            return Err(ConfigError::Invalid {
                key: "lmc",
                value: self.lmc as u64,
            });
        }
        if self.dr_path_max_tries == 0 {
            return Err(ConfigError::Invalid {
                key: "dr_path_max_tries",
                value: 0,
            });
        }
        Ok(())
    }
}
