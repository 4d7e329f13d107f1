// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Runtime configuration
//!
//! `GeConfig` is loaded from TOML, with every field optional:
//!
//! ```toml
//! ram_size = 0x2000000
//! software_skinning = false
//! flush_on_end = true
//! call_stack_depth = 32
//! max_display_lists = 64
//! threaded = false
//! event_queue_capacity = 256
//! fast_matrix_load = true
//!
//! [block_transfer_cost]
//! numerator = 16
//! denominator = 10
//! ```
//!
//! A few fields can also be overridden from the environment (or a `.env`
//! file loaded by the binary): `GERX_SOFTWARE_SKINNING`, `GERX_THREADED`
//! and `GERX_FAST_MATRIX_LOAD`.

use crate::core::error::{ConfigError, Result};
use crate::core::ge::{DispatchConfig, TransferCost};
use crate::core::memory::GuestMemory;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// GE processor settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeConfig {
    /// Size of guest main RAM in bytes
    pub ram_size: u32,

    /// Skin on the CPU; changes how VERTEXTYPE is dispatched
    pub software_skinning: bool,

    /// Flush pending geometry at every END
    pub flush_on_end: bool,

    /// CALL nesting limit per list
    pub call_stack_depth: u32,

    /// Number of display list slots
    pub max_display_lists: u32,

    /// Block transfer cycle cost per byte
    pub block_transfer_cost: TransferCost,

    /// Run the processor on its own worker thread
    pub threaded: bool,

    /// Capacity of the worker event queue
    pub event_queue_capacity: u32,

    /// Let matrix NUM commands consume the following DATA words directly
    pub fast_matrix_load: bool,
}

impl GeConfig {
    /// Largest CALL depth accepted
    pub const MAX_CALL_STACK_DEPTH: u32 = 255;

    pub fn new() -> Self {
        Self {
            ram_size: GuestMemory::DEFAULT_RAM_SIZE,
            software_skinning: false,
            flush_on_end: true,
            call_stack_depth: 32,
            max_display_lists: 64,
            block_transfer_cost: TransferCost::default(),
            threaded: false,
            event_queue_capacity: 256,
            fast_matrix_load: true,
        }
    }

    /// Parse and validate a TOML document
    ///
    /// # Examples
    ///
    /// ```
    /// use gerx::core::config::GeConfig;
    ///
    /// let config = GeConfig::from_toml_str("call_stack_depth = 8").unwrap();
    /// assert_eq!(config.call_stack_depth, 8);
    /// assert_eq!(config.max_display_lists, 64);
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: GeConfig = toml::from_str(text).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        log::info!("Loaded configuration from {}", path.as_ref().display());
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| crate::core::error::EmulatorError::Parse(e.to_string()))
    }

    /// Apply `GERX_*` environment overrides
    pub fn apply_env(&mut self) {
        if let Some(value) = env_flag("GERX_SOFTWARE_SKINNING") {
            self.software_skinning = value;
        }
        if let Some(value) = env_flag("GERX_THREADED") {
            self.threaded = value;
        }
        if let Some(value) = env_flag("GERX_FAST_MATRIX_LOAD") {
            self.fast_matrix_load = value;
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.ram_size == 0 || self.ram_size > GuestMemory::MAX_RAM_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "ram_size",
                reason: format!(
                    "must be between 1 and 0x{:X} bytes",
                    GuestMemory::MAX_RAM_SIZE
                ),
            });
        }
        if self.call_stack_depth == 0 || self.call_stack_depth > Self::MAX_CALL_STACK_DEPTH {
            return Err(ConfigError::InvalidValue {
                field: "call_stack_depth",
                reason: format!("must be between 1 and {}", Self::MAX_CALL_STACK_DEPTH),
            });
        }
        if self.max_display_lists == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_display_lists",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.block_transfer_cost.denominator == 0 {
            return Err(ConfigError::InvalidValue {
                field: "block_transfer_cost.denominator",
                reason: "must not be zero".to_string(),
            });
        }
        if self.event_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "event_queue_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Settings that affect the dispatch table
    pub fn dispatch(&self) -> DispatchConfig {
        DispatchConfig {
            software_skinning: self.software_skinning,
        }
    }
}

impl Default for GeConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        other => {
            log::warn!("Ignoring {}={}: expected a boolean", name, other);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = GeConfig::default();
        assert_eq!(config.call_stack_depth, 32);
        assert_eq!(config.block_transfer_cost, TransferCost::default());
        assert!(config.flush_on_end);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = GeConfig::from_toml_str(
            "software_skinning = true\n[block_transfer_cost]\nnumerator = 19\ndenominator = 10\n",
        )
        .unwrap();

        assert!(config.software_skinning);
        assert_eq!(config.block_transfer_cost.numerator, 19);
        assert_eq!(config.max_display_lists, 64);
        assert!(config.dispatch().software_skinning);
    }

    #[test]
    fn test_invalid_stack_depth_rejected() {
        let err = GeConfig::from_toml_str("call_stack_depth = 0").unwrap_err();
        assert!(err.to_string().contains("call_stack_depth"));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        assert!(GeConfig::from_toml_str("threaded = maybe").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "threaded = true\nevent_queue_capacity = 16").unwrap();

        let config = GeConfig::load(file.path()).unwrap();

        assert!(config.threaded);
        assert_eq!(config.event_queue_capacity, 16);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = GeConfig::new();
        config.fast_matrix_load = false;

        let text = config.to_toml_string().unwrap();
        assert_eq!(GeConfig::from_toml_str(&text).unwrap(), config);
    }
}
