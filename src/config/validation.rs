//! Configuration validation
//!
//! Checks the semantic constraints serde cannot express before any pool is
//! created.

use super::types::Config;
use crate::constants::pool::MIN_CONNECTIONS;
use crate::error::{ClientError, Result};

impl Config {
    /// Validate configuration for correctness
    ///
    /// - At least one tracker, none blank
    /// - Pool ceiling not below the floor of 5
    /// - Non-zero timeouts and health check interval
    pub fn validate(&self) -> Result<()> {
        if self.tracker_addrs.is_empty() {
            return Err(ClientError::config(
                "configuration must have at least one tracker address",
            ));
        }

        if let Some(index) = self
            .tracker_addrs
            .iter()
            .position(|addr| addr.trim().is_empty())
        {
            return Err(ClientError::config(format!(
                "tracker address #{index} is blank"
            )));
        }

        if self.max_connections < MIN_CONNECTIONS {
            return Err(ClientError::config(format!(
                "max_connections is {} but must be at least {MIN_CONNECTIONS}",
                self.max_connections
            )));
        }

        if self.dial_timeout.is_zero() || self.network_timeout.is_zero() {
            return Err(ClientError::config("timeouts must be greater than zero"));
        }

        if self.health_check_interval.is_zero() {
            return Err(ClientError::config(
                "health_check_interval must be greater than zero",
            ));
        }

        Ok(())
    }
}
