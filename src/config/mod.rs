//! Configuration module
//!
//! Client configuration: tracker addresses, pool ceiling and timeouts,
//! loaded from TOML with environment overrides.

mod defaults;
mod loading;
mod types;
mod validation;

pub use loading::{apply_env_overrides, load_config};
pub use types::Config;

// Re-export default functions for use in tests and other modules
pub use defaults::{dial_timeout, health_check_interval, max_connections, network_timeout};
