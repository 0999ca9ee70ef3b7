//! Configuration file loading for tradegate
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `TRADEGATE_*` environment variables (`__` separates nesting)
//! 2. `--config <path>` specified file
//! 3. Project root: `./tradegate.toml` or `./.tradegate.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/tradegate/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    FileCalendarConfig, FileChecklistConfig, FileConfig, FileInstrumentConfig,
    FileKillSwitchConfig, FileLoggingConfig, FileLoopConfig, FilePhaseConfig, FilePhasesConfig,
    FileRiskConfig, FileSafetyConfig,
};
pub use loader::{ConfigLoadError, ConfigLoader, ConfigSource};
