//! Layered safety configuration
//!
//! Defaults, then an optional TOML/JSON file, then `RIDESAFE_*`
//! environment variables (`__` separates nested keys, e.g.
//! `RIDESAFE_CRASH__ACCEL_THRESHOLD=18.5`).

use std::path::Path;

use alerting::EscalationConfig;
use crash_detection::CrashConfig;
use dms::DmsConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::SessionError;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "RIDESAFE";

/// All thresholds for a monitoring session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub dms: DmsConfig,
    pub crash: CrashConfig,
    pub escalation: EscalationConfig,
}

impl SafetyConfig {
    /// Load from defaults, an optional file, and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, SessionError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            info!("Loading safety configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: Self = builder
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| SessionError::Config(e.to_string()))?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), SessionError> {
        self.dms.validate()?;
        self.crash.validate()?;
        self.escalation.validate()?;
        Ok(())
    }
}
