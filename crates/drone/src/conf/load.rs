//! Load — DroneConfig overrides from environment variables.

use std::str::FromStr;

use super::model::DroneConfig;

impl DroneConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from any `DRONE_*` variable that is set and parses.
    /// Unset or unparsable variables leave the field alone.
    pub fn apply_env(&mut self) {
        if let Some(v) = env_parse("DRONE_ARRIVAL_THRESHOLD") {
            self.arrival_threshold = v;
        }
        if let Some(v) = env_parse("DRONE_TAKEOFF_ALTITUDE") {
            self.takeoff_altitude = v;
        }
        if let Some(v) = env_parse("DRONE_CENTRE_PRIORITY") {
            self.centre_priority = v;
        }
        if let Some(v) = env_parse("DRONE_CENTRE_SLACK") {
            self.centre_slack = v;
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
