use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::{Context, Result};
use drone::conf::DroneConfig;
use drone::geo::Vec3;
use drone::path::{ScanPattern, ScanSchedule};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PlannerConfig {
    pub swarm: SwarmConfig,
    pub timing: TimingConfig,
    pub mission: MissionConfig,
    pub drone: DroneConfig,
    pub fleet: FleetConfig,
    pub network: NetworkConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SwarmConfig {
    pub num_drones: usize,
    /// Distance between spawn points along x, metres.
    pub spacing: f64,
    /// Where the tail spawns; the rest of the line extends along +x.
    pub base: Vec3,
    /// Enable the Centre branch point (needs at least three vehicles).
    pub centre_enabled: bool,
    /// Centre index; `num_drones / 2` when unset.
    pub centre_id: Option<usize>,
    pub delivery: Delivery,
}

/// How announcements leave a vehicle. Acks are always unicast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    Unicast,
    Broadcast,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Message send period.
    pub pkt_interval_ms: u64,
    /// Tick period: telemetry refresh and state-machine step.
    pub pos_interval_ms: u64,
    pub stop_time_secs: u64,
    /// Pace ticks against the wall clock instead of running flat out.
    pub realtime: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MissionConfig {
    pub disaster_centre: Vec3,
    pub lawnmower: LawnMowerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LawnMowerConfig {
    pub strip_spacing: f64,
    pub leg_length: f64,
    pub strips: usize,
    /// Fly the pattern again this often; a single pass when unset.
    pub repeat_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Simulated cruise speed, metres per second.
    pub speed: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// /24 network the vehicles are addressed in.
    pub subnet: Ipv4Addr,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    File { path: String },
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            num_drones: 5,
            spacing: 5.0,
            base: Vec3::ZERO,
            centre_enabled: true,
            centre_id: None,
            delivery: Delivery::Unicast,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            pkt_interval_ms: 500,
            pos_interval_ms: 100,
            stop_time_secs: 600,
            realtime: false,
        }
    }
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            disaster_centre: Vec3::new(150.0, 0.0, 10.0),
            lawnmower: LawnMowerConfig::default(),
        }
    }
}

impl Default for LawnMowerConfig {
    fn default() -> Self {
        Self {
            strip_spacing: 10.0,
            leg_length: 40.0,
            strips: 4,
            repeat_interval_secs: None,
        }
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self { speed: 5.0 }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            subnet: Ipv4Addr::new(10, 1, 1, 0),
            port: 9,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,planner=debug,drone=info".to_string(),
            format: LogFormat::Pretty,
            output: LogOutput::Stdout,
        }
    }
}

impl SwarmConfig {
    /// Index of the Centre node, if the swarm has one.
    pub fn resolved_centre(&self) -> Option<usize> {
        if !self.centre_enabled || self.num_drones < 3 {
            return None;
        }
        Some(self.centre_id.unwrap_or(self.num_drones / 2))
    }
}

impl TimingConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.pos_interval_ms)
    }

    pub fn stop_time(&self) -> Duration {
        Duration::from_secs(self.stop_time_secs)
    }

    /// Messages leave every this many ticks.
    pub fn send_every(&self) -> u64 {
        (self.pkt_interval_ms / self.pos_interval_ms.max(1)).max(1)
    }
}

impl MissionConfig {
    pub fn schedule(&self) -> ScanSchedule {
        ScanSchedule {
            pattern: ScanPattern {
                origin: self.disaster_centre,
                strip_spacing: self.lawnmower.strip_spacing,
                leg_length: self.lawnmower.leg_length,
                strips: self.lawnmower.strips,
            },
            repeat: self.lawnmower.repeat_interval_secs.map(Duration::from_secs),
        }
    }
}

impl PlannerConfig {
    /// Load configuration from planner.toml and environment variables
    pub fn load() -> Result<Self> {
        // Try these locations in order:
        // 1. /etc/swarm/planner.toml (deployment)
        // 2. config/planner.toml (local development)
        // 3. crates/planner/config/planner.toml (workspace root)
        Self::layered(&["/etc/swarm/planner", "config/planner", "crates/planner/config/planner"], false)
    }

    /// Load from one explicit file (which must exist), then environment.
    pub fn load_from(path: &str) -> Result<Self> {
        Self::layered(&[path], true)
    }

    fn layered(paths: &[&str], required: bool) -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = config::Config::try_from(&PlannerConfig::default())
            .context("Failed to serialize default configuration")?;

        let mut builder = config::Config::builder().add_source(defaults);

        for path in paths {
            builder = builder.add_source(config::File::with_name(path).required(required));
        }

        // Nested keys use double underscores: PLANNER__SWARM__NUM_DRONES
        builder = builder.add_source(
            config::Environment::with_prefix("PLANNER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: PlannerConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // DRONE_* tuning wins over both the [drone] table and PLANNER__DRONE__*
        config.drone.apply_env();
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let n = self.swarm.num_drones;
        if n == 0 {
            anyhow::bail!("swarm.num_drones must be at least 1");
        }
        if !(self.swarm.spacing >= 0.0) {
            anyhow::bail!("swarm.spacing must be >= 0");
        }
        if self.timing.pkt_interval_ms == 0 || self.timing.pos_interval_ms == 0 {
            anyhow::bail!("timing intervals must be positive");
        }
        if self.timing.stop_time() < self.timing.tick() {
            anyhow::bail!(
                "timing.stop_time_secs ({}) is shorter than one tick ({} ms)",
                self.timing.stop_time_secs,
                self.timing.pos_interval_ms
            );
        }
        if let (true, Some(c)) = (self.swarm.centre_enabled, self.swarm.centre_id) {
            if c == 0 || c + 1 >= n {
                anyhow::bail!("swarm.centre_id {} is not an interior node of a {}-vehicle chain", c, n);
            }
        }
        let mower = &self.mission.lawnmower;
        if !(mower.strip_spacing > 0.0) || !(mower.leg_length >= 0.0) {
            anyhow::bail!("mission.lawnmower spacing must be positive and leg_length >= 0");
        }
        if mower.repeat_interval_secs == Some(0) {
            anyhow::bail!("mission.lawnmower.repeat_interval_secs must be positive when set");
        }
        if !(self.fleet.speed > 0.0) {
            anyhow::bail!("fleet.speed must be positive");
        }
        self.drone
            .validate()
            .map_err(|e| anyhow::anyhow!("drone: {}", e))?;
        Ok(())
    }
}
