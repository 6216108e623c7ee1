//! Report — what the swarm looked like when the mission ended.

use chrono::{DateTime, Utc};
use drone::geo::Vec3;
use drone::nbt::DroneId;
use drone::state::{DroneAgent, Phase, Role};
use serde::Serialize;

use crate::metrics::MetricsSnapshot;

#[derive(Debug, Clone, Serialize)]
pub struct AgentReport {
    pub id: DroneId,
    pub role: Role,
    pub phase: Phase,
    pub look_ahead: usize,
    pub reached_index: Option<usize>,
    pub path_len: usize,
    pub position: Option<Vec3>,
    pub closed: bool,
}

impl From<&DroneAgent> for AgentReport {
    fn from(agent: &DroneAgent) -> Self {
        Self {
            id: agent.id(),
            role: agent.role(),
            phase: agent.phase(),
            look_ahead: agent.look_ahead(),
            reached_index: agent.reached_index(),
            path_len: agent.path().len(),
            position: agent.position(),
            closed: agent.is_closed(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MissionReport {
    pub ticks: u64,
    /// Simulated seconds.
    pub elapsed_secs: f64,
    /// Every agent reached `Complete` before teardown.
    pub complete: bool,
    pub agents: Vec<AgentReport>,
    pub metrics: MetricsSnapshot,
    pub finished_at: DateTime<Utc>,
}

impl MissionReport {
    pub fn new(ticks: u64, elapsed_secs: f64, agents: Vec<AgentReport>, metrics: MetricsSnapshot) -> Self {
        let complete = !agents.is_empty() && agents.iter().all(|a| a.phase == Phase::Complete);
        Self {
            ticks,
            elapsed_secs,
            complete,
            agents,
            metrics,
            finished_at: Utc::now(),
        }
    }

    /// Agents that had not finished when the mission stopped.
    pub fn incomplete(&self) -> Vec<DroneId> {
        self.agents
            .iter()
            .filter(|a| a.phase != Phase::Complete)
            .map(|a| a.id)
            .collect()
    }
}
