use drone::client::ChannelError;
use thiserror::Error;

use crate::fabric::FabricError;

/// Standard Result type for the planner
pub type Result<T> = std::result::Result<T, PlannerError>;

#[derive(Debug, Error)]
pub enum PlannerError {
    /// Addressing or socket setup failed; the mission must not start.
    #[error("Setup failed ({stage}): {detail}")]
    Setup { stage: &'static str, detail: String },

    #[error("Invalid swarm: {0}")]
    InvalidSwarm(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Mission not ready: {0}")]
    NotReady(&'static str),
}

impl PlannerError {
    pub fn is_setup(&self) -> bool {
        matches!(self, PlannerError::Setup { .. })
    }
}

impl From<FabricError> for PlannerError {
    fn from(err: FabricError) -> Self {
        PlannerError::Setup { stage: "fabric", detail: err.to_string() }
    }
}

impl From<ChannelError> for PlannerError {
    fn from(err: ChannelError) -> Self {
        PlannerError::Setup { stage: "sockets", detail: err.to_string() }
    }
}
