//! State module — chain roles, phases, inbound buffering and the per-vehicle
//! state machine.

pub mod agent;
pub mod mailbox;
pub mod phase;
pub mod role;

pub use agent::{Absorbed, DroneAgent, Inbound, MotionCommand, StepOutcome};
pub use phase::Phase;
pub use role::{Role, Side};
