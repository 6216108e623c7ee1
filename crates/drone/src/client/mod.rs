//! Client module — the seams between an agent and the outside world.
//!
//! - `channel.rs` defines [`MessageChannel`], the datagram transport between
//!   neighbours, plus the [`Endpoint`] a vehicle is bound to.
//! - `vehicle.rs` defines the telemetry feed, motion command sink and
//!   dynamics traits.
//! - `loopback.rs` and `sim.rs` provide in-process implementations used by
//!   the planner's simulation mode and by tests.

pub mod channel;
pub mod loopback;
pub mod sim;
pub mod vehicle;

pub use channel::{ChannelError, Endpoint, MessageChannel, Route};
pub use loopback::{LoopbackChannel, SentRecord};
pub use sim::SimulatedFleet;
pub use vehicle::{Dynamics, MotionSink, PositionFeed};
