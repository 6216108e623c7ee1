// Per-vehicle protocol for the line-formation swarm.

// Core model
pub mod geo;
pub mod nbt;
pub mod path;
pub mod message;

// Behaviour
pub mod state;
pub mod conf;

// Outside-world seams
pub mod client;
