// Swarm planner: lays out the chain, runs the tick loop, tears it down.

// Ambient
pub mod config;
pub mod error;
pub mod metrics;

// Mission
pub mod coordinator;
pub mod fabric;
pub mod report;
pub mod runtime;
