//! Conf module — per-vehicle protocol configuration model and loading.

pub mod model;
pub mod load;

pub use model::{CentrePriority, DroneConfig};
