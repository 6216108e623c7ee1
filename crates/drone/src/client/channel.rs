//! Channel — datagram transport between adjacent vehicles.

use std::net::Ipv4Addr;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

use crate::nbt::DroneId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("No endpoint open for {0}")]
    NotOpen(DroneId),
    #[error("Endpoint already open for {0}")]
    AlreadyOpen(DroneId),
    #[error("Endpoint for {0} has been closed")]
    Closed(DroneId),
    #[error("No route from {from} to {to}")]
    Unreachable { from: DroneId, to: DroneId },
    #[error("Transport failure: {0}")]
    Transport(String),
}

/// Static next-hop entry in a vehicle's routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Route {
    pub destination: Ipv4Addr,
    pub next_hop: Ipv4Addr,
}

/// Network identity of one vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub id: DroneId,
    pub addr: Ipv4Addr,
    pub port: u16,
    pub broadcast: Ipv4Addr,
    pub routes: Vec<Route>,
}

impl Endpoint {
    /// Next hop towards `dest`, if a static route exists.
    pub fn next_hop(&self, dest: Ipv4Addr) -> Option<Ipv4Addr> {
        self.routes
            .iter()
            .find(|r| r.destination == dest)
            .map(|r| r.next_hop)
    }
}

/// Datagram transport used by the coordinator.
///
/// Sends are fire-and-forget: a successful return says the datagram left,
/// not that it arrived. Received payloads are returned undecoded.
pub trait MessageChannel: Send + Sync {
    /// Bind the endpoint. Fails if it is already open.
    fn open(&self, endpoint: &Endpoint) -> Result<(), ChannelError>;

    /// Send to one neighbour.
    fn send_unicast(&self, from: DroneId, to: DroneId, payload: Bytes) -> Result<(), ChannelError>;

    /// Send to everything in radio range of `from`.
    fn send_broadcast(&self, from: DroneId, payload: Bytes) -> Result<(), ChannelError>;

    /// Drain everything that arrived for `id` since the last call.
    fn receive(&self, id: DroneId) -> Result<Vec<Bytes>, ChannelError>;

    /// Unbind the endpoint. Closing an already-closed endpoint is an error
    /// the caller may ignore.
    fn close(&self, id: DroneId) -> Result<(), ChannelError>;
}
