//! Fabric — static addressing and routes for the chain, applied once.
//!
//! Every vehicle gets `<subnet>.(id + 1)` and a static route to every other
//! vehicle through whichever neighbour lies in that direction.

use std::net::Ipv4Addr;

use drone::client::{Endpoint, Route};
use drone::nbt::NeighborTable;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FabricError {
    #[error("No vehicles to configure")]
    Empty,
    #[error("{count} vehicles do not fit in a /24")]
    AddressSpaceExhausted { count: usize },
    #[error("Subnet {0} is not a /24 network address")]
    InvalidSubnet(Ipv4Addr),
}

/// Turns neighbour tables into network endpoints.
pub trait FabricConfigurator {
    fn configure(&self, tables: &[NeighborTable]) -> Result<Vec<Endpoint>, FabricError>;
}

#[derive(Debug, Clone)]
pub struct StaticFabric {
    subnet: Ipv4Addr,
    port: u16,
}

/// Host octets 1..=254 are usable.
const MAX_HOSTS: usize = 254;

impl StaticFabric {
    pub fn new(subnet: Ipv4Addr, port: u16) -> Self {
        Self { subnet, port }
    }

    fn host(&self, index: usize) -> Ipv4Addr {
        let [a, b, c, _] = self.subnet.octets();
        Ipv4Addr::new(a, b, c, (index + 1) as u8)
    }

    fn broadcast(&self) -> Ipv4Addr {
        let [a, b, c, _] = self.subnet.octets();
        Ipv4Addr::new(a, b, c, 255)
    }
}

impl FabricConfigurator for StaticFabric {
    fn configure(&self, tables: &[NeighborTable]) -> Result<Vec<Endpoint>, FabricError> {
        if tables.is_empty() {
            return Err(FabricError::Empty);
        }
        if tables.len() > MAX_HOSTS {
            return Err(FabricError::AddressSpaceExhausted { count: tables.len() });
        }
        if self.subnet.octets()[3] != 0 {
            return Err(FabricError::InvalidSubnet(self.subnet));
        }

        let endpoints = tables
            .iter()
            .map(|nbt| {
                let me = nbt.id.index();
                let routes = tables
                    .iter()
                    .map(|other| other.id.index())
                    .filter(|&dest| dest != me)
                    .filter_map(|dest| {
                        let via = match dest < me {
                            true => nbt.predecessor,
                            false => nbt.successor,
                        }?;
                        Some(Route { destination: self.host(dest), next_hop: self.host(via.index()) })
                    })
                    .collect::<Vec<_>>();
                debug!(drone = %nbt.id, addr = %self.host(me), routes = routes.len(), "endpoint configured");
                Endpoint {
                    id: nbt.id,
                    addr: self.host(me),
                    port: self.port,
                    broadcast: self.broadcast(),
                    routes,
                }
            })
            .collect();

        Ok(endpoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(n: usize) -> Vec<NeighborTable> {
        (0..n).map(|i| NeighborTable::initial(i, n)).collect()
    }

    fn fabric() -> StaticFabric {
        StaticFabric::new(Ipv4Addr::new(10, 1, 1, 0), 9)
    }

    #[test]
    fn test_addresses_follow_index() {
        let eps = fabric().configure(&tables(3)).unwrap();
        assert_eq!(eps[0].addr, Ipv4Addr::new(10, 1, 1, 1));
        assert_eq!(eps[2].addr, Ipv4Addr::new(10, 1, 1, 3));
        assert_eq!(eps[1].broadcast, Ipv4Addr::new(10, 1, 1, 255));
        assert_eq!(eps[1].port, 9);
    }

    #[test]
    fn test_routes_go_through_neighbours() {
        let eps = fabric().configure(&tables(5)).unwrap();
        let middle = &eps[2];
        assert_eq!(middle.routes.len(), 4);
        assert_eq!(middle.next_hop(Ipv4Addr::new(10, 1, 1, 1)), Some(Ipv4Addr::new(10, 1, 1, 2)));
        assert_eq!(middle.next_hop(Ipv4Addr::new(10, 1, 1, 5)), Some(Ipv4Addr::new(10, 1, 1, 4)));
        // leader reaches the tail through its successor
        assert_eq!(eps[0].next_hop(Ipv4Addr::new(10, 1, 1, 5)), Some(Ipv4Addr::new(10, 1, 1, 2)));
    }

    #[test]
    fn test_single_vehicle_has_no_routes() {
        let eps = fabric().configure(&tables(1)).unwrap();
        assert!(eps[0].routes.is_empty());
    }

    #[test]
    fn test_errors() {
        assert_eq!(fabric().configure(&[]), Err(FabricError::Empty));
        assert_eq!(
            fabric().configure(&tables(255)),
            Err(FabricError::AddressSpaceExhausted { count: 255 })
        );
        let bad = StaticFabric::new(Ipv4Addr::new(10, 1, 1, 7), 9);
        assert_eq!(bad.configure(&tables(2)), Err(FabricError::InvalidSubnet(Ipv4Addr::new(10, 1, 1, 7))));
    }
}
