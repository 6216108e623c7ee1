//! Mailbox — single-slot inbound buffer per direction, drained once per tick.

use crate::message::{Announce, StatusAck};

/// Holds at most one pending message from each neighbour.
///
/// Several arrivals between two drains collapse to one: the message with
/// the highest look-ahead index wins, later arrivals win ties. Arrival
/// order within a tick therefore does not matter.
#[derive(Debug, Default, Clone)]
pub struct Mailbox {
    announce: Option<Announce>,
    ack: Option<StatusAck>,
}

impl Mailbox {
    /// Returns `true` when an announcement with a lower look-ahead was
    /// discarded, whether that was the incoming one or the one held.
    pub fn put_announce(&mut self, msg: Announce) -> bool {
        match self.announce.as_ref().map(|held| held.look_ahead_index) {
            Some(held) if held > msg.look_ahead_index => true,
            Some(held) => {
                let stale = held < msg.look_ahead_index;
                self.announce = Some(msg);
                stale
            }
            None => {
                self.announce = Some(msg);
                false
            }
        }
    }

    pub fn put_ack(&mut self, msg: StatusAck) {
        match &self.ack {
            Some(held) if held.look_ahead_index > msg.look_ahead_index => {}
            _ => self.ack = Some(msg),
        }
    }

    pub fn take_announce(&mut self) -> Option<Announce> {
        self.announce.take()
    }

    pub fn take_ack(&mut self) -> Option<StatusAck> {
        self.ack.take()
    }

    pub fn is_empty(&self) -> bool {
        self.announce.is_none() && self.ack.is_none()
    }
}
