//! Tick — the per-tick passes, in the order [`SwarmCoordinator::advance_pos`] runs them.
//!
//! Every mailbox is drained before any agent steps, so an agent only ever
//! acts on messages produced during an earlier tick.

use drone::client::{Dynamics, MessageChannel, MotionSink, PositionFeed};
use drone::message::{Announce, Message, StatusAck};
use drone::nbt::DroneId;
use drone::state::{Absorbed, Inbound};
use tracing::{debug, info, trace, warn};

use super::SwarmCoordinator;

impl<C, V> SwarmCoordinator<C, V>
where
    C: MessageChannel,
    V: PositionFeed + MotionSink + Dynamics,
{
    /// One full tick, then vehicle dynamics for one tick period.
    pub fn advance_pos(&mut self) {
        self.update_socs_from_rec();
        for i in 0..self.agents.len() {
            self.update_wpts(self.agents[i].id());
        }
        self.update_state_of_centre();

        let dt = self.tick_period();
        self.vehicles.advance(dt);
        self.clock += dt;

        self.update_pos_socs();
        self.inc_look_ahead();

        self.ticks += 1;
        self.metrics.tick();
    }

    /// Messages leave on every `send_every`-th tick only.
    fn send_tick(&self) -> bool {
        self.ticks % self.send_every == 0
    }

    /// Drain and decode everything delivered since the last tick.
    pub fn update_socs_from_rec(&mut self) {
        for agent in self.agents.iter_mut().filter(|a| !a.is_closed()) {
            let id = agent.id();
            let payloads = match self.channel.receive(id) {
                Ok(p) => p,
                Err(e) => {
                    debug!(drone = %id, error = %e, "receive failed");
                    continue;
                }
            };
            for payload in payloads {
                match Message::decode(&payload) {
                    Ok(msg) => {
                        let from = msg.sender();
                        match agent.deliver(msg) {
                            Inbound::Queued => {}
                            Inbound::Stale => {
                                debug!(drone = %id, %from, "older announce superseded in the same tick");
                                self.metrics.stale();
                            }
                            Inbound::Ignored => {
                                trace!(drone = %id, %from, "ignoring message from non-neighbour");
                            }
                        }
                    }
                    Err(e) => {
                        warn!(drone = %id, error = %e, bytes = payload.len(), "discarding malformed payload");
                        self.metrics.malformed();
                    }
                }
            }
            if agent.absorb() == Absorbed::Stale {
                self.metrics.stale();
            }
        }
    }

    /// Step one agent and act on the outcome. The Centre's messages wait
    /// for [`SwarmCoordinator::update_state_of_centre`].
    pub fn update_wpts(&mut self, id: DroneId) {
        let Some(agent) = self.agents.get_mut(id.index()) else {
            return;
        };
        let out = agent.step();
        let centre = agent.role().is_centre();

        if out.advanced {
            self.metrics.advanced();
        }
        if let Some(cmd) = out.motion {
            debug!(drone = %id, target = %cmd.target, look_ahead = cmd.look_ahead, "motion command");
            self.vehicles.command(id, cmd);
        }
        if !centre && self.send_tick() {
            self.dispatch(id, out.announce, out.ack);
        }
    }

    /// Centre reconciliation: recompute the hold and send both directions.
    pub fn update_state_of_centre(&mut self) {
        let send = self.send_tick();
        for i in 0..self.agents.len() {
            let Some(out) = self.agents[i].reconcile() else {
                continue;
            };
            if send {
                let id = self.agents[i].id();
                self.dispatch(id, out.announce, out.ack);
            }
        }
    }

    /// Mirror the latest telemetry into every open agent.
    pub fn update_pos_socs(&mut self) {
        for agent in self.agents.iter_mut().filter(|a| !a.is_closed()) {
            if let Some(pos) = self.vehicles.latest_position(agent.id()) {
                agent.set_position(pos);
            }
        }
    }

    /// Publish changed look-ahead indices and top up a repeating leader.
    pub fn inc_look_ahead(&mut self) {
        for agent in self.agents.iter_mut() {
            if let Some(index) = agent.commit() {
                self.vehicles.publish_look_ahead(agent.id(), index);
            }
        }

        let Some(leader) = self.agents.first_mut() else {
            return;
        };
        if leader.awaiting_repeat() && self.schedule.repeat_due(self.pass_started, self.clock) {
            leader.extend_path(self.schedule.pattern.iter());
            self.pass_started = self.clock;
            info!(
                path_len = leader.path().len(),
                clock_secs = self.clock.as_secs_f64(),
                "scan pass appended"
            );
        }
    }

    fn dispatch(&self, id: DroneId, announce: Option<Announce>, ack: Option<StatusAck>) {
        let Some(agent) = self.agents.get(id.index()) else {
            return;
        };
        let nbt = agent.neighbors();

        if let Some(a) = announce {
            match Message::from(a).encode() {
                Ok(payload) if agent.broadcast() => match self.channel.send_broadcast(id, payload) {
                    Ok(()) => self.metrics.announce_sent(true),
                    Err(e) => self.send_failed(id, "announce", &e),
                },
                Ok(payload) => {
                    if let Some(to) = nbt.successor {
                        match self.channel.send_unicast(id, to, payload) {
                            Ok(()) => self.metrics.announce_sent(false),
                            Err(e) => self.send_failed(id, "announce", &e),
                        }
                    }
                }
                Err(e) => self.send_failed(id, "announce", &e),
            }
        }

        if let (Some(s), Some(to)) = (ack, nbt.predecessor) {
            match Message::from(s).encode() {
                Ok(payload) => match self.channel.send_unicast(id, to, payload) {
                    Ok(()) => self.metrics.ack_sent(),
                    Err(e) => self.send_failed(id, "ack", &e),
                },
                Err(e) => self.send_failed(id, "ack", &e),
            }
        }
    }

    fn send_failed(&self, id: DroneId, kind: &'static str, err: &dyn std::fmt::Display) {
        warn!(drone = %id, kind, error = %err, "send failed");
        self.metrics.send_failed();
    }
}
