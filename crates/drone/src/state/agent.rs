//! Agent — per-vehicle chain state machine.
//!
//! A [`DroneAgent`] combines its neighbour table, waypoint path, role and
//! phase. The coordinator drives it once per tick:
//!
//! 1. [`DroneAgent::deliver`] + [`DroneAgent::absorb`]: consume inbound messages
//! 2. [`DroneAgent::step`]: arrival test and next-waypoint decision
//! 3. [`DroneAgent::reconcile`]: Centre nodes only, both directions
//! 4. [`DroneAgent::set_position`]: mirror telemetry
//! 5. [`DroneAgent::commit`]: look-ahead bookkeeping
//!
//! The agent never touches another agent: everything it wants to say leaves
//! through the [`StepOutcome`] it returns.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::conf::{CentrePriority, DroneConfig};
use crate::geo::{within_threshold, Vec3};
use crate::message::{Announce, Message, StatusAck};
use crate::nbt::{DroneId, NeighborTable, Relation};
use crate::path::WaypointPath;
use super::mailbox::Mailbox;
use super::phase::Phase;
use super::role::{Role, Side};

/// Target handed to the motion command sink.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotionCommand {
    pub target: Vec3,
    pub look_ahead: usize,
}

/// Everything a single step wants the coordinator to do on its behalf.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StepOutcome {
    /// Downstream announcement for the successor.
    pub announce: Option<Announce>,
    /// Upstream status for the predecessor.
    pub ack: Option<StatusAck>,
    /// New motion target, only when it changed.
    pub motion: Option<MotionCommand>,
    /// The cursor moved this step.
    pub advanced: bool,
}

/// What [`DroneAgent::deliver`] did with one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    Queued,
    /// Queued, but an announcement with a lower look-ahead was discarded
    /// against another one pending in the same tick.
    Stale,
    /// Not from the matching neighbour, or the agent is closed.
    Ignored,
}

/// What happened to the pending downstream announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absorbed {
    /// Nothing arrived since the last tick.
    Nothing,
    /// Newer look-ahead: path extended and held state replaced.
    Accepted,
    /// Same look-ahead as already held (flags refreshed).
    Heartbeat,
    /// Older look-ahead than already held; discarded.
    Stale,
}

pub struct DroneAgent {
    id: DroneId,
    role: Role,
    nbt: NeighborTable,
    config: DroneConfig,
    path: WaypointPath,
    phase: Phase,
    /// Spawn point on the ground.
    home: Vec3,
    /// Mirrored from the telemetry feed, never owned.
    position: Option<Vec3>,
    mailbox: Mailbox,
    /// Last accepted announcement from the predecessor.
    msg_rec: Option<Announce>,
    /// Last status from the successor.
    successor_status: Option<StatusAck>,
    reached_index: Option<usize>,
    /// Leader only: the path is topped up by repeat passes, never complete.
    repeating: bool,
    /// Centre only: hold raised during reconciliation.
    hold: bool,
    toggle_bc: bool,
    last_command: Option<MotionCommand>,
    published_index: Option<usize>,
    closed: bool,
}

impl DroneAgent {
    pub fn new(nbt: NeighborTable, role: Role, config: DroneConfig, home: Vec3) -> Self {
        Self {
            id: nbt.id,
            role,
            nbt,
            config,
            path: WaypointPath::default(),
            phase: Phase::Idle,
            home,
            position: None,
            mailbox: Mailbox::default(),
            msg_rec: None,
            successor_status: None,
            reached_index: None,
            repeating: false,
            hold: false,
            toggle_bc: false,
            last_command: None,
            published_index: None,
            closed: false,
        }
    }

    // ── Accessors ───────────────────────────────────────────────

    pub fn id(&self) -> DroneId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn neighbors(&self) -> &NeighborTable {
        &self.nbt
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn path(&self) -> &WaypointPath {
        &self.path
    }

    pub fn look_ahead(&self) -> usize {
        self.path.look_ahead()
    }

    pub fn reached_index(&self) -> Option<usize> {
        self.reached_index
    }

    /// Current path target, if the agent has one.
    pub fn target(&self) -> Option<Vec3> {
        self.path.current()
    }

    pub fn position(&self) -> Option<Vec3> {
        self.position
    }

    pub fn home(&self) -> Vec3 {
        self.home
    }

    pub fn upstream(&self) -> Option<&Announce> {
        self.msg_rec.as_ref()
    }

    pub fn successor_status(&self) -> Option<&StatusAck> {
        self.successor_status.as_ref()
    }

    pub fn is_holding(&self) -> bool {
        self.hold
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn broadcast(&self) -> bool {
        self.toggle_bc
    }

    pub fn set_broadcast(&mut self, on: bool) {
        self.toggle_bc = on;
    }

    // ── Path assignment ─────────────────────────────────────────

    /// Give the agent an explicit path (leader) or replace a still-empty one.
    pub fn assign_path(&mut self, path: WaypointPath, repeating: bool) {
        if !self.path.is_empty() {
            warn!(drone = %self.id, "replacing a non-empty path is not allowed; ignoring");
            return;
        }
        info!(drone = %self.id, role = self.role.as_str(), waypoints = path.len(), repeating, "path assigned");
        self.path = path;
        self.repeating = repeating;
    }

    /// Leader explore path: transit to `site`, then the scan waypoints.
    pub fn set_explore_path<I>(&mut self, site: Vec3, scan: I, repeating: bool)
    where
        I: IntoIterator<Item = Vec3>,
    {
        let points: Vec<Vec3> = std::iter::once(site).chain(scan).collect();
        self.assign_path(WaypointPath::new(points), repeating);
    }

    /// Append another pass to the path.
    pub fn extend_path<I: IntoIterator<Item = Vec3>>(&mut self, points: I) {
        let before = self.path.len();
        self.path.extend(points);
        debug!(drone = %self.id, added = self.path.len() - before, "path extended");
    }

    /// Leader sitting on the final element of a repeating path.
    pub fn awaiting_repeat(&self) -> bool {
        self.repeating
            && self.path.at_last()
            && self.reached_index == Some(self.path.look_ahead())
    }

    /// Switch a repeating path to a single pass: the final element completes.
    pub fn stop_repeating(&mut self) {
        self.repeating = false;
    }

    // ── Inbound ─────────────────────────────────────────────────

    /// Queue an inbound message. Messages from anyone but the matching
    /// neighbour (announce from predecessor, ack from successor) are ignored.
    pub fn deliver(&mut self, msg: Message) -> Inbound {
        if self.closed {
            return Inbound::Ignored;
        }
        match (self.nbt.relation_of(msg.sender()), msg) {
            (Some(Relation::Predecessor), Message::Announce(a)) => {
                if self.mailbox.put_announce(a) {
                    Inbound::Stale
                } else {
                    Inbound::Queued
                }
            }
            (Some(Relation::Successor), Message::StatusAck(s)) => {
                self.mailbox.put_ack(s);
                Inbound::Queued
            }
            _ => Inbound::Ignored,
        }
    }

    /// Apply whatever the mailbox holds.
    pub fn absorb(&mut self) -> Absorbed {
        if let Some(ack) = self.mailbox.take_ack() {
            let stale = self
                .successor_status
                .as_ref()
                .is_some_and(|held| ack.look_ahead_index < held.look_ahead_index);
            if !stale {
                self.successor_status = Some(ack);
            }
        }

        let Some(msg) = self.mailbox.take_announce() else {
            return Absorbed::Nothing;
        };

        let held = self.msg_rec.as_ref().map(|m| m.look_ahead_index);
        let outcome = match held {
            Some(h) if msg.look_ahead_index < h => {
                debug!(
                    drone = %self.id,
                    held = h,
                    got = msg.look_ahead_index,
                    "dropping stale announce"
                );
                return Absorbed::Stale;
            }
            Some(h) if msg.look_ahead_index == h => Absorbed::Heartbeat,
            _ => Absorbed::Accepted,
        };

        let added = self.path.fill_to(msg.target_index, msg.target);
        if added > 1 {
            debug!(drone = %self.id, added, "filled gap in derived path");
        }
        self.msg_rec = Some(msg);
        outcome
    }

    // ── Tick ────────────────────────────────────────────────────

    pub fn set_position(&mut self, position: Vec3) {
        self.position = Some(position);
    }

    fn takeoff_point(&self) -> Vec3 {
        self.home.with_z(self.config.takeoff_altitude)
    }

    /// Arrival test against the disaster site (the leader's first element).
    pub fn site_reached(&self, position: &Vec3) -> bool {
        match (self.role, self.path.get(0)) {
            (Role::Leader, Some(site)) => within_threshold(position, &site, self.config.arrival_threshold),
            _ => false,
        }
    }

    /// Run one state-machine step.
    ///
    /// A follower's cursor first moves up to the element its predecessor
    /// last announced, so it tracks the leader's target minus its hop
    /// distance instead of revisiting every element it has not flown to.
    pub fn step(&mut self) -> StepOutcome {
        let mut out = StepOutcome::default();
        if self.closed {
            return out;
        }
        out.advanced = self.follow_upstream();
        let Some(pos) = self.position else {
            debug!(drone = %self.id, "no telemetry yet, skipping step");
            return out;
        };

        if self.phase == Phase::Idle {
            self.phase = Phase::Ascending;
            info!(drone = %self.id, altitude = self.config.takeoff_altitude, "taking off");
        } else {
            let eps = self.config.arrival_threshold;
            if self.phase == Phase::Ascending && within_threshold(&pos, &self.takeoff_point(), eps) {
                self.phase = if self.role.is_leader() { Phase::Transit } else { Phase::Tracking };
                info!(drone = %self.id, phase = self.phase.as_str(), "operational altitude reached");
            }
            if self.phase == Phase::Transit && self.site_reached(&pos) {
                self.phase = Phase::Tracking;
                info!(drone = %self.id, "disaster site reached, scanning");
            }
            if self.phase == Phase::Tracking && self.track(&pos) {
                out.advanced = true;
            }
        }

        out.motion = self.next_command();
        out.announce = self.announcement();
        out.ack = self.status();
        out
    }

    /// Arrival test and cursor advance. Returns whether the cursor moved.
    fn track(&mut self, pos: &Vec3) -> bool {
        let Some(target) = self.path.current() else {
            return false;
        };
        if !within_threshold(pos, &target, self.config.arrival_threshold) {
            return false;
        }

        let index = self.path.look_ahead();
        if self.reached_index.map_or(true, |r| r < index) {
            self.reached_index = Some(index);
        }

        if !self.may_advance() {
            debug!(drone = %self.id, look_ahead = index, "arrived but holding");
            return false;
        }

        if self.path.advance() {
            debug!(drone = %self.id, look_ahead = self.path.look_ahead(), "advanced");
            return true;
        }

        if self.finished_on_last(index) {
            self.phase = Phase::Complete;
            info!(drone = %self.id, role = self.role.as_str(), look_ahead = index, "mission complete");
        }
        false
    }

    /// Move the cursor towards the predecessor's announced target, one
    /// element at a time while advancing is permitted.
    fn follow_upstream(&mut self) -> bool {
        let Some(target_index) = self.msg_rec.as_ref().map(|m| m.target_index) else {
            return false;
        };
        let before = self.path.look_ahead();
        while self.path.look_ahead() < target_index && self.may_advance() && self.path.advance() {}

        let now = self.path.look_ahead();
        if now > before {
            debug!(drone = %self.id, from = before, look_ahead = now, "following upstream target");
        }
        now > before
    }

    fn may_advance(&self) -> bool {
        match self.role {
            Role::Leader => !self.successor_hold(),
            Role::Interior(Side::Centre) => {
                !(self.config.centre_priority == CentrePriority::Tail && self.tail_lagging())
            }
            _ => true,
        }
    }

    fn finished_on_last(&self, index: usize) -> bool {
        match self.role {
            Role::Leader => !self.repeating,
            _ => self
                .msg_rec
                .as_ref()
                .is_some_and(|m| m.complete && m.target_index <= index),
        }
    }

    fn successor_hold(&self) -> bool {
        self.successor_status.as_ref().is_some_and(|s| s.hold)
    }

    /// The successor trails its current target by more than the slack.
    fn tail_lagging(&self) -> bool {
        if self.nbt.successor.is_none() {
            return false;
        }
        let successor_target = self.path.look_ahead().saturating_sub(1);
        let lag = match self.successor_status.as_ref().and_then(|s| s.reached_index) {
            Some(reached) => successor_target.saturating_sub(reached),
            None => successor_target + 1,
        };
        lag > self.config.centre_slack
    }

    fn desired_target(&self) -> Option<Vec3> {
        match self.phase {
            Phase::Idle => None,
            Phase::Ascending => Some(self.takeoff_point()),
            Phase::Transit | Phase::Tracking | Phase::Complete => self.path.current(),
        }
    }

    fn next_command(&mut self) -> Option<MotionCommand> {
        let cmd = MotionCommand {
            target: self.desired_target()?,
            look_ahead: self.path.look_ahead(),
        };
        if self.last_command == Some(cmd) {
            return None;
        }
        self.last_command = Some(cmd);
        Some(cmd)
    }

    // ── Outbound ────────────────────────────────────────────────

    /// Downstream announcement: the element one behind the cursor. `None`
    /// for the tail or while the path is still empty.
    pub fn announcement(&self) -> Option<Announce> {
        if self.closed || !self.role.forwards_downstream() {
            return None;
        }
        self.nbt.successor?;
        Announce::from_path(self.nbt, self.role, &self.path, self.phase == Phase::Complete)
    }

    /// Upstream status. Left nodes relay their successor's hold; the Centre
    /// reports its own.
    pub fn status(&self) -> Option<StatusAck> {
        if self.closed {
            return None;
        }
        self.nbt.predecessor?;
        let hold = match self.role {
            Role::Interior(Side::Centre) => self.hold,
            Role::Interior(Side::Left) => self.successor_hold(),
            _ => false,
        };
        Some(StatusAck {
            sender: self.id,
            role: self.role,
            look_ahead_index: self.path.look_ahead(),
            reached_index: self.reached_index,
            complete: self.phase == Phase::Complete,
            hold,
        })
    }

    /// Centre reconciliation pass. Recomputes the hold from the tail side
    /// and rebuilds both outbound messages. `None` for other roles.
    pub fn reconcile(&mut self) -> Option<StepOutcome> {
        if !self.role.is_centre() || self.closed {
            return None;
        }
        let lagging = self.tail_lagging();
        let hold = lagging && self.config.centre_priority == CentrePriority::Tail;
        if lagging && !hold {
            warn!(drone = %self.id, look_ahead = self.path.look_ahead(), "tail side lagging, leader side has priority");
        }
        if hold != self.hold {
            info!(drone = %self.id, hold, "centre hold changed");
        }
        self.hold = hold;
        Some(StepOutcome {
            announce: self.announcement(),
            ack: self.status(),
            motion: None,
            advanced: false,
        })
    }

    /// Look-ahead bookkeeping at the end of a tick. Returns the index to
    /// publish when it changed since the last commit.
    pub fn commit(&mut self) -> Option<usize> {
        let index = self.path.look_ahead();
        if self.published_index == Some(index) || self.path.is_empty() {
            return None;
        }
        self.published_index = Some(index);
        Some(index)
    }

    /// Tear down this agent's sender. Returns `true` only the first time.
    pub fn close_sender(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        self.mailbox = Mailbox::default();
        info!(drone = %self.id, phase = self.phase.as_str(), look_ahead = self.path.look_ahead(), "sender closed");
        true
    }
}
