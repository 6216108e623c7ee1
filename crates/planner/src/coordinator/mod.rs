//! Coordinator — owns the swarm and drives it tick by tick.
//!
//! Setup runs once, in order: [`SwarmCoordinator::initialize_mobility`],
//! [`SwarmCoordinator::initialize_sockets`],
//! [`SwarmCoordinator::set_leader_explore_path`]. The per-tick passes live in
//! `tick.rs`; teardown is [`SwarmCoordinator::close_all`].

mod tick;

use std::time::Duration;

use drone::client::{Dynamics, MessageChannel, MotionSink, PositionFeed};
use drone::geo::Vec3;
use drone::nbt::{DroneId, NeighborTable};
use drone::path::{ScanSchedule, WaypointPath};
use drone::state::{DroneAgent, Phase, Role};
use tracing::{info, warn};

use crate::config::{Delivery, PlannerConfig};
use crate::error::{PlannerError, Result};
use crate::fabric::FabricConfigurator;
use crate::metrics::ProtocolMetrics;
use crate::report::{AgentReport, MissionReport};

/// Flat vector of agents plus the collaborators they talk through.
///
/// Agent `i` has id `i`; the leader is always index 0.
pub struct SwarmCoordinator<C, V> {
    config: PlannerConfig,
    agents: Vec<DroneAgent>,
    channel: C,
    vehicles: V,
    schedule: ScanSchedule,
    metrics: ProtocolMetrics,
    ticks: u64,
    /// Simulated mission time.
    clock: Duration,
    /// When the leader's current scan pass was appended.
    pass_started: Duration,
    send_every: u64,
    sockets_open: bool,
    report: Option<MissionReport>,
}

impl<C, V> SwarmCoordinator<C, V>
where
    C: MessageChannel,
    V: PositionFeed + MotionSink + Dynamics,
{
    /// Lay out the chain: neighbour tables, roles and spawn points. The
    /// configuration is validated here, so a zero tick can never reach the loop.
    pub fn new(config: PlannerConfig, channel: C, vehicles: V) -> Result<Self> {
        let n = config.swarm.num_drones;
        if n == 0 {
            return Err(PlannerError::InvalidSwarm("a swarm needs at least one vehicle".into()));
        }
        config
            .validate()
            .map_err(|e| PlannerError::InvalidConfig(format!("{:#}", e)))?;
        let centre = config.swarm.resolved_centre();
        if let Some(c) = centre {
            if c == 0 || c + 1 >= n {
                return Err(PlannerError::InvalidSwarm(format!(
                    "centre {} is not an interior node of a {}-vehicle chain",
                    c, n
                )));
            }
        }

        let base = config.swarm.base;
        let spacing = config.swarm.spacing;
        let broadcast = config.swarm.delivery == Delivery::Broadcast;
        let agents = (0..n)
            .map(|i| {
                // tail spawns on the base, the leader furthest out
                let home = base + Vec3::new((n - 1 - i) as f64 * spacing, 0.0, 0.0);
                let mut agent = DroneAgent::new(
                    NeighborTable::initial(i, n),
                    Role::assign(i, n, centre),
                    config.drone.clone(),
                    home,
                );
                agent.set_broadcast(broadcast);
                agent
            })
            .collect();

        info!(
            drones = n,
            centre = ?centre,
            delivery = ?config.swarm.delivery,
            "swarm laid out"
        );

        Ok(Self {
            schedule: config.mission.schedule(),
            send_every: config.timing.send_every(),
            config,
            agents,
            channel,
            vehicles,
            metrics: ProtocolMetrics::new(),
            ticks: 0,
            clock: Duration::ZERO,
            pass_started: Duration::ZERO,
            sockets_open: false,
            report: None,
        })
    }

    // ── Setup ───────────────────────────────────────────────────

    /// Spawn every vehicle at its home point and mirror the first fix.
    pub fn initialize_mobility(&mut self) {
        for agent in &self.agents {
            self.vehicles.spawn(agent.id(), agent.home());
        }
        self.update_pos_socs();
        info!(drones = self.agents.len(), "vehicles spawned");
    }

    /// Configure addressing and open one endpoint per vehicle. Any failure
    /// closes what was already opened and aborts the mission.
    pub fn initialize_sockets<F: FabricConfigurator>(&mut self, fabric: &F) -> Result<()> {
        let tables: Vec<NeighborTable> = self.agents.iter().map(|a| *a.neighbors()).collect();
        let endpoints = fabric.configure(&tables)?;

        for (opened, endpoint) in endpoints.iter().enumerate() {
            if let Err(e) = self.channel.open(endpoint) {
                warn!(drone = %endpoint.id, error = %e, "failed to open endpoint, rolling back");
                for ep in &endpoints[..opened] {
                    if let Err(close_err) = self.channel.close(ep.id) {
                        warn!(drone = %ep.id, error = %close_err, "rollback close failed");
                    }
                }
                return Err(e.into());
            }
        }

        self.sockets_open = true;
        info!(endpoints = endpoints.len(), "sockets open");
        Ok(())
    }

    /// Leader path: the disaster centre followed by one scan pass.
    pub fn set_leader_explore_path(&mut self) {
        let site = self.config.mission.disaster_centre;
        let points: Vec<Vec3> = std::iter::once(site).chain(self.schedule.pattern.iter()).collect();
        let repeating = self.schedule.repeat.is_some();
        self.set_leader_path(points, repeating);
    }

    /// Hand the leader an explicit path.
    pub fn set_leader_path(&mut self, points: Vec<Vec3>, repeating: bool) {
        self.pass_started = self.clock;
        if let Some(leader) = self.agents.first_mut() {
            leader.assign_path(WaypointPath::new(points), repeating);
        }
    }

    // ── Running ─────────────────────────────────────────────────

    /// Full mission: setup, run until stop time, teardown.
    pub fn start_simul<F: FabricConfigurator>(&mut self, fabric: &F) -> Result<MissionReport> {
        self.initialize_mobility();
        self.initialize_sockets(fabric)?;
        self.set_leader_explore_path();
        self.run()
    }

    /// Tick as fast as possible until stop time, then tear down. Completed
    /// agents keep heartbeating until then.
    pub fn run(&mut self) -> Result<MissionReport> {
        self.ensure_ready()?;
        info!(
            stop_time_secs = self.config.timing.stop_time_secs,
            tick_ms = self.config.timing.pos_interval_ms,
            send_every = self.send_every,
            "mission started"
        );
        while !self.finished() {
            self.advance_pos();
        }
        Ok(self.close_all())
    }

    pub fn ensure_ready(&self) -> Result<()> {
        if self.report.is_some() {
            return Err(PlannerError::NotReady("mission already torn down"));
        }
        if !self.sockets_open {
            return Err(PlannerError::NotReady("sockets not initialised"));
        }
        if self.agents.first().map_or(true, |l| l.path().is_empty()) {
            return Err(PlannerError::NotReady("leader has no path"));
        }
        Ok(())
    }

    /// Stop time reached.
    pub fn finished(&self) -> bool {
        self.clock >= self.config.timing.stop_time()
    }

    pub fn all_complete(&self) -> bool {
        self.agents.iter().all(|a| a.phase() == Phase::Complete)
    }

    // ── Teardown ────────────────────────────────────────────────

    /// Close every sender and shut the vehicles down. Safe to call any
    /// number of times; only the first call touches the channel.
    pub fn close_all(&mut self) -> MissionReport {
        if let Some(report) = &self.report {
            return report.clone();
        }

        for agent in &mut self.agents {
            if !agent.close_sender() {
                continue;
            }
            let id = agent.id();
            if self.sockets_open {
                if let Err(e) = self.channel.close(id) {
                    warn!(drone = %id, error = %e, "failed to close endpoint");
                }
            }
            self.vehicles.shutdown(id);
        }

        let agents: Vec<AgentReport> = self.agents.iter().map(AgentReport::from).collect();
        let report = MissionReport::new(
            self.ticks,
            self.clock.as_secs_f64(),
            agents,
            self.metrics.snapshot(),
        );

        if report.complete {
            info!(ticks = report.ticks, elapsed_secs = report.elapsed_secs, "mission complete");
        } else {
            let pending: Vec<String> = report.incomplete().iter().map(|id| id.to_string()).collect();
            warn!(
                ticks = report.ticks,
                elapsed_secs = report.elapsed_secs,
                incomplete = %pending.join(","),
                "mission incomplete at stop time"
            );
        }
        self.metrics.print_summary();

        self.report = Some(report.clone());
        report
    }

    // ── Accessors ───────────────────────────────────────────────

    pub fn agents(&self) -> &[DroneAgent] {
        &self.agents
    }

    pub fn agent(&self, id: DroneId) -> Option<&DroneAgent> {
        self.agents.get(id.index())
    }

    pub fn metrics(&self) -> &ProtocolMetrics {
        &self.metrics
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn clock(&self) -> Duration {
        self.clock
    }

    pub fn tick_period(&self) -> Duration {
        self.config.timing.tick()
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use drone::client::{ChannelError, Endpoint, LoopbackChannel, MessageChannel, SimulatedFleet};
    use drone::conf::CentrePriority;
    use drone::geo::Vec3;
    use drone::message::{Announce, Message};
    use drone::nbt::{DroneId, NeighborTable};
    use drone::state::{Phase, Role};
    use mockall::mock;

    use super::*;
    use crate::config::Delivery;
    use crate::fabric::StaticFabric;

    type LoopbackSwarm = SwarmCoordinator<LoopbackChannel, SimulatedFleet>;

    fn fabric() -> StaticFabric {
        StaticFabric::new(std::net::Ipv4Addr::new(10, 1, 1, 0), 9)
    }

    /// Small, fast mission: 1 m per tick, messages every tick.
    fn config(n: usize) -> PlannerConfig {
        let mut cfg = PlannerConfig::default();
        cfg.swarm.num_drones = n;
        cfg.swarm.spacing = 2.0;
        cfg.timing.pkt_interval_ms = 100;
        cfg.timing.pos_interval_ms = 100;
        cfg.timing.stop_time_secs = 120;
        cfg.mission.disaster_centre = Vec3::new(20.0, 0.0, 10.0);
        cfg.mission.lawnmower.strips = 2;
        cfg.mission.lawnmower.leg_length = 10.0;
        cfg.mission.lawnmower.strip_spacing = 5.0;
        cfg.drone.arrival_threshold = 0.5;
        cfg.fleet.speed = 10.0;
        cfg
    }

    fn swarm(cfg: PlannerConfig) -> (LoopbackSwarm, LoopbackChannel, SimulatedFleet) {
        let channel = LoopbackChannel::recording();
        let fleet = SimulatedFleet::new(cfg.fleet.speed);
        let coord = SwarmCoordinator::new(cfg, channel.clone(), fleet.clone()).unwrap();
        (coord, channel, fleet)
    }

    /// Everything on the origin, no climb, leader path [(0,0,0), (10,0,0)].
    fn flat_line(n: usize) -> (LoopbackSwarm, LoopbackChannel, SimulatedFleet) {
        let mut cfg = config(n);
        cfg.swarm.spacing = 0.0;
        cfg.drone.takeoff_altitude = 0.0;
        cfg.drone.arrival_threshold = 1.0;
        let (mut coord, channel, fleet) = swarm(cfg);
        coord.initialize_mobility();
        coord.initialize_sockets(&fabric()).unwrap();
        coord.set_leader_path(vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)], false);
        (coord, channel, fleet)
    }

    fn decoded_from(channel: &LoopbackChannel, from: DroneId) -> Vec<Message> {
        channel
            .sent()
            .into_iter()
            .filter(|r| r.from == from)
            .map(|r| Message::decode(&r.payload).unwrap())
            .collect()
    }

    // ── Construction ────────────────────────────────────────────────

    #[test]
    fn test_layout_roles_and_homes() {
        let (coord, _, _) = swarm(config(5));
        let roles: Vec<Role> = coord.agents().iter().map(|a| a.role()).collect();
        assert_eq!(roles[0], Role::Leader);
        assert!(roles[2].is_centre());
        assert_eq!(roles[4], Role::End);
        // tail on the base, leader furthest out
        assert_eq!(coord.agents()[4].home(), Vec3::ZERO);
        assert_eq!(coord.agents()[0].home(), Vec3::new(8.0, 0.0, 0.0));
    }

    #[test]
    fn test_zero_drones_rejected() {
        let mut cfg = config(1);
        cfg.swarm.num_drones = 0;
        let result = SwarmCoordinator::new(cfg, LoopbackChannel::new(), SimulatedFleet::new(1.0));
        assert!(matches!(result, Err(PlannerError::InvalidSwarm(_))));
    }

    #[test]
    fn test_zero_tick_rejected_at_construction() {
        let mut cfg = config(3);
        cfg.timing.pos_interval_ms = 0;
        let result = SwarmCoordinator::new(cfg, LoopbackChannel::new(), SimulatedFleet::new(1.0));
        assert!(matches!(result, Err(PlannerError::InvalidConfig(_))));

        let mut cfg = config(3);
        cfg.timing.stop_time_secs = 0;
        let result = SwarmCoordinator::new(cfg, LoopbackChannel::new(), SimulatedFleet::new(1.0));
        assert!(matches!(result, Err(PlannerError::InvalidConfig(_))));
    }

    #[test]
    fn test_run_before_setup_is_not_ready() {
        let (mut coord, _, _) = swarm(config(3));
        assert!(matches!(coord.run(), Err(PlannerError::NotReady(_))));
        coord.initialize_sockets(&fabric()).unwrap();
        assert!(matches!(coord.run(), Err(PlannerError::NotReady("leader has no path"))));
    }

    // ── Full missions ───────────────────────────────────────────────

    #[test]
    fn test_single_pass_mission_completes() {
        let (mut coord, channel, fleet) = swarm(config(3));
        let report = coord.start_simul(&fabric()).unwrap();

        assert!(report.complete, "incomplete: {:?}", report.incomplete());
        // completion does not end the mission early
        assert_eq!(report.ticks, 1200);
        assert_eq!(report.elapsed_secs, 120.0);
        // each hop trails its predecessor by one index
        assert_eq!(report.agents[0].path_len, 5);
        assert_eq!(report.agents[1].path_len, 4);
        assert_eq!(report.agents[2].path_len, 3);
        assert!(report.agents.iter().all(|a| a.closed));
        assert!(report.metrics.announces_sent > 0);
        assert!(report.metrics.acks_sent > 0);
        assert_eq!(report.metrics.malformed, 0);

        for i in 0..3 {
            assert_eq!(channel.close_calls(DroneId(i)), 1);
            assert!(!fleet.is_active(DroneId(i)));
        }
        assert_eq!(fleet.published_look_ahead(DroneId(0)), Some(4));
    }

    #[test]
    fn test_single_vehicle_mission() {
        let mut cfg = config(1);
        cfg.mission.disaster_centre = Vec3::new(8.0, 0.0, 10.0);
        let (mut coord, channel, _) = swarm(cfg);
        let report = coord.start_simul(&fabric()).unwrap();
        assert!(report.complete);
        assert!(channel.sent().is_empty());
    }

    #[test]
    fn test_look_ahead_monotone_every_tick() {
        let (mut coord, _, _) = swarm(config(4));
        coord.initialize_mobility();
        coord.initialize_sockets(&fabric()).unwrap();
        coord.set_leader_explore_path();

        let mut last = vec![0usize; 4];
        while !coord.finished() {
            coord.advance_pos();
            for (i, agent) in coord.agents().iter().enumerate() {
                assert!(agent.look_ahead() >= last[i], "uav{} went backwards", i);
                last[i] = agent.look_ahead();
            }
        }
        assert!(coord.all_complete());
    }

    #[test]
    fn test_stop_time_before_completion() {
        let mut cfg = config(3);
        cfg.timing.stop_time_secs = 1;
        let (mut coord, _, _) = swarm(cfg);
        let report = coord.start_simul(&fabric()).unwrap();
        assert!(!report.complete);
        assert_eq!(report.ticks, 10);
        assert_eq!(report.incomplete().len(), 3);
        assert!(report.agents.iter().all(|a| a.closed));
    }

    #[test]
    fn test_broadcast_delivery_completes() {
        let mut cfg = config(3);
        cfg.swarm.delivery = Delivery::Broadcast;
        let (mut coord, channel, _) = swarm(cfg);
        let report = coord.start_simul(&fabric()).unwrap();
        assert!(report.complete);
        assert!(report.metrics.broadcasts_sent > 0);
        assert_eq!(report.metrics.announces_sent, 0);
        // acks stay unicast
        assert!(channel
            .sent()
            .iter()
            .filter(|r| r.to.is_none())
            .all(|r| matches!(Message::decode(&r.payload), Ok(Message::Announce(_)))));
    }

    #[test]
    fn test_repeating_scan_extends_leader_path() {
        let mut cfg = config(2);
        cfg.swarm.spacing = 0.0;
        cfg.mission.disaster_centre = Vec3::new(0.0, 0.0, 10.0);
        cfg.mission.lawnmower.strips = 1;
        cfg.mission.lawnmower.leg_length = 4.0;
        cfg.mission.lawnmower.repeat_interval_secs = Some(1);
        cfg.timing.stop_time_secs = 30;
        let (mut coord, _, _) = swarm(cfg);
        let report = coord.start_simul(&fabric()).unwrap();

        assert!(!report.complete, "a repeating leader never completes");
        assert_eq!(report.ticks, 300);
        assert!(report.agents[0].path_len >= 5, "path_len {}", report.agents[0].path_len);
        assert_eq!(report.agents[0].phase, Phase::Tracking);
    }

    // ── Propagation ─────────────────────────────────────────────────

    #[test]
    fn test_announce_observed_one_tick_later() {
        let (mut coord, _, _) = flat_line(2);
        coord.advance_pos();
        coord.advance_pos();
        let leader = &coord.agents()[0];
        let follower = &coord.agents()[1];
        assert_eq!(leader.look_ahead(), 1);
        assert_eq!(follower.upstream().unwrap().look_ahead_index, 0);

        coord.advance_pos();
        assert_eq!(coord.agents()[1].upstream().unwrap().look_ahead_index, 1);
    }

    #[test]
    fn test_follower_holds_origin_after_leader_completes() {
        let (mut coord, _, _) = flat_line(2);
        let mut guard = 0;
        while !coord.agents()[0].is_complete() {
            coord.advance_pos();
            guard += 1;
            assert!(guard < 100, "leader never completed");
        }

        let follower = &coord.agents()[1];
        assert_eq!(follower.target(), Some(Vec3::ZERO));
        assert!(!follower.upstream().unwrap().complete);
        assert!(!follower.is_complete());

        coord.advance_pos();
        let follower = &coord.agents()[1];
        assert!(follower.upstream().unwrap().complete);
        assert_eq!(follower.target(), Some(Vec3::ZERO));
        assert!(follower.is_complete());
    }

    #[test]
    fn test_completion_reaches_hop_two_one_tick_per_hop() {
        let (mut coord, _, _) = flat_line(3);
        let mut guard = 0;
        while !coord.agents()[0].is_complete() {
            coord.advance_pos();
            guard += 1;
            assert!(guard < 100, "leader never completed");
        }

        let hop1 = &coord.agents()[1];
        assert_eq!(hop1.target(), Some(Vec3::ZERO));
        assert!(!hop1.upstream().unwrap().complete);
        assert_eq!(coord.agents()[2].target(), Some(Vec3::ZERO));

        coord.advance_pos();
        let hop1 = &coord.agents()[1];
        assert!(hop1.upstream().unwrap().complete);
        assert!(hop1.is_complete());
        assert_eq!(hop1.target(), Some(Vec3::ZERO));
        let hop2 = &coord.agents()[2];
        assert!(!hop2.upstream().unwrap().complete);
        assert!(!hop2.is_complete());

        coord.advance_pos();
        let hop2 = &coord.agents()[2];
        assert!(hop2.upstream().unwrap().complete);
        assert_eq!(hop2.target(), Some(Vec3::ZERO));
        assert!(hop2.is_complete());
    }

    #[test]
    fn test_run_continues_past_completion_until_stop_time() {
        let (mut coord, _, _) = flat_line(3);
        let report = coord.run().unwrap();
        assert!(report.complete);
        assert_eq!(coord.clock(), coord.config().timing.stop_time());
        assert_eq!(report.ticks, 1200);
    }

    #[test]
    fn test_tail_never_announces() {
        let (mut coord, channel, _) = swarm(config(4));
        coord.start_simul(&fabric()).unwrap();
        let tail = decoded_from(&channel, DroneId(3));
        assert!(!tail.is_empty());
        assert!(tail.iter().all(|m| matches!(m, Message::StatusAck(_))));
        assert!(decoded_from(&channel, DroneId(0))
            .iter()
            .all(|m| matches!(m, Message::Announce(_))));
    }

    #[test]
    fn test_send_gating_by_packet_interval() {
        let mut cfg = config(2);
        cfg.timing.pkt_interval_ms = 500;
        let (mut coord, channel, _) = swarm(cfg);
        coord.initialize_mobility();
        coord.initialize_sockets(&fabric()).unwrap();
        coord.set_leader_explore_path();
        for _ in 0..10 {
            coord.advance_pos();
        }
        // ticks 0 and 5
        assert_eq!(decoded_from(&channel, DroneId(0)).len(), 2);
        assert_eq!(decoded_from(&channel, DroneId(1)).len(), 2);
    }

    #[test]
    fn test_stale_announce_dropped_and_counted() {
        let (mut coord, channel, _) = flat_line(2);
        for _ in 0..3 {
            coord.advance_pos();
        }
        let held = coord.agents()[1].upstream().unwrap().clone();
        assert_eq!(held.look_ahead_index, 1);
        let target_before = coord.agents()[1].target();

        channel.cut_link(DroneId(0), DroneId(1));
        let stale = Announce {
            look_ahead_index: 0,
            target: Vec3::new(-50.0, 0.0, 0.0),
            ..held.clone()
        };
        channel.inject(DroneId(1), Message::from(stale).encode().unwrap());
        coord.advance_pos();

        // the leader's own tick-2 announcement was still pending alongside it
        assert_eq!(coord.metrics().snapshot().stale, 1);
        assert_eq!(coord.agents()[1].upstream().unwrap().look_ahead_index, 1);
        assert_eq!(coord.agents()[1].target(), target_before);

        // alone in the inbox, it is dropped against the held announcement
        channel.inject(DroneId(1), Message::from(Announce { look_ahead_index: 0, ..held }).encode().unwrap());
        coord.advance_pos();
        assert_eq!(coord.metrics().snapshot().stale, 2);
        assert_eq!(coord.agents()[1].upstream().unwrap().look_ahead_index, 1);
    }

    #[test]
    fn test_malformed_payload_counted() {
        let (mut coord, channel, _) = flat_line(2);
        channel.inject(DroneId(1), Bytes::from_static(b"{not json"));
        channel.inject(DroneId(1), Bytes::new());
        coord.advance_pos();
        assert_eq!(coord.metrics().snapshot().malformed, 2);
    }

    #[test]
    fn test_announce_from_non_neighbour_ignored() {
        let (mut coord, channel, _) = swarm(config(3));
        coord.initialize_mobility();
        coord.initialize_sockets(&fabric()).unwrap();
        coord.set_leader_explore_path();
        let rogue = Announce {
            sender: DroneId(0),
            role: Role::Leader,
            look_ahead_index: 9,
            target_index: 8,
            target: Vec3::new(99.0, 0.0, 0.0),
            complete: true,
            neighbors: NeighborTable::initial(0, 3),
        };
        channel.inject(DroneId(2), Message::from(rogue).encode().unwrap());
        coord.advance_pos();
        assert!(coord.agents()[2].upstream().is_none());
        assert!(coord.agents()[2].path().is_empty());
    }

    // ── Centre ──────────────────────────────────────────────────────

    #[test]
    fn test_centre_holds_chain_when_tail_cut_off() {
        let (mut coord, channel, _) = swarm(config(3));
        coord.initialize_mobility();
        coord.initialize_sockets(&fabric()).unwrap();
        coord.set_leader_explore_path();
        channel.cut_link(DroneId(1), DroneId(2));
        let report = coord.run().unwrap();

        let centre = coord.agent(DroneId(1)).unwrap();
        assert!(centre.role().is_centre());
        assert!(centre.is_holding());
        assert_eq!(centre.look_ahead(), 2);
        assert!(!coord.agents()[0].is_complete());
        assert!(!report.complete);
    }

    #[test]
    fn test_leader_priority_lets_chain_finish_without_tail() {
        let mut cfg = config(3);
        cfg.drone.centre_priority = CentrePriority::Leader;
        let (mut coord, channel, _) = swarm(cfg);
        coord.initialize_mobility();
        coord.initialize_sockets(&fabric()).unwrap();
        coord.set_leader_explore_path();
        channel.cut_link(DroneId(1), DroneId(2));
        let report = coord.run().unwrap();

        assert!(!coord.agents()[1].is_holding());
        assert!(coord.agents()[0].is_complete());
        assert!(coord.agents()[1].is_complete());
        assert_eq!(report.incomplete(), vec![DroneId(2)]);
    }

    // ── Setup & teardown failures ───────────────────────────────────

    mock! {
        pub Channel {}

        impl MessageChannel for Channel {
            fn open(&self, endpoint: &Endpoint) -> std::result::Result<(), ChannelError>;
            fn send_unicast(&self, from: DroneId, to: DroneId, payload: Bytes) -> std::result::Result<(), ChannelError>;
            fn send_broadcast(&self, from: DroneId, payload: Bytes) -> std::result::Result<(), ChannelError>;
            fn receive(&self, id: DroneId) -> std::result::Result<Vec<Bytes>, ChannelError>;
            fn close(&self, id: DroneId) -> std::result::Result<(), ChannelError>;
        }
    }

    #[test]
    fn test_socket_failure_aborts_and_rolls_back() {
        let mut channel = MockChannel::new();
        channel.expect_open().returning(|ep| {
            if ep.id == DroneId(2) {
                Err(ChannelError::Transport("bind: address in use".into()))
            } else {
                Ok(())
            }
        });
        channel
            .expect_close()
            .withf(|id| *id == DroneId(0) || *id == DroneId(1))
            .times(2)
            .returning(|_| Ok(()));
        channel.expect_send_unicast().never();

        let mut coord = SwarmCoordinator::new(config(4), channel, SimulatedFleet::new(1.0)).unwrap();
        let err = coord.start_simul(&fabric()).unwrap_err();
        assert!(err.is_setup());
        assert!(err.to_string().contains("address in use"));
    }

    #[test]
    fn test_fabric_failure_aborts() {
        let mut channel = MockChannel::new();
        channel.expect_open().never();
        let mut coord = SwarmCoordinator::new(config(255), channel, SimulatedFleet::new(1.0)).unwrap();
        let err = coord.initialize_sockets(&fabric()).unwrap_err();
        assert!(err.is_setup());
    }

    #[test]
    fn test_close_failure_still_closes_everyone() {
        let mut channel = MockChannel::new();
        channel.expect_open().returning(|_| Ok(()));
        channel.expect_close().times(3).returning(|id| {
            if id == DroneId(1) {
                Err(ChannelError::Transport("socket already gone".into()))
            } else {
                Ok(())
            }
        });

        let fleet = SimulatedFleet::new(1.0);
        let mut coord = SwarmCoordinator::new(config(3), channel, fleet.clone()).unwrap();
        coord.initialize_mobility();
        coord.initialize_sockets(&fabric()).unwrap();

        let report = coord.close_all();
        assert!(report.agents.iter().all(|a| a.closed));
        assert!((0..3).all(|i| !fleet.is_active(DroneId(i))));
    }

    #[test]
    fn test_close_all_is_idempotent() {
        let (mut coord, channel, _) = flat_line(2);
        coord.advance_pos();
        let first = coord.close_all();
        let second = coord.close_all();
        assert_eq!(first.ticks, second.ticks);
        assert_eq!(channel.close_calls(DroneId(0)), 1);
        assert_eq!(channel.close_calls(DroneId(1)), 1);
        assert!(matches!(coord.run(), Err(PlannerError::NotReady(_))));
    }
}
