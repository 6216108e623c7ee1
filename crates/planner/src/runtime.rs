use std::future::Future;

use drone::client::{Dynamics, MessageChannel, MotionSink, PositionFeed};
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::coordinator::SwarmCoordinator;
use crate::error::Result;
use crate::report::MissionReport;

/// Pace the mission against the wall clock: one tick per `pos_interval`.
///
/// Stops at stop time or when `shutdown` resolves. The swarm is torn down
/// in every case.
pub async fn run_realtime<C, V, S>(coord: &mut SwarmCoordinator<C, V>, shutdown: S) -> Result<MissionReport>
where
    C: MessageChannel,
    V: PositionFeed + MotionSink + Dynamics,
    S: Future<Output = ()>,
{
    coord.ensure_ready()?;
    info!(tick_ms = coord.tick_period().as_millis() as u64, "real-time mission started");

    let mut interval = time::interval(coord.tick_period());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if coord.finished() {
                    break;
                }
                coord.advance_pos();
            }
            _ = &mut shutdown => {
                warn!(ticks = coord.ticks(), "shutdown requested, stopping mission early");
                break;
            }
        }
    }

    Ok(coord.close_all())
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
