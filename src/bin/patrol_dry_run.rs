use std::sync::Arc;

use anyhow::Result;
use cardboard_patrol::actions::sim::ScriptedActionClient;
use cardboard_patrol::actions::GoalStatus;
use cardboard_patrol::capture::sim::RecordingLauncher;
use cardboard_patrol::{CardboardPatrol, PatrolClients, PatrolConfig};
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    cardboard_patrol::init_logging();
    info!("Initializing dry-run patrol...");

    let config = PatrolConfig::from_env();
    for (i, wp) in config.waypoints().iter().enumerate() {
        info!("Waypoint {}: {}", i + 1, wp);
    }

    // The real undock server aborts on success, so script the same here
    let clients = PatrolClients {
        undock: Arc::new(ScriptedActionClient::with_statuses(
            &config.undock_server.name,
            &[GoalStatus::Aborted],
        )),
        move_base: Arc::new(ScriptedActionClient::new(&config.move_base_server.name)),
        dock: Arc::new(ScriptedActionClient::new(&config.dock_server.name)),
    };
    let launcher = Arc::new(RecordingLauncher::default());

    let mut patrol = CardboardPatrol::new(&config, &clients, launcher.clone());
    let outcome = patrol.run().await?;

    info!("Outcome: {}", outcome);
    info!("Visited: {}", patrol.history().join(" -> "));
    info!("Launches: {}", launcher.requests().len());
    Ok(())
}
