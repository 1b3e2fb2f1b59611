//! Straight-line variant of the patrol without a state machine.
//!
//! Every goal is sent in order whatever the previous one returned, and the
//! imaging launches are driven by the waypoint index instead of the capture
//! counter. Kept separate from the state machine's imaging step.

use log::info;

use super::PatrolClients;
use crate::actions::{ActionGoal, GoalStatus};
use crate::capture::{capture_request, detect_request, Launcher};
use crate::common::WaypointGoal;
use crate::config::PatrolConfig;
use crate::error::PatrolError;

/// Run the linear patrol and return every goal status in the order received
pub async fn run_linear_patrol(
    config: &PatrolConfig,
    clients: &PatrolClients,
    launcher: &dyn Launcher,
) -> Result<Vec<GoalStatus>, PatrolError> {
    for client in [&clients.dock, &clients.undock, &clients.move_base] {
        client.wait_for_server().await?;
    }

    let mut statuses = Vec::with_capacity(5);

    let status = clients
        .undock
        .send_goal_and_wait(&ActionGoal::Undock {
            rotate_in_place: config.rotate_in_place,
        })
        .await?;
    info!("Undock: {}", status);
    statuses.push(status);

    let mut previous: Option<&WaypointGoal> = None;
    for (i, goal) in config.waypoints().into_iter().enumerate() {
        if let Some(from) = previous {
            info!("Leg {} is {:.2}m", i + 1, from.distance_to(goal));
        }
        previous = Some(goal);

        let status = clients
            .move_base
            .send_goal_and_wait(&ActionGoal::MoveBase(goal.clone()))
            .await?;
        info!("Goal {} ({}): {}", i + 1, goal, status);
        statuses.push(status);

        if i == 0 || i == 1 {
            let index = i as u32 + 1;
            launcher.launch(&capture_request(&config.launch, index)).await?;
            launcher.launch(&detect_request(&config.launch)).await?;
        } else if i == 2 {
            let status = clients.dock.send_goal_and_wait(&ActionGoal::Dock).await?;
            info!("Dock: {}", status);
            statuses.push(status);
        }
    }

    Ok(statuses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::sim::ScriptedActionClient;
    use crate::capture::sim::RecordingLauncher;
    use std::sync::Arc;

    fn clients(move_base: &[GoalStatus]) -> (PatrolClients, Arc<ScriptedActionClient>) {
        let move_base = Arc::new(ScriptedActionClient::with_statuses("move_base", move_base));
        let clients = PatrolClients {
            undock: Arc::new(ScriptedActionClient::with_statuses(
                "undock",
                &[GoalStatus::Aborted],
            )),
            move_base: move_base.clone(),
            dock: Arc::new(ScriptedActionClient::new("dock")),
        };
        (clients, move_base)
    }

    #[tokio::test]
    async fn sends_every_goal_in_order() {
        let (clients, move_base) = clients(&[]);
        let launcher = RecordingLauncher::default();

        let statuses = run_linear_patrol(&PatrolConfig::default(), &clients, &launcher)
            .await
            .unwrap();

        assert_eq!(
            statuses,
            [
                GoalStatus::Aborted,
                GoalStatus::Succeeded,
                GoalStatus::Succeeded,
                GoalStatus::Succeeded,
                GoalStatus::Succeeded,
            ]
        );
        assert_eq!(move_base.sent_goals().len(), 3);

        let files: Vec<_> = launcher.requests().into_iter().map(|r| r.file).collect();
        assert_eq!(
            files,
            [
                "cardboard_capture_1.launch",
                "detect_cardboard.launch",
                "cardboard_capture_2.launch",
                "detect_cardboard.launch",
            ]
        );
    }

    #[tokio::test]
    async fn does_not_branch_on_aborted_navigation() {
        let (clients, move_base) = clients(&[GoalStatus::Aborted, GoalStatus::Aborted]);
        let launcher = RecordingLauncher::default();

        let statuses = run_linear_patrol(&PatrolConfig::default(), &clients, &launcher)
            .await
            .unwrap();

        assert_eq!(statuses[1], GoalStatus::Aborted);
        assert_eq!(statuses[2], GoalStatus::Aborted);
        assert_eq!(move_base.sent_goals().len(), 3);
        assert_eq!(launcher.requests().len(), 4);
        assert_eq!(statuses.last(), Some(&GoalStatus::Succeeded));
    }
}
