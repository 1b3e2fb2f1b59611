//! Action clients for the navigation and docking servers
pub mod cli;
pub mod sim;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use serde_json::{json, Value};

use crate::common::WaypointGoal;
use crate::error::PatrolError;
use crate::state_machine::{Outcome, State, UserData};

/// Terminal status reported by an action server for a goal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalStatus {
    Pending,
    Active,
    Preempted,
    Succeeded,
    Aborted,
    Rejected,
    Recalled,
    Lost,
}

impl GoalStatus {
    /// Map a finished goal onto a step outcome
    pub fn outcome(self) -> Outcome {
        match self {
            GoalStatus::Succeeded => Outcome::Succeeded,
            GoalStatus::Preempted | GoalStatus::Recalled => Outcome::Preempted,
            _ => Outcome::Aborted,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Pending => "PENDING",
            GoalStatus::Active => "ACTIVE",
            GoalStatus::Preempted => "PREEMPTED",
            GoalStatus::Succeeded => "SUCCEEDED",
            GoalStatus::Aborted => "ABORTED",
            GoalStatus::Rejected => "REJECTED",
            GoalStatus::Recalled => "RECALLED",
            GoalStatus::Lost => "LOST",
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Goal payloads understood by the patrol's action servers
#[derive(Debug, Clone, PartialEq)]
pub enum ActionGoal {
    Undock { rotate_in_place: bool },
    MoveBase(WaypointGoal),
    Dock,
}

impl ActionGoal {
    /// Goal message in the flow-style YAML accepted by `ros2 action send_goal`
    pub fn to_message(&self) -> Value {
        match self {
            ActionGoal::Undock { rotate_in_place } => json!({ "rotate_in_place": rotate_in_place }),
            ActionGoal::MoveBase(wp) => json!({
                "target_pose": {
                    "header": { "frame_id": wp.frame_id },
                    "pose": {
                        "position": { "x": wp.x, "y": wp.y, "z": 0.0 },
                        "orientation": { "x": 0.0, "y": 0.0, "z": wp.qz, "w": wp.qw },
                    },
                },
            }),
            ActionGoal::Dock => json!({}),
        }
    }
}

impl fmt::Display for ActionGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionGoal::Undock { rotate_in_place } => {
                write!(f, "undock (rotate_in_place={})", rotate_in_place)
            }
            ActionGoal::MoveBase(wp) => write!(f, "move to {}", wp),
            ActionGoal::Dock => f.write_str("dock"),
        }
    }
}

/// Client side of a single named action server
#[async_trait]
pub trait ActionClient: Send + Sync {
    /// Name the server is advertised under
    fn server_name(&self) -> &str;

    /// Block until the server is available
    async fn wait_for_server(&self) -> Result<(), PatrolError>;

    /// Send a goal and block until the server reports a terminal status
    async fn send_goal_and_wait(&self, goal: &ActionGoal) -> Result<GoalStatus, PatrolError>;
}

/// A state that sends one fixed goal to an action server
pub struct SimpleActionState {
    client: Arc<dyn ActionClient>,
    goal: ActionGoal,
    server_ready: bool,
}

impl SimpleActionState {
    pub fn new(client: Arc<dyn ActionClient>, goal: ActionGoal) -> Self {
        SimpleActionState {
            client,
            goal,
            server_ready: false,
        }
    }
}

#[async_trait]
impl State for SimpleActionState {
    fn outcomes(&self) -> &[Outcome] {
        &Outcome::ALL
    }

    async fn execute(&mut self, _userdata: &mut UserData) -> Result<Outcome, PatrolError> {
        if !self.server_ready {
            self.client.wait_for_server().await?;
            self.server_ready = true;
        }

        info!("Sending goal to '{}': {}", self.client.server_name(), self.goal);
        let status = match self.client.send_goal_and_wait(&self.goal).await {
            Ok(status) => status,
            Err(e @ (PatrolError::ActionCommand { .. } | PatrolError::UnparsedStatus { .. })) => {
                warn!("Goal to '{}' was lost: {}", self.client.server_name(), e);
                GoalStatus::Lost
            }
            Err(e) => return Err(e),
        };
        info!("'{}' finished with status {}", self.client.server_name(), status);

        Ok(status.outcome())
    }
}

#[cfg(test)]
mod tests {
    use super::sim::ScriptedActionClient;
    use super::*;

    #[test]
    fn status_to_outcome() {
        assert_eq!(GoalStatus::Succeeded.outcome(), Outcome::Succeeded);
        assert_eq!(GoalStatus::Preempted.outcome(), Outcome::Preempted);
        assert_eq!(GoalStatus::Recalled.outcome(), Outcome::Preempted);
        assert_eq!(GoalStatus::Aborted.outcome(), Outcome::Aborted);
        assert_eq!(GoalStatus::Rejected.outcome(), Outcome::Aborted);
        assert_eq!(GoalStatus::Lost.outcome(), Outcome::Aborted);
    }

    #[test]
    fn move_base_message_carries_pose() {
        let msg = ActionGoal::MoveBase(WaypointGoal::dock()).to_message();
        assert_eq!(msg["target_pose"]["header"]["frame_id"], "map");
        assert_eq!(msg["target_pose"]["pose"]["position"]["x"], -1.053);
        assert_eq!(msg["target_pose"]["pose"]["orientation"]["w"], 0.998);
    }

    #[test]
    fn undock_message_carries_flag() {
        let msg = ActionGoal::Undock { rotate_in_place: true }.to_message();
        assert_eq!(msg.to_string(), r#"{"rotate_in_place":true}"#);
        assert_eq!(ActionGoal::Dock.to_message().to_string(), "{}");
    }

    #[tokio::test]
    async fn waits_for_server_once() {
        let client = Arc::new(ScriptedActionClient::new("undock"));
        client.push_status(GoalStatus::Aborted);
        let mut state = SimpleActionState::new(
            client.clone(),
            ActionGoal::Undock { rotate_in_place: true },
        );
        let mut ud = UserData::default();

        assert_eq!(state.execute(&mut ud).await.unwrap(), Outcome::Aborted);
        assert_eq!(state.execute(&mut ud).await.unwrap(), Outcome::Succeeded);
        assert_eq!(client.wait_count(), 1);
        assert_eq!(client.sent_goals().len(), 2);
        assert_eq!(ud, UserData::default());
    }

    #[tokio::test]
    async fn failed_goal_command_aborts_the_step() {
        let client = Arc::new(ScriptedActionClient::new("move_base"));
        client.fail_next_goals(1);
        let mut state =
            SimpleActionState::new(client.clone(), ActionGoal::MoveBase(WaypointGoal::dock()));
        let mut ud = UserData::default();

        assert_eq!(state.execute(&mut ud).await.unwrap(), Outcome::Aborted);
        assert_eq!(state.execute(&mut ud).await.unwrap(), Outcome::Succeeded);
    }
}
