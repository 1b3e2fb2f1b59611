use anyhow::{Error, Result};
use cardboard_patrol::capture::ProcessLauncher;
use cardboard_patrol::patrol::navigation_goals;
use cardboard_patrol::state_machine::{Outcome, TransitionListener, UserData};
use cardboard_patrol::{CardboardPatrol, PatrolClients, PatrolConfig, WaypointGoal};
use log::{error, info, warn};
use rclrs::{Context, CreateBasicExecutor, Node, QOS_PROFILE_DEFAULT};
use std::collections::HashMap;
use std::sync::Arc;

use geometry_msgs::msg::PoseStamped;
use std_msgs::msg::String as StringMsg;

/// Publishes the patrol's progress for monitoring
struct PatrolStatusNode {
    _node: Arc<Node>,
    state_publisher: Arc<rclrs::Publisher<StringMsg>>,
    goal_publisher: Arc<rclrs::Publisher<PoseStamped>>,
    goals: HashMap<&'static str, WaypointGoal>,
}

impl PatrolStatusNode {
    pub fn new(
        executor: &rclrs::Executor,
        name: &str,
        config: &PatrolConfig,
    ) -> Result<Arc<Self>, rclrs::RclrsError> {
        let node = executor.create_node(name)?;

        let state_publisher =
            node.create_publisher::<StringMsg>("/cardboard_patrol/state", QOS_PROFILE_DEFAULT)?;
        let goal_publisher = node
            .create_publisher::<PoseStamped>("/cardboard_patrol/current_goal", QOS_PROFILE_DEFAULT)?;

        Ok(Arc::new(PatrolStatusNode {
            _node: node,
            state_publisher,
            goal_publisher,
            goals: navigation_goals(config).into_iter().collect(),
        }))
    }

    fn publish_state(&self, text: String) {
        let msg = StringMsg { data: text };
        if let Err(e) = self.state_publisher.publish(&msg) {
            error!("Failed to publish patrol state: {}", e);
        }
    }

    fn publish_goal(&self, goal: &WaypointGoal) {
        let mut pose = PoseStamped::default();
        pose.header.frame_id = goal.frame_id.clone();
        pose.pose.position.x = goal.x;
        pose.pose.position.y = goal.y;
        pose.pose.orientation.z = goal.qz;
        pose.pose.orientation.w = goal.qw;

        if let Err(e) = self.goal_publisher.publish(&pose) {
            error!("Failed to publish current goal: {}", e);
        }
    }
}

impl TransitionListener for PatrolStatusNode {
    fn on_enter(&self, label: &str, userdata: &UserData) {
        self.publish_state(format!("{} (captures={})", label, userdata.counter));
        if let Some(goal) = self.goals.get(label) {
            self.publish_goal(goal);
        }
    }

    fn on_exit(&self, label: &str, outcome: Outcome, _userdata: &UserData) {
        self.publish_state(format!("{} -> {}", label, outcome));
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    cardboard_patrol::init_logging();
    info!("Initializing cardboard patrol node...");

    let config = PatrolConfig::from_env();
    match &config.launch.env_script {
        Some(script) => info!("Launch wrapper: {}", script.display()),
        None => info!("Launching without a wrapper script"),
    }

    let executor = Context::default_from_env()?.create_basic_executor();
    let status_node = PatrolStatusNode::new(&executor, "cardboard_patrol", &config)?;

    let clients = PatrolClients::ros2_cli(&config);
    let launcher = Arc::new(ProcessLauncher::from_config(&config.launch));
    let mut patrol = CardboardPatrol::new(&config, &clients, launcher);
    patrol.add_listener(status_node);

    tokio::select! {
        result = patrol.run() => {
            let outcome = result?;
            info!("Goal execution done: {}", outcome);
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupt!");
        }
    }

    Ok(())
}
