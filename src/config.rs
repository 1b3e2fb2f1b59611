//! Patrol configuration
//!
//! Defaults reproduce the fixed patrol. Only the environment wrapper script
//! can be overridden, through `CARDBOARD_PATROL_ENV_SCRIPT`.

use std::path::PathBuf;
use std::time::Duration;

use log::info;

use crate::common::WaypointGoal;

pub const ENV_SCRIPT_VAR: &str = "CARDBOARD_PATROL_ENV_SCRIPT";

/// Name and ROS type of an action server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub name: String,
    pub action_type: String,
}

impl ServerConfig {
    fn new(name: &str, action_type: &str) -> Self {
        ServerConfig {
            name: name.to_string(),
            action_type: action_type.to_string(),
        }
    }
}

/// How the imaging launches are started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Script that sources the workspace and then runs its arguments
    pub env_script: Option<PathBuf>,
    pub command: Vec<String>,
    pub package: String,
    /// Capture launch file, `{}` is replaced by the 1-based capture index
    pub capture_template: String,
    pub detect_file: String,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        LaunchConfig {
            env_script: dirs::home_dir().map(|home| home.join("long_term_ws/devel/env.sh")),
            command: vec!["roslaunch".to_string()],
            package: "cardboard_detection_task".to_string(),
            capture_template: "cardboard_capture_{}.launch".to_string(),
            detect_file: "detect_cardboard.launch".to_string(),
        }
    }
}

/// Everything a patrol run needs to know about the robot and its workspace
#[derive(Debug, Clone, PartialEq)]
pub struct PatrolConfig {
    pub cardboard_sites: [WaypointGoal; 2],
    pub dock_approach: WaypointGoal,
    pub rotate_in_place: bool,
    pub undock_server: ServerConfig,
    pub move_base_server: ServerConfig,
    pub dock_server: ServerConfig,
    pub launch: LaunchConfig,
    pub server_poll_interval: Duration,
}

impl Default for PatrolConfig {
    fn default() -> Self {
        PatrolConfig {
            cardboard_sites: [WaypointGoal::cardboard_site_1(), WaypointGoal::cardboard_site_2()],
            dock_approach: WaypointGoal::dock(),
            rotate_in_place: true,
            undock_server: ServerConfig::new("undock", "fetch_auto_dock_msgs/action/Undock"),
            move_base_server: ServerConfig::new("move_base", "move_base_msgs/action/MoveBase"),
            dock_server: ServerConfig::new("dock", "fetch_auto_dock_msgs/action/Dock"),
            launch: LaunchConfig::default(),
            server_poll_interval: Duration::from_secs(1),
        }
    }
}

impl PatrolConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = PatrolConfig::default();
        config.apply_env_script(std::env::var(ENV_SCRIPT_VAR).ok().as_deref());
        config
    }

    /// An empty value runs launches without a wrapper script
    pub fn apply_env_script(&mut self, value: Option<&str>) {
        match value {
            None => {}
            Some("") => {
                info!("{} is empty, launching without a wrapper", ENV_SCRIPT_VAR);
                self.launch.env_script = None;
            }
            Some(path) => {
                info!("Using wrapper script {}", path);
                self.launch.env_script = Some(PathBuf::from(path));
            }
        }
    }

    /// The waypoints visited by a full patrol, in order
    pub fn waypoints(&self) -> [&WaypointGoal; 3] {
        [
            &self.cardboard_sites[0],
            &self.cardboard_sites[1],
            &self.dock_approach,
        ]
    }
}
