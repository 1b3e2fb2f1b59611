//! Action client backed by the `ros2 action` command line
//!
//! `ros2 action send_goal` blocks until the goal reaches a terminal state and
//! prints the final status, which is all a patrol step needs from the server.

use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::process::Command;

use super::{ActionClient, ActionGoal, GoalStatus};
use crate::error::PatrolError;

/// Polls between warnings while waiting for a server
const WARN_EVERY: u32 = 5;

/// Action client that shells out to `ros2 action send_goal`
pub struct Ros2CliActionClient {
    server: String,
    action_type: String,
    command: Vec<String>,
    poll_interval: Duration,
}

impl Ros2CliActionClient {
    pub fn new(server: &str, action_type: &str) -> Self {
        Ros2CliActionClient {
            server: server.to_string(),
            action_type: action_type.to_string(),
            command: vec!["ros2".to_string()],
            poll_interval: Duration::from_secs(1),
        }
    }

    /// Use another command line in place of `ros2`
    pub fn with_command(mut self, command: &[&str]) -> Self {
        self.command = command.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Delay between `action list` polls
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    async fn run(&self, args: &[&str]) -> Result<Output, PatrolError> {
        let (program, prefix) = self
            .command
            .split_first()
            .ok_or_else(|| PatrolError::ActionCommand {
                server: self.server.clone(),
                detail: "empty command line".to_string(),
            })?;
        debug!("Running {} {}", self.command.join(" "), args.join(" "));
        Command::new(program)
            .args(prefix)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| PatrolError::Spawn {
                program: program.clone(),
                source,
            })
    }

    fn advertised_name(&self) -> String {
        format!("/{}", self.server.trim_start_matches('/'))
    }
}

#[async_trait]
impl ActionClient for Ros2CliActionClient {
    fn server_name(&self) -> &str {
        &self.server
    }

    async fn wait_for_server(&self) -> Result<(), PatrolError> {
        let wanted = self.advertised_name();
        let mut polls = 0u32;

        loop {
            let output = self.run(&["action", "list"]).await?;
            let listing = String::from_utf8_lossy(&output.stdout);
            if listing.lines().any(|line| line.trim() == wanted) {
                info!("Action server '{}' is available", self.server);
                return Ok(());
            }

            polls += 1;
            if polls % WARN_EVERY == 0 {
                warn!(
                    "Still waiting for action server '{}' ({} polls)",
                    self.server, polls
                );
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn send_goal_and_wait(&self, goal: &ActionGoal) -> Result<GoalStatus, PatrolError> {
        let message = goal.to_message().to_string();
        let output = self
            .run(&[
                "action",
                "send_goal",
                &self.advertised_name(),
                &self.action_type,
                &message,
            ])
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_final_status(&stdout) {
            Some(status) => Ok(status),
            None if !output.status.success() => Err(PatrolError::ActionCommand {
                server: self.server.clone(),
                detail: format!(
                    "exited with status {}: {}",
                    output.status.code().unwrap_or(-1),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            }),
            None => Err(PatrolError::UnparsedStatus {
                server: self.server.clone(),
                output: stdout.trim().to_string(),
            }),
        }
    }
}

/// Extract the terminal goal status from `ros2 action send_goal` output
pub fn parse_final_status(output: &str) -> Option<GoalStatus> {
    output.lines().rev().find_map(|line| {
        let line = line.trim();
        if line.starts_with("Goal was rejected") {
            return Some(GoalStatus::Rejected);
        }
        let status = line.strip_prefix("Goal finished with status:")?.trim();
        Some(match status {
            "SUCCEEDED" => GoalStatus::Succeeded,
            "CANCELED" => GoalStatus::Preempted,
            "ABORTED" => GoalStatus::Aborted,
            "UNKNOWN" => GoalStatus::Lost,
            _ => GoalStatus::Aborted,
        })
    })
}
