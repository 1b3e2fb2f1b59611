//! Scripted action clients for dry runs and tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use log::debug;

use super::{ActionClient, ActionGoal, GoalStatus};
use crate::error::PatrolError;

/// Replies to goals with queued statuses, then with `SUCCEEDED` once the
/// queue runs dry. Every goal it receives is recorded. Goals can also be made
/// to fail as if the action command itself had failed.
#[derive(Debug)]
pub struct ScriptedActionClient {
    name: String,
    statuses: Mutex<VecDeque<GoalStatus>>,
    sent: Mutex<Vec<ActionGoal>>,
    waits: Mutex<usize>,
    failures: Mutex<usize>,
}

impl ScriptedActionClient {
    pub fn new(name: &str) -> Self {
        ScriptedActionClient {
            name: name.to_string(),
            statuses: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            waits: Mutex::new(0),
            failures: Mutex::new(0),
        }
    }

    pub fn with_statuses(name: &str, statuses: &[GoalStatus]) -> Self {
        let client = Self::new(name);
        client.statuses.lock().unwrap().extend(statuses.iter().copied());
        client
    }

    pub fn push_status(&self, status: GoalStatus) {
        self.statuses.lock().unwrap().push_back(status);
    }

    /// The next `count` goals fail with an action command error
    pub fn fail_next_goals(&self, count: usize) {
        *self.failures.lock().unwrap() += count;
    }

    pub fn sent_goals(&self) -> Vec<ActionGoal> {
        self.sent.lock().unwrap().clone()
    }

    pub fn wait_count(&self) -> usize {
        *self.waits.lock().unwrap()
    }
}

#[async_trait]
impl ActionClient for ScriptedActionClient {
    fn server_name(&self) -> &str {
        &self.name
    }

    async fn wait_for_server(&self) -> Result<(), PatrolError> {
        *self.waits.lock().unwrap() += 1;
        Ok(())
    }

    async fn send_goal_and_wait(&self, goal: &ActionGoal) -> Result<GoalStatus, PatrolError> {
        self.sent.lock().unwrap().push(goal.clone());

        let mut failures = self.failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(PatrolError::ActionCommand {
                server: self.name.clone(),
                detail: "scripted failure".to_string(),
            });
        }
        drop(failures);

        let status = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(GoalStatus::Succeeded);
        debug!("[{}] scripted reply {} to {}", self.name, status, goal);
        Ok(status)
    }
}
