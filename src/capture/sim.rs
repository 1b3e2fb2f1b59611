//! Launcher that records requests instead of starting processes

use std::sync::Mutex;

use async_trait::async_trait;
use log::info;

use super::{LaunchExit, LaunchRequest, Launcher};
use crate::error::PatrolError;

#[derive(Debug, Default)]
pub struct RecordingLauncher {
    exit_code: i32,
    requests: Mutex<Vec<LaunchRequest>>,
}

impl RecordingLauncher {
    /// Every launch exits with `code`
    pub fn failing(code: i32) -> Self {
        RecordingLauncher {
            exit_code: code,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<LaunchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Launcher for RecordingLauncher {
    async fn launch(&self, request: &LaunchRequest) -> Result<LaunchExit, PatrolError> {
        info!("[dry run] {} {}", request.package, request.file);
        self.requests.lock().unwrap().push(request.clone());
        Ok(LaunchExit {
            code: Some(self.exit_code),
        })
    }
}
