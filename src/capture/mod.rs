//! Image capture and cardboard detection launches
pub mod sim;

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use tokio::process::Command;

use crate::config::LaunchConfig;
use crate::error::PatrolError;
use crate::state_machine::{Outcome, State, UserData};

/// A launch file to run to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub package: String,
    pub file: String,
}

impl LaunchRequest {
    pub fn new(package: &str, file: &str) -> Self {
        LaunchRequest {
            package: package.to_string(),
            file: file.to_string(),
        }
    }
}

/// How a launched process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchExit {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
}

impl LaunchExit {
    /// Exit code 0
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs launch files and waits for them to exit
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, request: &LaunchRequest) -> Result<LaunchExit, PatrolError>;
}

/// Launches through an optional environment script, e.g.
/// `~/long_term_ws/devel/env.sh roslaunch <package> <file>`
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    env_script: Option<PathBuf>,
    command: Vec<String>,
}

impl ProcessLauncher {
    pub fn new(env_script: Option<PathBuf>, command: Vec<String>) -> Self {
        ProcessLauncher {
            env_script,
            command,
        }
    }

    /// Launcher using the configured wrapper script and command
    pub fn from_config(config: &LaunchConfig) -> Self {
        Self::new(config.env_script.clone(), config.command.clone())
    }

    fn command_line(&self, request: &LaunchRequest) -> Vec<String> {
        let mut line = Vec::with_capacity(self.command.len() + 3);
        if let Some(script) = &self.env_script {
            line.push(script.to_string_lossy().into_owned());
        }
        line.extend(self.command.iter().cloned());
        line.push(request.package.clone());
        line.push(request.file.clone());
        line
    }
}

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn launch(&self, request: &LaunchRequest) -> Result<LaunchExit, PatrolError> {
        let line = self.command_line(request);
        let (program, args) = line.split_first().ok_or_else(|| PatrolError::Spawn {
            program: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line"),
        })?;

        info!("Launching {}", line.join(" "));
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| PatrolError::Spawn {
                program: program.clone(),
                source,
            })?;

        let exit = LaunchExit {
            code: status.code(),
        };
        if exit.success() {
            info!("{} exited cleanly", request.file);
        } else {
            warn!("{} exited with {:?}", request.file, exit.code);
        }
        Ok(exit)
    }
}

/// Capture launch file for the given 1-based capture index
pub fn capture_request(config: &LaunchConfig, index: u32) -> LaunchRequest {
    let file = config.capture_template.replace("{}", &index.to_string());
    LaunchRequest::new(&config.package, &file)
}

/// Detection launch run after every capture
pub fn detect_request(config: &LaunchConfig) -> LaunchRequest {
    LaunchRequest::new(&config.package, &config.detect_file)
}

/// Callback step: capture images for the next site, run detection on them,
/// and report success whatever the launches returned.
///
/// The counter moves as soon as the capture launch has exited, before
/// detection starts. If detection cannot be spawned the step fails, but the
/// capture is still counted.
pub struct ImagingState {
    launcher: Arc<dyn Launcher>,
    config: LaunchConfig,
}

impl ImagingState {
    pub fn new(launcher: Arc<dyn Launcher>, config: LaunchConfig) -> Self {
        ImagingState { launcher, config }
    }
}

#[async_trait]
impl State for ImagingState {
    fn outcomes(&self) -> &[Outcome] {
        &[Outcome::Succeeded]
    }

    async fn execute(&mut self, userdata: &mut UserData) -> Result<Outcome, PatrolError> {
        let capture = capture_request(&self.config, userdata.counter + 1);
        self.launcher.launch(&capture).await?;
        userdata.counter += 1;

        self.launcher.launch(&detect_request(&self.config)).await?;
        Ok(Outcome::Succeeded)
    }
}
