//! The cardboard patrol: undock, image two sites, return and dock
pub mod linear;

use std::sync::Arc;

use log::info;

use crate::actions::cli::Ros2CliActionClient;
use crate::actions::{ActionClient, ActionGoal, SimpleActionState};
use crate::capture::{ImagingState, Launcher};
use crate::common::WaypointGoal;
use crate::config::{PatrolConfig, ServerConfig};
use crate::error::PatrolError;
use crate::state_machine::{Outcome, StateMachine, Transition, TransitionListener};

pub const UNDOCK: &str = "UNDOCK";
pub const GO_TO_CARDBOARD_1: &str = "GO_TO_CARDBOARD_1";
pub const TAKE_IMAGE_1: &str = "TAKE_IMAGE_1";
pub const GO_TO_CARDBOARD_2: &str = "GO_TO_CARDBOARD_2";
pub const TAKE_IMAGE_2: &str = "TAKE_IMAGE_2";
pub const GO_TO_DOCK: &str = "GO_TO_DOCK";
pub const DOCK: &str = "DOCK";

/// Clients for the three action servers the patrol talks to
#[derive(Clone)]
pub struct PatrolClients {
    pub undock: Arc<dyn ActionClient>,
    pub move_base: Arc<dyn ActionClient>,
    pub dock: Arc<dyn ActionClient>,
}

impl PatrolClients {
    /// Clients that go through the `ros2 action` command line
    pub fn ros2_cli(config: &PatrolConfig) -> Self {
        let client = |server: &ServerConfig| -> Arc<dyn ActionClient> {
            Arc::new(
                Ros2CliActionClient::new(&server.name, &server.action_type)
                    .with_poll_interval(config.server_poll_interval),
            )
        };

        PatrolClients {
            undock: client(&config.undock_server),
            move_base: client(&config.move_base_server),
            dock: client(&config.dock_server),
        }
    }
}

/// Navigation goal sent by each move_base step
pub fn navigation_goals(config: &PatrolConfig) -> Vec<(&'static str, WaypointGoal)> {
    vec![
        (GO_TO_CARDBOARD_1, config.cardboard_sites[0].clone()),
        (GO_TO_CARDBOARD_2, config.cardboard_sites[1].clone()),
        (GO_TO_DOCK, config.dock_approach.clone()),
    ]
}

/// Build the patrol state machine. `UNDOCK` is the entry state.
pub fn build_state_machine(
    config: &PatrolConfig,
    clients: &PatrolClients,
    launcher: Arc<dyn Launcher>,
) -> StateMachine {
    use Outcome::*;

    let mut sm = StateMachine::new(&[Succeeded, Aborted, Preempted]);
    let navigate = |goal: &WaypointGoal| {
        SimpleActionState::new(clients.move_base.clone(), ActionGoal::MoveBase(goal.clone()))
    };

    // The undock server reports aborted even when the robot undocks fine
    sm.add(
        UNDOCK,
        SimpleActionState::new(
            clients.undock.clone(),
            ActionGoal::Undock {
                rotate_in_place: config.rotate_in_place,
            },
        ),
        [(Aborted, Transition::to(GO_TO_CARDBOARD_1))],
    );
    sm.add(
        GO_TO_CARDBOARD_1,
        navigate(&config.cardboard_sites[0]),
        [
            (Succeeded, Transition::to(TAKE_IMAGE_1)),
            (Aborted, Transition::to(GO_TO_DOCK)),
        ],
    );
    sm.add(
        TAKE_IMAGE_1,
        ImagingState::new(launcher.clone(), config.launch.clone()),
        [(Succeeded, Transition::to(GO_TO_CARDBOARD_2))],
    );
    sm.add(
        GO_TO_CARDBOARD_2,
        navigate(&config.cardboard_sites[1]),
        [
            (Succeeded, Transition::to(TAKE_IMAGE_2)),
            (Aborted, Transition::to(GO_TO_DOCK)),
        ],
    );
    sm.add(
        TAKE_IMAGE_2,
        ImagingState::new(launcher, config.launch.clone()),
        [(Succeeded, Transition::to(GO_TO_DOCK))],
    );
    sm.add(
        GO_TO_DOCK,
        navigate(&config.dock_approach),
        [(Succeeded, Transition::to(DOCK))],
    );
    sm.add(
        DOCK,
        SimpleActionState::new(clients.dock.clone(), ActionGoal::Dock),
        [(Succeeded, Transition::finish(Succeeded))],
    );

    sm
}

/// One patrol run over the fixed route
pub struct CardboardPatrol {
    sm: StateMachine,
}

impl CardboardPatrol {
    pub fn new(config: &PatrolConfig, clients: &PatrolClients, launcher: Arc<dyn Launcher>) -> Self {
        CardboardPatrol {
            sm: build_state_machine(config, clients, launcher),
        }
    }

    /// Forwarded to the underlying state machine
    pub fn add_listener(&mut self, listener: Arc<dyn TransitionListener>) {
        self.sm.add_listener(listener);
    }

    /// Run the patrol to a terminal outcome
    pub async fn run(&mut self) -> Result<Outcome, PatrolError> {
        info!("Starting cardboard patrol");
        let outcome = self.sm.execute().await?;
        info!(
            "Patrol finished with '{}' after {} captures",
            outcome,
            self.captures()
        );
        Ok(outcome)
    }

    /// Steps visited by the last run
    pub fn history(&self) -> &[String] {
        self.sm.history()
    }

    /// Imaging steps completed so far
    pub fn captures(&self) -> u32 {
        self.sm.userdata.counter
    }

    pub fn state_machine(&self) -> &StateMachine {
        &self.sm
    }
}
