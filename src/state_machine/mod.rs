//! Finite-state sequencer for the patrol
//!
//! States are registered under a label together with a table mapping each of
//! their outcomes to either the next state or one of the machine's terminal
//! outcomes. The first state added is the entry state. Execution visits one
//! state at a time and awaits it fully before looking up the next transition.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::error::PatrolError;

/// Outcome reported by a state or by the whole machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Succeeded,
    Aborted,
    Preempted,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Succeeded, Outcome::Aborted, Outcome::Preempted];

    /// Lowercase name, as SMACH prints it
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Succeeded => "succeeded",
            Outcome::Aborted => "aborted",
            Outcome::Preempted => "preempted",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an outcome leads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Continue with the state registered under this label
    State(String),
    /// Stop the machine with this outcome
    Finish(Outcome),
}

impl Transition {
    /// Continue with the state registered under `label`
    pub fn to(label: &str) -> Self {
        Transition::State(label.to_string())
    }

    /// Stop the machine with `outcome`
    pub fn finish(outcome: Outcome) -> Self {
        Transition::Finish(outcome)
    }
}

/// Data carried through one run of the machine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserData {
    /// Number of completed imaging steps
    pub counter: u32,
}

/// A single step of the machine
#[async_trait]
pub trait State: Send {
    /// Outcomes this state may return
    fn outcomes(&self) -> &[Outcome];

    /// Run the step to completion
    async fn execute(&mut self, userdata: &mut UserData) -> Result<Outcome, PatrolError>;
}

/// Observer notified around every state execution
pub trait TransitionListener: Send + Sync {
    fn on_enter(&self, _label: &str, _userdata: &UserData) {}

    fn on_exit(&self, _label: &str, _outcome: Outcome, _userdata: &UserData) {}
}

struct Entry {
    state: Box<dyn State>,
    transitions: HashMap<Outcome, Transition>,
}

pub struct StateMachine {
    outcomes: Vec<Outcome>,
    order: Vec<String>,
    states: HashMap<String, Entry>,
    listeners: Vec<Arc<dyn TransitionListener>>,
    history: Vec<String>,
    pub userdata: UserData,
}

impl StateMachine {
    /// Create an empty machine that may finish with any of `outcomes`
    pub fn new(outcomes: &[Outcome]) -> Self {
        StateMachine {
            outcomes: outcomes.to_vec(),
            order: Vec::new(),
            states: HashMap::new(),
            listeners: Vec::new(),
            history: Vec::new(),
            userdata: UserData::default(),
        }
    }

    /// Register a state. Re-adding a label replaces the previous state.
    pub fn add<S, I>(&mut self, label: &str, state: S, transitions: I)
    where
        S: State + 'static,
        I: IntoIterator<Item = (Outcome, Transition)>,
    {
        let transitions: HashMap<_, _> = transitions.into_iter().collect();

        for outcome in state.outcomes() {
            if !transitions.contains_key(outcome) {
                debug!("State '{}' has no transition for '{}'", label, outcome);
            }
        }

        if !self.states.contains_key(label) {
            self.order.push(label.to_string());
        }
        self.states.insert(
            label.to_string(),
            Entry {
                state: Box::new(state),
                transitions,
            },
        );
    }

    /// Notify `listener` whenever a state is entered or exited
    pub fn add_listener(&mut self, listener: Arc<dyn TransitionListener>) {
        self.listeners.push(listener);
    }

    /// Label of the entry state
    pub fn initial_state(&self) -> Option<&str> {
        self.order.first().map(String::as_str)
    }

    /// Registered labels in the order they were added
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Transition table of a registered state
    pub fn transitions(&self, label: &str) -> Option<&HashMap<Outcome, Transition>> {
        self.states.get(label).map(|entry| &entry.transitions)
    }

    /// Labels visited during the last run, in order
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Check that the machine has an entry state and that every transition
    /// points at a registered state or at one of the machine's outcomes
    pub fn check_consistency(&self) -> Result<(), PatrolError> {
        if self.order.is_empty() {
            return Err(PatrolError::Inconsistent("no states registered".to_string()));
        }

        for label in &self.order {
            let entry = &self.states[label];
            for (outcome, target) in &entry.transitions {
                match target {
                    Transition::State(next) if !self.states.contains_key(next) => {
                        return Err(PatrolError::Inconsistent(format!(
                            "'{label}' --{outcome}--> unknown state '{next}'"
                        )));
                    }
                    Transition::Finish(terminal) if !self.outcomes.contains(terminal) => {
                        return Err(PatrolError::Inconsistent(format!(
                            "'{label}' --{outcome}--> '{terminal}' is not an outcome of the machine"
                        )));
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }

    /// Run from the entry state until a terminal outcome is reached
    pub async fn execute(&mut self) -> Result<Outcome, PatrolError> {
        self.check_consistency()?;
        self.history.clear();

        let mut current = self.order[0].clone();
        loop {
            let entry = self
                .states
                .get_mut(&current)
                .ok_or_else(|| {
                    PatrolError::Inconsistent(format!("state '{current}' is not registered"))
                })?;

            info!("State machine transitioning to '{}'", current);
            self.history.push(current.clone());
            for listener in &self.listeners {
                listener.on_enter(&current, &self.userdata);
            }

            let outcome = entry.state.execute(&mut self.userdata).await?;
            info!("State '{}' finished with outcome '{}'", current, outcome);
            for listener in &self.listeners {
                listener.on_exit(&current, outcome, &self.userdata);
            }

            match entry.transitions.get(&outcome) {
                Some(Transition::State(next)) => current = next.clone(),
                Some(Transition::Finish(terminal)) => {
                    info!("State machine terminating with outcome '{}'", terminal);
                    return Ok(*terminal);
                }
                None if self.outcomes.contains(&outcome) => {
                    warn!(
                        "State '{}' has no transition for '{}', terminating with it",
                        current, outcome
                    );
                    return Ok(outcome);
                }
                None => {
                    return Err(PatrolError::InvalidTransition {
                        state: current,
                        outcome,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Returns scripted outcomes, one per execution
    struct Scripted {
        outcomes: VecDeque<Outcome>,
    }

    impl Scripted {
        fn new(outcomes: &[Outcome]) -> Self {
            Scripted {
                outcomes: outcomes.iter().copied().collect(),
            }
        }
    }

    #[async_trait]
    impl State for Scripted {
        fn outcomes(&self) -> &[Outcome] {
            &Outcome::ALL
        }

        async fn execute(&mut self, _userdata: &mut UserData) -> Result<Outcome, PatrolError> {
            Ok(self.outcomes.pop_front().unwrap_or(Outcome::Succeeded))
        }
    }

    struct Counting;

    #[async_trait]
    impl State for Counting {
        fn outcomes(&self) -> &[Outcome] {
            &[Outcome::Succeeded]
        }

        async fn execute(&mut self, userdata: &mut UserData) -> Result<Outcome, PatrolError> {
            userdata.counter += 1;
            Ok(Outcome::Succeeded)
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl TransitionListener for Recorder {
        fn on_enter(&self, label: &str, _userdata: &UserData) {
            self.events.lock().unwrap().push(format!("enter {label}"));
        }

        fn on_exit(&self, label: &str, outcome: Outcome, _userdata: &UserData) {
            self.events.lock().unwrap().push(format!("exit {label} {outcome}"));
        }
    }

    fn all_outcomes() -> StateMachine {
        StateMachine::new(&Outcome::ALL)
    }

    #[tokio::test]
    async fn runs_chain_in_order() {
        let mut sm = all_outcomes();
        sm.add("A", Scripted::new(&[]), [(Outcome::Succeeded, Transition::to("B"))]);
        sm.add("B", Counting, [(Outcome::Succeeded, Transition::to("C"))]);
        sm.add(
            "C",
            Scripted::new(&[]),
            [(Outcome::Succeeded, Transition::finish(Outcome::Succeeded))],
        );

        assert_eq!(sm.execute().await.unwrap(), Outcome::Succeeded);
        assert_eq!(sm.history(), ["A", "B", "C"]);
        assert_eq!(sm.userdata.counter, 1);
    }

    #[tokio::test]
    async fn loops_until_finish() {
        let mut sm = all_outcomes();
        sm.add(
            "RETRY",
            Scripted::new(&[Outcome::Aborted, Outcome::Aborted]),
            [
                (Outcome::Aborted, Transition::to("RETRY")),
                (Outcome::Succeeded, Transition::finish(Outcome::Succeeded)),
            ],
        );

        assert_eq!(sm.execute().await.unwrap(), Outcome::Succeeded);
        assert_eq!(sm.history().len(), 3);
    }

    #[tokio::test]
    async fn unmapped_machine_outcome_terminates_with_it() {
        let mut sm = all_outcomes();
        sm.add(
            "ONLY",
            Scripted::new(&[Outcome::Preempted]),
            [(Outcome::Succeeded, Transition::finish(Outcome::Succeeded))],
        );

        assert_eq!(sm.execute().await.unwrap(), Outcome::Preempted);
    }

    #[tokio::test]
    async fn unmapped_foreign_outcome_is_invalid() {
        let mut sm = StateMachine::new(&[Outcome::Succeeded]);
        sm.add(
            "ONLY",
            Scripted::new(&[Outcome::Aborted]),
            [(Outcome::Succeeded, Transition::finish(Outcome::Succeeded))],
        );

        let err = sm.execute().await.unwrap_err();
        assert!(matches!(
            err,
            PatrolError::InvalidTransition { ref state, outcome: Outcome::Aborted } if state == "ONLY"
        ));
    }

    #[tokio::test]
    async fn rejects_dangling_target() {
        let mut sm = all_outcomes();
        sm.add("A", Scripted::new(&[]), [(Outcome::Succeeded, Transition::to("MISSING"))]);

        assert!(matches!(sm.check_consistency(), Err(PatrolError::Inconsistent(_))));
        assert!(sm.execute().await.is_err());
        assert!(sm.history().is_empty());
    }

    #[tokio::test]
    async fn rejects_terminal_outside_machine_outcomes() {
        let mut sm = StateMachine::new(&[Outcome::Succeeded]);
        sm.add(
            "A",
            Scripted::new(&[]),
            [(Outcome::Succeeded, Transition::finish(Outcome::Preempted))],
        );

        assert!(sm.check_consistency().is_err());
    }

    #[test]
    fn empty_machine_is_inconsistent() {
        assert!(all_outcomes().check_consistency().is_err());
    }

    #[test]
    fn first_added_state_is_initial() {
        let mut sm = all_outcomes();
        sm.add("FIRST", Counting, []);
        sm.add("SECOND", Counting, []);
        sm.add("FIRST", Counting, [(Outcome::Succeeded, Transition::to("SECOND"))]);

        assert_eq!(sm.initial_state(), Some("FIRST"));
        assert_eq!(sm.labels().collect::<Vec<_>>(), ["FIRST", "SECOND"]);
        assert_eq!(sm.transitions("FIRST").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn listeners_see_every_step() {
        let recorder = Arc::new(Recorder::default());
        let mut sm = all_outcomes();
        sm.add_listener(recorder.clone());
        sm.add("A", Counting, [(Outcome::Succeeded, Transition::to("B"))]);
        sm.add("B", Scripted::new(&[Outcome::Aborted]), []);

        assert_eq!(sm.execute().await.unwrap(), Outcome::Aborted);
        assert_eq!(
            *recorder.events.lock().unwrap(),
            ["enter A", "exit A succeeded", "enter B", "exit B aborted"]
        );
    }
}
