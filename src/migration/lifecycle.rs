use serde::Serialize;
use statig::prelude::*;
use std::fmt;

use super::error::MigrationError;

/// Which half of the migration subsystem a transition belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Export,
    Import,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Export => "export",
            Direction::Import => "import",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum TransferEvent {
    Begin,
    Fail(MigrationError),
    Succeed,
}

/// Lifecycle of one transfer direction.
///
/// `idle -> running -> completed | faulted`, with every transition total: any
/// event is accepted from any state. The fields are the projection read by
/// presentation code; the statig states record how they were reached.
#[derive(Debug)]
pub struct TransferLifecycle {
    direction: Direction,
    in_progress: bool,
    error: Option<MigrationError>,
    succeeded: bool,
}

impl TransferLifecycle {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            in_progress: false,
            error: None,
            succeeded: false,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn error(&self) -> Option<&MigrationError> {
        self.error.as_ref()
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    fn mark_running(&mut self) {
        self.in_progress = true;
        self.error = None;
        self.succeeded = false;
    }
}

#[state_machine(initial = "State::idle()")]
impl TransferLifecycle {
    #[state(superstate = "transfer")]
    fn idle(&mut self, event: &TransferEvent) -> Outcome<State> {
        match event {
            TransferEvent::Begin => {
                self.mark_running();
                tracing::info!(direction = %self.direction, "Transfer started");
                Transition(State::running())
            }
            _ => Super,
        }
    }

    #[state(superstate = "transfer")]
    fn running(&mut self, event: &TransferEvent) -> Outcome<State> {
        match event {
            TransferEvent::Begin => {
                tracing::warn!(
                    direction = %self.direction,
                    "Begin received while a transfer is already in progress"
                );
                Handled
            }
            _ => Super,
        }
    }

    #[state(superstate = "transfer")]
    fn completed(&mut self, event: &TransferEvent) -> Outcome<State> {
        match event {
            TransferEvent::Begin => {
                self.mark_running();
                tracing::info!(direction = %self.direction, "Transfer restarted after success");
                Transition(State::running())
            }
            _ => Super,
        }
    }

    #[state(superstate = "transfer")]
    fn faulted(&mut self, event: &TransferEvent) -> Outcome<State> {
        match event {
            TransferEvent::Begin => {
                self.mark_running();
                tracing::info!(direction = %self.direction, "Transfer retried after failure");
                Transition(State::running())
            }
            _ => Super,
        }
    }

    #[superstate]
    fn transfer(&mut self, event: &TransferEvent) -> Outcome<State> {
        match event {
            TransferEvent::Fail(error) => {
                self.in_progress = false;
                self.error = Some(error.clone());
                self.succeeded = false;
                tracing::debug!(direction = %self.direction, %error, "Transfer failed");
                Transition(State::faulted())
            }
            TransferEvent::Succeed => {
                self.in_progress = false;
                self.error = None;
                self.succeeded = true;
                tracing::debug!(direction = %self.direction, "Transfer succeeded");
                Transition(State::completed())
            }
            TransferEvent::Begin => Handled,
        }
    }
}
