//! Cancellable, strictly sequential macro execution
//!
//! The engine is a state machine. It never sleeps or blocks: gestures are
//! handed to a [`GestureDispatcher`], timers to a [`Scheduler`], and the host
//! event loop feeds results back through [`Engine::gesture_completed`] and
//! [`Engine::wake`]. Every continuation carries a [`Ticket`] naming the run
//! and action it belongs to, and is dropped unless that action is the one
//! currently running and waiting for exactly that kind of continuation.

use crate::action::Action;
use crate::gesture::{GestureDispatcher, Ticket};
use crate::macros::Macro;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(50);
pub const DEFAULT_TAP_DURATION_MS: u64 = 100;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Pause after a gesture completes before the next action
    pub settle_delay: Duration,
    /// Stroke duration used for taps
    pub tap_duration_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            tap_duration_ms: DEFAULT_TAP_DURATION_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum EngineState {
    Idle,
    Running { generation: u64, index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineError {
    #[error("macro is missing or has no actions")]
    EmptyMacro,
    #[error("a macro is already running")]
    AlreadyRunning,
}

/// A timer continuation. Both kinds advance to the action after `ticket.index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    /// Settle pause after a gesture finished
    Settle(Ticket),
    /// An explicit `Delay` action elapsed
    DelayElapsed(Ticket),
}

impl Wakeup {
    pub fn ticket(&self) -> Ticket {
        match *self {
            Self::Settle(t) | Self::DelayElapsed(t) => t,
        }
    }
}

/// What the running action is waiting for before the sequence may advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Awaiting {
    Gesture,
    Settle,
    Delay,
}

/// "Run after delay" primitive of the host event loop.
pub trait Scheduler {
    fn schedule(&mut self, after: Duration, wake: Wakeup);
    fn cancel_all(&mut self);
}

/// Signals emitted by the engine.
pub trait EngineListener {
    fn on_started(&mut self) {}
    fn on_finished(&mut self) {}
    fn on_error(&mut self, _error: EngineError) {}
}

impl EngineListener for () {}

pub struct Engine<D, S, L> {
    dispatcher: D,
    scheduler: S,
    listener: L,
    config: EngineConfig,
    state: EngineState,
    awaiting: Option<Awaiting>,
    generation: u64,
    actions: Vec<Action>,
}

impl<D, S, L> Engine<D, S, L>
where
    D: GestureDispatcher,
    S: Scheduler,
    L: EngineListener,
{
    pub fn new(dispatcher: D, scheduler: S, listener: L) -> Self {
        Self {
            dispatcher,
            scheduler,
            listener,
            config: EngineConfig::default(),
            state: EngineState::Idle,
            awaiting: None,
            generation: 0,
            actions: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, EngineState::Running { .. })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    /// Begin running `macro_def` from its first action.
    ///
    /// Rejections are reported once through `on_error` and leave the engine
    /// exactly as it was.
    pub fn start(&mut self, macro_def: Option<&Macro>) -> Result<(), EngineError> {
        let Some(macro_def) = macro_def.filter(|m| !m.is_empty()) else {
            return self.reject(EngineError::EmptyMacro);
        };
        if self.is_running() {
            return self.reject(EngineError::AlreadyRunning);
        }

        self.generation += 1;
        let generation = self.generation;
        self.actions = macro_def.actions().to_vec();
        self.state = EngineState::Running {
            generation,
            index: 0,
        };

        info!(
            name = macro_def.name(),
            actions = self.actions.len(),
            generation,
            "macro started"
        );
        self.listener.on_started();
        self.step(0, generation);
        Ok(())
    }

    /// Stop immediately. Pending timers are cancelled and any completion still
    /// in flight becomes stale. Does not emit `on_finished`.
    pub fn stop(&mut self) {
        if let EngineState::Running { index, .. } = self.state {
            info!(generation = self.generation, index, "macro stopped");
        }
        self.state = EngineState::Idle;
        self.awaiting = None;
        self.generation += 1;
        self.scheduler.cancel_all();
    }

    /// Completion of a dispatched gesture. `ok == false` (platform-cancelled)
    /// is treated the same as success.
    ///
    /// Only the first completion of the gesture currently in flight counts;
    /// duplicates and completions from earlier actions are dropped.
    pub fn gesture_completed(&mut self, ticket: Ticket, ok: bool) {
        if !self.expects(ticket, Awaiting::Gesture) {
            debug!(?ticket, state = ?self.state, "discarding stale completion");
            return;
        }
        if !ok {
            debug!(index = ticket.index, "gesture cancelled by platform");
        }
        self.awaiting = Some(Awaiting::Settle);
        self.scheduler
            .schedule(self.config.settle_delay, Wakeup::Settle(ticket));
    }

    /// A timer scheduled by this engine fired.
    pub fn wake(&mut self, wake: Wakeup) {
        let (ticket, expected) = match wake {
            Wakeup::Settle(t) => (t, Awaiting::Settle),
            Wakeup::DelayElapsed(t) => (t, Awaiting::Delay),
        };
        if !self.expects(ticket, expected) {
            debug!(?wake, state = ?self.state, "discarding stale timer");
            return;
        }
        self.step(ticket.index + 1, ticket.generation);
    }

    fn reject(&mut self, err: EngineError) -> Result<(), EngineError> {
        warn!(error = %err, "macro start rejected");
        self.listener.on_error(err);
        Err(err)
    }

    /// True when `ticket` names the running action and it is waiting on `what`.
    fn expects(&self, ticket: Ticket, what: Awaiting) -> bool {
        self.awaiting == Some(what)
            && self.state
                == EngineState::Running {
                    generation: ticket.generation,
                    index: ticket.index,
                }
    }

    fn step(&mut self, index: usize, generation: u64) {
        if !matches!(self.state, EngineState::Running { generation: g, .. } if g == generation) {
            return;
        }

        let Some(action) = self.actions.get(index).copied() else {
            self.state = EngineState::Idle;
            self.awaiting = None;
            info!(generation, "macro finished");
            self.listener.on_finished();
            return;
        };

        self.state = EngineState::Running { generation, index };
        let ticket = Ticket { generation, index };
        debug!(index, total = self.actions.len(), %action, "dispatching");

        match action {
            Action::Delay { delay_ms } => {
                self.awaiting = Some(Awaiting::Delay);
                self.scheduler
                    .schedule(Duration::from_millis(delay_ms), Wakeup::DelayElapsed(ticket));
            }
            Action::Tap { .. } | Action::Swipe { .. } => {
                let Some(gesture) = action.gesture(self.config.tap_duration_ms) else {
                    return;
                };
                self.awaiting = Some(Awaiting::Gesture);
                if let Err(e) = self.dispatcher.dispatch(&gesture, ticket) {
                    // Keep the sequence moving: a refused gesture counts as done.
                    warn!(error = %e, index, "gesture dispatch failed; continuing");
                    self.gesture_completed(ticket, false);
                }
            }
        }
    }
}
