//! Macro - a named, ordered, stably-identified list of actions

use crate::action::{self, Action};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macro {
    id: String,
    name: String,
    actions: Vec<Action>,
}

impl Macro {
    /// New empty macro with a fresh millisecond-timestamp id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(timestamp_id(), name, Vec::new())
    }

    pub fn with_id(id: impl Into<String>, name: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            actions,
        }
    }

    /// Build from canonical command text; unparseable lines are dropped.
    pub fn from_commands(
        id: impl Into<String>,
        name: impl Into<String>,
        commands: &str,
    ) -> Self {
        Self::with_id(id, name, action::parse_actions(commands))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Replace name and actions together. The id never changes.
    pub fn replace(&mut self, name: impl Into<String>, actions: Vec<Action>) {
        self.name = name.into();
        self.actions = actions;
    }

    /// Canonical newline-joined command text.
    pub fn commands(&self) -> String {
        action::serialize_actions(&self.actions)
    }

    /// Lower bound on playback time: delays plus swipe durations.
    pub fn estimated_duration_ms(&self) -> u64 {
        self.actions
            .iter()
            .map(|a| match a {
                Action::Delay { delay_ms } => *delay_ms,
                Action::Swipe { duration_ms, .. } => *duration_ms,
                Action::Tap { .. } => 0,
            })
            .sum()
    }
}

pub(crate) fn timestamp_id() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}
