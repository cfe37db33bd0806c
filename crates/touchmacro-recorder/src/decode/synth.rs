//! Touch events to actions

use super::normalize::to_pixels;
use super::DecoderConfig;
use std::collections::HashMap;
use touchmacro_core::Action;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchKind {
    Press,
    Move,
    Release,
}

/// One decoded pointer event, still in recorder-relative coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub kind: TouchKind,
    pub pointer_id: i32,
    pub rel_x: f64,
    pub rel_y: f64,
    pub time_ms: i64,
}

/// Turns timestamp gaps between emitted gestures into `Delay` actions.
#[derive(Debug)]
pub(crate) struct DelayClock {
    last: Option<i64>,
    min_delay_ms: u64,
}

impl DelayClock {
    pub fn new(min_delay_ms: u64) -> Self {
        Self {
            last: None,
            min_delay_ms,
        }
    }

    /// Record a gesture emitted at `time_ms`, returning the delay that must
    /// precede it.
    pub fn gesture_at(&mut self, time_ms: i64) -> Option<Action> {
        let gap = self
            .last
            .map(|prev| time_ms.saturating_sub(prev))
            .filter(|gap| *gap > 0)
            .map(|gap| gap as u64)
            .filter(|gap| *gap >= self.min_delay_ms);
        self.last = Some(time_ms);
        gap.map(Action::delay)
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Pair presses with releases per pointer and emit one tap per pair.
///
/// A move updates the open press in place, so the tap lands where the
/// finger was lifted. A second press on an open pointer replaces it.
pub fn synthesize(events: &[TouchEvent], config: &DecoderConfig) -> Vec<Action> {
    let mut open: HashMap<i32, (f64, f64)> = HashMap::new();
    let mut clock = DelayClock::new(config.min_delay_ms);
    let mut actions = Vec::new();

    for e in events {
        match e.kind {
            TouchKind::Press => {
                open.insert(e.pointer_id, (e.rel_x, e.rel_y));
            }
            TouchKind::Move => {
                if let Some(pos) = open.get_mut(&e.pointer_id) {
                    *pos = (e.rel_x, e.rel_y);
                }
            }
            TouchKind::Release => {
                let Some((rx, ry)) = open.remove(&e.pointer_id) else {
                    debug!(pointer = e.pointer_id, "release without press");
                    continue;
                };
                let (x, y) = to_pixels(rx, ry, config.screen, config.space);
                debug!(rx, ry, x, y, screen = %config.screen, "tap converted");
                actions.extend(clock.gesture_at(e.time_ms));
                actions.push(Action::tap(x, y));
            }
        }
    }
    if !open.is_empty() {
        debug!(pointers = open.len(), "presses never released");
    }
    actions
}

/// Merge runs of consecutive delays when `actions` is longer than
/// `threshold`. Gestures are never dropped or reordered.
pub fn coalesce_delays(actions: Vec<Action>, threshold: usize) -> Vec<Action> {
    if actions.len() <= threshold {
        return actions;
    }
    let before = actions.len();
    let mut out: Vec<Action> = Vec::with_capacity(before);
    for action in actions {
        if let (Some(Action::Delay { delay_ms: acc }), Action::Delay { delay_ms }) =
            (out.last_mut(), action)
        {
            *acc = acc.saturating_add(delay_ms);
            continue;
        }
        out.push(action);
    }
    debug!(before, after = out.len(), "coalesced delays");
    out
}
