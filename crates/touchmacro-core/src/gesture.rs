//! Gesture capability consumed by the engine
//!
//! A dispatcher performs a tap or straight-line swipe somewhere outside this
//! crate (adb, an accessibility service, a test double) and reports completion
//! later, tagged with the [`Ticket`] it was handed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// One point is a tap, two points a straight swipe over `duration_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gesture {
    pub points: Vec<Point>,
    pub duration_ms: u64,
}

impl Gesture {
    pub fn tap(x: i32, y: i32, duration_ms: u64) -> Self {
        Self {
            points: vec![Point::new(x, y)],
            duration_ms,
        }
    }

    pub fn swipe(start: Point, end: Point, duration_ms: u64) -> Self {
        Self {
            points: vec![start, end],
            duration_ms,
        }
    }

    pub fn is_tap(&self) -> bool {
        self.points.len() == 1
    }
}

/// Identifies the run and action a completion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticket {
    pub generation: u64,
    pub index: usize,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("gesture capability unavailable: {0}")]
    Unavailable(String),

    #[error("gesture rejected: {0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait GestureDispatcher {
    /// Start performing `gesture`.
    ///
    /// `Ok` means a completion for `ticket` (success or platform-cancelled)
    /// will be delivered back to the engine later. `Err` means nothing was
    /// started and no completion will follow.
    fn dispatch(&mut self, gesture: &Gesture, ticket: Ticket) -> Result<(), DispatchError>;
}

impl<T: GestureDispatcher + ?Sized> GestureDispatcher for Box<T> {
    fn dispatch(&mut self, gesture: &Gesture, ticket: Ticket) -> Result<(), DispatchError> {
        (**self).dispatch(gesture, ticket)
    }
}
