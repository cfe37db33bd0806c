//! touchmacro-core - Touch macros and a cancellable playback engine
//!
//! Plain-text touch actions, named macros, a macro library with a selection,
//! and a single-threaded engine that replays a macro through any
//! [`GestureDispatcher`].
//!
//! ## Dispatchers
//!
//! - **adb**: `adb shell input tap|swipe` against a connected device
//! - **dry-run**: logs gestures, optionally sleeping for their duration

pub mod action;
pub mod adb;
pub mod engine;
pub mod error;
pub mod gesture;
pub mod library;
pub mod macros;
pub mod runner;

pub use action::{parse_actions, serialize_actions, validate_commands, Action, ActionKind};
pub use adb::AdbDispatcher;
pub use engine::{Engine, EngineConfig, EngineError, EngineListener, EngineState, Scheduler, Wakeup};
pub use error::{Error, ErrorCode, Result};
pub use gesture::{DispatchError, Gesture, GestureDispatcher, Point, Ticket};
pub use library::MacroLibrary;
pub use macros::Macro;
pub use runner::{CompletionSink, DryRunDispatcher, MacroRunner, Signal, TimerQueue};

pub mod prelude {
    pub use crate::action::Action;
    pub use crate::engine::{EngineConfig, EngineState};
    pub use crate::error::{Error, ErrorCode, Result};
    pub use crate::library::MacroLibrary;
    pub use crate::macros::Macro;
    pub use crate::runner::{MacroRunner, Signal};
}
