//! # touchmacro
//!
//! Author, import and replay touch macros.
//!
//! ## Features
//!
//! - **Macros**: a plain-text tap/swipe/delay grammar with stable ids
//! - **Import**: decode emulator recordings into macros
//! - **Playback**: one macro at a time, stoppable at any point
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use touchmacro::prelude::*;
//! use touchmacro::DryRunDispatcher;
//!
//! let result = Decoder::default().decode_file("daily.mmor");
//! let Some(m) = result.into_macro("daily") else {
//!     return Ok(());
//! };
//!
//! let runner = MacroRunner::spawn(EngineConfig::default(), DryRunDispatcher::new)?;
//! runner.start(m);
//! while let Ok(signal) = runner.signals().recv() {
//!     if signal != Signal::Started {
//!         break;
//!     }
//! }
//! # Ok::<(), touchmacro::Error>(())
//! ```

// Re-export the model and engine
pub use touchmacro_core::*;

// Re-export the recorder module
pub use touchmacro_recorder as recorder;

pub use touchmacro_recorder::{
    CoordinateSpace, DecodeResult, Decoder, DecoderConfig, MacroStorage, RecordingScanner,
    ScanResult, Schema, ScreenSize,
};

/// Prelude - import everything you need
pub mod prelude {
    pub use touchmacro_core::prelude::*;
    pub use touchmacro_recorder::prelude::*;
}
