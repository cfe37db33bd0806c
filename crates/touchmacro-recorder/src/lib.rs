//! touchmacro-recorder - Recording import and macro persistence
//!
//! Turns third-party touch recordings into macros, keeps the macro list on
//! disk, and finds recordings lying around on a device.
//!
//! ## Recording formats
//!
//! - **MuMu `.mmor`**: gzip or plain JSON with `press_rel`/`move_rel`/`release` records
//! - **Generic event logs**: JSON arrays of tap/swipe/delay or down/move/up records
//! - **Plain text**: the macro command grammar with `name:`/`resolution:` headers

pub mod decode;
pub mod scanner;
pub mod storage;

pub use decode::{CoordinateSpace, DecodeResult, Decoder, DecoderConfig, Schema, ScreenSize};
pub use scanner::{RecordingScanner, ScanResult};
pub use storage::{MacroStorage, StoredMacro};

pub mod prelude {
    pub use crate::decode::{CoordinateSpace, DecodeResult, Decoder, DecoderConfig, ScreenSize};
    pub use crate::scanner::{RecordingScanner, ScanResult};
    pub use crate::storage::MacroStorage;
}
