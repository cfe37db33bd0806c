//! Recording decoder - opaque recorder blobs to macros
//!
//! ```text
//! bytes ─► decompress ─► [fixed | heuristic | text] ─► normalize ─► actions
//! ```
//!
//! Every stage degrades instead of failing. The outcome is always a
//! [`DecodeResult`]; whether anything usable came out is `result.success`.

mod decompress;
mod fixed;
mod heuristic;
mod normalize;
mod synth;
mod text;
mod value;

pub use decompress::decompress;
pub use normalize::{to_pixels, CoordinateSpace, ScreenSize};
pub use synth::{coalesce_delays, TouchEvent, TouchKind};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use touchmacro_core::{Action, Macro};
use tracing::{debug, info, warn};

pub const DEFAULT_MIN_DELAY_MS: u64 = 5;
pub const DEFAULT_COALESCE_THRESHOLD: usize = 100;
pub const DEFAULT_SWIPE_DURATION_MS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Target screen the recording is replayed on.
    pub screen: ScreenSize,
    pub space: CoordinateSpace,
    /// Timestamp gaps shorter than this do not produce a `Delay`.
    pub min_delay_ms: u64,
    /// Heuristic results longer than this get consecutive delays merged.
    pub coalesce_threshold: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            screen: ScreenSize::default(),
            space: CoordinateSpace::default(),
            min_delay_ms: DEFAULT_MIN_DELAY_MS,
            coalesce_threshold: DEFAULT_COALESCE_THRESHOLD,
        }
    }
}

impl DecoderConfig {
    pub fn with_screen(mut self, screen: ScreenSize) -> Self {
        self.screen = screen;
        self
    }

    pub fn with_space(mut self, space: CoordinateSpace) -> Self {
        self.space = space;
        self
    }

    pub fn with_min_delay_ms(mut self, ms: u64) -> Self {
        self.min_delay_ms = ms;
        self
    }

    pub fn with_coalesce_threshold(mut self, threshold: usize) -> Self {
        self.coalesce_threshold = threshold;
        self
    }
}

/// Which structural parse produced the actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schema {
    Fixed,
    Heuristic,
    Text,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeResult {
    pub success: bool,
    pub actions: Vec<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    pub total_events: usize,
    pub touch_events: usize,
    pub converted_actions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

impl DecodeResult {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Build a macro from a successful decode. The recording's own name wins
    /// over `fallback_name`.
    pub fn into_macro(self, fallback_name: &str) -> Option<Macro> {
        if !self.success {
            return None;
        }
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| fallback_name.to_string());
        let mut m = Macro::new(name);
        for action in self.actions {
            m.push(action);
        }
        Some(m)
    }
}

/// Output of one structural parse that recognized its input.
#[derive(Debug, Default)]
pub(crate) struct Attempt {
    pub actions: Vec<Action>,
    pub name: Option<String>,
    pub resolution: Option<String>,
    pub total_events: usize,
    pub touch_events: usize,
}

type AttemptFn = fn(&str, &DecoderConfig) -> Option<Attempt>;

/// Tried in order; the first one that yields actions wins.
const ATTEMPTS: &[(Schema, AttemptFn)] = &[
    (Schema::Fixed, fixed::parse),
    (Schema::Heuristic, heuristic::parse),
    (Schema::Text, text::parse),
];

#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn decode(&self, bytes: &[u8]) -> DecodeResult {
        let content = decompress(bytes);
        if content.trim().is_empty() {
            return DecodeResult::failure("Recording is empty");
        }

        let mut diagnostic: Option<Attempt> = None;
        for (schema, attempt) in ATTEMPTS {
            let Some(found) = attempt(&content, &self.config) else {
                debug!(?schema, "structure not recognized");
                continue;
            };
            if found.actions.is_empty() {
                debug!(?schema, total = found.total_events, "recognized but produced no actions");
                // Earlier attempts describe the recording more specifically.
                diagnostic.get_or_insert(found);
                continue;
            }
            info!(
                ?schema,
                total = found.total_events,
                touch = found.touch_events,
                actions = found.actions.len(),
                "recording decoded"
            );
            return DecodeResult {
                success: true,
                converted_actions: found.actions.len(),
                actions: found.actions,
                name: found.name,
                resolution: found.resolution,
                total_events: found.total_events,
                touch_events: found.touch_events,
                error_message: None,
                schema: Some(*schema),
            };
        }

        let d = diagnostic.unwrap_or_default();
        let message = format!(
            "No usable actions found (total events: {}, touch events: {})",
            d.total_events, d.touch_events
        );
        warn!(%message, "recording decode failed");
        DecodeResult {
            name: d.name,
            resolution: d.resolution,
            total_events: d.total_events,
            touch_events: d.touch_events,
            ..DecodeResult::failure(message)
        }
    }

    /// Read and decode a file. I/O errors become a failed result.
    pub fn decode_file(&self, path: impl AsRef<Path>) -> DecodeResult {
        let path = path.as_ref();
        match fs::read(path) {
            Ok(bytes) => self.decode(&bytes),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read recording");
                DecodeResult::failure(format!("Cannot read {}: {}", path.display(), e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"actions":[
        {"type":"touch","data":"press_rel:(0.5,0.5)","timing":0,"extra1":"0"},
        {"type":"touch","data":"release","timing":100,"extra1":"0"}]}"#;

    #[test]
    fn garbage_fails_with_zero_counts() {
        let r = Decoder::default().decode(b"\x00\x01 not a recording \xff");
        assert!(!r.success);
        assert_eq!(r.total_events, 0);
        assert_eq!(r.converted_actions, 0);
        assert!(r.actions.is_empty());
        assert!(!r.error_message.unwrap_or_default().is_empty());
    }

    #[test]
    fn empty_input_fails() {
        let r = Decoder::default().decode(b"");
        assert!(!r.success);
        assert_eq!(r.total_events, 0);
        assert!(r.error_message.is_some());
    }

    #[test]
    fn single_tap_short_side() {
        let r = Decoder::default().decode(SAMPLE.as_bytes());
        assert!(r.success);
        assert_eq!(r.schema, Some(Schema::Fixed));
        assert_eq!(r.actions, vec![Action::tap(540, 540)]);
        assert_eq!((r.total_events, r.touch_events, r.converted_actions), (2, 2, 1));
    }

    #[test]
    fn single_tap_per_axis() {
        let config = DecoderConfig::default().with_space(CoordinateSpace::PerAxis);
        let r = Decoder::new(config).decode(SAMPLE.as_bytes());
        assert_eq!(r.actions, vec![Action::tap(960, 540)]);
    }

    #[test]
    fn failure_reports_recognized_counts() {
        let r = Decoder::default()
            .decode(br#"{"actions":[{"type":"key","data":"a","timing":3},{"type":"touch","data":"??"}]}"#);
        assert!(!r.success);
        assert_eq!(r.total_events, 2);
        assert_eq!(r.touch_events, 1);
        let msg = r.error_message.unwrap();
        assert!(msg.contains("total events: 2"));
        assert!(msg.contains("touch events: 1"));
    }

    #[test]
    fn failure_counts_come_from_first_recognizing_schema() {
        // The fixed layout sees no touch records; the generic log parser sees one.
        let r = Decoder::default().decode(br#"{"actions":[{"type":"down","x":1,"y":1}]}"#);
        assert!(!r.success);
        assert_eq!((r.total_events, r.touch_events), (1, 0));
    }

    #[test]
    fn into_macro_prefers_recording_name() {
        let r = Decoder::default().decode(
            br#"{"name":"farm","actions":[{"type":"touch","data":"press_rel:(0.1,0.1)","timing":0},{"type":"touch","data":"release","timing":5}]}"#,
        );
        let m = r.into_macro("fallback").unwrap();
        assert_eq!(m.name(), "farm");
        assert_eq!(m.len(), 1);

        assert!(DecodeResult::default().into_macro("x").is_none());
    }

    #[test]
    fn missing_file_is_a_failed_result() {
        let r = Decoder::default().decode_file("/definitely/not/here.mmor");
        assert!(!r.success);
        assert!(r.error_message.unwrap().contains("Cannot read"));
    }
}
