//! Line-oriented fallback: the action grammar plus metadata and comments
//!
//! ```text
//! # exported by hand
//! name: daily login
//! resolution: 1920x1080
//! tap,100,200
//! delay,500
//! ```

use super::{Attempt, DecoderConfig};
use touchmacro_core::Action;

pub(crate) fn parse(content: &str, _config: &DecoderConfig) -> Option<Attempt> {
    let mut attempt = Attempt::default();
    let mut has_metadata = false;

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        if let Some(value) = metadata(line, "name") {
            attempt.name = Some(value.to_string()).filter(|v| !v.is_empty());
            has_metadata = true;
            continue;
        }
        if let Some(value) = metadata(line, "resolution") {
            attempt.resolution = Some(value.to_string()).filter(|v| !v.is_empty());
            has_metadata = true;
            continue;
        }

        attempt.total_events += 1;
        if let Some(action) = Action::parse(line) {
            if !action.is_delay() {
                attempt.touch_events += 1;
            }
            attempt.actions.push(action);
        }
    }

    (has_metadata || !attempt.actions.is_empty()).then_some(attempt)
}

/// Value of a `key:` line, matched case-insensitively.
fn metadata<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let (k, v) = line.split_once(':')?;
    k.trim().eq_ignore_ascii_case(key).then(|| v.trim())
}
