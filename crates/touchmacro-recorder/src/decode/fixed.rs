//! Known recorder layout: `{"actions": [{type, data, timing, extra1}, ...]}`
//!
//! `timing` is the delta since the previous record. Touch records carry
//! `press_rel:(X,Y)`, `move_rel:(X,Y)` or `release` in `data` and the pointer
//! id in `extra1`.

use super::synth::{synthesize, TouchEvent, TouchKind};
use super::value::{as_f64, name, resolution};
use super::{Attempt, DecoderConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

static PRESS_REL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"press_rel:\(([\d.]+),([\d.]+)\)").expect("valid press regex"));
static MOVE_REL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"move_rel:\(([\d.]+),([\d.]+)\)").expect("valid move regex"));

pub(crate) fn parse(content: &str, config: &DecoderConfig) -> Option<Attempt> {
    let root: Value = serde_json::from_str(content.trim()).ok()?;
    let root = root.as_object()?;
    let records = root.get("actions")?.as_array()?;

    let mut events = Vec::new();
    let mut touch_events = 0;
    let mut clock: i64 = 0;

    for record in records {
        let Some(record) = record.as_object() else {
            continue;
        };
        clock = clock.saturating_add(record.get("timing").and_then(as_f64).unwrap_or(0.0) as i64);

        if record.get("type").and_then(Value::as_str) != Some("touch") {
            continue;
        }
        touch_events += 1;

        let data = record.get("data").and_then(Value::as_str).unwrap_or("");
        let pointer_id = record.get("extra1").and_then(pointer).unwrap_or(0);
        match parse_touch(data, pointer_id, clock) {
            Some(event) => events.push(event),
            None => debug!(data, "unrecognized touch record"),
        }
    }

    Some(Attempt {
        actions: synthesize(&events, config),
        name: name(root),
        resolution: resolution(root),
        total_events: records.len(),
        touch_events,
    })
}

/// Pointer id from `extra1`; anything but a plain integer means pointer 0.
fn pointer(v: &Value) -> Option<i32> {
    match v {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_touch(data: &str, pointer_id: i32, time_ms: i64) -> Option<TouchEvent> {
    let event = |kind, rel_x, rel_y| TouchEvent {
        kind,
        pointer_id,
        rel_x,
        rel_y,
        time_ms,
    };
    if data.trim() == "release" {
        return Some(event(TouchKind::Release, 0.0, 0.0));
    }
    for (re, kind) in [(&PRESS_REL, TouchKind::Press), (&MOVE_REL, TouchKind::Move)] {
        if let Some(caps) = re.captures(data) {
            let x = caps[1].parse().ok()?;
            let y = caps[2].parse().ok()?;
            return Some(event(kind, x, y));
        }
    }
    None
}
