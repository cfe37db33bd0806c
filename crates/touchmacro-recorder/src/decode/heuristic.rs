//! Generic event logs with tolerant field-name probing
//!
//! Accepts a bare array of records, or an object holding one under a common
//! key. Records may be high-level (`tap`, `swipe`, `delay`) or raw pointer
//! transitions (`down`/`move`/`up`, or the numeric codes 0/2/1).

use super::normalize::{to_pixels, CoordinateSpace};
use super::synth::{coalesce_delays, DelayClock};
use super::value::{name, probe_f64, resolution};
use super::{Attempt, DecoderConfig, DEFAULT_SWIPE_DURATION_MS};
use serde_json::{Map, Value};
use touchmacro_core::Action;
use tracing::debug;

const CONTAINER_KEYS: &[&str] = &["events", "records", "data", "actions", "items"];
const TIME_KEYS: &[&str] = &["time", "timestamp", "t", "ts"];
const TYPE_KEYS: &[&str] = &["type", "action", "eventType", "event"];
const X_KEYS: &[&str] = &["x", "screenX", "startX", "fromX"];
const Y_KEYS: &[&str] = &["y", "screenY", "startY", "fromY"];
const END_X_KEYS: &[&str] = &["endX", "toX", "x2"];
const END_Y_KEYS: &[&str] = &["endY", "toY", "y2"];
const DURATION_KEYS: &[&str] = &["duration", "durationMs", "dur"];
const DELAY_KEYS: &[&str] = &["delay", "delayMs", "ms", "wait", "duration"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Tap,
    Swipe,
    Delay,
    Down,
    Move,
    Up,
}

impl Kind {
    fn classify(record: &Map<String, Value>) -> Option<Self> {
        for key in TYPE_KEYS {
            let kind = match record.get(*key) {
                Some(Value::String(s)) => Self::from_name(s),
                Some(Value::Number(n)) => n.as_i64().and_then(Self::from_code),
                _ => None,
            };
            if kind.is_some() {
                return kind;
            }
        }
        None
    }

    fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tap" | "click" => Some(Self::Tap),
            "swipe" | "drag" | "fling" => Some(Self::Swipe),
            "delay" | "wait" | "sleep" | "pause" => Some(Self::Delay),
            "down" | "press" | "touch_down" => Some(Self::Down),
            "move" => Some(Self::Move),
            "up" | "release" | "touch_up" => Some(Self::Up),
            code => code.parse().ok().and_then(Self::from_code),
        }
    }

    fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Down),
            1 => Some(Self::Up),
            2 => Some(Self::Move),
            _ => None,
        }
    }
}

pub(crate) fn parse(content: &str, config: &DecoderConfig) -> Option<Attempt> {
    let root: Value = serde_json::from_str(content.trim()).ok()?;
    let (records, meta) = match &root {
        Value::Array(records) => (records, None),
        Value::Object(obj) => {
            let records = CONTAINER_KEYS
                .iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_array))?;
            (records, Some(obj))
        }
        _ => return None,
    };

    let mut walker = Walker::new(config);
    let mut touch_events = 0;
    for record in records.iter().filter_map(Value::as_object) {
        let Some(kind) = Kind::classify(record) else {
            continue;
        };
        if kind != Kind::Delay {
            touch_events += 1;
        }
        walker.record(kind, record);
    }

    Some(Attempt {
        actions: coalesce_delays(walker.actions, config.coalesce_threshold),
        name: meta.and_then(name),
        resolution: meta.and_then(resolution),
        total_events: records.len(),
        touch_events,
    })
}

struct Walker<'a> {
    config: &'a DecoderConfig,
    clock: DelayClock,
    last_point: Option<(i32, i32)>,
    actions: Vec<Action>,
}

impl<'a> Walker<'a> {
    fn new(config: &'a DecoderConfig) -> Self {
        Self {
            config,
            clock: DelayClock::new(config.min_delay_ms),
            last_point: None,
            actions: Vec::new(),
        }
    }

    fn record(&mut self, kind: Kind, record: &Map<String, Value>) {
        let time = probe_f64(record, TIME_KEYS).map(|t| t.round() as i64);
        let start = self.point(record, X_KEYS, Y_KEYS);

        match kind {
            Kind::Tap => match start {
                Some((x, y)) => self.emit(time, Action::tap(x, y)),
                None => debug!("tap without coordinates"),
            },
            Kind::Swipe => {
                let end = self.point(record, END_X_KEYS, END_Y_KEYS);
                let (Some((sx, sy)), Some((ex, ey))) = (start, end) else {
                    debug!("swipe without both endpoints");
                    return;
                };
                let duration = probe_f64(record, DURATION_KEYS)
                    .filter(|d| *d >= 0.0)
                    .map(|d| d as u64)
                    .unwrap_or(DEFAULT_SWIPE_DURATION_MS);
                self.emit(time, Action::swipe(sx, sy, ex, ey, duration));
            }
            Kind::Delay => match probe_f64(record, DELAY_KEYS).filter(|d| *d >= 0.0) {
                Some(ms) => {
                    self.actions.push(Action::delay(ms as u64));
                    self.clock.reset();
                }
                None => debug!("delay without a duration"),
            },
            Kind::Down | Kind::Move => {
                if start.is_some() {
                    self.last_point = start;
                }
            }
            Kind::Up => match start.or(self.last_point) {
                Some((x, y)) => {
                    self.emit(time, Action::tap(x, y));
                    self.last_point = None;
                }
                None => debug!("release with no known position"),
            },
        }
    }

    fn emit(&mut self, time: Option<i64>, action: Action) {
        if let Some(t) = time {
            self.actions.extend(self.clock.gesture_at(t));
        }
        self.actions.push(action);
    }

    /// Pixel point from a pair of coordinate fields. Pairs inside the unit
    /// square with a fractional part are taken as per-axis fractions.
    fn point(&self, record: &Map<String, Value>, xs: &[&str], ys: &[&str]) -> Option<(i32, i32)> {
        let x = probe_f64(record, xs)?;
        let y = probe_f64(record, ys)?;
        let unit = |v: f64| (0.0..=1.0).contains(&v);
        if unit(x) && unit(y) && (x.fract() != 0.0 || y.fract() != 0.0) {
            return Some(to_pixels(x, y, self.config.screen, CoordinateSpace::PerAxis));
        }
        Some((x as i32, y as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(content: &str) -> Attempt {
        parse(content, &DecoderConfig::default()).unwrap()
    }

    #[test]
    fn not_json_is_not_recognized() {
        assert!(parse("tap,1,2", &DecoderConfig::default()).is_none());
        assert!(parse(r#"{"foo": 1}"#, &DecoderConfig::default()).is_none());
        assert!(parse("42", &DecoderConfig::default()).is_none());
    }

    #[test]
    fn high_level_records() {
        let a = decode(
            r#"[{"type":"tap","x":10,"y":20},
                {"action":"wait","ms":250},
                {"eventType":"drag","fromX":1,"fromY":2,"toX":3,"toY":4},
                {"type":"fling","x":5,"y":6,"x2":7,"y2":8,"dur":90}]"#,
        );
        assert_eq!(
            a.actions,
            vec![
                Action::tap(10, 20),
                Action::delay(250),
                Action::swipe(1, 2, 3, 4, DEFAULT_SWIPE_DURATION_MS),
                Action::swipe(5, 6, 7, 8, 90),
            ]
        );
        assert_eq!(a.total_events, 4);
        assert_eq!(a.touch_events, 3);
    }

    #[test]
    fn records_under_container_key_with_metadata() {
        let a = decode(r#"{"name":"x","items":[{"type":"click","screenX":3,"screenY":4}]}"#);
        assert_eq!(a.actions, vec![Action::tap(3, 4)]);
        assert_eq!(a.name.as_deref(), Some("x"));
    }

    #[test]
    fn raw_pointer_codes_and_timestamps() {
        let a = decode(
            r#"{"events":[
                {"event":0,"x":100,"y":200,"ts":1000},
                {"event":2,"x":110,"y":210,"ts":1010},
                {"event":1,"ts":1020},
                {"type":"down","x":5,"y":5,"ts":1500},
                {"type":"up","x":6,"y":6,"ts":1520}
            ]}"#,
        );
        assert_eq!(
            a.actions,
            vec![Action::tap(110, 210), Action::delay(500), Action::tap(6, 6)]
        );
    }

    #[test]
    fn explicit_delay_resets_gap_clock() {
        let a = decode(
            r#"[{"type":"tap","x":1,"y":1,"time":0},
                {"type":"delay","delay":300},
                {"type":"tap","x":2,"y":2,"time":300}]"#,
        );
        assert_eq!(
            a.actions,
            vec![Action::tap(1, 1), Action::delay(300), Action::tap(2, 2)]
        );
    }

    #[test]
    fn fractional_unit_coordinates_are_relative() {
        let a = decode(r#"[{"type":"tap","x":0.5,"y":0.25}]"#);
        assert_eq!(a.actions, vec![Action::tap(960, 270)]);
        let a = decode(r#"[{"type":"tap","x":1,"y":0}]"#);
        assert_eq!(a.actions, vec![Action::tap(1, 0)]);
    }

    #[test]
    fn long_logs_coalesce_delays() {
        let mut records = Vec::new();
        for i in 0..60 {
            records.push(format!(r#"{{"type":"wait","ms":10}},{{"type":"wait","ms":{}}}"#, i));
            records.push(format!(r#"{{"type":"tap","x":{},"y":1}}"#, i));
        }
        let a = decode(&format!("[{}]", records.join(",")));
        assert_eq!(a.actions.len(), 120);
        let taps: Vec<_> = a.actions.iter().filter(|a| !a.is_delay()).collect();
        assert_eq!(taps.len(), 60);
        assert_eq!(a.actions[0], Action::delay(10));
        assert_eq!(a.actions[1], Action::tap(0, 1));
        assert_eq!(a.actions[2], Action::delay(11));
    }

    #[test]
    fn unknown_records_are_skipped() {
        let a = decode(r#"[{"type":"scroll"},{"nothing":true},3]"#);
        assert!(a.actions.is_empty());
        assert_eq!(a.total_events, 3);
        assert_eq!(a.touch_events, 0);
    }
}
