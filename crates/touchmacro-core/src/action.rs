//! Touch actions and their canonical text form
//!
//! Syntax (keyword is case-insensitive, one action per line):
//!   tap,100,200                - tap at (100, 200)
//!   swipe,0,0,100,100,300      - straight swipe over 300ms
//!   delay,500                  - wait 500ms

use crate::error::{Error, Result};
use crate::gesture::{Gesture, Point};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Tap {
        x: i32,
        y: i32,
    },
    Swipe {
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        duration_ms: u64,
    },
    Delay {
        delay_ms: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Tap,
    Swipe,
    Delay,
}

impl Action {
    pub fn tap(x: i32, y: i32) -> Self {
        Self::Tap { x, y }
    }

    pub fn swipe(start_x: i32, start_y: i32, end_x: i32, end_y: i32, duration_ms: u64) -> Self {
        Self::Swipe {
            start_x,
            start_y,
            end_x,
            end_y,
            duration_ms,
        }
    }

    pub fn delay(delay_ms: u64) -> Self {
        Self::Delay { delay_ms }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Tap { .. } => ActionKind::Tap,
            Self::Swipe { .. } => ActionKind::Swipe,
            Self::Delay { .. } => ActionKind::Delay,
        }
    }

    pub fn is_delay(&self) -> bool {
        matches!(self, Self::Delay { .. })
    }

    /// Parse one line. Unknown keywords, missing fields and non-numeric
    /// tokens yield `None`; fields past the last expected one are ignored.
    pub fn parse(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.trim().split(',').map(str::trim).collect();
        let keyword = parts.first()?.to_ascii_lowercase();

        match keyword.as_str() {
            "tap" if parts.len() >= 3 => Some(Self::Tap {
                x: parts[1].parse().ok()?,
                y: parts[2].parse().ok()?,
            }),
            "swipe" if parts.len() >= 6 => Some(Self::Swipe {
                start_x: parts[1].parse().ok()?,
                start_y: parts[2].parse().ok()?,
                end_x: parts[3].parse().ok()?,
                end_y: parts[4].parse().ok()?,
                duration_ms: parts[5].parse().ok()?,
            }),
            "delay" if parts.len() >= 2 => Some(Self::Delay {
                delay_ms: parts[1].parse().ok()?,
            }),
            _ => None,
        }
    }

    /// Gesture performed for this action; `Delay` performs none.
    pub fn gesture(&self, tap_duration_ms: u64) -> Option<Gesture> {
        match *self {
            Self::Tap { x, y } => Some(Gesture::tap(x, y, tap_duration_ms)),
            Self::Swipe {
                start_x,
                start_y,
                end_x,
                end_y,
                duration_ms,
            } => Some(Gesture::swipe(
                Point::new(start_x, start_y),
                Point::new(end_x, end_y),
                duration_ms,
            )),
            Self::Delay { .. } => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tap { x, y } => write!(f, "tap,{},{}", x, y),
            Self::Swipe {
                start_x,
                start_y,
                end_x,
                end_y,
                duration_ms,
            } => write!(
                f,
                "swipe,{},{},{},{},{}",
                start_x, start_y, end_x, end_y, duration_ms
            ),
            Self::Delay { delay_ms } => write!(f, "delay,{}", delay_ms),
        }
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::invalid_command(s.trim(), &reject_reason(s)))
    }
}

fn reject_reason(line: &str) -> String {
    let parts: Vec<&str> = line.trim().split(',').map(str::trim).collect();
    let keyword = parts.first().map(|k| k.to_ascii_lowercase()).unwrap_or_default();
    let expected = match keyword.as_str() {
        "tap" => 3,
        "swipe" => 6,
        "delay" => 2,
        "" => return "empty line".to_string(),
        other => return format!("unknown action '{}'", other),
    };
    if parts.len() < expected {
        format!("'{}' expects {} values, got {}", keyword, expected - 1, parts.len() - 1)
    } else {
        format!("'{}' has a non-numeric value", keyword)
    }
}

/// Parse a multi-line macro body, silently dropping lines that do not parse.
pub fn parse_actions(text: &str) -> Vec<Action> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(Action::parse)
        .collect()
}

/// Canonical text: one action per line, no trailing newline.
pub fn serialize_actions(actions: &[Action]) -> String {
    actions
        .iter()
        .map(Action::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// A line `parse_actions` would drop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedLine {
    /// 1-based
    pub line: usize,
    pub text: String,
    pub reason: String,
}

/// Report the lines of a macro body that would be dropped on parse.
pub fn validate_commands(text: &str) -> Vec<RejectedLine> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(i, line)| match line.parse::<Action>() {
            Ok(_) => None,
            Err(e) => Some(RejectedLine {
                line: i + 1,
                text: line.trim().to_string(),
                reason: e.message,
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tap() {
        assert_eq!(Action::parse("tap,100,200"), Some(Action::tap(100, 200)));
    }

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        assert_eq!(Action::parse("  TAP , 1 , 2 "), Some(Action::tap(1, 2)));
        assert_eq!(Action::parse("Delay,50"), Some(Action::delay(50)));
        assert_eq!(
            Action::parse("SwIpE,1,2,3,4,5"),
            Some(Action::swipe(1, 2, 3, 4, 5))
        );
    }

    #[test]
    fn parse_rejects_bad_lines() {
        assert_eq!(Action::parse("tap,1"), None);
        assert_eq!(Action::parse("tap,a,2"), None);
        assert_eq!(Action::parse("swipe,1,2,3,4"), None);
        assert_eq!(Action::parse("delay"), None);
        assert_eq!(Action::parse("delay,-5"), None);
        assert_eq!(Action::parse("pinch,1,2"), None);
        assert_eq!(Action::parse(""), None);
    }

    #[test]
    fn parse_ignores_extra_fields() {
        assert_eq!(Action::parse("tap,1,2,3"), Some(Action::tap(1, 2)));
    }

    #[test]
    fn display_matches_grammar() {
        assert_eq!(Action::tap(-3, 7).to_string(), "tap,-3,7");
        assert_eq!(Action::swipe(0, 0, 100, 100, 300).to_string(), "swipe,0,0,100,100,300");
        assert_eq!(Action::delay(500).to_string(), "delay,500");
    }

    #[test]
    fn three_line_macro_round_trips() {
        let text = "tap,100,200\ndelay,500\nswipe,0,0,100,100,300";
        let actions = parse_actions(text);
        assert_eq!(
            actions,
            vec![
                Action::tap(100, 200),
                Action::delay(500),
                Action::swipe(0, 0, 100, 100, 300),
            ]
        );
        assert_eq!(serialize_actions(&actions), text);
    }

    #[test]
    fn parse_actions_drops_garbage_lines() {
        let actions = parse_actions("tap,1,2\n\nnonsense\n  delay,10  \ntap,x,y\n");
        assert_eq!(actions, vec![Action::tap(1, 2), Action::delay(10)]);
    }

    #[test]
    fn from_str_explains_rejection() {
        let err = "swipe,1,2".parse::<Action>().unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::InvalidCommand);
        assert!(err.message.contains("expects 5 values"));

        let err = "zoom,1".parse::<Action>().unwrap_err();
        assert!(err.message.contains("unknown action 'zoom'"));
    }

    #[test]
    fn validate_reports_line_numbers() {
        let rejected = validate_commands("tap,1,2\nbogus\n\ndelay,x");
        let lines: Vec<usize> = rejected.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![2, 4]);
    }

    #[test]
    fn gesture_mapping() {
        let g = Action::tap(5, 6).gesture(100).unwrap();
        assert!(g.is_tap());
        assert_eq!(g.duration_ms, 100);

        let g = Action::swipe(1, 2, 3, 4, 250).gesture(100).unwrap();
        assert_eq!(g.points, vec![Point::new(1, 2), Point::new(3, 4)]);
        assert_eq!(g.duration_ms, 250);

        assert!(Action::delay(10).gesture(100).is_none());
    }
}
