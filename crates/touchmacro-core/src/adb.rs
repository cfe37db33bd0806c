//! Gesture dispatch through `adb shell input`
//!
//! Each gesture spawns one `adb` process. A waiter thread reports its exit
//! status back through the [`CompletionSink`]; a non-zero exit counts as a
//! cancelled gesture, which the engine treats like a completed one.

use crate::gesture::{DispatchError, Gesture, GestureDispatcher, Ticket};
use crate::runner::CompletionSink;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, warn};

pub struct AdbDispatcher {
    sink: CompletionSink,
    adb: PathBuf,
    serial: Option<String>,
}

impl AdbDispatcher {
    pub fn new(sink: CompletionSink) -> Self {
        Self {
            sink,
            adb: PathBuf::from("adb"),
            serial: None,
        }
    }

    /// Target a specific device (`adb -s <serial>`).
    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    /// Use an `adb` binary other than the one on `PATH`.
    pub fn with_adb_path(mut self, adb: impl Into<PathBuf>) -> Self {
        self.adb = adb.into();
        self
    }

    /// Check that `adb` runs and the target device answers.
    pub fn probe(adb: &Path, serial: Option<&str>) -> Result<(), DispatchError> {
        let mut cmd = Command::new(adb);
        if let Some(serial) = serial {
            cmd.arg("-s").arg(serial);
        }
        let out = cmd.arg("get-state").stdin(Stdio::null()).output()?;
        if out.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
        Err(DispatchError::Unavailable(if stderr.is_empty() {
            format!("adb get-state exited with {}", out.status)
        } else {
            stderr
        }))
    }

    /// Arguments after `adb [-s serial]` for one gesture.
    pub fn input_args(gesture: &Gesture) -> Result<Vec<String>, DispatchError> {
        let mut args = vec!["shell".to_string(), "input".to_string()];
        match gesture.points.as_slice() {
            [p] => {
                args.push("tap".to_string());
                args.push(p.x.to_string());
                args.push(p.y.to_string());
            }
            [start, .., end] => {
                args.push("swipe".to_string());
                args.extend(
                    [start.x, start.y, end.x, end.y]
                        .iter()
                        .map(ToString::to_string),
                );
                args.push(gesture.duration_ms.to_string());
            }
            [] => return Err(DispatchError::Rejected("gesture has no points".to_string())),
        }
        Ok(args)
    }

    fn command(&self, gesture: &Gesture) -> Result<Command, DispatchError> {
        let mut cmd = Command::new(&self.adb);
        if let Some(serial) = &self.serial {
            cmd.arg("-s").arg(serial);
        }
        cmd.args(Self::input_args(gesture)?)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        Ok(cmd)
    }
}

impl GestureDispatcher for AdbDispatcher {
    fn dispatch(&mut self, gesture: &Gesture, ticket: Ticket) -> Result<(), DispatchError> {
        let mut child = self.command(gesture)?.spawn()?;
        debug!(?ticket, pid = child.id(), "adb input spawned");

        let sink = self.sink.clone();
        thread::Builder::new()
            .name("touchmacro-adb".to_string())
            .spawn(move || {
                let ok = match child.wait() {
                    Ok(status) if status.success() => true,
                    Ok(status) => {
                        warn!(?ticket, %status, "adb input exited unsuccessfully");
                        false
                    }
                    Err(e) => {
                        warn!(?ticket, error = %e, "waiting for adb failed");
                        false
                    }
                };
                sink.complete(ticket, ok);
            })?;
        Ok(())
    }
}
