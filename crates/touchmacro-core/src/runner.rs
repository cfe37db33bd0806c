//! Single-threaded run loop hosting an [`Engine`]
//!
//! All engine state lives on one thread. Commands, gesture completions and
//! timer deadlines are multiplexed onto it through one crossbeam channel and a
//! deadline-ordered timer queue, so the engine itself needs no locking.

use crate::engine::{
    Engine, EngineConfig, EngineError, EngineListener, EngineState, Scheduler, Wakeup,
};
use crate::error::Result;
use crate::gesture::{DispatchError, Gesture, GestureDispatcher, Ticket};
use crate::macros::Macro;
pub use crossbeam_channel::{Receiver, Sender};
use crossbeam_channel::{unbounded, RecvTimeoutError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Engine signals as seen by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", content = "message", rename_all = "lowercase")]
pub enum Signal {
    Started,
    Finished,
    Error(EngineError),
}

enum LoopMsg {
    Start(Macro),
    Stop,
    Completed(Ticket, bool),
    Shutdown,
}

/// Handed to dispatchers so they can post completions back onto the loop.
#[derive(Clone)]
pub struct CompletionSink {
    tx: Sender<LoopMsg>,
}

impl CompletionSink {
    pub fn complete(&self, ticket: Ticket, ok: bool) {
        // Loop gone means nobody cares about this completion any more.
        let _ = self.tx.send(LoopMsg::Completed(ticket, ok));
    }
}

// ============================================================================
// Timer queue
// ============================================================================

struct Timer {
    deadline: Instant,
    seq: u64,
    wake: Wakeup,
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        (self.deadline, self.seq) == (other.deadline, other.seq)
    }
}

impl Eq for Timer {}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timer {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.deadline, self.seq).cmp(&(other.deadline, other.seq))
    }
}

/// Wall-clock [`Scheduler`]; timers with equal deadlines fire in schedule order.
#[derive(Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<Timer>>,
    seq: u64,
}

impl TimerQueue {
    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(t)| t.deadline)
    }

    pub fn pop_due(&mut self, now: Instant) -> Option<Wakeup> {
        if self.next_deadline()? > now {
            return None;
        }
        self.heap.pop().map(|Reverse(t)| t.wake)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl Scheduler for TimerQueue {
    fn schedule(&mut self, after: Duration, wake: Wakeup) {
        self.seq += 1;
        self.heap.push(Reverse(Timer {
            deadline: Instant::now() + after,
            seq: self.seq,
            wake,
        }));
    }

    fn cancel_all(&mut self) {
        self.heap.clear();
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Holds engine signals until the loop has published the state they describe.
struct ChannelListener {
    tx: Sender<Signal>,
    pending: Vec<Signal>,
}

impl ChannelListener {
    fn new(tx: Sender<Signal>) -> Self {
        Self {
            tx,
            pending: Vec::new(),
        }
    }

    fn flush(&mut self) {
        for signal in self.pending.drain(..) {
            let _ = self.tx.send(signal);
        }
    }
}

impl EngineListener for ChannelListener {
    fn on_started(&mut self) {
        self.pending.push(Signal::Started);
    }

    fn on_finished(&mut self) {
        self.pending.push(Signal::Finished);
    }

    fn on_error(&mut self, error: EngineError) {
        self.pending.push(Signal::Error(error));
    }
}

/// Owns the run-loop thread. Dropping it stops any run and joins the thread.
pub struct MacroRunner {
    tx: Sender<LoopMsg>,
    signals: Receiver<Signal>,
    state: Arc<Mutex<EngineState>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl MacroRunner {
    /// Spawn the loop. `make_dispatcher` runs on the loop thread and receives
    /// the sink its gestures must report completions through.
    pub fn spawn<D, F>(config: EngineConfig, make_dispatcher: F) -> Result<Self>
    where
        D: GestureDispatcher + 'static,
        F: FnOnce(CompletionSink) -> D + Send + 'static,
    {
        let (tx, rx) = unbounded::<LoopMsg>();
        let (signal_tx, signals) = unbounded::<Signal>();
        let state = Arc::new(Mutex::new(EngineState::Idle));

        let sink = CompletionSink { tx: tx.clone() };
        let loop_state = state.clone();
        let thread = thread::Builder::new()
            .name("touchmacro-runner".to_string())
            .spawn(move || {
                let dispatcher = make_dispatcher(sink);
                let engine = Engine::new(
                    dispatcher,
                    TimerQueue::default(),
                    ChannelListener::new(signal_tx),
                )
                .with_config(config);
                run_loop(engine, rx, loop_state);
            })?;

        Ok(Self {
            tx,
            signals,
            state,
            thread: Some(thread),
        })
    }

    /// Request a run. Rejections arrive as [`Signal::Error`].
    pub fn start(&self, macro_def: Macro) {
        let _ = self.tx.send(LoopMsg::Start(macro_def));
    }

    /// Stop the current run. A run that was active reports [`Signal::Finished`].
    pub fn stop(&self) {
        let _ = self.tx.send(LoopMsg::Stop);
    }

    pub fn signals(&self) -> &Receiver<Signal> {
        &self.signals
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Signal> {
        self.signals.recv_timeout(timeout).ok()
    }

    /// Snapshot of the engine state. It is written before any signal caused
    /// by the same event is sent, so after receiving [`Signal::Finished`]
    /// this reads `Idle` until the next start.
    pub fn state(&self) -> EngineState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state(), EngineState::Running { .. })
    }

    pub fn shutdown(mut self) {
        self.join();
    }

    fn join(&mut self) {
        let _ = self.tx.send(LoopMsg::Shutdown);
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

impl Drop for MacroRunner {
    fn drop(&mut self) {
        self.join();
    }
}

fn run_loop<D: GestureDispatcher>(
    mut engine: Engine<D, TimerQueue, ChannelListener>,
    rx: Receiver<LoopMsg>,
    state: Arc<Mutex<EngineState>>,
) {
    debug!("run loop started");
    loop {
        while let Some(wake) = engine.scheduler_mut().pop_due(Instant::now()) {
            engine.wake(wake);
        }
        publish(&mut engine, &state);

        let msg = match engine.scheduler().next_deadline() {
            Some(deadline) => match rx.recv_deadline(deadline) {
                Ok(msg) => msg,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(msg) => msg,
                Err(_) => break,
            },
        };

        match msg {
            LoopMsg::Start(macro_def) => {
                let _ = engine.start(Some(&macro_def));
            }
            LoopMsg::Stop => {
                let was_running = engine.is_running();
                engine.stop();
                if was_running {
                    engine.listener_mut().on_finished();
                }
            }
            LoopMsg::Completed(ticket, ok) => engine.gesture_completed(ticket, ok),
            LoopMsg::Shutdown => {
                engine.stop();
                break;
            }
        }
        publish(&mut engine, &state);
    }
    *state.lock() = EngineState::Idle;
    debug!("run loop exited");
}

fn publish<D: GestureDispatcher>(
    engine: &mut Engine<D, TimerQueue, ChannelListener>,
    state: &Mutex<EngineState>,
) {
    *state.lock() = engine.state();
    engine.listener_mut().flush();
}

// ============================================================================
// Dry-run dispatcher
// ============================================================================

/// Logs gestures instead of performing them.
pub struct DryRunDispatcher {
    sink: CompletionSink,
    realtime: bool,
}

impl DryRunDispatcher {
    /// Completes every gesture immediately.
    pub fn new(sink: CompletionSink) -> Self {
        Self {
            sink,
            realtime: false,
        }
    }

    /// Completes each gesture after its duration, like a real device would.
    pub fn realtime(mut self) -> Self {
        self.realtime = true;
        self
    }
}

impl GestureDispatcher for DryRunDispatcher {
    fn dispatch(
        &mut self,
        gesture: &Gesture,
        ticket: Ticket,
    ) -> std::result::Result<(), DispatchError> {
        info!(points = ?gesture.points, duration_ms = gesture.duration_ms, "dry-run gesture");
        if !self.realtime {
            self.sink.complete(ticket, true);
            return Ok(());
        }
        let sink = self.sink.clone();
        let duration = Duration::from_millis(gesture.duration_ms);
        thread::Builder::new()
            .name("touchmacro-dry-run".to_string())
            .spawn(move || {
                thread::sleep(duration);
                sink.complete(ticket, true);
            })?;
        Ok(())
    }
}
