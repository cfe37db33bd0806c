use std::time::{Duration, Instant};
use touchmacro_core::{
    Action, DryRunDispatcher, EngineConfig, EngineError, EngineState, Macro, MacroRunner,
    Signal,
};

const WAIT: Duration = Duration::from_secs(5);

fn dry_runner() -> MacroRunner {
    MacroRunner::spawn(EngineConfig::default(), DryRunDispatcher::new).unwrap()
}

#[test]
fn runs_macro_to_completion() {
    let runner = dry_runner();
    let m = Macro::with_id(
        "1",
        "quick",
        vec![Action::tap(1, 1), Action::delay(20), Action::swipe(0, 0, 5, 5, 10)],
    );

    let began = Instant::now();
    runner.start(m);
    assert_eq!(runner.recv_timeout(WAIT), Some(Signal::Started));
    assert_eq!(runner.recv_timeout(WAIT), Some(Signal::Finished));
    // two settle pauses plus the delay
    assert!(began.elapsed() >= Duration::from_millis(120));
    assert_eq!(runner.state(), EngineState::Idle);
    runner.shutdown();
}

#[test]
fn empty_macro_reports_error() {
    let runner = dry_runner();
    runner.start(Macro::with_id("2", "empty", vec![]));
    assert_eq!(
        runner.recv_timeout(WAIT),
        Some(Signal::Error(EngineError::EmptyMacro))
    );
    assert!(!runner.is_running());
}

#[test]
fn stop_during_delay_finishes_once() {
    let runner = dry_runner();
    runner.start(Macro::with_id(
        "3",
        "slow",
        vec![Action::delay(60_000), Action::tap(1, 1)],
    ));
    assert_eq!(runner.recv_timeout(WAIT), Some(Signal::Started));

    runner.stop();
    assert_eq!(runner.recv_timeout(WAIT), Some(Signal::Finished));
    assert_eq!(runner.recv_timeout(Duration::from_millis(200)), None);
    assert_eq!(runner.state(), EngineState::Idle);
}

#[test]
fn second_start_is_rejected_while_running() {
    let runner = dry_runner();
    let slow = Macro::with_id("4", "slow", vec![Action::delay(300)]);
    runner.start(slow.clone());
    runner.start(slow);

    assert_eq!(runner.recv_timeout(WAIT), Some(Signal::Started));
    assert_eq!(
        runner.recv_timeout(WAIT),
        Some(Signal::Error(EngineError::AlreadyRunning))
    );
    assert_eq!(runner.recv_timeout(WAIT), Some(Signal::Finished));
}

#[test]
fn stop_when_idle_is_silent() {
    let runner = dry_runner();
    runner.stop();
    assert_eq!(runner.recv_timeout(Duration::from_millis(100)), None);
}

#[test]
fn state_matches_every_signal() {
    let runner = dry_runner();
    let m = Macro::with_id("5", "tiny", vec![Action::tap(1, 1), Action::delay(1)]);
    for _ in 0..25 {
        runner.start(m.clone());
        assert_eq!(runner.recv_timeout(WAIT), Some(Signal::Started));
        assert_eq!(runner.recv_timeout(WAIT), Some(Signal::Finished));
        assert_eq!(runner.state(), EngineState::Idle);
    }

    runner.start(Macro::with_id("6", "slow", vec![Action::delay(60_000)]));
    assert_eq!(runner.recv_timeout(WAIT), Some(Signal::Started));
    assert_eq!(runner.state(), EngineState::Running { generation: 26, index: 0 });
    runner.stop();
    assert_eq!(runner.recv_timeout(WAIT), Some(Signal::Finished));
    assert!(!runner.is_running());
}
