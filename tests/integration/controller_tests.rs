//! Integration tests for the run lifecycle: start, trigger wait, tick,
//! time limit and stop.
//!
//! These run on the host against [`MockDevice`] and a simulated clock;
//! no acquisition unit is required.

use crate::mock_device::{DeviceCall, MockDevice, rig, rig_with, test_config};

use gcflow::app::controller::StartOutcome;
use gcflow::app::events::AppEvent;
use gcflow::app::ports::ClockPort;
use gcflow::control::flow::{ControlMode, FlowStrategy, TempProgram};
use gcflow::error::RunLogError;
use gcflow::fsm::RunPhase;

// ── Construction ──────────────────────────────────────────────

#[test]
fn new_controller_is_idle_in_manual_mode() {
    let r = rig();
    assert_eq!(r.ctl.mode(), ControlMode::Manual);
    assert!(!r.ctl.is_running());
    assert!(!r.ctl.triggered_start());
    assert_eq!(r.ctl.phase(), RunPhase::Idle);
    assert_eq!(r.ctl.current_flow_rate(), 1.0);
    assert!(r.ctl.is_scheduled(), "tick should be registered on construction");
    assert_eq!(r.ctl.tick_count(), 1, "one tick fires immediately");
    assert_eq!(r.ctl.temperature(0), Some(25.0));
}

#[test]
fn idle_ticks_refresh_temperatures_without_writing_flow() {
    let mut r = rig();
    r.device().set_temperature(3, 200.0);
    r.run_ticks(3);
    assert_eq!(r.ctl.tick_count(), 4);
    assert_eq!(r.ctl.temperature(3), Some(200.0));
    assert_eq!(r.ctl.device().flow_writes(), 0);
}

// ── Manual runs ───────────────────────────────────────────────

#[test]
fn manual_run_writes_scaled_flow_every_tick() {
    let mut r = rig();
    r.ctl.set_flow_rate(25.0); // rejected, above limit
    r.ctl.set_flow_rate(5.0);

    assert_eq!(r.ctl.start(false, true), StartOutcome::Started);
    assert!(r.ctl.is_running());
    assert_eq!(r.ctl.current_flow_rate(), 5.0);
    assert_eq!(r.ctl.device().last_flow_volts(), Some(1.25));

    r.run_ticks(3);
    assert_eq!(r.ctl.device().flow_writes(), 4);
    assert_eq!(r.ctl.log_len(), 0, "untriggered runs are not logged");
}

#[test]
fn untriggered_run_ignores_time_limit() {
    let mut r = rig();
    r.ctl.set_max_duration(60.0);
    r.ctl.start(false, true);
    r.run_ticks(120);
    assert!(r.ctl.is_running());

    assert!(r.ctl.stop_run().unwrap().is_none());
    assert_eq!(r.runs.count(), 0, "untriggered runs are never flushed");
}

// ── Trigger wait ──────────────────────────────────────────────

#[test]
fn triggered_start_blocks_until_trigger_reads_low() {
    let mut r = rig();
    let clock = r.clock.clone();
    r.device().arm_trigger(4);
    r.device().advance_clock_per_poll(clock, 0.5);

    assert_eq!(r.ctl.start(true, true), StartOutcome::Started);

    assert_eq!(r.ctl.device().trigger_polls, 5);
    assert!(r.ctl.is_running());
    assert!(r.ctl.triggered_start());
    assert_eq!(r.clock.now_secs(), 2.5);
    assert_eq!(r.ctl.elapsed_secs(), 0.0, "trigger moment is t = 0");
    assert!(r.events.any(|e| matches!(e, AppEvent::TriggerReceived)));
    assert!(r.events.any(|e| matches!(
        e,
        AppEvent::StateChanged {
            from: RunPhase::Idle,
            to: RunPhase::WaitingForTrigger
        }
    )));
    assert!(r.events.any(|e| matches!(
        e,
        AppEvent::StateChanged {
            from: RunPhase::WaitingForTrigger,
            to: RunPhase::Running
        }
    )));
}

#[test]
fn cancelled_trigger_wait_leaves_controller_idle() {
    let mut r = rig();
    let handle = r.ctl.cancel_handle();
    r.device().cancel_on_poll(3, handle);

    assert_eq!(r.ctl.start(true, true), StartOutcome::Cancelled);
    assert_eq!(r.ctl.device().trigger_polls, 3);
    assert!(!r.ctl.is_running());
    assert!(!r.ctl.triggered_start());
    assert_eq!(r.ctl.phase(), RunPhase::Idle);
    assert!(r.events.any(|e| matches!(e, AppEvent::TriggerCancelled)));

    // The cancelled wait cleared the flag when it resolved.
    assert!(!r.ctl.cancel_handle().is_cancelled());
    r.device().clear_cancel();
    r.device().arm_trigger(0);
    assert_eq!(r.ctl.start(true, true), StartOutcome::Started);
    assert!(r.ctl.is_running());
}

#[test]
fn detached_device_runs_as_simulation() {
    let mut dev = MockDevice::new();
    dev.attached = false;
    let mut r = rig_with(test_config(), dev);

    r.ctl.set_mode(ControlMode::TempProgram);
    assert_eq!(r.ctl.start(true, true), StartOutcome::Started);
    assert_eq!(r.ctl.device().trigger_polls, 0, "no polling without a unit");
    assert_eq!(r.ctl.temperature(0), None);
    assert_eq!(r.ctl.current_flow_rate(), 15.0);

    r.run_ticks(2);
    assert!(r.ctl.is_running());
    assert_eq!(r.ctl.log_len(), 3);
}

// ── Logging and flush ─────────────────────────────────────────

#[test]
fn triggered_time_program_logs_every_tick_and_flushes_on_stop() {
    let mut r = rig();
    r.ctl.set_mode(ControlMode::TimeProgram);
    r.ctl.set_program(vec![1.0, 2.0, 3.0]);
    r.ctl.set_pulse_timing(1.0, 500.0);

    assert_eq!(r.ctl.start(true, true), StartOutcome::Started);
    assert_eq!(r.ctl.log_len(), 1, "start fires one tick immediately");
    assert!(r.ctl.device().has_call(&DeviceCall::Clock {
        divisor: 256,
        roll_value: 312_500
    }));
    assert!(r.ctl.device().has_call(&DeviceCall::Pwm { high_count: 156_250 }));

    r.run_ticks(90);
    assert_eq!(r.ctl.current_flow_rate(), 2.0);
    assert_eq!(r.ctl.device().last_flow_volts(), Some(0.5));
    assert_eq!(r.ctl.log_len(), 91);

    let path = r.ctl.stop_run().unwrap().expect("triggered run flushes");
    assert_eq!(path.to_str(), Some("2024-03-01_09-00-00.txt"));
    assert_eq!(r.ctl.log_len(), 0);

    let run = r.runs.last().unwrap();
    assert_eq!(run.samples.len(), 91);
    assert_eq!(run.samples[0].elapsed_minutes(), 0.0);
    assert_eq!(run.samples[90].elapsed_minutes(), 1.5);
    assert_eq!(run.samples[90].flow_rate(), 2.0);
    assert!(r.events.any(|e| matches!(e, AppEvent::LogFlushed { rows: 91, .. })));
}

#[test]
fn log_is_keyed_by_trigger_time() {
    let mut r = rig();
    let clock = r.clock.clone();
    r.device().arm_trigger(4);
    r.device().advance_clock_per_poll(clock, 0.5);

    r.ctl.start(true, true);
    r.run_ticks(1);
    r.ctl.stop_run().unwrap();

    let run = r.runs.last().unwrap();
    assert_eq!(
        run.started.format("%Y-%m-%d_%H-%M-%S").to_string(),
        "2024-03-01_09-00-02"
    );
}

#[test]
fn unavailable_channel_is_logged_as_nan() {
    let mut r = rig();
    r.device().fail_channel(2);
    r.ctl.start(true, true);
    r.run_ticks(1);
    r.ctl.stop_run().unwrap();

    let run = r.runs.last().unwrap();
    assert_eq!(run.samples[1].temperatures()[2], None);
    let row = run.samples[1].to_row();
    assert_eq!(row.split('\t').nth(4), Some("NaN"));
}

#[test]
fn log_flush_failure_is_reported_after_stopping() {
    let mut r = rig();
    r.runs.set_failing(true);
    r.ctl.start(true, true);
    r.run_ticks(2);

    let result = r.ctl.stop_run();
    assert!(matches!(result, Err(RunLogError::Io { .. })));
    assert!(!r.ctl.is_running(), "run is stopped even though the flush failed");
    assert_eq!(r.ctl.log_len(), 0);
    assert!(r.events.any(|e| matches!(e, AppEvent::LogFlushFailed { .. })));
}

// ── Time limit ────────────────────────────────────────────────

#[test]
fn time_exceeded_stops_run_and_writes_safe_flow() {
    let mut r = rig();
    r.ctl.set_mode(ControlMode::TimeProgram);
    r.ctl.set_program(vec![5.0]);
    r.ctl.set_max_duration(60.0);
    r.ctl.start(true, true);

    r.run_ticks(60);
    assert!(r.ctl.is_running(), "limit is exclusive");
    assert_eq!(r.ctl.current_flow_rate(), 5.0);

    r.run_ticks(1);
    assert!(!r.ctl.is_running());
    assert_eq!(r.ctl.current_flow_rate(), 1.0);
    assert_eq!(r.ctl.device().last_flow_volts(), Some(0.25));
    assert!(!r.ctl.oven_is_cooling(), "cooling disabled by default threshold");
    assert!(r.ctl.device().cooling_writes().is_empty());
    assert_eq!(r.runs.count(), 1);
    assert_eq!(r.runs.last().unwrap().samples.len(), 62);
    assert_eq!(
        r.events.count(|e| matches!(e, AppEvent::TimeExceeded { .. })),
        1
    );

    r.run_ticks(5);
    assert_eq!(r.runs.count(), 1, "stopped run is not flushed again");
}

// ── Stop ──────────────────────────────────────────────────────

#[test]
fn stop_all_is_idempotent() {
    let mut r = rig();
    r.ctl.start(true, true);
    r.run_ticks(5);

    assert!(r.ctl.stop_all().unwrap().is_some());
    let ticks = r.ctl.tick_count();
    assert!(!r.ctl.is_scheduled());

    assert!(r.ctl.stop_all().unwrap().is_none());
    assert_eq!(r.runs.count(), 1);
    assert!(!r.ctl.is_running());
    assert!(!r.ctl.is_scheduled());

    r.run_ticks(5);
    assert_eq!(r.ctl.tick_count(), ticks, "no ticks after stop_all");
}

#[test]
fn restart_rearms_the_tick_after_stop_all() {
    let mut r = rig();
    r.ctl.stop_all().unwrap();
    assert!(!r.ctl.is_scheduled());

    r.ctl.start(false, true);
    assert!(r.ctl.is_scheduled());
    let ticks = r.ctl.tick_count();
    r.run_ticks(2);
    assert_eq!(r.ctl.tick_count(), ticks + 2);
}

// ── Strategy handling ─────────────────────────────────────────

#[test]
fn temp_program_follows_channel_zero() {
    let mut r = rig();
    r.ctl.set_mode(ControlMode::TempProgram);
    r.device().set_temperature(0, 100.0);
    r.ctl.start(false, true);

    let expected = TempProgram::default().temp_to_flow(100.0);
    assert!((r.ctl.current_flow_rate() - expected).abs() < 1e-9);

    r.device().set_temperature(0, 60.0);
    r.run_ticks(1);
    assert_eq!(r.ctl.current_flow_rate(), 15.0);
}

#[test]
fn set_mode_installs_a_fresh_strategy() {
    let mut r = rig();
    r.ctl.set_mode(ControlMode::TimeProgram);
    r.ctl.set_program(vec![3.0]);
    r.ctl.set_time_interval(30.0);
    r.ctl.start(false, true);

    r.ctl.set_mode(ControlMode::TimeProgram);
    match r.ctl.strategy() {
        FlowStrategy::TimeProgram(p) => assert!(p.program().is_empty()),
        other => panic!("unexpected strategy {other:?}"),
    }
    assert_eq!(r.ctl.time_interval(), Some(60.0));
    assert!(r.ctl.is_running(), "mode change leaves the run alone");

    r.run_ticks(1);
    assert_eq!(r.ctl.current_flow_rate(), 1.0);

    r.ctl.set_mode(ControlMode::Manual);
    assert_eq!(r.ctl.time_interval(), None);
}

#[test]
fn generic_setters_are_noops_for_other_modes() {
    let mut r = rig();
    r.ctl.set_program(vec![9.0]);
    r.ctl.set_time_interval(5.0);
    assert_eq!(r.ctl.mode(), ControlMode::Manual);
    assert_eq!(r.ctl.time_interval(), None);

    r.ctl.set_mode(ControlMode::TempProgram);
    r.ctl.set_flow_rate(3.0);
    r.ctl.set_program(vec![9.0]);
    assert_eq!(r.ctl.mode(), ControlMode::TempProgram);
}

// ── Parameter setters ─────────────────────────────────────────

#[test]
fn pulse_timing_rejects_each_field_independently() {
    let mut r = rig();
    let t = r.ctl.pulse_timing();
    assert_eq!((t.period_secs(), t.width_ms()), (6.0, 300.0));

    r.ctl.set_pulse_timing(0.5, 2000.0);
    let t = r.ctl.pulse_timing();
    assert_eq!((t.period_secs(), t.width_ms()), (6.0, 300.0));

    r.ctl.set_pulse_timing(2.0, 250.0);
    let t = r.ctl.pulse_timing();
    assert_eq!((t.period_secs(), t.width_ms()), (2.0, 250.0));

    r.ctl.set_pulse_timing(25.0, 400.0);
    let t = r.ctl.pulse_timing();
    assert_eq!((t.period_secs(), t.width_ms()), (2.0, 400.0));
}

#[test]
fn cooling_threshold_window_is_exclusive() {
    let mut r = rig();
    assert_eq!(r.ctl.cooling_threshold(), Some(999.0));
    assert!(!r.ctl.cools_oven());

    r.ctl.set_cooling_threshold(100.0);
    assert!(r.ctl.cools_oven());
    assert_eq!(r.ctl.cooling_threshold(), Some(100.0));

    r.ctl.set_cooling_threshold(20.0);
    assert!(!r.ctl.cools_oven());
    r.ctl.set_cooling_threshold(250.0);
    assert!(!r.ctl.cools_oven());
    r.ctl.set_cooling_threshold(20.5);
    assert!(r.ctl.cools_oven());
}

#[test]
fn max_duration_rejects_non_positive_values() {
    let mut r = rig();
    assert_eq!(r.ctl.max_duration_secs(), 3000.0);
    r.ctl.set_max_duration(0.0);
    r.ctl.set_max_duration(f64::NAN);
    assert_eq!(r.ctl.max_duration_secs(), 3000.0);
    r.ctl.set_max_duration(90.0);
    assert_eq!(r.ctl.max_duration_secs(), 90.0);
}

#[test]
fn every_tick_emits_telemetry() {
    let mut r = rig();
    r.events.clear();
    r.run_ticks(4);
    assert_eq!(
        r.events.count(|e| matches!(e, AppEvent::Telemetry(_))),
        4
    );
}
