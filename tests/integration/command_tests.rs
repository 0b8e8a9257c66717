//! Integration tests for the command surface used by the CLI.

use std::io::Write;

use crate::mock_device::{DeviceCall, MockDevice, rig, rig_with, test_config};

use gcflow::app::commands::AppCommand;
use gcflow::app::controller::StartOutcome;
use gcflow::app::events::AppEvent;
use gcflow::app::ports::PULSE_CHANNEL;
use gcflow::control::flow::{ControlMode, FlowStrategy};
use gcflow::error::{CommandError, ProgramError};

fn program_of(strategy: &FlowStrategy) -> Vec<f64> {
    match strategy {
        FlowStrategy::TimeProgram(p) => p.program().to_vec(),
        other => panic!("not a time program: {other:?}"),
    }
}

#[test]
fn load_program_applies_file_contents() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "1.5\n2.5\n\n4.0").unwrap();

    let mut r = rig();
    r.ctl.handle_command(AppCommand::SetMode(ControlMode::TimeProgram)).unwrap();
    r.ctl
        .handle_command(AppCommand::LoadProgram(file.path().to_path_buf()))
        .unwrap();
    assert_eq!(program_of(r.ctl.strategy()), vec![1.5, 2.5, 4.0]);
}

#[test]
fn missing_program_falls_back_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    let mut r = rig();
    r.ctl.set_mode(ControlMode::TimeProgram);
    r.ctl.set_program(vec![7.0, 8.0]);

    let err = r
        .ctl
        .handle_command(AppCommand::LoadProgram(dir.path().join("absent.txt")))
        .unwrap_err();
    assert!(matches!(err, CommandError::Program(ProgramError::Io(_))));
    assert_eq!(program_of(r.ctl.strategy()), vec![1.0]);
}

#[test]
fn malformed_program_falls_back_and_names_the_line() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "1.0\nfast\n3.0").unwrap();

    let mut r = rig();
    r.ctl.set_mode(ControlMode::TimeProgram);
    let err = r.ctl.load_program_file(file.path()).unwrap_err();
    assert!(matches!(err, ProgramError::InvalidLine { line: 2, .. }));
    assert_eq!(program_of(r.ctl.strategy()), vec![1.0]);
}

#[test]
fn pulse_commands_program_and_release_the_output() {
    let mut r = rig();
    r.ctl.handle_command(AppCommand::SetPulsePeriod(1.0)).unwrap();
    r.ctl.handle_command(AppCommand::SetPulseWidth(500.0)).unwrap();
    r.ctl.handle_command(AppCommand::StartPulse).unwrap();

    let dev = r.ctl.device();
    let clock_at = dev
        .calls
        .iter()
        .position(|c| *c == DeviceCall::Clock { divisor: 256, roll_value: 312_500 })
        .expect("clock configured");
    let pwm_at = dev
        .calls
        .iter()
        .position(|c| *c == DeviceCall::Pwm { high_count: 156_250 })
        .expect("pwm configured");
    assert!(clock_at < pwm_at, "clock must be programmed before PWM");

    r.ctl.handle_command(AppCommand::StopPulse).unwrap();
    let tail: Vec<_> = r.ctl.device().calls.iter().rev().take(2).cloned().collect();
    assert_eq!(
        tail,
        vec![
            DeviceCall::Digital { channel: PULSE_CHANNEL, state: false },
            DeviceCall::DisablePwm,
        ]
    );
    assert!(r.events.any(|e| matches!(e, AppEvent::PulseDisarmed)));
}

#[test]
fn manual_start_does_not_arm_the_pulse() {
    let mut r = rig();
    r.ctl
        .handle_command(AppCommand::Start { wait_for_trigger: true, reset_time: true })
        .unwrap();
    assert!(!r.ctl.device().calls.iter().any(|c| matches!(c, DeviceCall::Pwm { .. })));
}

#[test]
fn untriggered_programmed_start_does_not_arm_the_pulse() {
    let mut r = rig();
    r.ctl.set_mode(ControlMode::TempProgram);
    r.ctl.start(false, true);
    assert!(!r.ctl.device().calls.iter().any(|c| matches!(c, DeviceCall::Pwm { .. })));
}

#[test]
fn stop_commands_follow_run_semantics() {
    let mut r = rig();
    r.ctl.handle_command(AppCommand::SetRepeat(true)).unwrap();
    assert!(r.ctl.repeat_enabled());

    r.ctl
        .handle_command(AppCommand::Start { wait_for_trigger: true, reset_time: true })
        .unwrap();
    r.run_ticks(3);
    r.ctl.handle_command(AppCommand::StopRun).unwrap();
    assert!(!r.ctl.is_running());
    assert!(r.ctl.is_scheduled(), "StopRun keeps the tick alive");
    assert_eq!(r.runs.count(), 1);

    r.ctl.handle_command(AppCommand::StopAll).unwrap();
    assert!(!r.ctl.is_scheduled());
    assert_eq!(r.runs.count(), 1);
}

#[test]
fn parameter_commands_reach_the_controller() {
    let mut r = rig();
    r.ctl.handle_command(AppCommand::SetMode(ControlMode::TimeProgram)).unwrap();
    r.ctl.handle_command(AppCommand::SetProgram(vec![2.0, 4.0])).unwrap();
    r.ctl.handle_command(AppCommand::SetTimeInterval(10.0)).unwrap();
    r.ctl.handle_command(AppCommand::SetCoolingThreshold(120.0)).unwrap();
    r.ctl.handle_command(AppCommand::SetMaxDuration(300.0)).unwrap();

    assert_eq!(program_of(r.ctl.strategy()), vec![2.0, 4.0]);
    assert_eq!(r.ctl.time_interval(), Some(10.0));
    assert_eq!(r.ctl.cooling_threshold(), Some(120.0));
    assert!(r.ctl.cools_oven());
    assert_eq!(r.ctl.max_duration_secs(), 300.0);
    assert!(r.events.any(|e| *e == AppEvent::ModeChanged(ControlMode::TimeProgram)));

    r.ctl.handle_command(AppCommand::SetMode(ControlMode::Manual)).unwrap();
    r.ctl.handle_command(AppCommand::SetFlowRate(12.0)).unwrap();
    r.ctl.start(false, true);
    assert_eq!(r.ctl.current_flow_rate(), 12.0);
}

#[test]
fn queued_cancel_aborts_the_next_trigger_wait() {
    let mut r = rig();
    r.ctl.handle_command(AppCommand::CancelTrigger).unwrap();
    assert!(r.ctl.cancel_handle().is_cancelled());

    let err = r
        .ctl
        .handle_command(AppCommand::Start { wait_for_trigger: true, reset_time: true })
        .unwrap_err();
    assert!(matches!(err, CommandError::NotStarted(StartOutcome::Cancelled)));
    assert_eq!(r.ctl.device().trigger_polls, 0);
    assert!(!r.ctl.is_running());
    assert!(!r.ctl.cancel_handle().is_cancelled(), "flag is consumed by the wait");
    assert!(r.events.any(|e| matches!(e, AppEvent::TriggerCancelled)));

    assert_eq!(r.ctl.start(true, true), StartOutcome::Started);
}

#[test]
fn queued_cancel_also_aborts_a_detached_wait() {
    let mut dev = MockDevice::new();
    dev.attached = false;
    let mut r = rig_with(test_config(), dev);
    r.ctl.cancel_handle().cancel();

    assert_eq!(r.ctl.start(true, true), StartOutcome::Cancelled);
    assert_eq!(r.ctl.start(true, true), StartOutcome::Started);
}

#[test]
fn cancel_does_not_affect_an_immediate_start() {
    let mut r = rig();
    r.ctl.cancel_handle().cancel();
    assert_eq!(r.ctl.start(false, true), StartOutcome::Started);
    assert!(r.ctl.cancel_handle().is_cancelled(), "still queued for the next wait");
}
