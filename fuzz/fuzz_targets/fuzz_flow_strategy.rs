//! Fuzz target: `FlowStrategy::flow_rate`
//!
//! Decodes the input into a mode, setter calls and `(elapsed, temperature)`
//! pairs, then evaluates the strategy.
//!
//! Invariants checked:
//! - No panics for any elapsed time or temperature, including NaN and ±inf
//! - The mode never changes through setters
//! - Manual flow always stays within the configured limits
//!
//! cargo fuzz run fuzz_flow_strategy

#![no_main]

use gcflow::config::ControllerConfig;
use gcflow::control::flow::{ControlMode, FlowStrategy};
use libfuzzer_sys::fuzz_target;

fn take_f64(data: &mut &[u8]) -> Option<f64> {
    let (head, rest) = data.split_first_chunk::<8>()?;
    *data = rest;
    Some(f64::from_le_bytes(*head))
}

fuzz_target!(|data: &[u8]| {
    let Some((&mode_byte, mut rest)) = data.split_first() else {
        return;
    };
    let Some(mode) = ControlMode::from_index(mode_byte % 3) else {
        return;
    };
    let config = ControllerConfig::default();
    let mut strategy = FlowStrategy::configured(mode, &config);

    if let Some(flow) = take_f64(&mut rest) {
        strategy.set_flow_rate(flow);
    }
    if let Some(interval) = take_f64(&mut rest) {
        strategy.set_time_interval(interval);
    }
    let steps = rest.first().map_or(0, |n| usize::from(*n % 16));
    rest = rest.get(1..).unwrap_or_default();
    let mut program = Vec::with_capacity(steps);
    for _ in 0..steps {
        match take_f64(&mut rest) {
            Some(v) => program.push(v),
            None => break,
        }
    }
    strategy.set_program(program);
    assert_eq!(strategy.mode(), mode);

    while let (Some(elapsed), Some(temp)) = (take_f64(&mut rest), take_f64(&mut rest)) {
        let flow = strategy.flow_rate(elapsed, Some(temp));
        if mode == ControlMode::Manual {
            let (lo, hi) = config.flow_limits;
            assert!(flow >= lo && flow <= hi);
        }
        let _ = strategy.flow_rate(elapsed, None);
    }
});
