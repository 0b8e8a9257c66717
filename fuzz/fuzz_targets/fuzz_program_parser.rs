//! Fuzz target: `parse_program` (time-program files)
//!
//! Feeds arbitrary bytes as a program file and checks that parsing never
//! panics and that an accepted program is non-empty and finite.
//!
//! cargo fuzz run fuzz_program_parser

#![no_main]

use std::io::Cursor;

use gcflow::control::flow::TimeProgram;
use gcflow::control::program::parse_program;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(program) = parse_program(Cursor::new(data)) else {
        return;
    };
    assert!(!program.is_empty());
    assert!(program.iter().all(|v| v.is_finite()));

    // Any accepted program must drive a time program without panicking.
    let p = TimeProgram::new(program.clone(), 60.0);
    let last = program[program.len() - 1];
    assert_eq!(p.flow_at(f64::MAX), last);
    assert_eq!(p.flow_at(-1.0), program[0]);
});
