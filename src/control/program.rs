//! Time-program file parsing.
//!
//! A program file holds one flow rate (L/min) per line; line `n` is the
//! target for the `n`-th interval of the run.  Blank lines are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::ProgramError;

/// Program applied when a requested file cannot be used.
pub const FALLBACK_PROGRAM: [f64; 1] = [1.0];

/// Parse flow values from any line-oriented reader.
pub fn parse_program<R: BufRead>(reader: R) -> Result<Vec<f64>, ProgramError> {
    let mut program = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        match text.parse::<f64>() {
            Ok(v) if v.is_finite() => program.push(v),
            _ => {
                return Err(ProgramError::InvalidLine {
                    line: idx + 1,
                    text: text.to_string(),
                });
            }
        }
    }
    if program.is_empty() {
        return Err(ProgramError::Empty);
    }
    Ok(program)
}

/// Read and parse a program file.
pub fn load_program(path: &Path) -> Result<Vec<f64>, ProgramError> {
    let file = File::open(path)?;
    parse_program(BufReader::new(file))
}
