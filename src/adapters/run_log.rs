//! Tab-delimited run log writer.
//!
//! One file per triggered run, named after the run's start time:
//!
//! ```text
//!   <log_dir>/2024-03-01_09-00-00.txt
//!   0.00	1.00	181.20	-150.00	211.20	181.20
//!   0.02	1.00	181.70	-150.00	211.70	181.70
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::debug;

use crate::app::ports::RunLogSink;
use crate::app::record::LogSample;
use crate::error::RunLogError;

/// `strftime` pattern for run log file names.
pub const FILE_NAME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Writes run logs into a directory.
pub struct TsvRunLog {
    dir: PathBuf,
}

impl TsvRunLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the log for a run started at `started` is written to.
    pub fn path_for(&self, started: NaiveDateTime) -> PathBuf {
        self.dir
            .join(format!("{}.txt", started.format(FILE_NAME_FORMAT)))
    }
}

impl RunLogSink for TsvRunLog {
    fn write_run(
        &mut self,
        started: NaiveDateTime,
        samples: &[LogSample],
    ) -> Result<PathBuf, RunLogError> {
        let path = self.path_for(started);
        let io_err = |source| RunLogError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let mut out = BufWriter::new(File::create(&path).map_err(io_err)?);
        for sample in samples {
            writeln!(out, "{}", sample.to_row()).map_err(io_err)?;
        }
        out.flush().map_err(io_err)?;
        debug!("RunLog: {} rows written to {}", samples.len(), path.display());
        Ok(path)
    }
}
