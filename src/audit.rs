//! Append-only audit logs for scored completions.
//!
//! Every scored completion produces two lines: a full record carrying the
//! newline-flattened completion text, and a summary record without it. The
//! files are opened once per process with a startup timestamp in the name;
//! appends are sequential single writes, serialization across threads is
//! the host's responsibility.

use anyhow::Context;
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::reward::RewardRecord;

/// Relative directory the log pair lives under unless a caller picks
/// another one.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Paired full/summary audit log files.
#[derive(Debug)]
pub struct AuditLog {
    full: File,
    summary: File,
    full_path: PathBuf,
    summary_path: PathBuf,
}

impl AuditLog {
    /// Open a log pair under [`DEFAULT_LOG_DIR`] in the working directory.
    pub fn open_default() -> anyhow::Result<Self> {
        Self::open(Path::new(DEFAULT_LOG_DIR))
    }

    /// Open a log pair under `dir`, creating the directory if needed.
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let full_path = dir.join(format!("reward_full_{}.log", timestamp));
        let summary_path = dir.join(format!("reward_summary_{}.log", timestamp));

        let open = |path: &Path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open audit log {}", path.display()))
        };

        Ok(Self {
            full: open(&full_path)?,
            summary: open(&summary_path)?,
            full_path,
            summary_path,
        })
    }

    /// Append both audit lines for a scored completion.
    pub fn write(&self, record: &RewardRecord) -> anyhow::Result<()> {
        let prefix = Local::now().format("%Y-%m-%d %H:%M:%S");
        let summary_line = record.summary_line();
        let full_line = record.full_line();

        // &File is Write; the handle itself is never mutated.
        (&self.full)
            .write_all(format!("{} - {}\n", prefix, full_line).as_bytes())
            .with_context(|| format!("failed to append to {}", self.full_path.display()))?;
        (&self.summary)
            .write_all(format!("{} - {}\n", prefix, summary_line).as_bytes())
            .with_context(|| format!("failed to append to {}", self.summary_path.display()))?;
        Ok(())
    }

    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    pub fn summary_path(&self) -> &Path {
        &self.summary_path
    }
}
