//! Human-readable progress log.
//!
//! Append-style markdown, one section per turn. The log is the narrative
//! counterpart of the structured snapshot: it is written for people and
//! never read back by the controller.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::Result;

/// Markdown log of a loop's run.
#[derive(Debug, Clone)]
pub struct ProgressLog {
    path: PathBuf,
}

impl ProgressLog {
    /// Create a handle on a progress file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the file header. A resumed loop keeps its existing log and
    /// appends to it.
    pub fn begin(&self, title: &str, task: &str) -> Result<()> {
        if self.path.exists() {
            self.append("resumed", "Loop resumed from persisted state.")?;
            return Ok(());
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let header = format!(
            "# {}\n\nStarted: {}\n\n## Task\n\n{}\n",
            title,
            timestamp(),
            task
        );
        fs::write(&self.path, header)?;
        Ok(())
    }

    /// Append one timestamped section.
    pub fn append(&self, heading: &str, body: &str) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        write!(file, "\n## {} - {}\n\n{}\n", timestamp(), heading, body)?;
        Ok(())
    }
}

fn timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
