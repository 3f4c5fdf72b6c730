//! Durable loop-state snapshots.
//!
//! The state file is the contract other tooling reads to show progress.
//! Writes go to a temp file first and land via rename, so a crash mid-write
//! never leaves a partial snapshot; the previous snapshot survives intact.

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;

use crate::domain::LoopState;
use crate::error::{Result, ShepherdError};

/// Extension used for in-flight writes; never read back.
const TMP_EXTENSION: &str = "json.tmp";

/// Write a snapshot atomically (write-temp-then-rename).
pub fn save(path: &Path, state: &LoopState) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension(TMP_EXTENSION);
    let json = serde_json::to_string_pretty(state)?;
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Load a snapshot, or None if the file does not exist.
pub fn load(path: &Path) -> Result<Option<LoopState>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let state: LoopState = serde_json::from_str(&content)?;
    Ok(Some(state))
}

/// Paths for a loop's files inside a state directory.
#[derive(Debug, Clone)]
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    /// Create a handle on a state directory (created lazily on first write).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshot path for a loop id.
    pub fn state_path(&self, loop_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", loop_id))
    }

    /// Progress-log path for a loop id.
    pub fn progress_path(&self, loop_id: &str) -> PathBuf {
        self.root.join(format!("{}.md", loop_id))
    }

    /// Load the snapshot for a loop id, or None if absent.
    pub fn load(&self, loop_id: &str) -> Result<Option<LoopState>> {
        load(&self.state_path(loop_id))
    }

    /// Enumerate every snapshot in the directory, newest first.
    ///
    /// Unparsable files are skipped with a warning rather than failing the
    /// whole scan; a snapshot from a newer version must not brick the list.
    pub fn scan(&self) -> Result<Vec<LoopState>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut states = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match load(&path) {
                Ok(Some(state)) => states.push(state),
                Ok(None) => {}
                Err(e) => warn!("skipping unreadable snapshot {}: {}", path.display(), e),
            }
        }

        states.sort_by_key(|s| match s {
            LoopState::Ralph(r) => std::cmp::Reverse(r.started_at),
            LoopState::Lisa(l) => std::cmp::Reverse(l.started_at),
        });
        Ok(states)
    }

    /// Find the most recent snapshot for a session, active or not.
    pub fn find_by_session(&self, session_id: &str) -> Result<Option<LoopState>> {
        Ok(self
            .scan()?
            .into_iter()
            .find(|s| s.session_id() == session_id))
    }

    /// Find the most recent still-active snapshot for a session, for resume.
    pub fn find_active(&self, session_id: &str) -> Result<LoopState> {
        self.scan()?
            .into_iter()
            .find(|s| s.session_id() == session_id && s.is_active())
            .ok_or_else(|| ShepherdError::LoopNotFound(session_id.to_string()))
    }
}
