//! Evidence gate for Ralph completions.
//!
//! When `require_evidence` is set, a declared completion is only trusted
//! after this predicate confirms the required artifacts exist in the
//! session's working directory.

use std::path::Path;

use async_trait::async_trait;
use glob::glob;

use crate::error::{Result, ShepherdError};

/// Predicate over the session working directory.
#[async_trait]
pub trait EvidenceChecker: Send + Sync {
    /// Check that the required artifacts exist under `dir`.
    async fn check(&self, dir: &Path) -> Result<bool>;
}

/// Evidence checker backed by glob patterns relative to the working
/// directory. Every pattern must match at least one file.
#[derive(Debug, Clone)]
pub struct GlobEvidence {
    patterns: Vec<String>,
}

impl GlobEvidence {
    /// Require at least one file match per pattern.
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }
}

impl Default for GlobEvidence {
    /// Anything saved under an `evidence/` folder counts.
    fn default() -> Self {
        Self {
            patterns: vec!["evidence/**/*".to_string()],
        }
    }
}

#[async_trait]
impl EvidenceChecker for GlobEvidence {
    async fn check(&self, dir: &Path) -> Result<bool> {
        for pattern in &self.patterns {
            let full = dir.join(pattern).to_string_lossy().into_owned();
            let entries = glob(&full).map_err(|e| ShepherdError::Evidence(e.to_string()))?;

            let mut found = false;
            for entry in entries {
                if let Ok(path) = entry
                    && path.is_file()
                {
                    found = true;
                    break;
                }
            }
            if !found {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
