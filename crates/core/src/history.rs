use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::profiles::{default_profiles_path, ProfileError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOutcome {
    Accepted,
    Rejected,
    Failed,
}

/// One executed (or rejected) query document. Only the text and its fate are
/// journaled, never result rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryRecord {
    pub timestamp_unix_ms: u128,
    pub ns: String,
    pub set: String,
    pub document: String,
    pub outcome: HistoryOutcome,
    #[serde(default)]
    pub detail: Option<String>,
}

#[must_use]
pub fn unix_timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to resolve default config path: {0}")]
    Config(#[from] ProfileError),
    #[error("invalid history path `{0}`")]
    InvalidPath(PathBuf),
    #[error("failed to create history directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize history record: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read history at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to append history record at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct FileQueryHistory {
    path: PathBuf,
}

impl FileQueryHistory {
    pub fn load_default() -> Result<Self, HistoryError> {
        Ok(Self {
            path: default_history_path()?,
        })
    }

    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
        let parent_dir = self
            .path
            .parent()
            .ok_or_else(|| HistoryError::InvalidPath(self.path.clone()))?;
        fs::create_dir_all(parent_dir).map_err(|source| HistoryError::CreateDir {
            path: parent_dir.to_path_buf(),
            source,
        })?;

        let rendered =
            serde_json::to_string(record).map_err(|source| HistoryError::Serialize { source })?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| HistoryError::Write {
                path: self.path.clone(),
                source,
            })?;
        writeln!(file, "{rendered}").map_err(|source| HistoryError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// The most recent `limit` records, oldest first. Unparseable lines are
    /// skipped so a damaged journal still renders.
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryRecord>, HistoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|source| HistoryError::Read {
            path: self.path.clone(),
            source,
        })?;

        let mut records = Vec::new();
        for line in content.lines().filter(|line| !line.trim().is_empty()) {
            match serde_json::from_str::<HistoryRecord>(line) {
                Ok(record) => records.push(record),
                Err(error) => {
                    warn!(path = %self.path.display(), %error, "skipping malformed history line");
                }
            }
        }
        let skip = records.len().saturating_sub(limit);
        Ok(records.split_off(skip))
    }
}

fn default_history_path() -> Result<PathBuf, HistoryError> {
    let profiles_path = default_profiles_path()?;
    let Some(config_dir) = profiles_path.parent() else {
        return Err(HistoryError::InvalidPath(profiles_path));
    };
    Ok(config_dir.join("history.ndjson"))
}
