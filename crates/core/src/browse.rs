use async_trait::async_trait;
use thiserror::Error;

use crate::result_set::ResultSet;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DirectoryError {
    message: String,
}

impl DirectoryError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait SetDirectory {
    async fn sets(
        &self,
        host: &str,
        ns: &str,
        node: Option<&str>,
    ) -> Result<Vec<SetInfo>, DirectoryError>;
}

/// One set of the namespace. `objects` and `size_bytes` are informational
/// counters from the directory; `records` is populated lazily by the first
/// query or scan against this set.
#[derive(Debug, Clone, PartialEq)]
pub struct SetInfo {
    pub set: String,
    pub objects: u64,
    pub size_bytes: u64,
    pub records: Option<ResultSet>,
}

impl SetInfo {
    #[must_use]
    pub fn new(set: impl Into<String>, objects: u64, size_bytes: u64) -> Self {
        Self {
            set: set.into(),
            objects,
            size_bytes,
            records: None,
        }
    }
}

/// Immutable view of where a request originated: captured when the request
/// is issued, carried by its ticket, and applied back to the same slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BrowseContext {
    pub ns: String,
    pub set: String,
    pub set_index: usize,
}

#[derive(Debug, Error)]
pub enum BrowseError {
    #[error("set directory failed: {0}")]
    Directory(#[source] DirectoryError),
    #[error("set index {index} is out of range for {len} set(s)")]
    SetIndexOutOfRange { index: usize, len: usize },
}

/// State of one namespace-browsing screen. Rebuilt from the directory every
/// time a namespace is entered; never shared between screens.
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceBrowseState {
    ns: String,
    sets: Vec<SetInfo>,
    active_set_index: usize,
}

impl NamespaceBrowseState {
    #[must_use]
    pub fn from_sets(ns: impl Into<String>, sets: Vec<SetInfo>) -> Self {
        Self {
            ns: ns.into(),
            sets,
            active_set_index: 0,
        }
    }

    pub async fn enter<D: SetDirectory>(
        directory: &D,
        host: &str,
        ns: impl Into<String>,
        node: Option<&str>,
    ) -> Result<Self, BrowseError> {
        let ns = ns.into();
        let sets = directory
            .sets(host, &ns, node)
            .await
            .map_err(BrowseError::Directory)?;
        Ok(Self::from_sets(ns, sets))
    }

    #[must_use]
    pub fn ns(&self) -> &str {
        &self.ns
    }

    #[must_use]
    pub fn sets(&self) -> &[SetInfo] {
        &self.sets
    }

    #[must_use]
    pub fn active_set_index(&self) -> usize {
        self.active_set_index
    }

    #[must_use]
    pub fn active_set(&self) -> Option<&SetInfo> {
        self.sets.get(self.active_set_index)
    }

    pub fn select_set(&mut self, index: usize) -> Result<(), BrowseError> {
        if index >= self.sets.len() {
            return Err(BrowseError::SetIndexOutOfRange {
                index,
                len: self.sets.len(),
            });
        }
        self.active_set_index = index;
        Ok(())
    }

    /// Captures the browsing context of the active set at call time. `None`
    /// when the namespace has no sets to query.
    #[must_use]
    pub fn snapshot(&self) -> Option<BrowseContext> {
        self.active_set().map(|active| BrowseContext {
            ns: self.ns.clone(),
            set: active.set.clone(),
            set_index: self.active_set_index,
        })
    }

    /// Writes a completed result into the slot of the set it was issued
    /// for, addressed by name rather than by whatever is selected now.
    /// Returns false when that set is no longer part of this screen.
    pub fn attach_results(&mut self, set: &str, results: ResultSet) -> bool {
        match self.sets.iter_mut().find(|info| info.set == set) {
            Some(info) => {
                info.records = Some(results);
                true
            }
            None => false,
        }
    }
}
