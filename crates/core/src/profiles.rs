use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionProfile {
    pub nickname: String,
    pub hosts: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub port: u16,
}

impl ConnectionProfile {
    #[must_use]
    pub fn new(nickname: impl Into<String>, hosts: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            hosts: hosts.into(),
            username: None,
            password: None,
            port: DEFAULT_PORT,
        }
    }

    /// Individual seed hosts, split on commas with surrounding whitespace
    /// dropped.
    #[must_use]
    pub fn host_list(&self) -> Vec<&str> {
        self.hosts
            .split(',')
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .collect()
    }

    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("a profile named `{nickname}` already exists")]
    DuplicateNickname { nickname: String },
    #[error("config directory is unavailable for this platform")]
    ConfigDirUnavailable,
    #[error("failed to read profiles file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize profiles: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write profiles file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Connection profiles persisted as a single JSON array, in the order they
/// were saved. A missing, empty, or unreadable-as-JSON file loads as the
/// empty list so a damaged store never blocks the connection screen.
#[derive(Debug, Clone)]
pub struct FileProfileStore {
    path: PathBuf,
    profiles: Vec<ConnectionProfile>,
}

impl FileProfileStore {
    pub fn load_default() -> Result<Self, ProfileError> {
        let path = default_profiles_path()?;
        Self::load_from_path(path)
    }

    pub fn load_from_path(path: impl Into<PathBuf>) -> Result<Self, ProfileError> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                profiles: Vec::new(),
            });
        }

        let raw = fs::read_to_string(&path).map_err(|source| ProfileError::Read {
            path: path.clone(),
            source,
        })?;

        if raw.trim().is_empty() {
            return Ok(Self {
                path,
                profiles: Vec::new(),
            });
        }

        let profiles = match serde_json::from_str::<Vec<ConnectionProfile>>(&raw) {
            Ok(profiles) => profiles,
            Err(error) => {
                warn!(path = %path.display(), %error, "malformed profiles file, starting empty");
                Vec::new()
            }
        };

        Ok(Self { path, profiles })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn profiles(&self) -> &[ConnectionProfile] {
        &self.profiles
    }

    #[must_use]
    pub fn profile(&self, nickname: &str) -> Option<&ConnectionProfile> {
        self.profiles
            .iter()
            .find(|profile| profile.nickname == nickname)
    }

    #[must_use]
    pub fn contains(&self, nickname: &str) -> bool {
        self.profile(nickname).is_some()
    }

    /// Appends a profile. Nicknames are unique (case-sensitive exact match);
    /// a collision leaves the stored list untouched.
    pub fn add(&mut self, profile: ConnectionProfile) -> Result<(), ProfileError> {
        if self.contains(&profile.nickname) {
            return Err(ProfileError::DuplicateNickname {
                nickname: profile.nickname,
            });
        }
        self.profiles.push(profile);
        Ok(())
    }

    #[must_use]
    pub fn delete(&mut self, nickname: &str) -> bool {
        let original_len = self.profiles.len();
        self.profiles.retain(|profile| profile.nickname != nickname);
        self.profiles.len() != original_len
    }

    /// Rewrites the whole list through a temp file in the target directory,
    /// then renames over the store. Readers see either the old list or the
    /// new list, never a partial one.
    pub fn persist(&self) -> Result<(), ProfileError> {
        let parent_dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        fs::create_dir_all(&parent_dir).map_err(|source| ProfileError::Write {
            path: parent_dir.clone(),
            source,
        })?;

        let rendered = serde_json::to_string_pretty(&self.profiles)
            .map_err(|source| ProfileError::Serialize { source })?;

        let mut staged = NamedTempFile::new_in(&parent_dir).map_err(|source| ProfileError::Write {
            path: parent_dir.clone(),
            source,
        })?;
        staged
            .write_all(rendered.as_bytes())
            .map_err(|source| ProfileError::Write {
                path: self.path.clone(),
                source,
            })?;
        staged
            .persist(&self.path)
            .map_err(|error| ProfileError::Write {
                path: self.path.clone(),
                source: error.error,
            })?;
        Ok(())
    }
}

pub fn default_profiles_path() -> Result<PathBuf, ProfileError> {
    let base_dir = if let Some(custom) = env::var_os("SHRIKE_CONFIG_DIR") {
        PathBuf::from(custom)
    } else if cfg!(target_os = "windows") {
        env::var_os("APPDATA")
            .map(PathBuf::from)
            .ok_or(ProfileError::ConfigDirUnavailable)?
    } else if let Some(xdg_config_home) = env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config_home)
    } else {
        let home = env::var_os("HOME").ok_or(ProfileError::ConfigDirUnavailable)?;
        PathBuf::from(home).join(".config")
    };

    Ok(base_dir.join("shrike").join("profiles.json"))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::{ConnectionProfile, FileProfileStore, ProfileError};

    fn temp_profiles_path(temp_dir: &TempDir) -> PathBuf {
        temp_dir.path().join("profiles.json")
    }

    fn sample_profile(nickname: &str) -> ConnectionProfile {
        let mut profile = ConnectionProfile::new(nickname, "10.0.0.1:3000, 10.0.0.2:3000");
        profile.username = Some("admin".to_string());
        profile.password = Some("hunter2".to_string());
        profile
    }

    #[test]
    fn missing_profiles_file_loads_empty_store() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let store =
            FileProfileStore::load_from_path(temp_profiles_path(&temp_dir)).expect("load failed");
        assert!(store.profiles().is_empty());
    }

    #[test]
    fn malformed_profiles_file_loads_empty_store() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_profiles_path(&temp_dir);
        std::fs::write(&path, "not json at all").expect("seed write failed");

        let store = FileProfileStore::load_from_path(path).expect("load failed");
        assert!(store.profiles().is_empty());
    }

    #[test]
    fn add_persist_reload_and_delete_profile() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_profiles_path(&temp_dir);

        let mut store = FileProfileStore::load_from_path(&path).expect("load failed");
        let profile = sample_profile("prod");
        store.add(profile.clone()).expect("add failed");
        store.persist().expect("persist failed");

        let mut reloaded = FileProfileStore::load_from_path(&path).expect("reload failed");
        assert_eq!(reloaded.profile("prod"), Some(&profile));

        assert!(reloaded.delete("prod"));
        assert!(!reloaded.delete("prod"));
        reloaded.persist().expect("persist after delete failed");

        let reloaded = FileProfileStore::load_from_path(path).expect("final reload failed");
        assert!(reloaded.profiles().is_empty());
    }

    #[test]
    fn duplicate_nickname_is_rejected_and_first_entry_survives() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_profiles_path(&temp_dir);

        let mut store = FileProfileStore::load_from_path(&path).expect("load failed");
        store.add(sample_profile("prod")).expect("first add failed");

        let mut second = sample_profile("prod");
        second.hosts = "other-host:3200".to_string();
        let error = store.add(second).expect_err("second add should fail");
        assert!(matches!(
            error,
            ProfileError::DuplicateNickname { ref nickname } if nickname == "prod"
        ));

        store.persist().expect("persist failed");
        let reloaded = FileProfileStore::load_from_path(path).expect("reload failed");
        let matching: Vec<_> = reloaded
            .profiles()
            .iter()
            .filter(|profile| profile.nickname == "prod")
            .collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].hosts, "10.0.0.1:3000, 10.0.0.2:3000");
    }

    #[test]
    fn nickname_match_is_case_sensitive() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let mut store =
            FileProfileStore::load_from_path(temp_profiles_path(&temp_dir)).expect("load failed");

        store.add(sample_profile("prod")).expect("add failed");
        store.add(sample_profile("PROD")).expect("distinct-case add failed");
        assert_eq!(store.profiles().len(), 2);
    }

    #[test]
    fn list_preserves_insertion_order() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_profiles_path(&temp_dir);

        let mut store = FileProfileStore::load_from_path(&path).expect("load failed");
        for nickname in ["zeta", "alpha", "mid"] {
            store.add(sample_profile(nickname)).expect("add failed");
        }
        store.persist().expect("persist failed");

        let reloaded = FileProfileStore::load_from_path(path).expect("reload failed");
        let order: Vec<_> = reloaded
            .profiles()
            .iter()
            .map(|profile| profile.nickname.as_str())
            .collect();
        assert_eq!(order, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn host_list_splits_and_trims() {
        let profile = ConnectionProfile::new("local", " 127.0.0.1:3000 ,127.0.0.2:3000,, ");
        assert_eq!(profile.host_list(), vec!["127.0.0.1:3000", "127.0.0.2:3000"]);
    }
}
