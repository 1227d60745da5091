use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::profiles::{ConnectionProfile, FileProfileStore, ProfileError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConnectorError {
    message: String,
}

impl ConnectorError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One node of the cluster as reported at connect time. Snapshotted once per
/// session, never auto-refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub name: String,
    pub namespaces: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub host: String,
    pub nickname: Option<String>,
    pub nodes: Vec<NodeInfo>,
    pub connected: bool,
}

impl Session {
    /// Namespaces across all nodes, deduplicated, in first-seen order.
    #[must_use]
    pub fn namespaces(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for node in &self.nodes {
            for ns in &node.namespaces {
                if !seen.contains(&ns.as_str()) {
                    seen.push(ns.as_str());
                }
            }
        }
        seen
    }
}

#[async_trait]
pub trait ClusterConnector {
    async fn connect(&self, profile: &ConnectionProfile) -> Result<(), ConnectorError>;
    async fn disconnect(&self) -> Result<(), ConnectorError>;
    async fn node_info(&self) -> Result<Vec<NodeInfo>, ConnectorError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected(Session),
    Failed(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error("cluster connector failed: {0}")]
    Connector(#[source] ConnectorError),
}

/// Owns the single active session. A second `connect` implicitly tears the
/// prior session down first; concurrent multi-cluster sessions are never
/// supported.
#[derive(Debug)]
pub struct SessionController<C: ClusterConnector> {
    connector: C,
    state: SessionState,
}

impl<C: ClusterConnector> SessionController<C> {
    #[must_use]
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            state: SessionState::Disconnected,
        }
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            SessionState::Connected(session) => Some(session),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session().is_some()
    }

    /// Establishes a session and, when `save_to` is given, appends the
    /// profile to the store on success.
    ///
    /// A nickname collision with the store is rejected before any remote
    /// call; an existing session stays untouched in that case. A profile
    /// persistence failure after the cluster link is up is returned for
    /// display but leaves the session Connected.
    pub async fn connect(
        &mut self,
        profile: ConnectionProfile,
        save_to: Option<&mut FileProfileStore>,
    ) -> Result<Duration, SessionError> {
        if let Some(store) = &save_to {
            if store.contains(&profile.nickname) {
                return Err(ProfileError::DuplicateNickname {
                    nickname: profile.nickname,
                }
                .into());
            }
        }

        if matches!(self.state, SessionState::Connected(_)) {
            if let Err(error) = self.connector.disconnect().await {
                warn!(%error, "implicit teardown of previous session failed");
            }
        }
        self.state = SessionState::Connecting;

        let started_at = Instant::now();
        if let Err(error) = self.connector.connect(&profile).await {
            self.state = SessionState::Failed(error.to_string());
            return Err(SessionError::Connector(error));
        }

        let nodes = match self.connector.node_info().await {
            Ok(nodes) => nodes,
            Err(error) => {
                // The link came up but the snapshot did not; close it so the
                // remote end is not left holding a half-opened session.
                if let Err(teardown) = self.connector.disconnect().await {
                    warn!(error = %teardown, "teardown after failed node snapshot failed");
                }
                self.state = SessionState::Failed(error.to_string());
                return Err(SessionError::Connector(error));
            }
        };
        let latency = started_at.elapsed();

        let session = Session {
            host: profile.hosts.clone(),
            nickname: (!profile.nickname.is_empty()).then(|| profile.nickname.clone()),
            nodes,
            connected: true,
        };
        self.state = SessionState::Connected(session);

        if let Some(store) = save_to {
            store.add(profile)?;
            store.persist()?;
        }

        Ok(latency)
    }

    /// Clears the session locally no matter what the remote teardown says;
    /// its error is returned for display only. Idempotent.
    pub async fn disconnect(&mut self) -> Result<(), SessionError> {
        let previous = std::mem::take(&mut self.state);
        if matches!(previous, SessionState::Connected(_)) {
            if let Err(error) = self.connector.disconnect().await {
                warn!(%error, "remote teardown failed, session cleared locally");
                return Err(SessionError::Connector(error));
            }
        }
        Ok(())
    }
}
