use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use shrike_core::browse::{DirectoryError, SetDirectory, SetInfo};
use shrike_core::dispatcher::{ExecutorError, QueryExecutor, QueryRequest};
use shrike_core::profiles::ConnectionProfile;
use shrike_core::result_set::Record;
use shrike_core::session::{ClusterConnector, ConnectorError, NodeInfo};

/// Client for the HTTP bridge in front of the cluster. The bridge owns the
/// actual wire protocol and the server-side session; this adapter only maps
/// the core's collaborator capabilities onto its endpoints.
#[derive(Debug, Clone)]
pub struct RestBridge {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ConnectBody<'a> {
    hosts: &'a str,
    port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct AckReply {
    ok: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NodeReply {
    name: String,
    #[serde(default)]
    namespaces: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SetReply {
    set: String,
    #[serde(default)]
    objects: u64,
    #[serde(default)]
    size_bytes: u64,
}

impl RestBridge {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn ack_to_result(reply: AckReply, refused: &str) -> Result<(), ConnectorError> {
        if reply.ok {
            return Ok(());
        }
        Err(ConnectorError::new(
            reply.message.unwrap_or_else(|| refused.to_string()),
        ))
    }
}

fn encode_segment(raw: &str) -> String {
    utf8_percent_encode(raw, NON_ALPHANUMERIC).to_string()
}

fn to_connector_error(error: reqwest::Error) -> ConnectorError {
    ConnectorError::new(error.to_string())
}

fn to_directory_error(error: reqwest::Error) -> DirectoryError {
    DirectoryError::new(error.to_string())
}

fn to_executor_error(error: reqwest::Error) -> ExecutorError {
    ExecutorError::new(error.to_string())
}

#[async_trait]
impl ClusterConnector for RestBridge {
    async fn connect(&self, profile: &ConnectionProfile) -> Result<(), ConnectorError> {
        let body = ConnectBody {
            hosts: &profile.hosts,
            port: profile.port,
            username: profile.username.as_deref(),
            password: profile.password.as_deref(),
        };
        let reply: AckReply = self
            .http
            .post(self.url("v1/connect"))
            .json(&body)
            .send()
            .await
            .map_err(to_connector_error)?
            .error_for_status()
            .map_err(to_connector_error)?
            .json()
            .await
            .map_err(to_connector_error)?;
        Self::ack_to_result(reply, "cluster refused the connection")
    }

    async fn disconnect(&self) -> Result<(), ConnectorError> {
        let reply: AckReply = self
            .http
            .post(self.url("v1/disconnect"))
            .send()
            .await
            .map_err(to_connector_error)?
            .error_for_status()
            .map_err(to_connector_error)?
            .json()
            .await
            .map_err(to_connector_error)?;
        Self::ack_to_result(reply, "cluster refused the teardown")
    }

    async fn node_info(&self) -> Result<Vec<NodeInfo>, ConnectorError> {
        let nodes: Vec<NodeReply> = self
            .http
            .get(self.url("v1/cluster/nodes"))
            .send()
            .await
            .map_err(to_connector_error)?
            .error_for_status()
            .map_err(to_connector_error)?
            .json()
            .await
            .map_err(to_connector_error)?;
        Ok(nodes
            .into_iter()
            .map(|node| NodeInfo {
                name: node.name,
                namespaces: node.namespaces,
            })
            .collect())
    }
}

#[async_trait]
impl SetDirectory for RestBridge {
    async fn sets(
        &self,
        _host: &str,
        ns: &str,
        node: Option<&str>,
    ) -> Result<Vec<SetInfo>, DirectoryError> {
        let mut request = self
            .http
            .get(self.url(&format!("v1/namespaces/{}/sets", encode_segment(ns))));
        if let Some(node) = node {
            request = request.query(&[("node", node)]);
        }
        let sets: Vec<SetReply> = request
            .send()
            .await
            .map_err(to_directory_error)?
            .error_for_status()
            .map_err(to_directory_error)?
            .json()
            .await
            .map_err(to_directory_error)?;
        Ok(sets
            .into_iter()
            .map(|set| SetInfo::new(set.set, set.objects, set.size_bytes))
            .collect())
    }
}

#[async_trait]
impl QueryExecutor for RestBridge {
    async fn query_set(&self, request: &QueryRequest) -> Result<Vec<Record>, ExecutorError> {
        self.http
            .post(self.url("v1/query"))
            .json(&request.wire_document())
            .send()
            .await
            .map_err(to_executor_error)?
            .error_for_status()
            .map_err(to_executor_error)?
            .json()
            .await
            .map_err(to_executor_error)
    }

    async fn scan_set(&self, ns: &str, set: &str) -> Result<Vec<Record>, ExecutorError> {
        self.http
            .get(self.url(&format!(
                "v1/scan/{}/{}",
                encode_segment(ns),
                encode_segment(set)
            )))
            .send()
            .await
            .map_err(to_executor_error)?
            .error_for_status()
            .map_err(to_executor_error)?
            .json()
            .await
            .map_err(to_executor_error)
    }
}

#[cfg(test)]
mod tests {
    use super::{encode_segment, RestBridge};

    #[test]
    fn base_url_loses_its_trailing_slash() {
        let bridge = RestBridge::new("http://127.0.0.1:8080/");
        assert_eq!(bridge.base_url(), "http://127.0.0.1:8080");
        assert_eq!(bridge.url("v1/query"), "http://127.0.0.1:8080/v1/query");
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        assert_eq!(encode_segment("user events"), "user%20events");
        assert_eq!(encode_segment("a/b"), "a%2Fb");
        assert_eq!(encode_segment("plain"), "plain");
    }
}
