use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::browse::BrowseContext;
use crate::query_spec::{QuerySpec, EQ_KEY, PK_KEY, SELECT_KEY};
use crate::result_set::{Record, ResultSet};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExecutorError {
    message: String,
}

impl ExecutorError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A validated query merged with its session context, ready for the remote
/// boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub ns: String,
    pub set: String,
    pub spec: QuerySpec,
}

impl QueryRequest {
    /// The flat document sent over the wire. The namespace and set from the
    /// session context are inserted last, so they override any identically
    /// named field a query document could try to smuggle in.
    #[must_use]
    pub fn wire_document(&self) -> Value {
        let mut body = Map::new();
        match &self.spec {
            QuerySpec::PkLookup { keys, select } => {
                body.insert(PK_KEY.to_string(), Value::Array(keys.clone()));
                if let Some(select) = select {
                    body.insert(
                        SELECT_KEY.to_string(),
                        Value::Array(select.iter().map(|field| Value::String(field.clone())).collect()),
                    );
                }
            }
            QuerySpec::EqualityFilter { criteria } => {
                body.insert(EQ_KEY.to_string(), Value::Object(criteria.clone()));
            }
            QuerySpec::Scan => {}
        }
        body.insert("ns".to_string(), Value::String(self.ns.clone()));
        body.insert("set".to_string(), Value::String(self.set.clone()));
        Value::Object(body)
    }
}

#[async_trait]
pub trait QueryExecutor {
    async fn query_set(&self, request: &QueryRequest) -> Result<Vec<Record>, ExecutorError>;
    async fn scan_set(&self, ns: &str, set: &str) -> Result<Vec<Record>, ExecutorError>;
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("a request is already running for {ns}/{set}")]
    Busy { ns: String, set: String },
    #[error("remote execution failed: {0}")]
    Remote(#[source] ExecutorError),
}

/// Handle for one outstanding request. It pins the browsing context and the
/// dispatcher epoch captured at issue time; completion is validated against
/// both, so a late response can never land in a context that has moved on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    context: BrowseContext,
    epoch: u64,
}

impl RequestTicket {
    #[must_use]
    pub fn context(&self) -> &BrowseContext {
        &self.context
    }
}

/// Sits between validated query specs and the executor. One request may be
/// outstanding per (namespace, set) context; new ones are rejected, never
/// queued. There is no retry: a failed request is re-submitted by the
/// operator or not at all.
#[derive(Debug)]
pub struct QueryDispatcher<E: QueryExecutor> {
    executor: E,
    epoch: u64,
    in_flight: HashSet<(String, String)>,
}

impl<E: QueryExecutor> QueryDispatcher<E> {
    #[must_use]
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            epoch: 0,
            in_flight: HashSet::new(),
        }
    }

    /// Claims the in-flight slot for this context and issues a ticket.
    pub fn begin(&mut self, context: BrowseContext) -> Result<RequestTicket, DispatchError> {
        let key = (context.ns.clone(), context.set.clone());
        if self.in_flight.contains(&key) {
            return Err(DispatchError::Busy {
                ns: context.ns,
                set: context.set,
            });
        }
        self.in_flight.insert(key);
        Ok(RequestTicket {
            context,
            epoch: self.epoch,
        })
    }

    /// Runs the request through the executor, exactly once. Scans bypass the
    /// query document entirely and use the dedicated scan entry point; both
    /// paths produce the same row shape.
    pub async fn execute(
        &self,
        spec: &QuerySpec,
        ticket: &RequestTicket,
    ) -> Result<Vec<Record>, DispatchError> {
        let context = &ticket.context;
        match spec {
            QuerySpec::Scan => self
                .executor
                .scan_set(&context.ns, &context.set)
                .await
                .map_err(DispatchError::Remote),
            other => {
                let request = QueryRequest {
                    ns: context.ns.clone(),
                    set: context.set.clone(),
                    spec: other.clone(),
                };
                self.executor
                    .query_set(&request)
                    .await
                    .map_err(DispatchError::Remote)
            }
        }
    }

    /// Turns raw rows into a [`ResultSet`] if the ticket is still current.
    /// A stale ticket (the screen was invalidated after issue) yields `None`
    /// and must not mutate anything.
    pub fn complete(&mut self, ticket: RequestTicket, rows: Vec<Record>) -> Option<ResultSet> {
        if ticket.epoch != self.epoch {
            debug!(
                ns = %ticket.context.ns,
                set = %ticket.context.set,
                "dropping response for a stale browsing context"
            );
            return None;
        }
        self.in_flight
            .remove(&(ticket.context.ns.clone(), ticket.context.set.clone()));
        Some(ResultSet::from_rows(rows))
    }

    /// Releases the in-flight slot after a failed request so the context can
    /// be re-submitted.
    pub fn fail(&mut self, ticket: &RequestTicket) {
        if ticket.epoch == self.epoch {
            self.in_flight
                .remove(&(ticket.context.ns.clone(), ticket.context.set.clone()));
        }
    }

    /// Invalidates every outstanding ticket. Called on disconnect and when
    /// the browsing screen is left; responses issued before this point
    /// become no-ops.
    pub fn invalidate(&mut self) {
        self.epoch += 1;
        self.in_flight.clear();
    }
}
