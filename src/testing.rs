//! Test helpers shared by unit tests

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::client::{ClientError, ClientResult, QueryRequest, Transport};

/// One scripted reply
pub enum Reply {
    Ok(Value),
    RateLimited,
    Status(u16),
    /// Reply after a delay
    Delayed(Duration, Value),
    /// Never reply
    Hang,
}

/// Transport answering from per-query scripts
///
/// A request is matched against the scripts in registration order: the first
/// script whose needle is contained in the query text answers with its next
/// reply. The last reply of a script repeats once the script is exhausted.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<Vec<(String, VecDeque<Reply>)>>,
    sent: Mutex<Vec<QueryRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, needle: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .push((needle.to_string(), replies.into()));
        self
    }

    /// Requests received so far
    pub fn sent(&self) -> Vec<QueryRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of requests whose query contains `needle`
    pub fn count(&self, needle: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.body.query.contains(needle))
            .count()
    }

    fn next_reply(&self, query: &str) -> Option<Reply> {
        let mut scripts = self.scripts.lock().unwrap();
        let (_, replies) = scripts
            .iter_mut()
            .find(|(needle, _)| query.contains(needle.as_str()))?;
        if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().map(Reply::duplicate)
        }
    }
}

impl Reply {
    fn duplicate(&self) -> Reply {
        match self {
            Reply::Ok(v) => Reply::Ok(v.clone()),
            Reply::RateLimited => Reply::RateLimited,
            Reply::Status(s) => Reply::Status(*s),
            Reply::Delayed(d, v) => Reply::Delayed(*d, v.clone()),
            Reply::Hang => Reply::Hang,
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &QueryRequest) -> ClientResult<Value> {
        self.sent.lock().unwrap().push(request.clone());

        match self.next_reply(&request.body.query) {
            Some(Reply::Ok(body)) => Ok(body),
            Some(Reply::RateLimited) => Err(ClientError::RateLimited),
            Some(Reply::Status(status)) => Err(ClientError::Api {
                status,
                message: "scripted failure".to_string(),
            }),
            Some(Reply::Delayed(delay, body)) => {
                tokio::time::sleep(delay).await;
                Ok(body)
            }
            Some(Reply::Hang) => std::future::pending().await,
            None => Err(ClientError::Api {
                status: 404,
                message: format!("no script for query: {}", request.body.query),
            }),
        }
    }
}
