//! Scripted transport for resource and integration tests

use super::{ApiError, ApiRequest, Client, Transport};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
enum Scripted {
    Json(Value),
    Error {
        status: u16,
        code: String,
        message: String,
    },
}

#[derive(Default)]
struct FakeState {
    responses: HashMap<(Method, String), VecDeque<Scripted>>,
    requests: Vec<ApiRequest>,
}

/// Answers requests from per-route queues keyed by method and path (query
/// string ignored). The last queued answer for a route repeats, so a status
/// poll can be scripted as "CREATING, then READY forever".
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(&self) -> Client {
        Client::new(self.clone())
    }

    pub fn respond(&self, method: Method, path: &str, body: Value) -> &Self {
        self.push(method, path, Scripted::Json(body));
        self
    }

    pub fn respond_error(
        &self,
        method: Method,
        path: &str,
        status: u16,
        code: &str,
        message: &str,
    ) -> &Self {
        self.push(
            method,
            path,
            Scripted::Error {
                status,
                code: code.to_string(),
                message: message.to_string(),
            },
        );
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.lock().requests.clone()
    }

    /// Requests sent to one route, in order
    pub fn requests_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == method && route(&r.path) == path)
            .cloned()
            .collect()
    }

    fn push(&self, method: Method, path: &str, response: Scripted) {
        self.lock()
            .responses
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn route(path: &str) -> &str {
    path.split('?').next().unwrap_or(path)
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let key = (request.method.clone(), route(&request.path).to_string());
        let mut state = self.lock();
        state.requests.push(request.clone());

        let scripted = match state.responses.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        match scripted {
            Some(Scripted::Json(body)) => Ok(body),
            Some(Scripted::Error {
                status,
                code,
                message,
            }) => Err(ApiError::from_response(
                status,
                Some(&code),
                &serde_json::json!({ "message": message }).to_string(),
            )),
            None => Err(ApiError::Service {
                code: "UnscriptedRequest".to_string(),
                status: 500,
                message: format!("no response scripted for {} {}", request.method, request.path),
            }),
        }
    }
}
