//! In-memory transport for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

use super::{ApiRequest, Method, Transport};
use crate::error::ApiError;

/// Answers from a route table and records every request it sees.
///
/// Unrouted GETs return `[]`, POSTs echo the body with a generated id,
/// PUTs echo the body and DELETEs return a short message.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), Result<Value, ApiError>>>,
    log: Mutex<Vec<ApiRequest>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request waits for a permit from [`MockTransport::release`].
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    pub fn respond(&self, method: Method, path: &str, body: Value) {
        self.routes
            .lock()
            .insert((method, path.to_string()), Ok(body));
    }

    pub fn fail(&self, method: Method, path: &str, error: ApiError) {
        self.routes
            .lock()
            .insert((method, path.to_string()), Err(error));
    }

    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log.lock().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path() == path)
            .count()
    }

    /// Yield until at least `n` requests have been recorded.
    pub async fn wait_for_requests(&self, n: usize) {
        for _ in 0..10_000 {
            if self.log.lock().len() >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {} requests, saw {}", n, self.log.lock().len());
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let sequence = {
            let mut log = self.log.lock();
            log.push(request.clone());
            log.len()
        };

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| ApiError::network("gate closed"))?
                .forget();
        }

        let routed = self
            .routes
            .lock()
            .get(&(request.method, request.path()))
            .cloned();
        if let Some(result) = routed {
            return result;
        }

        Ok(match request.method {
            Method::Get => json!([]),
            Method::Post => {
                let mut body = request.body.unwrap_or_else(|| json!({}));
                if let Some(obj) = body.as_object_mut() {
                    obj.insert("id".to_string(), json!(format!("generated-{}", sequence)));
                }
                body
            }
            Method::Put => request.body.unwrap_or(Value::Null),
            Method::Delete => json!({"message": "deleted"}),
        })
    }
}
