use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use tracing::{debug, warn};

use super::error::RpcError;
use super::protocol::{RpcCall, RpcRequest, RpcResponse};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends one RPC call and unwraps its `result`.
///
/// Implementations are stateless between calls; the shape of the returned
/// value is left to the caller to validate.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, endpoint: &str, call: &RpcCall) -> Result<Value, RpcError>;
}

/// JSON-RPC over HTTP POST.
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| RpcError::Network(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    async fn send(&self, endpoint: &str, call: &RpcCall, id: u32) -> Result<Value, RpcError> {
        let resp = self
            .client
            .post(endpoint)
            .json(&RpcRequest::new(call, id))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RpcError::Transport {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let body: RpcResponse = resp.json().await?;
        if let Some(error) = body.error {
            return Err(RpcError::Remote(error.user_message()));
        }

        Ok(body.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, endpoint: &str, call: &RpcCall) -> Result<Value, RpcError> {
        let id = rand::thread_rng().gen_range(0..1_000_000);
        debug!(
            id,
            service = %call.service,
            method = %call.method,
            "rpc call"
        );

        // Dropping the future on expiry aborts the in-flight request.
        match tokio::time::timeout(self.timeout, self.send(endpoint, call, id)).await {
            Ok(result) => {
                if let Err(e) = &result {
                    warn!(id, error = %e, "rpc call failed");
                }
                result
            }
            Err(_) => {
                warn!(id, timeout_ms = self.timeout.as_millis() as u64, "rpc call timed out");
                Err(RpcError::Timeout)
            }
        }
    }
}

/// Scripted transport for exercising the layers above without a server.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    type Handler = dyn Fn(&RpcCall) -> Result<Value, RpcError> + Send + Sync;

    pub struct MockTransport {
        handler: Box<Handler>,
        calls: Mutex<Vec<(String, RpcCall)>>,
    }

    impl MockTransport {
        pub fn new<F>(handler: F) -> Self
        where
            F: Fn(&RpcCall) -> Result<Value, RpcError> + Send + Sync + 'static,
        {
            Self {
                handler: Box::new(handler),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Every call received so far, with the endpoint it was sent to.
        pub fn calls(&self) -> Vec<(String, RpcCall)> {
            self.calls.lock().expect("mock transport poisoned").clone()
        }

        /// Calls that executed `method` on `model`.
        pub fn calls_to(&self, model: &str, method: &str) -> Vec<RpcCall> {
            self.calls()
                .into_iter()
                .map(|(_, call)| call)
                .filter(|c| c.model() == Some(model) && c.model_method() == Some(method))
                .collect()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn call(&self, endpoint: &str, call: &RpcCall) -> Result<Value, RpcError> {
            self.calls
                .lock()
                .expect("mock transport poisoned")
                .push((endpoint.to_string(), call.clone()));
            (self.handler)(call)
        }
    }
}
