#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use hrm_attendance::AttendanceClient;
use hrm_attendance::auth::{MemorySessionStore, SessionStore};
use hrm_attendance::rpc::HttpTransport;
use hrm_attendance::utils::clock::FixedClock;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

pub const DB: &str = "acme";

/// Matches a JSON-RPC call by service and, for `execute_kw`, model and method.
pub struct RpcMatcher {
    service: &'static str,
    target: Option<(&'static str, &'static str)>,
}

impl Match for RpcMatcher {
    fn matches(&self, request: &Request) -> bool {
        let Ok(body) = serde_json::from_slice::<Value>(&request.body) else {
            return false;
        };
        let params = &body["params"];
        if params["service"] != self.service {
            return false;
        }
        match self.target {
            Some((model, model_method)) => {
                params["args"][3] == model && params["args"][4] == model_method
            }
            None => true,
        }
    }
}

pub fn authenticate() -> RpcMatcher {
    RpcMatcher {
        service: "common",
        target: None,
    }
}

pub fn execute(model: &'static str, model_method: &'static str) -> RpcMatcher {
    RpcMatcher {
        service: "object",
        target: Some((model, model_method)),
    }
}

pub fn result(value: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": value }))
}

pub fn remote_error(message: &str, detail: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": { "code": 200, "message": message, "data": { "message": detail } }
    }))
}

pub async fn mount(server: &MockServer, matcher: RpcMatcher, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .and(matcher)
        .respond_with(response)
        .mount(server)
        .await;
}

/// Client over real HTTP, clock pinned to Wednesday 2024-05-15 09:30.
pub fn client_with(store: Arc<dyn SessionStore>, timeout: Duration) -> AttendanceClient {
    let now = chrono::NaiveDate::from_ymd_opt(2024, 5, 15)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .expect("valid timestamp");
    let transport = HttpTransport::new(timeout).expect("http client");
    AttendanceClient::new(Arc::new(transport), store, Arc::new(FixedClock(now)))
}

pub fn client() -> (AttendanceClient, Arc<MemorySessionStore>) {
    let store = Arc::new(MemorySessionStore::new());
    (client_with(store.clone(), Duration::from_secs(5)), store)
}

pub fn employee_row() -> Value {
    json!({
        "id": 7,
        "name": "Ada Lovelace",
        "department_id": [2, "Research"],
        "job_id": false
    })
}
