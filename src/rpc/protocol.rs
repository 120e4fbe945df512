//! Wire shapes of the JSON-RPC dialect spoken by the server, plus the typed
//! search domain used by `search_read`.

use std::fmt;

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use strum_macros::{AsRefStr, Display};

/// Path of the single RPC endpoint, relative to the server address.
pub const RPC_PATH: &str = "/jsonrpc";

pub const PROTOCOL_VERSION: &str = "2.0";

/// Remote service a call is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Service {
    /// Unauthenticated entry points (`authenticate`, `version`).
    Common,
    /// Model method execution (`execute_kw`).
    Object,
}

impl Serialize for Service {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_ref())
    }
}

/// Model methods the client knows the shape of. `Other` is the escape hatch
/// for anything the typed wrappers do not cover.
#[derive(Debug, Clone, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum RemoteMethod {
    SearchRead,
    Read,
    Create,
    Write,
    Other(String),
}

impl RemoteMethod {
    pub fn name(&self) -> &str {
        match self {
            RemoteMethod::Other(name) => name,
            known => known.as_ref(),
        }
    }
}

impl fmt::Display for RemoteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One call as handed to the transport: everything except the envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcCall {
    pub service: Service,
    pub method: String,
    pub args: Value,
}

impl RpcCall {
    pub fn new(service: Service, method: impl Into<String>, args: Value) -> Self {
        Self {
            service,
            method: method.into(),
            args,
        }
    }

    /// Model name of an `execute_kw` call (fourth positional argument).
    pub fn model(&self) -> Option<&str> {
        self.args.get(3).and_then(Value::as_str)
    }

    /// Model method of an `execute_kw` call (fifth positional argument).
    pub fn model_method(&self) -> Option<&str> {
        self.args.get(4).and_then(Value::as_str)
    }
}

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: &'a RpcCall,
    pub id: u32,
}

impl<'a> RpcRequest<'a> {
    pub fn new(params: &'a RpcCall, id: u32) -> Self {
        Self {
            jsonrpc: PROTOCOL_VERSION,
            method: "call",
            params,
            id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct RpcErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<RpcErrorData>,
}

#[derive(Debug, Deserialize)]
pub struct RpcErrorData {
    #[serde(default)]
    pub message: Option<String>,
}

impl RpcErrorBody {
    /// The nested `data.message` wins over the top-level one.
    pub fn user_message(&self) -> String {
        self.data
            .as_ref()
            .and_then(|d| d.message.as_deref())
            .filter(|m| !m.is_empty())
            .or(self.message.as_deref().filter(|m| !m.is_empty()))
            .unwrap_or("Unknown server error")
            .to_string()
    }
}

// ===============================
// Search domain
// ===============================

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum Operator {
    #[strum(serialize = "=")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = "in")]
    In,
    #[strum(serialize = "ilike")]
    ILike,
}

/// A `[field, operator, value]` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(3))?;
        seq.serialize_element(&self.field)?;
        seq.serialize_element(self.op.as_ref())?;
        seq.serialize_element(&self.value)?;
        seq.end()
    }
}

/// Conditions combined with implicit AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Domain(Vec<Condition>);

impl Domain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, field: &str, op: Operator, value: impl Into<Value>) -> Self {
        self.push(field, op, value);
        self
    }

    pub fn push(&mut self, field: &str, op: Operator, value: impl Into<Value>) {
        self.0.push(Condition {
            field: field.to_string(),
            op,
            value: value.into(),
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub direction: Direction,
}

impl Order {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Desc,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub limit: Option<u32>,
    pub order: Option<Order>,
}

impl SearchOptions {
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn domain_serializes_as_triples() {
        let domain = Domain::new()
            .and("employee_id", Operator::Eq, 7)
            .and("check_out", Operator::Eq, false);

        assert_eq!(
            serde_json::to_value(&domain).unwrap(),
            json!([["employee_id", "=", 7], ["check_out", "=", false]])
        );
    }

    #[test]
    fn order_renders_field_and_direction() {
        assert_eq!(Order::desc("check_in").to_string(), "check_in desc");
        assert_eq!(Order::asc("check_in").to_string(), "check_in asc");
    }

    #[test]
    fn method_names_match_server_spelling() {
        assert_eq!(RemoteMethod::SearchRead.name(), "search_read");
        assert_eq!(RemoteMethod::Write.name(), "write");
        assert_eq!(RemoteMethod::Other("name_get".into()).name(), "name_get");
        assert_eq!(Service::Object.as_ref(), "object");
    }

    #[test]
    fn nested_error_message_wins() {
        let body: RpcErrorBody = serde_json::from_value(json!({
            "message": "Odoo Server Error",
            "data": { "message": "Access Denied" }
        }))
        .unwrap();
        assert_eq!(body.user_message(), "Access Denied");

        let body: RpcErrorBody =
            serde_json::from_value(json!({ "message": "Odoo Server Error" })).unwrap();
        assert_eq!(body.user_message(), "Odoo Server Error");

        let body: RpcErrorBody = serde_json::from_value(json!({})).unwrap();
        assert_eq!(body.user_message(), "Unknown server error");
    }

    #[test]
    fn envelope_shape() {
        let call = RpcCall::new(Service::Common, "authenticate", json!(["db", "u", "p", {}]));
        let value = serde_json::to_value(RpcRequest::new(&call, 42)).unwrap();
        assert_eq!(
            value,
            json!({
                "jsonrpc": "2.0",
                "method": "call",
                "params": { "service": "common", "method": "authenticate", "args": ["db", "u", "p", {}] },
                "id": 42
            })
        );
    }
}
