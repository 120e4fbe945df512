use std::fmt;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument};

use super::error::RpcError;
use super::protocol::{Domain, RPC_PATH, RemoteMethod, RpcCall, SearchOptions, Service};
use super::transport::Transport;
use crate::models::UserId;

/// Who the client talks to and as whom.
#[derive(Clone, Default, PartialEq)]
pub struct ConnectionContext {
    pub url: Option<String>,
    pub database: Option<String>,
    pub user_id: Option<UserId>,
    pub credential: Option<String>,
}

impl fmt::Debug for ConnectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionContext")
            .field("url", &self.url)
            .field("database", &self.database)
            .field("user_id", &self.user_id)
            .field("credential", &self.credential.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ConnectionContext {
    fn endpoint(&self) -> Result<String, RpcError> {
        self.url
            .as_deref()
            .map(|url| format!("{}{}", url, RPC_PATH))
            .ok_or(RpcError::NotConfigured)
    }
}

/// Generic gateway to the remote object model.
///
/// Knows nothing about attendance: it only tracks the connection identity and
/// turns typed calls into `execute_kw` envelopes. The context is mutated only
/// by [`configure`](Self::configure), [`authenticate`](Self::authenticate) and
/// [`logout`](Self::logout); callers serialize their own login/logout flows.
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    context: RwLock<ConnectionContext>,
}

impl RpcClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            context: RwLock::new(ConnectionContext::default()),
        }
    }

    /// Snapshot of the current connection identity.
    pub fn context(&self) -> ConnectionContext {
        self.context.read().expect("connection context poisoned").clone()
    }

    /// Overwrite the whole context. A single trailing `/` is stripped from the
    /// address.
    pub fn configure(
        &self,
        url: &str,
        database: &str,
        user_id: Option<UserId>,
        credential: Option<String>,
    ) {
        let url = url.strip_suffix('/').unwrap_or(url);
        let mut ctx = self.context.write().expect("connection context poisoned");
        *ctx = ConnectionContext {
            url: Some(url.to_string()),
            database: Some(database.to_string()),
            user_id,
            credential,
        };
        debug!(url, database, "rpc client configured");
    }

    #[instrument(name = "rpc_authenticate", skip(self, password))]
    pub async fn authenticate(
        &self,
        database: &str,
        login: &str,
        password: &str,
    ) -> Result<UserId, RpcError> {
        let endpoint = self.context().endpoint()?;
        let call = RpcCall::new(
            Service::Common,
            "authenticate",
            json!([database, login, password, {}]),
        );

        let result = self.transport.call(&endpoint, &call).await?;
        let user_id = match result {
            Value::Null | Value::Bool(false) => return Err(RpcError::InvalidCredentials),
            Value::Number(n) => match n.as_i64() {
                Some(0) => return Err(RpcError::InvalidCredentials),
                Some(id) => UserId(id),
                None => return Err(RpcError::Decode(format!("user id {} is not an integer", n))),
            },
            other => return Err(RpcError::Decode(format!("unexpected uid: {}", other))),
        };

        let mut ctx = self.context.write().expect("connection context poisoned");
        ctx.database = Some(database.to_string());
        ctx.user_id = Some(user_id);
        ctx.credential = Some(password.to_string());
        info!(%user_id, "authenticated");

        Ok(user_id)
    }

    /// `execute_kw` on `model`. Requires a user id and a credential.
    pub async fn execute(
        &self,
        model: &str,
        method: RemoteMethod,
        args: Value,
        kwargs: Value,
    ) -> Result<Value, RpcError> {
        let ctx = self.context();
        let (user_id, credential) = match (ctx.user_id, ctx.credential.as_deref()) {
            (Some(uid), Some(credential)) => (uid, credential),
            _ => return Err(RpcError::NotAuthenticated),
        };
        let endpoint = ctx.endpoint()?;

        let call = RpcCall::new(
            Service::Object,
            "execute_kw",
            json!([
                ctx.database,
                user_id,
                credential,
                model,
                method.name(),
                args,
                kwargs
            ]),
        );
        debug!(model, method = %method, "execute");
        self.transport.call(&endpoint, &call).await
    }

    /// `search_read` with `domain` AND-ed together, rows decoded into `R`.
    pub async fn search_read<R: DeserializeOwned>(
        &self,
        model: &str,
        domain: &Domain,
        fields: &[&str],
        options: &SearchOptions,
    ) -> Result<Vec<R>, RpcError> {
        let mut kwargs = Map::new();
        kwargs.insert("fields".into(), json!(fields));
        if let Some(limit) = options.limit {
            kwargs.insert("limit".into(), json!(limit));
        }
        if let Some(order) = &options.order {
            kwargs.insert("order".into(), json!(order.to_string()));
        }

        let rows = self
            .execute(model, RemoteMethod::SearchRead, json!([domain]), Value::Object(kwargs))
            .await?;
        decode_rows(rows)
    }

    pub async fn read<R: DeserializeOwned>(
        &self,
        model: &str,
        ids: &[i64],
        fields: &[&str],
    ) -> Result<Vec<R>, RpcError> {
        let rows = self
            .execute(model, RemoteMethod::Read, json!([ids]), json!({ "fields": fields }))
            .await?;
        decode_rows(rows)
    }

    /// Create one record and return its id.
    pub async fn create<V: Serialize>(&self, model: &str, values: &V) -> Result<i64, RpcError> {
        let result = self
            .execute(model, RemoteMethod::Create, json!([values]), json!({}))
            .await?;
        let id = match result {
            // Batch-aware servers answer with a list of ids.
            Value::Array(ids) => ids.first().and_then(Value::as_i64),
            other => other.as_i64(),
        };
        id.ok_or_else(|| RpcError::Decode("create did not return an id".to_string()))
    }

    pub async fn write<V: Serialize>(
        &self,
        model: &str,
        ids: &[i64],
        values: &V,
    ) -> Result<bool, RpcError> {
        let result = self
            .execute(model, RemoteMethod::Write, json!([ids, values]), json!({}))
            .await?;
        Ok(result.as_bool().unwrap_or(false))
    }

    pub fn is_authenticated(&self) -> bool {
        let ctx = self.context.read().expect("connection context poisoned");
        ctx.url.is_some() && ctx.user_id.is_some() && ctx.credential.is_some()
    }

    /// Forget the user id and credential; address and database stay.
    pub fn logout(&self) {
        let mut ctx = self.context.write().expect("connection context poisoned");
        ctx.user_id = None;
        ctx.credential = None;
        debug!("rpc client credentials cleared");
    }
}

fn decode_rows<R: DeserializeOwned>(rows: Value) -> Result<Vec<R>, RpcError> {
    match rows {
        Value::Null | Value::Bool(false) => Ok(Vec::new()),
        rows => serde_json::from_value(rows).map_err(RpcError::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::protocol::{Operator, Order};
    use crate::rpc::transport::mock::MockTransport;

    fn client_with(
        handler: impl Fn(&RpcCall) -> Result<Value, RpcError> + Send + Sync + 'static,
    ) -> (RpcClient, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new(handler));
        (RpcClient::new(transport.clone()), transport)
    }

    #[test]
    fn configure_strips_one_trailing_slash() {
        let (client, _) = client_with(|_| Ok(Value::Null));
        client.configure("https://erp.example.com/", "prod", None, None);
        assert_eq!(client.context().url.as_deref(), Some("https://erp.example.com"));

        client.configure("https://erp.example.com//", "prod", None, None);
        assert_eq!(client.context().url.as_deref(), Some("https://erp.example.com/"));
    }

    #[test]
    fn debug_redacts_credential() {
        let (client, _) = client_with(|_| Ok(Value::Null));
        client.configure("https://erp", "prod", Some(UserId(2)), Some("hunter2".into()));
        let rendered = format!("{:?}", client.context());
        assert!(!rendered.contains("hunter2"));
        assert!(client.is_authenticated());
    }

    #[tokio::test]
    async fn authenticate_stores_identity() {
        let (client, transport) = client_with(|_| Ok(json!(7)));
        client.configure("https://erp", "ignored", None, None);

        let uid = client.authenticate("prod", "ana@example.com", "pw").await.unwrap();
        assert_eq!(uid, UserId(7));

        let ctx = client.context();
        assert_eq!(ctx.database.as_deref(), Some("prod"));
        assert_eq!(ctx.user_id, Some(UserId(7)));
        assert_eq!(ctx.credential.as_deref(), Some("pw"));

        let (endpoint, call) = &transport.calls()[0];
        assert_eq!(endpoint, "https://erp/jsonrpc");
        assert_eq!(call.service, Service::Common);
        assert_eq!(call.args, json!(["prod", "ana@example.com", "pw", {}]));
    }

    #[tokio::test]
    async fn falsy_uid_is_invalid_credentials() {
        for falsy in [json!(false), Value::Null, json!(0)] {
            let (client, _) = client_with(move |_| Ok(falsy.clone()));
            client.configure("https://erp", "prod", None, None);
            let err = client.authenticate("prod", "a", "b").await.unwrap_err();
            assert_eq!(err, RpcError::InvalidCredentials);
            assert!(!client.is_authenticated());
        }
    }

    #[tokio::test]
    async fn non_integer_uid_is_a_decode_error() {
        let (client, _) = client_with(|_| Ok(json!("abc")));
        client.configure("https://erp", "prod", None, None);

        let err = client.authenticate("prod", "a", "b").await.unwrap_err();
        assert!(matches!(err, RpcError::Decode(_)));
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn execute_requires_credentials() {
        let (client, transport) = client_with(|_| Ok(json!([])));
        client.configure("https://erp", "prod", None, None);

        let err = client
            .execute("hr.attendance", RemoteMethod::SearchRead, json!([]), json!({}))
            .await
            .unwrap_err();
        assert_eq!(err, RpcError::NotAuthenticated);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn unconfigured_client_refuses_to_call() {
        let (client, _) = client_with(|_| Ok(json!(1)));
        let err = client.authenticate("prod", "a", "b").await.unwrap_err();
        assert_eq!(err, RpcError::NotConfigured);
    }

    #[tokio::test]
    async fn search_read_builds_execute_kw() {
        let (client, transport) = client_with(|_| Ok(json!([{ "id": 3 }])));
        client.configure("https://erp", "prod", Some(UserId(2)), Some("pw".into()));

        let domain = Domain::new().and("employee_id", Operator::Eq, 5);
        let options = SearchOptions::default().limit(1).order(Order::desc("check_in"));
        let rows: Vec<Value> = client
            .search_read("hr.attendance", &domain, &["id", "check_in"], &options)
            .await
            .unwrap();
        assert_eq!(rows, vec![json!({ "id": 3 })]);

        let (_, call) = &transport.calls()[0];
        assert_eq!(call.service, Service::Object);
        assert_eq!(call.method, "execute_kw");
        assert_eq!(
            call.args,
            json!([
                "prod",
                2,
                "pw",
                "hr.attendance",
                "search_read",
                [[["employee_id", "=", 5]]],
                { "fields": ["id", "check_in"], "limit": 1, "order": "check_in desc" }
            ])
        );
    }

    #[tokio::test]
    async fn create_and_write_unwrap_results() {
        let (client, transport) = client_with(|call| match call.model_method() {
            Some("create") => Ok(json!(41)),
            Some("write") => Ok(json!(true)),
            _ => Ok(Value::Null),
        });
        client.configure("https://erp", "prod", Some(UserId(2)), Some("pw".into()));

        let id = client
            .create("hr.attendance", &json!({ "employee_id": 5 }))
            .await
            .unwrap();
        assert_eq!(id, 41);
        assert!(client.write("hr.attendance", &[41], &json!({ "check_out": "x" })).await.unwrap());

        let writes = transport.calls_to("hr.attendance", "write");
        assert_eq!(writes[0].args[5], json!([[41], { "check_out": "x" }]));
    }

    #[tokio::test]
    async fn create_takes_first_id_of_a_list() {
        let (client, _) = client_with(|_| Ok(json!([41])));
        client.configure("https://erp", "prod", Some(UserId(2)), Some("pw".into()));
        let id = client.create("hr.attendance", &json!({})).await.unwrap();
        assert_eq!(id, 41);
    }

    #[tokio::test]
    async fn create_without_an_id_is_a_decode_error() {
        for reply in [json!([]), json!(true)] {
            let (client, _) = client_with(move |_| Ok(reply.clone()));
            client.configure("https://erp", "prod", Some(UserId(2)), Some("pw".into()));
            let err = client.create("hr.attendance", &json!({})).await.unwrap_err();
            assert_eq!(err, RpcError::Decode("create did not return an id".to_string()));
        }
    }

    #[test]
    fn logout_keeps_address_and_database() {
        let (client, _) = client_with(|_| Ok(Value::Null));
        client.configure("https://erp", "prod", Some(UserId(2)), Some("pw".into()));
        client.logout();

        let ctx = client.context();
        assert_eq!(ctx.url.as_deref(), Some("https://erp"));
        assert_eq!(ctx.database.as_deref(), Some("prod"));
        assert!(ctx.user_id.is_none() && ctx.credential.is_none());
        assert!(!client.is_authenticated());
    }
}
