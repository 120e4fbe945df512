use std::sync::{Arc, RwLock};

use tracing::{debug, error, info, instrument, warn};

use super::store::SessionStore;
use crate::error::{Error, Result};
use crate::model::{Employee, SessionRecord, User};
use crate::models::{EmployeeId, UserId};
use crate::rpc::{Domain, Operator, RpcClient, RpcError, SearchOptions};

/// An accepted login, fresh or restored.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub user_id: UserId,
    pub employee: Employee,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated(AuthSession),
}

/// Login, employee resolution, session persistence and restoration.
///
/// The only caller of the RPC client's context mutators.
pub struct AuthManager {
    client: Arc<RpcClient>,
    store: Arc<dyn SessionStore>,
    state: RwLock<AuthState>,
}

impl AuthManager {
    pub fn new(client: Arc<RpcClient>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            client,
            store,
            state: RwLock::new(AuthState::Unauthenticated),
        }
    }

    pub fn state(&self) -> AuthState {
        self.state.read().expect("auth state poisoned").clone()
    }

    pub fn session(&self) -> Option<AuthSession> {
        match self.state() {
            AuthState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    fn set_state(&self, state: AuthState) {
        *self.state.write().expect("auth state poisoned") = state;
    }

    #[instrument(name = "auth_login", skip_all, fields(url = %url, db = %database, email = %email))]
    pub async fn login(
        &self,
        url: &str,
        database: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession> {
        info!("Login request received");

        if url.trim().is_empty() || database.trim().is_empty() {
            return Err(Error::Validation(
                "Server URL and database are required".to_string(),
            ));
        }
        if email.trim().is_empty() || password.is_empty() {
            return Err(Error::Validation("Email and password are required".to_string()));
        }

        self.set_state(AuthState::Authenticating);

        match self.try_login(url, database, email, password).await {
            Ok(session) => {
                info!(user_id = %session.user_id, employee_id = ?session.employee.id, "Login successful");
                self.set_state(AuthState::Authenticated(session.clone()));
                Ok(session)
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.client.logout();
                self.set_state(AuthState::Unauthenticated);
                Err(e)
            }
        }
    }

    async fn try_login(
        &self,
        url: &str,
        database: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession> {
        self.client.configure(url, database, None, None);

        let user_id = self.client.authenticate(database, email, password).await?;
        let employee = self.resolve_employee(user_id, email).await?;

        let record = SessionRecord {
            url: url.to_string(),
            db: database.to_string(),
            uid: user_id,
            password: password.to_string(),
            employee_id: employee.id,
            employee_name: employee.name.clone(),
        };
        self.persist(&record).await;

        Ok(AuthSession { user_id, employee })
    }

    async fn persist(&self, record: &SessionRecord) {
        match record.to_blob() {
            Ok(blob) => {
                if !self.store.save(&blob).await {
                    warn!("Session could not be persisted; it will not survive a restart");
                }
            }
            Err(e) => error!(error = %e, "Failed to serialize session"),
        }
    }

    /// The employee linked to `user_id`, or a user-only stand-in when there
    /// is none.
    pub async fn resolve_employee(&self, user_id: UserId, login: &str) -> Result<Employee> {
        const MESSAGE: &str = "Could not retrieve employee information.";

        let employees: Vec<Employee> = self
            .client
            .search_read(
                Employee::MODEL,
                &Domain::new().and("user_id", Operator::Eq, user_id.get()),
                Employee::FIELDS,
                &SearchOptions::default().limit(1),
            )
            .await
            .map_err(Error::service(MESSAGE))?;

        if let Some(employee) = employees.into_iter().next() {
            debug!(employee_id = ?employee.id, "Employee found");
            return Ok(employee);
        }

        let users: Vec<User> = self
            .client
            .search_read(
                User::MODEL,
                &Domain::new().and("id", Operator::Eq, user_id.get()),
                User::FIELDS,
                &SearchOptions::default().limit(1),
            )
            .await
            .map_err(Error::service(MESSAGE))?;

        let name = users
            .into_iter()
            .next()
            .map(|u| u.name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| login.to_string());

        warn!(%user_id, "No employee linked to user; continuing as user-only account");
        Ok(Employee::user_only(name))
    }

    /// Resume a stored login if the server still accepts it.
    ///
    /// Never fails: anything short of a verified session resolves to `None`,
    /// and a stale record is removed from the store.
    #[instrument(name = "auth_restore", skip(self))]
    pub async fn restore_session(&self) -> Option<AuthSession> {
        let Some(blob) = self.store.load().await else {
            debug!("No stored session");
            self.set_state(AuthState::Unauthenticated);
            return None;
        };

        let Some(record) = SessionRecord::from_blob(&blob) else {
            warn!("Stored session is incomplete; discarding");
            self.store.clear().await;
            self.set_state(AuthState::Unauthenticated);
            return None;
        };

        self.set_state(AuthState::Authenticating);
        self.client
            .configure(&record.url, &record.db, Some(record.uid), Some(record.password.clone()));

        match self.probe(record.uid).await {
            Ok(true) => {
                let employee = Employee {
                    id: record.employee_id,
                    user_only: record.employee_id.is_none(),
                    ..Employee::user_only(record.employee_name.clone())
                };
                let session = AuthSession {
                    user_id: record.uid,
                    employee,
                };
                info!(user_id = %record.uid, "Session restored");
                self.set_state(AuthState::Authenticated(session.clone()));
                Some(session)
            }
            Ok(false) => {
                warn!(user_id = %record.uid, "Stored user no longer exists; clearing session");
                self.discard().await;
                None
            }
            Err(e) => {
                warn!(error = %e, "Session probe failed; clearing session");
                self.discard().await;
                None
            }
        }
    }

    /// Liveness check: can we still read our own user row?
    async fn probe(&self, user_id: UserId) -> std::result::Result<bool, RpcError> {
        let users: Vec<User> = self
            .client
            .search_read(
                User::MODEL,
                &Domain::new().and("id", Operator::Eq, user_id.get()),
                &["id", "name"],
                &SearchOptions::default().limit(1),
            )
            .await?;
        Ok(!users.is_empty())
    }

    async fn discard(&self) {
        self.client.logout();
        self.store.clear().await;
        self.set_state(AuthState::Unauthenticated);
    }

    /// Forget the credential locally. Always succeeds.
    #[instrument(name = "auth_logout", skip(self))]
    pub async fn logout(&self) {
        self.client.logout();
        if !self.store.clear().await {
            warn!("Stored session could not be cleared");
        }
        self.set_state(AuthState::Unauthenticated);
        info!("Logged out");
    }

    /// True iff the store holds a record with a user id.
    pub async fn has_session(&self) -> bool {
        match self.store.load().await {
            Some(blob) => SessionRecord::from_blob(&blob).is_some(),
            None => false,
        }
    }
}

/// The employee id an attendance action needs, or a validation error for
/// user-only accounts.
pub fn require_employee(employee: &Employee) -> Result<EmployeeId> {
    employee
        .id
        .filter(|id| id.is_valid())
        .ok_or_else(|| Error::Validation("No employee associated with this user.".to_string()))
}
