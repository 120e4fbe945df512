//! Attendance client for an Odoo-style business server.
//!
//! [`AttendanceClient`] wires one [`rpc::RpcClient`] into the
//! [`auth::AuthManager`] (login, session restore, logout) and the
//! [`api::AttendanceManager`] (check-in/out, history, weekly summary).

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod model;
pub mod models;
pub mod rpc;
pub mod utils;

use std::sync::Arc;

use api::AttendanceManager;
use auth::{AuthManager, SessionStore};
use config::Config;
use rpc::{HttpTransport, RpcClient, RpcError, Transport};
use utils::clock::{Clock, LocalClock};

pub use error::{Error, ErrorKind, Result};

/// The core as the UI sees it.
pub struct AttendanceClient {
    rpc: Arc<RpcClient>,
    pub auth: AuthManager,
    pub attendance: AttendanceManager,
}

impl AttendanceClient {
    /// HTTP transport with the configured timeout.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn SessionStore>,
    ) -> std::result::Result<Self, RpcError> {
        let transport = HttpTransport::new(config.request_timeout)?;
        Ok(Self::new(Arc::new(transport), store, Arc::new(LocalClock)))
    }

    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let rpc = Arc::new(RpcClient::new(transport));
        Self {
            auth: AuthManager::new(rpc.clone(), store),
            attendance: AttendanceManager::with_clock(rpc.clone(), clock),
            rpc,
        }
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub fn is_authenticated(&self) -> bool {
        self.rpc.is_authenticated()
    }
}
