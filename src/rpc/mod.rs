//! JSON-RPC gateway to the business-management server.

pub mod client;
pub mod error;
pub mod protocol;
pub mod transport;

pub use client::{ConnectionContext, RpcClient};
pub use error::RpcError;
pub use protocol::{Domain, Operator, Order, RemoteMethod, SearchOptions, Service};
pub use transport::{HttpTransport, Transport};
