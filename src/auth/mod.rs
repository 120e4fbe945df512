pub mod session;
pub mod store;

pub use session::{AuthManager, AuthSession, AuthState, require_employee};
pub use store::{FileSessionStore, MemorySessionStore, SESSION_KEY, SessionStore};
