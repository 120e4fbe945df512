pub mod attendance;

pub use attendance::{AttendanceManager, DEFAULT_HISTORY_LIMIT};
