pub mod attendance;
pub mod employee;
pub mod session;
pub mod user;

pub use attendance::{Attendance, DateFilter, HomeState, WeeklySummary};
pub use employee::Employee;
pub use session::SessionRecord;
pub use user::User;
