use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::{AttendanceId, EmployeeId, Many2One, falsy_as_none, many2one};
use crate::utils::datetime::{optional_server_timestamp, server_timestamp};

/// One check-in/check-out pair as stored on the server.
///
/// A record with no `check_out` is *open*: the employee is on the clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendance {
    pub id: AttendanceId,
    #[serde(default, deserialize_with = "many2one")]
    pub employee_id: Option<Many2One>,
    #[serde(with = "server_timestamp")]
    pub check_in: NaiveDateTime,
    #[serde(default, with = "optional_server_timestamp")]
    pub check_out: Option<NaiveDateTime>,
    /// Computed by the server once the record is closed.
    #[serde(default, deserialize_with = "falsy_as_none")]
    pub worked_hours: Option<f64>,
}

impl Attendance {
    pub const MODEL: &'static str = "hr.attendance";

    pub const OPEN_FIELDS: &'static [&'static str] = &["id", "check_in", "employee_id"];
    pub const HISTORY_FIELDS: &'static [&'static str] =
        &["id", "check_in", "check_out", "worked_hours"];
    pub const SUMMARY_FIELDS: &'static [&'static str] =
        &["id", "worked_hours", "check_in", "check_out"];

    pub fn is_open(&self) -> bool {
        self.check_out.is_none()
    }

    pub fn employee(&self) -> Option<EmployeeId> {
        self.employee_id.as_ref().map(|e| EmployeeId(e.id))
    }
}

/// Values sent on check-in.
#[derive(Debug, Serialize)]
pub struct NewAttendance {
    pub employee_id: EmployeeId,
    #[serde(with = "server_timestamp")]
    pub check_in: NaiveDateTime,
}

/// Values sent on check-out.
#[derive(Debug, Serialize)]
pub struct CloseAttendance {
    #[serde(with = "server_timestamp")]
    pub check_out: NaiveDateTime,
}

/// Inclusive bounds on check-in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateFilter {
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

/// Hours worked since the most recent Monday.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySummary {
    pub week_start: NaiveDate,
    pub total_hours: f64,
    pub record_count: usize,
    pub records: Vec<Attendance>,
}

/// What the home screen shows after a refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeState {
    pub current: Option<Attendance>,
    pub weekly: WeeklySummary,
}
