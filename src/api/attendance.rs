use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::error::{Error, Result};
use crate::model::attendance::{CloseAttendance, NewAttendance};
use crate::model::{Attendance, DateFilter, HomeState, WeeklySummary};
use crate::models::{AttendanceId, EmployeeId};
use crate::rpc::{Domain, Operator, Order, RpcClient, SearchOptions};
use crate::utils::clock::{Clock, LocalClock};
use crate::utils::datetime::{format_server_timestamp, round_hours, week_start};

pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

const STATUS_FAILED: &str = "Could not retrieve attendance status.";
const CHECK_IN_FAILED: &str = "Could not register check-in. Please try again.";
const CHECK_OUT_FAILED: &str = "Could not register check-out. Please try again.";
const HISTORY_FAILED: &str = "Could not retrieve attendance history.";
const SUMMARY_FAILED: &str = "Could not retrieve weekly summary.";

/// Check-in/check-out and the views built on attendance records.
///
/// Keeps at most one open record per employee by looking before creating.
/// The look and the create are two separate calls, so two devices checking
/// in for the same employee at the same moment can still both succeed.
pub struct AttendanceManager {
    client: Arc<RpcClient>,
    clock: Arc<dyn Clock>,
}

impl AttendanceManager {
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self::with_clock(client, Arc::new(LocalClock))
    }

    pub fn with_clock(client: Arc<RpcClient>, clock: Arc<dyn Clock>) -> Self {
        Self { client, clock }
    }

    /// The employee's open record, if they are on the clock.
    #[instrument(skip_all, fields(employee_id = %employee_id))]
    pub async fn get_current_attendance(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Option<Attendance>> {
        require_employee_id(employee_id)?;

        let domain = Domain::new()
            .and("employee_id", Operator::Eq, employee_id.get())
            .and("check_out", Operator::Eq, false);
        let options = SearchOptions::default()
            .limit(1)
            .order(Order::desc("check_in"));

        let rows: Vec<Attendance> = self
            .client
            .search_read(Attendance::MODEL, &domain, Attendance::OPEN_FIELDS, &options)
            .await
            .map_err(|e| {
                error!(error = %e, "Error getting current attendance");
                Error::service(STATUS_FAILED)(e)
            })?;

        Ok(rows.into_iter().next())
    }

    /// Open a new record stamped with the current local time.
    #[instrument(skip_all, fields(employee_id = %employee_id))]
    pub async fn check_in(&self, employee_id: EmployeeId) -> Result<AttendanceId> {
        require_employee_id(employee_id)?;

        if let Some(open) = self.get_current_attendance(employee_id).await? {
            info!(attendance_id = %open.id, "Already checked in");
            return Err(Error::AlreadyCheckedIn);
        }

        let check_in = self.clock.now();
        let id = self
            .client
            .create(
                Attendance::MODEL,
                &NewAttendance {
                    employee_id,
                    check_in,
                },
            )
            .await
            .map_err(|e| {
                error!(error = %e, "Check-in failed");
                Error::service(CHECK_IN_FAILED)(e)
            })?;

        let id = AttendanceId(id);
        info!(attendance_id = %id, check_in = %format_server_timestamp(check_in), "Checked in");
        Ok(id)
    }

    /// Stamp `check_out` on the record with the current local time.
    ///
    /// The record is not re-read first: calling this twice moves the
    /// check-out time to the second call. See [`check_out_open`](Self::check_out_open)
    /// for the verified variant.
    #[instrument(skip_all, fields(attendance_id = %attendance_id))]
    pub async fn check_out(&self, attendance_id: AttendanceId) -> Result<bool> {
        require_attendance_id(attendance_id)?;
        self.close(attendance_id).await
    }

    /// Like [`check_out`](Self::check_out) but fails with `Conflict` unless the
    /// record still exists and is open.
    #[instrument(skip_all, fields(attendance_id = %attendance_id))]
    pub async fn check_out_open(&self, attendance_id: AttendanceId) -> Result<bool> {
        require_attendance_id(attendance_id)?;

        let rows: Vec<Attendance> = self
            .client
            .read(Attendance::MODEL, &[attendance_id.get()], Attendance::HISTORY_FIELDS)
            .await
            .map_err(Error::service(CHECK_OUT_FAILED))?;

        match rows.first() {
            Some(record) if record.is_open() => self.close(attendance_id).await,
            _ => {
                warn!("Check-out refused: record already closed or missing");
                Err(Error::Conflict(attendance_id))
            }
        }
    }

    async fn close(&self, attendance_id: AttendanceId) -> Result<bool> {
        let check_out = self.clock.now();
        self.client
            .write(
                Attendance::MODEL,
                &[attendance_id.get()],
                &CloseAttendance { check_out },
            )
            .await
            .map_err(|e| {
                error!(error = %e, "Check-out failed");
                Error::service(CHECK_OUT_FAILED)(e)
            })?;

        info!(check_out = %format_server_timestamp(check_out), "Checked out");
        Ok(true)
    }

    /// Records newest first, optionally bounded on check-in time.
    #[instrument(skip_all, fields(employee_id = %employee_id))]
    pub async fn get_attendance_history(
        &self,
        employee_id: EmployeeId,
        limit: u32,
        filter: Option<DateFilter>,
    ) -> Result<Vec<Attendance>> {
        require_employee_id(employee_id)?;

        let mut domain = Domain::new().and("employee_id", Operator::Eq, employee_id.get());
        if let Some(filter) = filter {
            if let Some(from) = filter.from {
                domain.push("check_in", Operator::Ge, format_server_timestamp(from));
            }
            if let Some(to) = filter.to {
                domain.push("check_in", Operator::Le, format_server_timestamp(to));
            }
        }
        let options = SearchOptions::default()
            .limit(limit)
            .order(Order::desc("check_in"));

        let records: Vec<Attendance> = self
            .client
            .search_read(Attendance::MODEL, &domain, Attendance::HISTORY_FIELDS, &options)
            .await
            .map_err(|e| {
                error!(error = %e, "Error fetching attendance history");
                Error::service(HISTORY_FAILED)(e)
            })?;

        debug!(count = records.len(), "History fetched");
        Ok(records)
    }

    /// Hours since Monday 00:00 local time. Recomputed on every call.
    #[instrument(skip_all, fields(employee_id = %employee_id))]
    pub async fn get_weekly_summary(&self, employee_id: EmployeeId) -> Result<WeeklySummary> {
        require_employee_id(employee_id)?;

        let monday = week_start(self.clock.now());
        let domain = Domain::new()
            .and("employee_id", Operator::Eq, employee_id.get())
            .and("check_in", Operator::Ge, format_server_timestamp(monday));
        let options = SearchOptions::default().order(Order::asc("check_in"));

        let records: Vec<Attendance> = self
            .client
            .search_read(Attendance::MODEL, &domain, Attendance::SUMMARY_FIELDS, &options)
            .await
            .map_err(|e| {
                error!(error = %e, "Error fetching weekly summary");
                Error::service(SUMMARY_FAILED)(e)
            })?;

        Ok(summarize(monday.date(), records))
    }

    /// Current status and weekly summary, fetched concurrently.
    pub async fn refresh(&self, employee_id: EmployeeId) -> Result<HomeState> {
        let (current, weekly) = futures::try_join!(
            self.get_current_attendance(employee_id),
            self.get_weekly_summary(employee_id),
        )?;
        Ok(HomeState { current, weekly })
    }
}

fn summarize(week_start: chrono::NaiveDate, records: Vec<Attendance>) -> WeeklySummary {
    let total: f64 = records.iter().map(|r| r.worked_hours.unwrap_or(0.0)).sum();
    WeeklySummary {
        week_start,
        total_hours: round_hours(total),
        record_count: records.len(),
        records,
    }
}

fn require_employee_id(id: EmployeeId) -> Result<()> {
    if id.is_valid() {
        Ok(())
    } else {
        Err(Error::Validation("Employee ID is required".to_string()))
    }
}

fn require_attendance_id(id: AttendanceId) -> Result<()> {
    if id.is_valid() {
        Ok(())
    } else {
        Err(Error::Validation("Attendance ID is required".to_string()))
    }
}
