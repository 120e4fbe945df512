use serde::{Deserialize, Serialize};

use crate::models::{EmployeeId, Many2One, many2one};

/// The person attendance is recorded for.
///
/// `id` is `None` when the logged-in user has no linked employee record; such
/// an account can browse but cannot clock in or out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: Option<EmployeeId>,
    pub name: String,
    #[serde(default, deserialize_with = "many2one")]
    pub department_id: Option<Many2One>,
    #[serde(default, deserialize_with = "many2one")]
    pub job_id: Option<Many2One>,
    #[serde(default)]
    pub user_only: bool,
}

impl Employee {
    pub const MODEL: &'static str = "hr.employee";
    pub const FIELDS: &'static [&'static str] = &["id", "name", "department_id", "job_id"];

    /// Stand-in for an account without an employee record.
    pub fn user_only(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            department_id: None,
            job_id: None,
            user_only: true,
        }
    }

    pub fn department(&self) -> Option<&str> {
        self.department_id.as_ref().and_then(|d| d.name.as_deref())
    }

    pub fn job(&self) -> Option<&str> {
        self.job_id.as_ref().and_then(|j| j.name.as_deref())
    }
}
