use serde::{Deserialize, Serialize};

use crate::models::{EmployeeId, UserId};

/// Everything needed to resume a login without asking for the password
/// again. Persisted as one JSON blob through the session store.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub url: String,
    pub db: String,
    pub uid: UserId,
    pub password: String,
    pub employee_id: Option<EmployeeId>,
    pub employee_name: String,
}

impl std::fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRecord")
            .field("url", &self.url)
            .field("db", &self.db)
            .field("uid", &self.uid)
            .field("employee_id", &self.employee_id)
            .field("employee_name", &self.employee_name)
            .finish_non_exhaustive()
    }
}

/// Lenient view of a stored blob; older or truncated blobs may lack fields.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    url: Option<String>,
    #[serde(default)]
    db: Option<String>,
    uid: Option<UserId>,
    password: Option<String>,
    #[serde(default)]
    employee_id: Option<EmployeeId>,
    #[serde(default)]
    employee_name: Option<String>,
}

impl SessionRecord {
    pub fn to_blob(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// `None` unless the blob parses and carries an address, a user id and a
    /// credential.
    pub fn from_blob(blob: &str) -> Option<Self> {
        let stored: StoredSession = serde_json::from_str(blob).ok()?;
        let url = stored.url.filter(|u| !u.is_empty())?;
        let uid = stored.uid.filter(|u| u.is_valid())?;
        let password = stored.password.filter(|p| !p.is_empty())?;

        Some(Self {
            url,
            db: stored.db.unwrap_or_default(),
            uid,
            password,
            employee_id: stored.employee_id.filter(|id| id.is_valid()),
            employee_name: stored.employee_name.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SessionRecord {
        SessionRecord {
            url: "https://erp.example.com".into(),
            db: "prod".into(),
            uid: UserId(2),
            password: "s3cret".into(),
            employee_id: Some(EmployeeId(5)),
            employee_name: "Ana Ruiz".into(),
        }
    }

    #[test]
    fn blob_uses_camel_case_keys() {
        let blob = record().to_blob().unwrap();
        assert!(blob.contains("\"employeeId\":5"));
        assert!(blob.contains("\"employeeName\":\"Ana Ruiz\""));
        assert_eq!(SessionRecord::from_blob(&blob), Some(record()));
    }

    #[test]
    fn incomplete_blobs_are_rejected() {
        assert!(SessionRecord::from_blob(r#"{"url":"https://erp","uid":2}"#).is_none());
        assert!(SessionRecord::from_blob(r#"{"uid":2,"password":"pw"}"#).is_none());
        assert!(SessionRecord::from_blob(r#"{"url":"https://erp","password":"pw"}"#).is_none());
        assert!(SessionRecord::from_blob("not json").is_none());
    }

    #[test]
    fn user_only_session_round_trips() {
        let blob = r#"{"url":"https://erp","db":"prod","uid":2,"password":"pw","employeeId":null,"employeeName":"a@b.c"}"#;
        let record = SessionRecord::from_blob(blob).unwrap();
        assert!(record.employee_id.is_none());
        assert_eq!(record.employee_name, "a@b.c");
    }

    #[test]
    fn debug_hides_password() {
        assert!(!format!("{:?}", record()).contains("s3cret"));
    }
}
