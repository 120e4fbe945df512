use derive_more::{Display, From};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server-side id of a `res.users` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Server-side id of an `hr.employee` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(pub i64);

/// Server-side id of an `hr.attendance` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttendanceId(pub i64);

macro_rules! impl_id {
    ($($ty:ty),*) => {$(
        impl $ty {
            pub fn get(self) -> i64 {
                self.0
            }

            /// Ids issued by the server are strictly positive.
            pub fn is_valid(self) -> bool {
                self.0 > 0
            }
        }
    )*};
}

impl_id!(UserId, EmployeeId, AttendanceId);

/// A many-to-one reference as the server renders it: `[id, "display name"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Many2One {
    pub id: i64,
    pub name: Option<String>,
}

impl Serialize for Many2One {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.id, &self.name).serialize(serializer)
    }
}

/// `false` and `null` both mean "no value" on the wire.
pub fn falsy_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Null | Value::Bool(false) => Ok(None),
        other => T::deserialize(other).map(Some).map_err(de::Error::custom),
    }
}

/// Accepts `[id, "name"]`, a bare `id`, `false` or `null`.
pub fn many2one<'de, D>(deserializer: D) -> Result<Option<Many2One>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null | Value::Bool(false) => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .map(|id| Some(Many2One { id, name: None }))
            .ok_or_else(|| de::Error::custom("many2one id must be an integer")),
        Value::Array(items) => {
            let id = items
                .first()
                .and_then(Value::as_i64)
                .ok_or_else(|| de::Error::custom("many2one pair must start with an integer id"))?;
            let name = items.get(1).and_then(Value::as_str).map(str::to_string);
            Ok(Some(Many2One { id, name }))
        }
        other => Err(de::Error::custom(format!(
            "unexpected many2one value: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "many2one")]
        department_id: Option<Many2One>,
        #[serde(default, deserialize_with = "falsy_as_none")]
        worked_hours: Option<f64>,
    }

    #[test]
    fn many2one_accepts_every_wire_form() {
        let row: Row = serde_json::from_value(json!({ "department_id": [3, "Sales"] })).unwrap();
        assert_eq!(
            row.department_id,
            Some(Many2One { id: 3, name: Some("Sales".into()) })
        );

        let row: Row = serde_json::from_value(json!({ "department_id": 3 })).unwrap();
        assert_eq!(row.department_id.map(|d| d.id), Some(3));

        let row: Row = serde_json::from_value(json!({ "department_id": false })).unwrap();
        assert!(row.department_id.is_none());

        let row: Row = serde_json::from_value(json!({})).unwrap();
        assert!(row.department_id.is_none());
    }

    #[test]
    fn false_means_missing() {
        let row: Row = serde_json::from_value(json!({ "worked_hours": false })).unwrap();
        assert!(row.worked_hours.is_none());

        let row: Row = serde_json::from_value(json!({ "worked_hours": 7.5 })).unwrap();
        assert_eq!(row.worked_hours, Some(7.5));
    }

    #[test]
    fn ids_reject_non_positive() {
        assert!(EmployeeId(4).is_valid());
        assert!(!EmployeeId(0).is_valid());
        assert!(!AttendanceId(-1).is_valid());
        assert_eq!(UserId(9).to_string(), "9");
    }
}
