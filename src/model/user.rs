use serde::{Deserialize, Serialize};

use crate::models::{UserId, falsy_as_none};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "falsy_as_none")]
    pub login: Option<String>,
}

impl User {
    pub const MODEL: &'static str = "res.users";
    pub const FIELDS: &'static [&'static str] = &["id", "name", "login"];
}
