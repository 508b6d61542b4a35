use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Theatre {
    pub theatre_id: i64,
    pub name: String,
    pub city: String,
    pub address: Option<String>,
}

/// Body of both theatre create and update.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TheatreRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[serde(default)]
    pub address: Option<String>,
}

impl TheatreRequest {
    /// Blank address is stored as NULL.
    pub fn normalized_address(&self) -> Option<String> {
        self.address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
    }
}
