use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A predefined subscription offer shown in the storefront
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Package {
    pub id: i64,
    pub name: String,
    pub data_gb: i64,
    pub days: i64,
    pub price: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Operator-editable fields of a package
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageDraft {
    pub name: String,
    pub data_gb: i64,
    pub days: i64,
    pub price: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl PackageDraft {
    /// Returns a description of the first invalid field, if any
    pub fn problem(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            return Some("name is required");
        }
        if self.data_gb < 0 {
            return Some("data_gb must not be negative");
        }
        if self.days < 0 {
            return Some("days must not be negative");
        }
        if self.price < 0 {
            return Some("price must not be negative");
        }
        None
    }
}
