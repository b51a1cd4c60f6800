// Host records observed by the exporter

use serde::{Deserialize, Serialize};

/// A user-authored SQL statement saved in the host application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedQuery {
    pub id: i64,
    pub label: String,
    pub sql: String,
}

/// A SQL-backed table definition managed by the host
///
/// Physical tables carry no SQL; only virtual datasets do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub table_name: String,
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub schema_perm: Option<String>,
}

impl SavedQuery {
    pub fn new(id: i64, label: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            sql: sql.into(),
        }
    }
}

impl Dataset {
    pub fn new(
        table_name: impl Into<String>,
        sql: impl Into<String>,
        schema_perm: Option<&str>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            sql: Some(sql.into()),
            schema_perm: schema_perm.map(str::to_string),
        }
    }

    /// Dataset backed by a physical table (no SQL)
    pub fn physical(table_name: impl Into<String>, schema_perm: Option<&str>) -> Self {
        Self {
            table_name: table_name.into(),
            sql: None,
            schema_perm: schema_perm.map(str::to_string),
        }
    }

    /// True when this dataset belongs to the given schema scope
    pub fn in_schema(&self, schema_perm: &str) -> bool {
        self.schema_perm.as_deref() == Some(schema_perm)
    }
}
