use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(pub u64);

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtensionId(pub u64);

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A person listed in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    /// Contact address; empty when the employee should not receive mail.
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn has_contact_address(&self) -> bool {
        !self.email.is_empty()
    }
}

/// An extension number assigned to exactly one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    pub id: ExtensionId,
    pub employee_id: EmployeeId,
    pub code: String,
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl NewEmployee {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            is_active: true,
        }
    }
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Form submitted when creating or editing an extension.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtensionInput {
    pub employee_id: EmployeeId,
    pub code: String,
    #[serde(default)]
    pub status: bool,
}

impl ExtensionInput {
    pub fn new(employee_id: EmployeeId, code: impl Into<String>) -> Self {
        Self {
            employee_id,
            code: code.into(),
            status: false,
        }
    }
}

/// Extension joined with its employee's name, as consumed by the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRow {
    pub code: String,
    pub employee_name: Option<String>,
}

impl ExtensionRow {
    pub fn new(code: impl Into<String>, employee_name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            employee_name: Some(employee_name.into()),
        }
    }

    /// Cell text: code on the first line, name on the second.
    pub fn cell_text(&self) -> String {
        format!(
            "{}\n{}",
            self.code,
            self.employee_name.as_deref().unwrap_or_default()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub name: String,
    pub email: String,
}

/// One row of the admin extension list.
#[derive(Debug, Clone, Serialize)]
pub struct ExtensionListing {
    pub id: ExtensionId,
    pub employee_id: EmployeeId,
    pub employee: String,
    pub extension: String,
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Whether a persisted extension was newly created or edited in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveKind {
    Created,
    Updated,
}

impl SaveKind {
    pub fn was_update(self) -> bool {
        matches!(self, SaveKind::Updated)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SaveKind::Created => "created",
            SaveKind::Updated => "updated",
        }
    }
}

/// Directory seed document loaded at startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub employees: Vec<SeedEmployee>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedEmployee {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub extension: Option<SeedExtension>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedExtension {
    pub code: String,
    #[serde(default)]
    pub status: bool,
}

fn default_true() -> bool {
    true
}
