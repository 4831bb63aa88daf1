//! Error types for the directory service.
//!
//! Library code returns the typed enums below; the binary and configuration
//! edges use `anyhow`. Every enum maps onto an [`ErrorCode`] whose category is
//! reused for HTTP responses and metric labels.

use crate::model::{EmployeeId, ExtensionId};
use serde::Serialize;
use std::fmt;
use std::io;
use thiserror::Error;

pub use crate::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ValidationFailed,
    EmployeeNotFound,
    ExtensionNotFound,
    Conflict,
    ReportFailed,
    NotificationFailed,
}

impl ErrorCode {
    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "validation_error",
            ErrorCode::EmployeeNotFound | ErrorCode::ExtensionNotFound => "resource_not_found",
            ErrorCode::Conflict => "conflict",
            ErrorCode::ReportFailed => "server_error",
            ErrorCode::NotificationFailed => "upstream_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Failures while assembling or serializing the intercom workbook.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to create worksheet '{sheet}': {reason}")]
    Worksheet { sheet: String, reason: String },

    #[error("failed to serialize workbook: {0}")]
    Serialize(String),
}

/// Failures from the message transport.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid mailbox '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("invalid attachment content type '{0}'")]
    ContentType(String),

    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("smtp delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("transport rejected message: {0}")]
    Rejected(String),
}

/// Failures while fanning a report out to recipients.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("failed to read report attachment: {0}")]
    Attachment(#[source] io::Error),

    #[error("failed to notify {recipient}: {source}")]
    Mail {
        recipient: String,
        #[source]
        source: MailError,
    },
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("employee {0} not found")]
    EmployeeNotFound(EmployeeId),

    #[error("extension {0} not found")]
    ExtensionNotFound(ExtensionId),

    #[error("employee {employee_id} already has extension {existing}")]
    Conflict {
        employee_id: EmployeeId,
        existing: ExtensionId,
    },

    #[error(transparent)]
    Report(#[from] ReportError),

    /// The record was committed but a save hook failed afterwards.
    #[error("extension {extension_id} saved but notification failed: {source}")]
    Notification {
        extension_id: ExtensionId,
        #[source]
        source: DispatchError,
    },
}

impl DirectoryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DirectoryError::Validation(_) => ErrorCode::ValidationFailed,
            DirectoryError::EmployeeNotFound(_) => ErrorCode::EmployeeNotFound,
            DirectoryError::ExtensionNotFound(_) => ErrorCode::ExtensionNotFound,
            DirectoryError::Conflict { .. } => ErrorCode::Conflict,
            DirectoryError::Report(_) => ErrorCode::ReportFailed,
            DirectoryError::Notification { .. } => ErrorCode::NotificationFailed,
        }
    }
}
