#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use intercom_directory::model::{EmployeeId, ExtensionInput, NewEmployee};
use intercom_directory::{
    Directory, InMemoryDirectoryStore, MailError, MailTransport, NotificationDispatcher,
    OutgoingMessage, ServerConfig,
};
use intercom_directory::state::AppState;
use parking_lot::Mutex;
use umya_spreadsheet::Spreadsheet;

pub const SENDER: &str = "directory@example.com";
pub const SIGNATURE: &str = "DKC Exports";

pub fn report_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date")
}

/// Parses report bytes back into a workbook.
pub fn read_workbook(bytes: &[u8]) -> Spreadsheet {
    umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(bytes.to_vec()), true)
        .expect("readable workbook")
}

/// Records every message; optionally fails on the n-th send (1-based).
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<OutgoingMessage>>,
    attempts: Mutex<usize>,
    fail_on: Option<usize>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(attempt: usize) -> Self {
        Self {
            fail_on: Some(attempt),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), MailError> {
        let attempt = {
            let mut attempts = self.attempts.lock();
            *attempts += 1;
            *attempts
        };
        if self.fail_on == Some(attempt) {
            return Err(MailError::Rejected(format!("simulated failure for {}", message.to)));
        }
        self.sent.lock().push(message.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

pub struct Fixture {
    pub store: Arc<InMemoryDirectoryStore>,
    pub transport: Arc<RecordingTransport>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_transport(RecordingTransport::new())
    }

    pub fn with_transport(transport: RecordingTransport) -> Self {
        Self {
            store: Arc::new(InMemoryDirectoryStore::new()),
            transport: Arc::new(transport),
        }
    }

    pub fn employee(&self, name: &str, email: &str) -> EmployeeId {
        self.store
            .create_employee(NewEmployee::new(name, email))
            .expect("employee")
            .id
    }

    /// Adds an employee without email plus an extension, bypassing hooks.
    pub fn listed(&self, name: &str, code: &str) -> EmployeeId {
        let id = self.employee(name, "");
        self.store
            .create_extension(ExtensionInput::new(id, code))
            .expect("extension");
        id
    }

    pub fn dispatcher(&self) -> NotificationDispatcher {
        NotificationDispatcher::new(self.store.clone(), self.transport.clone(), SENDER, SIGNATURE)
            .with_clock(report_date)
    }

    pub fn directory(&self) -> Directory {
        Directory::new(self.store.clone()).on_extension_saved(Arc::new(self.dispatcher()))
    }

    pub fn app_state(&self) -> Arc<AppState> {
        let mut config = ServerConfig::default();
        config.mail.from_address = SENDER.to_string();
        Arc::new(AppState::with_parts(
            Arc::new(config),
            self.store.clone(),
            self.transport.clone(),
        ))
    }
}
