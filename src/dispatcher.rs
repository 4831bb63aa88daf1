//! Fan-out of the intercom report after a directory change.
//!
//! One dispatch builds the workbook once and mails it to every employee with
//! a contact address, in store order. The first transport failure aborts the
//! run and is returned to the caller; nothing is retried.

use crate::directory::ExtensionSavedHook;
use crate::error::DispatchError;
use crate::mail::{MailAttachment, MailTransport, OutgoingMessage};
use crate::metrics::METRICS;
use crate::model::{Extension, Recipient};
use crate::report::{REPORT_CONTENT_TYPE, generate_report};
use crate::store::DirectoryStore;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

pub const SUBJECT_UPDATED: &str = "Intercom Details Updated";
pub const SUBJECT_CREATED: &str = "New Intercom Details Created";
pub const PLAIN_TEXT_BODY: &str = "Please view this email in HTML format.";

pub fn subject_for(was_update: bool) -> &'static str {
    if was_update {
        SUBJECT_UPDATED
    } else {
        SUBJECT_CREATED
    }
}

/// Personalised HTML body.
pub fn html_body(recipient_name: &str, signature: &str) -> String {
    format!(
        "Hello {},<br><br>\n\
         Please check the updated intercom list attached.<br><br>\n\
         Regards,<br>\n\
         {}",
        escape_html(recipient_name),
        escape_html(signature)
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSummary {
    pub subject: &'static str,
    pub recipients_notified: usize,
    pub report_bytes: usize,
}

pub struct NotificationDispatcher {
    store: Arc<dyn DirectoryStore>,
    transport: Arc<dyn MailTransport>,
    from_address: String,
    signature: String,
    clock: Clock,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn DirectoryStore>,
        transport: Arc<dyn MailTransport>,
        from_address: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            store,
            transport,
            from_address: from_address.into(),
            signature: signature.into(),
            clock: Arc::new(|| Utc::now().date_naive()),
        }
    }

    /// Replaces the source of "today" used for the header and filename.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    #[instrument(skip(self), fields(transport = self.transport.name()))]
    pub async fn dispatch(&self, was_update: bool) -> Result<DispatchSummary, DispatchError> {
        let today = (self.clock)();
        let subject = subject_for(was_update);

        let started = Instant::now();
        let rows = self.store.extension_rows();
        let mut document = generate_report(&rows, today)?;
        METRICS.record_report(started.elapsed());

        let filename = document.filename();
        let recipients = self.store.recipients();
        let mut notified = 0;

        for recipient in &recipients {
            let bytes = document.read_all().map_err(DispatchError::Attachment)?;
            let message = self.compose(recipient, subject, &filename, bytes);

            if let Err(source) = self.transport.send(&message).await {
                METRICS.record_notification_failure();
                warn!(
                    recipient = %recipient.email,
                    notified,
                    remaining = recipients.len() - notified - 1,
                    error = %source,
                    "notification aborted"
                );
                return Err(DispatchError::Mail {
                    recipient: recipient.email.clone(),
                    source,
                });
            }

            METRICS.record_notification_sent();
            notified += 1;
            document.rewind();
        }

        info!(
            subject,
            recipients = notified,
            entries = document.entries(),
            report_bytes = document.len(),
            "intercom report dispatched"
        );

        Ok(DispatchSummary {
            subject,
            recipients_notified: notified,
            report_bytes: document.len(),
        })
    }

    fn compose(
        &self,
        recipient: &Recipient,
        subject: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> OutgoingMessage {
        OutgoingMessage {
            from: self.from_address.clone(),
            to: recipient.email.clone(),
            subject: subject.to_string(),
            text_body: PLAIN_TEXT_BODY.to_string(),
            html_body: html_body(&recipient.name, &self.signature),
            attachment: Some(MailAttachment {
                filename: filename.to_string(),
                content_type: REPORT_CONTENT_TYPE.to_string(),
                bytes,
            }),
        }
    }
}

#[async_trait]
impl ExtensionSavedHook for NotificationDispatcher {
    async fn on_extension_saved(
        &self,
        _record: &Extension,
        was_update: bool,
    ) -> Result<(), DispatchError> {
        self.dispatch(was_update).await.map(|_| ())
    }

    fn name(&self) -> &'static str {
        "notification_dispatcher"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_depends_on_update_flag() {
        assert_eq!(subject_for(true), "Intercom Details Updated");
        assert_eq!(subject_for(false), "New Intercom Details Created");
    }

    #[test]
    fn body_greets_by_escaped_name() {
        let body = html_body("Ann <Ops>", "DKC Exports");
        assert!(body.starts_with("Hello Ann &lt;Ops&gt;,<br><br>"));
        assert!(body.contains("Please check the updated intercom list attached."));
        assert!(body.ends_with("DKC Exports"));
    }
}
