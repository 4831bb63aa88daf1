//! Outgoing mail.
//!
//! [`MailTransport`] abstracts delivery so the dispatcher can be driven by a
//! real SMTP relay in production and by recording doubles in tests.

use crate::config::{MailConfig, MailTransportKind, SmtpSecurity};
use crate::error::MailError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::response::Response;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tracing::{debug, info};

/// Named binary attachment with a declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A fully composed message, independent of the wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
    pub attachment: Option<MailAttachment>,
}

impl OutgoingMessage {
    /// `multipart/mixed` of a text/html alternative plus the attachment.
    pub fn to_mime(&self) -> Result<Message, MailError> {
        let builder = Message::builder()
            .from(parse_mailbox(&self.from)?)
            .to(parse_mailbox(&self.to)?)
            .subject(self.subject.clone());

        let alternative =
            MultiPart::alternative_plain_html(self.text_body.clone(), self.html_body.clone());

        let message = match &self.attachment {
            Some(attachment) => {
                let content_type = ContentType::parse(&attachment.content_type)
                    .map_err(|_| MailError::ContentType(attachment.content_type.clone()))?;
                let part = Attachment::new(attachment.filename.clone())
                    .body(attachment.bytes.clone(), content_type);
                builder.multipart(MultiPart::mixed().multipart(alternative).singlepart(part))?
            }
            None => builder.multipart(alternative)?,
        };
        Ok(message)
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse::<Mailbox>()
        .map_err(|source| MailError::InvalidAddress {
            address: address.to_string(),
            source,
        })
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Delivers one message or reports why it could not.
    async fn send(&self, message: &OutgoingMessage) -> Result<(), MailError>;

    fn name(&self) -> &'static str;
}

pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    relay: String,
}

impl SmtpMailTransport {
    pub fn from_config(config: &MailConfig) -> Result<Self> {
        let host = config
            .smtp_host
            .as_deref()
            .context("smtp transport requires an smtp host")?;

        let mut builder = match config.smtp_security {
            SmtpSecurity::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .with_context(|| format!("failed to configure STARTTLS relay {host}"))?,
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .with_context(|| format!("failed to configure TLS relay {host}"))?,
            SmtpSecurity::Plain => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
        };

        if let Some(port) = config.smtp_port {
            builder = builder.port(port);
        }
        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            relay: host.to_string(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), MailError> {
        let mime = message.to_mime()?;
        let response = self.transport.send(mime).await?;
        accept_response(&response)?;
        debug!(
            relay = %self.relay,
            to = %message.to,
            code = %response.code(),
            "smtp relay accepted message"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

/// Logs messages instead of delivering them.
#[derive(Debug, Default)]
pub struct LogMailTransport;

#[async_trait]
impl MailTransport for LogMailTransport {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), MailError> {
        // Build the MIME form anyway so bad addresses surface the same way.
        message.to_mime()?;
        info!(
            to = %message.to,
            subject = %message.subject,
            attachment = message.attachment.as_ref().map(|a| a.filename.as_str()),
            attachment_bytes = message.attachment.as_ref().map(|a| a.bytes.len()),
            "mail delivery skipped (log transport)"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

pub fn build_transport(config: &MailConfig) -> Result<Arc<dyn MailTransport>> {
    let transport: Arc<dyn MailTransport> = match config.transport {
        MailTransportKind::Smtp => Arc::new(SmtpMailTransport::from_config(config)?),
        MailTransportKind::Log => Arc::new(LogMailTransport),
    };
    info!(transport = transport.name(), "mail transport ready");
    Ok(transport)
}

/// Relays may answer DATA with a non-2xx reply without failing the session.
fn accept_response(response: &Response) -> Result<(), MailError> {
    if response.is_positive() {
        return Ok(());
    }
    Err(MailError::Rejected(format!(
        "{} {}",
        response.code(),
        response.first_line().unwrap_or_default()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use lettre::transport::smtp::response::{Category, Code, Detail, Severity};

    fn message() -> OutgoingMessage {
        OutgoingMessage {
            from: "directory@example.com".to_string(),
            to: "asha@example.com".to_string(),
            subject: "Intercom Details Updated".to_string(),
            text_body: "Please view this email in HTML format.".to_string(),
            html_body: "<p>Hello</p>".to_string(),
            attachment: Some(MailAttachment {
                filename: "Telecom_Report_01 Jan 2026.xlsx".to_string(),
                content_type: crate::report::REPORT_CONTENT_TYPE.to_string(),
                bytes: vec![0x50, 0x4b, 0x03, 0x04],
            }),
        }
    }

    #[test]
    fn mime_carries_subject_and_attachment_name() {
        let formatted = String::from_utf8(message().to_mime().unwrap().formatted()).unwrap();
        assert!(formatted.contains("Subject: Intercom Details Updated"));
        assert!(formatted.contains("multipart/mixed"));
        assert!(formatted.contains("multipart/alternative"));
        assert!(formatted.contains("Telecom_Report_01"));
        assert!(formatted.contains(crate::report::REPORT_CONTENT_TYPE));
    }

    #[test]
    fn bad_recipient_is_reported() {
        let mut msg = message();
        msg.to = "nobody".to_string();
        assert_matches!(msg.to_mime(), Err(MailError::InvalidAddress { address, .. }) if address == "nobody");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn log_transport_accepts_valid_messages() {
        LogMailTransport.send(&message()).await.expect("logged");
    }

    #[test]
    fn negative_relay_reply_is_a_rejection() {
        let busy = Response::new(
            Code::new(
                Severity::TransientNegativeCompletion,
                Category::MailSystem,
                Detail::Zero,
            ),
            vec!["mailbox busy".to_string()],
        );
        assert_matches!(
            accept_response(&busy),
            Err(MailError::Rejected(reason)) if reason == "450 mailbox busy"
        );

        let accepted = Response::new(
            Code::new(
                Severity::PositiveCompletion,
                Category::MailSystem,
                Detail::Zero,
            ),
            vec!["queued".to_string()],
        );
        assert!(accept_response(&accepted).is_ok());
    }
}
