//! Email delivery — async SMTP sending via lettre.
//!
//! One transport is built at startup and shared by every send. Supports
//! Gmail, Outlook, and custom STARTTLS relays.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use signalist_core::config::EmailConfig;
use signalist_core::error::{Result, SignalistError};
use signalist_core::traits::mailer::{Mailer, NewsSummaryEmail, WelcomeEmail};

use crate::templates;

pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let from = from_mailbox(config)?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| SignalistError::Config(format!("SMTP relay: {e}")))?
            .port(config.smtp_port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        tracing::info!(
            "📮 SMTP mailer ready: {}:{} as {}",
            config.smtp_host,
            config.smtp_port,
            from
        );
        Ok(Self {
            from,
            transport: builder.build(),
        })
    }

    async fn send_html(&self, to: &str, subject: &str, html: String) -> Result<bool> {
        let message = build_message(&self.from, to, subject, html)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| SignalistError::Mail(format!("SMTP send to {to}: {e}")))?;
        tracing::info!("📤 Email sent to: {to}");
        Ok(true)
    }
}

fn from_mailbox(config: &EmailConfig) -> Result<Mailbox> {
    let address = if config.from_address.is_empty() {
        &config.username
    } else {
        &config.from_address
    };
    if address.is_empty() {
        return Err(SignalistError::Config(
            "email.from_address (or SMTP username) is required".into(),
        ));
    }
    format!("{} <{}>", config.from_name, address)
        .parse()
        .map_err(|e| SignalistError::Config(format!("Invalid from: {e}")))
}

fn build_message(from: &Mailbox, to: &str, subject: &str, html: String) -> Result<Message> {
    let to_mailbox: Mailbox = to
        .parse()
        .map_err(|e| SignalistError::Mail(format!("Invalid to '{to}': {e}")))?;
    let plain = templates::strip_html(&html);
    Message::builder()
        .from(from.clone())
        .to(to_mailbox)
        .subject(subject)
        .multipart(MultiPart::alternative_plain_html(plain, html))
        .map_err(|e| SignalistError::Mail(format!("Build email: {e}")))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_welcome_email(&self, email: &WelcomeEmail) -> Result<bool> {
        self.send_html(&email.email, templates::WELCOME_SUBJECT, templates::welcome_html(email))
            .await
    }

    async fn send_news_summary_email(&self, email: &NewsSummaryEmail) -> Result<bool> {
        self.send_html(
            &email.email,
            &templates::news_subject(&email.date),
            templates::news_summary_html(email),
        )
        .await
    }
}

/// Renders emails and logs them instead of sending. Used for dry runs.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_welcome_email(&self, email: &WelcomeEmail) -> Result<bool> {
        let html = templates::welcome_html(email);
        tracing::info!("📝 [dry-run] welcome email to {} ({} bytes)", email.email, html.len());
        tracing::debug!("{}", templates::strip_html(&html));
        Ok(true)
    }

    async fn send_news_summary_email(&self, email: &NewsSummaryEmail) -> Result<bool> {
        let html = templates::news_summary_html(email);
        tracing::info!(
            "📝 [dry-run] news summary to {} for {} ({} bytes)",
            email.email,
            email.date,
            html.len()
        );
        tracing::debug!("{}", templates::strip_html(&html));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            from_address: "news@signalist.test".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_mailbox_falls_back_to_username() {
        let mut cfg = EmailConfig {
            username: "bot@signalist.test".into(),
            ..Default::default()
        };
        assert_eq!(from_mailbox(&cfg).unwrap().email.to_string(), "bot@signalist.test");
        cfg.username.clear();
        assert!(matches!(from_mailbox(&cfg), Err(SignalistError::Config(_))));
    }

    #[test]
    fn test_build_message() {
        let from = from_mailbox(&config()).unwrap();
        let message = build_message(&from, "ada@example.com", "Hello", "<p>Hi</p>".into()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: ada@example.com"));
        assert!(raw.contains("Subject: Hello"));
        assert!(raw.contains("multipart/alternative"));
    }

    #[test]
    fn test_invalid_recipient_is_mail_error() {
        let from = from_mailbox(&config()).unwrap();
        let err = build_message(&from, "not an address", "x", String::new()).unwrap_err();
        assert!(matches!(err, SignalistError::Mail(_)));
    }

    #[tokio::test]
    async fn test_log_mailer_reports_sent() {
        let mailer = LogMailer;
        let sent = mailer
            .send_welcome_email(&WelcomeEmail {
                email: "a@example.com".into(),
                name: "A".into(),
                intro: "<p>hi</p>".into(),
            })
            .await
            .unwrap();
        assert!(sent);
    }
}
