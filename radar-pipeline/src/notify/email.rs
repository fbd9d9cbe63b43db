//! Email delivery
//!
//! [`EmailNotifier`] renders a plain-text digest of new jobs and hands it to
//! a [`MailSender`]. [`SmtpMailer`] is the lettre-backed sender.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use radar_core::domain::job::Job;
use tracing::{debug, info};

use super::Notifier;
use crate::config::EmailConfig;
use crate::error::NotifyError;

pub const DEFAULT_SUBJECT: &str = "New remote jobs";

/// A rendered email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Mail transport
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), NotifyError>;
}

// =============================================================================
// Notifier
// =============================================================================

/// Mails new jobs to the configured recipients
#[derive(Clone)]
pub struct EmailNotifier {
    from: String,
    to: Vec<String>,
    subject: String,
    sender: Arc<dyn MailSender>,
}

impl EmailNotifier {
    pub fn new(config: &EmailConfig, sender: Arc<dyn MailSender>) -> Self {
        let subject = match config.subject.trim() {
            "" => DEFAULT_SUBJECT.to_string(),
            subject => subject.to_string(),
        };

        Self {
            from: config.from.clone(),
            to: config.recipients(),
            subject,
            sender,
        }
    }

    /// Same sender and subject, addressed to a single recipient
    pub fn for_recipient(&self, to: &str) -> Self {
        Self {
            to: vec![to.to_string()],
            ..self.clone()
        }
    }

    fn render(&self, jobs: &[Job]) -> EmailMessage {
        let mut body = String::from("New remote jobs:\n");
        for job in jobs {
            body.push_str(&format!("- {} ({}) {}\n", job.title, job.source, job.url));
        }

        EmailMessage {
            from: self.from.clone(),
            to: self.to.clone(),
            subject: self.subject.clone(),
            body,
        }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, jobs: &[Job]) -> Result<(), NotifyError> {
        if jobs.is_empty() {
            return Ok(());
        }

        debug!("Mailing {} job(s) to {}", jobs.len(), self.to.join(","));
        self.sender.send(self.render(jobs)).await
    }
}

// =============================================================================
// SMTP
// =============================================================================

/// SMTP sender backed by lettre
///
/// The connection is opened lazily on the first send.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self, NotifyError> {
        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| NotifyError::Transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let mut builder = builder.port(config.port);

        if !config.username.is_empty() && !config.password.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        debug!("SMTP mailer initialized for {}:{}", config.host, config.port);

        Ok(Self {
            transport: builder.build(),
        })
    }
}

/// Converts a rendered email into a lettre message
fn build_message(message: &EmailMessage) -> Result<Message, NotifyError> {
    let from: Mailbox = message
        .from
        .parse()
        .map_err(|e| NotifyError::Message(format!("invalid sender {}: {}", message.from, e)))?;

    let mut builder = Message::builder().from(from).subject(message.subject.clone());
    for to in &message.to {
        let mailbox: Mailbox = to
            .parse()
            .map_err(|e| NotifyError::Message(format!("invalid recipient {}: {}", to, e)))?;
        builder = builder.to(mailbox);
    }

    builder
        .header(ContentType::TEXT_PLAIN)
        .body(message.body.clone())
        .map_err(|e| NotifyError::Message(e.to_string()))
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), NotifyError> {
        let email = build_message(&message)?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        info!("Sent \"{}\" to {}", message.subject, message.to.join(","));
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records messages instead of sending them
    #[derive(Default)]
    pub(crate) struct RecordingSender {
        pub messages: Mutex<Vec<EmailMessage>>,
        pub fail: bool,
    }

    #[async_trait]
    impl MailSender for RecordingSender {
        async fn send(&self, message: EmailMessage) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::Transport("connection refused".to_string()));
            }
            self.messages.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn job(title: &str, url: &str) -> Job {
        Job {
            id: title.to_string(),
            title: title.to_string(),
            source: "eleduck".to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    fn config() -> EmailConfig {
        EmailConfig {
            host: "smtp.example.com".to_string(),
            from: "radar@example.com".to_string(),
            to: vec!["team@example.com".to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_email_notifier_renders_digest() {
        let sender = Arc::new(RecordingSender::default());
        let notifier = EmailNotifier::new(&config(), sender.clone());

        notifier
            .notify(&[job("Go Dev", "https://a/1"), job("Rust Dev", "https://a/2")])
            .await
            .unwrap();

        let messages = sender.messages.lock().unwrap();
        assert_eq!(
            *messages,
            vec![EmailMessage {
                from: "radar@example.com".to_string(),
                to: vec!["team@example.com".to_string()],
                subject: DEFAULT_SUBJECT.to_string(),
                body: "New remote jobs:\n- Go Dev (eleduck) https://a/1\n- Rust Dev (eleduck) https://a/2\n"
                    .to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_email_notifier_skips_empty_batches() {
        let sender = Arc::new(RecordingSender::default());
        let notifier = EmailNotifier::new(&config(), sender.clone());

        notifier.notify(&[]).await.unwrap();
        assert!(sender.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_for_recipient_keeps_subject() {
        let sender = Arc::new(RecordingSender::default());
        let mut config = config();
        config.subject = "Daily digest".to_string();
        let notifier = EmailNotifier::new(&config, sender.clone()).for_recipient("me@example.com");

        notifier.notify(&[job("Go Dev", "https://a/1")]).await.unwrap();

        let messages = sender.messages.lock().unwrap();
        assert_eq!(messages[0].to, vec!["me@example.com"]);
        assert_eq!(messages[0].subject, "Daily digest");
    }

    #[test]
    fn test_build_message() {
        let message = EmailMessage {
            from: "radar@example.com".to_string(),
            to: vec!["a@example.com".to_string(), "b@example.com".to_string()],
            subject: DEFAULT_SUBJECT.to_string(),
            body: "New remote jobs:\n".to_string(),
        };
        let formatted = String::from_utf8(build_message(&message).unwrap().formatted()).unwrap();
        assert!(formatted.contains("Subject: New remote jobs"));
        assert!(formatted.contains("a@example.com"));
        assert!(formatted.contains("b@example.com"));

        let invalid = EmailMessage {
            from: "not an address".to_string(),
            ..message
        };
        assert!(matches!(
            build_message(&invalid),
            Err(NotifyError::Message(_))
        ));
    }

    #[tokio::test]
    async fn test_smtp_mailer_builds_without_connecting() {
        let config = EmailConfig {
            starttls: false,
            username: "user".to_string(),
            password: "secret".to_string(),
            ..config()
        };
        assert!(SmtpMailer::new(&config).is_ok());
    }
}
