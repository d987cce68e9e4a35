// notifier/email.rs

use crate::model::NotifyError;
use crate::notifier::Notifier;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

/// Sends plain-text mail through a STARTTLS relay.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    recipient: Mailbox,
}

impl SmtpNotifier {
    pub fn new(
        server: &str,
        port: u16,
        username: &str,
        password: &str,
        sender: &str,
        recipient: &str,
    ) -> Result<Self, NotifyError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)?
            .port(port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Self {
            transport,
            sender: sender.parse()?,
            recipient: recipient.parse()?,
        })
    }

    fn message(&self, subject: &str, body: &str) -> Result<Message, NotifyError> {
        let message = Message::builder()
            .from(self.sender.clone())
            .to(self.recipient.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;
        Ok(message)
    }
}

#[async_trait::async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let message = self.message(subject, body)?;
        match self.transport.send(message).await {
            Ok(response) => {
                info!("✅ Email sent: '{}' [{}]", subject, response.code());
                Ok(())
            }
            Err(e) => {
                warn!("❌ Failed to send email '{}': {}", subject, e);
                Err(e.into())
            }
        }
    }
}
