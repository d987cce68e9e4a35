pub mod email;
pub mod telegram;

use crate::config::NotifierConfig;
use crate::model::NotifyError;
use tracing::info;

pub use email::SmtpNotifier;
pub use telegram::TelegramNotifier;

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Used when no delivery channel is configured; the message only reaches the log.
pub struct NoopNotifier;

#[async_trait::async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        info!("📭 {} | {}", subject, body.replace('\n', " | "));
        Ok(())
    }
}

/// Secrets kept out of the config file.
#[derive(Debug, Default, Clone)]
pub struct NotifierSecrets {
    pub smtp_password: Option<String>,
    pub telegram_bot_token: Option<String>,
}

pub fn build_notifier(
    config: &NotifierConfig,
    secrets: NotifierSecrets,
) -> Result<Box<dyn Notifier>, NotifyError> {
    match config {
        NotifierConfig::Smtp {
            server,
            port,
            username,
            sender,
            recipient,
        } => {
            let password = secrets
                .smtp_password
                .ok_or_else(|| NotifyError::ApiError("SMTP_PASSWORD is not set".into()))?;
            let notifier = SmtpNotifier::new(server, *port, username, &password, sender, recipient)?;
            Ok(Box::new(notifier))
        }
        NotifierConfig::Telegram { chat_id } => {
            let token = secrets
                .telegram_bot_token
                .ok_or_else(|| NotifyError::ApiError("TELEGRAM_BOT_TOKEN is not set".into()))?;
            Ok(Box::new(TelegramNotifier::new(token, *chat_id)?))
        }
        NotifierConfig::None => Ok(Box::new(NoopNotifier)),
    }
}
