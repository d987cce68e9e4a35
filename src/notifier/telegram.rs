// notifier/telegram.rs

use crate::model::NotifyError;
use crate::notifier::Notifier;
use reqwest::Client;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

pub struct TelegramNotifier {
    bot_token: String,
    chat_id: i64,
    client: Client,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: i64) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::ApiError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            bot_token,
            chat_id,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token)
    }
}

/// Subject and body folded into a single chat message.
fn render(subject: &str, body: &str) -> String {
    format!("📦 {}\n\n{}", subject, body)
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let params = [
            ("chat_id", self.chat_id.to_string()),
            ("text", render(subject, body)),
        ];

        let response = match timeout(
            Duration::from_secs(10),
            self.client.post(self.endpoint()).form(&params).send(),
        )
        .await
        {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                warn!("❌ Telegram send() failed: {:?}", e);
                return Err(NotifyError::ApiError(format!("Send failed: {}", e)));
            }
            Err(_) => {
                warn!("⏳ Telegram send() timed out");
                return Err(NotifyError::Unreachable);
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_else(|_| "unknown".into());
        if !status.is_success() {
            warn!("❌ Telegram API responded [{}]: {}", status, body);
            return Err(NotifyError::Unreachable);
        }
        info!("✅ Telegram message sent [{}]", status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_carries_subject_then_body() {
        assert_eq!(
            render("Data processed--Amazon--", "2 listings"),
            "📦 Data processed--Amazon--\n\n2 listings"
        );
    }

    #[test]
    fn endpoint_embeds_token() {
        let notifier = TelegramNotifier::new("123:abc".into(), 7).unwrap();
        assert_eq!(notifier.endpoint(), "https://api.telegram.org/bot123:abc/sendMessage");
    }
}
