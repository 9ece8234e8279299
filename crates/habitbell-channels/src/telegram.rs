//! Telegram Bot API notifier — `sendMessage` for habit reminders.

use async_trait::async_trait;
use habitbell_core::config::TelegramConfig;
use habitbell_core::error::{HabitBellError, Result};
use habitbell_core::traits::Notifier;
use serde::Deserialize;
use std::time::Duration;

/// Sends reminders through a Telegram bot.
///
/// The bot token is fixed at construction. Without a token (or with the
/// channel disabled) every send fails immediately without touching the network.
pub struct TelegramNotifier {
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("⚠️ Falling back to default HTTP client: {e}");
                reqwest::Client::new()
            });
        if !config.is_configured() {
            tracing::warn!("⚠️ Telegram bot token not configured — reminders will not be delivered");
        }
        Self { config, client }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token,
            method
        )
    }

    /// Send a text message to a chat.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        if !self.is_configured() {
            return Err(HabitBellError::Config("Telegram bot token is not set".into()));
        }

        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| HabitBellError::Channel(format!("sendMessage failed: {}", e.without_url())))?;

        let status = response.status();
        let result: TelegramApiResponse = response
            .json()
            .await
            .map_err(|e| HabitBellError::Channel(format!("Invalid send response ({status}): {}", e.without_url())))?;

        if !status.is_success() || !result.ok {
            return Err(HabitBellError::Channel(format!(
                "Telegram API error {status}: {}",
                result.description.unwrap_or_default()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, target: &str, text: &str) -> bool {
        if !self.is_configured() {
            tracing::debug!("Telegram disabled, dropping reminder for chat {target}");
            return false;
        }
        match self.send_message(target, text).await {
            Ok(()) => {
                tracing::info!("✅ Telegram reminder sent to chat {target}");
                true
            }
            Err(e) => {
                tracing::warn!("⚠️ Telegram reminder to chat {target} failed: {e}");
                false
            }
        }
    }
}

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct TelegramApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn config(api_base: &str, token: &str) -> TelegramConfig {
        TelegramConfig {
            bot_token: token.into(),
            enabled: true,
            api_base: api_base.into(),
            timeout_secs: 2,
        }
    }

    /// Serve one canned HTTP response and hand back the raw request.
    async fn one_shot_server(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length")
                                .then(|| v.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn test_missing_token_always_fails() {
        let notifier = TelegramNotifier::new(config("http://127.0.0.1:9", ""));
        assert!(!notifier.is_configured());
        assert!(!notifier.send("100", "hi").await);
        assert!(matches!(
            notifier.send_message("100", "hi").await,
            Err(HabitBellError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_disabled_channel_always_fails() {
        let mut cfg = config("http://127.0.0.1:9", "123:abc");
        cfg.enabled = false;
        assert!(!TelegramNotifier::new(cfg).send("100", "hi").await);
    }

    #[test]
    fn test_api_url() {
        let notifier = TelegramNotifier::new(config("https://api.telegram.org/", "123:abc"));
        assert_eq!(
            notifier.api_url("sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[tokio::test]
    async fn test_successful_send() {
        let (base, server) = one_shot_server("HTTP/1.1 200 OK", r#"{"ok":true,"result":{}}"#).await;
        let notifier = TelegramNotifier::new(config(&base, "123:abc"));

        assert!(notifier.send("4242", "⏰ Reminder: stretch").await);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /bot123:abc/sendMessage"));
        assert!(request.contains(r#""chat_id":"4242""#));
        assert!(request.contains("Reminder: stretch"));
    }

    #[tokio::test]
    async fn test_api_error_is_failure() {
        let (base, server) = one_shot_server(
            "HTTP/1.1 400 Bad Request",
            r#"{"ok":false,"description":"Bad Request: chat not found"}"#,
        )
        .await;
        let notifier = TelegramNotifier::new(config(&base, "123:abc"));

        let err = notifier.send_message("1", "hi").await.unwrap_err();
        assert!(err.to_string().contains("chat not found"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_api_is_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let notifier = TelegramNotifier::new(config(&format!("http://{addr}"), "123:abc"));
        assert!(!notifier.send("1", "hi").await);
    }
}
