//! Message delivery seam.

use async_trait::async_trait;

/// Delivers a text message to a target (e.g. a Telegram chat id).
///
/// `send` never fails loudly: any problem (network, API error, missing
/// credentials) is reported as `false` and logged by the implementation.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    /// Returns `true` only when delivery was confirmed.
    async fn send(&self, target: &str, text: &str) -> bool;
}
