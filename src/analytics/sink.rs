use super::ClickEvent;

/// Flush target for batched click events.
///
/// Sink failures are the recorder's problem (logged, retried on the next
/// flush); they never propagate toward the redirect path.
#[async_trait::async_trait]
pub trait ClickSink: Send + Sync {
    async fn flush_events(&self, events: Vec<ClickEvent>) -> anyhow::Result<()>;
}
