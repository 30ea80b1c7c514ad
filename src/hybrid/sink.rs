//! Secondary publish sink

use crate::broker::api::Message;
use crate::hybrid::error::SinkError;
use async_trait::async_trait;

/// A destination that receives a copy of every published message
///
/// Failures are reported to the caller, which logs them; they never fail the
/// in-memory publish.
#[async_trait]
pub trait SecondarySink: Send + Sync {
    /// Short name used in logs and status reports
    fn name(&self) -> &str;

    async fn publish(&self, topic: &str, message: &Message) -> Result<(), SinkError>;
}
