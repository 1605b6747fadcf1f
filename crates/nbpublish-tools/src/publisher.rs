//! Publisher trait.

use async_trait::async_trait;

use crate::error::PublishError;
use crate::outcome::PublishOutcome;
use crate::request::PublishRequest;

/// A backend that turns a notebook into a post on the platform.
///
/// Implementations return the backend's response unchanged and surface its
/// failures without translating them.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publisher name (e.g., "python").
    fn name(&self) -> &'static str;

    /// Publish the notebook described by `request`.
    async fn publish(&self, request: &PublishRequest) -> Result<PublishOutcome, PublishError>;
}

