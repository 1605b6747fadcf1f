//! Publish invocation.
//!
//! [`PublishInvoker`] performs exactly one publish call: it checks the token,
//! builds the [`PublishRequest`] from its fixed [`PublishOptions`] and hands it
//! to a [`Publisher`]. The token is an explicit argument; resolving it from the
//! process environment is left to the entry point via [`resolve_token`].

use std::path::PathBuf;

use crate::error::PublishError;
use crate::outcome::PublishOutcome;
use crate::publisher::Publisher;
use crate::request::{PublishOptions, PublishRequest};

/// Environment variable holding the integration token.
pub const DEFAULT_TOKEN_VAR: &str = "TOKEN";

/// Progress of a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Unstarted,
    Invoked,
    Succeeded,
    Failed,
}

/// Resolve the integration token through `lookup`.
///
/// Pass `|name| std::env::var(name).ok()` at the entry point. Unset and blank
/// values both count as missing.
pub fn resolve_token<F>(var: &str, lookup: F) -> Result<String, PublishError>
where
    F: FnOnce(&str) -> Option<String>,
{
    match lookup(var) {
        Some(token) if !token.trim().is_empty() => Ok(token),
        _ => Err(PublishError::MissingToken(var.to_string())),
    }
}

/// Runs one publish call with a fixed set of options.
pub struct PublishInvoker<P: Publisher> {
    publisher: P,
    options: PublishOptions,
    state: InvocationState,
}

impl<P: Publisher> PublishInvoker<P> {
    pub fn new(publisher: P, options: PublishOptions) -> Self {
        Self {
            publisher,
            options,
            state: InvocationState::Unstarted,
        }
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    pub fn options(&self) -> &PublishOptions {
        &self.options
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Build the request without publishing it.
    pub fn prepare(
        &self,
        path: impl Into<PathBuf>,
        token: impl Into<String>,
    ) -> Result<PublishRequest, PublishError> {
        PublishRequest::new(path, token, self.options.clone())
    }

    /// Publish `path` once. Publisher errors are returned as they came.
    ///
    /// Fails with [`PublishError::Configuration`] if called a second time.
    pub async fn invoke(
        &mut self,
        path: impl Into<PathBuf>,
        token: impl Into<String>,
    ) -> Result<PublishOutcome, PublishError> {
        if self.state != InvocationState::Unstarted {
            return Err(PublishError::Configuration(format!(
                "Invoker already used (state: {:?})",
                self.state
            )));
        }

        let request = self.prepare(path, token)?;

        self.state = InvocationState::Invoked;
        tracing::info!(
            publisher = self.publisher.name(),
            path = %request.path().display(),
            status = %self.options.publish_status,
            "Publishing notebook"
        );

        match self.publisher.publish(&request).await {
            Ok(outcome) => {
                self.state = InvocationState::Succeeded;
                tracing::info!(
                    post_id = outcome.post_id().unwrap_or("-"),
                    url = outcome.url().unwrap_or("-"),
                    duration_ms = ?outcome.duration_ms,
                    "Notebook published"
                );
                Ok(outcome)
            }
            Err(e) => {
                self.state = InvocationState::Failed;
                tracing::error!(error = %e, "Publish failed");
                Err(e)
            }
        }
    }
}
