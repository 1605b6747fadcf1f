//! nbpublish Tool Library
//!
//! Publishes a notebook to a blogging platform as a post by delegating to an
//! external publishing library.
//!
//! This crate provides:
//! - Publish request model with platform defaults (draft, all rights reserved)
//! - `Publisher` trait and a Python bridge implementation
//! - Single-shot publish invoker

pub mod error;
pub mod invoker;
pub mod outcome;
pub mod publisher;
pub mod python;
pub mod request;

pub use error::PublishError;
pub use invoker::{resolve_token, InvocationState, PublishInvoker, DEFAULT_TOKEN_VAR};
pub use outcome::PublishOutcome;
pub use publisher::Publisher;
pub use python::{PythonConfig, PythonPublisher};
pub use request::{License, PublishOptions, PublishRequest, PublishStatus, TableConversion};
