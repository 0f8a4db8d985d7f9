//! Collaborator contracts consumed by the workflow core.
//!
//! Everything outside the engine's control flow (reading lead records,
//! generating draft text, delivering mail) is stateless I/O behind one of
//! the three traits here. Implementations are constructor-injected into the
//! stage executor; the core never holds ambient globals.
//!
//! The error types mirror the pipeline's failure taxonomy: [`FetchError`]
//! is the only fatal condition, [`GenerationError`] degrades to placeholder
//! content, [`DeliveryError`] marks the lead errored, and [`WriteError`] is
//! logged and otherwise ignored.

use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A candidate outreach target, as resolved by the lead source.
///
/// The source is responsible for schema concerns (which column holds the
/// status, how addresses are discovered); the core only consumes the
/// resolved record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub row_index: u32,
    pub status_column_index: u32,
    pub recipient_name: String,
    pub company_name: String,
    pub position: String,
    /// All addresses discovered for this lead; may be empty.
    pub candidate_emails: Vec<String>,
}

/// A subject/body pair produced or revised by the draft generator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Draft {
    pub subject: String,
    pub body: String,
}

/// The lead source is unreachable. Fatal: aborts the session.
#[derive(Debug, Error, Diagnostic)]
#[error("lead source unreachable: {message}")]
#[diagnostic(
    code(leadflow::collaborators::fetch),
    help("Check connectivity and credentials for the lead backing store.")
)]
pub struct FetchError {
    pub message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A terminal-status write failed. Logged, never retried, never blocks.
#[derive(Debug, Error, Diagnostic)]
#[error("status write failed: {message}")]
#[diagnostic(code(leadflow::collaborators::write))]
pub struct WriteError {
    pub message: String,
}

impl WriteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Draft creation or revision failed. The pipeline degrades to placeholder
/// content and keeps the lead reviewable.
#[derive(Debug, Error, Diagnostic)]
#[error("draft generation failed: {message}")]
#[diagnostic(code(leadflow::collaborators::generation))]
pub struct GenerationError {
    pub message: String,
}

impl GenerationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Delivery failed. Recoverable at the lead level: the lead is marked
/// errored and the session moves on.
#[derive(Debug, Error, Diagnostic)]
#[error("delivery to {recipients} recipient(s) failed: {message}")]
#[diagnostic(code(leadflow::collaborators::delivery))]
pub struct DeliveryError {
    pub recipients: usize,
    pub message: String,
}

impl DeliveryError {
    pub fn new(recipients: usize, message: impl Into<String>) -> Self {
        Self {
            recipients,
            message: message.into(),
        }
    }
}

/// Yields unprocessed leads and records their terminal status.
#[async_trait]
pub trait LeadSource: Send + Sync {
    /// The next unprocessed lead, or `None` when no lead remains.
    async fn next(&self) -> Result<Option<Lead>, FetchError>;

    /// Write the terminal status text back to the lead's source record.
    async fn record_status(
        &self,
        row_index: u32,
        status_column_index: u32,
        text: &str,
    ) -> Result<(), WriteError>;
}

/// Produces and revises subject/body pairs.
#[async_trait]
pub trait DraftGenerator: Send + Sync {
    async fn create_draft(
        &self,
        recipient_name: &str,
        company_name: &str,
        position: &str,
        resume_context: &str,
    ) -> Result<Draft, GenerationError>;

    async fn revise_draft(
        &self,
        subject: &str,
        body: &str,
        feedback: &str,
    ) -> Result<Draft, GenerationError>;
}

/// Delivers a finished message to one or more recipients in one call.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn deliver(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), DeliveryError>;
}
