//! crates/translation_workflow_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the workflow's external collaborators.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific implementations like file formats, the LLM
//! provider, or the account and event stores.

use async_trait::async_trait;

use crate::domain::{AccessEvent, SourceDocument, UserAccount};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., files, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Item already exists: {0}")]
    Conflict(String),
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("The operation timed out")]
    Timeout,
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The remote text-completion capability that translates, edits and proofreads.
#[async_trait]
pub trait TranslationOracle: Send + Sync {
    /// Sends a prompt and returns the completion text.
    ///
    /// `model` overrides the adapter's default model when given.
    async fn complete(&self, prompt: &str, model: Option<&str>) -> PortResult<String>;
}

/// Extracts plain text from an uploaded document of a known format.
pub trait DocumentReader: Send + Sync {
    /// Fails with `PortError::UnsupportedFormat` for unrecognised formats.
    fn extract_text(&self, document: &SourceDocument) -> PortResult<String>;
}

/// Serializes plain text into a paragraph-oriented word-processing document.
pub trait DocumentWriter: Send + Sync {
    fn render_document(&self, text: &str) -> PortResult<Vec<u8>>;

    /// Extension of the produced files, without the leading dot.
    fn file_extension(&self) -> &'static str;

    fn content_type(&self) -> &'static str;
}

/// The append-only, human-readable access log.
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn record_event(&self, username: &str, event: &str) -> PortResult<()>;

    /// Returns all parseable events in append order.
    async fn read_events(&self) -> PortResult<Vec<AccessEvent>>;
}

/// The user-account table.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_account(&self, username: &str) -> PortResult<UserAccount>;

    async fn list_accounts(&self) -> PortResult<Vec<UserAccount>>;

    /// Fails with `PortError::Conflict` when the username is taken.
    async fn create_account(&self, account: UserAccount) -> PortResult<()>;

    async fn delete_account(&self, username: &str) -> PortResult<()>;
}
