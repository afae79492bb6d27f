//! # dirflow core
//!
//! Domain types, collaborator traits, and error definitions for the dirflow
//! request pipeline. Every other crate in the workspace depends inward on
//! this one.
//!
//! ## Layout
//!
//! - [`command`]: the action allow-list and the typed, validated [`Command`]
//! - [`context`]: the caller-owned conversation context
//! - [`dispatch`]: what the agent dispatcher hands back
//! - [`envelope`]: the canonical response shape returned to callers
//! - [`generation`] / [`search`]: contracts of the external collaborators
//! - [`error`]: error types and the error classifier

pub mod command;
pub mod context;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod generation;
pub mod search;

pub use command::{ActionName, Command, SearchOptions, SearchProvider};
pub use context::{Context, ContextMetadata, CustomPrompt, Exchange};
pub use dispatch::DispatchResult;
pub use envelope::{EnvelopeMetadata, ExecutionReport, ExecutionStatus, ResponseEnvelope};
pub use error::{Error, ErrorType, ProviderError, Result};
pub use generation::{GenerationClient, GenerationRequest};
pub use search::{SearchClient, SearchHit, SearchOutcome};
