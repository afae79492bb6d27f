//! Chat layer for dirflow: turns a dispatch outcome into the one response
//! envelope callers see.
//!
//! Provides:
//! - **Response builder**: success, error and fallback envelopes with a shared error taxonomy
//! - **Offline responder**: keyword-based replies when the generation service is unreachable
//! - **Orchestrator**: context preparation, dispatch, server-side web search, envelope

pub mod error;
pub mod fallback;
pub mod orchestrator;
pub mod response;

pub use error::{OrchestrationError, ResponseFormatError};
pub use fallback::{FallbackCategory, OfflineReply, offline_reply};
pub use orchestrator::{ChatOrchestrator, SystemStatus};
pub use response::{ResponseBuilder, ResponseBuilderStats, SuccessData};
