//! Agent layer for dirflow: everything between a user message and a list
//! of validated commands.
//!
//! A request flows through:
//!
//! 1. **Prepare context**: bound and normalize the caller's history, file list and custom prompt
//! 2. **Select agent**: a short generation call names the handler, falling back to the general agent
//! 3. **Build prompt**: the agent template with context placeholders filled in
//! 4. **Generate**: one call to the injected [`GenerationClient`](dirflow_core::GenerationClient)
//! 5. **Parse and validate**: command agents' replies become typed commands; rejects become warnings

pub mod context;
pub mod dispatcher;
pub mod parser;
pub mod prompt;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{ContextManager, ContextManagerStatus, HistoryStats};
pub use dispatcher::{AgentDispatcher, DispatcherStatus, Route};
pub use parser::{ParsedCompletion, parse_completion};
pub use registry::{AgentDescriptor, AgentRegistry};
