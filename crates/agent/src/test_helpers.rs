//! Shared test helpers for dispatcher tests.

use dirflow_core::error::ProviderError;
use dirflow_core::generation::{GenerationClient, GenerationRequest};
use std::sync::Mutex;

/// A mock generation client that returns a sequence of scripted replies.
///
/// Each call to `complete` returns the next reply in the queue and records
/// the request. Panics if more calls are made than replies provided.
pub struct SequentialMockClient {
    replies: Mutex<Vec<Result<String, ProviderError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl SequentialMockClient {
    pub fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// First call picks `agent`, second call answers with `completion`.
    pub fn select_then_reply(agent: &str, completion: &str) -> Self {
        Self::new(vec![Ok(agent.into()), Ok(completion.into())])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> GenerationRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl GenerationClient for SequentialMockClient {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: GenerationRequest) -> Result<String, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let replies = self.replies.lock().unwrap();
        let index = requests.len();

        if index >= replies.len() {
            panic!(
                "SequentialMockClient: no more replies (call #{}, have {})",
                index,
                replies.len()
            );
        }

        requests.push(request);
        replies[index].clone()
    }
}
