//! Text model double returning canned responses in order

use async_trait::async_trait;
use chaptertune::services::{CompletionRequest, LlmError, TextGenerator};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replies with scripted responses; falls back to non-JSON text when the script runs out
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedGenerator {
    pub fn new<S: AsRef<str>>(responses: &[S]) -> Arc<Self> {
        Self::with_results(responses.iter().map(|r| Ok(r.as_ref().to_string())).collect())
    }

    pub fn with_results(responses: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Output-token budgets of all requests so far
    pub fn budgets(&self) -> Vec<u32> {
        self.requests.lock().unwrap().iter().map(|r| r.max_tokens).collect()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("I cannot help with that.".to_string()))
    }
}

/// Chapter-extraction response for `summaries.len()` chapters, fenced like a chat reply
pub fn chapters_json(summaries: &[&str]) -> String {
    let chapters: Vec<serde_json::Value> = summaries
        .iter()
        .enumerate()
        .map(|(i, s)| serde_json::json!({"number": i + 1, "summary": s}))
        .collect();
    let body = serde_json::json!({"num_chapters": summaries.len(), "chapters": chapters});
    format!("```json\n{}\n```", body)
}
