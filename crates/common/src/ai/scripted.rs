use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use super::{Flow, LlmClient, PromptRequest};
use crate::errors::{AppError, Result};

enum Scripted {
    Reply(Value),
    Fail(String),
}

/// In-process client that replays queued outputs per flow and records
/// every request it receives
#[derive(Default)]
pub struct ScriptedLlm {
    queue: Mutex<HashMap<Flow, VecDeque<Scripted>>>,
    requests: Mutex<Vec<PromptRequest>>,
    latency: Option<Duration>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`, like a slow model would
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    fn push(&self, flow: Flow, item: Scripted) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.entry(flow).or_default().push_back(item);
        }
    }

    /// Queue a JSON output for the next call of `flow`
    pub fn reply(&self, flow: Flow, value: Value) -> &Self {
        self.push(flow, Scripted::Reply(value));
        self
    }

    /// Queue a transport failure for the next call of `flow`
    pub fn fail(&self, flow: Flow, message: impl Into<String>) -> &Self {
        self.push(flow, Scripted::Fail(message.into()));
        self
    }

    pub fn requests(&self) -> Vec<PromptRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn requests_for(&self, flow: Flow) -> Vec<PromptRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.flow == flow)
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(&self, request: PromptRequest) -> Result<Value> {
        let flow = request.flow;
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let next = self
            .queue
            .lock()
            .ok()
            .and_then(|mut queue| queue.get_mut(&flow).and_then(VecDeque::pop_front));

        match next {
            Some(Scripted::Reply(value)) => Ok(value),
            Some(Scripted::Fail(message)) => Err(AppError::AiService { message }),
            None => Err(AppError::AiService {
                message: format!("no scripted reply for {}", flow.name()),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
