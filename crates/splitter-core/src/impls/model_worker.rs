//! ModelWorker - runs one task as a fresh conversation with a ModelBackend
//!
//! Every task gets its own history built from the immutable seed messages.
//! Nothing a task sends or receives is visible to any other task.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::TaskDescriptor;
use crate::ports::{
    BackendError, Message, ModelBackend, Role, TaskContext, Worker, truncate_history,
};

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a sub-agent. Complete the single task you are given and report the result.";

pub const DEFAULT_MAX_HISTORY: usize = 50;

#[derive(Debug, Error)]
pub enum ModelWorkerError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("cancelled while waiting for the model backend")]
    Cancelled,
}

pub struct ModelWorker<B> {
    backend: Arc<B>,
    system_prompt: String,
    seed: Vec<Message>,
    max_history: usize,
}

impl<B: ModelBackend> ModelWorker<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            seed: Vec::new(),
            max_history: DEFAULT_MAX_HISTORY,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Messages placed between the system prompt and the task in every
    /// conversation (e.g. shared project background).
    pub fn with_seed(mut self, seed: Vec<Message>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    /// The conversation sent to the backend for one task.
    pub fn conversation(&self, task: &str, ctx: &TaskContext) -> Vec<Message> {
        let mut system = self.system_prompt.clone();
        let tools = ctx.capabilities().names();
        if !tools.is_empty() {
            system.push_str("\nAvailable tools: ");
            system.push_str(&tools.join(", "));
        }

        let mut history = Vec::with_capacity(self.seed.len() + 2);
        history.push(Message::system(system));
        history.extend(self.seed.iter().cloned());
        history.push(Message::user(task));
        truncate_history(&history, self.max_history)
    }
}

#[async_trait]
impl<B: ModelBackend + 'static> Worker<String> for ModelWorker<B> {
    type Output = String;
    type Error = ModelWorkerError;

    async fn execute(
        &self,
        task: &TaskDescriptor<String>,
        ctx: TaskContext,
    ) -> Result<String, ModelWorkerError> {
        let history = self.conversation(task.payload(), &ctx);
        tokio::select! {
            biased;
            _ = ctx.cancellation().cancelled() => Err(ModelWorkerError::Cancelled),
            reply = self.backend.complete(&history) => {
                let reply = reply?;
                if reply.trim().is_empty() {
                    return Err(BackendError::EmptyReply.into());
                }
                Ok(reply)
            }
        }
    }
}

/// Offline backend: answers every conversation with an acknowledgement of
/// the last user message.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoBackend;

#[async_trait]
impl ModelBackend for EchoBackend {
    async fn complete(&self, history: &[Message]) -> Result<String, BackendError> {
        let task = history
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(format!("SubAgent completed task: {task}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::CapabilitySet;
    use crate::domain::BatchId;
    use crate::impls::CodeStats;
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;
    use ulid::Ulid;

    fn ctx_with(capabilities: CapabilitySet) -> TaskContext {
        TaskContext::new(
            BatchId::from_ulid(Ulid::new()),
            0,
            CancellationToken::new(),
            Arc::new(capabilities),
        )
    }

    /// Records every history it receives.
    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<Vec<Message>>>,
    }

    #[async_trait]
    impl ModelBackend for Recording {
        async fn complete(&self, history: &[Message]) -> Result<String, BackendError> {
            self.seen.lock().unwrap().push(history.to_vec());
            Ok("ok".into())
        }
    }

    struct Pending;

    #[async_trait]
    impl ModelBackend for Pending {
        async fn complete(&self, _history: &[Message]) -> Result<String, BackendError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn echo_backend_acknowledges_task() {
        let worker = ModelWorker::new(Arc::new(EchoBackend));
        let task = TaskDescriptor::new(0, "write docs".to_string());
        let out = worker
            .execute(&task, ctx_with(CapabilitySet::empty()))
            .await
            .unwrap();
        assert_eq!(out, "SubAgent completed task: write docs");
    }

    #[tokio::test]
    async fn each_task_gets_a_fresh_conversation() {
        let backend = Arc::new(Recording::default());
        let worker = ModelWorker::new(Arc::clone(&backend))
            .with_system_prompt("sys")
            .with_seed(vec![Message::user("background")]);

        for (i, text) in ["one", "two"].into_iter().enumerate() {
            let task = TaskDescriptor::new(i, text.to_string());
            worker
                .execute(&task, ctx_with(CapabilitySet::empty()))
                .await
                .unwrap();
        }

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[1],
            vec![
                Message::system("sys"),
                Message::user("background"),
                Message::user("two")
            ]
        );
    }

    #[test]
    fn system_prompt_lists_capabilities() {
        let caps = CapabilitySet::builder()
            .register(Arc::new(CodeStats))
            .unwrap()
            .build();
        let worker = ModelWorker::new(Arc::new(EchoBackend)).with_system_prompt("sys");
        let history = worker.conversation("t", &ctx_with(caps));
        assert_eq!(history[0].content, "sys\nAvailable tools: code_stats");
    }

    #[tokio::test]
    async fn cancellation_interrupts_backend_wait() {
        let worker = ModelWorker::new(Arc::new(Pending));
        let ctx = ctx_with(CapabilitySet::empty());
        ctx.cancellation().cancel();
        let err = worker
            .execute(&TaskDescriptor::new(0, "t".to_string()), ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ModelWorkerError::Cancelled));
    }
}
