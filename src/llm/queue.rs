use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tracing::{debug, info};

use super::{ChatModel, ChatRequest};
use crate::error::LlmError;

/// Priority level for LLM requests
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priority {
    /// Pipeline continuations (debate, trader, risk, fund manager)
    High,
    /// New analysis (analyst reports)
    Normal,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => f.write_str("HIGH"),
            Priority::Normal => f.write_str("NORMAL"),
        }
    }
}

struct QueuedRequest {
    request: ChatRequest,
    response_tx: oneshot::Sender<Result<String, LlmError>>,
}

/// Limits concurrent completions and lets pipeline continuations jump ahead
#[derive(Clone)]
pub struct LlmQueue {
    model_name: String,
    high_tx: mpsc::Sender<QueuedRequest>,
    normal_tx: mpsc::Sender<QueuedRequest>,
}

impl LlmQueue {
    /// Spawns the processor task; must be called inside a tokio runtime
    pub fn new(model: Arc<dyn ChatModel>, max_concurrent: usize, queue_size: usize) -> Self {
        let (high_tx, high_rx) = mpsc::channel::<QueuedRequest>(queue_size.max(1));
        let (normal_tx, normal_rx) = mpsc::channel::<QueuedRequest>(queue_size.max(1));

        let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
        let model_name = model.model_name().to_string();

        tokio::spawn(Self::process_queue(model, semaphore, high_rx, normal_rx));

        Self {
            model_name,
            high_tx,
            normal_tx,
        }
    }

    async fn process_queue(
        model: Arc<dyn ChatModel>,
        semaphore: Arc<Semaphore>,
        mut high_rx: mpsc::Receiver<QueuedRequest>,
        mut normal_rx: mpsc::Receiver<QueuedRequest>,
    ) {
        info!(
            "📬 [QUEUE] LLM Queue processor started (max concurrent: {})",
            semaphore.available_permits()
        );

        loop {
            // Permit first, then dequeue: the channel choice happens only once a slot is free
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => break,
            };

            let queued = tokio::select! {
                biased;

                Some(req) = high_rx.recv() => req,
                Some(req) = normal_rx.recv() => req,
                else => {
                    info!("📬 [QUEUE] All channels closed, shutting down");
                    break;
                }
            };

            debug!(
                "📬 [QUEUE] Processing {} priority request from {}. {} slots remaining",
                queued.request.priority,
                queued.request.agent,
                semaphore.available_permits()
            );

            let model = model.clone();
            tokio::spawn(async move {
                let result = model.complete(queued.request).await;
                let _ = queued.response_tx.send(result);
                drop(permit);
            });
        }
    }
}

#[async_trait]
impl ChatModel for LlmQueue {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        let (response_tx, response_rx) = oneshot::channel();
        let tx = match request.priority {
            Priority::High => &self.high_tx,
            Priority::Normal => &self.normal_tx,
        };

        tx.send(QueuedRequest {
            request,
            response_tx,
        })
        .await
        .map_err(|_| LlmError::QueueClosed)?;

        response_rx.await.map_err(|_| LlmError::Cancelled)?
    }
}
