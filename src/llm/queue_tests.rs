//! Unit tests for the LLM queue - concurrency cap and priority ordering.

#[cfg(test)]
mod queue_tests {
    use crate::error::LlmError;
    use crate::llm::{ChatModel, ChatRequest, LlmQueue, Priority};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Sleeps per call and records the highest number of overlapping calls
    struct SlowModel {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl SlowModel {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatModel for SlowModel {
        fn model_name(&self) -> &str {
            "slow-model"
        }

        async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("reply to {}", request.agent))
        }
    }

    /// Holds the "blocker" request until released and records call order
    struct GateModel {
        order: Mutex<Vec<String>>,
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ChatModel for GateModel {
        fn model_name(&self) -> &str {
            "gate-model"
        }

        async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
            self.order.lock().unwrap().push(request.agent.clone());
            if request.agent == "blocker" {
                self.started.notify_one();
                self.release.notified().await;
            }
            Ok(String::new())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        fn model_name(&self) -> &str {
            "failing-model"
        }

        async fn complete(&self, _request: ChatRequest) -> Result<String, LlmError> {
            Err(LlmError::Backend("upstream 500".to_string()))
        }
    }

    fn request(agent: &str, priority: Priority) -> ChatRequest {
        ChatRequest::new(agent, "system", "user", priority)
    }

    // ============= Concurrency Tests =============

    #[tokio::test]
    async fn test_queue_never_exceeds_max_concurrent() {
        let model = Arc::new(SlowModel::new());
        let queue = LlmQueue::new(model.clone(), 2, 16);

        let mut handles = Vec::new();
        for i in 0..8 {
            let q = queue.clone();
            let priority = if i % 2 == 0 { Priority::High } else { Priority::Normal };
            handles.push(tokio::spawn(async move {
                q.complete(request(&format!("agent-{}", i), priority)).await
            }));
        }

        for h in handles {
            assert!(h.await.unwrap().is_ok());
        }

        assert_eq!(model.calls.load(Ordering::SeqCst), 8);
        assert!(model.peak.load(Ordering::SeqCst) <= 2);
        assert!(model.peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_queue_returns_model_reply() {
        let queue = LlmQueue::new(Arc::new(SlowModel::new()), 1, 4);
        let reply = queue.complete(request("trader", Priority::High)).await.unwrap();
        assert_eq!(reply, "reply to trader");
        assert_eq!(queue.model_name(), "slow-model");
    }

    // ============= Priority Tests =============

    #[tokio::test]
    async fn test_high_priority_jumps_ahead_of_normal() {
        let model = Arc::new(GateModel {
            order: Mutex::new(Vec::new()),
            started: Notify::new(),
            release: Notify::new(),
        });
        let queue = LlmQueue::new(model.clone(), 1, 8);

        let q = queue.clone();
        let blocker = tokio::spawn(async move { q.complete(request("blocker", Priority::Normal)).await });
        model.started.notified().await;

        let q = queue.clone();
        let normal = tokio::spawn(async move { q.complete(request("normal", Priority::Normal)).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let q = queue.clone();
        let high = tokio::spawn(async move { q.complete(request("high", Priority::High)).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        model.release.notify_one();
        blocker.await.unwrap().unwrap();
        high.await.unwrap().unwrap();
        normal.await.unwrap().unwrap();

        let order = model.order.lock().unwrap().clone();
        assert_eq!(order, vec!["blocker", "high", "normal"]);
    }

    // ============= Error Tests =============

    #[tokio::test]
    async fn test_queue_propagates_model_error() {
        let queue = LlmQueue::new(Arc::new(FailingModel), 1, 4);
        let err = queue.complete(request("news_analyst", Priority::Normal)).await.unwrap_err();
        assert!(matches!(err, LlmError::Backend(_)));
    }
}
