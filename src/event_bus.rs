use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

/// Events that can be emitted by components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Pipeline events
    GenerationStarted {
        run_id: String,
        language: String,
    },
    StageStarted {
        run_id: String,
        stage: String,
    },
    StageCompleted {
        run_id: String,
        stage: String,
        chars: usize,
    },
    StageFailed {
        run_id: String,
        stage: String,
        error: String,
    },
    GenerationCompleted {
        run_id: String,
    },
    GenerationFailed {
        run_id: String,
        error: String,
    },

    // API events
    APICallStarted {
        provider: String,
        model: String,
    },
    APICallCompleted {
        provider: String,
        tokens: usize,
        cost: f32,
    },
    APIError {
        provider: String,
        error: String,
    },
}

/// Event bus for component communication
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    metrics: Arc<RwLock<Metrics>>,
}

/// Accumulated metrics from events
#[derive(Debug, Default, Clone, Serialize)]
pub struct Metrics {
    pub total_api_calls: usize,
    pub api_errors: usize,
    pub total_tokens: usize,
    pub total_cost: f32,
    pub generations_completed: usize,
    pub generations_failed: usize,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            metrics: Arc::new(RwLock::new(Metrics::default())),
        }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers
    pub async fn emit(&self, event: Event) -> Result<()> {
        self.update_metrics(&event).await;

        // No receivers is fine
        let _ = self.sender.send(event);
        Ok(())
    }

    /// Get current metrics
    pub async fn get_metrics(&self) -> Metrics {
        self.metrics.read().await.clone()
    }

    async fn update_metrics(&self, event: &Event) {
        let mut metrics = self.metrics.write().await;

        match event {
            Event::APICallCompleted { tokens, cost, .. } => {
                metrics.total_api_calls += 1;
                metrics.total_tokens += tokens;
                metrics.total_cost += cost;
            }
            Event::APIError { .. } => {
                metrics.total_api_calls += 1;
                metrics.api_errors += 1;
            }
            Event::GenerationCompleted { .. } => {
                metrics.generations_completed += 1;
            }
            Event::GenerationFailed { .. } => {
                metrics.generations_failed += 1;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_emission() {
        let bus = EventBus::new(100);
        let mut receiver = bus.subscribe();

        let event = Event::StageStarted {
            run_id: "run-1".to_string(),
            stage: "code generation".to_string(),
        };

        bus.emit(event.clone()).await.unwrap();

        let received = receiver.recv().await.unwrap();
        match received {
            Event::StageStarted { run_id, stage } => {
                assert_eq!(run_id, "run-1");
                assert_eq!(stage, "code generation");
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[tokio::test]
    async fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        bus.emit(Event::GenerationCompleted {
            run_id: "run-2".to_string(),
        })
        .await
        .unwrap();
        assert_eq!(bus.get_metrics().await.generations_completed, 1);
    }

    #[tokio::test]
    async fn test_metrics_update() {
        let bus = EventBus::new(100);

        bus.emit(Event::APICallCompleted {
            provider: "gemini".to_string(),
            tokens: 100,
            cost: 0.01,
        })
        .await
        .unwrap();
        bus.emit(Event::APIError {
            provider: "gemini".to_string(),
            error: "rate limited".to_string(),
        })
        .await
        .unwrap();
        bus.emit(Event::GenerationFailed {
            run_id: "run-3".to_string(),
            error: "rate limited".to_string(),
        })
        .await
        .unwrap();

        let metrics = bus.get_metrics().await;
        assert_eq!(metrics.total_api_calls, 2);
        assert_eq!(metrics.api_errors, 1);
        assert_eq!(metrics.total_tokens, 100);
        assert_eq!(metrics.total_cost, 0.01);
        assert_eq!(metrics.generations_failed, 1);
        assert_eq!(metrics.generations_completed, 0);
    }
}
