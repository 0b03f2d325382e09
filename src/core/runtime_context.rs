use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::core::event_bus::{EventSender, RunEvent};

/// Runtime context providing ID generation and the progress event sink
#[derive(Clone)]
pub struct RuntimeContext {
    pub id_generator: Arc<dyn IdGenerator>,
    pub event_tx: Option<EventSender>,
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self {
            id_generator: Arc::new(RealIdGenerator),
            event_tx: None,
        }
    }
}

impl RuntimeContext {
    pub fn with_event_tx(mut self, event_tx: EventSender) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn with_id_generator(mut self, id_generator: Arc<dyn IdGenerator>) -> Self {
        self.id_generator = id_generator;
        self
    }

    /// Send a progress event. Dropped receivers are ignored.
    pub fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}

pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

#[derive(Default)]
pub struct RealIdGenerator;

impl IdGenerator for RealIdGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Sequential ids (`prefix-0`, `prefix-1`, ...) for reproducible tests.
pub struct FakeIdGenerator {
    pub prefix: String,
    pub counter: AtomicU64,
}

impl FakeIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for FakeIdGenerator {
    fn next_id(&self) -> String {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event_bus::create_event_channel;

    #[test]
    fn test_fake_id_generator_sequence() {
        let ids = FakeIdGenerator::new("node");
        assert_eq!(ids.next_id(), "node-0");
        assert_eq!(ids.next_id(), "node-1");
    }

    #[test]
    fn test_real_id_generator_unique() {
        let ids = RealIdGenerator;
        assert_ne!(ids.next_id(), ids.next_id());
    }

    #[tokio::test]
    async fn test_emit_without_receiver_is_noop() {
        let context = RuntimeContext::default();
        context.emit(RunEvent::NodeCanceled {
            node_id: "n".into(),
            timestamp: chrono::Utc::now(),
        });

        let (tx, mut rx) = create_event_channel();
        let context = RuntimeContext::default().with_event_tx(tx);
        context.emit(RunEvent::NodeCanceled {
            node_id: "n".into(),
            timestamp: chrono::Utc::now(),
        });
        assert!(matches!(rx.recv().await, Some(RunEvent::NodeCanceled { .. })));
    }
}
