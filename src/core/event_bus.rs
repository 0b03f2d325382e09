use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;

use crate::domain::execution::{PlannedCount, RunOutcome};

/// Progress event emitted while a run executes.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// Planning finished; `planned` holds the per-node call targets.
    RunStarted {
        run_id: String,
        order: Vec<String>,
        planned: HashMap<String, PlannedCount>,
        timestamp: DateTime<Utc>,
    },

    /// A node invocation began. `call` is the node's live call count.
    NodeStarted {
        node_id: String,
        call: u64,
        timestamp: DateTime<Utc>,
    },

    NodeSucceeded {
        node_id: String,
        output: Value,
        timestamp: DateTime<Utc>,
    },

    NodeFailed {
        node_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// The node was pre-empted or interrupted and reset to idle.
    NodeCanceled {
        node_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Waiting before the next repeat iteration.
    RepeatWaiting {
        node_id: String,
        delay_ms: u64,
        timestamp: DateTime<Utc>,
    },

    RunFinished {
        run_id: String,
        outcome: RunOutcome,
        timestamp: DateTime<Utc>,
    },
}

/// Sending half of the run event channel.
pub type EventSender = mpsc::UnboundedSender<RunEvent>;

/// Receiving half of the run event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<RunEvent>;

/// Create an unbounded run event channel.
pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_event_channel() {
        let (sender, mut receiver) = create_event_channel();

        sender
            .send(RunEvent::NodeStarted {
                node_id: "node1".to_string(),
                call: 1,
                timestamp: Utc::now(),
            })
            .unwrap();

        let event = receiver.recv().await.unwrap();
        match event {
            RunEvent::NodeStarted { node_id, call, .. } => {
                assert_eq!(node_id, "node1");
                assert_eq!(call, 1);
            }
            _ => panic!("Unexpected event type"),
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = RunEvent::NodeFailed {
            node_id: "n".into(),
            error: "boom".into(),
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], json!("node_failed"));
        assert_eq!(value["error"], json!("boom"));
    }
}
