//! In-process fan-out of dataset events to SSE subscribers.
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

pub const BALANCE_DATASET: &str = "balance";

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceEvent {
    DatasetUpdated {
        dataset_id: String,
        source_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        year: Option<i32>,
        message: String,
        warnings: Vec<String>,
        ts: DateTime<Utc>,
    },
    EtlError {
        dataset_id: String,
        source_id: String,
        message: String,
        warnings: Vec<String>,
        ts: DateTime<Utc>,
    },
}

impl BalanceEvent {
    pub fn dataset_updated(
        dataset_id: impl Into<String>,
        source_id: impl Into<String>,
        year: Option<i32>,
        message: impl Into<String>,
        warnings: Vec<String>,
    ) -> Self {
        BalanceEvent::DatasetUpdated {
            dataset_id: dataset_id.into(),
            source_id: source_id.into(),
            year,
            message: message.into(),
            warnings,
            ts: Utc::now(),
        }
    }

    pub fn etl_error(
        source_id: impl Into<String>,
        message: impl Into<String>,
        warnings: Vec<String>,
    ) -> Self {
        BalanceEvent::EtlError {
            dataset_id: BALANCE_DATASET.to_string(),
            source_id: source_id.into(),
            message: message.into(),
            warnings,
            ts: Utc::now(),
        }
    }
}

/// Cheap to clone; all clones share one channel
#[derive(Clone)]
pub struct EventBroker {
    sender: broadcast::Sender<BalanceEvent>,
}

impl Default for EventBroker {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBroker {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Deliver to current subscribers; returns how many received it
    pub fn publish(&self, event: BalanceEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("No event subscribers, dropping event");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BalanceEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
