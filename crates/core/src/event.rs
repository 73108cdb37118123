//! Domain event system: decoupled observation of the agent loop.
//!
//! The loop publishes an event at each cycle milestone. Nothing in the
//! control logic depends on subscribers being present.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A cycle began and is about to call the backend
    CycleStarted {
        cycle: u64,
        timestamp: DateTime<Utc>,
    },

    /// A command was dispatched against the registry
    CommandExecuted {
        cycle: u64,
        command: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A cycle was aborted by a backend, plugin or console error
    CycleAborted {
        cycle: u64,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// The loop terminated
    LoopFinished {
        cycles: u64,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::CommandExecuted {
            cycle: 3,
            command: "read_file".into(),
            success: true,
            duration_ms: 42,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::CommandExecuted { command, success, cycle, .. } => {
                assert_eq!(command, "read_file");
                assert!(success);
                assert_eq!(*cycle, 3);
            }
            _ => panic!("Expected CommandExecuted event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DomainEvent::CycleAborted {
            cycle: 1,
            error_message: "no subscribers".into(),
            timestamp: Utc::now(),
        });
    }
}
