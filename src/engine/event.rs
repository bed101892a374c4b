//! Observer notifications.
//!
//! The engine reports value changes, dirtying and connection lifecycle to
//! any number of subscribers. Each subscriber gets its own unbounded
//! crossbeam channel; receivers that have been dropped are pruned on the
//! next emit.

use crate::engine::id::{ConnectionId, ParameterId};
use crossbeam_channel::{unbounded, Receiver, Sender};

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterEvent {
    /// The value changed. `index` is set for element-wise updates.
    ValueChanged {
        parameter: ParameterId,
        index: Option<usize>,
    },
    /// The parameter became dirty during a propagation pass.
    Dirtied { parameter: ParameterId },
    /// A connection request naming this parameter passed pin validation.
    ConnectionCreated {
        parameter: ParameterId,
        other: ParameterId,
    },
    ConnectionEstablished {
        parameter: ParameterId,
        connection: ConnectionId,
    },
    ConnectionDestroyed {
        parameter: ParameterId,
        connection: ConnectionId,
    },
    CommandRequested { parameter: ParameterId },
    ChangeRequested { parameter: ParameterId },
}

#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<ParameterEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<ParameterEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn emit(&mut self, event: ParameterEvent) {
        if self.subscribers.is_empty() {
            return;
        }
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_reaches_all_subscribers() {
        let mut bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();
        bus.emit(ParameterEvent::Dirtied {
            parameter: ParameterId(3),
        });
        assert_eq!(a.try_recv().unwrap(), ParameterEvent::Dirtied { parameter: ParameterId(3) });
        assert_eq!(b.try_recv().unwrap(), ParameterEvent::Dirtied { parameter: ParameterId(3) });
    }

    #[test]
    fn test_dropped_receivers_are_pruned() {
        let mut bus = EventBus::new();
        let keep = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);
        bus.emit(ParameterEvent::CommandRequested {
            parameter: ParameterId(0),
        });
        assert_eq!(bus.subscriber_count(), 1);
        assert!(keep.try_recv().is_ok());
    }
}
