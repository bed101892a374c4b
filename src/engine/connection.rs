//! Connections: directed edges from an output parameter to an input
//! parameter of another node.
//!
//! A connection owns no value. Either endpoint may be empty while the edge
//! is being dragged out or torn down; a connection with neither endpoint is
//! garbage and is removed by the network.

use crate::engine::id::{ConnectionId, ParameterId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    id: ConnectionId,
    source: Option<ParameterId>,
    target: Option<ParameterId>,
}

impl Connection {
    /// Create a connection with a fresh process-wide id.
    pub fn create(source: Option<ParameterId>, target: Option<ParameterId>) -> Self {
        Self {
            id: ConnectionId::next(),
            source,
            target,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn source(&self) -> Option<ParameterId> {
        self.source
    }

    pub fn target(&self) -> Option<ParameterId> {
        self.target
    }

    /// Rebind the source endpoint. Does not request evaluation.
    pub fn set_source_parameter(&mut self, source: Option<ParameterId>) {
        self.source = source;
    }

    /// Rebind the target endpoint. Does not request evaluation.
    pub fn set_target_parameter(&mut self, target: Option<ParameterId>) {
        self.target = target;
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    pub fn is_garbage(&self) -> bool {
        self.source.is_none() && self.target.is_none()
    }

    /// The endpoint opposite `parameter`, if `parameter` is one of them.
    pub fn other_end(&self, parameter: ParameterId) -> Option<ParameterId> {
        if self.source == Some(parameter) {
            self.target
        } else if self.target == Some(parameter) {
            self.source
        } else {
            None
        }
    }

    /// Clear whichever endpoint refers to `parameter`.
    pub(crate) fn detach(&mut self, parameter: ParameterId) {
        if self.target == Some(parameter) {
            self.target = None;
        } else if self.source == Some(parameter) {
            self.source = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_partial_connection() {
        let c = Connection::create(Some(ParameterId(1)), None);
        assert!(c.has_source());
        assert!(!c.has_target());
        assert!(!c.is_garbage());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Connection::create(None, None);
        let b = Connection::create(None, None);
        assert_ne!(a.id(), b.id());
        assert!(a.id() < b.id());
    }

    #[test]
    fn test_detach_and_garbage() {
        let mut c = Connection::create(Some(ParameterId(1)), Some(ParameterId(2)));
        assert_eq!(c.other_end(ParameterId(1)), Some(ParameterId(2)));
        c.detach(ParameterId(2));
        assert_eq!(c.target(), None);
        c.detach(ParameterId(1));
        assert!(c.is_garbage());
    }
}
