//! Identity types for the parameter network.
//!
//! Node, group and parameter ids are newtypes over `u32` that index directly
//! into the `Network` arenas. Slots are tombstoned on removal and never
//! reused, so an id stays unambiguous for the lifetime of its network.
//!
//! Connection ids come from a process-wide counter instead: they are
//! monotonically increasing across every network in the process.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Index into `Network::nodes`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const INVALID: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "NodeId(INVALID)")
        } else {
            write!(f, "NodeId({})", self.0)
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Index into `Network::parameters`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ParameterId(pub u32);

impl ParameterId {
    pub const INVALID: ParameterId = ParameterId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "ParameterId(INVALID)")
        } else {
            write!(f, "ParameterId({})", self.0)
        }
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Index into `Network::groups`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct GroupId(pub u32);

impl GroupId {
    pub const INVALID: GroupId = GroupId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "GroupId(INVALID)")
        } else {
            write!(f, "GroupId({})", self.0)
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Globally unique connection identity. Later connections compare greater.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// Draw a fresh id from the process-wide counter.
    pub fn next() -> Self {
        ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A member of a parameter tree: either a leaf parameter or a nested group.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum AbstractParameterId {
    Parameter(ParameterId),
    Group(GroupId),
}

impl AbstractParameterId {
    #[inline]
    pub fn is_group(self) -> bool {
        matches!(self, AbstractParameterId::Group(_))
    }

    pub fn as_parameter(self) -> Option<ParameterId> {
        match self {
            AbstractParameterId::Parameter(id) => Some(id),
            AbstractParameterId::Group(_) => None,
        }
    }

    pub fn as_group(self) -> Option<GroupId> {
        match self {
            AbstractParameterId::Group(id) => Some(id),
            AbstractParameterId::Parameter(_) => None,
        }
    }
}

impl From<ParameterId> for AbstractParameterId {
    fn from(id: ParameterId) -> Self {
        AbstractParameterId::Parameter(id)
    }
}

impl From<GroupId> for AbstractParameterId {
    fn from(id: GroupId) -> Self {
        AbstractParameterId::Group(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        let id = NodeId(42);
        assert!(id.is_valid());
        assert_eq!(id.index(), 42);
        assert!(!NodeId::INVALID.is_valid());
    }

    #[test]
    fn test_parameter_id_debug() {
        assert_eq!(format!("{:?}", ParameterId(3)), "ParameterId(3)");
        assert_eq!(format!("{}", ParameterId::INVALID), "ParameterId(INVALID)");
    }

    #[test]
    fn test_connection_ids_increase() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        let c = ConnectionId::next();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_abstract_parameter_id() {
        let leaf: AbstractParameterId = ParameterId(1).into();
        let group: AbstractParameterId = GroupId(2).into();
        assert!(!leaf.is_group());
        assert!(group.is_group());
        assert_eq!(leaf.as_parameter(), Some(ParameterId(1)));
        assert_eq!(group.as_parameter(), None);
        assert_eq!(group.as_group(), Some(GroupId(2)));
    }
}
