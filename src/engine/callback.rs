//! Callback contract between parameters and their owning nodes.
//!
//! Each parameter keeps a `CallbackTable` of typed closures supplied by its
//! node. Binding replaces the previous closure of the same kind; binding
//! `None` unbinds. Callbacks are cloned out of the table before they run, so
//! a callback is free to rebind itself or mutate the network through its
//! `NodeContext`.

use crate::engine::id::{ConnectionId, NodeId, ParameterId};
use crate::engine::network::Network;
use crate::engine::value::Value;
use crate::error::{EngineError, EngineResult};
use std::fmt;
use std::sync::Arc;

/// A bound node function.
pub type Callback = Arc<dyn Fn(&mut NodeContext<'_>) -> EngineResult<()> + Send + Sync>;

/// Wrap a closure as a `Callback`.
pub fn callback<F>(f: F) -> Callback
where
    F: Fn(&mut NodeContext<'_>) -> EngineResult<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    /// Runs for externally initiated edits only.
    Change,
    /// Recomputes the parameter's value during an evaluation pull.
    Processing,
    /// Runs during an evaluation pull when the parameter is aux-dirty.
    AuxProcessing,
    /// Runs when a command parameter is triggered.
    Command,
    /// Runs when a connection to the parameter has been established.
    OnConnect,
    /// Runs when a connection to the parameter is about to be destroyed.
    OnDisconnect,
    /// Runs when a connection request naming the parameter has been validated.
    OnCreateConnection,
}

impl CallbackKind {
    pub fn name(self) -> &'static str {
        match self {
            CallbackKind::Change => "change",
            CallbackKind::Processing => "processing",
            CallbackKind::AuxProcessing => "aux processing",
            CallbackKind::Command => "command",
            CallbackKind::OnConnect => "on connect",
            CallbackKind::OnDisconnect => "on disconnect",
            CallbackKind::OnCreateConnection => "on create connection",
        }
    }
}

/// At most one callback per kind.
#[derive(Clone, Default)]
pub struct CallbackTable {
    change: Option<Callback>,
    processing: Option<Callback>,
    aux_processing: Option<Callback>,
    command: Option<Callback>,
    on_connect: Option<Callback>,
    on_disconnect: Option<Callback>,
    on_create_connection: Option<Callback>,
}

impl CallbackTable {
    fn slot(&self, kind: CallbackKind) -> &Option<Callback> {
        match kind {
            CallbackKind::Change => &self.change,
            CallbackKind::Processing => &self.processing,
            CallbackKind::AuxProcessing => &self.aux_processing,
            CallbackKind::Command => &self.command,
            CallbackKind::OnConnect => &self.on_connect,
            CallbackKind::OnDisconnect => &self.on_disconnect,
            CallbackKind::OnCreateConnection => &self.on_create_connection,
        }
    }

    fn slot_mut(&mut self, kind: CallbackKind) -> &mut Option<Callback> {
        match kind {
            CallbackKind::Change => &mut self.change,
            CallbackKind::Processing => &mut self.processing,
            CallbackKind::AuxProcessing => &mut self.aux_processing,
            CallbackKind::Command => &mut self.command,
            CallbackKind::OnConnect => &mut self.on_connect,
            CallbackKind::OnDisconnect => &mut self.on_disconnect,
            CallbackKind::OnCreateConnection => &mut self.on_create_connection,
        }
    }

    pub fn get(&self, kind: CallbackKind) -> Option<Callback> {
        self.slot(kind).clone()
    }

    pub fn is_bound(&self, kind: CallbackKind) -> bool {
        self.slot(kind).is_some()
    }

    /// Replace the callback of `kind`, returning the previous one.
    pub fn set(&mut self, kind: CallbackKind, callback: Option<Callback>) -> Option<Callback> {
        std::mem::replace(self.slot_mut(kind), callback)
    }

    pub fn clear(&mut self) {
        *self = CallbackTable::default();
    }

    /// True if any value-producing callback is bound.
    pub fn has_value_functions(&self) -> bool {
        self.change.is_some() || self.processing.is_some() || self.aux_processing.is_some()
    }
}

impl fmt::Debug for CallbackTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds = [
            CallbackKind::Change,
            CallbackKind::Processing,
            CallbackKind::AuxProcessing,
            CallbackKind::Command,
            CallbackKind::OnConnect,
            CallbackKind::OnDisconnect,
            CallbackKind::OnCreateConnection,
        ];
        f.debug_list()
            .entries(kinds.iter().filter(|k| self.is_bound(**k)).map(|k| k.name()))
            .finish()
    }
}

/// Hooks a node exposes to the engine.
///
/// All hooks have no-op defaults. Implementations are shared behind an
/// `Arc`, so hooks take `&self` and keep any mutable state behind their own
/// synchronization.
pub trait NodeBehavior: Send + Sync {
    /// Generic hook run after every evaluation pull of one of the node's
    /// parameters.
    fn process(&self, _ctx: &mut NodeContext<'_>, _parameter_name: &str) -> EngineResult<bool> {
        Ok(true)
    }

    /// Eager evaluation of a single connection as it is added to one of the
    /// node's parameters.
    fn evaluate_connection(
        &self,
        _ctx: &mut NodeContext<'_>,
        _connection: ConnectionId,
    ) -> EngineResult<()> {
        Ok(())
    }

    /// Notification that the node has deleted one of its connections.
    fn connection_deleted(&self, _node: NodeId, _connection: ConnectionId) {}
}

/// A node with no behavior of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassiveNode;

impl NodeBehavior for PassiveNode {}

/// Network access handed to callbacks, scoped to the owning node.
///
/// Lookups by name resolve against the node's parameter tree and accept
/// nested paths such as `"transform > position"`.
pub struct NodeContext<'a> {
    network: &'a mut Network,
    node: NodeId,
    parameter: Option<ParameterId>,
}

impl<'a> NodeContext<'a> {
    pub(crate) fn new(network: &'a mut Network, node: NodeId, parameter: Option<ParameterId>) -> Self {
        Self {
            network,
            node,
            parameter,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The parameter whose trigger fired, if any.
    pub fn parameter(&self) -> Option<ParameterId> {
        self.parameter
    }

    pub fn node_name(&self) -> &str {
        self.network.node_name(self.node).unwrap_or_default()
    }

    pub fn network(&mut self) -> &mut Network {
        self.network
    }

    pub fn network_ref(&self) -> &Network {
        self.network
    }

    /// Resolve a parameter of the owning node by name or path.
    pub fn find(&self, name: &str) -> EngineResult<ParameterId> {
        self.network
            .find_parameter(self.node, name)
            .ok_or_else(|| EngineError::UnknownParameter(format!("{}.{}", self.node_name(), name)))
    }

    /// Current value without triggering evaluation.
    pub fn value(&self, name: &str) -> EngineResult<Value> {
        let id = self.find(name)?;
        Ok(self.network.value(id).cloned().unwrap_or_default())
    }

    pub fn get_value(&mut self, name: &str, trigger_evaluation: bool) -> EngineResult<Value> {
        let id = self.find(name)?;
        self.network.get_value(id, trigger_evaluation)
    }

    pub fn get_value_list(&mut self, name: &str, trigger_evaluation: bool) -> EngineResult<Vec<Value>> {
        let id = self.find(name)?;
        self.network.get_value_list(id, trigger_evaluation)
    }

    /// Store a computed value. Does not dirty downstream parameters.
    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) -> EngineResult<()> {
        let id = self.find(name)?;
        self.network.set_value(id, value.into(), false)
    }

    /// Store a value and dirty everything it affects.
    pub fn set_value_and_dirty(&mut self, name: &str, value: impl Into<Value>) -> EngineResult<()> {
        let id = self.find(name)?;
        self.network.set_value(id, value.into(), true)
    }

    /// Value of the triggering parameter.
    pub fn current_value(&self) -> Option<&Value> {
        self.parameter.and_then(|id| self.network.value(id))
    }

    /// Store a computed value on the triggering parameter.
    pub fn set_current_value(&mut self, value: impl Into<Value>) -> EngineResult<()> {
        match self.parameter {
            Some(id) => self.network.set_value(id, value.into(), false),
            None => Ok(()),
        }
    }
}
