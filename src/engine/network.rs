//! The parameter network: arena storage and structural operations.
//!
//! `Network` owns every node, parameter group, parameter and connection.
//! Everything refers to everything else by id, so destroying a parameter
//! out of order can never leave a dangling reference behind: teardown walks
//! the id lists and unlinks both sides.
//!
//! The propagation algorithm itself lives in `propagation.rs`.

use crate::config::EvaluationConfig;
use crate::engine::callback::{Callback, CallbackKind, NodeBehavior, NodeContext, PassiveNode};
use crate::engine::connection::Connection;
use crate::engine::event::{EventBus, ParameterEvent};
use crate::engine::group::ParameterGroup;
use crate::engine::id::{AbstractParameterId, ConnectionId, GroupId, NodeId, ParameterId};
use crate::engine::parameter::Parameter;
use crate::engine::types::{ParameterType, PinType, PATH_SEPARATOR};
use crate::engine::value::{split_components, Color, Value};
use crate::error::{EngineError, EngineResult};
use crossbeam_channel::Receiver;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

pub(crate) struct NodeSlot {
    pub(crate) name: String,
    pub(crate) type_name: String,
    pub(crate) root: GroupId,
    pub(crate) behavior: Arc<dyn NodeBehavior>,
    /// Connections this node is the deletion authority for.
    pub(crate) connections: BTreeSet<ConnectionId>,
    pub(crate) deleted: bool,
}

pub(crate) struct GroupSlot {
    pub(crate) group: ParameterGroup,
    pub(crate) node: Option<NodeId>,
    pub(crate) parent: Option<GroupId>,
    pub(crate) deleted: bool,
}

pub(crate) struct ParameterSlot {
    pub(crate) parameter: Parameter,
    pub(crate) node: Option<NodeId>,
    pub(crate) parent: Option<GroupId>,
    /// Cross-node edges, iterated in connection-id order.
    pub(crate) connections: BTreeSet<ConnectionId>,
    /// Intra-node edges. Always mirrored on the other side.
    pub(crate) affected: Vec<ParameterId>,
    pub(crate) affecting: Vec<ParameterId>,
    /// Set while an evaluation pull for this parameter is running.
    pub(crate) evaluating: bool,
    pub(crate) deleted: bool,
}

impl ParameterSlot {
    fn new(parameter: Parameter) -> Self {
        Self {
            parameter,
            node: None,
            parent: None,
            connections: BTreeSet::new(),
            affected: Vec::new(),
            affecting: Vec::new(),
            evaluating: false,
            deleted: false,
        }
    }
}

pub struct Network {
    pub(crate) nodes: Vec<NodeSlot>,
    pub(crate) groups: Vec<GroupSlot>,
    pub(crate) parameters: Vec<ParameterSlot>,
    pub(crate) connections: BTreeMap<ConnectionId, Connection>,
    node_names: HashMap<String, NodeId>,
    events: EventBus,
    pub(crate) config: EvaluationConfig,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    pub fn new() -> Self {
        Self::with_config(EvaluationConfig::default())
    }

    pub fn with_config(config: EvaluationConfig) -> Self {
        Self {
            nodes: Vec::new(),
            groups: Vec::new(),
            parameters: Vec::new(),
            connections: BTreeMap::new(),
            node_names: HashMap::new(),
            events: EventBus::new(),
            config,
        }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EvaluationConfig) {
        self.config = config;
    }

    /// Receive every `ParameterEvent` emitted from now on.
    pub fn subscribe(&mut self) -> Receiver<ParameterEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&mut self, event: ParameterEvent) {
        self.events.emit(event);
    }

    // ── Slot access ──

    pub(crate) fn slot(&self, id: ParameterId) -> Option<&ParameterSlot> {
        self.parameters.get(id.index()).filter(|s| !s.deleted)
    }

    pub(crate) fn slot_mut(&mut self, id: ParameterId) -> Option<&mut ParameterSlot> {
        self.parameters.get_mut(id.index()).filter(|s| !s.deleted)
    }

    pub(crate) fn require(&self, id: ParameterId) -> EngineResult<&ParameterSlot> {
        self.slot(id).ok_or(EngineError::UnknownParameterId(id))
    }

    pub(crate) fn require_mut(&mut self, id: ParameterId) -> EngineResult<&mut ParameterSlot> {
        self.slot_mut(id).ok_or(EngineError::UnknownParameterId(id))
    }

    fn group_slot(&self, id: GroupId) -> Option<&GroupSlot> {
        self.groups.get(id.index()).filter(|s| !s.deleted)
    }

    fn group_slot_mut(&mut self, id: GroupId) -> Option<&mut GroupSlot> {
        self.groups.get_mut(id.index()).filter(|s| !s.deleted)
    }

    fn node_slot(&self, id: NodeId) -> Option<&NodeSlot> {
        self.nodes.get(id.index()).filter(|s| !s.deleted)
    }

    fn node_slot_mut(&mut self, id: NodeId) -> Option<&mut NodeSlot> {
        self.nodes.get_mut(id.index()).filter(|s| !s.deleted)
    }

    // ── Nodes ──

    /// Add a node with its own (empty) parameter root. Taken names get a
    /// numeric suffix.
    pub fn add_node(&mut self, name: &str, behavior: Arc<dyn NodeBehavior>) -> NodeId {
        self.add_typed_node(name, "", behavior)
    }

    /// Add a node without behavior of its own.
    pub fn add_passive_node(&mut self, name: &str) -> NodeId {
        self.add_node(name, Arc::new(PassiveNode))
    }

    pub(crate) fn add_typed_node(
        &mut self,
        name: &str,
        type_name: &str,
        behavior: Arc<dyn NodeBehavior>,
    ) -> NodeId {
        let name = self.unique_node_name(name);
        let id = NodeId(self.nodes.len() as u32);
        let root = self.create_group("root");
        if let Some(slot) = self.group_slot_mut(root) {
            slot.node = Some(id);
        }
        self.nodes.push(NodeSlot {
            name: name.clone(),
            type_name: type_name.to_string(),
            root,
            behavior,
            connections: BTreeSet::new(),
            deleted: false,
        });
        self.node_names.insert(name.clone(), id);
        tracing::debug!("Added node \"{}\" ({})", name, id);
        id
    }

    pub(crate) fn unique_node_name(&self, base: &str) -> String {
        if !self.node_names.contains_key(base) {
            return base.to_string();
        }
        let mut counter = 2;
        loop {
            let candidate = format!("{}{}", base, counter);
            if !self.node_names.contains_key(&candidate) {
                tracing::warn!(
                    "A node named \"{}\" already exists, using \"{}\"",
                    base,
                    candidate
                );
                return candidate;
            }
            counter += 1;
        }
    }

    /// Destroy a node together with its parameter tree and connections.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let Some(slot) = self.node_slot(id) else {
            return false;
        };
        let root = slot.root;
        let name = slot.name.clone();
        self.destroy_group(root);
        let remaining: Vec<ConnectionId> = self
            .node_slot(id)
            .map(|s| s.connections.iter().copied().collect())
            .unwrap_or_default();
        for connection in remaining {
            self.delete_connection(connection);
        }
        if let Some(slot) = self.node_slot_mut(id) {
            slot.deleted = true;
        }
        self.node_names.remove(&name);
        tracing::debug!("Removed node \"{}\"", name);
        true
    }

    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        self.node_slot(id).map(|s| s.name.as_str())
    }

    pub fn node_type_name(&self, id: NodeId) -> Option<&str> {
        self.node_slot(id).map(|s| s.type_name.as_str())
    }

    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.node_names.get(name).copied()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.deleted)
            .map(|(i, _)| NodeId(i as u32))
    }

    pub fn parameter_root(&self, node: NodeId) -> Option<GroupId> {
        self.node_slot(node).map(|s| s.root)
    }

    pub fn behavior(&self, node: NodeId) -> Option<Arc<dyn NodeBehavior>> {
        self.node_slot(node).map(|s| Arc::clone(&s.behavior))
    }

    /// The node's connection table.
    pub fn node_connections(&self, node: NodeId) -> Vec<ConnectionId> {
        self.node_slot(node)
            .map(|s| s.connections.iter().copied().collect())
            .unwrap_or_default()
    }

    // ── Groups ──

    /// Create a group that belongs to no node yet.
    pub fn create_group(&mut self, name: &str) -> GroupId {
        let id = GroupId(self.groups.len() as u32);
        self.groups.push(GroupSlot {
            group: ParameterGroup::new(name),
            node: None,
            parent: None,
            deleted: false,
        });
        id
    }

    /// Create a group and attach it under `parent`.
    pub fn add_group(&mut self, parent: GroupId, name: &str) -> Option<GroupId> {
        let id = self.create_group(name);
        if self.attach_group(parent, id, false) {
            Some(id)
        } else {
            if let Some(slot) = self.group_slot_mut(id) {
                slot.deleted = true;
            }
            None
        }
    }

    /// Attach a detached group under `parent`, adopting the parent's node for
    /// the whole subtree.
    pub fn attach_group(&mut self, parent: GroupId, child: GroupId, prepend: bool) -> bool {
        let Some(name) = self.group_slot(child).map(|s| s.group.name().to_string()) else {
            return false;
        };
        let Some(parent_slot) = self.group_slot_mut(parent) else {
            return false;
        };
        if !parent_slot.group.insert(&name, child.into(), prepend) {
            let node = parent_slot.node;
            tracing::error!(
                "A parameter \"{}.{}\" already exists.",
                self.node_label(node),
                name
            );
            return false;
        }
        let node = parent_slot.node;
        let enabled = parent_slot.group.enabled;
        if let Some(slot) = self.group_slot_mut(child) {
            slot.parent = Some(parent);
        }
        self.adopt_subtree(child, node);
        if !enabled {
            self.set_group_enabled(child, false);
        }
        true
    }

    fn adopt_subtree(&mut self, group: GroupId, node: Option<NodeId>) {
        let children = match self.group_slot_mut(group) {
            Some(slot) => {
                slot.node = node;
                slot.group.children().to_vec()
            }
            None => return,
        };
        for child in children {
            match child {
                AbstractParameterId::Parameter(p) => {
                    if let Some(slot) = self.slot_mut(p) {
                        slot.node = node;
                    }
                }
                AbstractParameterId::Group(g) => self.adopt_subtree(g, node),
            }
        }
    }

    pub fn group(&self, id: GroupId) -> Option<&ParameterGroup> {
        self.group_slot(id).map(|s| &s.group)
    }

    pub fn group_node(&self, id: GroupId) -> Option<NodeId> {
        self.group_slot(id).and_then(|s| s.node)
    }

    /// Direct children of a group in display order.
    pub fn parameter_list(&self, group: GroupId) -> &[AbstractParameterId] {
        self.group(group).map(|g| g.children()).unwrap_or(&[])
    }

    /// Look up a nested group; `recursive` searches depth-first.
    pub fn get_parameter_group(&self, group: GroupId, name: &str, recursive: bool) -> Option<GroupId> {
        let g = self.group(group)?;
        match g.child(name) {
            Some(AbstractParameterId::Group(found)) => Some(found),
            Some(AbstractParameterId::Parameter(_)) => None,
            None if recursive => g
                .children()
                .iter()
                .filter_map(|c| c.as_group())
                .find_map(|sub| self.get_parameter_group(sub, name, true)),
            None => None,
        }
    }

    /// Destroy the nested group named `name` and everything in it.
    pub fn remove_parameter_group(&mut self, parent: GroupId, name: &str) -> bool {
        match self.group(parent).and_then(|g| g.child(name)) {
            Some(AbstractParameterId::Group(id)) => self.destroy_group(id),
            _ => false,
        }
    }

    /// Destroy every child of `group`, leaving it empty.
    pub fn destroy_all_parameters(&mut self, group: GroupId) {
        let children: Vec<AbstractParameterId> = self.parameter_list(group).to_vec();
        for child in children {
            match child {
                AbstractParameterId::Parameter(p) => {
                    self.destroy_parameter(p);
                }
                AbstractParameterId::Group(g) => {
                    self.destroy_group(g);
                }
            }
        }
    }

    pub fn destroy_group(&mut self, id: GroupId) -> bool {
        let Some(parent) = self.group_slot(id).map(|s| s.parent) else {
            return false;
        };
        self.destroy_all_parameters(id);
        if let Some(parent) = parent {
            if let Some(slot) = self.group_slot_mut(parent) {
                slot.group.remove_child(id.into());
            }
        }
        if let Some(slot) = self.group_slot_mut(id) {
            slot.group.clear();
            slot.deleted = true;
        }
        true
    }

    /// Enable or disable a group and everything below it.
    pub fn set_group_enabled(&mut self, group: GroupId, enabled: bool) {
        let children = match self.group_slot_mut(group) {
            Some(slot) => {
                slot.group.enabled = enabled;
                slot.group.children().to_vec()
            }
            None => return,
        };
        for child in children {
            match child {
                AbstractParameterId::Parameter(p) => {
                    if let Some(slot) = self.slot_mut(p) {
                        slot.parameter.enabled = enabled;
                    }
                }
                AbstractParameterId::Group(g) => self.set_group_enabled(g, enabled),
            }
        }
    }

    /// A group is visible if any of its children is.
    pub fn is_group_visible(&self, group: GroupId) -> bool {
        self.parameter_list(group).iter().any(|child| match child {
            AbstractParameterId::Parameter(p) => {
                self.parameter(*p).map(|p| p.is_visible()).unwrap_or(false)
            }
            AbstractParameterId::Group(g) => self.is_group_visible(*g),
        })
    }

    /// Move leaves ahead of nested groups.
    pub fn sort_parameters(&mut self, group: GroupId) {
        if let Some(slot) = self.group_slot_mut(group) {
            slot.group.sort_leaves_first();
        }
    }

    // ── Parameters ──

    /// Store a parameter that belongs to no group or node yet.
    pub fn create_parameter(&mut self, parameter: Parameter) -> ParameterId {
        let id = ParameterId(self.parameters.len() as u32);
        self.parameters.push(ParameterSlot::new(parameter));
        id
    }

    /// Add a parameter to a group. Fails (logged) on a duplicate name.
    pub fn add_parameter(&mut self, group: GroupId, parameter: Parameter) -> Option<ParameterId> {
        self.insert_parameter(group, parameter, Placement::Append)
    }

    /// Add a parameter at the very front of a group.
    pub fn prepend_parameter(&mut self, group: GroupId, parameter: Parameter) -> Option<ParameterId> {
        self.insert_parameter(group, parameter, Placement::Prepend)
    }

    pub fn add_parameter_after(
        &mut self,
        group: GroupId,
        parameter: Parameter,
        anchor: &str,
    ) -> Option<ParameterId> {
        self.insert_parameter(group, parameter, Placement::After(anchor))
    }

    pub fn add_parameter_before(
        &mut self,
        group: GroupId,
        parameter: Parameter,
        anchor: &str,
    ) -> Option<ParameterId> {
        self.insert_parameter(group, parameter, Placement::Before(anchor))
    }

    fn insert_parameter(
        &mut self,
        group: GroupId,
        parameter: Parameter,
        placement: Placement<'_>,
    ) -> Option<ParameterId> {
        let Some(group_slot) = self.group_slot(group) else {
            tracing::error!("Cannot add parameter \"{}\": unknown group {}", parameter.name, group);
            return None;
        };
        if group_slot.group.contains_name(&parameter.name) {
            tracing::error!(
                "A parameter \"{}.{}\" already exists.",
                self.node_label(group_slot.node),
                parameter.name
            );
            return None;
        }
        let id = self.create_parameter(parameter);
        self.attach_parameter(group, id, placement);
        Some(id)
    }

    fn attach_parameter(&mut self, group: GroupId, id: ParameterId, placement: Placement<'_>) -> bool {
        let Some(name) = self.slot(id).map(|s| s.parameter.name.clone()) else {
            return false;
        };
        let Some(group_slot) = self.group_slot_mut(group) else {
            return false;
        };
        let inserted = match placement {
            Placement::Append => group_slot.group.insert(&name, id.into(), false),
            Placement::Prepend => group_slot.group.insert(&name, id.into(), true),
            Placement::After(anchor) => group_slot.group.insert_next_to(&name, id.into(), anchor, true),
            Placement::Before(anchor) => {
                group_slot.group.insert_next_to(&name, id.into(), anchor, false)
            }
        };
        if !inserted {
            return false;
        }
        let node = group_slot.node;
        let enabled = group_slot.group.enabled;
        if let Some(slot) = self.slot_mut(id) {
            slot.node = node;
            slot.parent = Some(group);
            if !enabled {
                slot.parameter.enabled = false;
            }
        }
        true
    }

    pub fn parameter(&self, id: ParameterId) -> Option<&Parameter> {
        self.slot(id).map(|s| &s.parameter)
    }

    /// Direct access to the record. Writes through this handle bypass
    /// change notifications and dirty propagation.
    pub fn parameter_mut(&mut self, id: ParameterId) -> Option<&mut Parameter> {
        self.slot_mut(id).map(|s| &mut s.parameter)
    }

    /// Current value without triggering evaluation.
    pub fn value(&self, id: ParameterId) -> Option<&Value> {
        self.parameter(id).map(|p| &p.value)
    }

    pub fn is_dirty(&self, id: ParameterId) -> bool {
        self.parameter(id).map(|p| p.dirty).unwrap_or(false)
    }

    pub fn is_aux_dirty(&self, id: ParameterId) -> bool {
        self.parameter(id).map(|p| p.aux_dirty).unwrap_or(false)
    }

    pub fn parameter_node(&self, id: ParameterId) -> Option<NodeId> {
        self.slot(id).and_then(|s| s.node)
    }

    pub fn parameter_parent(&self, id: ParameterId) -> Option<GroupId> {
        self.slot(id).and_then(|s| s.parent)
    }

    /// "node.parameter", or just the parameter name when detached.
    pub fn path(&self, id: ParameterId) -> String {
        match self.slot(id) {
            Some(slot) => match slot.node.and_then(|n| self.node_name(n)) {
                Some(node) => format!("{}.{}", node, slot.parameter.name),
                None => slot.parameter.name.clone(),
            },
            None => format!("<destroyed {}>", id),
        }
    }

    fn node_label(&self, node: Option<NodeId>) -> &str {
        node.and_then(|n| self.node_name(n)).unwrap_or("NO_NODE")
    }

    /// Resolve a parameter by name below `group`.
    ///
    /// Names may be paths ("outer > inner > name"). A plain name is looked up
    /// among the direct children first and then depth-first in nested groups.
    pub fn get_parameter(&self, group: GroupId, name: &str) -> Option<ParameterId> {
        let g = self.group(group)?;
        if let Some((first, rest)) = name.split_once(PATH_SEPARATOR) {
            return match g.child(first) {
                Some(AbstractParameterId::Group(sub)) => self.get_parameter(sub, rest),
                _ => None,
            };
        }
        match g.child(name) {
            Some(AbstractParameterId::Parameter(p)) => Some(p),
            Some(AbstractParameterId::Group(_)) => None,
            None => g
                .children()
                .iter()
                .filter_map(|c| c.as_group())
                .find_map(|sub| self.get_parameter(sub, name)),
        }
    }

    /// Resolve a parameter of a node by name or path.
    pub fn find_parameter(&self, node: NodeId, name: &str) -> Option<ParameterId> {
        self.get_parameter(self.parameter_root(node)?, name)
    }

    /// Remove and destroy the named parameter. With `dive_in_groups` the
    /// name may also match a parameter of a nested group.
    pub fn remove_parameter(&mut self, group: GroupId, name: &str, dive_in_groups: bool) -> bool {
        let found = match self.group(group).and_then(|g| g.child(name)) {
            Some(AbstractParameterId::Parameter(p)) => Some(p),
            Some(AbstractParameterId::Group(_)) => None,
            None if dive_in_groups => self.get_parameter(group, name),
            None => None,
        };
        match found {
            Some(id) => self.destroy_parameter(id),
            None => false,
        }
    }

    /// Destroy a parameter: every connection it takes part in is detached
    /// from it and deleted through the node, every affects edge is unlinked
    /// on both sides, and it is removed from its group.
    pub fn destroy_parameter(&mut self, id: ParameterId) -> bool {
        let Some(slot) = self.slot(id) else {
            return false;
        };
        let connections: Vec<ConnectionId> = slot.connections.iter().copied().collect();
        let affected = slot.affected.clone();
        let affecting = slot.affecting.clone();
        let parent = slot.parent;

        for connection in connections {
            if let Some(c) = self.connections.get_mut(&connection) {
                c.detach(id);
            }
            self.delete_connection(connection);
        }
        for other in affected {
            if let Some(s) = self.slot_mut(other) {
                s.affecting.retain(|p| *p != id);
            }
        }
        for other in affecting {
            if let Some(s) = self.slot_mut(other) {
                s.affected.retain(|p| *p != id);
            }
        }
        if let Some(parent) = parent {
            if let Some(g) = self.group_slot_mut(parent) {
                g.group.remove_child(id.into());
            }
        }
        tracing::trace!("Destroyed parameter {}", self.path(id));
        if let Some(slot) = self.slot_mut(id) {
            slot.deleted = true;
            slot.connections.clear();
            slot.affected.clear();
            slot.affecting.clear();
            slot.parameter.callbacks.clear();
            slot.parameter.value_list.clear();
        }
        true
    }

    /// Copy a parameter (value and bindings) into `group` under a new name.
    /// Affects edges are copied when the copy lands in the same node.
    pub fn duplicate_parameter(
        &mut self,
        id: ParameterId,
        group: GroupId,
        name: &str,
    ) -> Option<ParameterId> {
        let slot = self.slot(id)?;
        let mut copy = slot.parameter.clone();
        copy.name = name.to_string();
        let source_node = slot.node;
        let affected = slot.affected.clone();
        let affecting = slot.affecting.clone();

        let new_id = self.add_parameter(group, copy)?;
        if self.parameter_node(new_id) == source_node {
            for other in affected {
                if let Err(e) = self.add_affection(new_id, other) {
                    tracing::debug!("Skipped copied affects edge: {}", e);
                }
            }
            for other in affecting {
                if let Err(e) = self.add_affection(other, new_id) {
                    tracing::debug!("Skipped copied affects edge: {}", e);
                }
            }
        }
        Some(new_id)
    }

    // ── Queries ──

    /// Lazy, restartable view over descendant parameters whose lower-cased
    /// name contains `search_text`. An empty search text matches nothing
    /// unless `include_all` is set.
    pub fn filter_parameters<'a>(
        &'a self,
        group: GroupId,
        search_text: &str,
        dive_in_groups: bool,
        include_all: bool,
    ) -> ParameterFilter<'a> {
        ParameterFilter {
            network: self,
            group,
            search_text: search_text.to_string(),
            dive_in_groups,
            include_all,
        }
    }

    /// Every parameter below `group`, depth-first.
    pub fn all_parameters(&self, group: GroupId) -> Vec<ParameterId> {
        self.filter_parameters(group, "", true, true).iter().collect()
    }

    pub fn contains_parameter_type(&self, group: GroupId, parameter_type: ParameterType) -> bool {
        self.all_parameters(group)
            .into_iter()
            .any(|p| self.parameter(p).map(|p| p.parameter_type) == Some(parameter_type))
    }

    pub fn contains_pin_type(&self, group: GroupId, pin_type: PinType) -> bool {
        self.all_parameters(group)
            .into_iter()
            .any(|p| self.parameter(p).map(|p| p.pin_type) == Some(pin_type))
    }

    /// True if some descendant has `pin_type` and the given connection status.
    pub fn contains_connected(&self, group: GroupId, pin_type: PinType, connected: bool) -> bool {
        self.all_parameters(group).into_iter().any(|p| {
            self.parameter(p).map(|p| p.pin_type) == Some(pin_type)
                && self.is_connected(p) == connected
        })
    }

    /// Parameters of a node with the given pin type, optionally only the
    /// connected ones.
    pub fn parameters_by_pin(&self, node: NodeId, pin_type: PinType, connected_only: bool) -> Vec<ParameterId> {
        let Some(root) = self.parameter_root(node) else {
            return Vec::new();
        };
        self.all_parameters(root)
            .into_iter()
            .filter(|p| self.parameter(*p).map(|p| p.pin_type) == Some(pin_type))
            .filter(|p| !connected_only || self.is_connected(*p))
            .collect()
    }

    // ── Affects edges ──

    /// Record that `affecting` affects `affected`. Both directions are
    /// stored here and only here. Self-loops, edges across nodes and (when
    /// configured) edges closing a cycle are refused.
    pub fn add_affection(&mut self, affecting: ParameterId, affected: ParameterId) -> EngineResult<()> {
        let affecting_node = self.require(affecting)?.node;
        let affected_node = self.require(affected)?.node;
        if affecting == affected {
            return Err(EngineError::CyclicDependency {
                path: vec![self.path(affecting), self.path(affected)],
            });
        }
        if affecting_node != affected_node {
            return Err(EngineError::InvalidConnection(format!(
                "affects edge {} -> {} crosses node boundaries",
                self.path(affecting),
                self.path(affected)
            )));
        }
        if self.require(affecting)?.affected.contains(&affected) {
            return Ok(());
        }
        if self.config.reject_cycles {
            if let Some(path) = self.dependency_path(affected, affecting) {
                return Err(self.cycle_error(path, affected));
            }
        }
        self.require_mut(affecting)?.affected.push(affected);
        self.require_mut(affected)?.affecting.push(affecting);
        Ok(())
    }

    /// Remove an affects edge from both sides.
    pub fn remove_affection(&mut self, affecting: ParameterId, affected: ParameterId) -> bool {
        let mut removed = false;
        if let Some(s) = self.slot_mut(affecting) {
            let before = s.affected.len();
            s.affected.retain(|p| *p != affected);
            removed |= before != s.affected.len();
        }
        if let Some(s) = self.slot_mut(affected) {
            let before = s.affecting.len();
            s.affecting.retain(|p| *p != affecting);
            removed |= before != s.affecting.len();
        }
        removed
    }

    /// Declare an affects edge between two parameters of one node by name.
    pub fn add_affection_by_name(&mut self, node: NodeId, affecting: &str, affected: &str) -> EngineResult<()> {
        let node_name = self.node_name(node).unwrap_or_default().to_string();
        let source = self
            .find_parameter(node, affecting)
            .ok_or_else(|| EngineError::UnknownParameter(format!("{}.{}", node_name, affecting)))?;
        let target = self
            .find_parameter(node, affected)
            .ok_or_else(|| EngineError::UnknownParameter(format!("{}.{}", node_name, affected)))?;
        self.add_affection(source, target)
    }

    pub fn affected_parameters(&self, id: ParameterId) -> &[ParameterId] {
        self.slot(id).map(|s| s.affected.as_slice()).unwrap_or(&[])
    }

    pub fn affecting_parameters(&self, id: ParameterId) -> &[ParameterId] {
        self.slot(id).map(|s| s.affecting.as_slice()).unwrap_or(&[])
    }

    /// Dirty-propagation successors: connection targets and affected
    /// parameters.
    fn successors(&self, id: ParameterId) -> Vec<ParameterId> {
        let Some(slot) = self.slot(id) else {
            return Vec::new();
        };
        let mut next: Vec<ParameterId> = slot
            .connections
            .iter()
            .filter_map(|c| self.connections.get(c))
            .filter(|c| c.source() == Some(id))
            .filter_map(|c| c.target())
            .collect();
        next.extend(slot.affected.iter().copied());
        next
    }

    /// A path from `from` to `to` along dependency edges, if one exists.
    pub(crate) fn dependency_path(&self, from: ParameterId, to: ParameterId) -> Option<Vec<ParameterId>> {
        let mut visited = HashSet::new();
        let mut stack = vec![(from, vec![from])];
        while let Some((current, path)) = stack.pop() {
            if current == to {
                return Some(path);
            }
            if !visited.insert(current) {
                continue;
            }
            for next in self.successors(current) {
                if !visited.contains(&next) {
                    let mut extended = path.clone();
                    extended.push(next);
                    stack.push((next, extended));
                }
            }
        }
        None
    }

    fn cycle_error(&self, mut path: Vec<ParameterId>, start: ParameterId) -> EngineError {
        path.push(start);
        EngineError::CyclicDependency {
            path: path.into_iter().map(|p| self.path(p)).collect(),
        }
    }

    // ── Connections ──

    /// Register a connection record. At least one endpoint is required.
    /// Endpoint parameters are not touched; see `add_connection`.
    pub fn create_connection(
        &mut self,
        source: Option<ParameterId>,
        target: Option<ParameterId>,
    ) -> Option<ConnectionId> {
        if source.is_none() && target.is_none() {
            tracing::warn!("Refusing to create a connection without endpoints");
            return None;
        }
        let connection = Connection::create(source, target);
        let id = connection.id();
        self.connections.insert(id, connection);
        Some(id)
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// "Connection src.p -> dst.p".
    pub fn connection_name(&self, id: ConnectionId) -> Option<String> {
        let c = self.connections.get(&id)?;
        let end = |p: Option<ParameterId>| p.map(|p| self.path(p)).unwrap_or_default();
        Some(format!("Connection {} -> {}", end(c.source()), end(c.target())))
    }

    /// Rebind the source. A connection left without endpoints is deleted.
    pub fn set_connection_source(&mut self, id: ConnectionId, source: Option<ParameterId>) -> bool {
        self.rebind_connection(id, |c| c.set_source_parameter(source))
    }

    /// Rebind the target. A connection left without endpoints is deleted.
    pub fn set_connection_target(&mut self, id: ConnectionId, target: Option<ParameterId>) -> bool {
        self.rebind_connection(id, |c| c.set_target_parameter(target))
    }

    /// Endpoints that were dropped lose the id from their map and, when no
    /// endpoint on the same node remains, from that node's table. New
    /// endpoints gain it in both places.
    fn rebind_connection(&mut self, id: ConnectionId, f: impl FnOnce(&mut Connection)) -> bool {
        let Some(connection) = self.connections.get_mut(&id) else {
            return false;
        };
        let before = [connection.source(), connection.target()];
        f(connection);
        let after = [connection.source(), connection.target()];
        let garbage = connection.is_garbage();

        let remaining_nodes: Vec<NodeId> = after
            .iter()
            .flatten()
            .filter_map(|p| self.parameter_node(*p))
            .collect();
        for old in before.iter().flatten().filter(|p| !after.contains(&Some(**p))) {
            if let Some(slot) = self.slot_mut(*old) {
                slot.connections.remove(&id);
            }
            if let Some(node) = self.parameter_node(*old) {
                if !remaining_nodes.contains(&node) {
                    if let Some(n) = self.node_slot_mut(node) {
                        n.connections.remove(&id);
                    }
                }
            }
        }
        for new in after.iter().flatten().filter(|p| !before.contains(&Some(**p))) {
            if let Some(slot) = self.slot_mut(*new) {
                slot.connections.insert(id);
            }
            if let Some(node) = self.parameter_node(*new) {
                if let Some(n) = self.node_slot_mut(node) {
                    n.connections.insert(id);
                }
            }
        }

        if garbage {
            self.delete_connection(id);
        }
        true
    }

    /// Insert a connection into a parameter's connection map and let the
    /// owning node evaluate it right away.
    pub fn add_connection(&mut self, parameter: ParameterId, connection: ConnectionId) -> EngineResult<()> {
        if !self.connections.contains_key(&connection) {
            return Err(EngineError::UnknownConnection(connection));
        }
        let slot = self.require_mut(parameter)?;
        slot.connections.insert(connection);
        let Some(node) = slot.node else {
            return Ok(());
        };
        let behavior = match self.node_slot_mut(node) {
            Some(n) => {
                n.connections.insert(connection);
                Arc::clone(&n.behavior)
            }
            None => return Ok(()),
        };
        let mut ctx = NodeContext::new(self, node, Some(parameter));
        behavior.evaluate_connection(&mut ctx, connection)
    }

    /// Drop a connection from a parameter's map. No propagation.
    pub fn remove_connection(&mut self, parameter: ParameterId, connection: ConnectionId) -> bool {
        self.slot_mut(parameter)
            .map(|s| s.connections.remove(&connection))
            .unwrap_or(false)
    }

    /// Connections of a parameter in id order.
    pub fn connections_of(&self, id: ParameterId) -> Vec<ConnectionId> {
        self.slot(id)
            .map(|s| s.connections.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_connected(&self, id: ParameterId) -> bool {
        self.slot(id).map(|s| !s.connections.is_empty()).unwrap_or(false)
    }

    pub fn connection_count_of(&self, id: ParameterId) -> usize {
        self.slot(id).map(|s| s.connections.len()).unwrap_or(0)
    }

    /// The far endpoint of the connection at `position` in id order.
    pub fn connected_parameter(&self, id: ParameterId, position: usize) -> Option<ParameterId> {
        let slot = self.slot(id)?;
        let connection = slot.connections.iter().nth(position)?;
        self.connections.get(connection)?.other_end(id)
    }

    pub fn connected_parameter_by_id(&self, id: ParameterId, connection: ConnectionId) -> Option<ParameterId> {
        let slot = self.slot(id)?;
        if !slot.connections.contains(&connection) {
            return None;
        }
        self.connections.get(&connection)?.other_end(id)
    }

    /// Join an output parameter to an input parameter.
    ///
    /// Validates pin directions, types, sizes, the target's multiplicity and
    /// (when configured) cycles, then adds the connection to both endpoints,
    /// notifies them and dirties the target. A node refusing the connection
    /// leaves no trace of it.
    pub fn connect(&mut self, source: ParameterId, target: ParameterId) -> EngineResult<ConnectionId> {
        let source_pin = self.require(source)?.parameter.pin_type;
        if source_pin != PinType::Output {
            return Err(EngineError::InvalidConnection(format!(
                "source parameter \"{}\" is not an output parameter",
                self.path(source)
            )));
        }
        self.emit(ParameterEvent::ConnectionCreated {
            parameter: source,
            other: target,
        });
        self.invoke_callback(source, CallbackKind::OnCreateConnection)?;

        let target_pin = self.require(target)?.parameter.pin_type;
        if target_pin != PinType::Input {
            return Err(EngineError::InvalidConnection(format!(
                "target parameter \"{}\" is not an input parameter",
                self.path(target)
            )));
        }
        self.emit(ParameterEvent::ConnectionCreated {
            parameter: target,
            other: source,
        });
        self.invoke_callback(target, CallbackKind::OnCreateConnection)?;

        let src = &self.require(source)?.parameter;
        let (source_type, source_size) = (src.parameter_type, src.size);
        let dst = self.require(target)?;
        let (target_type, target_size) = (dst.parameter.parameter_type, dst.parameter.size);
        let (multiplicity, existing) = (dst.parameter.multiplicity, dst.connections.len());

        if source_type != target_type {
            return Err(EngineError::InvalidConnection(format!(
                "source and target parameters have different types: \"{}\" [{}] and \"{}\" [{}]",
                self.path(source),
                source_type,
                self.path(target),
                target_type
            )));
        }
        if !multiplicity.accepts(existing) {
            return Err(EngineError::InvalidConnection(format!(
                "target parameter \"{}\" already has the maximum of {} incoming connections",
                self.path(target),
                existing
            )));
        }
        if source_size != target_size {
            return Err(EngineError::InvalidConnection(format!(
                "source and target parameters have different sizes: \"{}\" [{}] and \"{}\" [{}]",
                self.path(source),
                source_size,
                self.path(target),
                target_size
            )));
        }
        if self.config.reject_cycles {
            if let Some(path) = self.dependency_path(target, source) {
                return Err(self.cycle_error(path, target));
            }
        }

        let Some(connection) = self.create_connection(Some(source), Some(target)) else {
            return Err(EngineError::InvalidConnection("missing endpoints".into()));
        };
        let linked = self
            .add_connection(source, connection)
            .and_then(|_| self.add_connection(target, connection));
        if let Err(e) = linked {
            tracing::warn!(
                "Connecting {} -> {} failed, dropping connection {}: {}",
                self.path(source),
                self.path(target),
                connection,
                e
            );
            self.delete_connection(connection);
            return Err(e);
        }
        tracing::debug!(
            "Connected {} -> {} ({})",
            self.path(source),
            self.path(target),
            connection
        );

        for parameter in [target, source] {
            self.emit(ParameterEvent::ConnectionEstablished {
                parameter,
                connection,
            });
            self.invoke_callback(parameter, CallbackKind::OnConnect)?;
        }
        self.propagate_dirty(target, true)?;
        Ok(connection)
    }

    /// Explicit user disconnect: notify the target, delete, notify the source.
    pub fn disconnect(&mut self, connection: ConnectionId) -> EngineResult<()> {
        let c = self
            .connections
            .get(&connection)
            .cloned()
            .ok_or(EngineError::UnknownConnection(connection))?;
        if let Some(target) = c.target() {
            self.emit(ParameterEvent::ConnectionDestroyed {
                parameter: target,
                connection,
            });
            self.invoke_callback(target, CallbackKind::OnDisconnect)?;
        }
        self.delete_connection(connection);
        if let Some(source) = c.source() {
            self.emit(ParameterEvent::ConnectionDestroyed {
                parameter: source,
                connection,
            });
            self.invoke_callback(source, CallbackKind::OnDisconnect)?;
        }
        Ok(())
    }

    /// Delete a connection record. Removes it from both endpoint maps and
    /// from every node table, then tells those nodes.
    pub fn delete_connection(&mut self, connection: ConnectionId) -> bool {
        let Some(c) = self.connections.remove(&connection) else {
            return false;
        };
        for endpoint in [c.source(), c.target()].into_iter().flatten() {
            if let Some(slot) = self.slot_mut(endpoint) {
                slot.connections.remove(&connection);
            }
        }
        let mut holders = Vec::new();
        for (index, node) in self.nodes.iter_mut().enumerate() {
            if !node.deleted && node.connections.remove(&connection) {
                holders.push((NodeId(index as u32), Arc::clone(&node.behavior)));
            }
        }
        for (node, behavior) in holders {
            behavior.connection_deleted(node, connection);
        }
        tracing::trace!("Deleted connection {}", connection);
        true
    }

    // ── Callback bindings ──

    fn bind_callback(&mut self, id: ParameterId, kind: CallbackKind, callback: Option<Callback>) -> bool {
        let Some(slot) = self.slot_mut(id) else {
            tracing::warn!("Cannot bind the {} function: unknown parameter {}", kind.name(), id);
            return false;
        };
        if slot.node.is_none() {
            tracing::warn!(
                "The {} function for parameter \"{}\" could not be set, because the parameter has not been added to a node yet.",
                kind.name(),
                slot.parameter.name
            );
            return false;
        }
        slot.parameter.callbacks.set(kind, callback);
        true
    }

    pub fn set_change_function(&mut self, id: ParameterId, callback: Option<Callback>) -> bool {
        let bound = self.bind_callback(id, CallbackKind::Change, callback);
        if let Some(slot) = self.slot(id).filter(|_| bound) {
            if slot.parameter.pin_type == PinType::Input
                && !slot.parameter.callbacks.is_bound(CallbackKind::Processing)
            {
                tracing::warn!(
                    "Input parameter \"{}\" has no processing function! The change function will not be called during parameter evaluation!",
                    self.path(id)
                );
            }
        }
        bound
    }

    pub fn set_processing_function(&mut self, id: ParameterId, callback: Option<Callback>) -> bool {
        self.bind_callback(id, CallbackKind::Processing, callback)
    }

    pub fn set_aux_processing_function(&mut self, id: ParameterId, callback: Option<Callback>) -> bool {
        self.bind_callback(id, CallbackKind::AuxProcessing, callback)
    }

    pub fn set_command_function(&mut self, id: ParameterId, callback: Option<Callback>) -> bool {
        self.bind_callback(id, CallbackKind::Command, callback)
    }

    pub fn set_on_connect_function(&mut self, id: ParameterId, callback: Option<Callback>) -> bool {
        self.bind_callback(id, CallbackKind::OnConnect, callback)
    }

    pub fn set_on_disconnect_function(&mut self, id: ParameterId, callback: Option<Callback>) -> bool {
        self.bind_callback(id, CallbackKind::OnDisconnect, callback)
    }

    pub fn set_on_create_connection_function(&mut self, id: ParameterId, callback: Option<Callback>) -> bool {
        self.bind_callback(id, CallbackKind::OnCreateConnection, callback)
    }

    /// Run a bound callback with a context scoped to the parameter's node.
    /// Detached parameters and unbound kinds are a no-op.
    pub(crate) fn invoke_callback(&mut self, id: ParameterId, kind: CallbackKind) -> EngineResult<()> {
        let (node, callback) = match self.slot(id) {
            Some(slot) => (slot.node, slot.parameter.callbacks.get(kind)),
            None => return Ok(()),
        };
        let (Some(node), Some(callback)) = (node, callback) else {
            return Ok(());
        };
        let mut ctx = NodeContext::new(self, node, Some(id));
        callback(&mut ctx)
    }

    /// Trigger a command parameter.
    pub fn execute_command(&mut self, id: ParameterId) -> EngineResult<()> {
        self.require(id)?;
        self.emit(ParameterEvent::CommandRequested { parameter: id });
        self.invoke_callback(id, CallbackKind::Command)
    }

    /// Run the change function, as done for interactive edits.
    pub fn execute_change(&mut self, id: ParameterId) -> EngineResult<()> {
        self.require(id)?;
        self.emit(ParameterEvent::ChangeRequested { parameter: id });
        self.invoke_callback(id, CallbackKind::Change)
    }

    // ── Values by name ──

    /// Set a value by name below `group`. A trailing "[i]" addresses one
    /// element of a multi-valued parameter. Unknown names are logged.
    pub fn set_value_by_name(
        &mut self,
        group: GroupId,
        name: &str,
        value: Value,
        trigger_dirtying: bool,
    ) -> EngineResult<bool> {
        let (base, index) = split_index_suffix(name);
        let Some(id) = self.get_parameter(group, base) else {
            tracing::error!(
                "Parameter \"{}.{}\" not found.",
                self.node_label(self.group_node(group)),
                name
            );
            return Ok(false);
        };
        match index {
            Some(index) => self.set_value_at(id, index, value, trigger_dirtying)?,
            None => self.set_value(id, value, trigger_dirtying)?,
        }
        Ok(true)
    }

    /// Set a value from its text form, converting according to the
    /// parameter's type. Lists are separated by ", " or a single space;
    /// colors take four components "r g b a".
    pub fn set_value_from_string(
        &mut self,
        group: GroupId,
        name: &str,
        text: &str,
        trigger_dirtying: bool,
    ) -> EngineResult<bool> {
        let Some(id) = self.get_parameter(group, name) else {
            tracing::error!(
                "Parameter \"{}.{}\" not found.",
                self.node_label(self.group_node(group)),
                name
            );
            return Ok(false);
        };
        let (parameter_type, pin_type) = {
            let p = &self.require(id)?.parameter;
            (p.parameter_type, p.pin_type)
        };
        let separator = if text.contains(", ") {
            Some(", ")
        } else if text.contains(' ') {
            Some(" ")
        } else {
            None
        };

        match parameter_type {
            t if t.is_text() => {
                if let Some(value) = Value::parse_scalar(t, text) {
                    self.set_value(id, value, trigger_dirtying)?;
                }
            }
            ParameterType::Generic => {
                if pin_type == PinType::None {
                    self.set_value(id, Value::String(text.to_string()), trigger_dirtying)?;
                }
            }
            ParameterType::Bool => {
                self.set_value(id, Value::Bool(text == "true"), trigger_dirtying)?;
            }
            t if t.is_number() => match separator {
                None => match Value::parse_scalar(t, text) {
                    Some(value) => self.set_value(id, value, trigger_dirtying)?,
                    None => tracing::error!(
                        "The value \"{}\" for parameter \"{}\" could not be converted to {}.",
                        text,
                        name,
                        t
                    ),
                },
                Some(separator) => {
                    for (index, part) in text.split(separator).enumerate() {
                        match Value::parse_scalar(t, part) {
                            Some(value) => self.set_value_at(id, index, value, trigger_dirtying)?,
                            None => tracing::error!(
                                "The value part \"{}\" for parameter \"{}\" could not be converted to {}.",
                                part,
                                name,
                                t
                            ),
                        }
                    }
                }
            },
            ParameterType::Color => {
                if separator.is_some() {
                    if let Some(color) = Color::decode_rgba(&split_components(text)) {
                        self.set_value(id, Value::Color(color), trigger_dirtying)?;
                    }
                }
            }
            ParameterType::Enumeration => {
                let index = text.trim().parse().unwrap_or(0);
                self.set_value(id, Value::Enumeration(index), trigger_dirtying)?;
            }
            other => tracing::warn!(
                "Parameter \"{}\" is not a string parameter. The value \"{}\" should be converted to a <{}>.",
                name,
                text,
                other
            ),
        }
        Ok(true)
    }

    /// Reset every parameter below `group` to its default.
    pub fn reset_group(&mut self, group: GroupId) -> EngineResult<()> {
        for id in self.all_parameters(group) {
            self.reset(id)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Placement<'a> {
    Append,
    Prepend,
    After(&'a str),
    Before(&'a str),
}

/// Split "name[3]" into ("name", Some(3)).
fn split_index_suffix(name: &str) -> (&str, Option<usize>) {
    if let Some(stripped) = name.strip_suffix(']') {
        if let Some(open) = stripped.rfind('[') {
            if let Ok(index) = stripped[open + 1..].parse::<usize>() {
                return (&name[..open], Some(index));
            }
        }
    }
    (name, None)
}

/// Restartable filter over the parameters of a group tree.
pub struct ParameterFilter<'a> {
    network: &'a Network,
    group: GroupId,
    search_text: String,
    dive_in_groups: bool,
    include_all: bool,
}

impl<'a> ParameterFilter<'a> {
    pub fn iter(&self) -> FilterIter<'_> {
        let active = self.include_all || !self.search_text.is_empty();
        FilterIter {
            network: self.network,
            stack: if active { vec![(self.group, 0)] } else { Vec::new() },
            search_text: &self.search_text,
            dive_in_groups: self.dive_in_groups,
            include_all: self.include_all,
            seen: HashSet::new(),
        }
    }
}

impl<'s, 'a> IntoIterator for &'s ParameterFilter<'a> {
    type Item = ParameterId;
    type IntoIter = FilterIter<'s>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct FilterIter<'a> {
    network: &'a Network,
    stack: Vec<(GroupId, usize)>,
    search_text: &'a str,
    dive_in_groups: bool,
    include_all: bool,
    seen: HashSet<ParameterId>,
}

impl Iterator for FilterIter<'_> {
    type Item = ParameterId;

    fn next(&mut self) -> Option<ParameterId> {
        let network = self.network;
        loop {
            let (group, index) = *self.stack.last()?;
            let children = network.parameter_list(group);
            if index >= children.len() {
                self.stack.pop();
                continue;
            }
            if let Some(top) = self.stack.last_mut() {
                top.1 += 1;
            }
            match children[index] {
                AbstractParameterId::Group(sub) => {
                    if self.dive_in_groups {
                        self.stack.push((sub, 0));
                    }
                }
                AbstractParameterId::Parameter(p) => {
                    let matches = self.include_all
                        || network
                            .parameter(p)
                            .map(|p| p.name.to_lowercase().contains(self.search_text))
                            .unwrap_or(false);
                    if matches && self.seen.insert(p) {
                        return Some(p);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::callback::callback;
    use crate::engine::types::Multiplicity;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn float_out(name: &str) -> Parameter {
        Parameter::output(name, ParameterType::Float)
    }

    fn float_in(name: &str) -> Parameter {
        Parameter::input(name, ParameterType::Float)
    }

    #[test]
    fn test_add_parameter_sets_node() {
        let mut net = Network::new();
        let node = net.add_passive_node("geo");
        let root = net.parameter_root(node).unwrap();
        let p = net.add_parameter(root, float_out("out")).unwrap();
        assert_eq!(net.parameter_node(p), Some(node));
        assert_eq!(net.path(p), "geo.out");
    }

    #[test]
    fn test_duplicate_parameter_name_rejected() {
        let mut net = Network::new();
        let node = net.add_passive_node("geo");
        let root = net.parameter_root(node).unwrap();
        assert!(net.add_parameter(root, float_out("x")).is_some());
        assert!(net.add_parameter(root, float_in("x")).is_none());
        assert_eq!(net.parameter_list(root).len(), 1);
    }

    #[test]
    fn test_taken_node_names_get_suffix() {
        let mut net = Network::new();
        let a = net.add_passive_node("cam");
        let b = net.add_passive_node("cam");
        assert_eq!(net.node_name(a), Some("cam"));
        assert_eq!(net.node_name(b), Some("cam2"));
        assert_eq!(net.find_node("cam2"), Some(b));
    }

    #[test]
    fn test_path_lookup_and_recursive_search() {
        let mut net = Network::new();
        let node = net.add_passive_node("light");
        let root = net.parameter_root(node).unwrap();
        let transform = net.add_group(root, "transform").unwrap();
        let inner = net.add_group(transform, "inner").unwrap();
        let pos = net.add_parameter(inner, float_in("position")).unwrap();

        assert_eq!(net.get_parameter(root, "transform > inner > position"), Some(pos));
        assert_eq!(net.get_parameter(root, "position"), Some(pos));
        assert_eq!(net.get_parameter(root, "transform > missing"), None);
        assert_eq!(net.get_parameter_group(root, "inner", true), Some(inner));
        assert_eq!(net.get_parameter_group(root, "inner", false), None);
        assert_eq!(net.parameter_node(pos), Some(node));
    }

    #[test]
    fn test_attach_detached_group_adopts_node() {
        let mut net = Network::new();
        let node = net.add_passive_node("db");
        let root = net.parameter_root(node).unwrap();
        let group = net.create_group("rows");
        let p = net.add_parameter(group, float_in("row0")).unwrap();
        assert_eq!(net.parameter_node(p), None);

        assert!(net.attach_group(root, group, false));
        assert_eq!(net.parameter_node(p), Some(node));
    }

    #[test]
    fn test_binding_requires_node() {
        let mut net = Network::new();
        let detached = net.create_parameter(float_in("loose"));
        assert!(!net.set_processing_function(detached, Some(callback(|_| Ok(())))));

        let node = net.add_passive_node("n");
        let root = net.parameter_root(node).unwrap();
        let p = net.add_parameter(root, float_in("x")).unwrap();
        assert!(net.set_processing_function(p, Some(callback(|_| Ok(())))));
        assert!(net.parameter(p).unwrap().callbacks().is_bound(CallbackKind::Processing));
        assert!(net.set_processing_function(p, None));
        assert!(!net.parameter(p).unwrap().callbacks().is_bound(CallbackKind::Processing));
    }

    #[test]
    fn test_affection_is_reciprocal() {
        let mut net = Network::new();
        let node = net.add_passive_node("n");
        let root = net.parameter_root(node).unwrap();
        let x = net.add_parameter(root, float_in("x")).unwrap();
        let y = net.add_parameter(root, float_out("y")).unwrap();

        net.add_affection(x, y).unwrap();
        assert_eq!(net.affected_parameters(x), &[y]);
        assert_eq!(net.affecting_parameters(y), &[x]);

        // adding twice keeps the lists duplicate-free
        net.add_affection(x, y).unwrap();
        assert_eq!(net.affected_parameters(x).len(), 1);

        assert!(net.remove_affection(x, y));
        assert!(net.affected_parameters(x).is_empty());
        assert!(net.affecting_parameters(y).is_empty());
    }

    #[test]
    fn test_affection_rejects_self_loop_and_cross_node() {
        let mut net = Network::new();
        let a = net.add_passive_node("a");
        let b = net.add_passive_node("b");
        let ra = net.parameter_root(a).unwrap();
        let rb = net.parameter_root(b).unwrap();
        let x = net.add_parameter(ra, float_in("x")).unwrap();
        let y = net.add_parameter(rb, float_in("y")).unwrap();

        assert!(net.add_affection(x, x).unwrap_err().is_cycle());
        assert!(matches!(
            net.add_affection(x, y),
            Err(EngineError::InvalidConnection(_))
        ));
    }

    #[test]
    fn test_affection_rejects_cycle() {
        let mut net = Network::new();
        let node = net.add_passive_node("n");
        let root = net.parameter_root(node).unwrap();
        let a = net.add_parameter(root, float_in("a")).unwrap();
        let b = net.add_parameter(root, float_in("b")).unwrap();
        let c = net.add_parameter(root, float_in("c")).unwrap();
        net.add_affection(a, b).unwrap();
        net.add_affection(b, c).unwrap();
        let err = net.add_affection(c, a).unwrap_err();
        assert!(err.is_cycle());
        assert!(net.affected_parameters(c).is_empty());
    }

    #[test]
    fn test_connect_validates_pins_and_types() {
        let mut net = Network::new();
        let a = net.add_passive_node("a");
        let b = net.add_passive_node("b");
        let ra = net.parameter_root(a).unwrap();
        let rb = net.parameter_root(b).unwrap();
        let out = net.add_parameter(ra, float_out("out")).unwrap();
        let text_in = net
            .add_parameter(rb, Parameter::input("label", ParameterType::String))
            .unwrap();
        let inp = net.add_parameter(rb, float_in("in")).unwrap();

        assert!(net.connect(inp, out).is_err());
        assert!(net.connect(out, text_in).is_err());
        assert!(net.connect(out, inp).is_ok());
        // multiplicity of one
        assert!(net.connect(out, inp).is_err());
    }

    #[test]
    fn test_connect_rejects_size_mismatch() {
        let mut net = Network::new();
        let a = net.add_passive_node("a");
        let b = net.add_passive_node("b");
        let ra = net.parameter_root(a).unwrap();
        let rb = net.parameter_root(b).unwrap();
        let out = net
            .add_parameter(ra, float_out("out").with_default([0.0, 0.0, 0.0]))
            .unwrap();
        let inp = net.add_parameter(rb, float_in("in")).unwrap();
        assert!(matches!(
            net.connect(out, inp),
            Err(EngineError::InvalidConnection(_))
        ));
    }

    #[test]
    fn test_connect_rejects_cycle_across_nodes() {
        let mut net = Network::new();
        let a = net.add_passive_node("a");
        let b = net.add_passive_node("b");
        let ra = net.parameter_root(a).unwrap();
        let rb = net.parameter_root(b).unwrap();
        let a_in = net.add_parameter(ra, float_in("in")).unwrap();
        let a_out = net.add_parameter(ra, float_out("out")).unwrap();
        let b_in = net.add_parameter(rb, float_in("in")).unwrap();
        let b_out = net.add_parameter(rb, float_out("out")).unwrap();
        net.add_affection(a_in, a_out).unwrap();
        net.add_affection(b_in, b_out).unwrap();
        net.connect(a_out, b_in).unwrap();
        let err = net.connect(b_out, a_in).unwrap_err();
        assert!(err.is_cycle());
        assert!(!net.is_connected(a_in));
    }

    #[test]
    fn test_connected_parameter_queries() {
        let mut net = Network::new();
        let a = net.add_passive_node("a");
        let b = net.add_passive_node("b");
        let ra = net.parameter_root(a).unwrap();
        let rb = net.parameter_root(b).unwrap();
        let out = net.add_parameter(ra, float_out("out")).unwrap();
        let inp = net.add_parameter(rb, float_in("in")).unwrap();
        let c = net.connect(out, inp).unwrap();

        assert_eq!(net.connected_parameter(inp, 0), Some(out));
        assert_eq!(net.connected_parameter(inp, 1), None);
        assert_eq!(net.connected_parameter_by_id(out, c), Some(inp));
        assert_eq!(net.connection_name(c).unwrap(), "Connection a.out -> b.in");
        assert_eq!(net.node_connections(a), vec![c]);
        assert_eq!(net.node_connections(b), vec![c]);
        assert_eq!(net.parameters_by_pin(b, PinType::Input, true), vec![inp]);
    }

    #[test]
    fn test_disconnect_notifies_both_sides() {
        let mut net = Network::new();
        let a = net.add_passive_node("a");
        let b = net.add_passive_node("b");
        let ra = net.parameter_root(a).unwrap();
        let rb = net.parameter_root(b).unwrap();
        let out = net.add_parameter(ra, float_out("out")).unwrap();
        let inp = net.add_parameter(rb, float_in("in")).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        for p in [out, inp] {
            let calls = Arc::clone(&calls);
            net.set_on_disconnect_function(
                p,
                Some(callback(move |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })),
            );
        }
        let c = net.connect(out, inp).unwrap();
        net.disconnect(c).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(net.connection(c).is_none());
        assert!(!net.is_connected(out));
        assert!(!net.is_connected(inp));
        assert!(net.node_connections(a).is_empty());
    }

    #[test]
    fn test_add_connection_evaluates_through_node() {
        struct Recorder(Mutex<Vec<ConnectionId>>);
        impl NodeBehavior for Recorder {
            fn evaluate_connection(
                &self,
                _ctx: &mut NodeContext<'_>,
                connection: ConnectionId,
            ) -> EngineResult<()> {
                self.0.lock().unwrap().push(connection);
                Ok(())
            }
        }

        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let mut net = Network::new();
        let a = net.add_passive_node("a");
        let b = net.add_node("b", recorder.clone());
        let ra = net.parameter_root(a).unwrap();
        let rb = net.parameter_root(b).unwrap();
        let out = net.add_parameter(ra, float_out("out")).unwrap();
        let inp = net.add_parameter(rb, float_in("in")).unwrap();

        let c = net.connect(out, inp).unwrap();
        assert_eq!(*recorder.0.lock().unwrap(), vec![c]);
    }

    #[test]
    fn test_partial_connection_becomes_garbage() {
        let mut net = Network::new();
        let node = net.add_passive_node("a");
        let root = net.parameter_root(node).unwrap();
        let out = net.add_parameter(root, float_out("out")).unwrap();

        assert!(net.create_connection(None, None).is_none());
        let c = net.create_connection(Some(out), None).unwrap();
        assert!(net.connection(c).is_some());
        net.set_connection_source(c, None);
        assert!(net.connection(c).is_none());
    }

    #[test]
    fn test_filter_parameters_is_lazy_and_restartable() {
        let mut net = Network::new();
        let node = net.add_passive_node("n");
        let root = net.parameter_root(node).unwrap();
        let sub = net.add_group(root, "sub").unwrap();
        let a = net.add_parameter(root, float_in("PositionX")).unwrap();
        let b = net.add_parameter(sub, float_in("positionY")).unwrap();
        net.add_parameter(root, float_in("scale")).unwrap();

        let filter = net.filter_parameters(root, "position", true, false);
        let first: Vec<_> = filter.iter().collect();
        let second: Vec<_> = filter.iter().collect();
        assert_eq!(first, vec![a, b]);
        assert_eq!(first, second);

        let shallow: Vec<_> = net.filter_parameters(root, "position", false, false).iter().collect();
        assert_eq!(shallow, vec![a]);

        assert_eq!(net.filter_parameters(root, "", true, false).iter().count(), 0);
        assert_eq!(net.filter_parameters(root, "", true, true).iter().count(), 3);
    }

    #[test]
    fn test_contains_queries() {
        let mut net = Network::new();
        let node = net.add_passive_node("n");
        let root = net.parameter_root(node).unwrap();
        let sub = net.add_group(root, "sub").unwrap();
        net.add_parameter(sub, Parameter::input("mesh", ParameterType::Geometry))
            .unwrap();

        assert!(net.contains_parameter_type(root, ParameterType::Geometry));
        assert!(!net.contains_parameter_type(root, ParameterType::Camera));
        assert!(net.contains_pin_type(root, PinType::Input));
        assert!(!net.contains_pin_type(root, PinType::Output));
        assert!(net.contains_connected(root, PinType::Input, false));
        assert!(!net.contains_connected(root, PinType::Input, true));
    }

    #[test]
    fn test_set_value_from_string() {
        let mut net = Network::new();
        let node = net.add_passive_node("n");
        let root = net.parameter_root(node).unwrap();
        let count = net
            .add_parameter(root, Parameter::create("count", ParameterType::Int, None))
            .unwrap();
        let pos = net
            .add_parameter(
                root,
                Parameter::create("pos", ParameterType::Float, Some(Value::Vector3([0.0; 3]))),
            )
            .unwrap();
        let tint = net
            .add_parameter(root, Parameter::create("tint", ParameterType::Color, None))
            .unwrap();
        let on = net
            .add_parameter(root, Parameter::create("on", ParameterType::Bool, None))
            .unwrap();

        assert!(net.set_value_from_string(root, "count", "7", false).unwrap());
        assert!(net.set_value_from_string(root, "pos", "1, 2, 3", false).unwrap());
        assert!(net.set_value_from_string(root, "tint", "10 20 30 40", false).unwrap());
        assert!(net.set_value_from_string(root, "on", "true", false).unwrap());
        assert!(!net.set_value_from_string(root, "missing", "1", false).unwrap());

        assert_eq!(net.value(count), Some(&Value::Int(7)));
        assert_eq!(net.value(pos), Some(&Value::Vector3([1.0, 2.0, 3.0])));
        assert_eq!(net.value(tint), Some(&Value::Color(Color::rgba(10, 20, 30, 40))));
        assert_eq!(net.value(on), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_set_value_by_name_with_index() {
        let mut net = Network::new();
        let node = net.add_passive_node("n");
        let root = net.parameter_root(node).unwrap();
        let pos = net
            .add_parameter(
                root,
                Parameter::create("pos", ParameterType::Float, Some(Value::Vector3([0.0; 3]))),
            )
            .unwrap();
        assert!(net
            .set_value_by_name(root, "pos[2]", Value::Float(9.0), false)
            .unwrap());
        assert_eq!(net.value(pos), Some(&Value::Vector3([0.0, 0.0, 9.0])));
        assert_eq!(split_index_suffix("a[12]"), ("a", Some(12)));
        assert_eq!(split_index_suffix("a[x]"), ("a[x]", None));
    }

    #[test]
    fn test_group_enabled_and_visible() {
        let mut net = Network::new();
        let node = net.add_passive_node("n");
        let root = net.parameter_root(node).unwrap();
        let sub = net.add_group(root, "sub").unwrap();
        let p = net.add_parameter(sub, float_in("x")).unwrap();

        net.set_group_enabled(root, false);
        assert!(!net.parameter(p).unwrap().is_enabled());
        // parameters added to a disabled group start disabled
        let q = net.add_parameter(sub, float_in("y")).unwrap();
        assert!(!net.parameter(q).unwrap().is_enabled());

        assert!(net.is_group_visible(root));
        net.parameter_mut(p).unwrap().set_visible(false);
        net.parameter_mut(q).unwrap().set_visible(false);
        assert!(!net.is_group_visible(root));
    }

    #[test]
    fn test_remove_parameter_group_destroys_children() {
        let mut net = Network::new();
        let node = net.add_passive_node("n");
        let root = net.parameter_root(node).unwrap();
        let sub = net.add_group(root, "sub").unwrap();
        let p = net.add_parameter(sub, float_in("x")).unwrap();

        assert!(net.remove_parameter_group(root, "sub"));
        assert!(net.parameter(p).is_none());
        assert!(net.group(sub).is_none());
        assert!(net.parameter_list(root).is_empty());
    }

    #[test]
    fn test_duplicate_parameter_copies_edges_within_node() {
        let mut net = Network::new();
        let node = net.add_passive_node("n");
        let root = net.parameter_root(node).unwrap();
        let a = net.add_parameter(root, float_in("a")).unwrap();
        let b = net
            .add_parameter(root, float_out("b").with_multiplicity(Multiplicity::Exactly(1)))
            .unwrap();
        net.add_affection(a, b).unwrap();

        let copy = net.duplicate_parameter(a, root, "a2").unwrap();
        assert_eq!(net.affected_parameters(copy), &[b]);
        assert_eq!(net.affecting_parameters(b), &[a, copy]);
    }
}
