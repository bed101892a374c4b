//! The parameter group record: an ordered, name-unique list of children.
//!
//! Leaf parameters are kept ahead of nested groups: a leaf appended to a
//! group lands before the first child group and a group is appended at the
//! end. Prepending puts a leaf at the very front and a group in front of the
//! other groups. Child order is significant for pin display order.

use crate::engine::id::AbstractParameterId;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ParameterGroup {
    name: String,
    children: Vec<AbstractParameterId>,
    names: HashMap<String, AbstractParameterId>,
    pub(crate) enabled: bool,
}

impl ParameterGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            names: HashMap::new(),
            enabled: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Direct children in display order.
    pub fn children(&self) -> &[AbstractParameterId] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<AbstractParameterId> {
        self.names.get(name).copied()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn name_of(&self, child: AbstractParameterId) -> Option<&str> {
        self.names
            .iter()
            .find(|(_, id)| **id == child)
            .map(|(name, _)| name.as_str())
    }

    /// Insert a child. Returns false if the name is taken.
    pub(crate) fn insert(&mut self, name: &str, child: AbstractParameterId, prepend: bool) -> bool {
        if self.names.contains_key(name) {
            return false;
        }
        let first_group = self
            .children
            .iter()
            .position(|c| c.is_group())
            .unwrap_or(self.children.len());
        let position = match (child.is_group(), prepend) {
            (true, false) => self.children.len(),
            (false, true) => 0,
            _ => first_group,
        };
        self.children.insert(position, child);
        self.names.insert(name.to_string(), child);
        true
    }

    /// Insert a leaf directly after (or before) the sibling named `anchor`.
    /// Groups are always appended; a missing anchor appends as well.
    pub(crate) fn insert_next_to(
        &mut self,
        name: &str,
        child: AbstractParameterId,
        anchor: &str,
        after: bool,
    ) -> bool {
        if self.names.contains_key(name) {
            return false;
        }
        let anchor_index = self
            .names
            .get(anchor)
            .and_then(|anchor_id| self.children.iter().position(|c| c == anchor_id));
        let position = match anchor_index {
            Some(index) if !child.is_group() => {
                if after {
                    index + 1
                } else {
                    index
                }
            }
            _ => self.children.len(),
        };
        self.children.insert(position, child);
        self.names.insert(name.to_string(), child);
        true
    }

    pub(crate) fn remove_child(&mut self, child: AbstractParameterId) -> bool {
        let before = self.children.len();
        self.children.retain(|c| *c != child);
        self.names.retain(|_, id| *id != child);
        before != self.children.len()
    }

    pub(crate) fn clear(&mut self) -> Vec<AbstractParameterId> {
        self.names.clear();
        std::mem::take(&mut self.children)
    }

    /// Move every leaf ahead of every group, keeping relative order.
    pub(crate) fn sort_leaves_first(&mut self) {
        self.children.sort_by_key(|c| c.is_group());
    }
}
