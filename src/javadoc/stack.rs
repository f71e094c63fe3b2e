//! Parser stacks.
//!
//! Identifiers are kept with a parallel length stack so a qualified name
//! (`java.util.List`) occupies one length slot. The node stack groups
//! consecutive nodes of one tag family the same way; group `i` belongs to
//! family `i % ORDERED_TAGS`.

use super::ast::Span;

pub(crate) const ORDERED_TAGS: usize = 3;
pub(crate) const PARAM_GROUP: usize = 0;
pub(crate) const THROWS_GROUP: usize = 1;
pub(crate) const SEE_GROUP: usize = 2;

const IDENTIFIER_CAPACITY: usize = 20;
const IDENTIFIER_LENGTH_CAPACITY: usize = 10;
const NODE_CAPACITY: usize = 30;
const NODE_LENGTH_CAPACITY: usize = 20;

#[derive(Debug)]
pub(crate) struct IdentifierStack {
    names: Vec<String>,
    positions: Vec<Span>,
    lengths: Vec<usize>,
}

impl IdentifierStack {
    pub fn new() -> Self {
        Self {
            names: Vec::with_capacity(IDENTIFIER_CAPACITY),
            positions: Vec::with_capacity(IDENTIFIER_CAPACITY),
            lengths: Vec::with_capacity(IDENTIFIER_LENGTH_CAPACITY),
        }
    }

    pub fn clear(&mut self) {
        self.names.clear();
        self.positions.clear();
        self.lengths.clear();
    }

    pub fn push(&mut self, name: String, position: Span, new_length: bool) {
        self.names.push(name);
        self.positions.push(position);
        match self.lengths.last_mut() {
            Some(len) if !new_length => *len += 1,
            _ => self.lengths.push(1),
        }
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn position(&self, index: usize) -> Option<Span> {
        self.positions.get(index).copied()
    }

    pub fn top_position(&self) -> Option<Span> {
        self.positions.last().copied()
    }

    /// Every name has a position and belongs to exactly one length group.
    pub fn is_consistent(&self) -> bool {
        self.names.len() == self.positions.len()
            && self.lengths.iter().sum::<usize>() == self.names.len()
    }

    /// Names and positions of the topmost length group.
    pub fn top_group(&self) -> (&[String], &[Span]) {
        let size = self.lengths.last().copied().unwrap_or(0);
        let from = self.names.len() - size;
        (&self.names[from..], &self.positions[from..])
    }
}

#[derive(Debug)]
pub(crate) struct NodeStack<T> {
    nodes: Vec<T>,
    lengths: Vec<usize>,
}

impl<T> NodeStack<T> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(NODE_CAPACITY),
            lengths: Vec::with_capacity(NODE_LENGTH_CAPACITY),
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.lengths.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.lengths.is_empty()
    }

    /// Index of the current group, if any.
    pub fn group(&self) -> Option<usize> {
        self.lengths.len().checked_sub(1)
    }

    pub fn group_len(&self, group: usize) -> usize {
        self.lengths.get(group).copied().unwrap_or(0)
    }

    /// `None` opens an empty group regardless of `new_length`.
    pub fn push(&mut self, node: Option<T>, new_length: bool) {
        let Some(node) = node else {
            self.lengths.push(0);
            return;
        };
        self.nodes.push(node);
        match self.lengths.last_mut() {
            Some(len) if !new_length => *len += 1,
            _ => self.lengths.push(1),
        }
    }

    /// Drains the stack as `(family, node)` pairs in push order.
    pub fn drain_groups(&mut self) -> Vec<(usize, T)> {
        let total: usize = self.lengths.iter().sum();
        assert_eq!(
            total,
            self.nodes.len(),
            "node stack lengths out of sync with nodes"
        );
        let mut out = Vec::with_capacity(total);
        let mut nodes = self.nodes.drain(..);
        for (group, &len) in self.lengths.iter().enumerate() {
            for node in nodes.by_ref().take(len) {
                out.push((group % ORDERED_TAGS, node));
            }
        }
        drop(nodes);
        self.lengths.clear();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_groups_track_qualified_names() {
        let mut stack = IdentifierStack::new();
        stack.push("m".into(), Span::new(0, 0), true);
        stack.push("java".into(), Span::new(2, 5), true);
        stack.push("util".into(), Span::new(7, 10), false);
        let (names, positions) = stack.top_group();
        assert_eq!(names, ["java", "util"]);
        assert_eq!(positions[1], Span::new(7, 10));
        assert_eq!(stack.name(0), Some("m"));
        assert!(stack.is_consistent());
        stack.clear();
        assert!(stack.is_consistent());
    }

    #[test]
    fn node_groups_cycle_through_families() {
        let mut stack = NodeStack::new();
        stack.push(Some("p1"), true);
        stack.push(Some("p2"), false);
        stack.push(None, false);
        stack.push(Some("s1"), true);
        stack.push(Some("p3"), true);
        assert_eq!(stack.group(), Some(3));
        assert_eq!(stack.group_len(THROWS_GROUP), 0);
        assert_eq!(
            stack.drain_groups(),
            vec![
                (PARAM_GROUP, "p1"),
                (PARAM_GROUP, "p2"),
                (SEE_GROUP, "s1"),
                (PARAM_GROUP, "p3"),
            ]
        );
        assert!(stack.is_empty());
    }
}
