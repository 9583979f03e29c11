//! Outgoing-edge index and descendant traversal

use super::edge::Edge;
use super::index::MetadataIndex;
use super::node::NodeId;
use std::collections::{HashMap, HashSet};

/// Index for fast outgoing edge lookups, built once per traversal
pub struct EdgeIndex<'a> {
    outgoing: HashMap<&'a NodeId, Vec<&'a Edge>>,
}

impl<'a> EdgeIndex<'a> {
    pub fn build(index: &'a MetadataIndex) -> Self {
        let mut outgoing: HashMap<&NodeId, Vec<&Edge>> = HashMap::new();
        for edge in &index.edges {
            outgoing.entry(&edge.src_id).or_default().push(edge);
        }
        Self { outgoing }
    }

    pub fn outgoing(&self, node_id: &NodeId) -> &[&'a Edge] {
        self.outgoing.get(node_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `root` and everything reachable from it via outgoing edges, children
    /// before parents
    ///
    /// Each node appears once even when several paths reach it. Edge
    /// destinations missing from the node list are still reported so the
    /// caller can clear the dangling edges.
    pub fn descendants_post_order(&self, root: &NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut visited: HashSet<&NodeId> = HashSet::new();
        // (node, next child position)
        let mut stack: Vec<(&NodeId, usize)> = Vec::new();

        let Some(root_ref) = self.find_key(root) else {
            return vec![root.clone()];
        };
        visited.insert(root_ref);
        stack.push((root_ref, 0));

        while let Some((node, child_pos)) = stack.pop() {
            let edges = self.outgoing(node);
            if let Some(edge) = edges.get(child_pos) {
                stack.push((node, child_pos + 1));
                let child = &edge.dst_id;
                if visited.insert(child) {
                    stack.push((child, 0));
                }
            } else {
                order.push(node.clone());
            }
        }

        order
    }

    fn find_key(&self, id: &NodeId) -> Option<&'a NodeId> {
        match self.outgoing.get_key_value(id) {
            Some((key, _)) => Some(*key),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, Value};

    fn chain() -> (MetadataIndex, Vec<NodeId>) {
        // a -> b -> c, a -> e, d standalone
        let mut index = MetadataIndex::new("t");
        let a = index.add_node(Node::data("a", vec![]));
        let b = index.add_node(Node::data("b", vec![]));
        let c = index.add_scalar_node(Value::Int(1), "c");
        let d = index.add_node(Node::data("d", vec![]));
        let e = index.add_scalar_node(Value::Int(2), "e");
        index.add_edge(a.clone(), b.clone(), "filter");
        index.add_edge(b.clone(), c.clone(), "sum");
        index.add_edge(a.clone(), e.clone(), "max");
        (index, vec![a, b, c, d, e])
    }

    #[test]
    fn test_post_order_visits_children_first() {
        let (index, ids) = chain();
        let edges = EdgeIndex::build(&index);
        let order = edges.descendants_post_order(&ids[0]);

        assert_eq!(order, vec![ids[2].clone(), ids[1].clone(), ids[4].clone(), ids[0].clone()]);
    }

    #[test]
    fn test_leaf_returns_itself() {
        let (index, ids) = chain();
        let edges = EdgeIndex::build(&index);
        assert_eq!(edges.descendants_post_order(&ids[3]), vec![ids[3].clone()]);
    }

    #[test]
    fn test_diamond_visits_shared_child_once() {
        let mut index = MetadataIndex::new("t");
        let a = index.add_node(Node::data("a", vec![]));
        let b = index.add_node(Node::data("b", vec![]));
        let c = index.add_node(Node::data("c", vec![]));
        let d = index.add_node(Node::data("d", vec![]));
        index.add_edge(a.clone(), b.clone(), "x");
        index.add_edge(a.clone(), c.clone(), "y");
        index.add_edge(b.clone(), d.clone(), "z");
        index.add_edge(c.clone(), d.clone(), "z");

        let order = EdgeIndex::build(&index).descendants_post_order(&a);
        assert_eq!(order.len(), 4);
        assert_eq!(order.iter().filter(|id| **id == d).count(), 1);
        assert_eq!(order.last(), Some(&a));
    }

    #[test]
    fn test_cycle_terminates() {
        let mut index = MetadataIndex::new("t");
        let a = index.add_node(Node::data("a", vec![]));
        let b = index.add_node(Node::data("b", vec![]));
        index.add_edge(a.clone(), b.clone(), "x");
        index.add_edge(b.clone(), a.clone(), "y");

        let order = EdgeIndex::build(&index).descendants_post_order(&a);
        assert_eq!(order, vec![b, a]);
    }
}
