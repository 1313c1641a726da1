//! Arena render trees with mutation records.
//!
//! The rendering engine emits a [`RenderTree`] per cell. Trees are plain data:
//! they can be deep-cloned, grafted into other trees, and observed. Every
//! mutation after construction appends a [`MutationRecord`] to the tree's log
//! so observers can react to drift without the mutator knowing about them.
//!
//! Removed nodes free their arena slot for reuse. Each slot carries a
//! generation, so a [`NodeId`] kept past its node's removal keeps failing with
//! [`TreeError::Detached`] even after the slot holds a new node.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use crate::error::TreeError;

/// Slot and generation of a node inside one [`RenderTree`]. Meaningless
/// across trees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    slot: u32,
    generation: u32,
}

impl NodeId {
    pub fn index(&self) -> usize {
        self.slot as usize
    }
}

#[derive(Clone, Debug)]
struct Node {
    tag: String,
    classes: BTreeSet<String>,
    attrs: BTreeMap<String, String>,
    text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    alive: bool,
    generation: u32,
}

impl Node {
    fn new(tag: &str, generation: u32) -> Self {
        Self {
            tag: tag.to_string(),
            classes: BTreeSet::new(),
            attrs: BTreeMap::new(),
            text: None,
            parent: None,
            children: Vec::new(),
            alive: true,
            generation,
        }
    }
}

/// One observed change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationRecord {
    /// An attribute changed. Class list edits report the name `"class"`.
    Attribute { target: NodeId, name: String },
    /// Children were added to or removed from `target`.
    ChildList {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    /// Text content of `target` changed.
    Text { target: NodeId },
}

impl MutationRecord {
    pub fn target(&self) -> NodeId {
        match self {
            Self::Attribute { target, .. }
            | Self::ChildList { target, .. }
            | Self::Text { target } => *target,
        }
    }
}

/// An owned tree of element nodes.
#[derive(Clone, Debug)]
pub struct RenderTree {
    nodes: Vec<Node>,
    /// Slots of removed nodes, reused by `create`.
    free: Vec<u32>,
    root: NodeId,
    log: Vec<MutationRecord>,
}

impl RenderTree {
    /// New tree with a single root element.
    pub fn new(root_tag: &str) -> Self {
        Self {
            nodes: vec![Node::new(root_tag, 0)],
            free: Vec::new(),
            root: NodeId {
                slot: 0,
                generation: 0,
            },
            log: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        match self.nodes.get(id.index()) {
            Some(n) if n.alive && n.generation == id.generation => Ok(n),
            _ => Err(TreeError::Detached(id)),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        match self.nodes.get_mut(id.index()) {
            Some(n) if n.alive && n.generation == id.generation => Ok(n),
            _ => Err(TreeError::Detached(id)),
        }
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    /// Number of live nodes, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Arena slots allocated so far, live or free.
    pub fn slots(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Create a detached element. Not recorded until it is attached.
    pub fn create(&mut self, tag: &str) -> NodeId {
        if let Some(slot) = self.free.pop() {
            let node = &mut self.nodes[slot as usize];
            let generation = node.generation.wrapping_add(1);
            *node = Node::new(tag, generation);
            return NodeId { slot, generation };
        }
        let slot = self.nodes.len() as u32;
        self.nodes.push(Node::new(tag, 0));
        NodeId {
            slot,
            generation: 0,
        }
    }

    /// Create an element with classes and append it under `parent`.
    pub fn element(
        &mut self,
        parent: NodeId,
        tag: &str,
        classes: &[&str],
    ) -> Result<NodeId, TreeError> {
        self.node(parent)?;
        let id = self.create(tag);
        {
            let node = &mut self.nodes[id.index()];
            node.classes.extend(classes.iter().map(|c| c.to_string()));
        }
        self.append_child(parent, id)?;
        Ok(id)
    }

    /// Append `child` as the last child of `parent`, detaching it first if needed.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let at = self.node(parent)?.children.len();
        self.insert_child(parent, at, child)
    }

    /// Insert `child` at `index` among `parent`'s children (clamped).
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), TreeError> {
        self.node(parent)?;
        self.node(child)?;
        if self.is_ancestor_or_self(child, parent) {
            return Err(TreeError::Cycle { parent, child });
        }
        self.detach(child)?;
        let node = self.node_mut(parent)?;
        let at = index.min(node.children.len());
        node.children.insert(at, child);
        self.nodes[child.index()].parent = Some(parent);
        self.log.push(MutationRecord::ChildList {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
        Ok(())
    }

    /// Unlink a node from its parent without killing it.
    fn detach(&mut self, id: NodeId) -> Result<(), TreeError> {
        let Some(parent) = self.node(id)?.parent else {
            return Ok(());
        };
        let unlinked = match self.node_mut(parent) {
            Ok(p) => {
                p.children.retain(|c| *c != id);
                true
            }
            Err(_) => false,
        };
        if unlinked {
            self.log.push(MutationRecord::ChildList {
                target: parent,
                added: Vec::new(),
                removed: vec![id],
            });
        }
        self.nodes[id.index()].parent = None;
        Ok(())
    }

    /// Remove a node and its whole subtree. Removing the root disposes the tree.
    pub fn remove(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.detach(id)?;
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let Ok(node) = self.node_mut(n) else {
                continue;
            };
            node.alive = false;
            node.parent = None;
            stack.extend(node.children.drain(..));
            self.free.push(n.slot);
        }
        Ok(())
    }

    /// Remove every child of `id`, keeping `id` itself.
    pub fn clear_children(&mut self, id: NodeId) -> Result<(), TreeError> {
        let children = self.node(id)?.children.clone();
        for child in children {
            self.remove(child)?;
        }
        Ok(())
    }

    // =========================================================================
    // Attributes, classes, text
    // =========================================================================

    pub fn tag(&self, id: NodeId) -> Result<&str, TreeError> {
        Ok(&self.node(id)?.tag)
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> Result<bool, TreeError> {
        Ok(self.node(id)?.classes.contains(class))
    }

    pub fn classes(&self, id: NodeId) -> Result<Vec<&str>, TreeError> {
        Ok(self.node(id)?.classes.iter().map(String::as_str).collect())
    }

    /// Add a class. Recorded only when it was absent.
    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<(), TreeError> {
        if self.node_mut(id)?.classes.insert(class.to_string()) {
            self.record_attr(id, "class");
        }
        Ok(())
    }

    /// Remove a class. Recorded only when it was present.
    pub fn remove_class(&mut self, id: NodeId, class: &str) -> Result<(), TreeError> {
        if self.node_mut(id)?.classes.remove(class) {
            self.record_attr(id, "class");
        }
        Ok(())
    }

    /// Set a class on or off.
    pub fn toggle_class(&mut self, id: NodeId, class: &str, on: bool) -> Result<(), TreeError> {
        if on {
            self.add_class(id, class)
        } else {
            self.remove_class(id, class)
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Result<Option<&str>, TreeError> {
        Ok(self.node(id)?.attrs.get(name).map(String::as_str))
    }

    /// Set an attribute. Recorded only when the value changes.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        if node.attrs.get(name).map(String::as_str) != Some(value) {
            node.attrs.insert(name.to_string(), value.to_string());
            self.record_attr(id, name);
        }
        Ok(())
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<(), TreeError> {
        if self.node_mut(id)?.attrs.remove(name).is_some() {
            self.record_attr(id, name);
        }
        Ok(())
    }

    fn record_attr(&mut self, id: NodeId, name: &str) {
        self.log.push(MutationRecord::Attribute {
            target: id,
            name: name.to_string(),
        });
    }

    pub fn text(&self, id: NodeId) -> Result<Option<&str>, TreeError> {
        Ok(self.node(id)?.text.as_deref())
    }

    /// Replace a node's own text. Recorded only when it changes.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        if node.text.as_deref() != Some(text) {
            node.text = Some(text.to_string());
            self.log.push(MutationRecord::Text { target: id });
        }
        Ok(())
    }

    /// Own text of `id` and all descendants, depth-first, newline-joined.
    pub fn text_content(&self, id: NodeId) -> Result<String, TreeError> {
        let mut parts = Vec::new();
        for n in self.descendants(id)? {
            if let Some(t) = &self.nodes[n.index()].text {
                parts.push(t.as_str());
            }
        }
        Ok(parts.join("\n"))
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, TreeError> {
        Ok(self.node(id)?.parent)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId], TreeError> {
        Ok(&self.node(id)?.children)
    }

    /// `id` and every live node below it, in document (pre-)order.
    pub fn descendants(&self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        self.node(id)?;
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let Ok(node) = self.node(n) else {
                continue;
            };
            out.push(n);
            stack.extend(node.children.iter().rev().copied());
        }
        Ok(out)
    }

    /// Whether `ancestor` is `node` or one of its (transitive) parents.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.node(n).ok().and_then(|n| n.parent);
        }
        false
    }

    /// First node under `from` (inclusive) carrying `class`.
    pub fn find_by_class(&self, from: NodeId, class: &str) -> Option<NodeId> {
        self.find_all_by_class(from, class).into_iter().next()
    }

    /// Every node under `from` (inclusive) carrying `class`, in document order.
    pub fn find_all_by_class(&self, from: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(from)
            .unwrap_or_default()
            .into_iter()
            .filter(|n| self.nodes[n.index()].classes.contains(class))
            .collect()
    }

    // =========================================================================
    // Cloning and grafting
    // =========================================================================

    /// Deep copy of the subtree at `id` as a new, quiet tree.
    pub fn clone_subtree(&self, id: NodeId) -> Result<RenderTree, TreeError> {
        let src = self.node(id)?;
        let mut out = RenderTree::new(&src.tag);
        let root = out.root;
        out.copy_node_fields(root, src);
        for &child in &src.children {
            out.copy_from(root, self, child)?;
        }
        out.log.clear();
        Ok(out)
    }

    /// Deep copy `other`'s root subtree and append it under `parent`.
    ///
    /// Records a single child-list mutation on `parent`.
    pub fn graft(&mut self, parent: NodeId, other: &RenderTree) -> Result<NodeId, TreeError> {
        self.node(parent)?;
        let new_root = self.copy_subtree_detached(other, other.root)?;
        self.append_child(parent, new_root)?;
        Ok(new_root)
    }

    /// Replace `target`'s children with copies of `other`'s root children.
    pub fn replace_children_from(
        &mut self,
        target: NodeId,
        other: &RenderTree,
    ) -> Result<(), TreeError> {
        self.clear_children(target)?;
        for &child in other.children(other.root)? {
            let copy = self.copy_subtree_detached(other, child)?;
            self.append_child(target, copy)?;
        }
        Ok(())
    }

    fn copy_node_fields(&mut self, dst: NodeId, src: &Node) {
        let node = &mut self.nodes[dst.index()];
        node.classes = src.classes.clone();
        node.attrs = src.attrs.clone();
        node.text = src.text.clone();
    }

    /// Copy `src_id` from `src` under `parent` in self. Records as it appends.
    fn copy_from(
        &mut self,
        parent: NodeId,
        src: &RenderTree,
        src_id: NodeId,
    ) -> Result<NodeId, TreeError> {
        let copy = self.copy_subtree_detached(src, src_id)?;
        self.append_child(parent, copy)?;
        Ok(copy)
    }

    /// Build a detached copy of `src_id`'s subtree; only the caller's final
    /// attach is recorded.
    fn copy_subtree_detached(
        &mut self,
        src: &RenderTree,
        src_id: NodeId,
    ) -> Result<NodeId, TreeError> {
        let src_node = src.node(src_id)?;
        let dst = self.create(&src_node.tag);
        self.copy_node_fields(dst, src_node);
        for &child in &src_node.children {
            if !src.is_alive(child) {
                continue;
            }
            let c = self.copy_subtree_detached(src, child)?;
            self.nodes[dst.index()].children.push(c);
            self.nodes[c.index()].parent = Some(dst);
        }
        Ok(dst)
    }

    // =========================================================================
    // Mutation log
    // =========================================================================

    /// Take every mutation recorded since the last call.
    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.log)
    }

    pub fn has_pending_mutations(&self) -> bool {
        !self.log.is_empty()
    }

    /// Indented one-line-per-node outline, for debugging and the CLI.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.outline_into(self.root, 0, &mut out);
        out
    }

    fn outline_into(&self, id: NodeId, depth: usize, out: &mut String) {
        let Ok(node) = self.node(id) else { return };
        let _ = write!(out, "{}{}", "  ".repeat(depth), node.tag);
        for class in &node.classes {
            let _ = write!(out, ".{class}");
        }
        for (k, v) in &node.attrs {
            let _ = write!(out, " [{k}={v}]");
        }
        if let Some(text) = &node.text {
            let _ = write!(out, " {text:?}");
        }
        out.push('\n');
        for &child in &node.children {
            self.outline_into(child, depth + 1, out);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (RenderTree, NodeId, NodeId) {
        let mut tree = RenderTree::new("div");
        let root = tree.root();
        let a = tree.element(root, "div", &["a"]).unwrap();
        let b = tree.element(a, "span", &["b", "shared"]).unwrap();
        tree.set_text(b, "hello").unwrap();
        tree.take_mutations();
        (tree, a, b)
    }

    #[test]
    fn test_element_and_find() {
        let (tree, a, b) = sample();
        assert_eq!(tree.find_by_class(tree.root(), "a"), Some(a));
        assert_eq!(tree.find_by_class(tree.root(), "shared"), Some(b));
        assert_eq!(tree.parent(b).unwrap(), Some(a));
        assert_eq!(tree.text_content(tree.root()).unwrap(), "hello");
    }

    #[test]
    fn test_class_changes_are_recorded_once() {
        let (mut tree, a, _) = sample();
        tree.add_class(a, "x").unwrap();
        tree.add_class(a, "x").unwrap();
        tree.remove_class(a, "missing").unwrap();
        assert_eq!(
            tree.take_mutations(),
            vec![MutationRecord::Attribute {
                target: a,
                name: "class".into()
            }]
        );
    }

    #[test]
    fn test_remove_kills_subtree() {
        let (mut tree, a, b) = sample();
        tree.remove(a).unwrap();
        assert!(!tree.is_alive(a));
        assert!(!tree.is_alive(b));
        assert_eq!(tree.set_text(b, "x"), Err(TreeError::Detached(b)));
        assert_eq!(
            tree.take_mutations(),
            vec![MutationRecord::ChildList {
                target: tree.root(),
                added: vec![],
                removed: vec![a],
            }]
        );
    }

    #[test]
    fn test_removing_root_disposes_tree() {
        let (mut tree, _, _) = sample();
        let root = tree.root();
        tree.remove(root).unwrap();
        assert!(tree.is_empty());
        assert!(tree.find_by_class(root, "a").is_none());
    }

    #[test]
    fn test_cycle_rejected() {
        let (mut tree, a, b) = sample();
        assert_eq!(
            tree.append_child(b, a),
            Err(TreeError::Cycle { parent: b, child: a })
        );
    }

    #[test]
    fn test_clone_subtree_is_independent() {
        let (tree, a, _) = sample();
        let mut copy = tree.clone_subtree(a).unwrap();
        assert!(!copy.has_pending_mutations());
        let b = copy.find_by_class(copy.root(), "b").unwrap();
        copy.set_text(b, "changed").unwrap();
        assert_eq!(tree.text_content(a).unwrap(), "hello");
        assert_eq!(copy.text_content(copy.root()).unwrap(), "changed");
    }

    #[test]
    fn test_graft_records_single_child_list() {
        let (src, _, _) = sample();
        let mut dst = RenderTree::new("section");
        let root = dst.root();
        let grafted = dst.graft(root, &src).unwrap();
        let records = dst.take_mutations();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target(), root);
        assert_eq!(dst.text_content(grafted).unwrap(), "hello");
        assert!(dst.find_by_class(root, "shared").is_some());
    }

    #[test]
    fn test_replace_children_from() {
        let (mut tree, a, b) = sample();
        let mut fresh = RenderTree::new("div");
        let fr = fresh.root();
        let x = fresh.element(fr, "pre", &["x"]).unwrap();
        fresh.set_text(x, "new").unwrap();

        tree.replace_children_from(a, &fresh).unwrap();
        assert!(!tree.is_alive(b));
        assert_eq!(tree.children(a).unwrap().len(), 1);
        assert_eq!(tree.text_content(a).unwrap(), "new");
    }

    #[test]
    fn test_repeated_redraws_reuse_slots() {
        let (mut tree, a, _) = sample();
        let mut fresh = RenderTree::new("div");
        let fr = fresh.root();
        for line in ["1", "2", "3"] {
            let out = fresh.element(fr, "pre", &["out"]).unwrap();
            fresh.set_text(out, line).unwrap();
        }

        tree.replace_children_from(a, &fresh).unwrap();
        let slots = tree.slots();
        for _ in 0..50 {
            tree.replace_children_from(a, &fresh).unwrap();
        }
        assert_eq!(tree.slots(), slots);
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.text_content(a).unwrap(), "1\n2\n3");
    }

    #[test]
    fn test_stale_id_stays_detached_after_slot_reuse() {
        let (mut tree, a, b) = sample();
        tree.remove(b).unwrap();
        let c = tree.element(a, "i", &["c"]).unwrap();
        assert_eq!(c.index(), b.index());
        assert_ne!(c, b);
        assert!(!tree.is_alive(b));
        assert_eq!(tree.set_text(b, "x"), Err(TreeError::Detached(b)));
        assert!(!tree.is_ancestor_or_self(a, b));
        assert!(tree.is_alive(c));
    }

    #[test]
    fn test_descendants_preorder() {
        let mut tree = RenderTree::new("r");
        let root = tree.root();
        let a = tree.element(root, "a", &[]).unwrap();
        let a1 = tree.element(a, "a1", &[]).unwrap();
        let b = tree.element(root, "b", &[]).unwrap();
        assert_eq!(tree.descendants(root).unwrap(), vec![root, a, a1, b]);
    }

    #[test]
    fn test_outline() {
        let (tree, _, _) = sample();
        let outline = tree.outline();
        assert!(outline.starts_with("div\n  div.a\n    span.b.shared"));
        assert!(outline.contains("\"hello\""));
    }
}
