//! The Intermediate Serialization Tree: a parent/child tree of type-tagged
//! value nodes mediating between the live object graph and the wire format.

use std::fmt::Write as _;

use crate::rtti::Rtti;

/// One node's serialized snapshot of a property (base spec §3 `SerNodeInfo`).
///
/// `value` is the property's payload in a codec-agnostic, host-endian
/// encoding (see [`crate::value::Value::to_host_bytes`]); every codec
/// transcodes to and from this same representation, which is what makes
/// format conversion between codecs possible without consulting any
/// descriptor (base spec §4.G "Rationale").
#[derive(Debug, Clone, PartialEq)]
pub struct SerNodeInfo {
    pub rtti: Rtti,
    pub level: u32,
    pub name: String,
    pub value: Vec<u8>,
    pub is_damaged: bool,
    pub is_last_child: bool,
}

impl SerNodeInfo {
    #[must_use]
    pub fn new(rtti: Rtti, level: u32, name: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            rtti,
            level,
            name: name.into(),
            value,
            is_damaged: false,
            is_last_child: false,
        }
    }

    #[must_use]
    pub fn damaged(rtti: Rtti, level: u32, name: impl Into<String>) -> Self {
        Self {
            is_damaged: true,
            ..Self::new(rtti, level, name, Vec::new())
        }
    }
}

/// Index of a node within an [`Ist`]'s arena. The root is always `NodeId(0)`
/// once the tree is non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

struct NodeSlot {
    info: SerNodeInfo,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A general tree of [`SerNodeInfo`] nodes: at most one parent, arbitrary
/// ordered children.
#[derive(Default)]
pub struct Ist {
    nodes: Vec<NodeSlot>,
}

impl Ist {
    #[must_use]
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        (!self.nodes.is_empty()).then_some(NodeId(0))
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    #[must_use]
    pub fn info(&self, id: NodeId) -> &SerNodeInfo {
        &self.nodes[id.0].info
    }

    pub fn info_mut(&mut self, id: NodeId) -> &mut SerNodeInfo {
        &mut self.nodes[id.0].info
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Appends a new node as the last child of `parent` (or as the root, if
    /// `parent` is `None`). Returns the new node's id.
    ///
    /// # Panics
    ///
    /// Panics if this is not the first node added and `parent` is `None`, or
    /// if the tree is empty and `parent` is `Some`.
    pub fn push(&mut self, parent: Option<NodeId>, info: SerNodeInfo) -> NodeId {
        assert_eq!(
            parent.is_none(),
            self.nodes.is_empty(),
            "exactly the first node pushed has no parent"
        );

        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeSlot {
            info,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    /// Joins `id`'s ancestors' names with `.`, not including `id` itself.
    #[must_use]
    pub fn parent_identifier_chain(&self, id: NodeId) -> String {
        self.parent(id)
            .map(|parent| self.identifier_chain(parent))
            .unwrap_or_default()
    }

    /// The dotted path from the root to `id`, inclusive.
    #[must_use]
    pub fn identifier_chain(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            parts.push(self.info(cur).name.clone());
            current = self.parent(cur);
        }
        parts.reverse();
        parts.join(".")
    }

    /// Walks a dotted path rooted at the tree's root name, returning the
    /// matching node if any (base spec §4.G "Random access").
    #[must_use]
    pub fn find_node(&self, chain: &str) -> Option<NodeId> {
        let mut parts = chain.split('.');
        let mut current = self.root()?;
        if self.info(current).name != parts.next()? {
            return None;
        }

        for part in parts {
            current = *self
                .children(current)
                .iter()
                .find(|child| self.info(**child).name == part)?;
        }
        Some(current)
    }

    /// All node ids, depth-first preorder from the root.
    #[must_use]
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        if let Some(root) = self.root() {
            self.preorder_from(root, &mut out);
        }
        out
    }

    fn preorder_from(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        for &child in self.children(id) {
            self.preorder_from(child, out);
        }
    }

    /// Recomputes every node's `is_last_child` flag from its position in its
    /// parent's child list. Trees built via repeated [`Self::push`] (as the
    /// serializer does when walking a live publisher) don't know in advance
    /// whether a just-pushed node is the last sibling, so this is run once
    /// after the walk completes.
    pub fn recompute_last_child_flags(&mut self) {
        for slot in &mut self.nodes {
            slot.info.is_last_child = false;
        }
        for i in 0..self.nodes.len() {
            if let Some(&last) = self.nodes[i].children.last() {
                self.nodes[last.0].info.is_last_child = true;
            }
        }
        if let Some(root) = self.root() {
            self.nodes[root.0].info.is_last_child = true;
        }
    }

    /// Builds an IST out of a linear preorder sequence of nodes as produced
    /// by repeated codec reads (base spec §4.G `stream_to_ist`): computes
    /// `is_last_child` and re-parents according to level.
    #[must_use]
    pub fn from_preorder(mut nodes: Vec<SerNodeInfo>) -> Self {
        for i in 0..nodes.len() {
            let is_object = nodes[i].rtti.kind == crate::rtti::Kind::Object;
            let next_level = nodes.get(i + 1).map(|n| n.level);
            nodes[i].is_last_child = match next_level {
                None => true,
                Some(next) if next < nodes[i].level => true,
                Some(next) if is_object && next == nodes[i].level => true,
                Some(_) => false,
            };
        }

        let mut ist = Self::new();
        if nodes.is_empty() {
            return ist;
        }

        let mut stack = Vec::new();
        let mut iter = nodes.into_iter();
        let root_info = iter.next().expect("checked non-empty above");
        let is_root_object = root_info.rtti.kind == crate::rtti::Kind::Object;
        let root_last_child = root_info.is_last_child;
        let root = ist.push(None, root_info);
        if !root_last_child || is_root_object {
            stack.push(root);
        }

        for info in iter {
            let is_object = info.rtti.kind == crate::rtti::Kind::Object;
            let is_last_child = info.is_last_child;
            // A malformed or concatenated stream can pop every open scope
            // and still have nodes left; reparent those orphans under the
            // root rather than aborting the whole load.
            let parent = stack.last().copied().unwrap_or(root);
            let id = ist.push(Some(parent), info);

            if is_last_child {
                if !is_object {
                    stack.pop();
                }
                // an object last-child still opens its own scope for its
                // children before closing; nothing pops here because a
                // later sibling pop (or EOF) already accounts for it via
                // the next node's level comparison.
            } else if is_object {
                stack.push(id);
            }
        }

        ist
    }

    /// Renders the tree as indented diagnostic lines (`name: rtti = value`),
    /// one per node. A debug helper, not used by any codec.
    #[must_use]
    pub fn pretty_print(&self) -> String {
        let mut out = String::new();
        for id in self.preorder() {
            let info = self.info(id);
            let indent = "  ".repeat(info.level as usize);
            let rendered = if info.rtti.kind == crate::rtti::Kind::Object {
                String::from_utf8_lossy(&info.value).into_owned()
            } else {
                match crate::value::Value::from_host_bytes(info.rtti, &info.value) {
                    Ok(value) => format!("{value:?}"),
                    Err(_) => format!("<{} damaged bytes>", info.value.len()),
                }
            };
            let _ = writeln!(out, "{indent}{}: {} = {rendered}", info.name, info.rtti);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtti::Kind;

    fn leaf(level: u32, name: &str) -> SerNodeInfo {
        SerNodeInfo::new(Rtti::scalar(Kind::Int), level, name, vec![0; 4])
    }

    fn object(level: u32, name: &str) -> SerNodeInfo {
        SerNodeInfo::new(Rtti::scalar(Kind::Object), level, name, b"Widget".to_vec())
    }

    #[test]
    fn flat_siblings_reparent_under_root() {
        let nodes = vec![object(0, "root"), leaf(1, "a"), leaf(1, "b")];
        let ist = Ist::from_preorder(nodes);
        let root = ist.root().unwrap();
        assert_eq!(ist.children(root).len(), 2);
        assert_eq!(ist.identifier_chain(ist.children(root)[1]), "root.b");
    }

    #[test]
    fn nested_object_reparents_correctly() {
        // root(object) -> sub(object) -> { a, b } ; sibling field c on root
        let nodes = vec![
            object(0, "root"),
            object(1, "sub"),
            leaf(2, "a"),
            leaf(2, "b"),
            leaf(1, "c"),
        ];
        let ist = Ist::from_preorder(nodes);
        let root = ist.root().unwrap();
        assert_eq!(ist.children(root).len(), 2); // sub, c
        let sub = ist.children(root)[0];
        assert_eq!(ist.children(sub).len(), 2); // a, b
        assert_eq!(ist.identifier_chain(ist.children(sub)[1]), "root.sub.b");
        assert_eq!(ist.identifier_chain(ist.children(root)[1]), "root.c");
    }

    #[test]
    fn pushed_tree_recomputes_last_child_flags() {
        let mut ist = Ist::new();
        let root = ist.push(None, object(0, "root"));
        ist.push(Some(root), leaf(1, "a"));
        let b = ist.push(Some(root), leaf(1, "b"));
        ist.recompute_last_child_flags();

        assert!(ist.info(root).is_last_child);
        assert!(!ist.info(ist.children(root)[0]).is_last_child);
        assert!(ist.info(b).is_last_child);
    }

    #[test]
    fn preorder_visits_parent_before_children() {
        let mut ist = Ist::new();
        let root = ist.push(None, object(0, "root"));
        let sub = ist.push(Some(root), object(1, "sub"));
        ist.push(Some(sub), leaf(2, "a"));
        ist.push(Some(root), leaf(1, "c"));

        let names: Vec<_> = ist.preorder().into_iter().map(|id| ist.info(id).name.clone()).collect();
        assert_eq!(names, vec!["root", "sub", "a", "c"]);
    }

    #[test]
    fn find_node_walks_dotted_path() {
        let nodes = vec![object(0, "root"), object(1, "sub"), leaf(2, "a")];
        let ist = Ist::from_preorder(nodes);
        let found = ist.find_node("root.sub.a").unwrap();
        assert_eq!(ist.info(found).name, "a");
        assert!(ist.find_node("root.sub.missing").is_none());
    }

    #[test]
    fn orphaned_node_after_stack_exhaustion_reparents_under_root() {
        // root(object) -> x (leaf, last-child, closes root's scope) -> y (leaf
        // at level 0, as if two streams got concatenated). The stack is empty
        // by the time `y` arrives; it must attach under root, not panic.
        let nodes = vec![object(0, "root"), leaf(1, "x"), leaf(0, "y")];
        let ist = Ist::from_preorder(nodes);
        let root = ist.root().unwrap();
        assert_eq!(ist.children(root).len(), 2);
        assert_eq!(ist.identifier_chain(ist.children(root)[1]), "root.y");
    }

    #[test]
    fn pretty_print_indents_by_level_and_decodes_values() {
        let nodes = vec![object(0, "root"), leaf(1, "a")];
        let ist = Ist::from_preorder(nodes);
        let rendered = ist.pretty_print();

        assert!(rendered.lines().next().unwrap().starts_with("root:"));
        let child_line = rendered.lines().nth(1).unwrap();
        assert!(child_line.starts_with("  a:"));
        assert!(child_line.contains('0'));
    }
}
