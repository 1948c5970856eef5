//! Multidendrogram tree model.
//!
//! A multidendrogram records the merge history of an agglomerative
//! clustering in which *several* clusters may fuse at once: an internal
//! node has two or more children, not exactly two. The tree is stored as an
//! arena: [`Dendrogram`] owns a flat `Vec<Node>` and nodes refer to their
//! children by [`NodeId`], which keeps ownership trivial (no parent
//! pointers, no sharing, no cycles) and makes serialization a derive.
//!
//! # Heights
//!
//! Every internal node carries three height attributes:
//!
//! ```text
//! bottom_height    the proximity at which the merge happened
//! top_height       the most extreme pairwise proximity among the merged
//!                  children (== bottom for binary merges)
//! internal_height  the linkage method's own aggregate of those internal
//!                  pairwise proximities
//! ```
//!
//! For a binary merge all three coincide. For a k-ary merge produced by
//! tied proximities they span the "ties band" a renderer draws between the
//! merge level and the farthest internal pair. Leaves carry NaN heights.
//!
//! Each node also tracks the extremes of bottom heights
//! (`nodes_min_height`/`nodes_max_height`) and top heights
//! (`bands_min_height`/`bands_max_height`) over its whole subtree, so a
//! consumer can scale an axis from the root node alone.

/// Index of a node within its [`Dendrogram`] arena.
///
/// Identifiers are assigned monotonically: the `n` original items take
/// `0..n` in matrix row order, and every internal node created afterwards
/// takes the next index.
pub type NodeId = usize;

/// A node of a multidendrogram: a leaf (one original item) or an internal
/// node (one merge).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    id: NodeId,
    label: Option<String>,
    supercluster: bool,
    children: Vec<NodeId>,
    leaves: Vec<NodeId>,
    bottom_height: f64,
    internal_height: f64,
    top_height: f64,
    nodes_min_height: f64,
    nodes_max_height: f64,
    bands_min_height: f64,
    bands_max_height: f64,
}

impl Node {
    pub(crate) fn leaf(id: NodeId, label: String) -> Self {
        Self {
            id,
            label: Some(label),
            supercluster: false,
            children: Vec::new(),
            leaves: vec![id],
            bottom_height: f64::NAN,
            internal_height: f64::NAN,
            top_height: f64::NAN,
            nodes_min_height: f64::NAN,
            nodes_max_height: f64::NAN,
            bands_min_height: f64::NAN,
            bands_max_height: f64::NAN,
        }
    }

    pub(crate) fn internal(id: NodeId) -> Self {
        Self {
            id,
            label: None,
            supercluster: true,
            children: Vec::new(),
            leaves: Vec::new(),
            bottom_height: f64::NAN,
            internal_height: f64::NAN,
            top_height: f64::NAN,
            nodes_min_height: f64::NAN,
            nodes_max_height: f64::NAN,
            bands_min_height: f64::NAN,
            bands_max_height: f64::NAN,
        }
    }

    /// Set the three height attributes and fold them into the subtree
    /// extremes. Called once, right after the node's children are attached.
    pub(crate) fn set_heights(&mut self, bottom: f64, internal: f64, top: f64) {
        self.bottom_height = bottom;
        self.internal_height = internal;
        self.top_height = top;
        self.nodes_min_height = self.nodes_min_height.min(bottom);
        self.nodes_max_height = self.nodes_max_height.max(bottom);
        self.bands_min_height = self.bands_min_height.min(top);
        self.bands_max_height = self.bands_max_height.max(top);
    }

    /// Identifier of this node, unique across the whole run.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Display label; `Some` for leaves, `None` for merges.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// True for a node created by merging two or more clusters.
    pub fn is_supercluster(&self) -> bool {
        self.supercluster
    }

    /// True for an original item.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Direct children in merge order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Number of subroots this node exposes: its child count when it is a
    /// supercluster, otherwise 1: a non-merging node acts as its own sole
    /// subroot, which lets it pass through a clustering round without a
    /// wrapper allocation.
    pub fn num_subroots(&self) -> usize {
        if self.supercluster {
            self.children.len()
        } else {
            1
        }
    }

    /// The `i`-th subroot (see [`Node::num_subroots`]).
    pub fn subroot(&self, i: usize) -> NodeId {
        if self.supercluster {
            self.children[i]
        } else {
            self.id
        }
    }

    /// Leaf descendants, cached flat in first-attached order.
    pub fn leaves(&self) -> &[NodeId] {
        &self.leaves
    }

    /// Number of leaf descendants; 1 for a leaf.
    pub fn num_leaves(&self) -> usize {
        self.leaves.len()
    }

    /// The `i`-th leaf descendant.
    pub fn leaf_id(&self, i: usize) -> NodeId {
        self.leaves[i]
    }

    /// Proximity at which this merge happened; NaN for leaves.
    pub fn bottom_height(&self) -> f64 {
        self.bottom_height
    }

    /// The linkage method's aggregate over the merged children's mutual
    /// proximities; NaN for leaves.
    pub fn internal_height(&self) -> f64 {
        self.internal_height
    }

    /// Most extreme pairwise proximity among the merged children; NaN for
    /// leaves.
    pub fn top_height(&self) -> f64 {
        self.top_height
    }

    /// Smallest merge height in this subtree; NaN for leaves.
    pub fn nodes_min_height(&self) -> f64 {
        self.nodes_min_height
    }

    /// Largest merge height in this subtree; NaN for leaves.
    pub fn nodes_max_height(&self) -> f64 {
        self.nodes_max_height
    }

    /// Smallest top height in this subtree; NaN for leaves.
    pub fn bands_min_height(&self) -> f64 {
        self.bands_min_height
    }

    /// Largest top height in this subtree; NaN for leaves.
    pub fn bands_max_height(&self) -> f64 {
        self.bands_max_height
    }
}

/// Arena of live nodes used while a dendrogram is under construction.
///
/// The clustering driver owns one of these plus the list of current roots;
/// [`Forest::into_dendrogram`] freezes it once a single root remains.
#[derive(Debug)]
pub(crate) struct Forest {
    nodes: Vec<Node>,
}

impl Forest {
    pub(crate) fn with_leaves<S: AsRef<str>>(labels: &[S]) -> Self {
        let nodes = labels
            .iter()
            .enumerate()
            .map(|(id, label)| Node::leaf(id, label.as_ref().to_string()))
            .collect();
        Self { nodes }
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Create a fresh internal node and return its id; the arena length is
    /// the run-wide id counter.
    pub(crate) fn new_internal(&mut self) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::internal(id));
        id
    }

    /// Attach `child` under `parent`, extending the parent's cached leaf
    /// list and folding the child's subtree height extremes into the
    /// parent's.
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        let (child_leaves, n_min, n_max, b_min, b_max) = {
            let c = &self.nodes[child];
            (
                c.leaves.clone(),
                c.nodes_min_height,
                c.nodes_max_height,
                c.bands_min_height,
                c.bands_max_height,
            )
        };
        let p = &mut self.nodes[parent];
        p.children.push(child);
        p.leaves.extend(child_leaves);
        p.nodes_min_height = p.nodes_min_height.min(n_min);
        p.nodes_max_height = p.nodes_max_height.max(n_max);
        p.bands_min_height = p.bands_min_height.min(b_min);
        p.bands_max_height = p.bands_max_height.max(b_max);
    }

    pub(crate) fn set_heights(&mut self, id: NodeId, bottom: f64, internal: f64, top: f64) {
        self.nodes[id].set_heights(bottom, internal, top);
    }

    pub(crate) fn into_dendrogram(self, root: NodeId, num_items: usize) -> Dendrogram {
        Dendrogram {
            nodes: self.nodes,
            root,
            num_items,
        }
    }
}

/// A finished multidendrogram: the node arena plus the final root.
///
/// Leaves occupy ids `0..num_items()` in the row order of the proximity
/// matrix that produced the tree; internal nodes follow in creation order.
/// The tree alone is sufficient for rendering, serialization, and
/// ultrametric reconstruction; no access to the source matrix is needed.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dendrogram {
    nodes: Vec<Node>,
    root: NodeId,
    num_items: usize,
}

impl Dendrogram {
    /// Id of the final root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Number of original items (leaves).
    pub fn num_items(&self) -> usize {
        self.num_items
    }

    /// Total number of nodes, leaves included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the arena holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest(n: usize) -> Forest {
        let labels: Vec<String> = (0..n).map(|i| format!("item{i}")).collect();
        Forest::with_leaves(&labels)
    }

    #[test]
    fn test_leaf_invariants() {
        let f = forest(2);
        let leaf = f.node(0);
        assert!(leaf.is_leaf());
        assert!(!leaf.is_supercluster());
        assert_eq!(leaf.num_leaves(), 1);
        assert_eq!(leaf.leaf_id(0), 0);
        assert_eq!(leaf.num_subroots(), 1);
        assert_eq!(leaf.subroot(0), 0);
        assert_eq!(leaf.label(), Some("item0"));
        assert!(leaf.bottom_height().is_nan());
    }

    #[test]
    fn test_attach_accumulates_leaves_in_order() {
        let mut f = forest(3);
        let a = f.new_internal();
        f.attach(a, 2);
        f.attach(a, 0);
        f.set_heights(a, 1.0, 1.0, 1.0);
        let b = f.new_internal();
        f.attach(b, a);
        f.attach(b, 1);
        f.set_heights(b, 2.0, 2.0, 2.5);

        assert_eq!(f.node(a).children(), &[2, 0]);
        assert_eq!(f.node(a).leaves(), &[2, 0]);
        assert_eq!(f.node(b).leaves(), &[2, 0, 1]);
        assert_eq!(f.node(b).num_leaves(), 3);
    }

    #[test]
    fn test_supercluster_subroots() {
        let mut f = forest(3);
        let a = f.new_internal();
        f.attach(a, 0);
        f.attach(a, 1);
        assert!(f.node(a).is_supercluster());
        assert_eq!(f.node(a).num_subroots(), 2);
        assert_eq!(f.node(a).subroot(1), 1);
    }

    #[test]
    fn test_height_extremes_fold_up() {
        let mut f = forest(4);
        let a = f.new_internal();
        f.attach(a, 0);
        f.attach(a, 1);
        f.set_heights(a, 1.0, 1.0, 1.5);
        let b = f.new_internal();
        f.attach(b, 2);
        f.attach(b, 3);
        f.set_heights(b, 0.5, 0.5, 0.5);
        let root = f.new_internal();
        f.attach(root, a);
        f.attach(root, b);
        f.set_heights(root, 3.0, 3.0, 3.0);

        let r = f.node(root);
        assert_eq!(r.nodes_min_height(), 0.5);
        assert_eq!(r.nodes_max_height(), 3.0);
        assert_eq!(r.bands_min_height(), 0.5);
        assert_eq!(r.bands_max_height(), 3.0);
        // The intermediate node only sees its own subtree.
        assert_eq!(f.node(a).nodes_min_height(), 1.0);
        assert_eq!(f.node(a).bands_max_height(), 1.5);
    }

    #[test]
    fn test_into_dendrogram() {
        let mut f = forest(2);
        let a = f.new_internal();
        f.attach(a, 0);
        f.attach(a, 1);
        f.set_heights(a, 1.0, 1.0, 1.0);
        let tree = f.into_dendrogram(a, 2);
        assert_eq!(tree.root(), 2);
        assert_eq!(tree.num_items(), 2);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.node(tree.root()).num_leaves(), 2);
    }
}
