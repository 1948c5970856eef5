//! Ultrametric reconstruction from a finished multidendrogram.
//!
//! A rooted tree with merge heights *is* an ultrametric: the distance it
//! implies between two leaves is the height of their lowest common
//! ancestor, and any such matrix satisfies the strong triangle inequality
//!
//! ```text
//! d(x, z) <= max(d(x, y), d(y, z))
//! ```
//!
//! Reconstructing that matrix from the tree is the bridge to the quality
//! measures in [`crate::metrics`]: comparing it against the proximities
//! that produced the tree tells how much the clustering distorted them.

use crate::dendrogram::{Dendrogram, NodeId};
use crate::proximity::SymmetricMatrix;

/// Pairwise proximities implied by the tree: for each pair of leaves, the
/// merge height of their lowest common ancestor.
///
/// Leaf ids index the result exactly like the matrix that produced the
/// tree. The diagonal is left unset. Runs in O(n²) via one top-down pass:
/// a node's height is assigned to every leaf pair that spans two of its
/// children, then the children are visited.
pub fn ultrametric_matrix(tree: &Dendrogram) -> SymmetricMatrix {
    let mut matrix = SymmetricMatrix::with_size(tree.num_items());
    assign_pairs(tree, tree.root(), &mut matrix);
    matrix
}

fn assign_pairs(tree: &Dendrogram, id: NodeId, matrix: &mut SymmetricMatrix) {
    let node = tree.node(id);
    let children = node.children();
    if children.is_empty() {
        return;
    }
    let height = node.bottom_height();
    for (pos, &a) in children.iter().enumerate() {
        for &b in &children[pos + 1..] {
            for &leaf_a in tree.node(a).leaves() {
                for &leaf_b in tree.node(b).leaves() {
                    matrix.set(leaf_a, leaf_b, height);
                }
            }
        }
    }
    for &child in children {
        assign_pairs(tree, child, matrix);
    }
}

/// Check the strong triangle inequality over every triple, within
/// `tolerance`.
pub fn is_ultrametric(matrix: &SymmetricMatrix, tolerance: f64) -> bool {
    let n = matrix.num_rows();
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                if i == j || j == k || i == k {
                    continue;
                }
                let d_ik = matrix.get(i, k);
                let d_ij = matrix.get(i, j);
                let d_jk = matrix.get(j, k);
                if d_ik > d_ij.max(d_jk) + tolerance {
                    return false;
                }
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{AgglomerativeClustering, Linkage};

    #[test]
    fn test_reconstruction_of_nested_merges() {
        // ((a,b) @ 1, c) @ 2
        let m = SymmetricMatrix::from_rows(&[
            vec![0.0, 1.0, 2.0],
            vec![1.0, 0.0, 2.0],
            vec![2.0, 2.0, 0.0],
        ])
        .unwrap();
        let tree = AgglomerativeClustering::new(Linkage::Single)
            .build(&m, &["a", "b", "c"])
            .unwrap();
        let u = ultrametric_matrix(&tree);
        assert_eq!(u.get(0, 1), 1.0);
        assert_eq!(u.get(0, 2), 2.0);
        assert_eq!(u.get(1, 2), 2.0);
    }

    #[test]
    fn test_kary_merge_assigns_one_height() {
        let m = SymmetricMatrix::from_rows(&[
            vec![0.0, 1.0, 1.0],
            vec![1.0, 0.0, 1.0],
            vec![1.0, 1.0, 0.0],
        ])
        .unwrap();
        let tree = AgglomerativeClustering::new(Linkage::Single)
            .build(&m, &["a", "b", "c"])
            .unwrap();
        let u = ultrametric_matrix(&tree);
        for i in 0..3 {
            for j in 0..i {
                assert_eq!(u.get(i, j), 1.0);
            }
        }
    }

    #[test]
    fn test_reconstruction_is_ultrametric() {
        let m = SymmetricMatrix::from_rows(&[
            vec![0.0, 3.0, 5.0, 9.0],
            vec![3.0, 0.0, 4.0, 8.0],
            vec![5.0, 4.0, 0.0, 7.0],
            vec![9.0, 8.0, 7.0, 0.0],
        ])
        .unwrap();
        // The input is not ultrametric; the reconstruction must be.
        assert!(!is_ultrametric(&m, 1e-10));
        let tree = AgglomerativeClustering::new(Linkage::complete())
            .build(&m, &["a", "b", "c", "d"])
            .unwrap();
        let u = ultrametric_matrix(&tree);
        assert!(is_ultrametric(&u, 1e-10));
    }

    #[test]
    fn test_single_leaf_tree() {
        let m = SymmetricMatrix::new(1).unwrap();
        let tree = AgglomerativeClustering::new(Linkage::Single)
            .build(&m, &["only"])
            .unwrap();
        let u = ultrametric_matrix(&tree);
        assert_eq!(u.num_rows(), 1);
        assert_eq!(u.min_value(), None);
    }
}
