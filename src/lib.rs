//! # multidendro
//!
//! Agglomerative hierarchical clustering that merges **tied** clusters
//! simultaneously, producing a *multidendrogram* (a tree whose internal
//! nodes may have more than two children) instead of an arbitrarily
//! tie-broken binary dendrogram.
//!
//! # Why Multidendrograms
//!
//! When several pairwise proximities are equal at a merge step, a binary
//! clusterer picks one pair by input order, so the output depends on how
//! the rows happened to be listed. Grouping every tied pair at once
//! removes that non-uniqueness: the same proximities always produce the
//! same tree.
//!
//! ```text
//! binary, tie broken left     binary, tie broken right    multidendrogram
//!
//!        /\                          /\                        /|\
//!       /\ c                        a /\                      a b c
//!      a  b                          b  c
//!
//!              all three pairwise proximities equal
//! ```
//!
//! # Pipeline
//!
//! ```text
//! SymmetricMatrix + labels
//!         |
//!         v
//! AgglomerativeClustering::build()     (Linkage, ProximityType, precision)
//!         |
//!         v
//!      Dendrogram  ---->  ultrametric_matrix()  ---->  metrics::*
//! ```
//!
//! - [`proximity`]: the [`SymmetricMatrix`] storage and the run-wide
//!   [`ProximityType`] polarity (distances vs similarities).
//! - [`cluster`]: the [`AgglomerativeClustering`] driver and the
//!   [`Linkage`] family (single, centroid, beta-flexible, and the
//!   versatile power-mean covering complete/arithmetic/geometric/harmonic).
//! - [`dendrogram`]: the arena-backed tree model with per-node merge
//!   heights and ties-band spreads.
//! - [`ultrametric`]: the proximities a finished tree implies.
//! - [`metrics`]: cophenetic correlation, normalized errors, space
//!   distortion, degree of connectivity, tree balance.
//! - [`rounding`]: the decimal rounding underneath tie detection.
//!
//! # Example
//!
//! ```rust
//! use multidendro::{AgglomerativeClustering, Linkage, SymmetricMatrix};
//! use multidendro::metrics::cophenetic_correlation;
//! use multidendro::ultrametric::ultrametric_matrix;
//!
//! // Three tight items and a distant fourth.
//! let matrix = SymmetricMatrix::from_rows(&[
//!     vec![0.0, 1.0, 1.0, 6.0],
//!     vec![1.0, 0.0, 1.0, 6.0],
//!     vec![1.0, 1.0, 0.0, 6.0],
//!     vec![6.0, 6.0, 6.0, 0.0],
//! ])?;
//!
//! let tree = AgglomerativeClustering::new(Linkage::arithmetic(false))
//!     .build(&matrix, &["a", "b", "c", "d"])?;
//!
//! // The three tied items fuse into one ternary node.
//! let root = tree.node(tree.root());
//! assert_eq!(root.children().len(), 2);
//! let trio = tree.node(root.children()[0]);
//! assert_eq!(trio.num_leaves(), 3);
//! assert_eq!(trio.bottom_height(), 1.0);
//!
//! // And the tree reproduces the proximities exactly.
//! let ultra = ultrametric_matrix(&tree);
//! assert!((cophenetic_correlation(&matrix, &ultra) - 1.0).abs() < 1e-12);
//! # Ok::<(), multidendro::Error>(())
//! ```
//!
//! # References
//!
//! - Fernández & Gómez (2008). "Solving non-uniqueness in agglomerative
//!   hierarchical clustering using multidendrograms." J. Classification.
//! - Lance & Williams (1967). "A general theory of classificatory sorting
//!   strategies." Computer Journal.
//! - Sokal & Rohlf (1962). "The comparison of dendrograms by objective
//!   methods." Taxon.

pub mod cluster;
pub mod dendrogram;
/// Error types used across `multidendro`.
pub mod error;
pub mod metrics;
pub mod proximity;
pub mod rounding;
pub mod ultrametric;

#[cfg(test)]
mod clustering_tests;

pub use cluster::{AgglomerativeClustering, Linkage};
pub use dendrogram::{Dendrogram, Node, NodeId};
pub use error::{Error, Result};
pub use metrics::{
    cophenetic_correlation, degree_of_connectivity, normalized_mean_absolute_error,
    normalized_mean_squared_error, space_distortion, tree_balance,
};
pub use proximity::{ProximityType, SymmetricMatrix};
pub use ultrametric::{is_ultrametric, ultrametric_matrix};
