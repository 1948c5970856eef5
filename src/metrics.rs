//! Quality measures for a multidendrogram against its source proximities.
//!
//! All measures compare the original proximity matrix with the ultrametric
//! matrix reconstructed from the tree (see
//! [`ultrametric_matrix`](crate::ultrametric::ultrametric_matrix)), except
//! [`tree_balance`], which looks at the tree shape alone.
//!
//! # Measures Overview
//!
//! | Measure | Range | Best | Reads |
//! |---------|-------|------|-------|
//! | [`cophenetic_correlation`] | [-1, 1] | 1 | both matrices |
//! | [`normalized_mean_squared_error`] | [0, ∞) | 0 | both matrices |
//! | [`normalized_mean_absolute_error`] | [0, ∞) | 0 | both matrices |
//! | [`space_distortion`] | [0, ∞) | — | value ranges |
//! | [`degree_of_connectivity`] | [0, 1] | — | both matrices |
//! | [`tree_balance`] | [0, 1] | — | tree shape |
//!
//! Ill-conditioned inputs (zero variance, zero range, mismatched sizes)
//! yield NaN, a defined output rather than an error.
//!
//! # Example
//!
//! ```rust
//! use multidendro::{AgglomerativeClustering, Linkage, SymmetricMatrix};
//! use multidendro::metrics::cophenetic_correlation;
//! use multidendro::ultrametric::ultrametric_matrix;
//!
//! let matrix = SymmetricMatrix::from_rows(&[
//!     vec![0.0, 1.0, 2.0],
//!     vec![1.0, 0.0, 2.0],
//!     vec![2.0, 2.0, 0.0],
//! ])?;
//! let tree = AgglomerativeClustering::new(Linkage::Single)
//!     .build(&matrix, &["a", "b", "c"])?;
//! let ultra = ultrametric_matrix(&tree);
//!
//! // The input was already ultrametric, so the fit is perfect.
//! assert!((cophenetic_correlation(&matrix, &ultra) - 1.0).abs() < 1e-12);
//! # Ok::<(), multidendro::Error>(())
//! ```

use crate::dendrogram::Dendrogram;
use crate::proximity::{ProximityType, SymmetricMatrix};

/// Pearson correlation between original and ultrametric proximities over
/// all unordered pairs.
///
/// The standard dendrogram-fit score: 1 means the tree reproduces the
/// proximities exactly. NaN when either series has zero variance or the
/// matrices disagree in size.
pub fn cophenetic_correlation(original: &SymmetricMatrix, ultrametric: &SymmetricMatrix) -> f64 {
    let n = original.num_rows();
    if n != ultrametric.num_rows() || n < 2 {
        return f64::NAN;
    }
    let pairs = (n * (n - 1) / 2) as f64;

    let mut mean_o = 0.0;
    let mut mean_u = 0.0;
    for_pairs(n, |i, j| {
        mean_o += original.get(i, j);
        mean_u += ultrametric.get(i, j);
    });
    mean_o /= pairs;
    mean_u /= pairs;

    let mut cov = 0.0;
    let mut var_o = 0.0;
    let mut var_u = 0.0;
    for_pairs(n, |i, j| {
        let d_o = original.get(i, j) - mean_o;
        let d_u = ultrametric.get(i, j) - mean_u;
        cov += d_o * d_u;
        var_o += d_o * d_o;
        var_u += d_u * d_u;
    });

    cov / (var_o * var_u).sqrt()
}

/// `Σ(orig - ultra)² / Σ orig²` over all unordered pairs.
pub fn normalized_mean_squared_error(
    original: &SymmetricMatrix,
    ultrametric: &SymmetricMatrix,
) -> f64 {
    normalized_error(original, ultrametric, 2)
}

/// `Σ|orig - ultra| / Σ|orig|` over all unordered pairs.
pub fn normalized_mean_absolute_error(
    original: &SymmetricMatrix,
    ultrametric: &SymmetricMatrix,
) -> f64 {
    normalized_error(original, ultrametric, 1)
}

fn normalized_error(original: &SymmetricMatrix, ultrametric: &SymmetricMatrix, p: i32) -> f64 {
    let n = original.num_rows();
    if n != ultrametric.num_rows() || n < 2 {
        return f64::NAN;
    }
    let mut num = 0.0;
    let mut den = 0.0;
    for_pairs(n, |i, j| {
        let o = original.get(i, j);
        num += (o - ultrametric.get(i, j)).abs().powi(p);
        den += o.abs().powi(p);
    });
    num / den
}

/// Ratio of the ultrametric value range to the original value range.
///
/// Values above 1 mean the tree stretched the proximities, below 1 that it
/// compressed them.
pub fn space_distortion(original: &SymmetricMatrix, ultrametric: &SymmetricMatrix) -> f64 {
    match (
        original.min_value(),
        original.max_value(),
        ultrametric.min_value(),
        ultrametric.max_value(),
    ) {
        (Some(o_min), Some(o_max), Some(u_min), Some(u_max)) => (u_max - u_min) / (o_max - o_min),
        _ => f64::NAN,
    }
}

/// Fraction of pairs whose original proximity is at least as extreme as
/// the ultrametric value: the edges retained in the threshold graph at
/// the dendrogram's implied cut.
pub fn degree_of_connectivity(
    original: &SymmetricMatrix,
    ultrametric: &SymmetricMatrix,
    proximity_type: ProximityType,
) -> f64 {
    let n = original.num_rows();
    if n != ultrametric.num_rows() || n < 2 {
        return f64::NAN;
    }
    let mut retained = 0usize;
    for_pairs(n, |i, j| {
        let o = original.get(i, j);
        let u = ultrametric.get(i, j);
        let edge = match proximity_type {
            ProximityType::Distance => o <= u,
            ProximityType::Similarity => o >= u,
        };
        if edge {
            retained += 1;
        }
    });
    retained as f64 / (n * (n - 1) / 2) as f64
}

/// Entropy-based balance of the tree shape, normalized to [0, 1].
///
/// Every junction (internal node with more than one child) scores the
/// Shannon entropy of its children's leaf-count distribution, normalized
/// by the log of its child count, so a junction splitting leaves evenly
/// scores 1 whatever its arity. Junction scores are averaged with equal
/// weight, then rescaled against the lowest average a tree on the same
/// leaves can achieve (the caterpillar tree), which in closed form is
///
/// ```text
/// B_min(n) = (ln n + Σ_{k=2}^{n-1} ln(k) / (k+1)) / ((n-1) · ln 2)
/// ```
///
/// A perfectly balanced tree scores 1, a caterpillar scores 0. Trees on
/// one or two leaves score 1 by convention.
pub fn tree_balance(tree: &Dendrogram) -> f64 {
    let n = tree.num_items();
    if n <= 2 {
        return 1.0;
    }

    let mut sum = 0.0;
    let mut junctions = 0usize;
    for node in tree.nodes() {
        let children = node.children();
        if children.len() < 2 {
            continue;
        }
        let total = node.num_leaves() as f64;
        let mut entropy = 0.0;
        for &child in children {
            let share = tree.node(child).num_leaves() as f64 / total;
            entropy -= share * share.ln();
        }
        sum += entropy / (children.len() as f64).ln();
        junctions += 1;
    }
    if junctions == 0 {
        return 1.0;
    }
    let balance = sum / junctions as f64;

    let minimum = minimum_balance(n);
    if minimum >= 1.0 {
        return 1.0;
    }
    ((balance - minimum) / (1.0 - minimum)).clamp(0.0, 1.0)
}

/// Average junction balance of the n-leaf caterpillar tree.
fn minimum_balance(n: usize) -> f64 {
    let mut sum = (n as f64).ln();
    for k in 2..n {
        sum += (k as f64).ln() / (k as f64 + 1.0);
    }
    sum / ((n - 1) as f64 * 2f64.ln())
}

fn for_pairs(n: usize, mut visit: impl FnMut(usize, usize)) {
    for i in 0..n {
        for j in 0..i {
            visit(i, j);
        }
    }
}
