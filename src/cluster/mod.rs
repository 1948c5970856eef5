//! Agglomerative clustering with simultaneous tied merges.
//!
//! Conventional agglomerative clustering merges exactly two clusters per
//! step, breaking ties by input order, so reordering the rows of the
//! proximity matrix can change the tree. The driver here instead detects
//! *all* pairs tied with the round's extremal proximity (after decimal
//! rounding at a configured precision), closes them transitively, and
//! fuses each tied family in one step. The result is a multidendrogram:
//! internal nodes may have more than two children, and the output is
//! independent of input order.
//!
//! # One round
//!
//! ```text
//! 1. grouping = min (distance) / max (similarity) over the matrix
//! 2. mark every pair whose rounded proximity ties the rounded grouping
//! 3. close the tie relation transitively -> merge groups
//! 4. fuse each group into a new node at height = grouping
//! 5. derive the next, smaller matrix: recompute pairs that involve a
//!    new node via the linkage rule, copy untouched pairs verbatim
//! ```
//!
//! Rounds repeat until a single root remains; with `n` items that takes
//! at most `n - 1` rounds. Step 5 is the O(r²) hot spot and fans out over
//! pairs with rayon; values are written back in pair order, so the result
//! is identical to a sequential evaluation.
//!
//! # Example
//!
//! ```rust
//! use multidendro::{AgglomerativeClustering, Linkage, SymmetricMatrix};
//!
//! let matrix = SymmetricMatrix::from_rows(&[
//!     vec![0.0, 1.0, 2.0],
//!     vec![1.0, 0.0, 2.0],
//!     vec![2.0, 2.0, 0.0],
//! ])?;
//! let tree = AgglomerativeClustering::new(Linkage::Single)
//!     .with_precision(2)
//!     .build(&matrix, &["a", "b", "c"])?;
//!
//! let root = tree.node(tree.root());
//! assert_eq!(root.num_leaves(), 3);
//! assert_eq!(root.bottom_height(), 2.0);
//! # Ok::<(), multidendro::Error>(())
//! ```

mod linkage;

pub use linkage::Linkage;

use crate::dendrogram::{Dendrogram, Forest, NodeId};
use crate::error::{Error, Result};
use crate::proximity::{ProximityType, SymmetricMatrix};
use crate::rounding::round;
use linkage::MergeView;
use log::debug;
use rayon::prelude::*;

/// Decimal digits beyond this are not meaningful in an f64.
const MAX_PRECISION: u32 = 15;

/// Agglomerative multidendrogram builder.
///
/// Configuration is immutable once built; [`build`](Self::build) is a pure
/// function of the configuration and its inputs, so the same inputs always
/// produce the same tree.
#[derive(Debug, Clone)]
pub struct AgglomerativeClustering {
    linkage: Linkage,
    proximity_type: ProximityType,
    precision: Option<u32>,
}

impl AgglomerativeClustering {
    /// Create a clusterer with the given linkage, distance-based
    /// proximities, and automatic precision.
    pub fn new(linkage: Linkage) -> Self {
        Self {
            linkage,
            proximity_type: ProximityType::Distance,
            precision: None,
        }
    }

    /// Set the proximity polarity.
    pub fn with_proximity_type(mut self, proximity_type: ProximityType) -> Self {
        self.proximity_type = proximity_type;
        self
    }

    /// Set the number of decimal digits used for tie detection.
    ///
    /// Two proximities are tied when they agree after rounding to this many
    /// decimals. When unset, the precision is taken from the matrix
    /// ([`SymmetricMatrix::required_precision`]), i.e. ties must be exact
    /// at the input's own resolution. At most 15 decimals are supported.
    pub fn with_precision(mut self, decimals: u32) -> Self {
        self.precision = Some(decimals);
        self
    }

    /// Cluster the matrix into a single-root multidendrogram.
    ///
    /// `labels[i]` names the item of matrix row `i` and becomes the label
    /// of leaf `i`. All validation happens before the first round; once
    /// merging starts the computation cannot fail other than by a
    /// degenerate linkage aggregate.
    pub fn build<S: AsRef<str>>(
        &self,
        matrix: &SymmetricMatrix,
        labels: &[S],
    ) -> Result<Dendrogram> {
        let precision = self.validate(matrix, labels)?;
        let n = matrix.num_rows();

        let mut forest = Forest::with_leaves(labels);
        let mut roots: Vec<NodeId> = (0..n).collect();
        let mut current = matrix.clone();
        let mut rounds = 0usize;

        while roots.len() > 1 {
            rounds += 1;
            let before = roots.len();
            let (next_roots, next_matrix) =
                self.merge_round(&mut forest, &roots, &current, precision)?;
            if next_roots.len() >= before {
                // The extremal pair always ties with itself, so a round
                // that merges nothing means a broken invariant; stop loudly
                // instead of looping.
                return Err(Error::DegenerateAggregate {
                    method: self.linkage.name(),
                });
            }
            debug!(
                "round {rounds}: {before} -> {} roots",
                next_roots.len()
            );
            roots = next_roots;
            current = next_matrix;
        }

        Ok(forest.into_dendrogram(roots[0], n))
    }

    /// Eager validation; returns the effective tie-detection precision.
    fn validate<S: AsRef<str>>(&self, matrix: &SymmetricMatrix, labels: &[S]) -> Result<u32> {
        let n = matrix.num_rows();
        if labels.len() != n {
            return Err(Error::LabelMismatch {
                labels: labels.len(),
                rows: n,
            });
        }
        for i in 0..n {
            for j in 0..i {
                if !matrix.get(i, j).is_finite() {
                    return Err(Error::NonFiniteProximity { row: i, col: j });
                }
            }
        }
        self.linkage.validate(self.proximity_type)?;
        match self.precision {
            Some(p) if p > MAX_PRECISION => Err(Error::InvalidPrecision {
                requested: p,
                maximum: MAX_PRECISION,
            }),
            Some(p) => Ok(p),
            None => Ok(matrix.required_precision().min(MAX_PRECISION)),
        }
    }

    /// Execute one merge round: group tied roots, fuse each group into a
    /// new node, and derive the next round's matrix.
    fn merge_round(
        &self,
        forest: &mut Forest,
        roots: &[NodeId],
        current: &SymmetricMatrix,
        precision: u32,
    ) -> Result<(Vec<NodeId>, SymmetricMatrix)> {
        let r = roots.len();
        let grouping = match self.proximity_type {
            ProximityType::Distance => current.min_value(),
            ProximityType::Similarity => current.max_value(),
        }
        .ok_or(Error::EmptyMatrix)?;

        let group = label_groups(current, grouping, precision, r);

        // Emit the next root list: a pass-through keeps its position, a
        // merge group lands at the position of its first member with its
        // members in original order. `members` records, per new root, the
        // previous-round matrix indices it covers.
        let mut new_roots: Vec<NodeId> = Vec::new();
        let mut members: Vec<Vec<usize>> = Vec::new();
        let mut emitted = vec![false; r + 1];
        for i in 0..r {
            let g = group[i];
            if g == 0 {
                new_roots.push(roots[i]);
                members.push(vec![i]);
            } else if !emitted[g] {
                emitted[g] = true;
                let indices: Vec<usize> = (i..r).filter(|&j| group[j] == g).collect();
                let id = forest.new_internal();
                for &j in &indices {
                    forest.attach(id, roots[j]);
                }
                let (bottom, internal, top) =
                    self.group_heights(forest, roots, &indices, current, grouping)?;
                forest.set_heights(id, bottom, internal, top);
                new_roots.push(id);
                members.push(indices);
            }
        }
        debug!(
            "grouping proximity {grouping}: {} merge groups over {r} roots",
            members.iter().filter(|m| m.len() > 1).count()
        );

        let next = self.next_matrix(forest, roots, &members, current)?;
        Ok((new_roots, next))
    }

    /// Heights of a freshly merged group: the merge height itself, the
    /// linkage's internal aggregate, and the farthest internal pair.
    fn group_heights(
        &self,
        forest: &Forest,
        roots: &[NodeId],
        indices: &[usize],
        current: &SymmetricMatrix,
        grouping: f64,
    ) -> Result<(f64, f64, f64)> {
        if indices.len() == 2 {
            // A binary merge has no internal spread.
            return Ok((grouping, grouping, grouping));
        }
        let mut top = f64::NAN;
        for (pos, &i) in indices.iter().enumerate() {
            for &k in &indices[pos + 1..] {
                top = self.proximity_type.farther(top, current.get(i, k));
            }
        }
        let leaves: Vec<usize> = indices
            .iter()
            .map(|&j| forest.node(roots[j]).num_leaves())
            .collect();
        let view = MergeView::new(indices, &leaves);
        let internal =
            self.linkage
                .internal_proximity(self.proximity_type, &view, current, grouping)?;
        Ok((grouping, internal, top))
    }

    /// Derive the next round's matrix. Pairs of pass-throughs are copied
    /// verbatim (their mutual proximity cannot have changed) and every
    /// pair touching a new node is recomputed from the linkage rule. The
    /// recomputation is independent per pair and fans out over rayon.
    fn next_matrix(
        &self,
        forest: &Forest,
        roots: &[NodeId],
        members: &[Vec<usize>],
        current: &SymmetricMatrix,
    ) -> Result<SymmetricMatrix> {
        let m = members.len();
        let leaf_counts: Vec<Vec<usize>> = members
            .iter()
            .map(|indices| {
                indices
                    .iter()
                    .map(|&j| forest.node(roots[j]).num_leaves())
                    .collect()
            })
            .collect();

        let mut pairs: Vec<(usize, usize)> = Vec::with_capacity(m * (m - 1) / 2);
        for i in 0..m {
            for j in 0..i {
                pairs.push((i, j));
            }
        }
        let values = pairs
            .par_iter()
            .map(|&(i, j)| -> Result<f64> {
                if members[i].len() == 1 && members[j].len() == 1 {
                    Ok(current.get(members[i][0], members[j][0]))
                } else {
                    let a = MergeView::new(&members[i], &leaf_counts[i]);
                    let b = MergeView::new(&members[j], &leaf_counts[j]);
                    self.linkage.proximity(self.proximity_type, &a, &b, current)
                }
            })
            .collect::<Result<Vec<f64>>>()?;

        let mut next = SymmetricMatrix::with_size(m);
        for (&(i, j), value) in pairs.iter().zip(values) {
            next.set(i, j, value);
        }
        Ok(next)
    }
}

/// Transitive tie grouping over the current roots.
///
/// Pairs are scanned in row-major order. Group 0 means "not merging"; a
/// tied pair either founds a fresh group, pulls the unlabeled side into the
/// labeled one, or, when two existing groups turn out to be tied,
/// renumbers the larger group id onto the smaller. The scan order fixes
/// which numeric ids appear, but not which roots end up together.
fn label_groups(current: &SymmetricMatrix, grouping: f64, precision: u32, r: usize) -> Vec<usize> {
    let epsilon = 10f64.powi(-(precision as i32) - 1);
    let rounded_grouping = round(grouping, precision);
    let mut group = vec![0usize; r];
    let mut next_id = 0usize;
    for i in 0..r {
        for j in (i + 1)..r {
            let tied =
                (round(current.get(i, j), precision) - rounded_grouping).abs() < epsilon;
            if !tied {
                continue;
            }
            match (group[i], group[j]) {
                (0, 0) => {
                    next_id += 1;
                    group[i] = next_id;
                    group[j] = next_id;
                }
                (gi, 0) => group[j] = gi,
                (0, gj) => group[i] = gj,
                (gi, gj) if gi != gj => {
                    let (keep, replace) = if gi < gj { (gi, gj) } else { (gj, gi) };
                    for g in group.iter_mut() {
                        if *g == replace {
                            *g = keep;
                        }
                    }
                }
                _ => {}
            }
        }
    }
    group
}
