//! Linkage strategies: how "proximity between two clusters" is defined.
//!
//! Every strategy answers the same two questions, reading only the
//! previous round's proximity matrix:
//!
//! - `proximity(A, B)`: the proximity between two clusters, over the
//!   subroots each cluster exposes to that matrix;
//! - `internal_proximity(A)`: the strategy's aggregate over the mutual
//!   proximities of a newly merged cluster's children (the
//!   `internal_height` of a k-ary merge).
//!
//! # The family
//!
//! | Variant | Rule |
//! |---------|------|
//! | [`Linkage::Single`] | closest subroot pair |
//! | [`Linkage::Centroid`] | Lance-Williams centroid recurrence |
//! | [`Linkage::BetaFlexible`] | Lance-Williams with a shape parameter β |
//! | [`Linkage::Versatile`] | generalized power mean with exponent p |
//!
//! The versatile power mean subsumes the classic named methods as
//! exponent choices, available as constructors:
//!
//! ```text
//! p = +inf   complete linkage (farthest pair)     Linkage::complete()
//! p = 1      arithmetic mean (UPGMA / WPGMA)      Linkage::arithmetic(..)
//! p = 0      geometric mean                       Linkage::geometric(..)
//! p = -1     harmonic mean                        Linkage::harmonic(..)
//! p = -inf   single linkage (closest pair)
//! ```
//!
//! In similarity mode the exponent sign is flipped, so `p = +inf` still
//! means "the least close pair" whichever way closeness is measured.
//!
//! # Lance-Williams recurrence
//!
//! Centroid and beta-flexible share one recurrence over direct subroots
//! `i, k` of A and `j, l` of B, with `d` from the previous round:
//!
//! ```text
//! prox(A,B) =   sum_ij  alpha(A,i,B,j) * d(i,j)
//!             + sum_i<k beta(A,i,k,B)  * d(i,k)
//!             + sum_j<l beta(B,j,l,A)  * d(j,l)
//! ```
//!
//! Each variant supplies `alpha` and `beta`, in a weighted flavor (every
//! subroot counts equally) and an unweighted flavor (subroots count by
//! their leaf population).

use crate::error::{Error, Result};
use crate::proximity::{ProximityType, SymmetricMatrix};

/// Cluster-to-cluster proximity rule used by the clustering driver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Linkage {
    /// Closest pair of subroots; no recurrence weighting.
    Single,
    /// Lance-Williams centroid recurrence. Distance-based proximities only.
    Centroid {
        /// Count each subroot equally instead of by leaf population.
        weighted: bool,
    },
    /// Lance-Williams recurrence with a user-supplied shape parameter
    /// `beta` in `[-1, 1]`. Negative beta spreads clusters apart, positive
    /// beta pulls them together.
    BetaFlexible {
        /// Count each subroot equally instead of by leaf population.
        weighted: bool,
        /// Shape parameter.
        beta: f64,
    },
    /// Generalized weighted power mean of all cross-pair proximities with
    /// exponent `power`. `+inf`, `-inf` and `0` select the max, min and
    /// geometric-mean limits.
    Versatile {
        /// Count each subroot equally instead of by leaf population.
        weighted: bool,
        /// Power-mean exponent (flipped in similarity mode).
        power: f64,
    },
}

impl Linkage {
    /// Complete linkage: the farthest subroot pair (`p = +inf`).
    pub fn complete() -> Self {
        Linkage::Versatile {
            weighted: false,
            power: f64::INFINITY,
        }
    }

    /// Arithmetic-mean linkage, UPGMA (unweighted) or WPGMA (weighted).
    pub fn arithmetic(weighted: bool) -> Self {
        Linkage::Versatile {
            weighted,
            power: 1.0,
        }
    }

    /// Geometric-mean linkage (`p = 0`).
    pub fn geometric(weighted: bool) -> Self {
        Linkage::Versatile {
            weighted,
            power: 0.0,
        }
    }

    /// Harmonic-mean linkage (`p = -1`).
    pub fn harmonic(weighted: bool) -> Self {
        Linkage::Versatile {
            weighted,
            power: -1.0,
        }
    }

    /// Short method name for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Linkage::Single => "single",
            Linkage::Centroid { .. } => "centroid",
            Linkage::BetaFlexible { .. } => "beta-flexible",
            Linkage::Versatile { .. } => "versatile",
        }
    }

    /// Eager parameter and polarity checks, run before any round executes.
    pub(crate) fn validate(&self, proximity_type: ProximityType) -> Result<()> {
        match *self {
            Linkage::Centroid { .. } if !proximity_type.is_distance_based() => {
                Err(Error::IncompatibleMethod {
                    method: self.name(),
                })
            }
            Linkage::BetaFlexible { beta, .. } if !(-1.0..=1.0).contains(&beta) => {
                Err(Error::InvalidParameter {
                    name: "beta",
                    message: "must lie within [-1, 1]",
                })
            }
            Linkage::Versatile { power, .. } if power.is_nan() => Err(Error::InvalidParameter {
                name: "power",
                message: "must not be NaN",
            }),
            _ => Ok(()),
        }
    }

    /// Proximity between clusters `a` and `b` over the previous round's
    /// matrix.
    pub(crate) fn proximity(
        &self,
        proximity_type: ProximityType,
        a: &MergeView<'_>,
        b: &MergeView<'_>,
        prev: &SymmetricMatrix,
    ) -> Result<f64> {
        let value = match *self {
            Linkage::Single => single_extremum(proximity_type, a.indices, b.indices, prev),
            Linkage::Centroid { weighted } => centroid(weighted, a, b, prev),
            Linkage::BetaFlexible { weighted, beta } => beta_flexible(weighted, beta, a, b, prev),
            Linkage::Versatile { weighted, power } => {
                let pairs = cross_pairs(weighted, a, b, prev);
                power_mean(&pairs, effective_power(proximity_type, power))
            }
        };
        self.check_finite(value)
    }

    /// Aggregate over the mutual proximities of a merged cluster's
    /// children. `bottom` is the merge height, which is the defined value
    /// for the recurrence-based methods.
    pub(crate) fn internal_proximity(
        &self,
        proximity_type: ProximityType,
        cluster: &MergeView<'_>,
        prev: &SymmetricMatrix,
        bottom: f64,
    ) -> Result<f64> {
        if cluster.len() < 2 {
            return Ok(bottom);
        }
        let value = match *self {
            Linkage::Single => {
                let mut best = f64::NAN;
                for i in 0..cluster.len() {
                    for k in (i + 1)..cluster.len() {
                        let d = prev.get(cluster.indices[i], cluster.indices[k]);
                        best = proximity_type.closer(best, d);
                    }
                }
                best
            }
            Linkage::Versatile { weighted, power } => {
                let pairs = internal_pairs(weighted, cluster, prev);
                power_mean(&pairs, effective_power(proximity_type, power))
            }
            Linkage::Centroid { .. } | Linkage::BetaFlexible { .. } => bottom,
        };
        self.check_finite(value)
    }

    fn check_finite(&self, value: f64) -> Result<f64> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Error::DegenerateAggregate {
                method: self.name(),
            })
        }
    }
}

/// One side of a merge: the subroots a cluster exposes to the previous
/// round's proximity matrix, with their leaf populations.
///
/// For a cluster created this round these are its direct children; for a
/// cluster passing through unchanged the view is the cluster itself.
#[derive(Debug)]
pub(crate) struct MergeView<'a> {
    /// Indices into the previous round's matrix, one per subroot.
    pub indices: &'a [usize],
    /// Leaf counts, parallel to `indices`.
    pub leaves: &'a [usize],
    /// Sum of `leaves`.
    pub total_leaves: usize,
}

impl<'a> MergeView<'a> {
    pub(crate) fn new(indices: &'a [usize], leaves: &'a [usize]) -> Self {
        Self {
            indices,
            leaves,
            total_leaves: leaves.iter().sum(),
        }
    }

    fn len(&self) -> usize {
        self.indices.len()
    }

    /// Subroot weight: equal shares (weighted) or leaf-population shares
    /// (unweighted). Sums to 1 over the view either way.
    fn weight(&self, k: usize, weighted: bool) -> f64 {
        if weighted {
            1.0 / self.len() as f64
        } else {
            self.leaves[k] as f64 / self.total_leaves as f64
        }
    }
}

/// Exponent actually applied: similarity mode flips the sign so `+inf`
/// always selects the least close pair.
fn effective_power(proximity_type: ProximityType, power: f64) -> f64 {
    if proximity_type.is_distance_based() {
        power
    } else {
        -power
    }
}

fn single_extremum(
    proximity_type: ProximityType,
    rows: &[usize],
    cols: &[usize],
    prev: &SymmetricMatrix,
) -> f64 {
    let mut best = f64::NAN;
    for &i in rows {
        for &j in cols {
            best = proximity_type.closer(best, prev.get(i, j));
        }
    }
    best
}

fn centroid(weighted: bool, a: &MergeView<'_>, b: &MergeView<'_>, prev: &SymmetricMatrix) -> f64 {
    let mut sum = 0.0;
    for i in 0..a.len() {
        for j in 0..b.len() {
            let alpha = if weighted {
                (a.leaves[i] * b.leaves[j]) as f64 / (a.total_leaves * b.total_leaves) as f64
            } else {
                1.0 / (a.len() * b.len()) as f64
            };
            sum += alpha * prev.get(a.indices[i], b.indices[j]);
        }
    }
    sum + centroid_intra(weighted, a, prev) + centroid_intra(weighted, b, prev)
}

fn centroid_intra(weighted: bool, x: &MergeView<'_>, prev: &SymmetricMatrix) -> f64 {
    let mut sum = 0.0;
    for i in 0..x.len() {
        for k in (i + 1)..x.len() {
            let beta = if weighted {
                -((x.leaves[i] * x.leaves[k]) as f64) / (x.total_leaves as f64).powi(2)
            } else {
                -1.0 / (x.len() as f64).powi(2)
            };
            sum += beta * prev.get(x.indices[i], x.indices[k]);
        }
    }
    sum
}

fn beta_flexible(
    weighted: bool,
    beta: f64,
    a: &MergeView<'_>,
    b: &MergeView<'_>,
    prev: &SymmetricMatrix,
) -> f64 {
    let mut sum = 0.0;
    for i in 0..a.len() {
        for j in 0..b.len() {
            let alpha = a.weight(i, weighted) * b.weight(j, weighted) * (1.0 - beta);
            sum += alpha * prev.get(a.indices[i], b.indices[j]);
        }
    }

    let intra_pairs = comb2(a.len()) + comb2(b.len());
    if intra_pairs > 0 {
        if weighted {
            // Every intra pair gets an equal slice of beta.
            let scale = beta / intra_pairs as f64;
            sum += scale * (intra_sum(a, prev) + intra_sum(b, prev));
        } else {
            // Intra pairs get beta in proportion to their leaf populations.
            let sigma = leaf_pair_products(a) + leaf_pair_products(b);
            if sigma > 0.0 {
                let scale = beta / sigma;
                sum += scale * (leaf_weighted_intra_sum(a, prev) + leaf_weighted_intra_sum(b, prev));
            }
        }
    }
    sum
}

/// Plain sum of proximities over intra pairs of the view.
fn intra_sum(x: &MergeView<'_>, prev: &SymmetricMatrix) -> f64 {
    let mut sum = 0.0;
    for i in 0..x.len() {
        for k in (i + 1)..x.len() {
            sum += prev.get(x.indices[i], x.indices[k]);
        }
    }
    sum
}

/// Sum of `leaves(i) * leaves(k)` over intra pairs of the view.
fn leaf_pair_products(x: &MergeView<'_>) -> f64 {
    let mut sum = 0.0;
    for i in 0..x.len() {
        for k in (i + 1)..x.len() {
            sum += (x.leaves[i] * x.leaves[k]) as f64;
        }
    }
    sum
}

/// Sum of `leaves(i) * leaves(k) * d(i,k)` over intra pairs of the view.
fn leaf_weighted_intra_sum(x: &MergeView<'_>, prev: &SymmetricMatrix) -> f64 {
    let mut sum = 0.0;
    for i in 0..x.len() {
        for k in (i + 1)..x.len() {
            sum += (x.leaves[i] * x.leaves[k]) as f64 * prev.get(x.indices[i], x.indices[k]);
        }
    }
    sum
}

/// `(weight, proximity)` pairs for all cross pairs of `a` and `b`; weights
/// sum to 1.
fn cross_pairs(
    weighted: bool,
    a: &MergeView<'_>,
    b: &MergeView<'_>,
    prev: &SymmetricMatrix,
) -> Vec<(f64, f64)> {
    let mut pairs = Vec::with_capacity(a.len() * b.len());
    for i in 0..a.len() {
        let wi = a.weight(i, weighted);
        for j in 0..b.len() {
            pairs.push((
                wi * b.weight(j, weighted),
                prev.get(a.indices[i], b.indices[j]),
            ));
        }
    }
    pairs
}

/// `(weight, proximity)` pairs over the intra pairs of a view, with the
/// pair weights renormalized to sum to 1.
fn internal_pairs(
    weighted: bool,
    cluster: &MergeView<'_>,
    prev: &SymmetricMatrix,
) -> Vec<(f64, f64)> {
    let mut pairs = Vec::with_capacity(comb2(cluster.len()));
    let mut total = 0.0;
    for i in 0..cluster.len() {
        for k in (i + 1)..cluster.len() {
            let w = cluster.weight(i, weighted) * cluster.weight(k, weighted);
            total += w;
            pairs.push((w, prev.get(cluster.indices[i], cluster.indices[k])));
        }
    }
    if total > 0.0 {
        for pair in &mut pairs {
            pair.0 /= total;
        }
    }
    pairs
}

/// Weighted power mean of `(weight, value)` pairs whose weights sum to 1.
fn power_mean(pairs: &[(f64, f64)], p: f64) -> f64 {
    if p == f64::INFINITY {
        pairs.iter().fold(f64::NAN, |acc, &(_, v)| acc.max(v))
    } else if p == f64::NEG_INFINITY {
        pairs.iter().fold(f64::NAN, |acc, &(_, v)| acc.min(v))
    } else if p == 0.0 {
        let log_sum: f64 = pairs.iter().map(|&(w, v)| w * v.ln()).sum();
        log_sum.exp()
    } else {
        let sum: f64 = pairs.iter().map(|&(w, v)| w * v.powf(p)).sum();
        sum.powf(1.0 / p)
    }
}

fn comb2(n: usize) -> usize {
    n * (n - 1) / 2
}
