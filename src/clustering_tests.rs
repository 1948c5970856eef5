//! End-to-end tests: driver, linkage family, and quality measures
//! working against each other.

use crate::cluster::{AgglomerativeClustering, Linkage};
use crate::dendrogram::Dendrogram;
use crate::metrics::{
    cophenetic_correlation, degree_of_connectivity, normalized_mean_absolute_error,
    normalized_mean_squared_error, tree_balance,
};
use crate::proximity::{ProximityType, SymmetricMatrix};
use crate::ultrametric::{is_ultrametric, ultrametric_matrix};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_distances(n: usize, seed: u64) -> SymmetricMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut m = SymmetricMatrix::new(n).unwrap();
    for i in 0..n {
        for j in 0..i {
            m.set(i, j, rng.gen_range(1.0..10.0));
        }
    }
    m
}

fn labels(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("item{i}")).collect()
}

fn assert_monotone(tree: &Dendrogram, proximity_type: ProximityType) {
    for node in tree.nodes() {
        if node.is_leaf() {
            continue;
        }
        for &child_id in node.children() {
            let child = tree.node(child_id);
            if child.is_leaf() {
                continue;
            }
            match proximity_type {
                ProximityType::Distance => {
                    assert!(
                        node.bottom_height() >= child.bottom_height() - 1e-9,
                        "merge heights must not decrease toward the root"
                    );
                }
                ProximityType::Similarity => {
                    assert!(
                        node.bottom_height() <= child.bottom_height() + 1e-9,
                        "merge heights must not increase toward the root"
                    );
                }
            }
        }
    }
}

fn assert_same_tree(a: &Dendrogram, b: &Dendrogram) {
    assert_eq!(a.len(), b.len());
    assert_eq!(a.root(), b.root());
    for (x, y) in a.nodes().zip(b.nodes()) {
        assert_eq!(x.id(), y.id());
        assert_eq!(x.children(), y.children());
        if !x.is_leaf() {
            assert_eq!(x.bottom_height(), y.bottom_height());
            assert_eq!(x.top_height(), y.top_height());
        }
    }
}

#[test]
fn test_terminates_with_one_root_covering_all_leaves() {
    for n in [2usize, 3, 7, 20] {
        let m = random_distances(n, 7 + n as u64);
        let tree = AgglomerativeClustering::new(Linkage::Single)
            .build(&m, &labels(n))
            .unwrap();
        let root = tree.node(tree.root());
        assert_eq!(root.num_leaves(), n);
        // Every round creates at least one merge node, binary at worst,
        // so the arena can never exceed 2n - 1 nodes.
        assert!(tree.len() <= 2 * n - 1);
        let mut seen: Vec<bool> = vec![false; n];
        for &leaf in root.leaves() {
            seen[leaf] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}

#[test]
fn test_building_twice_gives_the_same_tree() {
    let m = random_distances(12, 99);
    let clusterer = AgglomerativeClustering::new(Linkage::arithmetic(false));
    let first = clusterer.build(&m, &labels(12)).unwrap();
    let second = clusterer.build(&m, &labels(12)).unwrap();
    assert_same_tree(&first, &second);
}

#[test]
fn test_leaf_labels_follow_matrix_rows() {
    let m = random_distances(4, 5);
    let tree = AgglomerativeClustering::new(Linkage::Single)
        .build(&m, &["w", "x", "y", "z"])
        .unwrap();
    assert_eq!(tree.node(0).label(), Some("w"));
    assert_eq!(tree.node(3).label(), Some("z"));
    assert_eq!(tree.node(tree.root()).label(), None);
}

#[test]
fn test_merge_heights_are_monotone_for_mean_family() {
    for (seed, linkage) in [
        (11, Linkage::Single),
        (12, Linkage::complete()),
        (13, Linkage::arithmetic(false)),
        (14, Linkage::arithmetic(true)),
    ] {
        let m = random_distances(15, seed);
        let tree = AgglomerativeClustering::new(linkage)
            .build(&m, &labels(15))
            .unwrap();
        assert_monotone(&tree, ProximityType::Distance);
    }
}

#[test]
fn test_similarity_heights_fall_toward_the_root() {
    let mut rng = StdRng::seed_from_u64(21);
    let mut m = SymmetricMatrix::new(10).unwrap();
    for i in 0..10 {
        for j in 0..i {
            m.set(i, j, rng.gen_range(0.0..1.0));
        }
    }
    let tree = AgglomerativeClustering::new(Linkage::Single)
        .with_proximity_type(ProximityType::Similarity)
        .build(&m, &labels(10))
        .unwrap();
    assert_monotone(&tree, ProximityType::Similarity);
}

#[test]
fn test_reconstruction_is_always_ultrametric_for_mean_family() {
    for (seed, linkage) in [
        (31, Linkage::Single),
        (32, Linkage::complete()),
        (33, Linkage::arithmetic(false)),
    ] {
        let m = random_distances(10, seed);
        let tree = AgglomerativeClustering::new(linkage)
            .build(&m, &labels(10))
            .unwrap();
        let u = ultrametric_matrix(&tree);
        assert!(is_ultrametric(&u, 1e-9));
    }
}

#[test]
fn test_quality_measures_stay_in_range() {
    let m = random_distances(12, 41);
    for linkage in [
        Linkage::Single,
        Linkage::complete(),
        Linkage::arithmetic(false),
        Linkage::harmonic(false),
        Linkage::Centroid { weighted: false },
        Linkage::BetaFlexible {
            weighted: false,
            beta: -0.25,
        },
    ] {
        let tree = AgglomerativeClustering::new(linkage)
            .build(&m, &labels(12))
            .unwrap();
        let u = ultrametric_matrix(&tree);

        let cc = cophenetic_correlation(&m, &u);
        assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&cc));
        assert!(normalized_mean_squared_error(&m, &u) >= 0.0);
        assert!(normalized_mean_absolute_error(&m, &u) >= 0.0);
        let connectivity = degree_of_connectivity(&m, &u, ProximityType::Distance);
        assert!((0.0..=1.0).contains(&connectivity));
        let balance = tree_balance(&tree);
        assert!((0.0..=1.0).contains(&balance));
    }
}

#[test]
fn test_weighted_and_unweighted_means_diverge_on_uneven_clusters() {
    // {0,1} fuses at 1, then absorbs 2 at 3; the final merge against 3
    // sees subroots carrying 2 and 1 leaves. Counting subroots equally
    // (weighted) gives (8 + 9) / 2; counting leaves (unweighted) gives
    // (2*8 + 9) / 3.
    let m = SymmetricMatrix::from_rows(&[
        vec![0.0, 1.0, 2.0, 8.0],
        vec![1.0, 0.0, 4.0, 8.0],
        vec![2.0, 4.0, 0.0, 9.0],
        vec![8.0, 8.0, 9.0, 0.0],
    ])
    .unwrap();
    let names = ["a", "b", "c", "d"];

    let unweighted = AgglomerativeClustering::new(Linkage::arithmetic(false))
        .build(&m, &names)
        .unwrap();
    let weighted = AgglomerativeClustering::new(Linkage::arithmetic(true))
        .build(&m, &names)
        .unwrap();

    let u_root = unweighted.node(unweighted.root()).bottom_height();
    let w_root = weighted.node(weighted.root()).bottom_height();
    assert!((u_root - 25.0 / 3.0).abs() < 1e-12);
    assert!((w_root - 8.5).abs() < 1e-12);
}

#[test]
fn test_full_tie_collapses_in_one_round_for_every_linkage() {
    let m = SymmetricMatrix::from_rows(&[
        vec![0.0, 2.0, 2.0, 2.0, 2.0],
        vec![2.0, 0.0, 2.0, 2.0, 2.0],
        vec![2.0, 2.0, 0.0, 2.0, 2.0],
        vec![2.0, 2.0, 2.0, 0.0, 2.0],
        vec![2.0, 2.0, 2.0, 2.0, 0.0],
    ])
    .unwrap();
    for linkage in [
        Linkage::Single,
        Linkage::complete(),
        Linkage::geometric(false),
        Linkage::Centroid { weighted: true },
        Linkage::BetaFlexible {
            weighted: true,
            beta: 0.5,
        },
    ] {
        let tree = AgglomerativeClustering::new(linkage)
            .build(&m, &labels(5))
            .unwrap();
        let root = tree.node(tree.root());
        assert_eq!(root.children(), &[0, 1, 2, 3, 4]);
        assert_eq!(root.bottom_height(), 2.0);
        assert!((tree_balance(&tree) - 1.0).abs() < 1e-12);
    }
}

#[test]
fn test_centroid_weighted_and_unweighted_recurrences() {
    // After {0,1} fuses at 1, its centroid proximity to 2 subtracts the
    // intra spread: (2 + 4) / 2 - 1/4 * 1 = 2.75 with singleton subroots
    // either way.
    let m = SymmetricMatrix::from_rows(&[
        vec![0.0, 1.0, 2.0],
        vec![1.0, 0.0, 4.0],
        vec![2.0, 4.0, 0.0],
    ])
    .unwrap();
    for weighted in [false, true] {
        let tree = AgglomerativeClustering::new(Linkage::Centroid { weighted })
            .build(&m, &["a", "b", "c"])
            .unwrap();
        let root = tree.node(tree.root());
        assert!((root.bottom_height() - 2.75).abs() < 1e-12);
    }
}

#[test]
fn test_band_heights_surface_through_the_root() {
    // One k-ary junction with spread 1.04..9.0; the root exposes the band
    // extremes for axis scaling.
    let m = SymmetricMatrix::from_rows(&[
        vec![0.0, 1.04, 1.045],
        vec![1.04, 0.0, 9.0],
        vec![1.045, 9.0, 0.0],
    ])
    .unwrap();
    let tree = AgglomerativeClustering::new(Linkage::Single)
        .with_precision(1)
        .build(&m, &["a", "b", "c"])
        .unwrap();
    let root = tree.node(tree.root());
    assert_eq!(root.nodes_min_height(), 1.04);
    assert_eq!(root.nodes_max_height(), 1.04);
    assert_eq!(root.bands_min_height(), 9.0);
    assert_eq!(root.bands_max_height(), 9.0);
    assert_eq!(root.internal_height(), 1.04);
}
