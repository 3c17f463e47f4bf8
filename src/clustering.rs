//! # Proximity Clustering
//!
//! Groups the pairs of one distributor into connected components: outlets
//! that are transitively close end up in the same [`ProximityCluster`].
//!
//! Components are ordered by the first appearance of any member in the pair
//! list (outlet 1 then outlet 2 of each pair), members are sorted
//! case-insensitively, and numbering starts at 1.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::proximity::ProximityPair;

/// Outlets of one distributor connected through below-threshold pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ProximityCluster {
    /// 1-based position within the distributor.
    pub number: usize,
    pub distributor_id: String,
    pub distributor_name: String,
    /// Sorted case-insensitively. A single outlet only when its name is
    /// paired with itself (listed twice in the distributor).
    pub outlets: Vec<String>,
}

impl ProximityCluster {
    pub fn len(&self) -> usize {
        self.outlets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outlets.is_empty()
    }
}

/// Disjoint-set forest over vertex indices, with path compression and
/// union by rank.
#[derive(Debug)]
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect(), rank: vec![0; n] }
    }

    fn find(&mut self, x: usize) -> usize {
        let p = self.parent[x];
        if p != x {
            let root = self.find(p);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] = self.rank[ra].saturating_add(1);
            }
        }
    }
}

fn intern<'a>(name: &'a str, position: &mut HashMap<&'a str, usize>, vertices: &mut Vec<&'a str>) -> usize {
    *position.entry(name).or_insert_with(|| {
        vertices.push(name);
        vertices.len() - 1
    })
}

/// Cluster the pairs of one distributor.
///
/// Pairs of other distributors must not be mixed in; the pipeline calls this
/// once per group.
///
/// # Example
///
/// ```rust
/// use outlet_proximity::{cluster_pairs, ProximityPair};
///
/// let pair = |a: &str, b: &str| ProximityPair {
///     outlet_1: a.into(),
///     outlet_2: b.into(),
///     distributor_id: "1001".into(),
///     distributor_name: "PT. A".into(),
///     distance_meters: 10.0,
///     lag: 1,
/// };
///
/// let clusters = cluster_pairs("1001", "PT. A", &[pair("A", "B"), pair("B", "C"), pair("D", "E")]);
/// assert_eq!(clusters.len(), 2);
/// assert_eq!(clusters[0].outlets, vec!["A", "B", "C"]);
/// assert_eq!(clusters[1].number, 2);
/// ```
pub fn cluster_pairs(distributor_id: &str, distributor_name: &str, pairs: &[ProximityPair]) -> Vec<ProximityCluster> {
    // Intern vertices in insertion order
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut vertices: Vec<&str> = Vec::new();
    let mut edges = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let a = intern(&pair.outlet_1, &mut position, &mut vertices);
        let b = intern(&pair.outlet_2, &mut position, &mut vertices);
        edges.push((a, b));
    }

    let mut uf = UnionFind::new(vertices.len());
    for (a, b) in edges {
        uf.union(a, b);
    }

    // Components in order of their first vertex
    let mut component_of_root: HashMap<usize, usize> = HashMap::new();
    let mut components: Vec<Vec<&str>> = Vec::new();
    for (vertex, name) in vertices.iter().enumerate() {
        let root = uf.find(vertex);
        let slot = *component_of_root.entry(root).or_insert_with(|| {
            components.push(Vec::new());
            components.len() - 1
        });
        components[slot].push(*name);
    }

    let mut used: HashSet<&str> = HashSet::new();
    let mut clusters = Vec::new();
    for mut members in components {
        // Every vertex comes from a pair, so a lone member is a self-pair
        if members.iter().any(|m| used.contains(m)) {
            continue;
        }
        used.extend(members.iter().copied());
        members.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
        clusters.push(ProximityCluster {
            number: clusters.len() + 1,
            distributor_id: distributor_id.to_string(),
            distributor_name: distributor_name.to_string(),
            outlets: members.into_iter().map(str::to_string).collect(),
        });
    }

    debug!(
        "[Clustering] {}: {} pairs -> {} clusters",
        distributor_id,
        pairs.len(),
        clusters.len()
    );

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: &str, b: &str) -> ProximityPair {
        ProximityPair {
            outlet_1: a.to_string(),
            outlet_2: b.to_string(),
            distributor_id: "1".to_string(),
            distributor_name: "A".to_string(),
            distance_meters: 10.0,
            lag: 1,
        }
    }

    fn outlets(clusters: &[ProximityCluster]) -> Vec<Vec<&str>> {
        clusters.iter().map(|c| c.outlets.iter().map(String::as_str).collect()).collect()
    }

    #[test]
    fn test_transitive_components() {
        let clusters = cluster_pairs("1", "A", &[pair("A", "B"), pair("B", "C"), pair("D", "E")]);
        assert_eq!(outlets(&clusters), vec![vec!["A", "B", "C"], vec!["D", "E"]]);
        assert_eq!(clusters[0].number, 1);
        assert_eq!(clusters[1].number, 2);
    }

    #[test]
    fn test_component_order_follows_first_vertex() {
        // D-E appears first; C later joins A-B through B
        let clusters = cluster_pairs("1", "A", &[pair("E", "D"), pair("B", "A"), pair("C", "B")]);
        assert_eq!(outlets(&clusters), vec![vec!["D", "E"], vec!["A", "B", "C"]]);
    }

    #[test]
    fn test_members_sorted_case_insensitively() {
        let clusters = cluster_pairs("1", "A", &[pair("beta", "Alpha"), pair("alpha", "Beta"), pair("Alpha", "alpha")]);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].outlets, vec!["Alpha", "alpha", "Beta", "beta"]);
    }

    #[test]
    fn test_merging_later_edges() {
        // Two components that only merge with the last pair
        let clusters = cluster_pairs("1", "A", &[pair("A", "B"), pair("C", "D"), pair("B", "C")]);
        assert_eq!(outlets(&clusters), vec![vec!["A", "B", "C", "D"]]);
    }

    #[test]
    fn test_no_pairs_no_clusters() {
        assert!(cluster_pairs("1", "A", &[]).is_empty());
    }

    #[test]
    fn test_self_pair_forms_single_outlet_cluster() {
        // Two rows with the same outlet name
        let clusters = cluster_pairs("1", "A", &[pair("X", "X")]);
        assert_eq!(outlets(&clusters), vec![vec!["X"]]);
        assert_eq!(clusters[0].number, 1);
    }

    #[test]
    fn test_self_pair_joins_neighbours() {
        let clusters = cluster_pairs("1", "A", &[pair("X", "X"), pair("Y", "X"), pair("Z", "Z")]);
        assert_eq!(outlets(&clusters), vec![vec!["X", "Y"], vec!["Z"]]);
        assert_eq!(clusters[1].number, 2);
    }

    #[test]
    fn test_each_outlet_in_one_cluster() {
        let pairs = [pair("A", "B"), pair("C", "D"), pair("E", "A"), pair("F", "G"), pair("D", "H")];
        let clusters = cluster_pairs("1", "A", &pairs);
        let mut all: Vec<&str> = clusters.iter().flat_map(|c| c.outlets.iter().map(String::as_str)).collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total);
        assert_eq!(total, 8);
    }
}
