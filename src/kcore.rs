//! k-core decomposition of unipartite graphs.
//!
//! Core numbers are computed with the Batagelj–Zaversnik bucket algorithm:
//! vertices are kept in an array sorted by current degree, with `bin[d]`
//! pointing at the first vertex of degree `d`. Removing the vertex of
//! minimum degree moves each higher-degree neighbor one bucket down by
//! swapping it with the first vertex of its bucket.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::TdtParams;

/// Undirected graph as neighbor sets. Missing reverse edges are implied.
pub type Adjacency = BTreeMap<u32, BTreeSet<u32>>;

/// Core number of every vertex of a graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreDecomposition {
    cores: BTreeMap<u32, usize>,
}

/// Compute the core number of every vertex.
///
/// The adjacency is symmetrized first and self-loops are ignored. Isolated
/// vertices get core number 0.
pub fn core_numbers(adjacency: &Adjacency) -> CoreDecomposition {
    // Arena: vertex ids by index, neighbor lists by index
    let mut ids: BTreeSet<u32> = adjacency.keys().copied().collect();
    for neighbors in adjacency.values() {
        ids.extend(neighbors.iter().copied());
    }
    let ids: Vec<u32> = ids.into_iter().collect();
    let index: BTreeMap<u32, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    let n = ids.len();
    let mut neighbors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    for (v, adjacent) in adjacency {
        let vi = index[v];
        for u in adjacent {
            let ui = index[u];
            if ui != vi {
                neighbors[vi].insert(ui);
                neighbors[ui].insert(vi);
            }
        }
    }

    let mut degree: Vec<usize> = neighbors.iter().map(|n| n.len()).collect();
    let max_degree = degree.iter().copied().max().unwrap_or(0);

    // Bin starts from the degree histogram
    let mut bin = vec![0usize; max_degree + 1];
    for &d in &degree {
        bin[d] += 1;
    }
    let mut start = 0;
    for slot in bin.iter_mut() {
        let count = *slot;
        *slot = start;
        start += count;
    }

    // Place each vertex, then restore the bin starts
    let mut pos = vec![0usize; n];
    let mut vert = vec![0usize; n];
    for v in 0..n {
        pos[v] = bin[degree[v]];
        vert[pos[v]] = v;
        bin[degree[v]] += 1;
    }
    for d in (1..=max_degree).rev() {
        bin[d] = bin[d - 1];
    }
    if let Some(first) = bin.first_mut() {
        *first = 0;
    }

    for i in 0..n {
        let v = vert[i];
        for &u in &neighbors[v] {
            if degree[u] > degree[v] {
                let du = degree[u];
                let pu = pos[u];
                let pw = bin[du];
                let w = vert[pw];
                if u != w {
                    pos[u] = pw;
                    vert[pu] = w;
                    pos[w] = pu;
                    vert[pw] = u;
                }
                bin[du] += 1;
                degree[u] -= 1;
            }
        }
    }

    ids.into_iter().zip(degree).collect()
}

impl FromIterator<(u32, usize)> for CoreDecomposition {
    fn from_iter<I: IntoIterator<Item = (u32, usize)>>(iter: I) -> Self {
        Self {
            cores: iter.into_iter().collect(),
        }
    }
}

impl CoreDecomposition {
    pub fn core(&self, vertex: u32) -> Option<usize> {
        self.cores.get(&vertex).copied()
    }

    pub fn max_core(&self) -> usize {
        self.cores.values().copied().max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.cores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, usize)> + '_ {
        self.cores.iter().map(|(&v, &c)| (v, c))
    }

    /// Vertices whose core number is at least `min`
    pub fn threshold_core(&self, min: usize) -> BTreeSet<u32> {
        self.cores
            .iter()
            .filter(|&(_, &core)| core >= min)
            .map(|(&v, _)| v)
            .collect()
    }

    /// Vertices within `core_number - 1` of the maximum core.
    ///
    /// `core_number = 1` keeps only the innermost core; larger values
    /// relax the threshold.
    pub fn main_core(&self, core_number: usize) -> BTreeSet<u32> {
        let threshold = self
            .max_core()
            .saturating_sub(core_number.saturating_sub(1));
        self.threshold_core(threshold)
    }

    /// Threshold at the first unit gap among the highest core values.
    ///
    /// Distinct core values of at least `floor` are scanned from the top,
    /// at most `max_scan` of them. The upper value of the first adjacent
    /// pair differing by exactly one is returned; otherwise the maximum
    /// core.
    pub fn natural_break(&self, floor: usize, max_scan: usize) -> usize {
        let values: BTreeSet<usize> = self.cores.values().copied().filter(|&c| c >= floor).collect();
        let scanned: Vec<usize> = values.into_iter().rev().take(max_scan).collect();

        scanned
            .windows(2)
            .find(|pair| pair[0] - pair[1] == 1)
            .map(|pair| pair[0])
            .unwrap_or_else(|| self.max_core())
    }

    /// Core of a facet graph, cut at the natural break
    pub fn facet_core(&self, floor: usize, max_scan: usize) -> BTreeSet<u32> {
        self.threshold_core(self.natural_break(floor, max_scan))
    }
}

/// Core of a facet graph, cut at the natural break configured by
/// `facet_core_floor` and `facet_core_scan`.
pub fn facet_core(adjacency: &Adjacency, params: &TdtParams) -> BTreeSet<u32> {
    core_numbers(adjacency).facet_core(params.facet_core_floor, params.facet_core_scan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(u32, u32)]) -> Adjacency {
        let mut adjacency = Adjacency::new();
        for &(a, b) in edges {
            adjacency.entry(a).or_default().insert(b);
        }
        adjacency
    }

    fn all_cores(decomposition: &CoreDecomposition) -> Vec<usize> {
        decomposition.iter().map(|(_, c)| c).collect()
    }

    #[test]
    fn test_cycle_is_two_core() {
        let cores = core_numbers(&graph(&[(1, 2), (2, 3), (3, 4), (4, 5), (5, 1)]));
        assert_eq!(all_cores(&cores), vec![2; 5]);
    }

    #[test]
    fn test_star_is_one_core() {
        let cores = core_numbers(&graph(&[(1, 2), (1, 3), (1, 4), (1, 5)]));
        assert_eq!(cores.len(), 5);
        assert_eq!(all_cores(&cores), vec![1; 5]);
    }

    #[test]
    fn test_triangle_with_tail() {
        let cores = core_numbers(&graph(&[(1, 2), (2, 3), (3, 1), (3, 4), (4, 5)]));
        assert_eq!(cores.core(1), Some(2));
        assert_eq!(cores.core(3), Some(2));
        assert_eq!(cores.core(4), Some(1));
        assert_eq!(cores.core(5), Some(1));
        assert_eq!(cores.max_core(), 2);
    }

    #[test]
    fn test_clique_and_isolated_vertex() {
        let mut adjacency = graph(&[(1, 2), (1, 3), (1, 4), (2, 3), (2, 4), (3, 4)]);
        adjacency.insert(9, BTreeSet::new());
        adjacency.entry(5).or_default().insert(5);

        let cores = core_numbers(&adjacency);
        for v in 1..=4 {
            assert_eq!(cores.core(v), Some(3));
        }
        assert_eq!(cores.core(9), Some(0));
        assert_eq!(cores.core(5), Some(0));
        assert_eq!(cores.core(6), None);
    }

    #[test]
    fn test_main_core_monotone() {
        let cores = core_numbers(&graph(&[
            (1, 2),
            (1, 3),
            (1, 4),
            (2, 3),
            (2, 4),
            (3, 4),
            (4, 5),
            (5, 6),
            (6, 4),
            (6, 7),
        ]));

        let k1 = cores.main_core(1);
        let k2 = cores.main_core(2);
        let k3 = cores.main_core(3);
        assert_eq!(k1.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert!(k1.is_subset(&k2));
        assert!(k2.is_subset(&k3));
        assert_eq!(k3.len(), 7);
        assert_eq!(cores.main_core(0), k1);
    }

    #[test]
    fn test_natural_break() {
        let cores: CoreDecomposition =
            [(1, 15), (2, 12), (3, 11), (4, 11), (5, 8), (6, 3)].into_iter().collect();
        // Scan 15, 12, 11: the first unit gap is 12 -> 11
        assert_eq!(cores.natural_break(10, 5), 12);
        assert_eq!(
            cores.facet_core(10, 5).into_iter().collect::<Vec<_>>(),
            vec![1, 2]
        );
        // Only 15 and 12 scanned: no unit gap
        assert_eq!(cores.natural_break(10, 2), 15);
    }

    fn clique(vertices: &[u32]) -> Vec<(u32, u32)> {
        let mut edges = Vec::new();
        for (i, &a) in vertices.iter().enumerate() {
            for &b in &vertices[i + 1..] {
                edges.push((a, b));
            }
        }
        edges
    }

    #[test]
    fn test_facet_core_reads_params() {
        // Cores 5 (K6), 3 (K4) and 2 (triangle)
        let mut edges = clique(&[10, 11, 12, 13, 14, 15]);
        edges.extend(clique(&[1, 2, 3, 4]));
        edges.extend(clique(&[20, 21, 22]));
        let adjacency = graph(&edges);

        let wide = TdtParams {
            facet_core_floor: 1,
            facet_core_scan: 5,
            ..Default::default()
        };
        // 5 -> 3 is not a unit gap, 3 -> 2 is
        let core = facet_core(&adjacency, &wide);
        assert_eq!(core.len(), 10);
        assert!(core.contains(&1) && core.contains(&15));
        assert!(!core.contains(&20));

        let narrow = TdtParams {
            facet_core_scan: 2,
            ..wide
        };
        let core = facet_core(&adjacency, &narrow);
        assert_eq!(core.into_iter().collect::<Vec<_>>(), vec![10, 11, 12, 13, 14, 15]);

        // No core reaches the default floor of 10: fall back to the maximum
        assert_eq!(facet_core(&adjacency, &TdtParams::default()).len(), 6);
    }

    #[test]
    fn test_natural_break_falls_back_to_max() {
        let cores: CoreDecomposition = [(1, 4), (2, 3), (3, 2)].into_iter().collect();
        assert_eq!(cores.natural_break(10, 5), 4);
        assert_eq!(cores.natural_break(2, 5), 4);
        assert_eq!(CoreDecomposition::default().natural_break(10, 5), 0);
    }

    #[test]
    fn test_empty_graph() {
        let cores = core_numbers(&Adjacency::new());
        assert!(cores.is_empty());
        assert_eq!(cores.max_core(), 0);
        assert!(cores.main_core(2).is_empty());
    }
}
