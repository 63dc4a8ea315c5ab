// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Directory interning, a weighted undirected co-change graph, and PageRank over it
// role: preprocessor support / graph
// outputs: DirInterner, CoChangeGraph, pagerank()
// invariants:
// - edge weight keys on (min_id, max_id); no self-edges
// - pagerank output sums to 1 over present nodes; empty graph yields an empty map
// - dangling nodes redistribute their mass uniformly across all nodes
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::HashMap;

use rayon::prelude::*;

/// Interns directory names to small dense ids, in first-seen order.
#[derive(Debug, Default, Clone)]
pub struct DirInterner {
  ids: HashMap<String, u32>,
  names: Vec<String>,
}

impl DirInterner {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn intern(&mut self, name: &str) -> u32 {
    if let Some(id) = self.ids.get(name) {
      return *id;
    }

    let id = self.names.len() as u32;
    self.names.push(name.to_string());
    self.ids.insert(name.to_string(), id);
    id
  }

  pub fn get(&self, name: &str) -> Option<u32> {
    self.ids.get(name).copied()
  }

  pub fn name(&self, id: u32) -> &str {
    &self.names[id as usize]
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}

/// A weighted undirected graph over interned directory ids, stored as an
/// adjacency list. Built incrementally via `add_weight`, then frozen by
/// `finalize(min_churn_for_edge)` which drops sub-threshold edges.
#[derive(Debug, Default, Clone)]
pub struct CoChangeGraph {
  num_nodes: usize,
  // keyed by (min, max)
  weights: HashMap<(u32, u32), f64>,
}

impl CoChangeGraph {
  pub fn new(num_nodes: usize) -> Self {
    Self {
      num_nodes,
      weights: HashMap::new(),
    }
  }

  pub fn add_weight(&mut self, a: u32, b: u32, amount: f64) {
    if a == b {
      return;
    }

    let key = if a < b { (a, b) } else { (b, a) };
    *self.weights.entry(key).or_insert(0.0) += amount;
  }

  /// Drop edges whose accumulated weight is below `min_churn_for_edge` and build
  /// an adjacency list restricted to nodes that still have at least one edge.
  pub fn finalize(&self, min_churn_for_edge: f64) -> Adjacency {
    let mut adjacency: Vec<Vec<(u32, f64)>> = vec![Vec::new(); self.num_nodes];
    let mut present = vec![false; self.num_nodes];

    let mut edges: Vec<((u32, u32), f64)> = self
      .weights
      .iter()
      .filter(|(_, w)| **w >= min_churn_for_edge)
      .map(|(k, w)| (*k, *w))
      .collect();
    edges.sort_by_key(|(k, _)| *k);

    for ((a, b), w) in edges {
      adjacency[a as usize].push((b, w));
      adjacency[b as usize].push((a, w));
      present[a as usize] = true;
      present[b as usize] = true;
    }

    Adjacency { adjacency, present }
  }
}

/// Finalized adjacency list ready for PageRank.
pub struct Adjacency {
  adjacency: Vec<Vec<(u32, f64)>>,
  present: Vec<bool>,
}

impl Adjacency {
  pub fn node_count(&self) -> usize {
    self.adjacency.len()
  }

  pub fn has_any_node(&self) -> bool {
    self.present.iter().any(|p| *p)
  }
}

/// Weighted power-iteration PageRank.
///
/// Dangling nodes (present in the graph but with no outgoing weight — never
/// happens here since every edge is bidirectional, but handled regardless)
/// redistribute their mass uniformly. The per-node push/pull update may run in
/// parallel; the convergence check and final normalization
/// always run sequentially.
pub fn pagerank(adj: &Adjacency, damping: f64, max_iter: usize, tol: f64) -> Vec<f64> {
  let n = adj.node_count();

  if n == 0 || !adj.has_any_node() {
    return Vec::new();
  }

  let present_count = adj.present.iter().filter(|p| **p).count();
  let base = (1.0 - damping) / present_count as f64;

  let out_weight: Vec<f64> = adj
    .adjacency
    .iter()
    .map(|edges| edges.iter().map(|(_, w)| w).sum())
    .collect();

  let mut rank = vec![0.0; n];
  for (i, r) in rank.iter_mut().enumerate() {
    if adj.present[i] {
      *r = 1.0 / present_count as f64;
    }
  }

  for _ in 0..max_iter {
    let dangling_mass: f64 = (0..n)
      .filter(|&i| adj.present[i] && out_weight[i] == 0.0)
      .map(|i| rank[i])
      .sum();
    let dangling_share = damping * dangling_mass / present_count as f64;

    let next: Vec<f64> = (0..n)
      .into_par_iter()
      .map(|i| {
        if !adj.present[i] {
          return 0.0;
        }

        let incoming: f64 = adj.adjacency[i]
          .iter()
          .map(|(src, w)| {
            if out_weight[*src as usize] > 0.0 {
              rank[*src as usize] * w / out_weight[*src as usize]
            } else {
              0.0
            }
          })
          .sum();

        base + dangling_share + damping * incoming
      })
      .collect();

    let delta: f64 = rank.iter().zip(next.iter()).map(|(a, b)| (a - b).abs()).sum();
    rank = next;

    if delta < tol {
      break;
    }
  }

  let total: f64 = rank.iter().sum();
  if total > 0.0 {
    for r in rank.iter_mut() {
      *r /= total;
    }
  }

  rank
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn interner_assigns_dense_ids_in_first_seen_order() {
    let mut interner = DirInterner::new();
    assert_eq!(interner.intern("src"), 0);
    assert_eq!(interner.intern("docs"), 1);
    assert_eq!(interner.intern("src"), 0);
    assert_eq!(interner.len(), 2);
  }

  #[test]
  fn finalize_drops_edges_below_threshold() {
    let mut g = CoChangeGraph::new(2);
    g.add_weight(0, 1, 1.0);
    let adj = g.finalize(2.0);
    assert!(!adj.has_any_node());
  }

  #[test]
  fn pagerank_sums_to_one_over_present_nodes() {
    let mut g = CoChangeGraph::new(3);
    g.add_weight(0, 1, 10.0);
    g.add_weight(1, 2, 5.0);
    let adj = g.finalize(2.0);
    let ranks = pagerank(&adj, 0.85, 100, 1e-6);
    let sum: f64 = ranks.iter().sum();
    assert!((sum - 1.0).abs() < 1e-6);
  }

  #[test]
  fn pagerank_empty_graph_is_empty() {
    let g = CoChangeGraph::new(0);
    let adj = g.finalize(2.0);
    assert!(pagerank(&adj, 0.85, 100, 1e-6).is_empty());
  }
}
