// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Torque Clusterer (C1): partition a chronologically sorted commit stream into work-session batches
// role: pipeline stage / C1
// inputs: commits (any order), ClusterConfig
// outputs: dense batch_id per commit, in the caller's original indexing
// invariants:
// - batch_id values are a contiguous range [0, K-1]; within a batch, chronological indices are contiguous
// - ties in commit_ts_utc break by original input order (stable sort)
// - deterministic: same input + config always yields the same assignment
// errors: InvalidConfig for negative weights or non-positive gap
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use crate::error::{Error, Result};
use crate::model::Commit;

/// Forward-scan Torque Clusterer configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterConfig {
  pub alpha: f64,
  pub beta: f64,
  pub gap: f64,
  pub break_on_merge: bool,
  pub break_on_author: bool,
}

impl Default for ClusterConfig {
  fn default() -> Self {
    Self {
      alpha: 1.0,
      beta: 0.0,
      gap: 1800.0,
      break_on_merge: false,
      break_on_author: false,
    }
  }
}

fn validate(cfg: &ClusterConfig) -> Result<()> {
  if cfg.alpha < 0.0 || cfg.beta < 0.0 {
    return Err(Error::InvalidConfig("alpha and beta must be >= 0".into()));
  }
  if cfg.gap <= 0.0 {
    return Err(Error::InvalidConfig("gap must be > 0".into()));
  }
  Ok(())
}

/// Stable chronological order of commit indices: sort by `commit_ts_utc`, ties
/// broken by original input position.
pub fn chronological_order(commits: &[Commit]) -> Vec<usize> {
  let mut order: Vec<usize> = (0..commits.len()).collect();
  order.sort_by(|&a, &b| {
    commits[a]
      .commit_ts_utc
      .cmp(&commits[b].commit_ts_utc)
      .then(a.cmp(&b))
  });
  order
}

/// Partition `commits` into batches via the single-pass forward scan. Returns a
/// `batch_id` per commit indexed the same way as `commits` (not the
/// chronological order).
pub fn cluster(commits: &[Commit], cfg: &ClusterConfig) -> Result<Vec<u32>> {
  validate(cfg)?;

  if commits.is_empty() {
    return Ok(Vec::new());
  }

  let order = chronological_order(commits);
  let mut batch_id_by_original = vec![0u32; commits.len()];

  let mut current_batch: u32 = 0;
  batch_id_by_original[order[0]] = current_batch;

  for w in order.windows(2) {
    let (prev_idx, cur_idx) = (w[0], w[1]);
    let prev = &commits[prev_idx];
    let cur = &commits[cur_idx];

    let dt = (cur.commit_ts_utc - prev.commit_ts_utc) as f64;
    let dloc = (cur.insertions as f64 - prev.insertions as f64).abs()
      + (cur.deletions as f64 - prev.deletions as f64).abs();
    let d = cfg.alpha * dt + cfg.beta * dloc;

    let breaks = d >= cfg.gap
      || (cfg.break_on_merge && cur.is_merge)
      || (cfg.break_on_author && cur.author_email != prev.author_email);

    if breaks {
      current_batch += 1;
    }

    batch_id_by_original[cur_idx] = current_batch;
  }

  Ok(batch_id_by_original)
}

/// Configuration for the hierarchical torque-gap variant kept for parity work
/// Not used by `run_all`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HierarchicalClusterConfig {
  /// Weights for (elapsed seconds since previous commit, |insertion delta| +
  /// |deletion delta|, constant bias dimension). `None` computes them as the
  /// inverse variance of each feature, matching `auto_feature_weights`.
  pub feature_weights: Option<[f64; 3]>,
}

struct UnionFind {
  parent: Vec<usize>,
}

impl UnionFind {
  fn new(n: usize) -> Self {
    Self {
      parent: (0..n).collect(),
    }
  }

  fn find(&mut self, a: usize) -> usize {
    if self.parent[a] != a {
      self.parent[a] = self.find(self.parent[a]);
    }
    self.parent[a]
  }

  fn union(&mut self, a: usize, b: usize) {
    let (ra, rb) = (self.find(a), self.find(b));
    if ra != rb {
      self.parent[ra] = rb;
    }
  }
}

/// Hierarchical nearest-neighbor merge by mass-weighted squared distance
/// ("torque"), cutting at the largest relative gap in the sorted merge-torque
/// sequence. Grounded on `utils/custom_torque_clustering.py`.
pub fn cluster_hierarchical(commits: &[Commit], cfg: &HierarchicalClusterConfig) -> Result<Vec<u32>> {
  if commits.is_empty() {
    return Ok(Vec::new());
  }
  if commits.len() == 1 {
    return Ok(vec![0]);
  }

  let order = chronological_order(commits);
  let n = order.len();

  // feature space: (dt since previous commit in sorted order, |ins delta| + |del delta|, 1.0)
  let mut features: Vec<[f64; 3]> = Vec::with_capacity(n);
  for (i, &idx) in order.iter().enumerate() {
    if i == 0 {
      features.push([0.0, 0.0, 1.0]);
      continue;
    }
    let prev = &commits[order[i - 1]];
    let cur = &commits[idx];
    let dt = (cur.commit_ts_utc - prev.commit_ts_utc) as f64;
    let dloc =
      (cur.insertions as f64 - prev.insertions as f64).abs() + (cur.deletions as f64 - prev.deletions as f64).abs();
    features.push([dt, dloc, 1.0]);
  }

  let weights = cfg.feature_weights.unwrap_or_else(|| auto_feature_weights(&features));

  let mut cluster_id: Vec<usize> = (0..n).collect();
  let mut center: Vec<[f64; 3]> = features.clone();
  let mut mass: Vec<f64> = vec![1.0; n];
  let mut connections: Vec<(f64, usize, usize)> = Vec::new();

  loop {
    let active: Vec<usize> = cluster_id.clone();
    if active.len() <= 1 {
      break;
    }

    let mut directed_edges: Vec<(usize, usize)> = Vec::new();
    for (pos, &cid) in active.iter().enumerate() {
      let mut best: Option<(usize, f64)> = None;
      for (opos, &oid) in active.iter().enumerate() {
        if opos == pos {
          continue;
        }
        let d = weighted_sq_dist(&center[cid], &center[oid], &weights);
        if best.is_none() || d < best.unwrap().1 {
          best = Some((oid, d));
        }
      }
      if let Some((nbr, _)) = best {
        if mass[cid] <= mass[nbr] {
          directed_edges.push((cid, nbr));
        }
      }
    }

    if directed_edges.is_empty() {
      break;
    }

    let mut uf = UnionFind::new(center.len());
    for &(cid, nid) in &directed_edges {
      let m_val = mass[cid] * mass[nid];
      let dist_sq = weighted_sq_dist(&center[cid], &center[nid], &weights);
      connections.push((m_val * dist_sq, cid, nid));
      uf.union(cid, nid);
    }

    let mut new_center: std::collections::HashMap<usize, [f64; 3]> = std::collections::HashMap::new();
    let mut new_mass: std::collections::HashMap<usize, f64> = std::collections::HashMap::new();
    for &cid in &active {
      let root = uf.find(cid);
      let entry = new_center.entry(root).or_insert([0.0; 3]);
      for k in 0..3 {
        entry[k] += center[cid][k] * mass[cid];
      }
      *new_mass.entry(root).or_insert(0.0) += mass[cid];
    }
    for (root, c) in new_center.iter_mut() {
      let m = new_mass[root];
      for v in c.iter_mut() {
        *v /= m;
      }
    }

    cluster_id = new_center.keys().copied().collect();
    cluster_id.sort_unstable();
    for &root in &cluster_id {
      center.resize(center.len().max(root + 1), [0.0; 3]);
      mass.resize(mass.len().max(root + 1), 0.0);
      center[root] = new_center[&root];
      mass[root] = new_mass[&root];
    }
  }

  if connections.is_empty() {
    // No merges at all: every commit is its own batch, in chronological order.
    let mut out = vec![0u32; n];
    for (rank, &idx) in order.iter().enumerate() {
      out[idx] = rank as u32;
    }
    return Ok(out);
  }

  connections.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());
  let tau: Vec<f64> = connections.iter().map(|c| c.0).collect();
  let mut best_gap = 0.0;
  let mut best_idx = 0usize;
  for j in 0..tau.len().saturating_sub(1) {
    let ratio = if tau[j + 1] != 0.0 { tau[j] / tau[j + 1] } else { f64::INFINITY };
    if ratio > best_gap {
      best_gap = ratio;
      best_idx = j;
    }
  }
  let optimal_clusters = best_idx + 2;
  let merges_to_remove = optimal_clusters.saturating_sub(1);

  let mut uf = UnionFind::new(n);
  for &(_, cid, nid) in connections.iter().skip(merges_to_remove) {
    uf.union(cid, nid);
  }

  let mut labels = vec![0u32; n];
  let mut label_map: std::collections::HashMap<usize, u32> = std::collections::HashMap::new();
  let mut next_label = 0u32;
  for (rank, &idx) in order.iter().enumerate() {
    let root = uf.find(rank);
    let label = *label_map.entry(root).or_insert_with(|| {
      let l = next_label;
      next_label += 1;
      l
    });
    labels[idx] = label;
  }

  Ok(labels)
}

fn auto_feature_weights(features: &[[f64; 3]]) -> [f64; 3] {
  let n = features.len() as f64;
  let mut weights = [0.0; 3];
  for k in 0..3 {
    let mean: f64 = features.iter().map(|f| f[k]).sum::<f64>() / n;
    let var: f64 = features.iter().map(|f| (f[k] - mean).powi(2)).sum::<f64>() / n;
    weights[k] = 1.0 / (var + 1e-8);
  }
  weights
}

fn weighted_sq_dist(a: &[f64; 3], b: &[f64; 3], w: &[f64; 3]) -> f64 {
  (0..3).map(|k| (w[k] * (a[k] - b[k])).powi(2)).sum()
}
