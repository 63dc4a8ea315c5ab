// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Effort Scorer (C3): per-commit six-dimension effort vector, MAD-Z normalized, weighted into a scalar effort
// role: pipeline stage / C3
// inputs: enriched commits (C2 output) plus their batch_id, EffortConfig
// outputs: Vec<EffortVector>, one entry per commit in input order
// invariants:
// - share is a raw fraction in [0, 1], never z-scored (it already measures relative batch weight)
// - scale/reach/centrality/dominance/novelty/speed are MAD-Z normalized across the commits of batches
//   that meet min_batch_size, not per batch
// - batches smaller than min_batch_size are excluded from normalization; their commits get all-zero vectors
// - raw per-batch computation may run in parallel; normalization and the weighted sum are sequential
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::model::{EffortVector, EnrichedCommit};
use crate::stats::{entropy, mad_z, safe_log};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffortConfig {
  /// Cap applied to novelty_raw before normalization.
  pub novelty_cap: f64,
  /// Half-life, in hours, used by the speed dimension's exponential decay.
  pub speed_half_life_hours: f64,
  /// Batches with fewer commits than this are excluded entirely (all-zero vectors).
  pub min_batch_size: usize,
  pub share_weight: f64,
  pub scale_weight: f64,
  pub reach_weight: f64,
  pub centrality_weight: f64,
  pub dominance_weight: f64,
  pub novelty_weight: f64,
  pub speed_weight: f64,
}

impl Default for EffortConfig {
  fn default() -> Self {
    Self {
      novelty_cap: 2.0,
      speed_half_life_hours: 24.0,
      min_batch_size: 1,
      share_weight: 0.25,
      scale_weight: 0.15,
      reach_weight: 0.20,
      centrality_weight: 0.20,
      dominance_weight: 0.15,
      novelty_weight: 0.05,
      speed_weight: 0.05,
    }
  }
}

fn validate(cfg: &EffortConfig) -> Result<()> {
  if cfg.novelty_cap <= 0.0 {
    return Err(Error::InvalidConfig("novelty_cap must be > 0".into()));
  }
  if cfg.speed_half_life_hours <= 0.0 {
    return Err(Error::InvalidConfig("speed_half_life_hours must be > 0".into()));
  }
  if cfg.min_batch_size == 0 {
    return Err(Error::InvalidConfig("min_batch_size must be >= 1".into()));
  }
  Ok(())
}

struct RawDims {
  share: f64,
  scale_raw: f64,
  reach_raw: f64,
  centrality_raw: f64,
  dominance_raw: f64,
  novelty_raw: f64,
  speed_raw: f64,
}

/// Score per-commit effort.
pub fn score_effort(commits: &[EnrichedCommit], batch_ids: &[u32], cfg: &EffortConfig) -> Result<Vec<EffortVector>> {
  validate(cfg)?;

  if commits.len() != batch_ids.len() {
    return Err(Error::InvalidRecord(
      "commits and batch_ids must have the same length".into(),
    ));
  }

  if commits.is_empty() {
    return Ok(Vec::new());
  }

  // Indices grouped by batch, preserving original-order within each group.
  let mut by_batch: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
  for (idx, &batch_id) in batch_ids.iter().enumerate() {
    by_batch.entry(batch_id).or_default().push(idx);
  }

  // Batches smaller than min_batch_size are skipped entirely: their commits
  // never enter the normalized population and end up with all-zero vectors.
  let (kept_batches, skipped): (Vec<_>, Vec<_>) = by_batch
    .into_iter()
    .partition(|(_, indices)| indices.len() >= cfg.min_batch_size);
  let skipped_indices: Vec<usize> = skipped.into_iter().flat_map(|(_, idx)| idx).collect();

  // Each kept batch's raw dims may be computed independently and in parallel.
  let per_batch: Vec<Vec<(usize, RawDims)>> = kept_batches
    .into_par_iter()
    .map(|(_, indices)| raw_dims_for_batch(commits, &indices, cfg))
    .collect();

  let mut raw_by_index: HashMap<usize, RawDims> = HashMap::new();
  for batch in per_batch {
    for (idx, dims) in batch {
      raw_by_index.insert(idx, dims);
    }
  }

  let kept_order: Vec<usize> = {
    let mut idx: Vec<usize> = raw_by_index.keys().copied().collect();
    idx.sort_unstable();
    idx
  };

  let mut share: HashMap<usize, f64> = HashMap::new();
  let mut scale_raw_v = Vec::with_capacity(kept_order.len());
  let mut reach_raw_v = Vec::with_capacity(kept_order.len());
  let mut centrality_raw_v = Vec::with_capacity(kept_order.len());
  let mut dominance_raw_v = Vec::with_capacity(kept_order.len());
  let mut novelty_raw_v = Vec::with_capacity(kept_order.len());
  let mut speed_raw_v = Vec::with_capacity(kept_order.len());

  for &idx in &kept_order {
    let dims = &raw_by_index[&idx];
    share.insert(idx, dims.share);
    scale_raw_v.push(dims.scale_raw);
    reach_raw_v.push(dims.reach_raw);
    centrality_raw_v.push(dims.centrality_raw);
    dominance_raw_v.push(dims.dominance_raw);
    novelty_raw_v.push(dims.novelty_raw);
    speed_raw_v.push(dims.speed_raw);
  }

  let scale_z_v = mad_z(&scale_raw_v);
  let reach_z_v = mad_z(&reach_raw_v);
  let centrality_z_v = mad_z(&centrality_raw_v);
  let dominance_z_v = mad_z(&dominance_raw_v);
  let novelty_z_v = mad_z(&novelty_raw_v);
  let speed_z_v = mad_z(&speed_raw_v);

  let mut out: Vec<Option<EffortVector>> = vec![None; commits.len()];

  for (pos, &idx) in kept_order.iter().enumerate() {
    let dims = &raw_by_index[&idx];
    let effort = cfg.share_weight * dims.share
      + cfg.scale_weight * scale_z_v[pos]
      + cfg.reach_weight * reach_z_v[pos]
      + cfg.centrality_weight * centrality_z_v[pos]
      + cfg.dominance_weight * dominance_z_v[pos]
      + cfg.novelty_weight * novelty_z_v[pos]
      + cfg.speed_weight * speed_z_v[pos];

    out[idx] = Some(EffortVector {
      share: dims.share,
      scale_raw: dims.scale_raw,
      reach_raw: dims.reach_raw,
      centrality_raw: dims.centrality_raw,
      dominance_raw: dims.dominance_raw,
      novelty_raw: dims.novelty_raw,
      speed_raw: dims.speed_raw,
      scale_z: scale_z_v[pos],
      reach_z: reach_z_v[pos],
      centrality_z: centrality_z_v[pos],
      dominance_z: dominance_z_v[pos],
      novelty_z: novelty_z_v[pos],
      speed_z: speed_z_v[pos],
      effort,
    });
  }

  for idx in skipped_indices {
    out[idx] = Some(EffortVector {
      share: 0.0,
      scale_raw: 0.0,
      reach_raw: 0.0,
      centrality_raw: 0.0,
      dominance_raw: 0.0,
      novelty_raw: 0.0,
      speed_raw: 0.0,
      scale_z: 0.0,
      reach_z: 0.0,
      centrality_z: 0.0,
      dominance_z: 0.0,
      novelty_z: 0.0,
      speed_z: 0.0,
      effort: 0.0,
    });
  }

  Ok(out.into_iter().map(|v| v.expect("every index assigned")).collect())
}

fn raw_dims_for_batch(commits: &[EnrichedCommit], indices: &[usize], cfg: &EffortConfig) -> Vec<(usize, RawDims)> {
  let batch_total_churn: f64 = indices.iter().map(|&i| commits[i].enrichment.effective_churn).sum();

  // Group indices by author; membership only, order is re-derived chronologically below.
  let mut by_author: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
  for &i in indices {
    by_author
      .entry(commits[i].commit.author_email.as_str())
      .or_default()
      .push(i);
  }

  let mut share_by_idx: HashMap<usize, f64> = HashMap::new();
  let mut dominance_by_idx: HashMap<usize, f64> = HashMap::new();
  let mut reach_by_idx: HashMap<usize, f64> = HashMap::new();
  let mut novelty_by_idx: HashMap<usize, f64> = HashMap::new();

  for author_indices in by_author.values() {
    // first/last must reflect chronological order (ties by original input
    // position), not the array order indices happen to be collected in.
    let mut chronological = author_indices.clone();
    chronological.sort_by(|&a, &b| {
      commits[a]
        .commit
        .commit_ts_utc
        .cmp(&commits[b].commit.commit_ts_utc)
        .then(a.cmp(&b))
    });
    let first = *chronological.first().unwrap();
    let last = *chronological.last().unwrap();
    let count_share = author_indices.len() as f64 / indices.len() as f64;

    let author_churn: f64 = author_indices.iter().map(|&i| commits[i].enrichment.effective_churn).sum();

    // Per-directory churn distribution for this author within the batch.
    let mut dir_churn: BTreeMap<&str, f64> = BTreeMap::new();
    for &i in author_indices {
      let c = &commits[i];
      let dirs = &c.commit.dirs_touched;
      if dirs.is_empty() {
        continue;
      }
      let per_dir = c.enrichment.effective_churn / dirs.len() as f64;
      for dir in dirs {
        *dir_churn.entry(dir.as_str()).or_insert(0.0) += per_dir;
      }
    }
    let weights: Vec<f64> = dir_churn.values().copied().collect();
    let reach = entropy(&weights, 2.0);

    let novelty_numerator: f64 = author_indices
      .iter()
      .map(|&i| (commits[i].enrichment.new_file_lines + commits[i].enrichment.key_path_lines) as f64)
      .sum();
    let novelty = if author_churn > 0.0 {
      (novelty_numerator / author_churn).min(cfg.novelty_cap)
    } else {
      0.0
    };

    for &i in author_indices {
      let is_first = if i == first { 0.3 } else { 0.0 };
      let is_last = if i == last { 0.3 } else { 0.0 };
      dominance_by_idx.insert(i, is_first + is_last + 0.4 * count_share);
      reach_by_idx.insert(i, reach);
      novelty_by_idx.insert(i, novelty);
      share_by_idx.insert(
        i,
        if batch_total_churn > 0.0 {
          author_churn / batch_total_churn
        } else {
          0.0
        },
      );
    }
  }

  indices
    .iter()
    .map(|&i| {
      let c = &commits[i];
      let effective_churn = c.enrichment.effective_churn;

      let share = share_by_idx.get(&i).copied().unwrap_or(0.0);
      let scale_raw = safe_log(effective_churn);
      let reach_raw = reach_by_idx.get(&i).copied().unwrap_or(0.0);
      let centrality_raw = c.enrichment.directory_centrality;
      let dominance_raw = dominance_by_idx.get(&i).copied().unwrap_or(0.0);
      let novelty_raw = novelty_by_idx.get(&i).copied().unwrap_or(0.0);

      let hours_since_author = c.commit.dt_prev_author_sec.map(|s| s / 3600.0);
      let speed_raw = match hours_since_author {
        Some(hours) => (-hours / cfg.speed_half_life_hours).exp(),
        None => 0.0,
      };

      (
        i,
        RawDims {
          share,
          scale_raw,
          reach_raw,
          centrality_raw,
          dominance_raw,
          novelty_raw,
          speed_raw,
        },
      )
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{Commit, Enrichment};
  use std::collections::BTreeSet;

  fn enriched(
    author: &str,
    dirs: &[&str],
    ins: u64,
    del: u64,
    new_file: i64,
    key_path: i64,
    dt_author: Option<f64>,
  ) -> EnrichedCommit {
    enriched_at(author, 0, dirs, ins, del, new_file, key_path, dt_author)
  }

  #[allow(clippy::too_many_arguments)]
  fn enriched_at(
    author: &str,
    ts: i64,
    dirs: &[&str],
    ins: u64,
    del: u64,
    new_file: i64,
    key_path: i64,
    dt_author: Option<f64>,
  ) -> EnrichedCommit {
    let effective_churn = (ins + del) as f64;
    EnrichedCommit {
      commit: Commit {
        hash: "h".into(),
        author_email: author.into(),
        commit_ts_utc: ts,
        dt_prev_commit_sec: None,
        dt_prev_author_sec: dt_author,
        files_changed: 1,
        insertions: ins,
        deletions: del,
        is_merge: false,
        dirs_touched: dirs.iter().map(|s| s.to_string()).collect(),
        file_types: BTreeSet::new(),
        msg_subject: "change".into(),
      },
      batch_id: 0,
      enrichment: Enrichment {
        noise_factor: 1.0,
        effective_churn,
        directory_centrality: 0.5,
        new_file_lines: new_file,
        key_path_lines: key_path,
      },
    }
  }

  #[test]
  fn empty_input_is_empty() {
    assert!(score_effort(&[], &[], &EffortConfig::default()).unwrap().is_empty());
  }

  #[test]
  fn mismatched_lengths_is_invalid_record() {
    let c = vec![enriched("a@example.com", &["src"], 10, 0, 0, 0, None)];
    assert!(matches!(
      score_effort(&c, &[], &EffortConfig::default()),
      Err(Error::InvalidRecord(_))
    ));
  }

  #[test]
  fn single_author_single_commit_batch_has_full_share() {
    let commits = vec![enriched("a@example.com", &["src"], 100, 0, 0, 0, None)];
    let out = score_effort(&commits, &[0], &EffortConfig::default()).unwrap();
    assert_eq!(out[0].share, 1.0);
    assert_eq!(out[0].dominance_raw, 1.0);
  }

  #[test]
  fn dominance_uses_chronological_order_not_array_order_when_input_is_shuffled() {
    // Same author, three commits in one batch, laid out in the input array
    // out of chronological order: array index 0 has ts=200 (chronologically
    // last), index 1 has ts=0 (chronologically first), index 2 has ts=100
    // (chronologically the middle commit).
    let commits = vec![
      enriched_at("a@example.com", 200, &["src"], 10, 0, 0, 0, None),
      enriched_at("a@example.com", 0, &["src"], 10, 0, 0, 0, None),
      enriched_at("a@example.com", 100, &["src"], 10, 0, 0, 0, None),
    ];
    let out = score_effort(&commits, &[0, 0, 0], &EffortConfig::default()).unwrap();

    // count_share = 3/3 = 1.0 -> every commit gets 0.4 from that term alone.
    assert!((out[0].dominance_raw - 0.7).abs() < 1e-9, "chronologically last commit");
    assert!((out[1].dominance_raw - 0.7).abs() < 1e-9, "chronologically first commit");
    assert!((out[2].dominance_raw - 0.4).abs() < 1e-9, "chronologically middle commit");
  }

  #[test]
  fn share_splits_proportionally_across_authors() {
    let commits = vec![
      enriched("a@example.com", &["src"], 75, 0, 0, 0, None),
      enriched("b@example.com", &["src"], 25, 0, 0, 0, None),
    ];
    let out = score_effort(&commits, &[0, 0], &EffortConfig::default()).unwrap();
    assert!((out[0].share - 0.75).abs() < 1e-9);
    assert!((out[1].share - 0.25).abs() < 1e-9);
  }

  #[test]
  fn novelty_aggregates_new_file_and_key_path_lines_across_the_author_batch() {
    let commits = vec![
      enriched("a@example.com", &["src"], 10, 0, 8, 0, None),
      enriched("a@example.com", &["src"], 10, 0, 0, 4, None),
    ];
    let out = score_effort(&commits, &[0, 0], &EffortConfig::default()).unwrap();
    // author_churn = 20, novelty numerator = 8 + 4 = 12 -> 0.6 for both of their commits
    assert!((out[0].novelty_raw - 0.6).abs() < 1e-9);
    assert!((out[1].novelty_raw - 0.6).abs() < 1e-9);
  }

  #[test]
  fn novelty_is_capped() {
    let c = enriched("a@example.com", &["src"], 10, 0, 1000, 1000, None);
    let out = score_effort(&[c], &[0], &EffortConfig::default()).unwrap();
    assert!(out[0].novelty_raw <= 2.0);
  }

  #[test]
  fn first_commit_by_author_has_zero_speed_raw_when_no_prior_commit() {
    let commits = vec![enriched("a@example.com", &["src"], 10, 0, 0, 0, None)];
    let out = score_effort(&commits, &[0], &EffortConfig::default()).unwrap();
    assert_eq!(out[0].speed_raw, 0.0);
  }

  #[test]
  fn effort_weighted_sum_uses_configured_weights() {
    let commits = vec![
      enriched("a@example.com", &["src"], 100, 0, 0, 0, None),
      enriched("b@example.com", &["docs"], 1, 0, 0, 0, None),
    ];
    let out = score_effort(&commits, &[0, 0], &EffortConfig::default()).unwrap();
    assert!(out[0].effort > out[1].effort);
  }

  #[test]
  fn batch_smaller_than_min_batch_size_is_excluded_with_zero_vector() {
    let commits = vec![
      enriched("a@example.com", &["src"], 100, 0, 0, 0, None),
      enriched("b@example.com", &["docs"], 1, 0, 0, 0, None),
    ];
    let cfg = EffortConfig {
      min_batch_size: 2,
      ..EffortConfig::default()
    };
    // batch 0 has one commit (below min_batch_size=2), batch 1 has one commit too.
    let out = score_effort(&commits, &[0, 1], &cfg).unwrap();
    assert_eq!(out[0].effort, 0.0);
    assert_eq!(out[1].effort, 0.0);
  }

  #[test]
  fn invalid_novelty_cap_is_invalid_config() {
    let cfg = EffortConfig {
      novelty_cap: 0.0,
      ..EffortConfig::default()
    };
    assert!(matches!(score_effort(&[], &[], &cfg), Err(Error::InvalidConfig(_))));
  }

  #[test]
  fn zero_min_batch_size_is_invalid_config() {
    let cfg = EffortConfig {
      min_batch_size: 0,
      ..EffortConfig::default()
    };
    assert!(matches!(score_effort(&[], &[], &cfg), Err(Error::InvalidConfig(_))));
  }
}
