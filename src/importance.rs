// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Importance Scorer (C4): per-batch six-dimension importance vector, MAD-Z normalized, broadcast to commits
// role: pipeline stage / C4
// inputs: enriched commits (C2 output) plus their batch_id, ImportanceConfig
// outputs: Vec<ImportanceVector>, one entry per commit in input order (batch value broadcast to every member commit)
// invariants:
// - type classification is whole-word, case-insensitive, and checked in fixed priority order: security > hotfix > feature > perf > bugfix > refactor > doc > other
// - a batch's importance vector is identical across all of its member commits
// - raw per-batch computation may run in parallel; normalization and the weighted sum are sequential
// errors: InvalidConfig for non-positive scale factors or an empty release calendar entry list
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;

use crate::error::{Error, Result};
use crate::model::{EnrichedCommit, ImportanceVector};
use crate::stats::{entropy, mad_z, safe_log};

/// Commit-type classes in descending priority order, with their importance multiplier.
/// Grounded on `batch_importance.py::_get_commit_type_patterns`.
const TYPE_PRIORITY: &[(&str, f64)] = &[
  ("security", 1.20),
  ("hotfix", 1.15),
  ("feature", 1.10),
  ("perf", 1.05),
  ("bugfix", 1.00),
  ("refactor", 0.90),
  ("doc", 0.60),
  ("other", 0.80),
];

struct TypePattern {
  class: &'static str,
  multiplier: f64,
  regexes: Vec<Regex>,
}

static TYPE_PATTERNS: Lazy<Vec<TypePattern>> = Lazy::new(|| {
  let build = |patterns: &[&str]| -> Vec<Regex> {
    patterns
      .iter()
      .map(|p| Regex::new(&format!("(?i){p}")).expect("valid commit-type regex"))
      .collect()
  };

  vec![
    TypePattern {
      class: "security",
      multiplier: 1.20,
      regexes: build(&[
        r"\b(security|cve|vuln\w*|exploit|attack|breach)\b",
        r"\b(xss|csrf|injection|overflow|privilege)\b",
      ]),
    },
    TypePattern {
      class: "hotfix",
      multiplier: 1.15,
      regexes: build(&[
        r"\b(hotfix|urgent|critical|emergency)\b",
        r"\b(fix.*critical|critical.*fix)\b",
      ]),
    },
    TypePattern {
      class: "feature",
      multiplier: 1.10,
      regexes: build(&[
        r"\b(feature|add|new|implement\w*|introduce)\b",
        r"\b(support|enable|enhance)\b",
      ]),
    },
    TypePattern {
      class: "perf",
      multiplier: 1.05,
      regexes: build(&[
        r"\b(perf|performance|optimiz\w*|faster|speed\w*)\b",
        r"\b(cache|memory|cpu|latency)\b",
      ]),
    },
    TypePattern {
      class: "bugfix",
      multiplier: 1.00,
      regexes: build(&[
        r"\b(fix|bug\w*|issue|problem|error)\b",
        r"\b(correct\w*|resolve\w*|address\w*)\b",
      ]),
    },
    TypePattern {
      class: "refactor",
      multiplier: 0.90,
      regexes: build(&[
        r"\b(refactor\w*|restructure\w*|reorganize\w*|cleanup)\b",
        r"\b(simplify|extract|rename)\b",
      ]),
    },
    TypePattern {
      class: "doc",
      multiplier: 0.60,
      regexes: build(&[
        r"\b(doc\w*|documentation|readme|comment\w*)\b",
        r"\b(manual|guide|tutorial)\b",
      ]),
    },
  ]
});

/// Classify a single commit subject into a (class, multiplier) pair, in
/// `TYPE_PRIORITY` order. Falls back to "other" (0.80) when nothing matches.
pub fn classify_commit_type(subject: &str) -> (&'static str, f64) {
  for pattern in TYPE_PATTERNS.iter() {
    if pattern.regexes.iter().any(|re| re.is_match(subject)) {
      return (pattern.class, pattern.multiplier);
    }
  }
  ("other", 0.80)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportanceConfig {
  pub release_proximity_days: f64,
  pub complexity_scale_factor: f64,
  pub min_batch_churn: f64,
  /// Unix timestamps of known releases. `None` means release proximity is unknown,
  /// and every batch gets the neutral `release_raw = 0.5`.
  pub release_calendar: Option<Vec<i64>>,
  pub scale_weight: f64,
  pub scope_weight: f64,
  pub centrality_weight: f64,
  pub complexity_weight: f64,
  pub type_weight: f64,
  pub release_weight: f64,
}

impl Default for ImportanceConfig {
  fn default() -> Self {
    Self {
      release_proximity_days: 30.0,
      complexity_scale_factor: 1.0,
      min_batch_churn: 1.0,
      release_calendar: None,
      scale_weight: 0.30,
      scope_weight: 0.20,
      centrality_weight: 0.15,
      complexity_weight: 0.15,
      type_weight: 0.10,
      release_weight: 0.10,
    }
  }
}

fn validate(cfg: &ImportanceConfig) -> Result<()> {
  if cfg.release_proximity_days <= 0.0 {
    return Err(Error::InvalidConfig("release_proximity_days must be > 0".into()));
  }
  if cfg.complexity_scale_factor <= 0.0 {
    return Err(Error::InvalidConfig("complexity_scale_factor must be > 0".into()));
  }
  if let Some(cal) = &cfg.release_calendar {
    if cal.is_empty() {
      return Err(Error::InvalidConfig("release_calendar, if present, must not be empty".into()));
    }
  }
  Ok(())
}

struct BatchRaw {
  scale_raw: f64,
  scope_raw: f64,
  centrality_raw: f64,
  complexity_raw: f64,
  type_raw: f64,
  release_raw: f64,
}

/// Score per-batch importance and broadcast it to every member commit.
pub fn score_importance(
  commits: &[EnrichedCommit],
  batch_ids: &[u32],
  cfg: &ImportanceConfig,
) -> Result<Vec<ImportanceVector>> {
  validate(cfg)?;

  if commits.len() != batch_ids.len() {
    return Err(Error::InvalidRecord(
      "commits and batch_ids must have the same length".into(),
    ));
  }

  if commits.is_empty() {
    return Ok(Vec::new());
  }

  let mut by_batch: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
  for (idx, &batch_id) in batch_ids.iter().enumerate() {
    by_batch.entry(batch_id).or_default().push(idx);
  }

  // Batches whose total effective_churn falls below min_batch_churn are
  // skipped entirely: excluded from normalization, importance = 0.0 for
  // their member commits.
  let (kept_batches, skipped_batches): (Vec<_>, Vec<_>) = by_batch.into_iter().partition(|(_, indices)| {
    indices.iter().map(|&i| commits[i].enrichment.effective_churn).sum::<f64>() >= cfg.min_batch_churn
  });

  let raws: Vec<(u32, BatchRaw)> = kept_batches
    .into_par_iter()
    .map(|(batch_id, indices)| (batch_id, raw_dims_for_batch(commits, &indices, cfg)))
    .collect();

  let batch_ids_ordered: Vec<u32> = raws.iter().map(|(id, _)| *id).collect();
  let scale_raw: Vec<f64> = raws.iter().map(|(_, r)| r.scale_raw).collect();
  let scope_raw: Vec<f64> = raws.iter().map(|(_, r)| r.scope_raw).collect();
  let centrality_raw: Vec<f64> = raws.iter().map(|(_, r)| r.centrality_raw).collect();
  let complexity_raw: Vec<f64> = raws.iter().map(|(_, r)| r.complexity_raw).collect();
  let type_raw: Vec<f64> = raws.iter().map(|(_, r)| r.type_raw).collect();
  let release_raw: Vec<f64> = raws.iter().map(|(_, r)| r.release_raw).collect();

  let scale_z = mad_z(&scale_raw);
  let scope_z = mad_z(&scope_raw);
  let centrality_z = mad_z(&centrality_raw);
  let complexity_z = mad_z(&complexity_raw);
  let type_z = mad_z(&type_raw);
  let release_z = mad_z(&release_raw);

  let mut vector_by_batch: BTreeMap<u32, ImportanceVector> = BTreeMap::new();
  for (i, &batch_id) in batch_ids_ordered.iter().enumerate() {
    let importance = cfg.scale_weight * scale_z[i]
      + cfg.scope_weight * scope_z[i]
      + cfg.centrality_weight * centrality_z[i]
      + cfg.complexity_weight * complexity_z[i]
      + cfg.type_weight * type_z[i]
      + cfg.release_weight * release_z[i];

    vector_by_batch.insert(
      batch_id,
      ImportanceVector {
        batch_id,
        scale_raw: scale_raw[i],
        scope_raw: scope_raw[i],
        centrality_raw: centrality_raw[i],
        complexity_raw: complexity_raw[i],
        type_raw: type_raw[i],
        release_raw: release_raw[i],
        scale_z: scale_z[i],
        scope_z: scope_z[i],
        centrality_z: centrality_z[i],
        complexity_z: complexity_z[i],
        type_z: type_z[i],
        release_z: release_z[i],
        importance,
      },
    );
  }

  for (batch_id, _) in &skipped_batches {
    vector_by_batch.insert(
      *batch_id,
      ImportanceVector {
        batch_id: *batch_id,
        scale_raw: 0.0,
        scope_raw: 0.0,
        centrality_raw: 0.0,
        complexity_raw: 0.0,
        type_raw: 0.0,
        release_raw: 0.0,
        scale_z: 0.0,
        scope_z: 0.0,
        centrality_z: 0.0,
        complexity_z: 0.0,
        type_z: 0.0,
        release_z: 0.0,
        importance: 0.0,
      },
    );
  }

  Ok(batch_ids.iter().map(|id| vector_by_batch[id]).collect())
}

fn raw_dims_for_batch(commits: &[EnrichedCommit], indices: &[usize], cfg: &ImportanceConfig) -> BatchRaw {
  let total_churn: f64 = indices.iter().map(|&i| commits[i].enrichment.effective_churn).sum();

  let unique_files: usize = indices.iter().map(|&i| commits[i].commit.files_changed as usize).sum();

  let mut dir_churn: BTreeMap<&str, f64> = BTreeMap::new();
  for &i in indices {
    let c = &commits[i];
    if c.commit.dirs_touched.is_empty() {
      continue;
    }
    let per_dir = c.enrichment.effective_churn / c.commit.dirs_touched.len() as f64;
    for dir in &c.commit.dirs_touched {
      *dir_churn.entry(dir.as_str()).or_insert(0.0) += per_dir;
    }
  }
  let unique_dirs = dir_churn.len();
  let dir_weights: Vec<f64> = dir_churn.values().copied().collect();
  let h_dir = entropy(&dir_weights, 2.0);

  let scale_raw = safe_log(total_churn);
  let scope_raw = 0.5 * unique_files as f64 + 0.3 * h_dir + 0.2 * unique_dirs as f64;

  let centrality_raw = {
    let sum: f64 = indices.iter().map(|&i| commits[i].enrichment.directory_centrality).sum();
    sum / indices.len() as f64
  };

  let complexity_raw = (unique_dirs as f64 * safe_log(total_churn)).sqrt() * cfg.complexity_scale_factor;

  let type_raw = {
    let mut best_priority = TYPE_PRIORITY.len();
    let mut best_multiplier = 0.80;
    for &i in indices {
      let (class, multiplier) = classify_commit_type(&commits[i].commit.msg_subject);
      if let Some(pos) = TYPE_PRIORITY.iter().position(|(c, _)| *c == class) {
        if pos < best_priority {
          best_priority = pos;
          best_multiplier = multiplier;
        }
      }
    }
    best_multiplier
  };

  let release_raw = match &cfg.release_calendar {
    None => 0.5,
    Some(calendar) => {
      let batch_ts: Vec<i64> = indices.iter().map(|&i| commits[i].commit.commit_ts_utc).collect();
      let min_days = batch_ts
        .iter()
        .flat_map(|ts| calendar.iter().map(move |r| ((*r - ts).abs() as f64) / 86_400.0))
        .fold(f64::INFINITY, f64::min);
      (-min_days / cfg.release_proximity_days).exp()
    }
  };

  BatchRaw {
    scale_raw,
    scope_raw,
    centrality_raw,
    complexity_raw,
    type_raw,
    release_raw,
  }
}
