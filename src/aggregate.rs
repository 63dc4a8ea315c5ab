// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: FDS Aggregator (C5): per-commit contribution, adaptive time window, per-author Fair Developer Score
// role: pipeline stage / C5
// inputs: enriched commits, batch_ids, effort vectors (C3), importance vectors (C4), AggregateConfig
// outputs: Vec<DeveloperResult> sorted by fds desc, commit_count desc, author_email asc
// invariants:
// - contribution = max(0, effort * importance); never negative
// - the time window keeps every commit when the stream's span is <= window_days or window_days >= 365
// - authors whose total contribution falls below contribution_threshold are dropped entirely
// - sum of DeveloperResult.fds over all authors equals the sum of contribution over windowed commits
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::model::{BatchSummary, DeveloperResult, EffortVector, EnrichedCommit, ImportanceVector};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateConfig {
  /// Width, in days, of the adaptive trailing time window.
  pub time_window_days: f64,
  /// Authors whose total contribution falls below this are dropped from the result.
  pub contribution_threshold: f64,
}

impl Default for AggregateConfig {
  fn default() -> Self {
    Self {
      time_window_days: 90.0,
      contribution_threshold: 0.01,
    }
  }
}

fn validate(cfg: &AggregateConfig) -> Result<()> {
  if cfg.time_window_days <= 0.0 {
    return Err(Error::InvalidConfig("time_window_days must be > 0".into()));
  }
  if cfg.contribution_threshold < 0.0 {
    return Err(Error::InvalidConfig("contribution_threshold must be >= 0".into()));
  }
  Ok(())
}

/// Indices of commits kept under the adaptive time window:
/// keep everything if the stream's span is <= window_days or window_days >= 365
/// days; otherwise keep only commits within window_days of the latest commit.
fn windowed_indices(commits: &[EnrichedCommit], window_days: f64) -> Vec<usize> {
  if commits.is_empty() {
    return Vec::new();
  }

  let min_ts = commits.iter().map(|c| c.commit.commit_ts_utc).min().unwrap();
  let max_ts = commits.iter().map(|c| c.commit.commit_ts_utc).max().unwrap();
  let span_days = (max_ts - min_ts) as f64 / 86_400.0;

  if span_days <= window_days || window_days >= 365.0 {
    return (0..commits.len()).collect();
  }

  let cutoff = max_ts - (window_days * 86_400.0) as i64;
  (0..commits.len())
    .filter(|&i| commits[i].commit.commit_ts_utc >= cutoff)
    .collect()
}

/// Aggregate per-commit contribution into per-author Fair Developer Scores.
pub fn aggregate(
  commits: &[EnrichedCommit],
  batch_ids: &[u32],
  effort: &[EffortVector],
  importance: &[ImportanceVector],
  cfg: &AggregateConfig,
) -> Result<Vec<DeveloperResult>> {
  validate(cfg)?;

  if commits.len() != batch_ids.len() || commits.len() != effort.len() || commits.len() != importance.len() {
    return Err(Error::InvalidRecord(
      "commits, batch_ids, effort, and importance must all have the same length".into(),
    ));
  }

  if commits.is_empty() {
    return Ok(Vec::new());
  }

  let kept = windowed_indices(commits, cfg.time_window_days);

  #[derive(Default)]
  struct Acc {
    fds: f64,
    effort_sum: f64,
    importance_sum: f64,
    total_churn: f64,
    total_files: u64,
    commit_count: u64,
    batches: std::collections::BTreeSet<u32>,
    first_commit: i64,
    last_commit: i64,
  }

  let mut by_author: BTreeMap<&str, Acc> = BTreeMap::new();

  for &i in &kept {
    let contribution = (effort[i].effort * importance[i].importance).max(0.0);
    let author = commits[i].commit.author_email.as_str();
    let ts = commits[i].commit.commit_ts_utc;

    let acc = by_author.entry(author).or_insert_with(|| Acc {
      first_commit: ts,
      last_commit: ts,
      ..Acc::default()
    });

    acc.fds += contribution;
    acc.effort_sum += effort[i].effort;
    acc.importance_sum += importance[i].importance;
    acc.total_churn += commits[i].enrichment.effective_churn;
    acc.total_files += commits[i].commit.files_changed;
    acc.commit_count += 1;
    acc.batches.insert(batch_ids[i]);
    acc.first_commit = acc.first_commit.min(ts);
    acc.last_commit = acc.last_commit.max(ts);
  }

  let mut results: Vec<DeveloperResult> = by_author
    .into_iter()
    .filter(|(_, acc)| acc.fds >= cfg.contribution_threshold)
    .map(|(author, acc)| DeveloperResult {
      author_email: author.to_string(),
      fds: acc.fds,
      avg_effort: acc.effort_sum / acc.commit_count as f64,
      avg_importance: acc.importance_sum / acc.commit_count as f64,
      total_churn: acc.total_churn,
      total_files: acc.total_files,
      commit_count: acc.commit_count,
      unique_batches: acc.batches.len() as u64,
      first_commit: acc.first_commit,
      last_commit: acc.last_commit,
    })
    .collect();

  results.sort_by(|a, b| {
    b.fds
      .partial_cmp(&a.fds)
      .unwrap()
      .then(b.commit_count.cmp(&a.commit_count))
      .then(a.author_email.cmp(&b.author_email))
  });

  Ok(results)
}

/// Per-batch contribution breakdown, supplementing the author-level view.
pub fn aggregate_detailed(
  commits: &[EnrichedCommit],
  batch_ids: &[u32],
  effort: &[EffortVector],
  importance: &[ImportanceVector],
  cfg: &AggregateConfig,
) -> Result<Vec<BatchSummary>> {
  validate(cfg)?;

  if commits.len() != batch_ids.len() || commits.len() != effort.len() || commits.len() != importance.len() {
    return Err(Error::InvalidRecord(
      "commits, batch_ids, effort, and importance must all have the same length".into(),
    ));
  }

  if commits.is_empty() {
    return Ok(Vec::new());
  }

  let kept = windowed_indices(commits, cfg.time_window_days);

  #[derive(Default)]
  struct Acc {
    authors: std::collections::BTreeSet<String>,
    total_contribution: f64,
    max_contribution: f64,
    effort_sum: f64,
    total_churn: f64,
    total_files: u64,
    commit_count: u64,
    first_ts: i64,
    last_ts: i64,
    importance: f64,
  }

  let mut by_batch: BTreeMap<u32, Acc> = BTreeMap::new();

  for &i in &kept {
    let contribution = (effort[i].effort * importance[i].importance).max(0.0);
    let batch_id = batch_ids[i];
    let ts = commits[i].commit.commit_ts_utc;

    let acc = by_batch.entry(batch_id).or_insert_with(|| Acc {
      first_ts: ts,
      last_ts: ts,
      ..Acc::default()
    });

    acc.authors.insert(commits[i].commit.author_email.clone());
    acc.total_contribution += contribution;
    acc.max_contribution = acc.max_contribution.max(contribution);
    acc.effort_sum += effort[i].effort;
    acc.total_churn += commits[i].enrichment.effective_churn;
    acc.total_files += commits[i].commit.files_changed;
    acc.commit_count += 1;
    acc.first_ts = acc.first_ts.min(ts);
    acc.last_ts = acc.last_ts.max(ts);
    acc.importance = importance[i].importance;
  }

  let mut out: Vec<BatchSummary> = by_batch
    .into_iter()
    .map(|(batch_id, acc)| BatchSummary {
      batch_id,
      unique_authors: acc.authors.len() as u64,
      total_contribution: acc.total_contribution,
      avg_contribution: acc.total_contribution / acc.commit_count as f64,
      max_contribution: acc.max_contribution,
      avg_effort: acc.effort_sum / acc.commit_count as f64,
      importance: acc.importance,
      total_churn: acc.total_churn,
      total_files: acc.total_files,
      start_ts: acc.first_ts,
      end_ts: acc.last_ts,
      commit_count: acc.commit_count,
    })
    .collect();

  out.sort_by_key(|b| b.batch_id);
  Ok(out)
}
