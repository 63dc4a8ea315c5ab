// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Preprocessor (C2): noise down-weighting, directory co-change graph + PageRank centrality, key-path/new-file flags
// role: pipeline stage / C2
// inputs: commits in original order, batch_id per commit (from C1), PreprocessConfig
// outputs: Vec<EnrichedCommit> in the same order as the input commits
// invariants:
// - effective_churn = (insertions + deletions) * noise_factor, never negative
// - directory_centrality is the mean PageRank mass of a commit's touched directories (0.0 if none touched or graph empty)
// - the co-change graph accumulates per commit, not per batch: only directories touched together by the
//   same commit ever gain an edge
// - noise_factor and centrality never depend on iteration order of any HashMap
// errors: InvalidConfig for out-of-range noise factors or damping
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::RegexSet;

use crate::error::{Error, Result};
use crate::graph::{pagerank, CoChangeGraph, DirInterner};
use crate::model::{Commit, EnrichedCommit, Enrichment};

/// Directories considered architecturally central. Grounded on
/// `data_processor.py::_get_key_directories`.
pub const DEFAULT_KEY_DIRS: &[&str] = &[
  "kernel",
  "core",
  "src",
  "lib",
  "include",
  "drivers",
  "arch",
  "fs",
  "net",
  "security",
  "crypto",
  "mm",
  "ipc",
  "init",
  "api",
  "engine",
  "framework",
  "service",
  "controller",
  "model",
  "database",
  "config",
  "auth",
  "middleware",
];

/// Vendor/generated path fragments, matched case-insensitively against each
/// touched directory. Grounded on `data_processor.py::_get_vendor_patterns`.
pub const DEFAULT_VENDOR_PATTERNS: &[&str] = &[
  r"vendor/",
  r"third_party/",
  r"node_modules/",
  r"\.min\.",
  r"generated/",
  r"build/",
  r"dist/",
  r"\.lock$",
  r"package-lock\.json$",
  r"yarn\.lock$",
  r"Cargo\.lock$",
];

/// Commit-message fragments indicating a whitespace/formatting-only change.
/// Grounded on `data_processor.py::detect_noise`'s whitespace indicator list.
pub const DEFAULT_WHITESPACE_INDICATORS: &[&str] = &[
  "format", "style", "indent", "whitespace", "spacing", "trailing", "cleanup", "lint", "prettier", "clang-format",
];

/// Message fragments that mark a commit as adding brand-new content. Grounded
/// on `data_processor.py::detect_new_files`.
pub const DEFAULT_NEW_FILE_INDICATORS: &[&str] = &["add", "new", "create"];

static DEFAULT_VENDOR_SET: Lazy<RegexSet> =
  Lazy::new(|| RegexSet::new(DEFAULT_VENDOR_PATTERNS.iter().map(|p| format!("(?i){p}"))).expect("valid vendor regex set"));

#[derive(Debug, Clone)]
pub struct PreprocessConfig {
  /// Multiplier applied to a commit's churn when any touched directory matches a vendor pattern.
  pub vendor_noise_factor: f64,
  /// Multiplier applied when the subject looks like a pure whitespace/format change.
  pub whitespace_noise_factor: f64,
  /// Minimum accumulated co-change weight to keep an edge in the directory graph.
  pub min_churn_for_edge: f64,
  pub pagerank_damping: f64,
  pub pagerank_max_iter: usize,
  pub pagerank_tol: f64,
  pub key_dirs: BTreeSet<String>,
  pub vendor_patterns: Vec<String>,
  pub whitespace_indicators: Vec<String>,
  pub new_file_indicators: Vec<String>,
  /// Insertion share of an "add/new/create" commit needed to count as new-file lines.
  pub new_file_insertion_ratio: f64,
}

impl Default for PreprocessConfig {
  fn default() -> Self {
    Self {
      vendor_noise_factor: 0.1,
      whitespace_noise_factor: 0.3,
      min_churn_for_edge: 2.0,
      pagerank_damping: 0.85,
      pagerank_max_iter: 100,
      pagerank_tol: 1e-6,
      key_dirs: DEFAULT_KEY_DIRS.iter().map(|s| s.to_string()).collect(),
      vendor_patterns: DEFAULT_VENDOR_PATTERNS.iter().map(|s| s.to_string()).collect(),
      whitespace_indicators: DEFAULT_WHITESPACE_INDICATORS.iter().map(|s| s.to_string()).collect(),
      new_file_indicators: DEFAULT_NEW_FILE_INDICATORS.iter().map(|s| s.to_string()).collect(),
      new_file_insertion_ratio: 2.0,
    }
  }
}

fn validate(cfg: &PreprocessConfig) -> Result<()> {
  if !(0.0..=1.0).contains(&cfg.vendor_noise_factor) {
    return Err(Error::InvalidConfig("vendor_noise_factor must be in [0, 1]".into()));
  }
  if !(0.0..=1.0).contains(&cfg.whitespace_noise_factor) {
    return Err(Error::InvalidConfig("whitespace_noise_factor must be in [0, 1]".into()));
  }
  if cfg.min_churn_for_edge < 0.0 {
    return Err(Error::InvalidConfig("min_churn_for_edge must be >= 0".into()));
  }
  if !(0.0..1.0).contains(&cfg.pagerank_damping) {
    return Err(Error::InvalidConfig("pagerank_damping must be in [0, 1)".into()));
  }
  Ok(())
}

/// The product of a preprocessing pass: per-commit enrichment in input order,
/// plus the directory centrality map (`spec.md` §3's "Centrality map" entity)
/// the enrichment pass derived it from.
pub struct Preprocessed {
  pub commits: Vec<EnrichedCommit>,
  /// Directory name -> PageRank score, summing to 1 over present directories.
  /// Empty when the co-change graph has no surviving edges.
  pub centrality: BTreeMap<String, f64>,
}

fn is_vendor_dir(dir: &str, patterns: &[String], default_set: &RegexSet) -> bool {
  if patterns.as_slice() == DEFAULT_VENDOR_PATTERNS {
    return default_set.is_match(dir);
  }
  patterns.iter().any(|p| {
    regex::RegexBuilder::new(p)
      .case_insensitive(true)
      .build()
      .map(|re| re.is_match(dir))
      .unwrap_or(false)
  })
}

fn is_whitespace_subject(subject: &str, indicators: &[String]) -> bool {
  let lower = subject.to_lowercase();
  indicators.iter().any(|i| lower.contains(i.as_str()))
}

fn is_new_file_subject(subject: &str, indicators: &[String]) -> bool {
  let lower = subject.to_lowercase();
  indicators.iter().any(|i| lower.contains(i.as_str()))
}

/// Run the full C2 pass: noise down-weighting, directory co-change graph +
/// PageRank centrality, and new-file/key-path flags.
pub fn preprocess(commits: &[Commit], batch_ids: &[u32], cfg: &PreprocessConfig) -> Result<Preprocessed> {
  validate(cfg)?;

  if commits.len() != batch_ids.len() {
    return Err(Error::InvalidRecord(
      "commits and batch_ids must have the same length".into(),
    ));
  }

  if commits.is_empty() {
    return Ok(Preprocessed {
      commits: Vec::new(),
      centrality: BTreeMap::new(),
    });
  }

  // Noise factor and effective churn come first; the co-change graph is keyed
  // on effective_churn, not raw churn.
  let mut noise_factor = vec![1.0f64; commits.len()];
  let mut effective_churn = vec![0.0f64; commits.len()];
  for (i, commit) in commits.iter().enumerate() {
    let total_churn = (commit.insertions + commit.deletions) as f64;

    let vendor_hit = commit
      .dirs_touched
      .iter()
      .chain(commit.file_types.iter())
      .any(|d| is_vendor_dir(d, &cfg.vendor_patterns, &DEFAULT_VENDOR_SET));

    let whitespace_hit = is_whitespace_subject(&commit.msg_subject, &cfg.whitespace_indicators)
      && total_churn > 50.0
      && (commit.insertions as f64 - commit.deletions as f64).abs() < 10.0;

    noise_factor[i] = if vendor_hit {
      cfg.vendor_noise_factor
    } else if whitespace_hit {
      cfg.whitespace_noise_factor
    } else {
      1.0
    };
    effective_churn[i] = total_churn * noise_factor[i];
  }

  let mut interner = DirInterner::new();
  for commit in commits {
    for dir in &commit.dirs_touched {
      interner.intern(dir);
    }
  }

  let mut graph = CoChangeGraph::new(interner.len().max(1));

  // Per commit (not per batch): every unordered pair of directories touched by
  // the SAME commit co-changes, weighted by that commit's effective_churn.
  for (i, commit) in commits.iter().enumerate() {
    if commit.dirs_touched.len() < 2 || effective_churn[i] <= 0.0 {
      continue;
    }
    let dirs: Vec<u32> = commit.dirs_touched.iter().map(|d| interner.get(d).expect("interned above")).collect();
    for a in 0..dirs.len() {
      for b in (a + 1)..dirs.len() {
        graph.add_weight(dirs[a], dirs[b], effective_churn[i]);
      }
    }
  }

  let adjacency = graph.finalize(cfg.min_churn_for_edge);
  let ranks = pagerank(&adjacency, cfg.pagerank_damping, cfg.pagerank_max_iter, cfg.pagerank_tol);

  let centrality: BTreeMap<String, f64> = ranks
    .iter()
    .enumerate()
    .filter(|(_, &score)| score > 0.0)
    .map(|(id, &score)| (interner.name(id as u32).to_string(), score))
    .collect();

  let mut enriched = Vec::with_capacity(commits.len());
  for (i, (commit, &batch_id)) in commits.iter().zip(batch_ids.iter()).enumerate() {
    let dir_ids: Vec<u32> = commit.dirs_touched.iter().filter_map(|d| interner.get(d)).collect();
    let directory_centrality = if dir_ids.is_empty() || ranks.is_empty() {
      0.0
    } else {
      let sum: f64 = dir_ids.iter().map(|&id| ranks.get(id as usize).copied().unwrap_or(0.0)).sum();
      sum / dir_ids.len() as f64
    };

    let new_file_hit = is_new_file_subject(&commit.msg_subject, &cfg.new_file_indicators)
      && commit.insertions as f64 > cfg.new_file_insertion_ratio * commit.deletions as f64;
    let new_file_lines = if new_file_hit { (0.8 * commit.insertions as f64) as i64 } else { 0 };

    let key_dirs_touched = commit
      .dirs_touched
      .iter()
      .filter(|d| cfg.key_dirs.iter().any(|key| d.to_lowercase() == key.to_lowercase()))
      .count();
    let key_path_lines = if key_dirs_touched > 0 && !commit.dirs_touched.is_empty() {
      let proportion = key_dirs_touched as f64 / commit.dirs_touched.len() as f64;
      (effective_churn[i] * proportion).round() as i64
    } else {
      0
    };

    enriched.push(EnrichedCommit {
      commit: commit.clone(),
      batch_id,
      enrichment: Enrichment {
        noise_factor: noise_factor[i],
        effective_churn: effective_churn[i],
        directory_centrality,
        new_file_lines,
        key_path_lines,
      },
    });
  }

  Ok(Preprocessed {
    commits: enriched,
    centrality,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn commit(dirs: &[&str], subject: &str, ins: u64, del: u64) -> Commit {
    Commit {
      hash: "h".into(),
      author_email: "a@example.com".into(),
      commit_ts_utc: 0,
      dt_prev_commit_sec: None,
      dt_prev_author_sec: None,
      files_changed: 1,
      insertions: ins,
      deletions: del,
      is_merge: false,
      dirs_touched: dirs.iter().map(|s| s.to_string()).collect(),
      file_types: BTreeSet::new(),
      msg_subject: subject.into(),
    }
  }

  #[test]
  fn empty_input_is_empty() {
    let out = preprocess(&[], &[], &PreprocessConfig::default()).unwrap();
    assert!(out.commits.is_empty());
  }

  #[test]
  fn mismatched_lengths_is_invalid_record() {
    let c = vec![commit(&["src"], "add feature", 10, 0)];
    assert!(matches!(preprocess(&c, &[], &PreprocessConfig::default()), Err(Error::InvalidRecord(_))));
  }

  #[test]
  fn vendor_path_is_down_weighted() {
    let commits = vec![commit(&["vendor/lib"], "bump dep", 100, 0)];
    let out = preprocess(&commits, &[0], &PreprocessConfig::default()).unwrap();
    assert_eq!(out.commits[0].enrichment.noise_factor, 0.1);
    assert_eq!(out.commits[0].enrichment.effective_churn, 10.0);
  }

  #[test]
  fn whitespace_subject_is_down_weighted_only_above_the_churn_and_balance_thresholds() {
    let commits = vec![commit(&["src"], "style: reformat", 60, 55)];
    let out = preprocess(&commits, &[0], &PreprocessConfig::default()).unwrap();
    assert_eq!(out.commits[0].enrichment.noise_factor, 0.3);
    assert_eq!(out.commits[0].enrichment.effective_churn, 34.5);
  }

  #[test]
  fn whitespace_subject_below_churn_threshold_is_not_down_weighted() {
    let commits = vec![commit(&["src"], "fix indentation/whitespace", 5, 5)];
    let out = preprocess(&commits, &[0], &PreprocessConfig::default()).unwrap();
    assert_eq!(out.commits[0].enrichment.noise_factor, 1.0);
  }

  #[test]
  fn whitespace_subject_with_lopsided_delta_is_not_down_weighted() {
    let commits = vec![commit(&["src"], "reformat module", 100, 0)];
    let out = preprocess(&commits, &[0], &PreprocessConfig::default()).unwrap();
    assert_eq!(out.commits[0].enrichment.noise_factor, 1.0);
  }

  #[test]
  fn ordinary_commit_has_no_noise_discount() {
    let commits = vec![commit(&["src/app"], "wire up endpoint", 50, 10)];
    let out = preprocess(&commits, &[0], &PreprocessConfig::default()).unwrap();
    assert_eq!(out.commits[0].enrichment.noise_factor, 1.0);
    assert_eq!(out.commits[0].enrichment.effective_churn, 60.0);
  }

  #[test]
  fn key_path_touch_is_flagged_proportionally() {
    let commits = vec![commit(&["src", "docs"], "add endpoint", 50, 0)];
    let out = preprocess(&commits, &[0], &PreprocessConfig::default()).unwrap();
    // 1 of 2 touched dirs is a key dir -> half of effective_churn (50.0) rounded.
    assert_eq!(out.commits[0].enrichment.key_path_lines, 25);
  }

  #[test]
  fn non_key_directory_is_not_flagged() {
    let commits = vec![commit(&["docs"], "add guide", 50, 0)];
    let out = preprocess(&commits, &[0], &PreprocessConfig::default()).unwrap();
    assert_eq!(out.commits[0].enrichment.key_path_lines, 0);
  }

  #[test]
  fn mostly_insertions_with_add_keyword_is_flagged_new_file() {
    let commits = vec![commit(&["docs"], "add guide", 100, 2)];
    let out = preprocess(&commits, &[0], &PreprocessConfig::default()).unwrap();
    assert_eq!(out.commits[0].enrichment.new_file_lines, 80);
  }

  #[test]
  fn mostly_insertions_without_keyword_is_not_flagged_new_file() {
    let commits = vec![commit(&["docs"], "rewrite guide", 100, 2)];
    let out = preprocess(&commits, &[0], &PreprocessConfig::default()).unwrap();
    assert_eq!(out.commits[0].enrichment.new_file_lines, 0);
  }

  #[test]
  fn keyword_without_insertion_dominance_is_not_flagged_new_file() {
    let commits = vec![commit(&["docs"], "add small tweak", 10, 10)];
    let out = preprocess(&commits, &[0], &PreprocessConfig::default()).unwrap();
    assert_eq!(out.commits[0].enrichment.new_file_lines, 0);
  }

  #[test]
  fn co_changed_directories_within_one_commit_get_nonzero_centrality() {
    let commits = vec![
      commit(&["src/a", "src/b"], "wire modules", 20, 0),
      commit(&["src/a", "src/b"], "wire modules more", 20, 0),
      commit(&["src/a", "src/b"], "wire modules again", 20, 0),
    ];
    let batches = vec![0, 0, 0];
    let out = preprocess(&commits, &batches, &PreprocessConfig::default()).unwrap();
    assert!(out.commits[0].enrichment.directory_centrality > 0.0);
  }

  #[test]
  fn centrality_map_exposes_every_present_directory_and_sums_to_one() {
    let commits = vec![
      commit(&["src/a", "src/b"], "wire modules", 20, 0),
      commit(&["src/a", "src/b"], "wire modules more", 20, 0),
    ];
    let out = preprocess(&commits, &[0, 0], &PreprocessConfig::default()).unwrap();
    assert_eq!(out.centrality.len(), 2);
    assert!(out.centrality.contains_key("src/a"));
    assert!(out.centrality.contains_key("src/b"));
    let sum: f64 = out.centrality.values().sum();
    assert!((sum - 1.0).abs() < 1e-6);
  }

  #[test]
  fn centrality_map_is_empty_when_no_edges_survive() {
    let commits = vec![commit(&["a"], "touch a", 100, 0)];
    let out = preprocess(&commits, &[0], &PreprocessConfig::default()).unwrap();
    assert!(out.centrality.is_empty());
  }

  #[test]
  fn directories_only_co_touched_across_separate_commits_never_get_an_edge() {
    // dir "a" and dir "b" never appear together in a single commit's
    // dirs_touched, so they must not co-change even though they're in the
    // same batch.
    let commits = vec![
      commit(&["a"], "touch a", 100, 0),
      commit(&["b"], "touch b", 100, 0),
    ];
    let batches = vec![0, 0];
    let out = preprocess(&commits, &batches, &PreprocessConfig::default()).unwrap();
    assert_eq!(out.commits[0].enrichment.directory_centrality, 0.0);
    assert_eq!(out.commits[1].enrichment.directory_centrality, 0.0);
  }

  #[test]
  fn commit_with_no_directories_has_zero_centrality() {
    let commits = vec![commit(&[], "tidy", 1, 0)];
    let out = preprocess(&commits, &[0], &PreprocessConfig::default()).unwrap();
    assert_eq!(out.commits[0].enrichment.directory_centrality, 0.0);
  }

  #[test]
  fn invalid_noise_factor_is_invalid_config() {
    let cfg = PreprocessConfig {
      vendor_noise_factor: 2.0,
      ..PreprocessConfig::default()
    };
    assert!(matches!(preprocess(&[], &[], &cfg), Err(Error::InvalidConfig(_))));
  }
}
