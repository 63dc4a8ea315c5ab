// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Define the record types shared by every pipeline stage (input Commit plus derived entities)
// role: model/types
// outputs: Serializable structs with stable field names; no behavior
// invariants:
// - Commit is immutable once constructed; derived entities are pure functions of the stream
// - commit_ts_utc defines canonical chronological order; ties break by input order
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A single commit as acquired from an external source (git, GitHub, etc).
///
/// The core never parses CSV or talks to a VCS; callers hand in an in-memory
/// sequence of these records.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Commit {
  pub hash: String,
  pub author_email: String,
  pub commit_ts_utc: i64,
  #[serde(default)]
  pub dt_prev_commit_sec: Option<f64>,
  #[serde(default)]
  pub dt_prev_author_sec: Option<f64>,
  pub files_changed: u64,
  pub insertions: u64,
  pub deletions: u64,
  #[serde(default)]
  pub is_merge: bool,
  #[serde(default)]
  pub dirs_touched: BTreeSet<String>,
  #[serde(default)]
  pub file_types: BTreeSet<String>,
  #[serde(default)]
  pub msg_subject: String,
}

/// Per-commit fields attached by the preprocessor (C2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Enrichment {
  pub noise_factor: f64,
  pub effective_churn: f64,
  pub directory_centrality: f64,
  pub new_file_lines: i64,
  pub key_path_lines: i64,
}

/// A commit paired with its batch assignment and C2 enrichment; the shape every
/// downstream stage (C3, C4, C5) actually consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedCommit {
  pub commit: Commit,
  pub batch_id: u32,
  pub enrichment: Enrichment,
}

/// The six raw + normalized effort dimensions for a single commit (C3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EffortVector {
  pub share: f64,
  pub scale_raw: f64,
  pub reach_raw: f64,
  pub centrality_raw: f64,
  pub dominance_raw: f64,
  pub novelty_raw: f64,
  pub speed_raw: f64,
  pub scale_z: f64,
  pub reach_z: f64,
  pub centrality_z: f64,
  pub dominance_z: f64,
  pub novelty_z: f64,
  pub speed_z: f64,
  pub effort: f64,
}

/// The six raw + normalized importance dimensions for a single batch (C4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ImportanceVector {
  pub batch_id: u32,
  pub scale_raw: f64,
  pub scope_raw: f64,
  pub centrality_raw: f64,
  pub complexity_raw: f64,
  pub type_raw: f64,
  pub release_raw: f64,
  pub scale_z: f64,
  pub scope_z: f64,
  pub centrality_z: f64,
  pub complexity_z: f64,
  pub type_z: f64,
  pub release_z: f64,
  pub importance: f64,
}

/// Final per-author aggregate (C5).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeveloperResult {
  pub author_email: String,
  pub fds: f64,
  pub avg_effort: f64,
  pub avg_importance: f64,
  pub total_churn: f64,
  pub total_files: u64,
  pub commit_count: u64,
  pub unique_batches: u64,
  pub first_commit: i64,
  pub last_commit: i64,
}

/// Per-batch contribution breakdown (supplements `DeveloperResult`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchSummary {
  pub batch_id: u32,
  pub unique_authors: u64,
  pub total_contribution: f64,
  pub avg_contribution: f64,
  pub max_contribution: f64,
  pub avg_effort: f64,
  pub importance: f64,
  pub total_churn: f64,
  pub total_files: u64,
  pub start_ts: i64,
  pub end_ts: i64,
  pub commit_count: u64,
}
