// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Crate root: module wiring and the run_all orchestration that chains C1 through C5
// role: orchestration
// outputs: PipelineConfig, PipelineOutput, run_all()
// invariants:
// - run_all always uses the forward-scan clusterer (cluster_hierarchical is opt-in, never wired into run_all)
// - stage order is fixed: cluster -> preprocess -> (effort, importance in either order) -> aggregate
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

pub mod aggregate;
pub mod cluster;
pub mod effort;
pub mod error;
pub mod graph;
pub mod importance;
pub mod model;
pub mod preprocess;
pub mod stats;

pub use error::{Error, Result};

use serde::{Deserialize, Serialize};

pub use aggregate::{aggregate, aggregate_detailed, AggregateConfig};
pub use cluster::{cluster, cluster_hierarchical, ClusterConfig, HierarchicalClusterConfig};
pub use effort::{score_effort, EffortConfig};
pub use importance::{score_importance, ImportanceConfig};
pub use model::{BatchSummary, Commit, DeveloperResult, EffortVector, EnrichedCommit, Enrichment, ImportanceVector};
pub use preprocess::{preprocess, PreprocessConfig};

/// Bundles every stage's configuration for a single `run_all` invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
  #[serde(default)]
  pub cluster: ClusterConfigDto,
  #[serde(default)]
  pub preprocess: PreprocessConfigDto,
  #[serde(default)]
  pub effort: EffortConfigDto,
  #[serde(default)]
  pub importance: ImportanceConfigDto,
  #[serde(default)]
  pub aggregate: AggregateConfigDto,
}

/// The full result of running the pipeline end to end.
///
/// Alongside the ranked `developers` list, this carries every intermediate
/// stage's output read-only (`spec.md` §3's "downstream stages read-only"
/// lifecycle rule) so a caller can inspect any stage without re-running the
/// pipeline: the batch assignment (C1), the directory centrality map (C2),
/// and the per-commit effort/importance vectors (C3/C4), indexed the same
/// way as the `commits` slice passed to `run_all`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
  pub developers: Vec<DeveloperResult>,
  pub batches: Vec<BatchSummary>,
  /// `batch_id` per commit (C1), indexed the same way as the input commits.
  pub batch_ids: Vec<u32>,
  /// Directory -> PageRank centrality (C2), exposed for inspection since it
  /// is a named derived entity in its own right, not just an internal score.
  pub centrality: std::collections::BTreeMap<String, f64>,
  /// Per-commit effort vector (C3), indexed the same way as the input commits.
  pub effort: Vec<EffortVector>,
  /// Per-commit importance vector (C4), indexed the same way as the input commits.
  pub importance: Vec<ImportanceVector>,
  pub commit_count: usize,
  pub batch_count: usize,
}

/// Run C1 through C5 in sequence over `commits`.
pub fn run_all(commits: &[Commit], cfg: &PipelineConfig) -> Result<PipelineOutput> {
  let cluster_cfg: ClusterConfig = cfg.cluster.clone().into();
  let preprocess_cfg: PreprocessConfig = cfg.preprocess.clone().into();
  let effort_cfg: EffortConfig = cfg.effort.into();
  let importance_cfg: ImportanceConfig = cfg.importance.clone().into();
  let aggregate_cfg: AggregateConfig = cfg.aggregate.into();

  let batch_ids = cluster(commits, &cluster_cfg)?;
  let preprocessed = preprocess(commits, &batch_ids, &preprocess_cfg)?;
  let effort = score_effort(&preprocessed.commits, &batch_ids, &effort_cfg)?;
  let importance = score_importance(&preprocessed.commits, &batch_ids, &importance_cfg)?;
  let developers = aggregate(&preprocessed.commits, &batch_ids, &effort, &importance, &aggregate_cfg)?;
  let batches = aggregate_detailed(&preprocessed.commits, &batch_ids, &effort, &importance, &aggregate_cfg)?;

  let batch_count = batch_ids.iter().collect::<std::collections::BTreeSet<_>>().len();

  Ok(PipelineOutput {
    developers,
    batches,
    batch_ids,
    centrality: preprocessed.centrality,
    effort,
    importance,
    commit_count: commits.len(),
    batch_count,
  })
}

/// Serde-friendly mirror of `ClusterConfig`. Kept distinct from the stage config
/// so the JSON-facing shape can evolve independently of the internal one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClusterConfigDto {
  pub alpha: f64,
  pub beta: f64,
  pub gap: f64,
  pub break_on_merge: bool,
  pub break_on_author: bool,
}

impl Default for ClusterConfigDto {
  fn default() -> Self {
    ClusterConfig::default().into()
  }
}

impl From<ClusterConfig> for ClusterConfigDto {
  fn from(c: ClusterConfig) -> Self {
    Self {
      alpha: c.alpha,
      beta: c.beta,
      gap: c.gap,
      break_on_merge: c.break_on_merge,
      break_on_author: c.break_on_author,
    }
  }
}

impl From<ClusterConfigDto> for ClusterConfig {
  fn from(d: ClusterConfigDto) -> Self {
    Self {
      alpha: d.alpha,
      beta: d.beta,
      gap: d.gap,
      break_on_merge: d.break_on_merge,
      break_on_author: d.break_on_author,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfigDto {
  pub vendor_noise_factor: f64,
  pub whitespace_noise_factor: f64,
  pub min_churn_for_edge: f64,
  pub pagerank_damping: f64,
  pub pagerank_max_iter: usize,
  pub pagerank_tol: f64,
  pub new_file_insertion_ratio: f64,
}

impl Default for PreprocessConfigDto {
  fn default() -> Self {
    PreprocessConfig::default().into()
  }
}

impl From<PreprocessConfig> for PreprocessConfigDto {
  fn from(c: PreprocessConfig) -> Self {
    Self {
      vendor_noise_factor: c.vendor_noise_factor,
      whitespace_noise_factor: c.whitespace_noise_factor,
      min_churn_for_edge: c.min_churn_for_edge,
      pagerank_damping: c.pagerank_damping,
      pagerank_max_iter: c.pagerank_max_iter,
      pagerank_tol: c.pagerank_tol,
      new_file_insertion_ratio: c.new_file_insertion_ratio,
    }
  }
}

impl From<PreprocessConfigDto> for PreprocessConfig {
  fn from(d: PreprocessConfigDto) -> Self {
    Self {
      vendor_noise_factor: d.vendor_noise_factor,
      whitespace_noise_factor: d.whitespace_noise_factor,
      min_churn_for_edge: d.min_churn_for_edge,
      pagerank_damping: d.pagerank_damping,
      pagerank_max_iter: d.pagerank_max_iter,
      pagerank_tol: d.pagerank_tol,
      new_file_insertion_ratio: d.new_file_insertion_ratio,
      ..PreprocessConfig::default()
    }
  }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EffortConfigDto {
  pub novelty_cap: f64,
  pub speed_half_life_hours: f64,
  pub min_batch_size: usize,
  pub share_weight: f64,
  pub scale_weight: f64,
  pub reach_weight: f64,
  pub centrality_weight: f64,
  pub dominance_weight: f64,
  pub novelty_weight: f64,
  pub speed_weight: f64,
}

impl Default for EffortConfigDto {
  fn default() -> Self {
    EffortConfig::default().into()
  }
}

impl From<EffortConfig> for EffortConfigDto {
  fn from(c: EffortConfig) -> Self {
    Self {
      novelty_cap: c.novelty_cap,
      speed_half_life_hours: c.speed_half_life_hours,
      min_batch_size: c.min_batch_size,
      share_weight: c.share_weight,
      scale_weight: c.scale_weight,
      reach_weight: c.reach_weight,
      centrality_weight: c.centrality_weight,
      dominance_weight: c.dominance_weight,
      novelty_weight: c.novelty_weight,
      speed_weight: c.speed_weight,
    }
  }
}

impl From<EffortConfigDto> for EffortConfig {
  fn from(d: EffortConfigDto) -> Self {
    Self {
      novelty_cap: d.novelty_cap,
      speed_half_life_hours: d.speed_half_life_hours,
      min_batch_size: d.min_batch_size,
      share_weight: d.share_weight,
      scale_weight: d.scale_weight,
      reach_weight: d.reach_weight,
      centrality_weight: d.centrality_weight,
      dominance_weight: d.dominance_weight,
      novelty_weight: d.novelty_weight,
      speed_weight: d.speed_weight,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportanceConfigDto {
  pub release_proximity_days: f64,
  pub complexity_scale_factor: f64,
  pub min_batch_churn: f64,
  #[serde(default)]
  pub release_calendar: Option<Vec<i64>>,
  pub scale_weight: f64,
  pub scope_weight: f64,
  pub centrality_weight: f64,
  pub complexity_weight: f64,
  pub type_weight: f64,
  pub release_weight: f64,
}

impl Default for ImportanceConfigDto {
  fn default() -> Self {
    ImportanceConfig::default().into()
  }
}

impl From<ImportanceConfig> for ImportanceConfigDto {
  fn from(c: ImportanceConfig) -> Self {
    Self {
      release_proximity_days: c.release_proximity_days,
      complexity_scale_factor: c.complexity_scale_factor,
      min_batch_churn: c.min_batch_churn,
      release_calendar: c.release_calendar,
      scale_weight: c.scale_weight,
      scope_weight: c.scope_weight,
      centrality_weight: c.centrality_weight,
      complexity_weight: c.complexity_weight,
      type_weight: c.type_weight,
      release_weight: c.release_weight,
    }
  }
}

impl From<ImportanceConfigDto> for ImportanceConfig {
  fn from(d: ImportanceConfigDto) -> Self {
    Self {
      release_proximity_days: d.release_proximity_days,
      complexity_scale_factor: d.complexity_scale_factor,
      min_batch_churn: d.min_batch_churn,
      release_calendar: d.release_calendar,
      scale_weight: d.scale_weight,
      scope_weight: d.scope_weight,
      centrality_weight: d.centrality_weight,
      complexity_weight: d.complexity_weight,
      type_weight: d.type_weight,
      release_weight: d.release_weight,
    }
  }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AggregateConfigDto {
  pub time_window_days: f64,
  pub contribution_threshold: f64,
}

impl Default for AggregateConfigDto {
  fn default() -> Self {
    AggregateConfig::default().into()
  }
}

impl From<AggregateConfig> for AggregateConfigDto {
  fn from(c: AggregateConfig) -> Self {
    Self {
      time_window_days: c.time_window_days,
      contribution_threshold: c.contribution_threshold,
    }
  }
}

impl From<AggregateConfigDto> for AggregateConfig {
  fn from(d: AggregateConfigDto) -> Self {
    Self {
      time_window_days: d.time_window_days,
      contribution_threshold: d.contribution_threshold,
    }
  }
}
