// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: CLI surface: parse flags, read a JSON commit array, run the pipeline, write JSON output
// role: cli
// inputs: CLI flags (--input/--out plus per-stage numeric overrides), JSON commit array on stdin or --input
// outputs: PipelineOutput JSON on stdout or --out
// errors: anyhow::Error with Context at the CLI boundary; typed fds_core::Error underneath
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use fds_core::{Commit, PipelineConfig};

#[derive(Parser, Debug)]
#[command(
  name = "fds-core",
  version,
  about = "Turn a clustered commit stream into per-developer Fair Developer Scores",
  long_about = None
)]
pub struct Cli {
  /// Path to a JSON array of commit records (default: stdin)
  #[arg(long)]
  pub input: Option<PathBuf>,

  /// Output location: file path, or "-" for stdout (default)
  #[arg(long, default_value = "-")]
  pub out: String,

  /// Torque clusterer: time-decay coefficient (seconds)
  #[arg(long)]
  pub alpha: Option<f64>,

  /// Torque clusterer: churn-decay coefficient
  #[arg(long)]
  pub beta: Option<f64>,

  /// Torque clusterer: gap threshold that starts a new batch
  #[arg(long)]
  pub gap: Option<f64>,

  /// Torque clusterer: always start a new batch at a merge commit
  #[arg(long)]
  pub break_on_merge: bool,

  /// Torque clusterer: always start a new batch when the author changes
  #[arg(long)]
  pub break_on_author: bool,

  /// Aggregator: trailing time window, in days
  #[arg(long)]
  pub window_days: Option<f64>,

  /// Aggregator: minimum total contribution for an author to appear in results
  #[arg(long)]
  pub contribution_threshold: Option<f64>,

  /// Pretty-print the JSON output
  #[arg(long)]
  pub pretty: bool,
}

/// Resolve CLI flags into a full `PipelineConfig`, layering overrides onto defaults.
pub fn build_pipeline_config(cli: &Cli) -> PipelineConfig {
  let mut cfg = PipelineConfig::default();

  if let Some(alpha) = cli.alpha {
    cfg.cluster.alpha = alpha;
  }
  if let Some(beta) = cli.beta {
    cfg.cluster.beta = beta;
  }
  if let Some(gap) = cli.gap {
    cfg.cluster.gap = gap;
  }
  cfg.cluster.break_on_merge = cli.break_on_merge;
  cfg.cluster.break_on_author = cli.break_on_author;

  if let Some(window_days) = cli.window_days {
    cfg.aggregate.time_window_days = window_days;
  }
  if let Some(threshold) = cli.contribution_threshold {
    cfg.aggregate.contribution_threshold = threshold;
  }

  cfg
}

/// Read the commit array from `--input` or stdin.
pub fn read_commits(cli: &Cli) -> Result<Vec<Commit>> {
  let raw = match &cli.input {
    Some(path) => fs::read_to_string(path).with_context(|| format!("reading commits from {}", path.display()))?,
    None => {
      let mut buf = String::new();
      io::stdin()
        .read_to_string(&mut buf)
        .context("reading commits from stdin")?;
      buf
    }
  };

  serde_json::from_str(&raw).context("parsing commit array as JSON")
}

/// Write `body` to `--out`, or stdout when it is "-".
pub fn write_output(cli: &Cli, body: &str) -> Result<()> {
  if cli.out == "-" {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(body.as_bytes())?;
    handle.write_all(b"\n")?;
    return Ok(());
  }

  fs::write(&cli.out, body).with_context(|| format!("writing output to {}", cli.out))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn base_cli() -> Cli {
    Cli {
      input: None,
      out: "-".into(),
      alpha: None,
      beta: None,
      gap: None,
      break_on_merge: false,
      break_on_author: false,
      window_days: None,
      contribution_threshold: None,
      pretty: false,
    }
  }

  #[test]
  fn flag_overrides_replace_defaults() {
    let mut cli = base_cli();
    cli.alpha = Some(2.0);
    cli.gap = Some(900.0);
    cli.break_on_merge = true;
    cli.window_days = Some(30.0);

    let cfg = build_pipeline_config(&cli);
    assert_eq!(cfg.cluster.alpha, 2.0);
    assert_eq!(cfg.cluster.gap, 900.0);
    assert!(cfg.cluster.break_on_merge);
    assert_eq!(cfg.aggregate.time_window_days, 30.0);
  }

  #[test]
  fn unset_flags_keep_stage_defaults() {
    let cli = base_cli();
    let cfg = build_pipeline_config(&cli);
    let default_cfg = PipelineConfig::default();
    assert_eq!(cfg.cluster.alpha, default_cfg.cluster.alpha);
    assert_eq!(cfg.aggregate.time_window_days, default_cfg.aggregate.time_window_days);
  }
}
