// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Entrypoint; parse CLI, read commits, run the pipeline, print JSON
// role: entrypoint/orchestrator
// inputs: CLI flags (see crate::cli::Cli)
// outputs: PipelineOutput JSON to stdout or --out
// errors: Bubbles up read/parse/pipeline errors with context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use anyhow::Result;
use clap::Parser;

mod cli;

use crate::cli::Cli;

fn main() -> Result<()> {
  let cli = Cli::parse();

  let commits = cli::read_commits(&cli)?;
  eprintln!("[fds] loaded {} commit(s)", commits.len());

  let pipeline_cfg = cli::build_pipeline_config(&cli);

  eprintln!("[fds] running pipeline...");
  let output = fds_core::run_all(&commits, &pipeline_cfg)?;
  eprintln!(
    "[fds] {} batch(es), {} developer(s) above threshold",
    output.batch_count,
    output.developers.len()
  );

  let body = if cli.pretty {
    serde_json::to_string_pretty(&output)?
  } else {
    serde_json::to_string(&output)?
  };

  cli::write_output(&cli, &body)
}
