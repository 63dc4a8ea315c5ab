// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Typed error taxonomy for the FDS core (invalid config / invalid record)
// role: error/types
// outputs: Error enum, Result alias used by every stage
// invariants:
// - EmptyInput and NumericDegenerate are not errors: handled locally as empty/zero results
// - validation happens before any data is touched so earlier stages' outputs remain valid
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use thiserror::Error;

/// Errors surfaced at a stage boundary. The pipeline never retries and never logs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
  #[error("invalid config: {0}")]
  InvalidConfig(String),

  #[error("invalid record: {0}")]
  InvalidRecord(String),
}

pub type Result<T> = std::result::Result<T, Error>;
