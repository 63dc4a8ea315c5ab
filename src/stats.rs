// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Robust statistics shared by the preprocessor, effort, importance, and aggregator stages
// role: leaf utility
// outputs: median, MAD-Z normalization, Shannon entropy, safe_log
// invariants:
// - mad_z never produces NaN: a zero MAD short-circuits to a vector of zeros
// - mad_z output is always clipped to [-3, 3]
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

/// Median of a slice. Not sensitive to input order (sorts a copy).
pub fn median(values: &[f64]) -> f64 {
  if values.is_empty() {
    return 0.0;
  }

  let mut sorted = values.to_vec();
  sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

  let mid = sorted.len() / 2;

  if sorted.len() % 2 == 0 {
    (sorted[mid - 1] + sorted[mid]) / 2.0
  } else {
    sorted[mid]
  }
}

/// Median absolute deviation around `center`.
pub fn mad(values: &[f64], center: f64) -> f64 {
  let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
  median(&deviations)
}

/// MAD-Z robust z-score: `clip((x - median) / (1.4826 * MAD), -3, 3)`.
///
/// A degenerate (zero-MAD) distribution returns all zeros rather than NaN
/// (a degenerate, constant input).
pub fn mad_z(values: &[f64]) -> Vec<f64> {
  if values.is_empty() {
    return Vec::new();
  }

  let med = median(values);
  let m = mad(values, med);

  if m == 0.0 {
    return vec![0.0; values.len()];
  }

  values
    .iter()
    .map(|v| ((v - med) / (1.4826 * m)).clamp(-3.0, 3.0))
    .collect()
}

/// Shannon entropy (base 2 by default) of a distribution given as raw (non-negative)
/// weights; weights are normalized to probabilities internally. Zero weights are
/// dropped before normalizing, matching `entropy()` in the source's
/// `mad_normalization.py`.
pub fn entropy(weights: &[f64], base: f64) -> f64 {
  let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();

  if total <= 0.0 {
    return 0.0;
  }

  let h: f64 = weights
    .iter()
    .filter(|w| **w > 0.0)
    .map(|w| {
      let p = w / total;
      p * p.log2()
    })
    .sum::<f64>()
    * -1.0;

  if base == 2.0 { h } else { h / (base.ln() / 2f64.ln()) }
}

/// `log(1 + max(0, x))`, matching `safe_log` in the source.
pub fn safe_log(x: f64) -> f64 {
  x.max(0.0).ln_1p()
}
