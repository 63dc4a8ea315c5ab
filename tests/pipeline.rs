use std::collections::BTreeSet;

use fds_core::{run_all, Commit, PipelineConfig};

fn commit(author: &str, ts: i64, dirs: &[&str], subject: &str, ins: u64, del: u64, is_merge: bool) -> Commit {
  Commit {
    hash: format!("{author}-{ts}"),
    author_email: author.to_string(),
    commit_ts_utc: ts,
    dt_prev_commit_sec: None,
    dt_prev_author_sec: None,
    files_changed: 1,
    insertions: ins,
    deletions: del,
    is_merge,
    dirs_touched: dirs.iter().map(|s| s.to_string()).collect(),
    file_types: BTreeSet::new(),
    msg_subject: subject.to_string(),
  }
}

#[test]
fn solo_developer_session_produces_a_single_batch_and_author() {
  let commits = vec![
    commit("dev@example.com", 0, &["src"], "add endpoint", 40, 0, false),
    commit("dev@example.com", 600, &["src"], "wire handler", 20, 0, false),
  ];

  let out = run_all(&commits, &PipelineConfig::default()).unwrap();

  assert_eq!(out.batch_count, 1);
  assert_eq!(out.developers.len(), 1);
  assert_eq!(out.developers[0].author_email, "dev@example.com");
  assert_eq!(out.developers[0].commit_count, 2);
}

#[test]
fn merge_commit_starts_a_new_batch_when_configured() {
  let mut cfg = PipelineConfig::default();
  cfg.cluster.break_on_merge = true;
  cfg.cluster.gap = f64::MAX;

  let commits = vec![
    commit("dev@example.com", 0, &["src"], "work", 10, 0, false),
    commit("dev@example.com", 60, &["src"], "merge branch", 0, 0, true),
    commit("dev@example.com", 120, &["src"], "more work", 10, 0, false),
  ];

  let out = run_all(&commits, &cfg).unwrap();
  assert_eq!(out.batch_count, 2);
}

#[test]
fn author_change_starts_a_new_batch_when_configured() {
  let mut cfg = PipelineConfig::default();
  cfg.cluster.break_on_author = true;
  cfg.cluster.gap = f64::MAX;

  let commits = vec![
    commit("a@example.com", 0, &["src"], "work", 10, 0, false),
    commit("b@example.com", 60, &["src"], "more work", 10, 0, false),
  ];

  let out = run_all(&commits, &cfg).unwrap();
  assert_eq!(out.batch_count, 2);
  assert_eq!(out.developers.len(), 2);
}

#[test]
fn vendor_path_commits_contribute_little_to_fds() {
  let commits = vec![
    commit("a@example.com", 0, &["src/app"], "add feature", 100, 0, false),
    commit(
      "b@example.com",
      100_000,
      &["vendor/lib"],
      "bump vendored dependency",
      100,
      0,
      false,
    ),
  ];

  let out = run_all(&commits, &PipelineConfig::default()).unwrap();

  let a = out.developers.iter().find(|d| d.author_email == "a@example.com");
  let b = out.developers.iter().find(|d| d.author_email == "b@example.com");

  match (a, b) {
    (Some(a), Some(b)) => assert!(a.fds >= b.fds),
    (Some(_), None) => (), // b's contribution was filtered out entirely, which is consistent
    _ => panic!("expected at least author a to be present"),
  }
}

#[test]
fn security_fix_outweighs_a_comparable_doc_change() {
  let commits = vec![
    commit(
      "a@example.com",
      0,
      &["src/auth"],
      "fix security vulnerability in session handling",
      40,
      0,
      false,
    ),
    commit("b@example.com", 200_000, &["docs"], "update readme", 40, 0, false),
  ];

  let out = run_all(&commits, &PipelineConfig::default()).unwrap();

  let a = out.developers.iter().find(|d| d.author_email == "a@example.com").unwrap();
  let b = out.developers.iter().find(|d| d.author_email == "b@example.com").unwrap();

  assert!(a.fds > b.fds);
}

#[test]
fn many_small_commits_from_one_author_cluster_into_few_batches() {
  let mut commits = Vec::new();
  for i in 0..20 {
    commits.push(commit(
      "prolific@example.com",
      i * 120,
      &["src"],
      "small change",
      2,
      0,
      false,
    ));
  }

  let out = run_all(&commits, &PipelineConfig::default()).unwrap();
  assert!(out.batch_count < commits.len());
  assert_eq!(out.developers.len(), 1);
  assert_eq!(out.developers[0].commit_count, 20);
}

#[test]
fn output_is_deterministic_across_repeated_runs() {
  let commits = vec![
    commit("a@example.com", 0, &["src/a"], "add feature", 40, 0, false),
    commit("b@example.com", 500, &["src/b"], "fix bug", 15, 5, false),
    commit("a@example.com", 1000, &["src/a", "src/b"], "wire modules", 30, 0, false),
  ];

  let out1 = run_all(&commits, &PipelineConfig::default()).unwrap();
  let out2 = run_all(&commits, &PipelineConfig::default()).unwrap();

  assert_eq!(out1.developers.len(), out2.developers.len());
  for (a, b) in out1.developers.iter().zip(out2.developers.iter()) {
    assert_eq!(a.author_email, b.author_email);
    assert!((a.fds - b.fds).abs() < 1e-12);
  }
}
