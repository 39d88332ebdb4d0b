use dupsift::duplicates::{DuplicateFinder, FinderConfig, GroupVerdict, RunMode};
use dupsift::scanner::WalkerConfig;
use filetime::{set_file_mtime, FileTime};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn pin_mtime(path: &Path, secs: i64) {
    set_file_mtime(path, FileTime::from_unix_time(secs, 0)).unwrap();
}

fn path_set(paths: &[PathBuf]) -> HashSet<PathBuf> {
    paths.iter().cloned().collect()
}

fn mode(quickstat: bool, verify: bool, dump_tainted: bool) -> RunMode {
    RunMode::from_flags(quickstat, verify, dump_tainted).unwrap()
}

#[test]
fn test_scenario_a_two_of_three_match() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a", b"XXXXXXXXXX");
    let b = write(dir.path(), "b", b"XXXXXXXXXX");
    write(dir.path(), "c", b"YYYYYYYYYY");

    let report = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(report.groups.len(), 1);
    assert_eq!(path_set(&report.groups[0].paths()), path_set(&[a, b]));
    assert_eq!(report.groups[0].size, 10);
    assert_eq!(report.summary.files_observed, 3);
    assert_eq!(report.summary.size_candidates, 3);
    assert_eq!(report.summary.duplicate_files, 1);
    assert_eq!(report.summary.reclaimable_space, 10);
    assert!(report.errors.is_empty());
}

#[test]
fn test_scenario_b_shared_head_diverges_at_full_hash() {
    let dir = tempdir().unwrap();
    let len = 5 * 1024 * 1024;
    let mut first = vec![0x5au8; len];
    let mut second = first.clone();
    first[len - 1] = 1;
    second[len - 1] = 2;
    write(dir.path(), "one.bin", &first);
    write(dir.path(), "two.bin", &second);

    let config = FinderConfig::default().with_pieces(256 * 1024, 1);
    let report = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(report.summary.prefix_hashed, 2);
    assert_eq!(report.summary.prefix_candidates, 2);
    assert_eq!(report.summary.full_hashed, 2);
    assert_eq!(report.summary.full_reused, 0);
    assert_eq!(report.summary.duplicate_groups, 0);
    assert!(report.groups.is_empty());
}

#[test]
fn test_scenario_c_empty_directory() {
    let dir = tempdir().unwrap();

    let report = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert!(report.groups.is_empty());
    assert_eq!(report.summary.files_observed, 0);
    assert_eq!(report.summary.duplicate_groups, 0);
    assert_eq!(report.summary.total_duplicates, 0);
}

#[test]
fn test_scenario_d_verify_marks_group_tainted() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a", b"same-size-1");
    let b = write(dir.path(), "b", b"same-size-2");
    pin_mtime(&a, 1_600_000_000);
    pin_mtime(&b, 1_600_000_000);

    let config = FinderConfig::default().with_mode(mode(true, true, false));
    let report = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(report.presumed.len(), 1);
    let verification = report.verification.expect("verification ran");
    assert_eq!(verification.groups.len(), 1);
    assert_eq!(verification.groups[0].verdict, GroupVerdict::Tainted);
    assert_eq!(verification.verified_bad, 1);
    assert_eq!(verification.verified_ok, 0);
    assert!((verification.error_rate() - 1.0).abs() < f64::EPSILON);
    assert!(verification.groups[0].fingerprints.is_none());
}

#[test]
fn test_verification_accuracy_counts_disagreeing_members() {
    let dir = tempdir().unwrap();
    // Five metadata-equivalent files, three of which share content.
    let names = ["f1", "f2", "f3", "f4", "f5"];
    let contents: [&[u8]; 5] = [b"shared!", b"shared!", b"shared!", b"other-1", b"other-2"];
    for (name, content) in names.iter().zip(contents) {
        let path = write(dir.path(), name, content);
        pin_mtime(&path, 1_500_000_000);
    }

    let config = FinderConfig::default().with_mode(mode(true, true, true));
    let report = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    let verification = report.verification.unwrap();
    assert_eq!(verification.groups.len(), 1);
    let group = &verification.groups[0];
    assert_eq!(group.verdict, GroupVerdict::Tainted);
    assert_eq!(verification.verified_ok, 2);
    assert_eq!(verification.verified_bad, 2);
    assert_eq!(group.fingerprints.as_ref().map(|f| f.len()), Some(5));
}

#[test]
fn test_verify_clean_group() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a", b"identical");
    let b = write(dir.path(), "b", b"identical");
    pin_mtime(&a, 1_234_567_890);
    pin_mtime(&b, 1_234_567_890);

    let config = FinderConfig::default().with_mode(mode(true, true, false));
    let report = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    let verification = report.verification.unwrap();
    assert_eq!(verification.count(GroupVerdict::Clean), 1);
    assert_eq!(verification.verified_ok, 1);
    assert_eq!(verification.error_rate(), 0.0);
}

#[test]
fn test_quickstat_presumes_without_hashing_members() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a", b"0123456789");
    let b = write(dir.path(), "b", b"9876543210");
    pin_mtime(&a, 1_000_000_000);
    pin_mtime(&b, 1_000_000_000);

    let config = FinderConfig::default().with_mode(mode(true, false, false));
    let report = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    // Content differs, but quickstat only looks at metadata.
    assert_eq!(report.presumed.len(), 1);
    assert_eq!(report.presumed[0].len(), 2);
    assert!(report.groups.is_empty());
    assert!(report.verification.is_none());
    assert_eq!(report.summary.prefix_hashed, 0);
    assert_eq!(report.summary.known_duplicates, 1);
    assert_eq!(report.summary.total_duplicates, 1);
}

#[test]
fn test_quickstat_residue_is_still_hashed() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a", b"same bytes");
    let b = write(dir.path(), "b", b"same bytes");
    let c = write(dir.path(), "c", b"same bytes");
    pin_mtime(&a, 1_000_000_000);
    pin_mtime(&b, 1_000_000_000);
    pin_mtime(&c, 1_100_000_000);

    let config = FinderConfig::default().with_mode(mode(true, false, false));
    let report = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    // {a, b} are presumed; the representative a is hashed against c.
    assert_eq!(report.presumed.len(), 1);
    assert_eq!(report.groups.len(), 1);
    assert_eq!(path_set(&report.groups[0].paths()), path_set(&[a, c]));
    assert_eq!(report.summary.known_duplicates, 1);
    assert_eq!(report.summary.duplicate_files, 1);
    assert_eq!(report.summary.total_duplicates, 2);
}

#[test]
fn test_short_files_reuse_prefix_fingerprint() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"tiny");
    write(dir.path(), "b", b"tiny");

    let report = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.summary.full_reused, 2);
}

#[test]
fn test_min_size_excludes_small_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "small1", b"abc");
    write(dir.path(), "small2", b"abc");
    write(dir.path(), "empty1", b"");
    write(dir.path(), "empty2", b"");

    let config = FinderConfig::default().with_min_size(4);
    let report = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert!(report.groups.is_empty());
    assert_eq!(report.summary.below_min_size, 4);
    assert_eq!(report.summary.size_candidates, 0);
}

#[test]
fn test_default_min_size_skips_empty_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "empty1", b"");
    write(dir.path(), "empty2", b"");

    let report = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert!(report.groups.is_empty());
    assert_eq!(report.summary.below_min_size, 2);
}

#[test]
fn test_nested_duplicates_are_found() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("nested").join("deeper");
    fs::create_dir_all(&sub).unwrap();
    let top = write(dir.path(), "top.txt", b"nested content");
    let deep = write(&sub, "deep.txt", b"nested content");

    let report = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(report.groups.len(), 1);
    assert_eq!(path_set(&report.groups[0].paths()), path_set(&[top, deep]));
}

#[test]
fn test_limit_stops_traversal() {
    let dir = tempdir().unwrap();
    for i in 0..10 {
        write(dir.path(), &format!("file{i:02}"), b"duplicate");
    }

    let config = FinderConfig::default().with_walker_config(WalkerConfig::new(false, Some(4)));
    let report = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert!(report.summary.limit_reached);
    assert!(report.summary.files_observed <= 4);
    let grouped: usize = report.groups.iter().map(|g| g.len()).sum();
    assert!(grouped <= 4);
}

#[test]
fn test_groups_sorted_by_reclaimable_space() {
    let dir = tempdir().unwrap();
    write(dir.path(), "s1", b"small");
    write(dir.path(), "s2", b"small");
    write(dir.path(), "l1", &[7u8; 4096]);
    write(dir.path(), "l2", &[7u8; 4096]);

    let report = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(report.groups.len(), 2);
    assert_eq!(report.groups[0].size, 4096);
    assert_eq!(report.groups[1].size, 5);
}

#[test]
fn test_idempotent_runs() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"first pair");
    write(dir.path(), "b", b"first pair");
    write(dir.path(), "c", b"second!");
    write(dir.path(), "d", b"second!");
    write(dir.path(), "e", b"lonely");

    let finder = DuplicateFinder::with_defaults();
    let first = finder.find_duplicates(dir.path()).unwrap();
    let second = finder.find_duplicates(dir.path()).unwrap();

    let sets = |groups: &[dupsift::duplicates::DuplicateGroup]| -> Vec<HashSet<PathBuf>> {
        groups.iter().map(|g| path_set(&g.paths())).collect()
    };
    assert_eq!(sets(&first.groups), sets(&second.groups));
    assert_eq!(first.summary.duplicate_files, second.summary.duplicate_files);
    assert_eq!(first.summary.prefix_hashed, second.summary.prefix_hashed);
}

#[test]
fn test_missing_root_is_an_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    let err = DuplicateFinder::with_defaults()
        .find_duplicates(&missing)
        .unwrap_err();
    assert!(matches!(
        err,
        dupsift::duplicates::FinderError::PathNotFound(_)
    ));
}

#[test]
fn test_shutdown_before_scan_is_interrupted() {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"x");
    let config = FinderConfig::default().with_shutdown_flag(Arc::new(AtomicBool::new(true)));
    let err = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap_err();
    assert!(matches!(err, dupsift::duplicates::FinderError::Interrupted));
}
