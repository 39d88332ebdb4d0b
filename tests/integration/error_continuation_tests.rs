use dupsift::duplicates::{DuplicateFinder, FinderConfig, FinderError, GroupVerdict, RunMode};
use dupsift::scanner::{FileRecord, HashError, ScanError};
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;
use tempfile::tempdir;

#[test]
fn test_missing_files_are_soft_errors() {
    let finder = DuplicateFinder::with_defaults();
    let file1 = FileRecord::new(PathBuf::from("nonexistent_1.txt"), 100, SystemTime::now());
    let file2 = FileRecord::new(PathBuf::from("nonexistent_2.txt"), 100, SystemTime::now());

    let report = finder
        .find_duplicates_from_records(vec![file1, file2])
        .unwrap();

    assert!(report.groups.is_empty());
    assert_eq!(report.errors.len(), 2);
    assert_eq!(report.summary.soft_errors, 2);
    assert_eq!(report.summary.prefix_hashed, 0);

    for err in &report.errors {
        match err {
            ScanError::Hash(HashError::NotFound(_)) => {}
            other => panic!("Expected NotFound HashError, got: {:?}", other),
        }
    }
}

#[test]
fn test_failure_does_not_abort_siblings() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, b"123456789").unwrap();
    fs::write(&b, b"123456789").unwrap();
    let gone = dir.path().join("gone");

    let records = vec![
        FileRecord::new(a.clone(), 9, SystemTime::now()),
        FileRecord::new(gone, 9, SystemTime::now()),
        FileRecord::new(b.clone(), 9, SystemTime::now()),
    ];
    let report = DuplicateFinder::with_defaults()
        .find_duplicates_from_records(records)
        .unwrap();

    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].len(), 2);
    assert_eq!(report.errors.len(), 1);
    // hashed + failed == attempted
    assert_eq!(report.summary.prefix_hashed + report.summary.soft_errors, 3);
}

#[test]
fn test_file_removed_before_verify_is_failed_member() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    fs::write(&a, b"abcd").unwrap();
    let missing = dir.path().join("missing");
    let mtime = SystemTime::UNIX_EPOCH;

    let mode = RunMode::from_flags(true, true, false).unwrap();
    let finder = DuplicateFinder::new(FinderConfig::default().with_mode(mode));
    let report = finder
        .find_duplicates_from_records(vec![
            FileRecord::new(a, 4, mtime),
            FileRecord::new(missing, 4, mtime),
        ])
        .unwrap();

    let verification = report.verification.unwrap();
    assert_eq!(verification.failed, 1);
    assert_eq!(verification.groups[0].verdict, GroupVerdict::Inconclusive);
    assert_eq!(verification.error_rate(), 0.0);
    assert_eq!(report.errors.len(), 1);
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    let locked = dir.path().join("locked");
    fs::write(&a, b"same").unwrap();
    fs::write(&b, b"same").unwrap();
    fs::write(&locked, b"same").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can read anything; nothing to test then.
    if fs::read(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
        return;
    }

    let report = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].len(), 2);
    assert_eq!(report.errors.len(), 1);
    assert!(matches!(
        report.errors[0],
        ScanError::Hash(HashError::PermissionDenied(_))
    ));
}

#[test]
fn test_root_must_be_directory() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("plain");
    fs::write(&file, b"x").unwrap();

    let err = DuplicateFinder::with_defaults()
        .find_duplicates(&file)
        .unwrap_err();
    assert!(matches!(err, FinderError::NotADirectory(_)));
}
