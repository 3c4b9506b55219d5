use babirusa_builder::discovery::{MANIFEST_FILE_NAME, PlatformFilter, discover_targets};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

fn write_manifest(root: &Path, relative_dir: &str) {
    let dir = root.join(relative_dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(MANIFEST_FILE_NAME), "FROM alpine\n").unwrap();
}

fn platforms(root: &Path, filter: PlatformFilter) -> BTreeSet<String> {
    discover_targets(root, filter)
        .unwrap()
        .map(|target| target.platform().to_string())
        .collect()
}

#[test]
fn test_one_target_per_manifest_at_any_depth() {
    let root = tempfile::tempdir().unwrap();
    write_manifest(root.path(), "linux");
    write_manifest(root.path(), "apple/darwin");
    write_manifest(root.path(), "bsd/free/amd64");

    let targets: Vec<_> = discover_targets(root.path(), PlatformFilter::default())
        .unwrap()
        .collect();

    assert_eq!(targets.len(), 3);
    for target in &targets {
        assert!(target.manifest_path().ends_with(MANIFEST_FILE_NAME));
        assert_eq!(
            target.manifest_path().parent().unwrap().file_name().unwrap(),
            target.platform()
        );
    }

    let expected: BTreeSet<String> = ["linux", "darwin", "amd64"]
        .iter()
        .map(|p| p.to_string())
        .collect();
    assert_eq!(platforms(root.path(), PlatformFilter::default()), expected);
}

#[test]
fn test_allow_list_filters_platforms() {
    let root = tempfile::tempdir().unwrap();
    for platform in ["A", "B", "C", "D"] {
        write_manifest(root.path(), platform);
    }

    let found = platforms(root.path(), PlatformFilter::new(["A", "C"]));
    let expected: BTreeSet<String> = ["A", "C"].iter().map(|p| p.to_string()).collect();
    assert_eq!(found, expected);
}

#[test]
fn test_empty_allow_list_means_all() {
    let root = tempfile::tempdir().unwrap();
    write_manifest(root.path(), "linux");
    write_manifest(root.path(), "darwin");

    let filter = PlatformFilter::new(Vec::<String>::new());
    assert_eq!(platforms(root.path(), filter).len(), 2);
}

#[test]
fn test_only_regular_files_with_exact_name_qualify() {
    let root = tempfile::tempdir().unwrap();
    write_manifest(root.path(), "linux");

    // A directory named like the manifest is not a manifest
    fs::create_dir_all(root.path().join("windows").join(MANIFEST_FILE_NAME)).unwrap();

    // Near-miss file names are ignored
    let musl = root.path().join("musl");
    fs::create_dir_all(&musl).unwrap();
    fs::write(musl.join("Dockerfile.dev"), "FROM alpine\n").unwrap();
    fs::write(musl.join("dockerfile"), "FROM alpine\n").unwrap();

    let found = platforms(root.path(), PlatformFilter::default());
    assert_eq!(found.len(), 1);
    assert!(found.contains("linux"));
}

#[test]
fn test_no_manifests_yields_nothing() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("docs")).unwrap();

    assert!(platforms(root.path(), PlatformFilter::default()).is_empty());
}

#[test]
fn test_tags_follow_release_scheme() {
    let root = tempfile::tempdir().unwrap();
    write_manifest(root.path(), "linux");

    let target = discover_targets(root.path(), PlatformFilter::default())
        .unwrap()
        .next()
        .unwrap();

    assert_eq!(target.release_tag("8.1"), "php-linux-v8.1");
}

#[test]
fn test_relative_root_names_platform_after_directory() {
    let root = tempfile::tempdir().unwrap();
    write_manifest(root.path(), "linux");
    write_manifest(root.path(), "linux/arm64");

    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(root.path().join("linux")).unwrap();
    let found = platforms(Path::new("."), PlatformFilter::default());
    std::env::set_current_dir(previous).unwrap();

    let expected: BTreeSet<String> = ["linux", "arm64"].iter().map(|p| p.to_string()).collect();
    assert_eq!(found, expected);
}

#[cfg(unix)]
#[test]
fn test_unreadable_subtree_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    struct RestorePermissions(std::path::PathBuf);

    impl Drop for RestorePermissions {
        fn drop(&mut self) {
            let _ = fs::set_permissions(&self.0, fs::Permissions::from_mode(0o755));
        }
    }

    let root = tempfile::tempdir().unwrap();
    write_manifest(root.path(), "linux");
    write_manifest(root.path(), "darwin");
    write_manifest(root.path(), "locked/windows");

    let locked = root.path().join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    let _restore = RestorePermissions(locked);

    let found = platforms(root.path(), PlatformFilter::default());

    // Privileged users can still read the locked directory
    assert!(found.contains("linux"));
    assert!(found.contains("darwin"));
    assert!(found.len() <= 3);
}
