use super::*;
use std::fs;

fn dirs() -> (tempfile::TempDir, PathBuf, PathBuf) {
    let root = tempfile::tempdir().unwrap();
    let core = root.path().join("core");
    let shard = root.path().join("shard");
    fs::create_dir(&core).unwrap();
    fs::create_dir(&shard).unwrap();
    (root, core, shard)
}

#[test]
fn test_new_stores_paths_unchanged() {
    let (_root, core, shard) = dirs();
    let paths = MigrationPaths::new(&core, &shard).unwrap();
    assert_eq!(paths.core_path(), core.as_path());
    assert_eq!(paths.shard_path(), shard.as_path());
    // Reading twice yields the same value
    assert_eq!(paths.core_path(), paths.core_path());
}

#[test]
fn test_all_constructor_forms_agree() {
    let (_root, core, shard) = dirs();
    let a = MigrationPaths::new(&core, &shard).unwrap();
    let b = MigrationPaths::from_strs(core.to_str().unwrap(), shard.to_str().unwrap()).unwrap();
    let c = MigrationPaths::from_options(Some(core.clone()), Some(shard.clone())).unwrap();
    assert_eq!(a, b);
    assert_eq!(b, c);
}

#[test]
fn test_missing_path_fails_in_every_form() {
    let (root, _core, shard) = dirs();
    let missing = root.path().join("nope");

    let err = MigrationPaths::new(&missing, &shard).unwrap_err();
    assert!(matches!(err, CoreError::PathNotFound { .. }));
    assert!(err.to_string().contains("must exist"));

    let err =
        MigrationPaths::from_strs(missing.to_str().unwrap(), shard.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, CoreError::PathNotFound { .. }));

    let err = MigrationPaths::from_options(Some(shard.clone()), Some(missing.clone())).unwrap_err();
    assert!(matches!(err, CoreError::PathNotFound { .. }));
}

#[test]
fn test_file_instead_of_directory_fails_in_every_form() {
    let (root, core, _shard) = dirs();
    let file = root.path().join("V1__init.sql");
    fs::write(&file, "SELECT 1;").unwrap();

    let err = MigrationPaths::new(&core, &file).unwrap_err();
    assert!(matches!(err, CoreError::NotADirectory { .. }));
    assert!(err.to_string().contains("is not a directory"));

    let err =
        MigrationPaths::from_strs(file.to_str().unwrap(), core.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, CoreError::NotADirectory { .. }));

    let err = MigrationPaths::from_options(Some(core.clone()), Some(file.clone())).unwrap_err();
    assert!(matches!(err, CoreError::NotADirectory { .. }));
}

#[test]
fn test_absent_path_fails_in_every_form() {
    let (_root, core, shard) = dirs();

    let err = MigrationPaths::new("", &shard).unwrap_err();
    assert!(matches!(
        err,
        CoreError::PathNotProvided {
            which: "core migrations folder"
        }
    ));

    let err = MigrationPaths::from_strs(core.to_str().unwrap(), "").unwrap_err();
    assert!(matches!(
        err,
        CoreError::PathNotProvided {
            which: "shard migrations folder"
        }
    ));

    let err = MigrationPaths::from_options(None, Some(shard.clone())).unwrap_err();
    assert!(matches!(err, CoreError::PathNotProvided { .. }));
    let err = MigrationPaths::from_options(Some(core), None).unwrap_err();
    assert!(err.is_configuration_error());
}

#[test]
fn test_core_is_checked_before_shard() {
    let root = tempfile::tempdir().unwrap();
    let err = MigrationPaths::new(root.path().join("a"), root.path().join("b")).unwrap_err();
    let expected = format!("'{}'", root.path().join("a").display());
    assert!(err.to_string().contains(&expected));
}
