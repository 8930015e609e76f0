mod common;

use common::{file_handle, write_csv, Calls, FakePlatform, MOUNTED_FILE};
use pipeline_stages::domain::model::{DatasetKind, ExecutionMode, InputDataset};
use pipeline_stages::{DatasetResolver, PipelineError};
use tempfile::TempDir;

#[tokio::test]
async fn test_local_file_dataset_is_mounted_to_existing_dir() {
    let platform = FakePlatform::offline().with_file("images");
    let resolver = DatasetResolver::new(&platform);

    let resolved = resolver.resolve("images", ExecutionMode::Local).await.unwrap();

    let mount_path = resolved.mount_path().unwrap().to_path_buf();
    assert!(!mount_path.as_os_str().is_empty());
    assert!(mount_path.is_dir());
    assert!(mount_path.join(MOUNTED_FILE).is_file());
    assert!(resolved.is_mounted_here());
    assert_eq!(resolved.dataset.as_ref().unwrap().kind(), DatasetKind::File);
    assert_eq!(Calls::get(&platform.calls.mount), 1);

    drop(resolved);
    assert_eq!(Calls::get(&platform.calls.stop), 1);
    assert!(!mount_path.exists());
}

#[tokio::test]
async fn test_each_local_mount_gets_a_fresh_directory() {
    let platform = FakePlatform::offline().with_file("images");
    let resolver = DatasetResolver::new(&platform);

    let first = resolver.resolve("images", ExecutionMode::Local).await.unwrap();
    let second = resolver.resolve("images", ExecutionMode::Local).await.unwrap();

    assert_ne!(first.mount_path(), second.mount_path());
}

#[tokio::test]
async fn test_release_stops_mount() {
    let platform = FakePlatform::offline().with_file("images");
    let resolved = DatasetResolver::new(&platform)
        .resolve("images", ExecutionMode::Local)
        .await
        .unwrap();
    let mount_path = resolved.mount_path().unwrap().to_path_buf();

    resolved.release().unwrap();

    assert_eq!(Calls::get(&platform.calls.stop), 1);
    assert!(!mount_path.exists());
}

#[tokio::test]
async fn test_local_tabular_dataset_has_no_mount_path() {
    let temp_dir = TempDir::new().unwrap();
    let csv = write_csv(temp_dir.path(), "iris.csv", "a,b\n1,2\n");
    let platform = FakePlatform::offline().with_tabular("iris", &csv);

    let resolved = DatasetResolver::new(&platform)
        .resolve("iris", ExecutionMode::Local)
        .await
        .unwrap();

    assert!(resolved.mount_path().is_none());
    assert!(!resolved.is_mounted_here());
    assert_eq!(resolved.dataset.unwrap().kind(), DatasetKind::Tabular);
    assert_eq!(Calls::get(&platform.calls.mount), 0);
}

#[tokio::test]
async fn test_managed_mounted_path_is_returned_verbatim() {
    let temp_dir = TempDir::new().unwrap();
    let mounted = temp_dir.path().join("mnt").join("images");
    std::fs::create_dir_all(&mounted).unwrap();
    std::fs::write(mounted.join("1.png"), b"png").unwrap();

    let platform = FakePlatform::managed(vec![(
        "images",
        InputDataset::MountedPath(mounted.clone()),
    )]);

    let resolved = DatasetResolver::new(&platform)
        .resolve("images", ExecutionMode::Managed)
        .await
        .unwrap();

    assert_eq!(resolved.mount_path(), Some(mounted.as_path()));
    assert!(resolved.dataset.is_none());
    assert!(!resolved.is_mounted_here());
    assert_eq!(Calls::get(&platform.calls.mount), 0);
    assert_eq!(Calls::get(&platform.calls.workspace), 0);

    // Platform-owned mounts survive release.
    resolved.release().unwrap();
    assert!(mounted.join("1.png").is_file());
}

#[tokio::test]
async fn test_managed_dataset_object_is_not_mounted() {
    let platform = FakePlatform::managed(vec![(
        "images",
        InputDataset::Dataset(file_handle("images")),
    )]);

    let resolved = DatasetResolver::new(&platform)
        .resolve("images", ExecutionMode::Managed)
        .await
        .unwrap();

    assert_eq!(resolved.dataset.as_ref().unwrap().name(), "images");
    assert!(resolved.mount_path().is_none());
    assert_eq!(Calls::get(&platform.calls.mount), 0);
}

#[tokio::test]
async fn test_managed_registered_input_is_looked_up_on_request() {
    let platform = FakePlatform::managed(vec![(
        "images",
        InputDataset::Registered("images-v2".to_string()),
    )])
    .with_file("images-v2");

    let resolved = DatasetResolver::new(&platform)
        .resolve("images", ExecutionMode::Managed)
        .await
        .unwrap();

    assert_eq!(resolved.dataset.as_ref().unwrap().name(), "images-v2");
    assert!(resolved.mount_path().is_none());
    assert_eq!(Calls::get(&platform.calls.resolve), 1);
    assert_eq!(Calls::get(&platform.calls.workspace), 0);
    assert_eq!(Calls::get(&platform.calls.mount), 0);
}

#[tokio::test]
async fn test_managed_undeclared_input_is_not_found() {
    let platform = FakePlatform::managed(vec![]);

    let err = DatasetResolver::new(&platform)
        .resolve("images", ExecutionMode::Managed)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::DatasetNotFoundError { ref name, .. } if name == "images"));
}

#[tokio::test]
async fn test_managed_mode_without_run_fails() {
    let platform = FakePlatform::offline().with_file("images");

    let err = DatasetResolver::new(&platform)
        .resolve("images", ExecutionMode::Managed)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::RunContextError { .. }));
}

#[tokio::test]
async fn test_empty_name_fails_before_platform_calls() {
    let platform = FakePlatform::offline().with_file("images");

    for name in ["", "  "] {
        let err = DatasetResolver::new(&platform)
            .resolve(name, ExecutionMode::Local)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfigValueError { ref field, .. } if field == "input_dataset"));
    }
    assert_eq!(Calls::get(&platform.calls.workspace), 0);
    assert_eq!(Calls::get(&platform.calls.resolve), 0);
}

#[tokio::test]
async fn test_offline_without_workspace_config_fails() {
    let platform = FakePlatform::offline().with_file("images").without_workspace();

    let err = DatasetResolver::new(&platform)
        .resolve("images", ExecutionMode::Local)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::WorkspaceNotFoundError { .. }));
    assert_eq!(Calls::get(&platform.calls.resolve), 0);
}

#[tokio::test]
async fn test_offline_unknown_dataset_fails() {
    let platform = FakePlatform::offline();

    let err = DatasetResolver::new(&platform)
        .resolve("missing", ExecutionMode::Local)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::DatasetNotFoundError { .. }));
}
