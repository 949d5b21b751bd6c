//! Save/resolve behaviour of the filesystem repository.

mod common;

use bytes::Bytes;
use common::{TestRepository, backdate, payload, seeded_bytes};
use courier_core::Criteria;
use courier_storage::{ArtifactRepository, StorageError};
use std::time::Duration;

#[tokio::test]
async fn flat_payload_resolves_by_owner_and_name() {
    let t = TestRepository::new().await;
    let data = seeded_bytes(1, 4096);

    t.repo
        .save(&payload("alice", None, "app.apk", data.clone()))
        .await
        .unwrap();

    let artifact = t
        .repo
        .resolve(&Criteria::new("app.apk", "alice", None).unwrap())
        .await
        .unwrap();
    assert_eq!(artifact.name(), "app.apk");
    assert_eq!(artifact.identity().owner_folder(), "alice");
    assert_eq!(artifact.content_type(), "application/zip");
    assert_eq!(artifact.contents().await.unwrap(), data);
}

#[tokio::test]
async fn nested_artifact_is_not_visible_without_folder() {
    let t = TestRepository::new().await;

    t.repo
        .save(&payload("bob", Some("ios"), "t.zip", seeded_bytes(2, 64)))
        .await
        .unwrap();

    let err = t
        .repo
        .resolve(&Criteria::new("t.zip", "bob", None).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)), "got {err:?}");

    let err = t
        .repo
        .resolve(&Criteria::new("t.zip", "ios", None).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)), "got {err:?}");

    let artifact = t
        .repo
        .resolve(&Criteria::new("t.zip", "bob", Some("ios".into())).unwrap())
        .await
        .unwrap();
    assert_eq!(artifact.identity().parent_folder(), Some("bob"));
}

#[tokio::test]
async fn folder_and_flat_uploads_do_not_collide() {
    let t = TestRepository::new().await;
    let nested = seeded_bytes(3, 128);
    let flat = seeded_bytes(4, 128);

    let a = t
        .repo
        .save(&payload("bob", Some("ios"), "t.zip", nested.clone()))
        .await
        .unwrap();
    let b = t
        .repo
        .save(&payload("bob", None, "t.zip", flat.clone()))
        .await
        .unwrap();
    assert_ne!(a.identity(), b.identity());

    let nested_artifact = t
        .repo
        .resolve(&Criteria::new("t.zip", "bob", Some("ios".into())).unwrap())
        .await
        .unwrap();
    let flat_artifact = t
        .repo
        .resolve(&Criteria::new("t.zip", "bob", None).unwrap())
        .await
        .unwrap();

    assert_eq!(nested_artifact.contents().await.unwrap(), nested);
    assert_eq!(flat_artifact.contents().await.unwrap(), flat);
}

#[tokio::test]
async fn fresh_artifact_is_not_expired() {
    let t = TestRepository::new().await;

    let saved = t
        .repo
        .save(&payload("carol", None, "build.zip", seeded_bytes(5, 16)))
        .await
        .unwrap();
    assert!(!saved.is_expired());
}

#[tokio::test]
async fn expired_artifact_fails_resolution() {
    let t = TestRepository::new().await;

    t.repo
        .save(&payload("carol", None, "build.zip", seeded_bytes(6, 16)))
        .await
        .unwrap();
    backdate(&t.path("carol/build.zip"), Duration::from_secs(2 * 3600));

    let criteria = Criteria::new("build.zip", "carol", None).unwrap();
    let err = t.repo.resolve(&criteria).await.unwrap_err();
    assert!(matches!(err, StorageError::Expired(_)), "got {err:?}");
    assert!(!t.repo.is_present(&criteria).await);
}

#[tokio::test]
async fn presence_probe_matches_resolution() {
    let t = TestRepository::new().await;
    let criteria = Criteria::new("app.ipa", "dave", Some("ios".into())).unwrap();

    assert!(!t.repo.is_present(&criteria).await);
    t.repo
        .save(&payload("dave", Some("ios"), "app.ipa", seeded_bytes(7, 32)))
        .await
        .unwrap();
    assert!(t.repo.is_present(&criteria).await);
}
