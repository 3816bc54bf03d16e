use std::sync::Arc;

use vizrev_state::{
    ReleaseRecord, ReleaseStore, RepositoryId, StorageError, SurrealHandle, SurrealReleaseStore,
    VerificationEntry,
};

#[tokio::test]
async fn surrealkv_store_round_trips_embedded_statuses() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("surrealkv://{}", dir.path().join("db").display());
    let handle = Arc::new(SurrealHandle::setup_at(&url).await.unwrap());
    let store = SurrealReleaseStore::new(handle);

    let mut release = ReleaseRecord::new(RepositoryId::from("repo-disk"), "v1");
    let mut entry = VerificationEntry::assigned(release.id.as_str(), "alice");
    entry.additional_comments = "renders fine".to_string();
    release.statuses.push(entry.clone());
    store.insert_release(release.clone()).await.unwrap();

    let loaded = store.get_release(&release.id).await.unwrap();
    assert_eq!(loaded.statuses.len(), 1);
    assert_eq!(loaded.statuses[0].id, entry.id);
    assert_eq!(loaded.statuses[0].additional_comments, "renders fine");
    assert_eq!(loaded.statuses[0].review_date, entry.review_date);
}

#[tokio::test]
async fn stale_writer_after_delete_gets_not_found() {
    let handle = Arc::new(SurrealHandle::setup_db().await.unwrap());
    let store = SurrealReleaseStore::new(handle);

    let release = store
        .insert_release(ReleaseRecord::new(RepositoryId::from("repo"), "v1"))
        .await
        .unwrap();
    let stale_copy = store.get_release(&release.id).await.unwrap();

    store
        .delete_release(&release.id, Some(release.version))
        .await
        .unwrap();

    let err = store.replace_release(&stale_copy).await.unwrap_err();
    assert!(matches!(err, StorageError::ReleaseNotFound { .. }));
}
