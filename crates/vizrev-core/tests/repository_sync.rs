use std::sync::Arc;

use vizrev_core::{
    NewRelease, ReleaseReview, RepositoryId, RepositoryRecord, RepositoryStore, RepositorySync,
    ReviewError, StatusPatch,
};
use vizrev_state::fakes::{MemoryReleaseStore, MemoryRepositoryStore};

struct Fixture {
    review: ReleaseReview,
    sync: RepositorySync,
    repositories: Arc<MemoryRepositoryStore>,
}

async fn fixture(repository_ids: &[&str]) -> Fixture {
    let releases = Arc::new(MemoryReleaseStore::new());
    let repositories = Arc::new(MemoryRepositoryStore::new());
    for id in repository_ids {
        repositories
            .insert_repository(RepositoryRecord::new(RepositoryId::from(*id), *id))
            .await
            .unwrap();
    }
    Fixture {
        review: ReleaseReview::new(releases.clone()),
        sync: RepositorySync::new(releases, repositories.clone()),
        repositories,
    }
}

async fn verified_release(review: &ReleaseReview, repository_id: &str, name: &str) {
    let release = review
        .create_release(NewRelease::new(repository_id, name).with_reviewers(["alice"]))
        .await
        .unwrap();
    review
        .update_status_and_evaluate(&release.id, &release.statuses[0].id, StatusPatch::reviewed(true))
        .await
        .unwrap();
}

async fn is_verified(fixture: &Fixture, id: &str) -> bool {
    fixture
        .repositories
        .get_repository(&RepositoryId::from(id))
        .await
        .unwrap()
        .verified
}

#[tokio::test]
async fn sync_without_verified_releases_is_a_client_error() {
    let fixture = fixture(&["repo-a"]).await;
    fixture
        .review
        .create_release(NewRelease::new("repo-a", "draft"))
        .await
        .unwrap();

    let err = fixture
        .sync
        .verify_repositories_from_releases()
        .await
        .unwrap_err();

    assert!(matches!(err, ReviewError::NoVerifiedReleases));
    assert!(!err.is_not_found());
    assert!(!is_verified(&fixture, "repo-a").await);
}

#[tokio::test]
async fn sync_promotes_only_repositories_with_verified_releases() {
    let fixture = fixture(&["repo-a", "repo-b", "repo-c"]).await;
    verified_release(&fixture.review, "repo-a", "v1").await;
    verified_release(&fixture.review, "repo-a", "v2").await;
    fixture
        .review
        .create_release(NewRelease::new("repo-b", "draft"))
        .await
        .unwrap();

    let report = fixture
        .sync
        .verify_repositories_from_releases()
        .await
        .unwrap();

    assert_eq!(report.verified_releases, 2);
    assert_eq!(report.candidate_repositories, 1);
    assert_eq!(report.promoted, 1);
    assert!(is_verified(&fixture, "repo-a").await);
    assert!(!is_verified(&fixture, "repo-b").await);
    assert!(!is_verified(&fixture, "repo-c").await);
}

#[tokio::test]
async fn sync_is_idempotent() {
    let fixture = fixture(&["repo-a"]).await;
    verified_release(&fixture.review, "repo-a", "v1").await;

    let first = fixture.sync.verify_repositories_from_releases().await.unwrap();
    let second = fixture.sync.verify_repositories_from_releases().await.unwrap();

    assert_eq!(first.promoted, 1);
    assert_eq!(second.promoted, 0);
    assert!(is_verified(&fixture, "repo-a").await);
}

#[tokio::test]
async fn sync_never_demotes_a_repository() {
    let fixture = fixture(&["repo-a", "repo-b"]).await;
    verified_release(&fixture.review, "repo-a", "v1").await;
    fixture.sync.verify_repositories_from_releases().await.unwrap();

    // repo-a loses its only verified release; another repository keeps sync meaningful.
    let releases = fixture.review.list_releases(None).await.unwrap();
    fixture.review.delete_release(&releases[0].id).await.unwrap();
    verified_release(&fixture.review, "repo-b", "v1").await;

    let report = fixture.sync.verify_repositories_from_releases().await.unwrap();
    assert_eq!(report.promoted, 1);
    assert!(is_verified(&fixture, "repo-a").await);
    assert!(is_verified(&fixture, "repo-b").await);
}

#[tokio::test]
async fn sync_skips_unknown_repositories() {
    let fixture = fixture(&[]).await;
    verified_release(&fixture.review, "ghost", "v1").await;

    let report = fixture.sync.verify_repositories_from_releases().await.unwrap();
    assert_eq!(report.candidate_repositories, 1);
    assert_eq!(report.promoted, 0);
}
