//! Integration tests for the onboarding record store.
//!
//! Run against a real PostgreSQL database (`DATABASE_URL`):
//! - Single-slice patches leave other slices untouched
//! - Stale sequence numbers are discarded
//! - Submit is a compare-and-set from `draft`
//! - The `submitted_at` check constraint holds

use assert_matches::assert_matches;
use bistro_core::error::CoreError;
use bistro_core::slices::SliceName;
use bistro_core::status::OnboardingStatus;
use bistro_core::store::{ListFilter, RecordStore};
use bistro_core::types::JsonMap;
use bistro_db::PgRecordStore;
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn map(value: serde_json::Value) -> JsonMap {
    value.as_object().cloned().unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_and_read_back(pool: PgPool) {
    bistro_db::health_check(&pool).await.unwrap();
    let store = PgRecordStore::new(pool);

    let record = store.create(11).await.unwrap();
    assert_eq!(record.status, OnboardingStatus::Draft);
    assert_eq!(record.furthest_step, 1);
    assert!(record.submitted_at.is_none());

    let found = store.find_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(found.id, record.id);
    assert_eq!(found.owner_id, 11);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn slice_patch_is_independent_and_shallow(pool: PgPool) {
    let store = PgRecordStore::new(pool);
    let record = store.create(1).await.unwrap();

    store
        .patch_slice(record.id, SliceName::Contact, map(json!({ "email": "gina@bellanapoli.it" })), None)
        .await
        .unwrap();
    store
        .patch_slice(record.id, SliceName::RestaurantInfo, map(json!({ "name": "Bella Napoli" })), None)
        .await
        .unwrap();
    let outcome = store
        .patch_slice(record.id, SliceName::RestaurantInfo, map(json!({ "city": "Napoli" })), None)
        .await
        .unwrap()
        .unwrap();

    let info = outcome.record.slice(SliceName::RestaurantInfo);
    assert_eq!(info["name"], "Bella Napoli");
    assert_eq!(info["city"], "Napoli");
    assert_eq!(outcome.record.slice(SliceName::Contact)["email"], "gina@bellanapoli.it");
    assert!(outcome.record.slice(SliceName::Menu).is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn stale_sequence_is_discarded(pool: PgPool) {
    let store = PgRecordStore::new(pool);
    let record = store.create(1).await.unwrap();

    let newer = store
        .patch_slice(record.id, SliceName::Tables, map(json!({ "indoorTables": 9 })), Some(200))
        .await
        .unwrap()
        .unwrap();
    assert!(newer.applied);

    let older = store
        .patch_slice(record.id, SliceName::Tables, map(json!({ "indoorTables": 4 })), Some(100))
        .await
        .unwrap()
        .unwrap();
    assert!(!older.applied);
    assert_eq!(older.record.slice(SliceName::Tables)["indoorTables"], 9);
    assert_eq!(older.record.slice_version(SliceName::Tables), Some(200));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn patch_missing_record_is_none(pool: PgPool) {
    let store = PgRecordStore::new(pool);
    let outcome = store
        .patch_slice(uuid::Uuid::now_v7(), SliceName::Menu, JsonMap::new(), Some(1))
        .await
        .unwrap();
    assert!(outcome.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn submit_is_compare_and_set(pool: PgPool) {
    let store = PgRecordStore::new(pool);
    let record = store.create(1).await.unwrap();

    let first = store.mark_submitted(record.id, Utc::now()).await.unwrap().unwrap();
    assert_eq!(first.status, OnboardingStatus::Submitted);
    assert!(first.submitted_at.is_some());

    assert!(store.mark_submitted(record.id, Utc::now()).await.unwrap().is_none());
    let stored = store.find_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(stored.submitted_at, first.submitted_at);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn submitted_at_constraint_is_enforced(pool: PgPool) {
    let store = PgRecordStore::new(pool.clone());
    let record = store.create(1).await.unwrap();

    let result = sqlx::query("UPDATE onboarding_records SET status = 'submitted' WHERE id = $1")
        .bind(record.id)
        .execute(&pool)
        .await;
    assert!(result.is_err(), "submitted without submitted_at must be rejected");
    assert_matches!(
        bistro_db::store::map_db_error(result.unwrap_err()),
        CoreError::Validation(_)
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn progress_and_review_lifecycle(pool: PgPool) {
    let store = PgRecordStore::new(pool);
    let record = store.create(1).await.unwrap();

    store.record_progress(record.id, 6).await.unwrap();
    let record = store.record_progress(record.id, 2).await.unwrap().unwrap();
    assert_eq!(record.furthest_step, 6);

    store.mark_submitted(record.id, Utc::now()).await.unwrap();
    let reviewed = store
        .transition_status(record.id, OnboardingStatus::Submitted, OnboardingStatus::InReview)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reviewed.status, OnboardingStatus::InReview);

    let stale = store
        .transition_status(record.id, OnboardingStatus::Submitted, OnboardingStatus::InReview)
        .await
        .unwrap();
    assert!(stale.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_is_scoped(pool: PgPool) {
    let store = PgRecordStore::new(pool);
    store.create(1).await.unwrap();
    store.create(1).await.unwrap();
    store.create(2).await.unwrap();

    let mine = store
        .list(ListFilter { owner_id: Some(1), status: None }, 25, 0)
        .await
        .unwrap();
    assert_eq!(mine.len(), 2);
    let all = store.list(ListFilter::default(), 25, 0).await.unwrap();
    assert_eq!(all.len(), 3);
}
