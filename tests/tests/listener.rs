//! End-to-end tests for the inference listener.
//!
//! The mocks implement the same `ObjectStore`/`Classifier`/`ResultsStore`
//! traits as the production clients, so the listener's full notification
//! handling runs without object storage, a model server, or a warehouse.

use std::sync::Arc;

use bytes::Bytes;
use pipeline_core::PredictedClass;
use pubsub::UploadNotification;
use worker::listener::{InferenceListener, RESULT_PREFIX};

use integration_tests::fixtures;
use integration_tests::mocks::{InMemoryResultsStore, MockClassifier, MockObjectStore};

struct TestContext {
    storage: MockObjectStore,
    classifier: MockClassifier,
    results: InMemoryResultsStore,
    listener: InferenceListener,
}

fn setup(classifier: MockClassifier) -> TestContext {
    let storage = MockObjectStore::new();
    let results = InMemoryResultsStore::new();
    let listener = InferenceListener::new(
        Arc::new(storage.clone()),
        Arc::new(classifier.clone()),
        Arc::new(results.clone()),
    );
    TestContext {
        storage,
        classifier,
        results,
        listener,
    }
}

fn notification(bucket: &str, object: &str) -> UploadNotification {
    UploadNotification::from_payload(&fixtures::upload_payload(bucket, object)).unwrap()
}

/// Full flow: fetch the image, classify, store a result copy, record a row.
#[tokio::test]
async fn test_notification_to_result_row() {
    let ctx = setup(MockClassifier::new("Defect", 0.87, 52.5));
    ctx.storage
        .put("casting-images", "uploads/cast_001.jpg", Bytes::from_static(b"jpeg"));

    let result = ctx
        .listener
        .handle(&notification("casting-images", "uploads/cast_001.jpg"))
        .await
        .unwrap();

    assert_eq!(result.predicted_class, PredictedClass::Defect);
    assert_eq!(result.confidence, 0.87);
    assert_eq!(result.latency_ms, 52.5);
    assert_eq!(result.model_version, "mock-v1");
    assert_eq!(
        result.raw_image_path,
        "mem://casting-images/uploads/cast_001.jpg"
    );

    // Result copy stored under the result prefix, keyed by file name.
    let stored = ctx
        .storage
        .get("casting-images", &format!("{}cast_001.jpg", RESULT_PREFIX));
    assert_eq!(stored, Some(Bytes::from_static(b"jpeg")));

    // Exactly one row recorded.
    assert_eq!(ctx.results.row_count(), 1);
    assert_eq!(ctx.results.rows()[0].id, result.id);
}

/// A notification for an object that was never uploaded surfaces the
/// distinct not-found error and records nothing.
#[tokio::test]
async fn test_missing_object_is_not_found() {
    let ctx = setup(MockClassifier::new("OK", 0.99, 10.0));

    let err = ctx
        .listener
        .handle(&notification("casting-images", "uploads/ghost.jpg"))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(ctx.classifier.call_count(), 0);
    assert_eq!(ctx.results.row_count(), 0);
}

/// Batch processing isolates failures: malformed payloads and failing
/// objects are logged and skipped, the rest of the batch still lands.
#[tokio::test]
async fn test_batch_isolates_failures() {
    let ctx = setup(MockClassifier::new("OK", 0.95, 40.0));
    ctx.storage
        .put("casting-images", "uploads/a.jpg", Bytes::from_static(b"a"));
    ctx.storage
        .put("casting-images", "uploads/b.jpg", Bytes::from_static(b"b"));

    let payloads = vec![
        fixtures::upload_payload("casting-images", "uploads/a.jpg"),
        b"not json".to_vec(),
        fixtures::upload_payload("casting-images", "uploads/missing.jpg"),
        fixtures::upload_payload("casting-images", "uploads/b.jpg"),
    ];

    let processed = ctx.listener.process_batch(&payloads).await;

    assert_eq!(processed, 2);
    assert_eq!(ctx.results.row_count(), 2);
}

/// A classifier failure never stores a result copy or a row.
#[tokio::test]
async fn test_classifier_failure_records_nothing() {
    let ctx = setup(MockClassifier::new("OK", 0.95, 40.0));
    ctx.classifier.set_should_fail(true);
    ctx.storage
        .put("casting-images", "uploads/cast.jpg", Bytes::from_static(b"jpeg"));

    let err = ctx
        .listener
        .handle(&notification("casting-images", "uploads/cast.jpg"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("mock classifier failure"));
    assert_eq!(ctx.results.row_count(), 0);
    // Only the raw upload exists, no result copy.
    assert_eq!(ctx.storage.object_count(), 1);
}
