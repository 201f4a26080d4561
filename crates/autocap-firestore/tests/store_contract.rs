//! Behaviour the pipeline relies on, checked through a trait object.

use std::sync::Arc;

use autocap_firestore::{
    DocumentStore, DocumentStoreExt, FirestoreError, Filter, FindOptions, MemoryStore, Update,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Video {
    #[serde(default)]
    id: String,
    external_video_id: String,
    status: String,
    #[serde(default)]
    callback_attempts: u32,
}

fn store() -> Arc<dyn DocumentStore> {
    Arc::new(MemoryStore::new())
}

#[tokio::test]
async fn test_typed_roundtrip_through_trait_object() {
    let store = store();
    let id = store
        .insert_as(
            "integration_videos",
            &Video {
                id: String::new(),
                external_video_id: "ext-1".into(),
                status: "pending_transcription".into(),
                callback_attempts: 0,
            },
        )
        .await
        .unwrap();

    store
        .update(
            "integration_videos",
            &id,
            Update::new().set("status", "transcribing").increment("callbackAttempts", 1),
        )
        .await
        .unwrap();

    let video: Video = store
        .find_one_as(
            "integration_videos",
            &[Filter::eq("externalVideoId", "ext-1")],
            FindOptions::default(),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(video.id, id);
    assert_eq!(video.status, "transcribing");
    assert_eq!(video.callback_attempts, 1);
}

#[tokio::test]
async fn test_concurrent_creates_single_winner() {
    let store = store();
    let attempts = (0..8).map(|i| {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            let fields = json!({"holder": i}).as_object().cloned().unwrap();
            store.create("render_locks", "upload-1", fields).await
        })
    });

    let mut winners = 0;
    for handle in attempts {
        match handle.await.unwrap() {
            Ok(()) => winners += 1,
            Err(FirestoreError::AlreadyExists(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_get_as_missing_is_none() {
    let store = store();
    let video: Option<Video> = store.get_as("integration_videos", "missing").await.unwrap();
    assert!(video.is_none());
}
