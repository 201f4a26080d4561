//! In-memory document store for tests and local runs.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{FirestoreError, FirestoreResult};
use crate::store::{Direction, DocumentStore, Fields, Filter, FindOptions, Update};

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Fields>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

fn with_id(id: &str, fields: &Fields) -> Fields {
    let mut out = fields.clone();
    out.insert("id".to_string(), Value::String(id.to_string()));
    out
}

fn without_id(mut fields: Fields) -> Fields {
    fields.remove("id");
    fields
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn apply(fields: &mut Fields, update: Update) {
    for (field, value) in update.set {
        if field != "id" {
            fields.insert(field, value);
        }
    }
    for (field, by) in update.increment {
        let next = match fields.get(&field) {
            Some(Value::Number(n)) if n.is_i64() => Value::from(n.as_i64().unwrap_or(0) + by),
            Some(Value::Number(n)) => Value::from(n.as_f64().unwrap_or(0.0) + by as f64),
            _ => Value::from(by),
        };
        fields.insert(field, next);
    }
    for (field, values) in update.append {
        match fields.get_mut(&field) {
            Some(Value::Array(items)) => items.extend(values),
            _ => {
                fields.insert(field, Value::Array(values));
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> FirestoreResult<Option<Fields>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| with_id(id, fields)))
    }

    async fn find(
        &self,
        collection: &str,
        filters: &[Filter],
        options: FindOptions,
    ) -> FirestoreResult<Vec<Fields>> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<Fields> = docs
            .iter()
            .filter(|(_, fields)| filters.iter().all(|f| f.matches(fields)))
            .map(|(id, fields)| with_id(id, fields))
            .collect();

        if let Some((field, direction)) = &options.order_by {
            matches.sort_by(|a, b| {
                let ord = compare(a.get(field), b.get(field));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
        if let Some(limit) = options.limit {
            matches.truncate(limit as usize);
        }
        Ok(matches)
    }

    async fn insert(&self, collection: &str, fields: Fields) -> FirestoreResult<String> {
        let id = Uuid::new_v4().to_string();
        self.create(collection, &id, fields).await?;
        Ok(id)
    }

    async fn create(&self, collection: &str, id: &str, fields: Fields) -> FirestoreResult<()> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            return Err(FirestoreError::AlreadyExists(format!("{collection}/{id}")));
        }
        docs.insert(id.to_string(), without_id(fields));
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, update: Update) -> FirestoreResult<()> {
        let mut collections = self.collections.write().await;
        let fields = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| FirestoreError::not_found(format!("{collection}/{id}")))?;
        apply(fields, update);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> FirestoreResult<()> {
        if let Some(docs) = self.collections.write().await.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DocumentStoreExt;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_get_roundtrip_injects_id() {
        let store = MemoryStore::new();
        let id = store
            .insert("jobs", fields(json!({"id": "ignored", "status": "pending_render"})))
            .await
            .unwrap();
        let doc = store.get("jobs", &id).await.unwrap().unwrap();
        assert_eq!(doc["id"], json!(id));
        assert_eq!(doc["status"], "pending_render");
        assert!(store.get("jobs", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_is_conditional() {
        let store = MemoryStore::new();
        store.create("render_locks", "u1", Fields::new()).await.unwrap();
        let err = store.create("render_locks", "u1", Fields::new()).await.unwrap_err();
        assert!(err.is_already_exists());
        store.delete("render_locks", "u1").await.unwrap();
        store.create("render_locks", "u1", Fields::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_find_orders_and_limits() {
        let store = MemoryStore::new();
        for (id, at) in [("a", "2024-01-01T00:00:00Z"), ("b", "2024-03-01T00:00:00Z"), ("c", "2024-02-01T00:00:00Z")] {
            store
                .create("transcripts", id, fields(json!({"upload_id": "u1", "created_at": at})))
                .await
                .unwrap();
        }
        store
            .create("transcripts", "d", fields(json!({"upload_id": "u2", "created_at": "2025-01-01T00:00:00Z"})))
            .await
            .unwrap();

        let latest = store
            .find_one(
                "transcripts",
                &[Filter::eq("upload_id", "u1")],
                FindOptions::newest_first("created_at"),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest["id"], "b");

        let all = store
            .find("transcripts", &[Filter::eq("upload_id", "u1")], FindOptions::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_update_transforms() {
        let store = MemoryStore::new();
        store
            .create("videos", "v1", fields(json!({"callbackAttempts": 1, "workflowHistory": [{"status": "received"}]})))
            .await
            .unwrap();
        store
            .update(
                "videos",
                "v1",
                Update::new()
                    .set("status", "failed")
                    .increment("callbackAttempts", 2)
                    .increment("retries", 1)
                    .append("workflowHistory", json!({"status": "failed"})),
            )
            .await
            .unwrap();

        let doc = store.get("videos", "v1").await.unwrap().unwrap();
        assert_eq!(doc["status"], "failed");
        assert_eq!(doc["callbackAttempts"], 3);
        assert_eq!(doc["retries"], 1);
        assert_eq!(doc["workflowHistory"].as_array().unwrap().len(), 2);

        let missing = store.update("videos", "v2", Update::new().set("a", 1)).await;
        assert!(matches!(missing, Err(FirestoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_where_and_typed_helpers() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Row {
            #[serde(default)]
            id: String,
            upload_id: String,
            status: String,
        }

        let store = MemoryStore::new();
        for _ in 0..2 {
            store
                .insert_as(
                    "render_jobs",
                    &Row {
                        id: String::new(),
                        upload_id: "u1".into(),
                        status: "queued".into(),
                    },
                )
                .await
                .unwrap();
        }

        let updated = store
            .update_where(
                "render_jobs",
                &[Filter::eq("upload_id", "u1")],
                Update::new().set("status", "exported"),
            )
            .await
            .unwrap();
        assert_eq!(updated, 2);

        let rows: Vec<Row> = store
            .find_as("render_jobs", &[Filter::eq("status", "exported")], FindOptions::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| !r.id.is_empty() && r.upload_id == "u1"));
        assert_eq!(store.count("render_jobs").await, 2);
    }
}
