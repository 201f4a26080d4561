//! The document store seam used by the pipeline.
//!
//! Documents are plain JSON objects. The document id is not part of the
//! stored fields; reads return it under the `id` key and writes ignore any
//! `id` key they are given. Field names are top-level only.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{FirestoreError, FirestoreResult};

/// A document's fields.
pub type Fields = serde_json::Map<String, Value>;

/// Equality match on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        fields
            .get(&self.field)
            .is_some_and(|v| json_eq(v, &self.value))
    }
}

/// Numbers compare by value so `2` matches `2.0`.
pub(crate) fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<u32>,
}

impl FindOptions {
    pub fn newest_first(field: impl Into<String>) -> Self {
        Self {
            order_by: Some((field.into(), Direction::Descending)),
            limit: None,
        }
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A partial update: plain field writes plus server-side transforms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub set: Fields,
    pub increment: Vec<(String, i64)>,
    pub append: Vec<(String, Vec<Value>)>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(field.into(), value.into());
        self
    }

    /// Set a field to any serializable value.
    pub fn set_json<T: Serialize>(self, field: impl Into<String>, value: &T) -> FirestoreResult<Self> {
        Ok(self.set(field, serde_json::to_value(value)?))
    }

    /// Set only when `value` is present.
    pub fn set_opt(self, field: impl Into<String>, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(v) => self.set(field, v),
            None => self,
        }
    }

    pub fn increment(mut self, field: impl Into<String>, by: i64) -> Self {
        self.increment.push((field.into(), by));
        self
    }

    pub fn append(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        match self.append.iter_mut().find(|(f, _)| *f == field) {
            Some((_, values)) => values.push(value.into()),
            None => self.append.push((field, vec![value.into()])),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.increment.is_empty() && self.append.is_empty()
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> FirestoreResult<Option<Fields>>;

    /// Documents matching all `filters`.
    async fn find(
        &self,
        collection: &str,
        filters: &[Filter],
        options: FindOptions,
    ) -> FirestoreResult<Vec<Fields>>;

    /// Insert under a generated id and return it.
    async fn insert(&self, collection: &str, fields: Fields) -> FirestoreResult<String>;

    /// Insert under `id`; fails with `AlreadyExists` if it is taken.
    async fn create(&self, collection: &str, id: &str, fields: Fields) -> FirestoreResult<()>;

    /// Update an existing document; fails with `NotFound` if it is missing.
    async fn update(&self, collection: &str, id: &str, update: Update) -> FirestoreResult<()>;

    /// Idempotent.
    async fn delete(&self, collection: &str, id: &str) -> FirestoreResult<()>;

    async fn find_one(
        &self,
        collection: &str,
        filters: &[Filter],
        options: FindOptions,
    ) -> FirestoreResult<Option<Fields>> {
        let mut docs = self.find(collection, filters, options.limit(1)).await?;
        Ok(if docs.is_empty() { None } else { Some(docs.swap_remove(0)) })
    }

    /// Apply `update` to every match; returns how many were updated.
    async fn update_where(
        &self,
        collection: &str,
        filters: &[Filter],
        update: Update,
    ) -> FirestoreResult<usize> {
        let docs = self.find(collection, filters, FindOptions::default()).await?;
        let mut updated = 0;
        for doc in docs {
            let Some(id) = doc.get("id").and_then(Value::as_str) else {
                continue;
            };
            match self.update(collection, id, update.clone()).await {
                Ok(()) => updated += 1,
                // Deleted between the query and the write.
                Err(FirestoreError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(updated)
    }
}

/// Serialize a record into stored fields, dropping `id`.
pub fn to_fields<T: Serialize>(value: &T) -> FirestoreResult<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        other => Err(FirestoreError::invalid_document(format!(
            "expected an object, got {other}"
        ))),
    }
}

pub fn from_fields<T: DeserializeOwned>(fields: Fields) -> FirestoreResult<T> {
    Ok(serde_json::from_value(Value::Object(fields))?)
}

/// Typed helpers over any [`DocumentStore`].
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    async fn get_as<T: DeserializeOwned + Send>(
        &self,
        collection: &str,
        id: &str,
    ) -> FirestoreResult<Option<T>> {
        self.get(collection, id).await?.map(from_fields).transpose()
    }

    async fn find_as<T: DeserializeOwned + Send>(
        &self,
        collection: &str,
        filters: &[Filter],
        options: FindOptions,
    ) -> FirestoreResult<Vec<T>> {
        self.find(collection, filters, options)
            .await?
            .into_iter()
            .map(from_fields)
            .collect()
    }

    async fn find_one_as<T: DeserializeOwned + Send>(
        &self,
        collection: &str,
        filters: &[Filter],
        options: FindOptions,
    ) -> FirestoreResult<Option<T>> {
        self.find_one(collection, filters, options)
            .await?
            .map(from_fields)
            .transpose()
    }

    async fn insert_as<T: Serialize + Sync>(&self, collection: &str, value: &T) -> FirestoreResult<String> {
        let fields = to_fields(value)?;
        self.insert(collection, fields).await
    }

    async fn create_as<T: Serialize + Sync>(
        &self,
        collection: &str,
        id: &str,
        value: &T,
    ) -> FirestoreResult<()> {
        let fields = to_fields(value)?;
        self.create(collection, id, fields).await
    }
}

impl<S: DocumentStore + ?Sized> DocumentStoreExt for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches_numbers_by_value() {
        let fields = json!({"attempts": 2.0, "status": "queued"});
        let fields = fields.as_object().unwrap();
        assert!(Filter::eq("attempts", 2).matches(fields));
        assert!(Filter::eq("status", "queued").matches(fields));
        assert!(!Filter::eq("status", "failed").matches(fields));
        assert!(!Filter::eq("missing", "x").matches(fields));
    }

    #[test]
    fn test_update_builder_groups_appends() {
        let update = Update::new()
            .set("status", "failed")
            .set_opt("error", None::<String>)
            .increment("callbackAttempts", 1)
            .append("workflowHistory", json!({"status": "a"}))
            .append("workflowHistory", json!({"status": "b"}));
        assert_eq!(update.set.len(), 1);
        assert_eq!(update.increment, vec![("callbackAttempts".to_string(), 1)]);
        assert_eq!(update.append.len(), 1);
        assert_eq!(update.append[0].1.len(), 2);
        assert!(!update.is_empty());
        assert!(Update::new().is_empty());
    }

    #[test]
    fn test_to_fields_drops_id() {
        let fields = to_fields(&json!({"id": "x", "name": "n"})).unwrap();
        assert!(!fields.contains_key("id"));
        assert!(to_fields(&json!(3)).is_err());
    }
}
