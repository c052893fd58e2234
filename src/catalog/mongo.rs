use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::options::{ClientOptions, FindOptions};
use mongodb::{Client as MongoClient, Collection};

use crate::catalog::CatalogStore;
use crate::models::{BackfillError, CatalogRecord, RecordQuery, Result};

const DEFAULT_DATABASE: &str = "catalog";

/// Catalog collection read directly from MongoDB.
#[derive(Clone)]
pub struct MongoCatalog {
    collection: Collection<Document>,
}

impl MongoCatalog {
    /// Connects using `uri`. The access key becomes the password when the URI names a user
    /// without one, which keeps the secret out of the connection string.
    pub async fn connect(uri: &str, access_key: &str, collection: &str) -> Result<Self> {
        let mut options = ClientOptions::parse(uri).await?;
        if let Some(credential) = options.credential.as_mut() {
            if credential.username.is_some() && credential.password.is_none() {
                credential.password = Some(access_key.to_string());
            }
        }
        let database = options
            .default_database
            .clone()
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());
        let client = MongoClient::with_options(options)?;
        tracing::info!(database = %database, collection = %collection, "Connected to MongoDB catalog");
        Ok(Self {
            collection: client.database(&database).collection(collection),
        })
    }

    pub fn build_filter(query: &RecordQuery) -> Document {
        let mut filter = Document::new();
        if query.only_missing_image {
            // null also matches a missing field
            filter.insert("image_url", doc! { "$in": [Bson::Null, ""] });
        }
        if let Some(brand) = &query.brand {
            filter.insert("brand", brand.clone());
        }
        filter
    }
}

/// MongoDB reads a limit of 0 as unlimited and a negative one as a single batch.
pub fn find_limit(limit: Option<usize>) -> Option<i64> {
    limit
        .filter(|&n| n > 0)
        .map(|n| i64::try_from(n).unwrap_or(i64::MAX))
}

/// Filter on `_id` that matches however the id was stored.
pub fn id_filter(id: &str) -> Document {
    if let Ok(oid) = ObjectId::parse_str(id) {
        doc! { "_id": oid }
    } else if let Ok(n) = id.parse::<i64>() {
        doc! { "$or": [ { "_id": n }, { "_id": id } ] }
    } else {
        doc! { "_id": id }
    }
}

pub fn record_from_document(document: &Document) -> Result<CatalogRecord> {
    let id = match document.get("_id") {
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(Bson::String(s)) => s.clone(),
        Some(Bson::Int32(n)) => n.to_string(),
        Some(Bson::Int64(n)) => n.to_string(),
        other => {
            return Err(BackfillError::Catalog(format!("unsupported record _id: {:?}", other)));
        }
    };
    let text = |field: &str| {
        document
            .get_str(field)
            .map(str::to_string)
            .map_err(|_| BackfillError::Catalog(format!("record {} has no string field '{}'", id, field)))
    };
    Ok(CatalogRecord {
        brand: text("brand")?,
        name: text("name")?,
        image_url: document.get_str("image_url").ok().map(str::to_string),
        id: id.clone(),
    })
}

#[async_trait]
impl CatalogStore for MongoCatalog {
    async fn fetch_records(&self, query: &RecordQuery) -> Result<Vec<CatalogRecord>> {
        let options = FindOptions::builder()
            .projection(doc! { "_id": 1, "name": 1, "brand": 1, "image_url": 1 })
            .limit(find_limit(query.limit))
            .build();
        let mut cursor = self.collection.find(Self::build_filter(query), options).await?;

        let mut records = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            match record_from_document(&document) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(error = %e, "Skipping malformed catalog document"),
            }
        }
        Ok(records)
    }

    async fn set_image_url(&self, id: &str, image_url: &str) -> Result<()> {
        let result = self
            .collection
            .update_one(id_filter(id), doc! { "$set": { "image_url": image_url } }, None)
            .await?;
        if result.matched_count == 0 {
            return Err(BackfillError::Catalog(format!("no record with id {}", id)));
        }
        Ok(())
    }
}
