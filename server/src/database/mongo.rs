//! Networked driver backed by the official MongoDB client.
//!
//! Documents cross the boundary as JSON; this module converts them to BSON
//! and back. Only the `_id` field uses a native `ObjectId`: on the way in a
//! 24-hex string `_id` becomes an `ObjectId`, on the way out an `ObjectId`
//! becomes its hex string. Everything else goes through serde.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, Bson, Document as BsonDocument, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::ReturnDocument;
use mongodb::{Client, Collection as MongoCollection, Database};
use serde_json::Value;

use super::id::{DriverKind, EntityId, to_entity_id};
use super::local::validate_collection_name;
use super::query::{
    Condition, Document, ID_FIELD, Projection, Query, QueryValue, RemoveOptions, Update,
    UpdateOptions, UpdateOutcome,
};
use super::{Driver, DriverError};

/// Server error code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Driver storing collections in one MongoDB database.
pub struct MongoDriver {
    database: Database,
}

impl MongoDriver {
    /// Connect to `uri` and use the database called `database`.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, DriverError> {
        let client = Client::with_uri_str(uri).await?;
        let database = client.database(database);
        tracing::info!("Using MongoDB database '{}'", database.name());
        Ok(Self { database })
    }

    /// Wrap an already-configured database handle.
    #[must_use]
    pub const fn from_database(database: Database) -> Self {
        Self { database }
    }

    fn collection(&self, name: &str) -> Result<MongoCollection<BsonDocument>, DriverError> {
        validate_collection_name(name)?;
        Ok(self.database.collection(name))
    }
}

#[async_trait]
impl Driver for MongoDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::MongoDb
    }

    async fn insert(&self, collection: &str, mut doc: Document) -> Result<Document, DriverError> {
        let coll = self.collection(collection)?;
        if !doc.contains_key(ID_FIELD) {
            doc.insert(
                ID_FIELD.to_string(),
                Value::String(ObjectId::new().to_hex()),
            );
        }

        match coll.insert_one(to_bson_document(&doc)?).await {
            Ok(_) => Ok(doc),
            Err(e) if is_duplicate_key(&e) => {
                let id = doc
                    .get(ID_FIELD)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Err(DriverError::DuplicateId(id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find(
        &self,
        collection: &str,
        query: &Query,
        projection: Option<&Projection>,
    ) -> Result<Vec<Document>, DriverError> {
        let coll = self.collection(collection)?;
        find_documents(
            &coll,
            filter_from_query(query)?,
            projection.map(projection_document),
        )
        .await
    }

    async fn find_one(
        &self,
        collection: &str,
        query: &Query,
        projection: Option<&Projection>,
    ) -> Result<Option<Document>, DriverError> {
        let coll = self.collection(collection)?;
        let mut action = coll.find_one(filter_from_query(query)?);
        if let Some(projection) = projection {
            action = action.projection(projection_document(projection));
        }
        action.await?.map(from_bson_document).transpose()
    }

    async fn update(
        &self,
        collection: &str,
        query: &Query,
        update: &Update,
        options: UpdateOptions,
    ) -> Result<UpdateOutcome<Document>, DriverError> {
        if options.multi && matches!(update, Update::Replace(_)) {
            return Err(DriverError::InvalidOperation(
                "a replacement cannot target multiple documents".to_string(),
            ));
        }

        let coll = self.collection(collection)?;
        let filter = filter_from_query(query)?;

        if !options.return_updated_docs {
            let result = match update {
                Update::Replace(replacement) => {
                    coll.replace_one(filter, to_bson_document(replacement)?)
                        .upsert(options.upsert)
                        .await?
                }
                Update::Set(fields) if options.multi => {
                    coll.update_many(filter, set_document(fields)?)
                        .upsert(options.upsert)
                        .await?
                }
                Update::Set(fields) => {
                    coll.update_one(filter, set_document(fields)?)
                        .upsert(options.upsert)
                        .await?
                }
            };
            let upserted = result.upserted_id.is_some();
            return Ok(UpdateOutcome::Affected {
                count: if upserted { 1 } else { result.matched_count },
                upserted,
            });
        }

        if !options.multi {
            let updated = match update {
                Update::Replace(replacement) => {
                    coll.find_one_and_replace(filter, to_bson_document(replacement)?)
                        .upsert(options.upsert)
                        .return_document(ReturnDocument::After)
                        .await?
                }
                Update::Set(fields) => {
                    coll.find_one_and_update(filter, set_document(fields)?)
                        .upsert(options.upsert)
                        .return_document(ReturnDocument::After)
                        .await?
                }
            };
            let docs = updated.map(from_bson_document).transpose()?;
            return Ok(UpdateOutcome::Documents(docs.into_iter().collect()));
        }

        let Update::Set(fields) = update else {
            return Err(DriverError::InvalidOperation(
                "a replacement cannot target multiple documents".to_string(),
            ));
        };

        // MongoDB has no multi-document "return after", so pin the matched ids first.
        let matched = find_documents(&coll, filter.clone(), Some(doc! { "_id": 1 })).await?;
        let ids = matched
            .iter()
            .filter_map(|doc| doc.get(ID_FIELD))
            .map(id_to_bson)
            .collect::<Result<Vec<_>, _>>()?;

        if ids.is_empty() {
            if !options.upsert {
                return Ok(UpdateOutcome::Documents(Vec::new()));
            }
            let upserted = coll
                .find_one_and_update(filter, set_document(fields)?)
                .upsert(true)
                .return_document(ReturnDocument::After)
                .await?;
            let docs = upserted.map(from_bson_document).transpose()?;
            return Ok(UpdateOutcome::Documents(docs.into_iter().collect()));
        }

        let by_ids = doc! { "_id": { "$in": ids } };
        coll.update_many(by_ids.clone(), set_document(fields)?).await?;
        let docs = find_documents(&coll, by_ids, None).await?;
        Ok(UpdateOutcome::Documents(docs))
    }

    async fn remove(
        &self,
        collection: &str,
        query: &Query,
        options: RemoveOptions,
    ) -> Result<u64, DriverError> {
        let coll = self.collection(collection)?;
        let filter = filter_from_query(query)?;
        let result = if options.multi {
            coll.delete_many(filter).await?
        } else {
            coll.delete_one(filter).await?
        };
        Ok(result.deleted_count)
    }
}

async fn find_documents(
    collection: &MongoCollection<BsonDocument>,
    filter: BsonDocument,
    projection: Option<BsonDocument>,
) -> Result<Vec<Document>, DriverError> {
    let mut action = collection.find(filter);
    if let Some(projection) = projection {
        action = action.projection(projection);
    }
    let docs: Vec<BsonDocument> = action.await?.try_collect().await?;
    docs.into_iter().map(from_bson_document).collect()
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

fn bson_error(e: impl std::fmt::Display) -> DriverError {
    DriverError::Bson(e.to_string())
}

/// Convert an `_id` value: strings must parse as `ObjectId`s.
fn id_to_bson(value: &Value) -> Result<Bson, DriverError> {
    match value {
        Value::String(raw) => match to_entity_id(DriverKind::MongoDb, raw)? {
            EntityId::Object(oid) => Ok(Bson::ObjectId(oid)),
            EntityId::Local(raw) => Ok(Bson::String(raw)),
        },
        other => bson::to_bson(other).map_err(bson_error),
    }
}

/// Convert a JSON document into BSON.
///
/// # Errors
///
/// Fails if `_id` is a string but not a valid `ObjectId`, or if a value has
/// no BSON form.
pub fn to_bson_document(doc: &Document) -> Result<BsonDocument, DriverError> {
    let mut converted = BsonDocument::new();
    for (key, value) in doc {
        let value = if key == ID_FIELD {
            id_to_bson(value)?
        } else {
            bson::to_bson(value).map_err(bson_error)?
        };
        converted.insert(key.clone(), value);
    }
    Ok(converted)
}

/// Convert a BSON document into JSON, with `_id` as a hex string.
pub fn from_bson_document(doc: BsonDocument) -> Result<Document, DriverError> {
    let mut converted = Document::new();
    for (key, value) in doc {
        let value = match value {
            Bson::ObjectId(oid) if key == ID_FIELD => Value::String(oid.to_hex()),
            other => other.into_relaxed_extjson(),
        };
        converted.insert(key, value);
    }
    Ok(converted)
}

fn query_value_to_bson(field: &str, value: &QueryValue) -> Result<Bson, DriverError> {
    match value {
        QueryValue::Id(EntityId::Object(oid)) if field == ID_FIELD => Ok(Bson::ObjectId(*oid)),
        _ if field == ID_FIELD => id_to_bson(&value.to_json()),
        _ => bson::to_bson(&value.to_json()).map_err(bson_error),
    }
}

/// Translate a [`Query`] into a MongoDB filter.
///
/// A single clause becomes `{field: condition}`; several become an `$and`
/// so repeated fields don't overwrite each other.
pub fn filter_from_query(query: &Query) -> Result<BsonDocument, DriverError> {
    let mut clauses = Vec::with_capacity(query.clauses().len());
    for (field, condition) in query.clauses() {
        let condition = match condition {
            Condition::Eq(value) => query_value_to_bson(field, value)?,
            Condition::Ne(value) => Bson::Document(doc! { "$ne": query_value_to_bson(field, value)? }),
            Condition::In(values) => {
                let values = values
                    .iter()
                    .map(|value| query_value_to_bson(field, value))
                    .collect::<Result<Vec<_>, _>>()?;
                Bson::Document(doc! { "$in": values })
            }
            Condition::Exists(present) => Bson::Document(doc! { "$exists": *present }),
        };
        let mut clause = BsonDocument::new();
        clause.insert(field.clone(), condition);
        clauses.push(clause);
    }

    Ok(match clauses.len() {
        0 => BsonDocument::new(),
        1 => clauses.swap_remove(0),
        _ => doc! { "$and": clauses },
    })
}

/// Translate a [`Projection`] into an inclusion document.
#[must_use]
pub fn projection_document(projection: &Projection) -> BsonDocument {
    let mut converted = BsonDocument::new();
    for field in projection.fields() {
        converted.insert(field.clone(), 1);
    }
    converted
}

/// Build a `$set` modifier from the given fields.
pub fn set_document(fields: &Document) -> Result<BsonDocument, DriverError> {
    Ok(doc! { "$set": to_bson_document(fields)? })
}
