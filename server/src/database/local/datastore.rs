//! One embedded collection.
//!
//! Live documents are held in memory in insertion order; every change is
//! appended to the collection's log before the in-memory state moves.
//!
//! # Recovery
//!
//! 1. Read the whole log file (a missing file is an empty collection)
//! 2. Replay records until the first truncated or corrupt one
//! 3. Rewrite the file with one `put` per live document (compaction)
//! 4. Reopen the compacted file for appending
//!
//! # Invariants
//!
//! - Every stored document has a non-empty string `_id`, unique in the collection.
//! - The log on disk replays to exactly the in-memory documents.
//! - A failed append is truncated away before the next one; if that fails
//!   the collection stops accepting writes.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::distr::Alphanumeric;
use serde_json::Value;

use super::log::{self, LogEntry};
use super::matcher::{apply_update, matches, project, upsert_seed};
use crate::database::query::{
    Document, ID_FIELD, Projection, Query, RemoveOptions, Update, UpdateOptions, UpdateOutcome,
};
use crate::database::{DriverError, InvalidIdError};

/// Length of generated document identifiers.
pub const GENERATED_ID_LENGTH: usize = 16;

/// Result of opening a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of log records replayed.
    pub records_replayed: usize,
    /// Number of live documents after replay.
    pub live_documents: usize,
    /// Bytes dropped from a torn or corrupt tail.
    pub discarded_bytes: usize,
}

/// A collection stored in a single append-only log file.
pub struct Datastore {
    path: PathBuf,
    log: File,
    documents: Vec<Document>,
    poisoned: bool,
}

impl Datastore {
    /// Open the collection at `path`, creating it if it doesn't exist.
    pub fn open(path: &Path) -> Result<(Self, RecoveryResult), DriverError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let replayed = log::replay(&bytes);
        if let Some(reason) = &replayed.stopped_by {
            tracing::warn!(
                path = %path.display(),
                discarded_bytes = replayed.discarded_bytes,
                "discarding corrupt log tail: {reason}"
            );
        }

        let records_replayed = replayed.entries.len();
        let mut documents = Vec::new();
        for entry in replayed.entries {
            apply_entry(&mut documents, entry);
        }

        compact(path, &documents)?;

        let log = OpenOptions::new().create(true).append(true).open(path)?;

        let result = RecoveryResult {
            records_replayed,
            live_documents: documents.len(),
            discarded_bytes: replayed.discarded_bytes,
        };

        Ok((
            Self {
                path: path.to_path_buf(),
                log,
                documents,
                poisoned: false,
            },
            result,
        ))
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of live documents.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the collection holds no documents.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Insert a document, generating an `_id` when it has none.
    pub fn insert(&mut self, mut doc: Document) -> Result<Document, DriverError> {
        match doc.get(ID_FIELD) {
            Some(Value::String(id)) if id.is_empty() => {
                return Err(DriverError::InvalidId(InvalidIdError::Empty));
            }
            Some(Value::String(id)) => {
                if self.position(id).is_some() {
                    return Err(DriverError::DuplicateId(id.clone()));
                }
            }
            Some(other) => {
                return Err(DriverError::InvalidOperation(format!(
                    "_id must be a string, got {other}"
                )));
            }
            None => {
                let id = self.generate_id();
                doc.insert(ID_FIELD.to_string(), Value::String(id));
            }
        }

        self.append(&LogEntry::Put { doc: doc.clone() })?;
        self.documents.push(doc.clone());
        Ok(doc)
    }

    /// All documents matching `query`, in insertion order.
    #[must_use]
    pub fn find(&self, query: &Query, projection: Option<&Projection>) -> Vec<Document> {
        self.documents
            .iter()
            .filter(|doc| matches(doc, query))
            .map(|doc| shape(doc, projection))
            .collect()
    }

    /// The first document matching `query`.
    #[must_use]
    pub fn find_one(&self, query: &Query, projection: Option<&Projection>) -> Option<Document> {
        self.documents
            .iter()
            .find(|doc| matches(doc, query))
            .map(|doc| shape(doc, projection))
    }

    /// Apply `update` to the documents matching `query`.
    ///
    /// Every updated document is computed before anything is written, so an
    /// invalid update leaves the collection untouched.
    pub fn update(
        &mut self,
        query: &Query,
        update: &Update,
        options: UpdateOptions,
    ) -> Result<UpdateOutcome<Document>, DriverError> {
        if options.multi && matches!(update, Update::Replace(_)) {
            return Err(DriverError::InvalidOperation(
                "a replacement cannot target multiple documents".to_string(),
            ));
        }

        let limit = if options.multi { usize::MAX } else { 1 };
        let positions: Vec<usize> = self
            .documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| matches(doc, query))
            .map(|(position, _)| position)
            .take(limit)
            .collect();

        if positions.is_empty() {
            if !options.upsert {
                return Ok(if options.return_updated_docs {
                    UpdateOutcome::Documents(Vec::new())
                } else {
                    UpdateOutcome::Affected {
                        count: 0,
                        upserted: false,
                    }
                });
            }

            let doc = apply_update(&upsert_seed(query), update)?;
            let inserted = self.insert(doc)?;
            return Ok(if options.return_updated_docs {
                UpdateOutcome::Documents(vec![inserted])
            } else {
                UpdateOutcome::Affected {
                    count: 1,
                    upserted: true,
                }
            });
        }

        let updated: Vec<(usize, Document)> = positions
            .into_iter()
            .map(|position| Ok((position, apply_update(&self.documents[position], update)?)))
            .collect::<Result<_, DriverError>>()?;

        for (position, doc) in &updated {
            self.append(&LogEntry::Put { doc: doc.clone() })?;
            self.documents[*position] = doc.clone();
        }

        Ok(if options.return_updated_docs {
            UpdateOutcome::Documents(updated.into_iter().map(|(_, doc)| doc).collect())
        } else {
            UpdateOutcome::Affected {
                count: updated.len() as u64,
                upserted: false,
            }
        })
    }

    /// Remove the documents matching `query`.
    pub fn remove(&mut self, query: &Query, options: RemoveOptions) -> Result<u64, DriverError> {
        let limit = if options.multi { usize::MAX } else { 1 };
        let ids: Vec<String> = self
            .documents
            .iter()
            .filter(|doc| matches(doc, query))
            .filter_map(|doc| id_of(doc).map(str::to_string))
            .take(limit)
            .collect();

        for id in &ids {
            self.append(&LogEntry::Delete { id: id.clone() })?;
            self.documents.retain(|doc| id_of(doc) != Some(id.as_str()));
        }

        Ok(ids.len() as u64)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.documents.iter().position(|doc| id_of(doc) == Some(id))
    }

    fn generate_id(&self) -> String {
        loop {
            let id: String = rand::rng()
                .sample_iter(&Alphanumeric)
                .take(GENERATED_ID_LENGTH)
                .map(char::from)
                .collect();
            if self.position(&id).is_none() {
                return id;
            }
        }
    }

    fn append(&mut self, entry: &LogEntry) -> Result<(), DriverError> {
        if self.poisoned {
            return Err(DriverError::LogPoisoned(self.path.clone()));
        }

        let bytes = log::encode(entry)?;
        let offset = self.log.metadata()?.len();
        if let Err(e) = self
            .log
            .write_all(&bytes)
            .and_then(|()| self.log.sync_data())
        {
            self.roll_back(offset);
            return Err(e.into());
        }
        Ok(())
    }

    /// Cut the log back to `offset`, dropping a partially written record.
    fn roll_back(&mut self, offset: u64) {
        let truncated = self
            .log
            .set_len(offset)
            .and_then(|()| self.log.sync_data());
        if let Err(e) = truncated {
            tracing::error!(
                path = %self.path.display(),
                offset,
                "failed to roll back partial log write: {e}"
            );
            self.poisoned = true;
        }
    }
}

fn id_of(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

fn shape(doc: &Document, projection: Option<&Projection>) -> Document {
    projection.map_or_else(|| doc.clone(), |projection| project(doc, projection))
}

fn apply_entry(documents: &mut Vec<Document>, entry: LogEntry) {
    match entry {
        LogEntry::Put { doc } => {
            let Some(id) = id_of(&doc).map(str::to_string) else {
                tracing::warn!("skipping logged document without a string _id");
                return;
            };
            match documents
                .iter()
                .position(|existing| id_of(existing) == Some(id.as_str()))
            {
                Some(position) => documents[position] = doc,
                None => documents.push(doc),
            }
        }
        LogEntry::Delete { id } => {
            documents.retain(|doc| id_of(doc) != Some(id.as_str()));
        }
    }
}

/// Rewrite the log with one record per live document, then swap it in.
fn compact(path: &Path, documents: &[Document]) -> Result<(), DriverError> {
    let temp_path = path.with_extension("compact");
    {
        let mut temp = File::create(&temp_path)?;
        for doc in documents {
            let bytes = log::encode(&LogEntry::Put { doc: doc.clone() })?;
            temp.write_all(&bytes)?;
        }
        temp.sync_all()?;
    }
    std::fs::rename(&temp_path, path)?;
    Ok(())
}
