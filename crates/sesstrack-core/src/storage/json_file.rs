//! Flat-file JSON storage backend.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::SessionTrackerStorage;
use crate::error::StorageError;
use crate::record::{SessionId, SessionRecord};
use crate::tracker::SessionTracker;

/// On-disk shape of one session record.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedRecord {
    id: String,
    state: usize,
}

/// [`SessionTrackerStorage`] backed by a single flat file holding a JSON
/// array of `{ "id": <session id>, "state": <state ordinal> }` objects.
///
/// States are persisted as ordinals into the state table supplied at
/// construction, so the table must stay stable (same states, same order)
/// across application runs for previously persisted records to decode.
///
/// A missing file reads as the empty record list. Writes preserve record
/// order: `create` appends, `update` replaces in place, `delete` removes the
/// matching record without disturbing the rest.
#[derive(Debug)]
pub struct JsonFileStorage<S> {
    path: PathBuf,
    states: Vec<S>,
}

impl<S> JsonFileStorage<S>
where
    S: Copy + PartialEq + fmt::Debug,
{
    /// Creates a storage writing to `path`, with `states` as the ordinal
    /// table.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, states: impl Into<Vec<S>>) -> Self {
        Self {
            path: path.into(),
            states: states.into(),
        }
    }

    /// Reads every persisted record, in persisted order.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] on I/O failure, malformed JSON, an
    /// out-of-range state ordinal or an invalid session id.
    pub fn read_all(&self) -> Result<Vec<SessionRecord<S>>, StorageError> {
        self.load()?.iter().map(|r| self.decode(r)).collect()
    }

    /// Appends a record.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] on I/O failure or if the record's state is
    /// missing from the ordinal table.
    pub fn create(&self, record: &SessionRecord<S>) -> Result<(), StorageError> {
        let mut records = self.load()?;
        records.push(self.encode(record)?);
        self.save(&records)
    }

    /// Replaces the record with the same session id, in place. A record with
    /// no persisted counterpart leaves the store unchanged.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] on I/O failure or if the record's state is
    /// missing from the ordinal table.
    pub fn update(&self, record: &SessionRecord<S>) -> Result<(), StorageError> {
        let mut records = self.load()?;
        let encoded = self.encode(record)?;
        if let Some(slot) = records.iter_mut().find(|r| r.id == encoded.id) {
            *slot = encoded;
        }
        self.save(&records)
    }

    /// Removes the record with the given session id, if present.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] on I/O failure.
    pub fn delete(&self, session_id: &SessionId) -> Result<(), StorageError> {
        let mut records = self.load()?;
        if let Some(position) = records.iter().position(|r| r.id == session_id.as_str()) {
            records.remove(position);
        }
        self.save(&records)
    }

    /// Removes every record.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] on I/O failure.
    pub fn delete_all(&self) -> Result<(), StorageError> {
        self.save(&[])
    }

    fn load(&self) -> Result<Vec<PersistedRecord>, StorageError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, records: &[PersistedRecord]) -> Result<(), StorageError> {
        let contents = serde_json::to_string(records)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }

    fn encode(&self, record: &SessionRecord<S>) -> Result<PersistedRecord, StorageError> {
        let ordinal = self
            .states
            .iter()
            .position(|state| *state == record.state)
            .ok_or_else(|| StorageError::UnmappedState {
                state: format!("{:?}", record.state),
            })?;
        Ok(PersistedRecord {
            id: record.session_id.as_str().to_owned(),
            state: ordinal,
        })
    }

    fn decode(&self, record: &PersistedRecord) -> Result<SessionRecord<S>, StorageError> {
        let state =
            self.states
                .get(record.state)
                .copied()
                .ok_or(StorageError::UnknownStateOrdinal {
                    ordinal: record.state,
                    known: self.states.len(),
                })?;
        let session_id =
            SessionId::new(record.id.clone()).map_err(StorageError::InvalidSessionId)?;
        Ok(SessionRecord::new(session_id, state))
    }
}

impl<S, E> SessionTrackerStorage<S, E> for JsonFileStorage<S>
where
    S: Copy + PartialEq + fmt::Debug,
{
    fn read_all_records(
        &self,
        _tracker: &mut SessionTracker<S, E>,
    ) -> Result<Vec<SessionRecord<S>>, StorageError> {
        self.read_all()
    }

    fn create_record(
        &self,
        _tracker: &mut SessionTracker<S, E>,
        record: &SessionRecord<S>,
    ) -> Result<(), StorageError> {
        self.create(record)
    }

    fn update_record(
        &self,
        _tracker: &mut SessionTracker<S, E>,
        record: &SessionRecord<S>,
    ) -> Result<(), StorageError> {
        self.update(record)
    }

    fn delete_record(
        &self,
        _tracker: &mut SessionTracker<S, E>,
        session_id: &SessionId,
    ) -> Result<(), StorageError> {
        self.delete(session_id)
    }

    fn delete_all_records(&self, _tracker: &mut SessionTracker<S, E>) -> Result<(), StorageError> {
        self.delete_all()
    }
}
