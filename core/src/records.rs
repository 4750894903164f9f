use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use anyhow::Result;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::db::Database;
use crate::models::{CustomItem, Selection};

/// The independently persisted pieces of per-device grocery state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordName {
    Selection,
    CustomItems,
    CheckedNames,
}

impl RecordName {
    pub const ALL: [RecordName; 3] = [
        RecordName::Selection,
        RecordName::CustomItems,
        RecordName::CheckedNames,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RecordName::Selection => "selection",
            RecordName::CustomItems => "custom_items",
            RecordName::CheckedNames => "checked_names",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            RecordName::Selection => 0,
            RecordName::CustomItems => 1,
            RecordName::CheckedNames => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub payload: String,
    pub revision: u64,
}

/// One record to store at a given revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordWrite<'a> {
    pub name: RecordName,
    pub revision: u64,
    pub payload: &'a str,
}

/// Device-local key/value storage for grocery records.
///
/// `write_records` applies every write or none of them. It must refuse the
/// whole batch when any revision is not newer than the stored one, and report
/// that by returning `Ok(false)`.
pub trait RecordStore: Send + Sync {
    fn read_record(&self, name: RecordName) -> Result<Option<StoredRecord>>;
    fn write_records(&self, writes: &[RecordWrite<'_>]) -> Result<bool>;

    fn write_record(&self, name: RecordName, revision: u64, payload: &str) -> Result<bool> {
        self.write_records(&[RecordWrite {
            name,
            revision,
            payload,
        }])
    }
}

/// [`RecordStore`] backed by the device's sqlite database.
pub struct LocalRecordStore {
    db: Mutex<Database>,
}

impl LocalRecordStore {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }
}

impl RecordStore for LocalRecordStore {
    fn read_record(&self, name: RecordName) -> Result<Option<StoredRecord>> {
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(db
            .read_local_record(name.as_str())?
            .map(|(payload, revision)| StoredRecord { payload, revision }))
    }

    fn write_records(&self, writes: &[RecordWrite<'_>]) -> Result<bool> {
        let rows: Vec<(&str, u64, &str)> = writes
            .iter()
            .map(|w| (w.name.as_str(), w.revision, w.payload))
            .collect();
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        db.write_local_records(&rows)
    }
}

/// Decoded grocery state plus the revision each record was last written at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalRecords {
    pub selection: Selection,
    pub custom_items: Vec<CustomItem>,
    pub checked_names: BTreeSet<String>,
    pub revisions: [u64; 3],
}

impl LocalRecords {
    #[must_use]
    pub fn revision(&self, name: RecordName) -> u64 {
        self.revisions[name.index()]
    }

    /// Take the named records, and their revisions, from `other`.
    pub(crate) fn adopt(&mut self, other: &LocalRecords, names: &[RecordName]) {
        for &name in names {
            match name {
                RecordName::Selection => self.selection = other.selection.clone(),
                RecordName::CustomItems => self.custom_items = other.custom_items.clone(),
                RecordName::CheckedNames => self.checked_names = other.checked_names.clone(),
            }
            self.revisions[name.index()] = other.revisions[name.index()];
        }
    }

    pub(crate) fn encode(&self, name: RecordName) -> Result<String> {
        let payload = match name {
            RecordName::Selection => serde_json::to_string(&self.selection)?,
            RecordName::CustomItems => serde_json::to_string(&self.custom_items)?,
            RecordName::CheckedNames => serde_json::to_string(&self.checked_names)?,
        };
        Ok(payload)
    }
}

/// Read all records. A record that is missing or does not parse comes back
/// empty; only storage failures are errors.
pub fn load_records(store: &dyn RecordStore) -> Result<LocalRecords> {
    let (selection, selection_rev) = decode(RecordName::Selection, store)?;
    let (custom_items, custom_rev) = decode(RecordName::CustomItems, store)?;
    let (checked_names, checked_rev) = decode(RecordName::CheckedNames, store)?;
    Ok(LocalRecords {
        selection,
        custom_items,
        checked_names,
        revisions: [selection_rev, custom_rev, checked_rev],
    })
}

fn decode<T: DeserializeOwned + Default>(
    name: RecordName,
    store: &dyn RecordStore,
) -> Result<(T, u64)> {
    let Some(stored) = store.read_record(name)? else {
        return Ok((T::default(), 0));
    };
    match serde_json::from_str(&stored.payload) {
        Ok(value) => Ok((value, stored.revision)),
        Err(err) => {
            warn!(record = name.as_str(), error = %err, "discarding malformed local record");
            // Keep the revision so the next write still supersedes the bad row.
            Ok((T::default(), stored.revision))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_empty_store() {
        let store = LocalRecordStore::open_in_memory().unwrap();
        let records = load_records(&store).unwrap();
        assert_eq!(records, LocalRecords::default());
    }

    #[test]
    fn test_encode_and_load() {
        let store = LocalRecordStore::open_in_memory().unwrap();
        let mut records = LocalRecords::default();
        records.selection.chosen_keys.push("2025-01-04_lunch".to_string());
        records
            .selection
            .serving_overrides
            .insert("2025-01-04_lunch".to_string(), 4);
        records.custom_items.push(CustomItem {
            name: "Milk".to_string(),
        });
        records.checked_names.insert("milk".to_string());

        for (rev, name) in (1..).zip(RecordName::ALL) {
            let payload = records.encode(name).unwrap();
            assert!(store.write_record(name, rev, &payload).unwrap());
        }

        let loaded = load_records(&store).unwrap();
        assert_eq!(loaded.selection, records.selection);
        assert_eq!(loaded.custom_items, records.custom_items);
        assert_eq!(loaded.checked_names, records.checked_names);
        assert_eq!(loaded.revisions, [1, 2, 3]);
    }

    #[test]
    fn test_malformed_record_loads_empty() {
        let store = LocalRecordStore::open_in_memory().unwrap();
        store
            .write_record(RecordName::CustomItems, 7, "{not json")
            .unwrap();
        store
            .write_record(RecordName::CheckedNames, 1, r#"["milk"]"#)
            .unwrap();

        let loaded = load_records(&store).unwrap();
        assert!(loaded.custom_items.is_empty());
        assert_eq!(loaded.revision(RecordName::CustomItems), 7);
        // Other records are unaffected.
        assert!(loaded.checked_names.contains("milk"));
    }

    #[test]
    fn test_wrong_shape_record_loads_empty() {
        let store = LocalRecordStore::open_in_memory().unwrap();
        store
            .write_record(RecordName::Selection, 1, r#"["not", "a", "selection"]"#)
            .unwrap();
        let loaded = load_records(&store).unwrap();
        assert_eq!(loaded.selection, Selection::default());
    }

    #[test]
    fn test_batch_write_is_all_or_nothing() {
        let store = LocalRecordStore::open_in_memory().unwrap();
        assert!(store.write_record(RecordName::CustomItems, 5, "[]").unwrap());

        let stale = [
            RecordWrite {
                name: RecordName::Selection,
                revision: 1,
                payload: r#"{"chosen_keys":["2025-01-04_lunch"]}"#,
            },
            RecordWrite {
                name: RecordName::CustomItems,
                revision: 5,
                payload: r#"[{"name":"Milk"}]"#,
            },
        ];
        assert!(!store.write_records(&stale).unwrap());
        assert!(store.read_record(RecordName::Selection).unwrap().is_none());
        assert_eq!(
            store.read_record(RecordName::CustomItems).unwrap().unwrap().payload,
            "[]"
        );

        let fresh = [
            RecordWrite {
                revision: 6,
                ..stale[1]
            },
            stale[0],
        ];
        assert!(store.write_records(&fresh).unwrap());
        let loaded = load_records(&store).unwrap();
        assert_eq!(loaded.revisions, [1, 6, 0]);
        assert_eq!(loaded.custom_items.len(), 1);
    }

    #[test]
    fn test_adopt_copies_only_named_records() {
        let mut mine = LocalRecords::default();
        mine.checked_names.insert("milk".to_string());
        let mut theirs = LocalRecords::default();
        theirs.custom_items.push(CustomItem {
            name: "Bread".to_string(),
        });
        theirs.revisions = [3, 4, 5];

        mine.adopt(&theirs, &[RecordName::CustomItems]);
        assert_eq!(mine.custom_items, theirs.custom_items);
        assert!(mine.checked_names.contains("milk"));
        assert_eq!(mine.revisions, [0, 4, 0]);
    }

    #[test]
    fn test_record_names_are_distinct() {
        let names: BTreeSet<&str> = RecordName::ALL.iter().map(|n| n.as_str()).collect();
        assert_eq!(names.len(), 3);
        let indexes: BTreeSet<usize> = RecordName::ALL.iter().map(|n| n.index()).collect();
        assert_eq!(indexes.len(), 3);
    }
}
