//! The date-keyed occupancy store: single source of truth for every view.

use std::{fmt, sync::Arc};

use crate::{
    error::{DataOrigin, LoadError},
    model::{BedSnapshot, DateKey, HistoricalData},
    traits::Storage,
};

/// Key under which the whole store is persisted.
pub const STORAGE_KEY: &str = "hospitalBedData";

/// Result of a save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMutationOutcome {
    Saved,
    /// A different snapshot already exists for the date. Nothing was changed;
    /// call [`OccupancyStore::confirm_overwrite`] once the user agrees.
    OverwriteRequired { existing: BedSnapshot },
}

/// Date-keyed collection of snapshots. All writes go through its methods and
/// each successful write is followed by a full re-serialization to storage.
#[derive(Clone, Default)]
pub struct OccupancyStore {
    data: HistoricalData,
    storage: Option<Arc<dyn Storage>>,
}

impl fmt::Debug for OccupancyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OccupancyStore")
            .field("data", &self.data)
            .field("persistent", &self.storage.is_some())
            .finish()
    }
}

impl PartialEq for OccupancyStore {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl OccupancyStore {
    /// Empty store without persistence.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: HistoricalData) -> Self {
        Self {
            data,
            storage: None,
        }
    }

    /// Attach a persistence collaborator. Does not write anything by itself.
    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Load the persisted copy and keep `storage` for later writes.
    ///
    /// A missing copy gives an empty store. A corrupt one also gives an empty
    /// store, together with the `LoadFailed` condition to report.
    pub fn load(storage: Arc<dyn Storage>) -> (Self, Option<LoadError>) {
        match read_persisted(storage.as_ref()) {
            Ok(data) => (
                Self::from_data(data.unwrap_or_default()).with_storage(storage),
                None,
            ),
            Err(err) => {
                tracing::error!("{}", err);
                (Self::new().with_storage(storage), Some(err))
            }
        }
    }

    // ==================== Reads ====================

    /// Snapshot stored for `date`, or an all-zero snapshot.
    pub fn get(&self, date: &DateKey) -> BedSnapshot {
        self.data.get(date).copied().unwrap_or_default()
    }

    pub fn contains(&self, date: &DateKey) -> bool {
        self.data.contains_key(date)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &HistoricalData {
        &self.data
    }

    /// All dates, most recent first.
    pub fn list_dates(&self) -> Vec<DateKey> {
        self.data.keys().rev().copied().collect()
    }

    pub fn most_recent_date(&self) -> Option<DateKey> {
        self.data.keys().next_back().copied()
    }

    /// Data for a single date, empty if the date is absent.
    pub fn subset(&self, date: &DateKey) -> HistoricalData {
        self.data
            .get_key_value(date)
            .map(|(k, v)| HistoricalData::from([(*k, *v)]))
            .unwrap_or_default()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.data)
    }

    // ==================== Mutations ====================

    /// Save `snapshot` for `date`, refusing to replace a different existing snapshot.
    pub fn save(&mut self, date: DateKey, snapshot: BedSnapshot) -> StoreMutationOutcome {
        match self.data.get(&date) {
            Some(existing) if *existing != snapshot => {
                tracing::debug!("Overwrite of {} requires confirmation", date);
                StoreMutationOutcome::OverwriteRequired {
                    existing: *existing,
                }
            }
            Some(_) => StoreMutationOutcome::Saved,
            None => {
                self.data.insert(date, snapshot);
                tracing::info!("Saved occupancy for {}", date);
                self.persist();
                StoreMutationOutcome::Saved
            }
        }
    }

    /// Replace whatever is stored for `date`. Only call after the user confirmed.
    pub fn confirm_overwrite(
        &mut self,
        date: DateKey,
        snapshot: BedSnapshot,
    ) -> StoreMutationOutcome {
        self.data.insert(date, snapshot);
        tracing::info!("Overwrote occupancy for {}", date);
        self.persist();
        StoreMutationOutcome::Saved
    }

    /// Remove `date`. Returns whether an entry was removed; absent dates are a no-op.
    pub fn delete(&mut self, date: &DateKey) -> bool {
        if self.data.remove(date).is_none() {
            return false;
        }
        tracing::info!("Deleted occupancy for {}", date);
        self.persist();
        true
    }

    /// Replace the whole working set, as when importing a shared link.
    pub fn replace_all(&mut self, data: HistoricalData) {
        tracing::info!("Replacing store with {} entries", data.len());
        self.data = data;
        self.persist();
    }

    /// Write the full store to storage. Failures are logged and never undo the
    /// in-memory change.
    fn persist(&self) {
        let Some(storage) = &self.storage else {
            return;
        };

        let json = match self.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize occupancy data: {}", e);
                return;
            }
        };

        if let Err(e) = storage.write(STORAGE_KEY, &json) {
            tracing::warn!("Failed to persist occupancy data: {}", e);
        }
    }
}

/// Read and parse the persisted copy. `Ok(None)` when nothing was stored yet.
pub fn read_persisted(storage: &dyn Storage) -> Result<Option<HistoricalData>, LoadError> {
    let raw = storage
        .read(STORAGE_KEY)
        .map_err(|e| LoadError::LoadFailed {
            origin: DataOrigin::LocalStorage,
            reason: e.to_string(),
        })?;

    let Some(raw) = raw else {
        return Ok(None);
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| LoadError::LoadFailed {
            origin: DataOrigin::LocalStorage,
            reason: e.to_string(),
        })
}
