use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::meal_plan::MealPlanView;
use crate::models::{
    CustomItem, DEFAULT_SERVINGS, MAX_SERVINGS, MIN_SERVINGS, Selection, parse_meal_key,
};
use crate::normalize::normalize_name;
use crate::records::{LocalRecords, RecordName, RecordStore, RecordWrite, load_records};

/// How often a mutation is re-applied on top of records another writer moved
/// ahead before giving up with [`SyncError::WriteConflict`].
const MAX_WRITE_ATTEMPTS: usize = 5;

/// Owner of the device-local grocery state and the only writer to its store
/// within this process.
///
/// A mutation holds the gate of every record it touches, applies the change to
/// a draft, and writes the draft at the next revision. Memory takes the draft
/// only once storage accepted it. When another writer (another process on the
/// same file) stored a newer revision first, the stored records are adopted
/// and the change is applied again on top of them, so neither write is lost.
/// [`refresh`](Self::refresh) drops whatever it read for a record that changed
/// in memory while the read was in flight.
pub struct SelectionCoordinator<S> {
    store: S,
    state: Mutex<LocalRecords>,
    write_gates: [Mutex<()>; 3],
}

impl<S: RecordStore> SelectionCoordinator<S> {
    pub fn open(store: S) -> Result<Self> {
        let records = load_records(&store)?;
        Ok(Self {
            store,
            state: Mutex::new(records),
            write_gates: Default::default(),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, LocalRecords> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- Accessors ---

    #[must_use]
    pub fn snapshot(&self) -> LocalRecords {
        self.lock_state().clone()
    }

    #[must_use]
    pub fn selection(&self) -> Selection {
        self.lock_state().selection.clone()
    }

    #[must_use]
    pub fn custom_items(&self) -> Vec<CustomItem> {
        self.lock_state().custom_items.clone()
    }

    #[must_use]
    pub fn checked_names(&self) -> BTreeSet<String> {
        self.lock_state().checked_names.clone()
    }

    #[must_use]
    pub fn is_chosen(&self, key: &str) -> bool {
        self.lock_state().selection.is_chosen(key)
    }

    #[must_use]
    pub fn servings_for(&self, key: &str) -> Option<u32> {
        self.lock_state()
            .selection
            .serving_overrides
            .get(key)
            .copied()
    }

    // --- Reload ---

    /// Re-read every record, e.g. when the grocery surface regains focus.
    pub fn refresh(&self) -> Result<()> {
        let seen = self.lock_state().revisions;
        let loaded = load_records(&self.store)?;
        self.apply_reload(seen, loaded);
        Ok(())
    }

    fn apply_reload(&self, seen: [u64; 3], loaded: LocalRecords) {
        let LocalRecords {
            selection,
            custom_items,
            checked_names,
            revisions,
        } = loaded;
        let mut state = self.lock_state();

        for name in RecordName::ALL {
            let i = name.index();
            let current = state.revisions[i];
            // Moved while we were reading, or holds a write not yet on disk.
            if current != seen[i] || revisions[i] < current {
                debug!(
                    record = name.as_str(),
                    memory = current,
                    stored = revisions[i],
                    "keeping in-memory record over stale reload"
                );
                continue;
            }
            match name {
                RecordName::Selection => state.selection = selection.clone(),
                RecordName::CustomItems => state.custom_items = custom_items.clone(),
                RecordName::CheckedNames => state.checked_names = checked_names.clone(),
            }
            state.revisions[i] = revisions[i];
        }
    }

    // --- Mutations ---

    /// Add the slot to the next trip, or take it off. Returns whether the slot
    /// is chosen afterwards.
    pub fn toggle_selection(&self, key: &str, recipe_servings: Option<u32>) -> Result<bool> {
        self.mutate(&[RecordName::Selection], |records| {
            let selection = &mut records.selection;
            if let Some(pos) = selection.chosen_keys.iter().position(|k| k == key) {
                selection.chosen_keys.remove(pos);
                selection.serving_overrides.remove(key);
                false
            } else {
                selection.chosen_keys.push(key.to_string());
                selection
                    .serving_overrides
                    .insert(key.to_string(), recipe_servings.unwrap_or(DEFAULT_SERVINGS));
                true
            }
        })
    }

    /// Adjust the people count for a chosen slot, clamped to 1..=12. Returns
    /// the new count, or `None` without writing anything when the slot is not
    /// chosen.
    pub fn change_servings(&self, key: &str, delta: i32) -> Result<Option<u32>> {
        if !self.is_chosen(key) {
            return Ok(None);
        }
        self.mutate(&[RecordName::Selection], |records| {
            let selection = &mut records.selection;
            if !selection.is_chosen(key) {
                return None;
            }
            let current = selection
                .serving_overrides
                .get(key)
                .copied()
                .unwrap_or(DEFAULT_SERVINGS);
            let next = (i64::from(current) + i64::from(delta))
                .clamp(i64::from(MIN_SERVINGS), i64::from(MAX_SERVINGS));
            let next = u32::try_from(next).unwrap_or(MIN_SERVINGS);
            selection.serving_overrides.insert(key.to_string(), next);
            Some(next)
        })
    }

    /// Blank names are ignored. Identical names are kept as separate lines.
    pub fn add_custom_item(&self, name: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(false);
        }
        self.mutate(&[RecordName::CustomItems], |records| {
            records.custom_items.push(CustomItem {
                name: name.to_string(),
            });
        })?;
        Ok(true)
    }

    pub fn remove_custom_item(&self, index: usize) -> Result<Option<CustomItem>> {
        if index >= self.lock_state().custom_items.len() {
            return Ok(None);
        }
        self.mutate(&[RecordName::CustomItems], |records| {
            (index < records.custom_items.len()).then(|| records.custom_items.remove(index))
        })
    }

    pub fn toggle_checked(&self, name: &str, checked: bool) -> Result<()> {
        let normalized = normalize_name(name);
        self.mutate(&[RecordName::CheckedNames], |records| {
            if checked {
                records.checked_names.insert(normalized.clone());
            } else {
                records.checked_names.remove(&normalized);
            }
        })
    }

    pub fn clear_checked(&self) -> Result<()> {
        self.mutate(&[RecordName::CheckedNames], |records| {
            records.checked_names.clear();
        })
    }

    /// Drop every chosen slot and its servings. Manual items and checked
    /// names stay.
    pub fn clear_meal_plan_items_only(&self) -> Result<()> {
        self.mutate(&[RecordName::Selection], |records| {
            records.selection = Selection::default();
        })
    }

    /// Drop manual items. Chosen slots stay.
    pub fn clear_manual_items_only(&self) -> Result<()> {
        self.mutate(&[RecordName::CustomItems], |records| {
            records.custom_items.clear();
        })
    }

    /// Clear the whole trip on both tiers: unset every chosen slot in the
    /// shared meal plan, and only once all of them are gone wipe the local
    /// records, all three in one batch. If any remote unset fails nothing
    /// local is touched and
    /// [`SyncError::PartialClear`] names the slots that are still planned.
    /// Returns the number of slots cleared.
    pub fn clear_all(&self, meal_plan: &mut MealPlanView<'_>) -> Result<usize, SyncError> {
        let keys = self.selection().chosen_keys;
        let mut failed = Vec::new();
        let mut reason = String::new();

        for key in &keys {
            let Ok((date, meal_type)) = parse_meal_key(key) else {
                debug!(key = %key, "chosen key is not a meal-plan slot, nothing to unset");
                continue;
            };
            if let Err(err) = meal_plan.remove_meal(date, &meal_type) {
                warn!(key = %key, error = %err, "could not unset planned meal");
                reason = err.to_string();
                failed.push(key.clone());
            }
        }

        if !failed.is_empty() {
            return Err(SyncError::PartialClear {
                attempted: keys.len(),
                failed,
                reason,
            });
        }

        self.mutate(&RecordName::ALL, |records| {
            records.selection = Selection::default();
            records.custom_items.clear();
            records.checked_names.clear();
        })
        .map_err(|err| err.downcast::<SyncError>().unwrap_or_else(SyncError::Storage))?;
        info!(slots = keys.len(), "cleared grocery list and planned meals");
        Ok(keys.len())
    }

    /// Apply `change` to a draft of the current records, write the named
    /// records at their next revision in one batch, then publish the draft.
    /// `change` runs again on top of the stored records whenever another
    /// writer got there first.
    fn mutate<T>(
        &self,
        names: &[RecordName],
        mut change: impl FnMut(&mut LocalRecords) -> T,
    ) -> Result<T> {
        // Fixed order so overlapping mutations cannot deadlock.
        let _gates: Vec<MutexGuard<'_, ()>> = RecordName::ALL
            .iter()
            .filter(|name| names.contains(*name))
            .map(|name| {
                self.write_gates[name.index()]
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
            })
            .collect();

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut draft = self.snapshot();
            let result = change(&mut draft);
            let mut payloads = Vec::with_capacity(names.len());
            for &name in names {
                draft.revisions[name.index()] += 1;
                payloads.push((name, draft.revision(name), draft.encode(name)?));
            }
            let writes: Vec<RecordWrite<'_>> = payloads
                .iter()
                .map(|(name, revision, payload)| RecordWrite {
                    name: *name,
                    revision: *revision,
                    payload: payload.as_str(),
                })
                .collect();

            if self.store.write_records(&writes)? {
                self.lock_state().adopt(&draft, names);
                return Ok(result);
            }

            debug!(attempt, "stored records are ahead, re-applying change on top");
            let stored = load_records(&self.store)?;
            self.lock_state().adopt(&stored, names);
        }

        let records = names
            .iter()
            .map(|name| name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        warn!(%records, "giving up on local write after repeated conflicts");
        Err(SyncError::WriteConflict {
            records,
            attempts: MAX_WRITE_ATTEMPTS,
        }
        .into())
    }
}
