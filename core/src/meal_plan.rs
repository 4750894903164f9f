use std::collections::BTreeMap;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::warn;

use crate::error::SyncError;
use crate::models::{MealAssignment, MealPlan, meal_key, validate_meal_type};

/// The household's shared meal plan.
///
/// Every mutation returns the plan as the store sees it after the write, so
/// callers can reconcile their optimistic copy.
pub trait MealPlanStore {
    fn get_meal_plan(&self) -> Result<MealPlan>;
    fn set_meal(
        &self,
        date: NaiveDate,
        meal_type: &str,
        assignment: &MealAssignment,
    ) -> Result<MealPlan>;
    fn remove_meal(&self, date: NaiveDate, meal_type: &str) -> Result<MealPlan>;
    fn set_note(&self, date: NaiveDate, note: &str) -> Result<MealPlan>;
    fn set_extras(&self, extras: &[String]) -> Result<MealPlan>;
}

/// In-memory copy of the meal plan with optimistic writes.
///
/// A mutation is applied locally first, then sent to the store. On success the
/// local copy is replaced by the store's answer; on failure the touched entry
/// is put back the way it was and [`SyncError::MutationRolledBack`] is
/// returned.
pub struct MealPlanView<'a> {
    store: &'a dyn MealPlanStore,
    plan: MealPlan,
}

impl<'a> MealPlanView<'a> {
    pub fn load(store: &'a dyn MealPlanStore) -> Result<Self> {
        let plan = store.get_meal_plan()?;
        Ok(Self { store, plan })
    }

    #[must_use]
    pub fn plan(&self) -> &MealPlan {
        &self.plan
    }

    pub fn refresh(&mut self) -> Result<()> {
        self.plan = self.store.get_meal_plan()?;
        Ok(())
    }

    pub fn set_meal(
        &mut self,
        date: NaiveDate,
        meal_type: &str,
        assignment: MealAssignment,
    ) -> Result<(), SyncError> {
        let meal_type = validate_meal_type(meal_type)?;
        let key = meal_key(date, &meal_type);
        let previous = self.plan.meals.insert(key.clone(), assignment.clone());

        match self.store.set_meal(date, &meal_type, &assignment) {
            Ok(plan) => {
                self.plan = plan;
                Ok(())
            }
            Err(err) => {
                restore(&mut self.plan.meals, key.clone(), previous);
                Err(rolled_back(key, &err))
            }
        }
    }

    /// Removing an empty slot is not an error; the store decides.
    pub fn remove_meal(&mut self, date: NaiveDate, meal_type: &str) -> Result<(), SyncError> {
        let meal_type = validate_meal_type(meal_type)?;
        let key = meal_key(date, &meal_type);
        let previous = self.plan.meals.remove(&key);

        match self.store.remove_meal(date, &meal_type) {
            Ok(plan) => {
                self.plan = plan;
                Ok(())
            }
            Err(err) => {
                restore(&mut self.plan.meals, key.clone(), previous);
                Err(rolled_back(key, &err))
            }
        }
    }

    /// An empty note clears the day's note.
    pub fn set_note(&mut self, date: NaiveDate, note: &str) -> Result<(), SyncError> {
        let day = date.format("%Y-%m-%d").to_string();
        let previous = if note.trim().is_empty() {
            self.plan.notes.remove(&day)
        } else {
            self.plan.notes.insert(day.clone(), note.to_string())
        };

        match self.store.set_note(date, note) {
            Ok(plan) => {
                self.plan = plan;
                Ok(())
            }
            Err(err) => {
                restore(&mut self.plan.notes, day.clone(), previous);
                Err(rolled_back(format!("note for {day}"), &err))
            }
        }
    }

    /// Returns false if the recipe was already an extra.
    pub fn add_extra(&mut self, recipe_id: &str) -> Result<bool, SyncError> {
        if self.plan.extras.iter().any(|id| id == recipe_id) {
            return Ok(false);
        }
        let mut extras = self.plan.extras.clone();
        extras.push(recipe_id.to_string());
        self.replace_extras(extras)?;
        Ok(true)
    }

    /// Returns false if the recipe was not an extra.
    pub fn remove_extra(&mut self, recipe_id: &str) -> Result<bool, SyncError> {
        if !self.plan.extras.iter().any(|id| id == recipe_id) {
            return Ok(false);
        }
        let extras: Vec<String> = self
            .plan
            .extras
            .iter()
            .filter(|id| *id != recipe_id)
            .cloned()
            .collect();
        self.replace_extras(extras)?;
        Ok(true)
    }

    fn replace_extras(&mut self, extras: Vec<String>) -> Result<(), SyncError> {
        let previous = std::mem::replace(&mut self.plan.extras, extras);
        match self.store.set_extras(&self.plan.extras) {
            Ok(plan) => {
                self.plan = plan;
                Ok(())
            }
            Err(err) => {
                self.plan.extras = previous;
                Err(rolled_back("extras".to_string(), &err))
            }
        }
    }
}

fn restore<V>(map: &mut BTreeMap<String, V>, key: String, previous: Option<V>) {
    match previous {
        Some(value) => {
            map.insert(key, value);
        }
        None => {
            map.remove(&key);
        }
    }
}

fn rolled_back(target: String, err: &anyhow::Error) -> SyncError {
    let reason = format!("{err:#}");
    warn!(slot = %target, error = %reason, "meal plan update failed, rolled back");
    SyncError::MutationRolledBack { target, reason }
}
